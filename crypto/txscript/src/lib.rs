extern crate core;

pub mod asm;
pub mod caches;
mod callbacks;
pub mod crypto;
pub mod data_stack;
pub mod engine_context;
pub mod environment;
pub mod multi_sig;
pub mod opcodes;
pub mod script_builder;
mod settlement;

use crate::asm::{ScriptToken, parse_asm};
use crate::data_stack::{DataStack, Stack, is_true};
use crate::engine_context::EngineContext;
use crate::environment::ScriptEnvironment;
use collider_hashes::blake2bl;
use log::{debug, trace};
use opcodes::OpCode;
use secp256k1::PublicKey;
use std::fmt::{Display, Formatter};

pub use callbacks::CallbackMatch;
pub use collider_txscript_errors::TxScriptError;
pub use settlement::BroadcastQuery;

/// Maximum length (in characters) of a literal pushed by a script
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 1040;
/// Maximum number of tokens in a single script
pub const MAX_SCRIPT_TOKENS: usize = 10_000;
/// Largest shift amount accepted by OP_LSHIFT / OP_RSHIFT
pub const MAX_SHIFT_BITS: usize = 256;

// The last opcode that does not count toward operations.
pub const NO_COST_OPCODE: u8 = 0x60;

/// Upper bound on the aggregate signature plus component keys consumed by OP_SCHNACK
pub const MAX_SCHNACK_ARGS: usize = 17;

#[derive(Clone, Hash, PartialEq, Eq)]
pub struct SigCacheKey {
    message: [u8; 32],
    signature: Vec<u8>,
    pub_key: PublicKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Ready,
    Running,
    Valid,
    Invalid,
    Faulted,
}

/// Why a script that ran to completion does not unlock its output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    EmptyStack,
    FalseTop,
    EarlyReturn,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptVerdict {
    Valid,
    Invalid(InvalidReason),
    Faulted(TxScriptError),
}

impl ScriptVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ScriptVerdict::Valid)
    }

    pub fn state(&self) -> EngineState {
        match self {
            ScriptVerdict::Valid => EngineState::Valid,
            ScriptVerdict::Invalid(_) => EngineState::Invalid,
            ScriptVerdict::Faulted(_) => EngineState::Faulted,
        }
    }

    /// Collapses the verdict the way transaction validation consumes it
    pub fn into_result(self) -> Result<(), TxScriptError> {
        match self {
            ScriptVerdict::Valid => Ok(()),
            ScriptVerdict::Invalid(InvalidReason::EarlyReturn) => Err(TxScriptError::EarlyReturn),
            ScriptVerdict::Invalid(_) => Err(TxScriptError::EvalFalse),
            ScriptVerdict::Faulted(err) => Err(err),
        }
    }
}

impl Display for ScriptVerdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptVerdict::Valid => write!(f, "valid"),
            ScriptVerdict::Invalid(InvalidReason::EmptyStack) => write!(f, "invalid: empty stack at end of script"),
            ScriptVerdict::Invalid(InvalidReason::FalseTop) => write!(f, "invalid: false stack entry at end of script"),
            ScriptVerdict::Invalid(InvalidReason::EarlyReturn) => write!(f, "invalid: script returned early"),
            ScriptVerdict::Faulted(err) => write!(f, "faulted: {err}"),
        }
    }
}

/// Returns whether the passed locking script is unspendable, or guaranteed to fail at execution.
pub fn is_unspendable(script: &str) -> bool {
    match parse_asm(script) {
        Ok(tokens) => tokens.first() == Some(&ScriptToken::Op(OpCode::OpReturn)),
        Err(_) => true,
    }
}

pub struct TxScriptEngine<'a> {
    dstack: Stack,

    env: &'a ScriptEnvironment,
    ctx: EngineContext<'a>,

    state: EngineState,
    num_ops: usize,

    // Derived per run, discarded with the engine
    callback_match: Option<CallbackMatch>,
    queries: Vec<BroadcastQuery>,
}

impl<'a> TxScriptEngine<'a> {
    pub fn new(env: &'a ScriptEnvironment, ctx: EngineContext<'a>) -> Self {
        Self {
            dstack: Default::default(),
            env,
            ctx,
            state: EngineState::Ready,
            num_ops: 0,
            callback_match: None,
            queries: Default::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The operand stack, bottom first
    pub fn stack(&self) -> &[String] {
        &self.dstack
    }

    /// Broadcast queries accepted by OP_Q during the run
    pub fn queries(&self) -> &[BroadcastQuery] {
        &self.queries
    }

    pub fn callback_match(&self) -> Option<&CallbackMatch> {
        self.callback_match.as_ref()
    }

    /// Runs a decoded script to completion. An engine runs a single script; later calls fault.
    pub fn execute(&mut self, tokens: &[ScriptToken]) -> ScriptVerdict {
        if let Err(err) = self.start() {
            return ScriptVerdict::Faulted(err);
        }
        let verdict = self.run(tokens);
        self.finish(verdict)
    }

    /// Decodes ASM text and runs it. Decoding errors fault the run.
    pub fn evaluate_asm(&mut self, script: &str) -> ScriptVerdict {
        if let Err(err) = self.start() {
            return ScriptVerdict::Faulted(err);
        }
        let verdict = match parse_asm(script) {
            Ok(tokens) => self.run(&tokens),
            Err(err) => ScriptVerdict::Faulted(err),
        };
        self.finish(verdict)
    }

    pub fn verify(&mut self, tokens: &[ScriptToken]) -> Result<(), TxScriptError> {
        self.execute(tokens).into_result()
    }

    fn start(&mut self) -> Result<(), TxScriptError> {
        match self.state {
            EngineState::Ready => {
                self.state = EngineState::Running;
                Ok(())
            }
            state => Err(TxScriptError::InvalidState(format!("engine cannot run a script in state {state:?}"))),
        }
    }

    fn finish(&mut self, verdict: ScriptVerdict) -> ScriptVerdict {
        self.state = verdict.state();
        debug!("Script finished: {verdict}");
        verdict
    }

    fn run(&mut self, tokens: &[ScriptToken]) -> ScriptVerdict {
        if tokens.len() > MAX_SCRIPT_TOKENS {
            return ScriptVerdict::Faulted(TxScriptError::ScriptSize(tokens.len(), MAX_SCRIPT_TOKENS));
        }
        match tokens.iter().try_for_each(|token| self.execute_token(token)) {
            Ok(()) => self.check_final_condition(),
            Err(TxScriptError::EarlyReturn) => ScriptVerdict::Invalid(InvalidReason::EarlyReturn),
            Err(err) => ScriptVerdict::Faulted(err),
        }
    }

    fn execute_token(&mut self, token: &ScriptToken) -> Result<(), TxScriptError> {
        match token {
            ScriptToken::Data(data) => {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(TxScriptError::ElementTooBig(data.len(), MAX_SCRIPT_ELEMENT_SIZE));
                }
                self.dstack.push(data.clone());
            }
            ScriptToken::Op(opcode) => {
                if !opcode.is_push_opcode() {
                    self.num_ops += 1;
                    if self.num_ops > self.ctx.params.max_ops_per_script {
                        return Err(TxScriptError::TooManyOperations(self.ctx.params.max_ops_per_script));
                    }
                }
                trace!("Executing {opcode} with stack depth {}", self.dstack.len());
                opcode.execute(self)?;
            }
        }

        if self.dstack.len() > self.ctx.params.max_stack_size {
            return Err(TxScriptError::StackSizeExceeded(self.dstack.len(), self.ctx.params.max_stack_size));
        }
        Ok(())
    }

    fn check_final_condition(&self) -> ScriptVerdict {
        match self.dstack.last() {
            None => ScriptVerdict::Invalid(InvalidReason::EmptyStack),
            Some(top) if is_true(top) => ScriptVerdict::Valid,
            Some(_) => ScriptVerdict::Invalid(InvalidReason::FalseTop),
        }
    }

    // *** SIGNATURE SPECIFIC CODE **

    /// Checks a recoverable signature over `blake2bl(message)`. Malformed signatures and keys are
    /// plain failures.
    fn op_check_sig(&self, message: &str, signature: &str, pub_key: &str) -> bool {
        let digest = blake2bl(message.as_bytes());
        let (Ok(signature), Ok(pub_key)) = (hex::decode(signature), hex::decode(pub_key)) else {
            debug!("Signature or public key is not hex encoded");
            return false;
        };
        let Ok(pub_key) = PublicKey::from_slice(&pub_key) else {
            debug!("Malformed public key");
            return false;
        };
        self.check_ecdsa_signature(digest, signature, pub_key)
    }

    fn check_ecdsa_signature(&self, digest: [u8; 32], signature: Vec<u8>, pub_key: PublicKey) -> bool {
        let sig_cache_key = SigCacheKey { message: digest, signature, pub_key };
        match self.ctx.sig_cache.get(&sig_cache_key) {
            Some(valid) => valid,
            None => {
                let crypto = self.ctx.crypto;
                let valid = match crypto.recover_pubkey(&digest, &sig_cache_key.signature) {
                    Ok(recovered) => {
                        recovered == pub_key && crypto.verify(&digest, &sig_cache_key.signature, &pub_key).unwrap_or(false)
                    }
                    Err(err) => {
                        debug!("Signature recovery failed: {err}");
                        false
                    }
                };
                self.ctx.sig_cache.insert(sig_cache_key, valid);
                valid
            }
        }
    }

    fn op_check_multisig(&mut self) -> Result<bool, TxScriptError> {
        let max_keys = self.ctx.params.max_pub_keys_per_multisig;
        let [num_keys]: [i64; 1] = self.dstack.pop_items()?;
        if num_keys < 1 || num_keys as usize > max_keys {
            return Err(TxScriptError::MalformedArgs(format!("number of pubkeys {num_keys} is outside 1..={max_keys}")));
        }
        let num_keys = num_keys as usize;

        self.num_ops += num_keys;
        if self.num_ops > self.ctx.params.max_ops_per_script {
            return Err(TxScriptError::TooManyOperations(self.ctx.params.max_ops_per_script));
        }

        let pub_keys = self.dstack.pop_n(num_keys)?;

        let [num_sigs]: [i64; 1] = self.dstack.pop_items()?;
        if num_sigs < 0 || num_sigs as usize > num_keys {
            return Err(TxScriptError::MalformedArgs(format!("number of signatures {num_sigs} is outside 0..={num_keys}")));
        }
        let num_sigs = num_sigs as usize;

        let signatures = match num_sigs {
            0 => vec![],
            n => self.dstack.pop_n(n)?,
        };
        let [message] = self.dstack.pop_raw()?;

        let mut failed = false;
        let mut pub_key_iter = pub_keys.iter();
        'outer: for (sig_idx, signature) in signatures.iter().enumerate() {
            if signature.is_empty() {
                failed = true;
                break;
            }

            // Advance through the pub_keys iterator.
            // Note every check consumes the public key
            loop {
                if pub_key_iter.len() < num_sigs - sig_idx {
                    // When there are more signatures than public keys remaining,
                    // there is no way to succeed since too many signatures are
                    // invalid, so exit early.
                    failed = true;
                    break 'outer; // Break the outer loop if pub_key_iter is exhausted
                }
                let pub_key = pub_key_iter.next().expect("checked remaining keys above");
                if self.op_check_sig(&message, signature, pub_key) {
                    break;
                }
            }
        }

        Ok(!failed)
    }

    /// OP_CHECKSIGNODATA: the signed message is the spent outpoint itself
    fn op_check_sig_no_data(&mut self) -> Result<bool, TxScriptError> {
        let [signature, pub_key] = self.dstack.pop_raw()?;
        let (Some(hash), Some(index)) = (self.env.outpoint_hash(), self.env.outpoint_index) else {
            debug!("OP_CHECKSIGNODATA requires the spent outpoint");
            return Ok(false);
        };
        let message = format!("{hash}{index:x}");
        Ok(self.op_check_sig(&message, &signature, &pub_key))
    }
}
