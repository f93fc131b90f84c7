use crate::asm::ScriptToken;
use crate::data_stack::deserialize_number;
use crate::opcodes::OpCode;
use crate::script_builder::{ScriptBuilder, ScriptBuilderError};
use collider_consensus_core::config::constants::script::MAX_PUB_KEYS_PER_MULTISIG;
use collider_txscript_errors::TxScriptError;
use num_traits::ToPrimitive;
use secp256k1::PublicKey;
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum Error {
    #[error("too many required signatures")]
    ErrTooManyRequiredSigs,
    #[error("{0} public keys exceed the multisig limit of {MAX_PUB_KEYS_PER_MULTISIG}")]
    TooManyKeys(usize),
    #[error(transparent)]
    ScriptBuilderError(#[from] ScriptBuilderError),
    #[error("provided public keys should not be empty")]
    EmptyKeys,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MultiSigScriptParameters {
    pub required_signatures_count: usize,
    pub signers_count: usize,
    pub signers_pubkey: Vec<PublicKey>,
}

/// Generates a `required`-of-`pub_keys.len()` locking script:
///   `<M> <pubkey1> ... <pubkeyN> <N> OP_CHECKMULTISIG`
///
/// Signatures are matched in key order, so spenders must provide them in the same order.
pub fn multisig_script(pub_keys: &[PublicKey], required: usize) -> Result<Vec<ScriptToken>, Error> {
    if pub_keys.is_empty() {
        return Err(Error::EmptyKeys);
    }
    if pub_keys.len() < required {
        return Err(Error::ErrTooManyRequiredSigs);
    }
    if pub_keys.len() > MAX_PUB_KEYS_PER_MULTISIG {
        return Err(Error::TooManyKeys(pub_keys.len()));
    }

    let mut builder = ScriptBuilder::new();
    builder.add_i64(required as i64)?;
    for pub_key in pub_keys {
        builder.add_data(&hex::encode(pub_key.serialize()))?;
    }
    builder.add_i64(pub_keys.len() as i64)?;
    builder.add_op(OpCode::OpCheckMultiSig)?;
    Ok(builder.drain())
}

fn token_count(token: &ScriptToken) -> Result<usize, TxScriptError> {
    let count = match token {
        ScriptToken::Op(OpCode::Op0) => Some(0),
        ScriptToken::Op(OpCode::Op1) => Some(1),
        ScriptToken::Op(OpCode::Op2) => Some(2),
        ScriptToken::Op(OpCode::Op3) => Some(3),
        ScriptToken::Data(data) => deserialize_number(data)?.to_usize(),
        ScriptToken::Op(opcode) => return Err(TxScriptError::MalformedArgs(format!("expected a count, found {opcode}"))),
    };
    count.ok_or_else(|| TxScriptError::MalformedArgs(format!("count {token} is negative or too large")))
}

fn out_of_bounds() -> TxScriptError {
    TxScriptError::InvalidState("index out of bounds".into())
}

/// Extract parameters from a standard multisig script:
///   `<M> <pubkey1> ... <pubkeyN> <N> OP_CHECKMULTISIG`
pub fn get_multisig_params(tokens: &[ScriptToken], checkmultisig_index: usize) -> Result<MultiSigScriptParameters, TxScriptError> {
    if tokens.get(checkmultisig_index) != Some(&ScriptToken::Op(OpCode::OpCheckMultiSig)) {
        return Err(TxScriptError::InvalidState(format!("token {checkmultisig_index} is not OP_CHECKMULTISIG")));
    }

    let pubkeys_end = checkmultisig_index.checked_sub(1).ok_or_else(out_of_bounds)?;
    let n = token_count(&tokens[pubkeys_end])?;
    if n == 0 || n > MAX_PUB_KEYS_PER_MULTISIG {
        return Err(TxScriptError::MalformedArgs(format!("number of pubkeys {n} is outside 1..={MAX_PUB_KEYS_PER_MULTISIG}")));
    }

    let pubkeys_start = pubkeys_end.checked_sub(n).ok_or_else(out_of_bounds)?;
    let signers_pubkey = tokens[pubkeys_start..pubkeys_end]
        .iter()
        .map(|token| match token {
            ScriptToken::Data(data) => hex::decode(data)
                .ok()
                .and_then(|bytes| PublicKey::from_slice(&bytes).ok())
                .ok_or_else(|| TxScriptError::MalformedArgs(format!("malformed public key {data}"))),
            ScriptToken::Op(opcode) => Err(TxScriptError::MalformedArgs(format!("expected a public key, found {opcode}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let m = token_count(tokens.get(pubkeys_start.checked_sub(1).ok_or_else(out_of_bounds)?).ok_or_else(out_of_bounds)?)?;
    if m > n {
        return Err(TxScriptError::MalformedArgs(format!("number of signatures {m} is outside 0..={n}")));
    }

    Ok(MultiSigScriptParameters { required_signatures_count: m, signers_count: n, signers_pubkey })
}
