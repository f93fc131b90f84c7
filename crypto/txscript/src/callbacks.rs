//! Output linkage opcodes: callbacks into a linked transaction, monoid/monad output constraints
//! and the aggregate Schnorr check built on top of callbacks.

use crate::data_stack::{DataStack, deserialize_number};
use crate::opcodes::OpCode;
use crate::{MAX_SCHNACK_ARGS, TxScriptEngine, TxScriptError};
use collider_consensus_core::tx::{Transaction, TransactionOutput};
use collider_hashes::blake2bl;
use log::{debug, warn};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use secp256k1::{PublicKey, schnorr};
use smallvec::SmallVec;

const SCHNACK_VERSION: i64 = 5;
const DARK_SCHNACK_VERSION: i64 = 6;

/// Indices and values of the outputs paying a callback
pub type CallbackOutputs = SmallVec<[(usize, u128); 4]>;

/// The `input_tx` outputs matched by the last OP_CALLBACK of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackMatch {
    pub tx_hash: String,
    pub index: usize,
    pub outputs: CallbackOutputs,
}

impl CallbackMatch {
    pub fn total_value(&self) -> BigInt {
        self.outputs.iter().map(|(_, value)| BigInt::from(*value)).sum()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.outputs.iter().any(|(i, _)| *i == index)
    }
}

/// Whether `output` carries the consecutive tokens `<hash> <index> OP_CALLBACK`
fn pays_callback(output: &TransactionOutput, hash: &str, index: &BigInt) -> bool {
    let tokens = output.script_tokens().collect::<Vec<_>>();
    tokens.windows(3).any(|window| {
        window[0].eq_ignore_ascii_case(hash)
            && deserialize_number(window[1]).is_ok_and(|n| n == *index)
            && window[2].eq_ignore_ascii_case(OpCode::OpCallback.mnemonic())
    })
}

fn sum_values<'a>(outputs: impl Iterator<Item = &'a TransactionOutput>) -> BigInt {
    outputs.map(|output| BigInt::from(output.value)).sum()
}

fn sum_amounts(values: &[u128]) -> BigInt {
    values.iter().map(|value| BigInt::from(*value)).sum()
}

impl TxScriptEngine<'_> {
    fn require_input_tx(&self) -> Result<&Transaction, TxScriptError> {
        self.env.input_tx.as_ref().ok_or(TxScriptError::MissingEnvironment("input_tx"))
    }

    fn spent_value(&self) -> Option<u128> {
        self.env.spent_output().map(|output| output.value)
    }

    pub(crate) fn op_callback(&mut self) -> Result<bool, TxScriptError> {
        let [index]: [BigInt; 1] = self.dstack.pop_items()?;
        let [hash] = self.dstack.pop_raw()?;
        let input_tx = self.require_input_tx()?;

        let Some(callback_tx) = self.env.callback_tx.as_ref().filter(|tx| tx.hash.eq_ignore_ascii_case(&hash)) else {
            debug!("OP_CALLBACK: no callback transaction {hash}");
            return Ok(false);
        };
        let Some(output_index) = index.to_usize().filter(|i| callback_tx.output(*i).is_some()) else {
            debug!("OP_CALLBACK: {hash} has no output {index}");
            return Ok(false);
        };
        let Some(spent_value) = self.spent_value() else {
            debug!("OP_CALLBACK: spent output is unresolved");
            return Ok(false);
        };

        let outputs = input_tx
            .outputs
            .iter()
            .enumerate()
            .filter(|(_, output)| pays_callback(output, &hash, &index))
            .map(|(i, output)| (i, output.value))
            .collect::<CallbackOutputs>();
        if outputs.is_empty() {
            return Ok(false);
        }

        let callback_match = CallbackMatch { tx_hash: hash, index: output_index, outputs };
        let paid = callback_match.total_value() >= BigInt::from(spent_value);
        self.callback_match = Some(callback_match);
        Ok(paid)
    }

    pub(crate) fn op_monoid(&mut self) -> Result<bool, TxScriptError> {
        let input_tx = self.require_input_tx()?;
        let Some(spent) = self.env.spent_output() else {
            debug!("OP_MONOID: spent output is unresolved");
            return Ok(false);
        };
        Ok(sum_values(input_tx.outputs_with_script(&spent.script_public_key).map(|(_, output)| output)) >= BigInt::from(spent.value))
    }

    /// Values of the `input_tx` outputs re-creating the script registered under `pointer`, along
    /// with the spent value they are measured against.
    fn monad_outputs(&self, pointer: &str) -> Option<(Vec<u128>, BigInt)> {
        let Some(script) = self.env.monads.get(pointer) else {
            debug!("Monad pointer {pointer} is not registered");
            return None;
        };
        let input_tx = self.env.input_tx.as_ref()?;
        let spent_value = BigInt::from(self.spent_value()?);
        let values = input_tx.outputs_with_script(script).map(|(_, output)| output.value).collect::<Vec<_>>();
        Some((values, spent_value))
    }

    pub(crate) fn op_monad(&mut self) -> Result<bool, TxScriptError> {
        let [pointer] = self.dstack.pop_raw()?;
        Ok(match self.monad_outputs(&pointer) {
            Some((values, spent_value)) => !values.is_empty() && sum_amounts(&values) >= spent_value,
            None => false,
        })
    }

    pub(crate) fn op_monad_split(&mut self) -> Result<bool, TxScriptError> {
        let [factor]: [BigInt; 1] = self.dstack.pop_items()?;
        let [pointer] = self.dstack.pop_raw()?;
        let Some((values, spent_value)) = self.monad_outputs(&pointer) else {
            return Ok(false);
        };
        let (Some(lowest), Some(highest)) = (values.iter().min(), values.iter().max()) else {
            return Ok(false);
        };
        Ok(BigInt::from(*lowest) * factor == BigInt::from(*highest) && sum_amounts(&values) >= spent_value)
    }

    pub(crate) fn op_min_unit_value(&mut self) -> Result<bool, TxScriptError> {
        let [fee_floor, min_unit_value]: [BigInt; 2] = self.dstack.pop_items()?;
        let (Some(maker), Some(input_tx), Some(callback_match)) =
            (self.env.spent_output(), self.env.input_tx.as_ref(), self.callback_match.as_ref())
        else {
            debug!("OP_MINUNITVALUE requires the maker output, input_tx and a prior callback");
            return Ok(false);
        };

        let leftover = sum_values(input_tx.outputs_with_script(&maker.script_public_key).map(|(_, output)| output));
        let filled = BigInt::from(maker.value) - leftover;
        if filled <= BigInt::zero() {
            debug!("OP_MINUNITVALUE: nothing was filled");
            return Ok(false);
        }
        if callback_match.total_value() < filled * min_unit_value {
            return Ok(false);
        }

        if fee_floor > BigInt::zero() {
            let underpaid = input_tx.outputs.iter().enumerate().find(|(i, output)| {
                !callback_match.contains(*i)
                    && !output.has_script(&maker.script_public_key)
                    && !self.env.is_monad_script(&output.script_public_key)
                    && BigInt::from(output.value) < fee_floor
            });
            if let Some((i, output)) = underpaid {
                debug!("OP_MINUNITVALUE: output {i} carries {} below the fee floor {fee_floor}", output.value);
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn op_schnack(&mut self) -> Result<bool, TxScriptError> {
        let [version]: [BigInt; 1] = self.dstack.pop_items()?;
        match version.to_i64() {
            Some(SCHNACK_VERSION) => {}
            Some(DARK_SCHNACK_VERSION) => {
                warn!("OP_SCHNACK version {version} (dark schnorr) is disabled");
                return Ok(false);
            }
            _ => {
                debug!("OP_SCHNACK: unsupported version {version}");
                return Ok(false);
            }
        }

        let [message, hashed_r] = self.dstack.pop_raw()?;
        let [num_args]: [i64; 1] = self.dstack.pop_items()?;
        if num_args < 2 || num_args as usize > MAX_SCHNACK_ARGS {
            return Err(TxScriptError::MalformedArgs(format!("number of schnack arguments {num_args} is outside 2..={MAX_SCHNACK_ARGS}")));
        }
        let [key_hash] = self.dstack.pop_raw()?;
        let [signature] = self.dstack.pop_raw()?;
        let mut pub_keys = Vec::with_capacity(num_args as usize - 1);
        for _ in 1..num_args {
            let [pub_key] = self.dstack.pop_raw()?;
            pub_keys.push(pub_key);
        }

        if !self.check_aggregate_signature(&hashed_r, &message, &key_hash, &signature, &pub_keys) {
            return Ok(false);
        }

        for index in 0..pub_keys.len() {
            self.dstack.push(message.clone());
            self.dstack.push_item(index as i64);
            if !self.op_callback()? {
                debug!("OP_SCHNACK: callback {index} of {message} failed");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_aggregate_signature(&self, hashed_r: &str, message: &str, key_hash: &str, signature: &str, pub_keys: &[String]) -> bool {
        let crypto = self.ctx.crypto;
        let Some(pub_keys) =
            pub_keys.iter().map(|key| hex::decode(key).ok().and_then(|key| PublicKey::from_slice(&key).ok())).collect::<Option<Vec<_>>>()
        else {
            debug!("OP_SCHNACK: malformed component key");
            return false;
        };
        let Some(signature) = hex::decode(signature).ok().and_then(|signature| schnorr::Signature::from_slice(&signature).ok()) else {
            debug!("OP_SCHNACK: malformed aggregate signature");
            return false;
        };
        let combined = match crypto.combine_pubkeys(&pub_keys) {
            Ok(combined) => combined,
            Err(err) => {
                debug!("OP_SCHNACK: cannot combine keys: {err}");
                return false;
            }
        };

        if !hex::encode(blake2bl(hex::encode(combined.serialize()).as_bytes())).eq_ignore_ascii_case(key_hash) {
            debug!("OP_SCHNACK: combined key does not match its hash");
            return false;
        }
        let serialized = signature.serialize();
        let nonce = &serialized[..32];
        if !matches!(hashed_r, "" | "0") && !hex::encode(blake2bl(hex::encode(nonce).as_bytes())).eq_ignore_ascii_case(hashed_r) {
            debug!("OP_SCHNACK: nonce does not match its hash");
            return false;
        }
        crypto.verify_schnorr(&blake2bl(message.as_bytes()), &signature, &combined.x_only_public_key().0)
    }
}
