use collider_consensus_core::{
    BlockHeight,
    header::Header,
    marked::MarkedTransaction,
    tx::{Transaction, TransactionOutput},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category of the lookup table consulted by OP_EMERGENCY
pub const EMERGENCY_CATEGORY: &str = "emergency";

/// A value registered in the `x` lookup table, optionally expiring at a block height
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<BlockHeight>,
}

impl XEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), expires_at: None }
    }

    pub fn expiring_at(mut self, height: BlockHeight) -> Self {
        self.expires_at = Some(height);
        self
    }

    /// An entry without expiry is always live. An expiring one is live only while the current
    /// height is known and below the expiry height.
    pub fn is_live(&self, current_height: Option<BlockHeight>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => current_height.is_some_and(|height| height < expires_at),
        }
    }
}

/// Everything a script may read besides its own stack. Built once by the caller and borrowed
/// immutably by the engine for the whole run.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptEnvironment {
    /// The spending transaction
    pub input_tx: Option<Transaction>,
    /// The transaction holding the output being spent
    pub outpoint_tx: Option<Transaction>,
    pub outpoint_index: Option<u32>,
    pub outpoint_hash: Option<String>,

    pub callback_tx: Option<Transaction>,
    pub callback_tx_block: Option<Header>,

    pub latest_block: Option<Header>,
    pub outpoint_tx_block: Option<Header>,
    pub input_tx_block: Option<Header>,

    /// Pointer to expected output script
    pub monads: HashMap<String, String>,
    pub marked_txs: Vec<MarkedTransaction>,
    /// Category to key to entry
    pub x: HashMap<String, HashMap<String, XEntry>>,

    pub settled: bool,
    pub ratio: Option<u128>,
}

impl ScriptEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_tx(mut self, tx: Transaction) -> Self {
        self.input_tx = Some(tx);
        self
    }

    pub fn with_outpoint(mut self, tx: Transaction, index: u32) -> Self {
        self.outpoint_hash = Some(tx.hash.clone());
        self.outpoint_tx = Some(tx);
        self.outpoint_index = Some(index);
        self
    }

    pub fn with_outpoint_hash(mut self, hash: impl Into<String>, index: u32) -> Self {
        self.outpoint_hash = Some(hash.into());
        self.outpoint_index = Some(index);
        self
    }

    pub fn with_callback(mut self, tx: Transaction, block: Option<Header>) -> Self {
        self.callback_tx = Some(tx);
        self.callback_tx_block = block;
        self
    }

    pub fn with_latest_block(mut self, header: Header) -> Self {
        self.latest_block = Some(header);
        self
    }

    pub fn with_outpoint_tx_block(mut self, header: Header) -> Self {
        self.outpoint_tx_block = Some(header);
        self
    }

    pub fn with_input_tx_block(mut self, header: Header) -> Self {
        self.input_tx_block = Some(header);
        self
    }

    pub fn with_monad(mut self, pointer: impl Into<String>, script: impl Into<String>) -> Self {
        self.monads.insert(pointer.into(), script.into());
        self
    }

    pub fn with_marked_txs(mut self, marked_txs: Vec<MarkedTransaction>) -> Self {
        self.marked_txs = marked_txs;
        self
    }

    pub fn with_x_entry(mut self, category: impl Into<String>, key: impl Into<String>, entry: XEntry) -> Self {
        self.x.entry(category.into()).or_default().insert(key.into(), entry);
        self
    }

    pub fn with_settled(mut self, settled: bool) -> Self {
        self.settled = settled;
        self
    }

    pub fn with_ratio(mut self, ratio: u128) -> Self {
        self.ratio = Some(ratio);
        self
    }

    /// Height the script is evaluated at: the block including the spending transaction if known,
    /// otherwise the chain tip.
    pub fn current_height(&self) -> Option<BlockHeight> {
        self.input_tx_block.as_ref().or(self.latest_block.as_ref()).map(|header| header.height)
    }

    /// The output being spent, resolved from the outpoint transaction and index
    pub fn spent_output(&self) -> Option<&TransactionOutput> {
        self.outpoint_tx.as_ref()?.output(self.outpoint_index? as usize)
    }

    /// Hash of the transaction holding the spent output
    pub fn outpoint_hash(&self) -> Option<&str> {
        self.outpoint_hash.as_deref().or_else(|| self.outpoint_tx.as_ref().map(|tx| tx.id()))
    }

    /// Divisor applied to MAKERCOLL units; a missing or zero ratio counts as 1
    pub fn effective_ratio(&self) -> u128 {
        match self.ratio {
            Some(ratio) if ratio > 0 => ratio,
            _ => 1,
        }
    }

    pub fn x_entry(&self, category: &str, key: &str) -> Option<&XEntry> {
        self.x.get(category)?.get(key)
    }

    /// Output scripts registered in the monad table
    pub fn is_monad_script(&self, script: &str) -> bool {
        self.monads.values().any(|monad| monad.split_whitespace().eq(script.split_whitespace()))
    }
}
