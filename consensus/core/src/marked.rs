use crate::BlockHeight;
use serde::{Deserialize, Serialize};

/// A transfer observed on a foreign chain and flagged for cross-chain settlement accounting.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedTransaction {
    /// Chain identifier, e.g. `btc` or `eth`
    pub chain: String,
    #[serde(default)]
    pub token: String,
    pub from: String,
    pub to: String,
    pub value: u128,
    #[serde(default)]
    pub block_height: BlockHeight,
    #[serde(default)]
    pub hash: String,
}

impl MarkedTransaction {
    pub fn new(chain: impl Into<String>, from: impl Into<String>, to: impl Into<String>, value: u128) -> Self {
        Self { chain: chain.into(), token: String::new(), from: from.into(), to: to.into(), value, block_height: 0, hash: String::new() }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_block_height(mut self, block_height: BlockHeight) -> Self {
        self.block_height = block_height;
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }
}
