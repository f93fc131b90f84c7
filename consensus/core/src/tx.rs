use serde::{Deserialize, Serialize};

/// Represents the ID of a Collider transaction, the lowercase hex of its hash
pub type TransactionId = String;

/// Represents a Collider transaction outpoint
#[derive(Eq, Hash, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: impl Into<TransactionId>, index: u32) -> Self {
        Self { transaction_id: transaction_id.into(), index }
    }
}

/// Represents a Collider transaction input
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    /// Unlocking script in ASM text
    pub signature_script: String,
    #[serde(default)]
    pub sequence: u64,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: impl Into<String>, sequence: u64) -> Self {
        Self { previous_outpoint, signature_script: signature_script.into(), sequence }
    }
}

/// Represents a Collider transaction output
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u128,
    /// Locking script in ASM text
    pub script_public_key: String,
}

impl TransactionOutput {
    pub fn new(value: u128, script_public_key: impl Into<String>) -> Self {
        Self { value, script_public_key: script_public_key.into() }
    }

    /// Whitespace separated tokens of the locking script
    pub fn script_tokens(&self) -> impl Iterator<Item = &str> {
        self.script_public_key.split_whitespace()
    }

    /// Compares locking scripts token-wise, ignoring whitespace differences.
    pub fn has_script(&self, script: &str) -> bool {
        self.script_tokens().eq(script.split_whitespace())
    }
}

/// Represents a Collider transaction
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: TransactionId,
    #[serde(default)]
    pub version: u16,
    #[serde(default)]
    pub inputs: Vec<TransactionInput>,
    #[serde(default)]
    pub outputs: Vec<TransactionOutput>,
    #[serde(default)]
    pub lock_time: u64,
}

impl Transaction {
    pub fn new(
        hash: impl Into<TransactionId>,
        version: u16,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u64,
    ) -> Self {
        Self { hash: hash.into(), version, inputs, outputs, lock_time }
    }

    pub fn id(&self) -> &str {
        &self.hash
    }

    pub fn output(&self, index: usize) -> Option<&TransactionOutput> {
        self.outputs.get(index)
    }

    /// Outputs (with their indices) whose locking script equals `script`
    pub fn outputs_with_script<'a>(&'a self, script: &'a str) -> impl Iterator<Item = (usize, &'a TransactionOutput)> + 'a {
        self.outputs.iter().enumerate().filter(move |(_, output)| output.has_script(script))
    }
}
