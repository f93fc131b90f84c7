pub use super::constants::script::*;
use crate::BlockHeight;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkActivation(BlockHeight);

impl ForkActivation {
    const NEVER: BlockHeight = BlockHeight::MAX;
    const ALWAYS: BlockHeight = 0;

    pub const fn new(height: BlockHeight) -> Self {
        Self(height)
    }

    pub const fn never() -> Self {
        Self(Self::NEVER)
    }

    pub const fn always() -> Self {
        Self(Self::ALWAYS)
    }

    /// Returns the actual block height triggering the activation. Activation checks
    /// should always go through `self.is_active(..)`
    pub fn height(self) -> BlockHeight {
        self.0
    }

    pub fn is_active(self, current_height: BlockHeight) -> bool {
        current_height >= self.0
    }
}

/// Script execution parameters. Every field has a consensus meaning: nodes evaluating the same
/// script with different params may reach different verdicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParams {
    pub max_ops_per_script: usize,
    pub max_stack_size: usize,
    pub max_pub_keys_per_multisig: usize,

    /// Activation of the broadcast query opcode (OP_Q). Before activation the opcode is inert.
    pub q_activation: ForkActivation,
    pub q_recency_window: u64,
    pub max_q_queries: usize,

    pub sig_cache_size: u64,
}

impl ScriptParams {
    pub fn q_enabled(&self, current_height: Option<BlockHeight>) -> bool {
        current_height.is_some_and(|height| self.q_activation.is_active(height))
    }

    pub fn with_q_activation(mut self, activation: ForkActivation) -> Self {
        self.q_activation = activation;
        self
    }
}

impl Default for ScriptParams {
    fn default() -> Self {
        MAINNET_SCRIPT_PARAMS
    }
}

pub const MAINNET_SCRIPT_PARAMS: ScriptParams = ScriptParams {
    max_ops_per_script: MAX_OPS_PER_SCRIPT,
    max_stack_size: MAX_STACK_SIZE,
    max_pub_keys_per_multisig: MAX_PUB_KEYS_PER_MULTISIG,
    q_activation: ForkActivation::never(),
    q_recency_window: Q_RECENCY_WINDOW,
    max_q_queries: MAX_Q_QUERIES,
    sig_cache_size: SIG_CACHE_SIZE,
};

pub const DEVNET_SCRIPT_PARAMS: ScriptParams = ScriptParams {
    max_ops_per_script: MAX_OPS_PER_SCRIPT,
    max_stack_size: MAX_STACK_SIZE,
    max_pub_keys_per_multisig: MAX_PUB_KEYS_PER_MULTISIG,
    q_activation: ForkActivation::always(),
    q_recency_window: Q_RECENCY_WINDOW,
    max_q_queries: MAX_Q_QUERIES,
    sig_cache_size: SIG_CACHE_SIZE,
};
