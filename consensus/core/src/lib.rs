pub mod config;
pub mod header;
pub mod marked;
pub mod tx;

/// Block heights, as reported by block headers and used by time-window opcodes
pub type BlockHeight = u64;
