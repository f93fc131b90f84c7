use crate::BlockHeight;
use serde::{Deserialize, Serialize};

/// The slice of a block header the script engine reads: its hash and height.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub hash: String,
    pub height: BlockHeight,
}

impl Header {
    pub fn new(hash: impl Into<String>, height: BlockHeight) -> Self {
        Self { hash: hash.into(), height }
    }

    /// Header with a placeholder hash, used where only the height matters
    pub fn from_height(height: BlockHeight) -> Self {
        Self { hash: String::new(), height }
    }
}
