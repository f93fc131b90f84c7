use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("malformed environment: {0}")]
    Environment(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
