use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Store returned no representation for {0}")]
    Missing(&'static str),
}

impl StoreError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) => true,
            StoreError::Status { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}
