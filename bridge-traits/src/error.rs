use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the error came from the local filesystem rather than a remote call
    pub fn is_io(&self) -> bool {
        matches!(self, BridgeError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
