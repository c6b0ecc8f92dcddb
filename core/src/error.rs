use thiserror::Error;

/// Failures of the case store.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("No fraud case for customer '{name}'")]
    NotFound { name: String },

    #[error("Fraud case for '{name}' is already {status}")]
    AlreadyResolved { name: String, status: String },

    #[error("Cannot set status of '{name}' to {status}")]
    InvalidTransition { name: String, status: String },

    #[error("Duplicate fraud case for customer '{name}'")]
    DuplicateCase { name: String },

    #[error("Case store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Case store format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Case store lock poisoned")]
    Poisoned,
}

pub type CaseResult<T> = Result<T, CaseError>;

/// Failures of the call/media pipeline. Opaque to the desk: any of these
/// ends the call without a closing line.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Caller hung up")]
    HungUp,

    #[error("Audio pipeline failure: {0}")]
    Media(String),

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DeskError {
    #[error(transparent)]
    Case(#[from] CaseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Call log error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
