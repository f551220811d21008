use thiserror::Error;

/// Runtime errors surfaced by the control loop and session logger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The serial link reported a hard failure; the reader has stopped and
    /// will not be restarted.
    #[error("serial link lost: {0}")]
    Disconnected(String),

    /// Session storage could not be prepared (directory creation, encoding).
    #[error("session storage error: {0}")]
    SessionIo(String),

    /// A finished session could not be persisted; its rows are retained in
    /// memory so a later disable can retry the write.
    #[error("session not persisted: {0}")]
    SessionBusy(String),
}

/// Construction-time errors for control-loop parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
