use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("capture already in progress")]
    CaptureInProgress,
    #[error("sample buffer full")]
    BufferFull,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    /// The report sink could not be written.
    #[error("report output failed: {0}")]
    Sink(String),
}

impl RigError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing motor")]
    MissingMotor,
    #[error("missing clock")]
    MissingClock,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Result type of the typed core operations.
pub type RigResult<T> = std::result::Result<T, RigError>;

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
