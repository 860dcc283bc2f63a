use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IrError {
    /// Malformed or missing configuration; only raised while building a session.
    #[error("configuration error: {0}")]
    Config(String),
    /// The caller asked for something the codebook or calibration does not provide.
    #[error("action not configured: {0}")]
    Unconfigured(String),
    #[error("transmit error: {0}")]
    Transmit(String),
    #[error("timeout talking to the transmitter")]
    Timeout,
    #[error("invalid request: {0}")]
    State(String),
}

impl IrError {
    /// True for failures reported by the transmitter collaborator.
    pub fn is_transmit(&self) -> bool {
        matches!(self, IrError::Transmit(_) | IrError::Timeout)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing transmitter")]
    MissingTransmitter,
    #[error("missing codebook")]
    MissingCodebook,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<BuildError> for IrError {
    fn from(e: BuildError) -> Self {
        IrError::Config(e.to_string())
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
