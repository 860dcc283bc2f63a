use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("link error: {0}")]
    Link(String),
    #[error("blaster timeout")]
    Timeout,
    #[error("rejected payload: {0}")]
    Payload(String),
}
