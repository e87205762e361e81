use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("SFU engine error: {0}")]
    Engine(String),

    #[error("Cannot consume producer {0} with the given capabilities")]
    Incompatible(String),

    #[error("Transcoder process failure: {0}")]
    ProcessFailure(String),

    #[error("Ingest source initialization failed: {0}")]
    FatalInit(String),

    #[error("Invalid RTSP URL: {0}")]
    InvalidRtspUrl(String),

    #[error("Invalid port: port cannot be zero")]
    InvalidPort,

    #[error("Invalid restart policy: {0}")]
    InvalidRestartPolicy(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn engine(detail: impl std::fmt::Display) -> Self {
        Self::Engine(detail.to_string())
    }

    /// Message safe to hand back to a signaling client.
    ///
    /// Engine failures are reported generically; their detail only goes to the log.
    pub fn client_message(&self) -> String {
        match self {
            Self::Engine(_) => "SFU engine request failed".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
