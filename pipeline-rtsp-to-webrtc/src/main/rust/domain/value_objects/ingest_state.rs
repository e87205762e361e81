use std::fmt;

use serde::Serialize;

/// Lifecycle states of a supervised ingest source (pure domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IngestState {
    /// Not started yet
    #[default]
    Idle,
    /// Transcoder is being launched
    Starting,
    /// Transcoder process is alive
    Running,
    /// Transcoder exited; a restart is pending
    Exited { code: Option<i32> },
    /// Permanently stopped: init failure, restart ceiling or shutdown
    Disabled,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Starting => write!(f, "STARTING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Exited { code: Some(code) } => write!(f, "EXITED (code {})", code),
            Self::Exited { code: None } => write!(f, "EXITED (signal)"),
            Self::Disabled => write!(f, "DISABLED"),
        }
    }
}

impl IngestState {
    /// Convert state to numeric value for metrics
    pub fn as_metric(&self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::Starting => 1,
            Self::Running => 2,
            Self::Exited { .. } => 3,
            Self::Disabled => 4,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}
