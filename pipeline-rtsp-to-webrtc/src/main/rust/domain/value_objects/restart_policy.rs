use std::time::Duration;

use crate::domain::errors::{DomainError, Result};

/// Restart policy for supervised transcoder processes
///
/// The default is a fixed 5 second delay with no ceiling on attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_restarts: Option<u32>,
}

impl RestartPolicy {
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_restarts: Option<u32>,
    ) -> Result<Self> {
        if !(multiplier >= 1.0) {
            return Err(DomainError::InvalidRestartPolicy(
                "multiplier must be >= 1.0".to_string(),
            ));
        }

        if max_delay < initial_delay {
            return Err(DomainError::InvalidRestartPolicy(format!(
                "max delay {:?} is shorter than initial delay {:?}",
                max_delay, initial_delay
            )));
        }

        Ok(Self {
            initial_delay,
            max_delay,
            multiplier,
            max_restarts,
        })
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            max_restarts: None,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn max_restarts(&self) -> Option<u32> {
        self.max_restarts
    }

    /// Calculate the next delay based on the current one
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next = Duration::from_secs_f64(current.as_secs_f64() * self.multiplier);
        next.min(self.max_delay)
    }

    /// Whether another restart is allowed after `restarts` restarts already happened
    pub fn allows_restart(&self, restarts: u32) -> bool {
        match self.max_restarts {
            Some(max) => restarts < max,
            None => true,
        }
    }

    /// A run at least this long counts as stable and resets the delay.
    pub fn is_stable_run(&self, run: Duration) -> bool {
        run >= self.max_delay
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}
