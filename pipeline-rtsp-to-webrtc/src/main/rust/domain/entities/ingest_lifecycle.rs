use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::domain::value_objects::{IngestState, RestartPolicy};

/// State transition record
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: IngestState,
    pub to: IngestState,
    pub timestamp: Instant,
    pub reason: Option<String>,
}

/// Transitions kept per source; older ones are dropped first.
pub const MAX_HISTORY: usize = 32;

/// Lifecycle of one ingest source's transcoder
///
/// `Idle -> Starting -> Running -> Exited -> Starting -> ...`, with `Disabled`
/// as the only terminal state. Only the last [`MAX_HISTORY`] transitions are
/// retained, since an unlimited restart policy cycles forever.
#[derive(Debug)]
pub struct IngestLifecycle {
    current_state: IngestState,
    state_history: VecDeque<StateTransition>,
    transition_count: u64,
    restart_count: u32,
    running_since: Option<Instant>,
}

impl IngestLifecycle {
    pub fn new() -> Self {
        Self {
            current_state: IngestState::Idle,
            state_history: VecDeque::with_capacity(MAX_HISTORY),
            transition_count: 0,
            restart_count: 0,
            running_since: None,
        }
    }

    pub fn current_state(&self) -> &IngestState {
        &self.current_state
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// How long the current transcoder run has been alive
    pub fn uptime(&self) -> Option<Duration> {
        self.running_since.map(|start| start.elapsed())
    }

    /// Transitions made since creation, including those no longer retained
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.state_history.back()
    }

    /// Retained transitions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.state_history.iter()
    }

    /// Transition to starting; counts as a restart unless this is the first launch
    pub fn transition_to_starting(&mut self) {
        if matches!(self.current_state, IngestState::Exited { .. }) {
            self.restart_count += 1;
        }
        self.record_transition(IngestState::Starting, None);
    }

    pub fn transition_to_running(&mut self) {
        self.record_transition(IngestState::Running, None);
        self.running_since = Some(Instant::now());
    }

    /// Returns how long the process ran, if it got to running.
    pub fn transition_to_exited(&mut self, code: Option<i32>, reason: Option<String>) -> Option<Duration> {
        let ran_for = self.running_since.take().map(|start| start.elapsed());
        self.record_transition(IngestState::Exited { code }, reason);
        ran_for
    }

    pub fn transition_to_disabled(&mut self, reason: Option<String>) {
        self.running_since = None;
        self.record_transition(IngestState::Disabled, reason);
    }

    fn record_transition(&mut self, new_state: IngestState, reason: Option<String>) {
        let transition = StateTransition {
            from: self.current_state,
            to: new_state,
            timestamp: Instant::now(),
            reason,
        };

        if self.state_history.len() == MAX_HISTORY {
            self.state_history.pop_front();
        }
        self.state_history.push_back(transition);
        self.transition_count += 1;
        self.current_state = new_state;
    }

    /// Pure business rule: should the transcoder be relaunched?
    pub fn should_restart(&self, policy: &RestartPolicy) -> bool {
        matches!(self.current_state, IngestState::Exited { .. })
            && policy.allows_restart(self.restart_count)
    }
}

impl Default for IngestLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let lifecycle = IngestLifecycle::new();
        assert_eq!(*lifecycle.current_state(), IngestState::Idle);
        assert_eq!(lifecycle.transition_count(), 0);
        assert_eq!(lifecycle.restart_count(), 0);
    }

    #[test]
    fn test_restart_loop_is_tracked() {
        let mut lifecycle = IngestLifecycle::new();

        lifecycle.transition_to_starting();
        lifecycle.transition_to_running();
        lifecycle.transition_to_exited(Some(1), None);
        lifecycle.transition_to_starting();

        assert_eq!(lifecycle.transition_count(), 4);
        assert_eq!(lifecycle.restart_count(), 1);
        assert_eq!(*lifecycle.current_state(), IngestState::Starting);

        let last = lifecycle.last_transition().unwrap();
        assert_eq!(last.from, IngestState::Exited { code: Some(1) });
        assert_eq!(last.to, IngestState::Starting);
    }

    #[test]
    fn test_history_is_bounded_under_endless_restarts() {
        let mut lifecycle = IngestLifecycle::new();

        for attempt in 0..10_000 {
            lifecycle.transition_to_starting();
            lifecycle.transition_to_running();
            lifecycle.transition_to_exited(Some(attempt), None);
        }

        assert_eq!(lifecycle.transition_count(), 30_000);
        assert_eq!(lifecycle.history().count(), MAX_HISTORY);
        assert_eq!(lifecycle.restart_count(), 9_999);

        let oldest = lifecycle.history().next().unwrap();
        let newest = lifecycle.last_transition().unwrap();
        assert!(oldest.timestamp <= newest.timestamp);
        assert_eq!(newest.to, IngestState::Exited { code: Some(9_999) });
    }

    #[test]
    fn test_first_start_is_not_a_restart() {
        let mut lifecycle = IngestLifecycle::new();
        lifecycle.transition_to_starting();
        assert_eq!(lifecycle.restart_count(), 0);
    }

    #[test]
    fn test_uptime_tracking() {
        let mut lifecycle = IngestLifecycle::new();
        assert!(lifecycle.uptime().is_none());

        lifecycle.transition_to_starting();
        lifecycle.transition_to_running();
        std::thread::sleep(std::time::Duration::from_millis(10));

        let uptime = lifecycle.uptime().unwrap();
        assert!(uptime.as_millis() >= 10);

        let ran_for = lifecycle.transition_to_exited(None, None).unwrap();
        assert!(ran_for.as_millis() >= 10);
        assert!(lifecycle.uptime().is_none());
    }

    #[test]
    fn test_spawn_failure_reports_no_run_time() {
        let mut lifecycle = IngestLifecycle::new();
        lifecycle.transition_to_starting();
        let ran_for = lifecycle.transition_to_exited(None, Some("spawn failed".to_string()));
        assert!(ran_for.is_none());
        assert_eq!(
            lifecycle.last_transition().unwrap().reason.as_deref(),
            Some("spawn failed")
        );
    }

    #[test]
    fn test_should_restart() {
        let policy = RestartPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            1.0,
            Some(1),
        )
        .unwrap();
        let mut lifecycle = IngestLifecycle::new();

        lifecycle.transition_to_starting();
        assert!(!lifecycle.should_restart(&policy));

        lifecycle.transition_to_exited(Some(1), None);
        assert!(lifecycle.should_restart(&policy));

        lifecycle.transition_to_starting();
        lifecycle.transition_to_exited(Some(1), None);
        assert!(!lifecycle.should_restart(&policy));

        // Unlimited policy never gives up
        assert!(lifecycle.should_restart(&RestartPolicy::default()));
    }

    #[test]
    fn test_disabled_is_terminal() {
        let mut lifecycle = IngestLifecycle::new();
        lifecycle.transition_to_disabled(Some("engine refused transport".to_string()));
        assert!(lifecycle.current_state().is_terminal());
        assert!(!lifecycle.should_restart(&RestartPolicy::default()));
    }
}
