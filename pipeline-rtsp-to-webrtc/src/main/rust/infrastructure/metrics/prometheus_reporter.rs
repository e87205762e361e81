use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::IngestState;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref ACTIVE_SESSIONS: IntGauge = IntGauge::new(
        "webrtc_active_sessions",
        "Number of open signaling sessions"
    ).expect("metric can be created");

    pub static ref LIVE_PRODUCERS: IntGauge = IntGauge::new(
        "webrtc_live_producers",
        "Number of producers available for consumption"
    ).expect("metric can be created");

    pub static ref SIGNALING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("signaling_requests_total", "Signaling requests handled"),
        &["event", "outcome"]
    ).expect("metric can be created");

    // Ingest state (0=Idle, 1=Starting, 2=Running, 3=Exited, 4=Disabled)
    pub static ref INGEST_STATE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("ingest_state", "Current transcoder state per RTSP source"),
        &["source"]
    ).expect("metric can be created");

    pub static ref INGEST_RESTARTS: IntCounterVec = IntCounterVec::new(
        Opts::new("ingest_restarts_total", "Transcoder relaunches per RTSP source"),
        &["source"]
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(ACTIVE_SESSIONS.clone()))?;
        REGISTRY.register(Box::new(LIVE_PRODUCERS.clone()))?;
        REGISTRY.register(Box::new(SIGNALING_REQUESTS.clone()))?;
        REGISTRY.register(Box::new(INGEST_STATE.clone()))?;
        REGISTRY.register(Box::new(INGEST_RESTARTS.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_session_opened(&self) {
        ACTIVE_SESSIONS.inc();
    }

    fn report_session_closed(&self) {
        ACTIVE_SESSIONS.dec();
    }

    fn report_live_producers(&self, count: usize) {
        LIVE_PRODUCERS.set(count as i64);
    }

    fn report_request(&self, event: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        SIGNALING_REQUESTS.with_label_values(&[event, outcome]).inc();
    }

    fn report_ingest_state(&self, source: &str, state: &IngestState) {
        INGEST_STATE.with_label_values(&[source]).set(state.as_metric());
    }

    fn report_ingest_restart(&self, source: &str) {
        INGEST_RESTARTS.with_label_values(&[source]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_ingest_state_per_source() {
        let reporter = PrometheusReporter::new();
        reporter.report_ingest_state("rtsp://cam-a", &IngestState::Running);
        reporter.report_ingest_restart("rtsp://cam-a");

        assert_eq!(INGEST_STATE.with_label_values(&["rtsp://cam-a"]).get(), 2);
        assert!(INGEST_RESTARTS.with_label_values(&["rtsp://cam-a"]).get() >= 1);
    }

    #[test]
    fn test_request_outcomes_are_labelled() {
        let reporter = PrometheusReporter::new();
        let before = SIGNALING_REQUESTS.with_label_values(&["consume", "error"]).get();
        reporter.report_request("consume", false);
        assert_eq!(
            SIGNALING_REQUESTS.with_label_values(&["consume", "error"]).get(),
            before + 1
        );
    }
}
