use crate::domain::value_objects::IngestState;

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_session_opened(&self);
    fn report_session_closed(&self);
    fn report_live_producers(&self, count: usize);
    fn report_request(&self, event: &str, ok: bool);
    fn report_ingest_state(&self, source: &str, state: &IngestState);
    fn report_ingest_restart(&self, source: &str);
}
