use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::SessionRegistry;
use crate::domain::entities::{IngestLifecycle, StateTransition};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{MetricsReporter, SfuEngine, TranscoderLauncher, TranscoderProcess};
use crate::domain::value_objects::{
    IngestProfile, IngestSourceConfig, IngestState, PlainTransportOptions, ProducerId,
    RestartPolicy, TransportId,
};

/// Static settings of the ingest supervisor
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub sources: Vec<IngestSourceConfig>,
    pub profile: IngestProfile,
    pub policy: RestartPolicy,
    pub listen_ip: IpAddr,
    pub announced_ip: Option<IpAddr>,
}

/// Point-in-time view of one source, served on `/ingest`
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatus {
    pub rtsp_url: String,
    pub rtp_port: u16,
    pub lifecycle: IngestState,
    pub restart_count: u32,
    pub producer_id: Option<ProducerId>,
    pub pid: Option<u32>,
    /// Seconds the current transcoder run has been up
    pub uptime_secs: Option<u64>,
    /// Most recent transitions, oldest first
    pub transitions: Vec<IngestTransition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestTransition {
    pub from: IngestState,
    pub to: IngestState,
    pub secs_ago: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&StateTransition> for IngestTransition {
    fn from(transition: &StateTransition) -> Self {
        Self {
            from: transition.from,
            to: transition.to,
            secs_ago: transition.timestamp.elapsed().as_secs(),
            reason: transition.reason.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct SourceRuntime {
    lifecycle: IngestLifecycle,
    transport_id: Option<TransportId>,
    producer_id: Option<ProducerId>,
    pid: Option<u32>,
}

#[derive(Debug)]
struct IngestSource {
    config: IngestSourceConfig,
    runtime: Mutex<SourceRuntime>,
}

impl IngestSource {
    fn new(config: IngestSourceConfig) -> Self {
        Self {
            config,
            runtime: Mutex::new(SourceRuntime::default()),
        }
    }

    fn runtime(&self) -> MutexGuard<'_, SourceRuntime> {
        self.runtime.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn status(&self) -> IngestStatus {
        let runtime = self.runtime();
        IngestStatus {
            rtsp_url: self.config.redacted_url(),
            rtp_port: self.config.rtp_port(),
            lifecycle: *runtime.lifecycle.current_state(),
            restart_count: runtime.lifecycle.restart_count(),
            producer_id: runtime.producer_id.clone(),
            pid: runtime.pid,
            uptime_secs: runtime.lifecycle.uptime().map(|uptime| uptime.as_secs()),
            transitions: runtime.lifecycle.history().map(IngestTransition::from).collect(),
        }
    }
}

/// Keeps every configured RTSP source alive as an SFU producer
///
/// Each source gets one plain transport and one producer at startup. Only the
/// transcoder process is restarted afterwards; transport and producer are
/// reused so the producer id never changes.
pub struct IngestSupervisor {
    engine: Arc<dyn SfuEngine>,
    registry: Arc<SessionRegistry>,
    launcher: Arc<dyn TranscoderLauncher>,
    metrics: Arc<dyn MetricsReporter>,
    profile: IngestProfile,
    policy: RestartPolicy,
    listen_ip: IpAddr,
    announced_ip: Option<IpAddr>,
    sources: Vec<Arc<IngestSource>>,
}

impl IngestSupervisor {
    pub fn new(
        engine: Arc<dyn SfuEngine>,
        registry: Arc<SessionRegistry>,
        launcher: Arc<dyn TranscoderLauncher>,
        metrics: Arc<dyn MetricsReporter>,
        settings: IngestSettings,
    ) -> Self {
        let sources = settings
            .sources
            .into_iter()
            .map(|config| Arc::new(IngestSource::new(config)))
            .collect();

        Self {
            engine,
            registry,
            launcher,
            metrics,
            profile: settings.profile,
            policy: settings.policy,
            listen_ip: settings.listen_ip,
            announced_ip: settings.announced_ip,
            sources,
        }
    }

    pub fn snapshot(&self) -> Vec<IngestStatus> {
        self.sources.iter().map(|source| source.status()).collect()
    }

    /// Create transports/producers for every source and spawn one supervision
    /// task per source that initialized successfully.
    pub async fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            if let Err(e) = self.initialize_source(source).await {
                tracing::error!(
                    source = %source.config.redacted_url(),
                    rtp_port = source.config.rtp_port(),
                    error = %e,
                    "Ingest source disabled"
                );
                let state = {
                    let mut runtime = source.runtime();
                    runtime.lifecycle.transition_to_disabled(Some(e.to_string()));
                    *runtime.lifecycle.current_state()
                };
                self.log_transition(source, &state, 0);
                continue;
            }

            let supervisor = Arc::clone(self);
            let source = Arc::clone(source);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                supervisor.supervise(source, shutdown).await;
            }));
        }

        handles
    }

    async fn initialize_source(&self, source: &IngestSource) -> Result<()> {
        let port = source.config.rtp_port();
        let options = PlainTransportOptions::new(self.listen_ip, self.announced_ip, port);

        let transport = self
            .engine
            .create_plain_transport(&options)
            .await
            .map_err(|e| DomainError::FatalInit(format!("plain transport on port {}: {}", port, e)))?;

        let producer_id = match self
            .engine
            .produce(
                &transport.id,
                self.profile.kind(),
                self.profile.producer_rtp_parameters(),
            )
            .await
        {
            Ok(producer_id) => producer_id,
            Err(e) => {
                self.engine.close_transport(&transport.id).await;
                return Err(DomainError::FatalInit(format!("producer on port {}: {}", port, e)));
            }
        };

        {
            let mut runtime = source.runtime();
            runtime.transport_id = Some(transport.id.clone());
            runtime.producer_id = Some(producer_id.clone());
        }

        self.registry.add_ingest_producer(producer_id.clone(), port);
        self.metrics
            .report_live_producers(self.registry.live_producers().len());

        tracing::info!(
            source = %source.config.redacted_url(),
            rtp_port = port,
            transport_id = %transport.id,
            %producer_id,
            "Ingest producer created"
        );
        Ok(())
    }

    /// Restart loop of one source: `Starting -> Running -> Exited -> Starting ...`
    async fn supervise(&self, source: Arc<IngestSource>, mut shutdown: watch::Receiver<bool>) {
        let job = self
            .profile
            .job(source.config.rtsp_url(), self.listen_ip, source.config.rtp_port());
        let mut delay = self.policy.initial_delay();

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.transition(&source, |lifecycle| lifecycle.transition_to_starting());

            let exit = match self.launcher.launch(&job).await {
                Ok(mut process) => {
                    source.runtime().pid = process.pid();
                    self.transition(&source, |lifecycle| lifecycle.transition_to_running());

                    let exit = tokio::select! {
                        exit = process.wait() => Some(exit),
                        _ = shutdown.changed() => None,
                    };
                    match exit {
                        Some(exit) => exit,
                        None => {
                            Self::stop_process(process.as_mut()).await;
                            break;
                        }
                    }
                }
                Err(e) => Err(e),
            };

            source.runtime().pid = None;
            let (code, reason) = match exit {
                Ok(code) => (code, None),
                Err(e) => {
                    tracing::warn!(source = %source.config.redacted_url(), error = %e, "Transcoder failed");
                    (None, Some(e.to_string()))
                }
            };

            let ran_for = {
                let mut runtime = source.runtime();
                runtime.lifecycle.transition_to_exited(code, reason)
            };
            self.log_current(&source);

            if ran_for.is_some_and(|run| self.policy.is_stable_run(run)) {
                delay = self.policy.initial_delay();
            }

            if !source.runtime().lifecycle.should_restart(&self.policy) {
                self.transition(&source, |lifecycle| {
                    lifecycle.transition_to_disabled(Some("restart limit reached".to_string()))
                });
                self.retire_source(&source).await;
                return;
            }

            tracing::info!(
                source = %source.config.redacted_url(),
                delay_secs = delay.as_secs_f64(),
                "Restarting transcoder after delay"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }

            self.metrics.report_ingest_restart(&source.config.redacted_url());
            delay = self.policy.next_delay(delay);
        }

        self.transition(&source, |lifecycle| {
            lifecycle.transition_to_disabled(Some("shutdown".to_string()))
        });
    }

    /// Withdraw the producer of a source that will not run again
    async fn retire_source(&self, source: &IngestSource) {
        let (transport_id, producer_id) = {
            let mut runtime = source.runtime();
            (runtime.transport_id.take(), runtime.producer_id.take())
        };

        if let Some(producer_id) = producer_id {
            if self.registry.remove_ingest_producer(&producer_id) {
                self.metrics
                    .report_live_producers(self.registry.live_producers().len());
            }
            tracing::info!(source = %source.config.redacted_url(), %producer_id, "Ingest producer withdrawn");
        }
        if let Some(transport_id) = transport_id {
            self.engine.close_transport(&transport_id).await;
        }
    }

    async fn stop_process(process: &mut dyn TranscoderProcess) {
        if let Err(e) = process.kill().await {
            tracing::warn!(error = %e, "Failed to kill transcoder");
        }
    }

    fn transition(&self, source: &IngestSource, apply: impl FnOnce(&mut IngestLifecycle)) {
        apply(&mut source.runtime().lifecycle);
        self.log_current(source);
    }

    fn log_current(&self, source: &IngestSource) {
        let (state, restarts) = {
            let runtime = source.runtime();
            (*runtime.lifecycle.current_state(), runtime.lifecycle.restart_count())
        };
        self.log_transition(source, &state, restarts);
    }

    fn log_transition(&self, source: &IngestSource, state: &IngestState, restarts: u32) {
        let url = source.config.redacted_url();
        self.metrics.report_ingest_state(&url, state);
        match state {
            IngestState::Exited { .. } | IngestState::Disabled => {
                tracing::warn!(source = %url, %state, restarts, "Ingest state changed")
            }
            _ => tracing::info!(source = %url, %state, restarts, "Ingest state changed"),
        }
    }
}
