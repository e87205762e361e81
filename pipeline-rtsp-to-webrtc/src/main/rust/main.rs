use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use pipeline_rtsp_to_webrtc::{
    serve, Config, EngineKind, FfmpegLauncher, HttpState, InMemorySfuEngine, IngestProfile,
    IngestSettings, IngestSupervisor, MetricsReporter, NotificationBus, PrometheusReporter,
    RtpCodecCapability, SessionRegistry, SfuEngine, SignalingDispatcher, SignalingService,
    WebRtcTransportOptions,
};

fn create_engine(kind: EngineKind) -> Result<Arc<dyn SfuEngine>> {
    match kind {
        EngineKind::InMemory => {
            warn!("Using the in-memory SFU engine: signaling only, no media is forwarded");
            let engine = InMemorySfuEngine::new(vec![RtpCodecCapability::h264_baseline()])
                .map_err(|e| anyhow::anyhow!("Failed to create router: {}", e))?;
            Ok(Arc::new(engine))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();
    config.validate()?;

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Initialize metrics
    PrometheusReporter::init_metrics()?;

    info!("Starting RTSP to WebRTC SFU");
    info!("  Environment: {}", config.environment);
    info!("  Signaling port: {}", config.port);
    info!("  Announced IP: {}", config.announced_ip);

    // Convert CLI config to domain configs
    let sources = config
        .to_ingest_sources()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let policy = config
        .to_restart_policy()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    info!("  RTSP sources: {}", sources.len());

    // Create infrastructure implementations (dependency injection)
    let engine_kind = config
        .engine
        .ok_or_else(|| anyhow::anyhow!("No SFU engine selected"))?;
    let engine = create_engine(engine_kind)?;
    let launcher = FfmpegLauncher::new(config.ffmpeg_path.clone());
    info!("  Transcoder: {}", launcher.binary().display());
    let metrics: Arc<dyn MetricsReporter> = Arc::new(PrometheusReporter::new());
    let registry = Arc::new(SessionRegistry::with_bus(NotificationBus::new(
        config.notification_capacity,
    )));

    // Create application services
    let signaling = Arc::new(SignalingService::new(
        engine.clone(),
        registry.clone(),
        metrics.clone(),
        WebRtcTransportOptions::new(config.bind_ip, Some(config.announced_ip)),
    ));
    let supervisor = Arc::new(IngestSupervisor::new(
        engine,
        registry,
        Arc::new(launcher),
        metrics.clone(),
        IngestSettings {
            sources,
            profile: IngestProfile::default(),
            policy,
            listen_ip: config.bind_ip,
            announced_ip: Some(config.announced_ip),
        },
    ));

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Failed to listen for ctrl+c: {}", e);
                shutdown_tx.closed().await;
            }
        }
    });

    let closure_watcher = signaling.watch_engine_closures(shutdown_rx.clone());
    let ingest_tasks = supervisor.start(shutdown_rx.clone()).await;

    // Start signaling server
    let state = HttpState {
        dispatcher: Arc::new(SignalingDispatcher::new(signaling, metrics)),
        supervisor,
        environment: config.environment.clone(),
    };
    let mut server_shutdown = shutdown_rx.clone();
    let (_, server) = serve(
        state,
        SocketAddr::new(config.bind_ip, config.port),
        async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        },
    )?;
    let server = tokio::spawn(server);

    // Wait for supervisors to stop their transcoders, then for the server
    for task in ingest_tasks {
        task.await?;
    }
    server.await?;
    closure_watcher.await?;

    info!("Pipeline shutdown complete");
    Ok(())
}
