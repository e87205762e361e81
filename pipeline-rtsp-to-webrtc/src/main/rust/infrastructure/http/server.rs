use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::application::services::IngestSupervisor;
use crate::infrastructure::metrics::PrometheusReporter;
use crate::infrastructure::signaling::{handle_socket, SignalingDispatcher};

const SERVICE_NAME: &str = "pipeline-rtsp-to-webrtc";

/// Health check response structure
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    environment: String,
}

/// Everything the HTTP routes need to answer
#[derive(Clone)]
pub struct HttpState {
    pub dispatcher: Arc<SignalingDispatcher>,
    pub supervisor: Arc<IngestSupervisor>,
    pub environment: String,
}

pub fn routes(state: HttpState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // CORS configuration for browser access
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["Content-Type"]);

    let dispatcher = state.dispatcher.clone();
    let ws_route = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let dispatcher = dispatcher.clone();
            ws.on_upgrade(move |socket| handle_socket(socket, dispatcher))
        });

    let metrics_route = warp::path("metrics").and(warp::get()).map(|| {
        let body = PrometheusReporter::gather_metrics();
        warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4; charset=utf-8")
    });

    let environment = state.environment.clone();
    let health_route = warp::path("health").and(warp::get()).map(move || {
        warp::reply::json(&HealthResponse {
            status: "healthy",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            environment: environment.clone(),
        })
    });

    // Liveness probe endpoint (minimal check - is the process running?)
    let liveness_route =
        warp::path("livez").map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let environment = state.environment.clone();
    let readiness_route = warp::path("readyz").and(warp::get()).map(move || {
        warp::reply::json(&HealthResponse {
            status: "ready",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            environment: environment.clone(),
        })
    });

    let supervisor = state.supervisor.clone();
    let ingest_route = warp::path("ingest")
        .and(warp::get())
        .map(move || warp::reply::json(&supervisor.snapshot()));

    ws_route
        .or(metrics_route)
        .or(health_route)
        .or(liveness_route)
        .or(readiness_route)
        .or(ingest_route)
        .with(cors)
}

/// Bind the signaling/health listener; the returned future runs until `shutdown` resolves.
pub fn serve(
    state: HttpState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), warp::Error> {
    let (addr, server) = warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    tracing::info!("HTTP server listening on http://{}", addr);
    Ok((addr, server))
}
