use std::net::SocketAddr;
use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("requests_total", "Requests dispatched, by method"),
        &["method"]
    )
    .expect("metric can not be created");

    pub static ref REQUEST_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("request_errors_total", "Requests answered with an error envelope, by method"),
        &["method"]
    )
    .expect("metric can not be created");

    pub static ref DROPPED_REQUESTS_TOTAL: IntCounter = IntCounter::new(
        "dropped_requests_total",
        "Requests dropped because they carried no integer rid"
    )
    .expect("metric can not be created");

    pub static ref VALUE_PUSHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("value_pushes_total", "Value updates pushed to subscribers, by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_VALUE_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        "active_value_subscriptions",
        "Value subscriptions currently installed"
    )
    .expect("metric can not be created");

    pub static ref SNAPSHOT_WRITES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snapshot_writes_total", "Snapshot flushes, by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    /// Registry served on `/metrics`; every collector is published as `nodelink_*`
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some(METRICS_PREFIX.to_string()), None).expect("registry can be created");
}

pub const METRICS_PREFIX: &str = "nodelink";

static REGISTER_DEFAULT: Once = Once::new();

/// The exporter's registry with the crate collectors registered.
pub fn default_registry() -> &'static Registry {
    REGISTER_DEFAULT.call_once(|| register_custom_metrics(&REGISTRY));
    &REGISTRY
}

pub fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(REQUESTS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REQUEST_ERRORS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DROPPED_REQUESTS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(VALUE_PUSHES_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(ACTIVE_VALUE_SUBSCRIPTIONS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(SNAPSHOT_WRITES_TOTAL.clone()))
        .expect("collector can be registered");
}

pub async fn start_server(
    addr: SocketAddr,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(%addr, "metrics exporter listening");
    let (_, server) = warp::serve(metrics_route).bind_with_graceful_shutdown(addr, async move {
        let _ = shutdown_signal.changed().await;
    });
    server.await;
}

pub fn encode_metrics(registry: &Registry) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(encode_metrics(default_registry()))
}

#[cfg(test)]
mod metrics_test;
