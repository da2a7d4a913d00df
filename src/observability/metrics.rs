use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token cache metrics
    pub token_cache_hits: IntCounterVec,
    pub token_cache_misses: IntCounterVec,
    /// entries per token cache instance, labelled by cache name
    pub cached_tokens: IntGaugeVec,

    // Token exchange metrics
    pub token_exchange_failures: IntCounterVec,
    pub token_exchange_duration: HistogramVec,

    // Proxy metrics
    pub proxy_requests: IntCounterVec,
    pub proxy_duration: HistogramVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("payergateway".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token cache
            token_cache_hits: IntCounterVec::new(Opts::new("token_cache_hits_total", "Tokens served from cache"), &["environment"]).unwrap(),
            token_cache_misses: IntCounterVec::new(Opts::new("token_cache_misses_total", "Cache misses that triggered a token exchange"), &["environment"]).unwrap(),
            cached_tokens: IntGaugeVec::new(Opts::new("cached_tokens", "Entries held in the token cache"), &["cache"]).unwrap(),

            // Token exchange
            token_exchange_failures: IntCounterVec::new(Opts::new("token_exchange_failures_total", "Token exchange failures by reason"), &["environment", "reason"]).unwrap(),
            token_exchange_duration: HistogramVec::new(HistogramOpts::new("token_exchange_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["environment"]).unwrap(),

            // Proxy
            proxy_requests: IntCounterVec::new(Opts::new("proxy_requests_total", "Proxied requests by route and relayed status"), &["route", "status"]).unwrap(),
            proxy_duration: HistogramVec::new(HistogramOpts::new("proxy_duration_seconds", "Proxied request duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["route"]).unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_misses.clone())).unwrap();
        reg.register(Box::new(metrics.cached_tokens.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchange_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchange_duration.clone())).unwrap();
        reg.register(Box::new(metrics.proxy_requests.clone())).unwrap();
        reg.register(Box::new(metrics.proxy_duration.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
