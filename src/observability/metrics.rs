use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub fetch_total: IntCounterVec,
    pub fetch_latency_seconds: HistogramVec,
    pub snapshot_hits_total: IntCounterVec,
    pub realtime_events_total: IntCounterVec,
    pub active_listeners: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let fetch_total = IntCounterVec::new(
            Opts::new("fetch_total", "Collection fetches by outcome"),
            &["collection", "outcome"],
        )
        .expect("valid fetch_total metric");

        let fetch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "fetch_latency_seconds",
                "Latency of collection fetches in seconds",
            ),
            &["collection"],
        )
        .expect("valid fetch_latency_seconds metric");

        let snapshot_hits_total = IntCounterVec::new(
            Opts::new("snapshot_hits_total", "Screens rendered from a stored snapshot"),
            &["collection"],
        )
        .expect("valid snapshot_hits_total metric");

        let realtime_events_total = IntCounterVec::new(
            Opts::new("realtime_events_total", "Change events handled by listeners"),
            &["channel", "action"],
        )
        .expect("valid realtime_events_total metric");

        let active_listeners = IntGauge::new("active_listeners", "Open realtime listeners")
            .expect("valid active_listeners metric");

        registry
            .register(Box::new(fetch_total.clone()))
            .expect("register fetch_total");
        registry
            .register(Box::new(fetch_latency_seconds.clone()))
            .expect("register fetch_latency_seconds");
        registry
            .register(Box::new(snapshot_hits_total.clone()))
            .expect("register snapshot_hits_total");
        registry
            .register(Box::new(realtime_events_total.clone()))
            .expect("register realtime_events_total");
        registry
            .register(Box::new(active_listeners.clone()))
            .expect("register active_listeners");

        Self {
            registry,
            fetch_total,
            fetch_latency_seconds,
            snapshot_hits_total,
            realtime_events_total,
            active_listeners,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
