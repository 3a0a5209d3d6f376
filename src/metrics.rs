//! Prometheus metrics for the transfer pipeline

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Ledger API
    pub rpc_requests: IntCounter,
    pub rpc_errors: IntCounter,

    // Orchestrators
    pub transfers_built: IntCounter,
    pub transfers_failed: IntCounter,

    // Emulation
    pub emulations_total: IntCounter,
    pub emulations_failed: IntCounter,

    // Seqno resolution
    pub seqno_fetches: IntCounter,
    pub seqno_fallbacks: IntCounter,

    // Histograms
    pub rpc_latency: Histogram,
    pub build_latency: Histogram,
    pub emulation_latency: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let rpc_requests = IntCounter::with_opts(Opts::new(
            "ledger_rpc_requests_total",
            "Ledger API requests issued",
        ))?;
        let rpc_errors = IntCounter::with_opts(Opts::new(
            "ledger_rpc_errors_total",
            "Ledger API requests that failed (transport or ledger-reported)",
        ))?;

        let transfers_built = IntCounter::with_opts(Opts::new(
            "transfers_built_total",
            "Transfers assembled and returned to the caller",
        ))?;
        let transfers_failed = IntCounter::with_opts(Opts::new(
            "transfers_failed_total",
            "Orchestrator calls that ended without a result",
        ))?;

        let emulations_total =
            IntCounter::with_opts(Opts::new("emulations_total", "Emulation requests"))?;
        let emulations_failed = IntCounter::with_opts(Opts::new(
            "emulations_failed_total",
            "Emulations rejected because at least one action failed",
        ))?;

        let seqno_fetches =
            IntCounter::with_opts(Opts::new("seqno_fetches_total", "Seqno lookups issued"))?;
        let seqno_fallbacks = IntCounter::with_opts(Opts::new(
            "seqno_fallbacks_total",
            "Seqno lookups that failed and fell back to zero",
        ))?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("ledger_rpc_latency_seconds", "Ledger API call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;
        let build_latency = Histogram::with_opts(
            HistogramOpts::new("transfer_build_latency_seconds", "End-to-end orchestrator latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        let emulation_latency = Histogram::with_opts(
            HistogramOpts::new("emulation_latency_seconds", "Emulation round-trip latency")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        registry.register(Box::new(rpc_requests.clone()))?;
        registry.register(Box::new(rpc_errors.clone()))?;
        registry.register(Box::new(transfers_built.clone()))?;
        registry.register(Box::new(transfers_failed.clone()))?;
        registry.register(Box::new(emulations_total.clone()))?;
        registry.register(Box::new(emulations_failed.clone()))?;
        registry.register(Box::new(seqno_fetches.clone()))?;
        registry.register(Box::new(seqno_fallbacks.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(emulation_latency.clone()))?;

        Ok(Self {
            registry,
            rpc_requests,
            rpc_errors,
            transfers_built,
            transfers_failed,
            emulations_total,
            emulations_failed,
            seqno_fetches,
            seqno_fallbacks,
            rpc_latency,
            build_latency,
            emulation_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
