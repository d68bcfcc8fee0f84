use super::MetricObserver;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

/// Exports pool events as Prometheus series.
///
/// Series are registered into the registry handed to [`PrometheusObserver::new`]
/// and labelled with the pool endpoint, so one registry can hold several pools.
#[derive(Clone)]
pub struct PrometheusObserver {
    used: IntGauge,
    idle: IntGauge,
    dials: IntCounterVec,
    gets: IntCounterVec,
    puts: IntCounterVec,
}

impl PrometheusObserver {
    pub fn new(registry: &Registry, endpoint: &str) -> prometheus::Result<Self> {
        let used = IntGauge::with_opts(
            Opts::new(
                "rpcpool_used_connections",
                "Connections currently checked out of the pool",
            )
            .const_label("endpoint", endpoint),
        )?;
        let idle = IntGauge::with_opts(
            Opts::new(
                "rpcpool_idle_connections",
                "Connections currently parked in the idle set",
            )
            .const_label("endpoint", endpoint),
        )?;
        let dials = IntCounterVec::new(
            Opts::new(
                "rpcpool_dials_total",
                "Dial attempts by outcome (success, refused, timeout, error)",
            )
            .const_label("endpoint", endpoint),
            &["outcome"],
        )?;
        let gets = IntCounterVec::new(
            Opts::new(
                "rpcpool_gets_total",
                "Admission results (success from idle set, empty)",
            )
            .const_label("endpoint", endpoint),
            &["outcome"],
        )?;
        let puts = IntCounterVec::new(
            Opts::new(
                "rpcpool_puts_total",
                "Return results (success, full, closed, old, idle)",
            )
            .const_label("endpoint", endpoint),
            &["outcome"],
        )?;

        registry.register(Box::new(used.clone()))?;
        registry.register(Box::new(idle.clone()))?;
        registry.register(Box::new(dials.clone()))?;
        registry.register(Box::new(gets.clone()))?;
        registry.register(Box::new(puts.clone()))?;

        Ok(Self {
            used,
            idle,
            dials,
            gets,
            puts,
        })
    }
}

impl MetricObserver for PrometheusObserver {
    fn inc_used(&self) {
        self.used.inc();
    }

    fn dec_used(&self) {
        self.used.dec();
    }

    fn inc_idle(&self) {
        self.idle.inc();
    }

    fn dec_idle(&self) {
        self.idle.dec();
    }

    fn inc_dial_refused(&self) {
        self.dials.with_label_values(&["refused"]).inc();
    }

    fn inc_dial_timeout(&self) {
        self.dials.with_label_values(&["timeout"]).inc();
    }

    fn inc_dial_success(&self) {
        self.dials.with_label_values(&["success"]).inc();
    }

    fn inc_dial_error(&self) {
        self.dials.with_label_values(&["error"]).inc();
    }

    fn inc_get_success(&self) {
        self.gets.with_label_values(&["success"]).inc();
    }

    fn inc_get_empty(&self) {
        self.gets.with_label_values(&["empty"]).inc();
    }

    fn inc_put_success(&self) {
        self.puts.with_label_values(&["success"]).inc();
    }

    fn inc_put_full(&self) {
        self.puts.with_label_values(&["full"]).inc();
    }

    fn inc_put_close(&self) {
        self.puts.with_label_values(&["closed"]).inc();
    }

    fn inc_put_old(&self) {
        self.puts.with_label_values(&["old"]).inc();
    }

    fn inc_put_idle(&self) {
        self.puts.with_label_values(&["idle"]).inc();
    }
}
