//! Prometheus counters for the chat endpoint.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::server::relay::RelayOutcome;

/// Process-wide counters, cheap to clone into request tasks.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub chat_requests: IntCounter,
    pub bad_requests: IntCounter,
    pub events_relayed: IntCounter,
    pub error_events: IntCounter,
    pub client_disconnects: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let chat_requests = counter("chat_requests_total", "Chat requests received")?;
        let bad_requests = counter("chat_bad_requests_total", "Chat requests rejected at decode")?;
        let events_relayed =
            counter("chat_events_relayed_total", "Provider events written to clients")?;
        let error_events = counter("chat_error_events_total", "Synthesized error events written")?;
        let client_disconnects = counter(
            "chat_client_disconnects_total",
            "Streams abandoned because the client went away",
        )?;

        Ok(Self {
            registry,
            chat_requests,
            bad_requests,
            events_relayed,
            error_events,
            client_disconnects,
        })
    }

    /// Fold one finished stream into the counters.
    pub fn record(&self, outcome: &RelayOutcome) {
        let stats = outcome.stats();
        self.events_relayed.inc_by(stats.relayed as u64);
        self.error_events.inc_by(stats.error_events as u64);
        if matches!(outcome, RelayOutcome::Disconnected(_)) {
            self.client_disconnects.inc();
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
