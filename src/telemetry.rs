//! Fire-and-forget usage event reporting.
//!
//! The reporter is an injected capability: workflows record events through
//! the trait, and the process wires up one implementation at startup.
//! Recording never blocks the UI and never gates a workflow; delivery
//! failures are logged and otherwise swallowed.

use std::thread;
use std::time::Duration;

use serde_json::Value;

/// Capability for recording usage events.
pub trait Reporter: Send + Sync {
    /// Record an event with free-form metadata. Must return immediately and
    /// must never surface a failure to the caller.
    fn record(&self, event: &str, metadata: Value);
}

/// Posts events to the service's `/event/` endpoint, one detached thread per
/// event.
pub struct HttpReporter {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpReporter {
    pub fn new(base_url: &str) -> Self {
        // Unlike operation dispatches, delivery here gets a timeout so
        // abandoned reporter threads cannot pile up behind a hung service.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            endpoint: format!("{}/event/", base_url.trim_end_matches('/')),
            client,
        }
    }
}

impl Reporter for HttpReporter {
    fn record(&self, event: &str, metadata: Value) {
        let payload = event_payload(event, metadata);
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let event = event.to_string();

        thread::spawn(move || {
            if let Err(e) = client.post(&endpoint).json(&payload).send() {
                log::debug!("telemetry event {event} not delivered: {e}");
            }
        });
    }
}

/// Drops every event. Used with `--no-telemetry` and in tests.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn record(&self, _event: &str, _metadata: Value) {}
}

fn event_payload(event: &str, metadata: Value) -> Value {
    serde_json::json!({
        "event": event,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "metadata": metadata,
    })
}
