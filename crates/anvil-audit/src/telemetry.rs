//! Telemetry port (, §9 Design Notes: "keep a single emit function
//! per concern; default sink is structured logging"). Named events of the
//! form `anvil.<domain>.<action>[.lifecycle]` carrying measurements and
//! metadata.

use std::collections::HashMap;

use serde_json::Value;

/// One telemetry emission. `measurements` holds numeric observations
/// (`duration_ms`, `count`,...); `metadata` holds tags (`queue_id`,
/// `tenant`,...).
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
 pub name: String,
 pub measurements: HashMap<String, f64>,
 pub metadata: HashMap<String, Value>,
}

impl TelemetryEvent {
 pub fn new(name: impl Into<String>) -> Self {
 Self {
 name: name.into(),
 measurements: HashMap::new(),
 metadata: HashMap::new(),
 }
 }

 pub fn with_measurement(mut self, key: impl Into<String>, value: f64) -> Self {
 self.measurements.insert(key.into(), value);
 self
 }

 pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
 self.metadata.insert(key.into(), value.into());
 self
 }
}

/// A single emit function per concern. Implementations must not block the
/// caller for long; the default sink logs and returns immediately.
pub trait Telemetry: Send + Sync {
 fn emit(&self, event: TelemetryEvent);
}

/// Default sink: logs each event as a structured `tracing` event at
/// `info` level, with measurements and metadata flattened into fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
 fn emit(&self, event: TelemetryEvent) {
 tracing::info!(
 event = %event.name,
 measurements = ?event.measurements,
 metadata = ?event.metadata,
 "telemetry"
);
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn builder_accumulates_measurements_and_metadata() {
 let event = TelemetryEvent::new("anvil.dispatch.assigned")
.with_measurement("duration_ms", 12.5)
.with_metadata("queue_id", Value::String("q-1".into()));
 assert_eq!(event.name, "anvil.dispatch.assigned");
 assert_eq!(event.measurements.get("duration_ms"), Some(&12.5));
 assert_eq!(event.metadata.get("queue_id"), Some(&Value::String("q-1".into())));
 }

 #[test]
 fn tracing_sink_does_not_panic() {
 let sink = TracingTelemetry;
 sink.emit(TelemetryEvent::new("anvil.queue.archived"));
 }
}
