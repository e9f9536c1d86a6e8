use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    request_counter: Counter<u64>,
    classification_counter: Counter<u64>,
    classification_duration: Histogram<u64>,
    history_failure_counter: Counter<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        // TODO: deprecated crate to be replaced with an OLTP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .unwrap();

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("fish_monitor");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of requests")
            .build();

        let classification_counter = meter
            .u64_counter("classifications_total")
            .with_description("Total number of classification attempts by outcome")
            .build();

        let boundaries = generate_boundaries((50, 250, 1000, 5000, 15000));

        let classification_duration = meter
            .u64_histogram("classification_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of classification round trips in milliseconds")
            .build();

        let history_failure_counter = meter
            .u64_counter("history_persist_failures_total")
            .with_description("Total number of failed history writes")
            .build();

        Metrics {
            request_counter,
            classification_counter,
            classification_duration,
            history_failure_counter,
            registry,
        }
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_classification(&self, duration_ms: u64, outcome: &str) {
        let attributes = vec![KeyValue::new("outcome", outcome.to_string())];
        self.classification_counter.add(1, &attributes);
        self.classification_duration.record(duration_ms, &attributes);
    }

    pub fn record_history_failure(&self) {
        self.history_failure_counter.add(1, &[]);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 50;
    let middle_step: usize = 100;
    let end_step: usize = 500;
    let tail_step: usize = 2000;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_boundaries() {
        let parts = (100, 200, 300, 1000, 5000);
        let get = generate_boundaries(parts);
        let expected = vec![100.0, 150.0, 200.0, 300.0, 800.0, 1000.0, 3000.0, 5000.0];

        assert_eq!(get, expected);
    }
}
