#![allow(unused)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sweeprun::{
    AllocationRunner, ExperimentRegistry, ExperimentSchema, FieldValue, MemoryObjectStore,
    RawRecord, SpecError,
};

pub async fn with_timeout<F, T>(label: &str, duration: Duration, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(duration, f)
        .await
        .unwrap_or_else(|_| panic!("'{}' timed out after {:?}", label, duration))
}

pub fn record_n(n: i64) -> RawRecord {
    let mut record = RawRecord::new();
    record.insert("n".into(), json!(n));
    record
}

/// Registry with a "square" kind: `n -> n * n`, counting executions.
pub fn square_registry() -> (ExperimentRegistry, Arc<AtomicUsize>) {
    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let mut registry = ExperimentRegistry::new();
    registry
        .register_fn(
            "square",
            ExperimentSchema::builder().integer("n", 0, 10_000).build(),
            ExperimentSchema::builder()
                .integer("result", 0, 100_000_000)
                .build(),
            move |spec, _ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let n = spec.get("n").and_then(FieldValue::as_integer).unwrap_or(0);
                    let mut out = RawRecord::new();
                    out.insert("result".into(), json!(n * n));
                    Ok(out)
                }
            },
        )
        .unwrap();
    (registry, executions)
}

/// Registry with a "brittle" kind that fails when `should_fail` is "yes".
pub fn brittle_registry() -> ExperimentRegistry {
    let mut registry = ExperimentRegistry::new();
    registry
        .register_fn(
            "brittle",
            ExperimentSchema::builder()
                .integer("n", 0, 10_000)
                .choice("should_fail", ["yes", "no"])
                .build(),
            ExperimentSchema::builder()
                .integer("result", 0, 100_000_000)
                .build(),
            |spec, _ctx| async move {
                if spec.get("should_fail").and_then(FieldValue::as_text) == Some("yes") {
                    return Err(SpecError::Execution("brittle spec asked to fail".into()));
                }
                let n = spec.get("n").and_then(FieldValue::as_integer).unwrap_or(0);
                let mut out = RawRecord::new();
                out.insert("result".into(), json!(n * n));
                Ok(out)
            },
        )
        .unwrap();
    registry
}

/// Registry with a "slow" kind that sleeps before answering.
pub fn slow_registry(delay: Duration) -> ExperimentRegistry {
    let mut registry = ExperimentRegistry::new();
    registry
        .register_fn(
            "slow",
            ExperimentSchema::builder().integer("n", 0, 10_000).build(),
            ExperimentSchema::builder()
                .integer("result", 0, 100_000_000)
                .build(),
            move |spec, _ctx| async move {
                tokio::time::sleep(delay).await;
                let n = spec.get("n").and_then(FieldValue::as_integer).unwrap_or(0);
                let mut out = RawRecord::new();
                out.insert("result".into(), json!(n));
                Ok(out)
            },
        )
        .unwrap();
    registry
}

pub fn runner_for(registry: ExperimentRegistry) -> AllocationRunner {
    AllocationRunner::new(Arc::new(registry), Arc::new(MemoryObjectStore::new()))
}

pub fn brittle_record(n: i64, should_fail: bool) -> RawRecord {
    let mut record = record_n(n);
    record.insert(
        "should_fail".into(),
        json!(if should_fail { "yes" } else { "no" }),
    );
    record
}
