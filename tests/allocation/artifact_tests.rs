use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sweeprun::{
    AllocationRunner, CompletionState, ExperimentRegistry, ExperimentSchema, FieldValue,
    FileObjectStore, FileReference, MemoryObjectStore, ObjectStore, RawRecord, SpecError,
};

use super::helpers::with_timeout;

fn energy_registry() -> ExperimentRegistry {
    let mut registry = ExperimentRegistry::new();
    registry
        .register_fn(
            "energy_model",
            ExperimentSchema::builder()
                .float("r_value", 0.0, 15.0)
                .file("weather_file")
                .build(),
            ExperimentSchema::builder()
                .float("heating", 0.0, 1.0e9)
                .file("timeseries")
                .build(),
            |spec, ctx| async move {
                let weather = spec
                    .get("weather_file")
                    .and_then(FieldValue::as_file)
                    .cloned()
                    .ok_or_else(|| SpecError::Execution("weather_file missing".into()))?;
                // Input files are uploaded before execution; the spec the
                // experiment sees references the store, not local disk.
                assert!(weather.is_stored());
                let bytes = ctx.fetch(&weather).await?;

                let path = ctx.scratch_dir().join("timeseries.csv");
                tokio::fs::write(&path, b"time,energy\n0,100\n1,200\n")
                    .await
                    .map_err(|e| SpecError::Execution(e.to_string()))?;

                let mut out = RawRecord::new();
                out.insert("heating".into(), json!(bytes.len() as f64));
                out.insert("timeseries".into(), json!(path.to_string_lossy()));
                Ok(out)
            },
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn test_file_fields_flow_through_the_store() {
    let store = Arc::new(MemoryObjectStore::new());
    let runner = AllocationRunner::new(Arc::new(energy_registry()), store.clone());

    let weather_dir = tempfile::tempdir().unwrap();
    let weather_path = weather_dir.path().join("boston.epw");
    tokio::fs::write(&weather_path, b"epw-header\n").await.unwrap();

    let mut record = RawRecord::new();
    record.insert("r_value".into(), json!(7.5));
    record.insert("weather_file".into(), json!(weather_path.to_string_lossy()));

    let handle = runner
        .submission("energy_model")
        .record(record)
        .submit()
        .await
        .unwrap();
    let run_id = handle.run_id().to_string();

    let result = with_timeout("energy run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(result.completion_state, CompletionState::Complete);

    let output = result.outcomes[&0].output().unwrap();
    // `heating` carries the fetched input length, proving the experiment
    // read the uploaded bytes back through the gateway.
    assert_eq!(output.fields["heating"], FieldValue::Float(11.0));

    let input_key = format!("{}/0/weather_file", run_id);
    assert_eq!(store.get(&input_key).await.unwrap(), b"epw-header\n");

    let output_key = format!("{}/0/timeseries", run_id);
    assert_eq!(
        output.fields["timeseries"],
        FieldValue::File(FileReference::Stored(output_key.clone()))
    );
    assert_eq!(
        store.get(&output_key).await.unwrap(),
        b"time,energy\n0,100\n1,200\n"
    );
}

#[tokio::test]
async fn test_stored_input_reference_skips_upload() {
    let store = Arc::new(MemoryObjectStore::new());
    store.put("shared/boston.epw", b"epw-header\n").await.unwrap();
    let runner = AllocationRunner::new(Arc::new(energy_registry()), store.clone());

    let mut record = RawRecord::new();
    record.insert("r_value".into(), json!(1.0));
    record.insert("weather_file".into(), json!({"stored": "shared/boston.epw"}));

    let handle = runner
        .submission("energy_model")
        .record(record)
        .submit()
        .await
        .unwrap();
    let result = with_timeout("stored input run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(result.completion_state, CompletionState::Complete);
    // One object for the shared input, one for the produced timeseries.
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_file_backed_store_put_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileObjectStore::new(dir.path()).unwrap();

    store.put("run/v1.0/000001/0/data", b"payload").await.unwrap();
    store.put("run/v1.0/000001/0/data", b"payload").await.unwrap();
    assert_eq!(store.get("run/v1.0/000001/0/data").await.unwrap(), b"payload");
}

#[tokio::test]
async fn test_concurrent_puts_to_distinct_keys() {
    let store = Arc::new(MemoryObjectStore::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .put(&format!("run/0/field_{}", i), format!("bytes-{}", i).as_bytes())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(store.len().await, 16);
    assert_eq!(store.get("run/0/field_7").await.unwrap(), b"bytes-7");
}
