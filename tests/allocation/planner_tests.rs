use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use sweeprun::{CompletionState, ErrorKind, FieldValue, RawRecord};

use super::helpers::{
    brittle_record, brittle_registry, record_n, runner_for, square_registry, with_timeout,
};

#[tokio::test]
async fn test_run_completes_with_every_outcome() {
    let (registry, executions) = square_registry();
    let runner = runner_for(registry);

    let handle = runner
        .submission("square")
        .records((0..10).map(record_n))
        .factor(2)
        .max_depth(2)
        .submit()
        .await
        .unwrap();

    let record = with_timeout("square run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Complete);
    assert_eq!(executions.load(Ordering::SeqCst), 10);

    // Every sort_index appears exactly once, in order, with its own result.
    let indices: Vec<usize> = record.outcomes.keys().copied().collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    for (sort_index, outcome) in &record.outcomes {
        let output = outcome.output().expect("success outcome");
        assert_eq!(output.sort_index, *sort_index);
        assert_eq!(
            output.fields["result"],
            FieldValue::Integer((*sort_index as i64) * (*sort_index as i64))
        );
    }
}

#[tokio::test]
async fn test_single_spec_runs_without_recursion() {
    let (registry, executions) = square_registry();
    let runner = runner_for(registry);

    let handle = runner
        .submission("square")
        .record(record_n(7))
        .factor(8)
        .max_depth(5)
        .submit()
        .await
        .unwrap();

    let record = with_timeout("single spec", Duration::from_secs(10), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Complete);
    assert_eq!(executions.load(Ordering::SeqCst), 1);
    assert_eq!(
        record.outcomes[&0].output().unwrap().fields["result"],
        FieldValue::Integer(49)
    );
}

#[tokio::test]
async fn test_large_batch_respects_depth_budget() {
    let (registry, executions) = square_registry();
    let runner = runner_for(registry);

    // 100 specs at factor 2, depth 2: the plan bottoms out at four leaves
    // of 25 specs each, and every spec still executes exactly once.
    let handle = runner
        .submission("square")
        .records((0..100).map(record_n))
        .factor(2)
        .max_depth(2)
        .submit()
        .await
        .unwrap();

    let record = with_timeout("large batch", Duration::from_secs(30), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Complete);
    assert_eq!(record.outcomes.len(), 100);
    assert_eq!(executions.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn test_one_failing_spec_yields_partial() {
    let runner = runner_for(brittle_registry());

    let records = (0..10).map(|n| brittle_record(n, n == 4));
    let handle = runner
        .submission("brittle")
        .records(records)
        .factor(2)
        .max_depth(2)
        .submit()
        .await
        .unwrap();

    let record = with_timeout("brittle run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Partial);
    assert_eq!(record.success_count(), 9);
    assert_eq!(record.error_count(), 1);

    let error = record.outcomes[&4].error().expect("error at index 4");
    assert_eq!(error.sort_index, 4);
    assert_eq!(error.kind, ErrorKind::Execution);
    assert!(error.message.contains("asked to fail"));
}

#[tokio::test]
async fn test_invalid_record_aborts_only_itself() {
    let (registry, executions) = square_registry();
    let runner = runner_for(registry);

    let mut records: Vec<RawRecord> = (0..5).map(record_n).collect();
    // Index 2 violates the inclusive upper bound and is never dispatched.
    records[2].insert("n".into(), json!(10_001));

    let handle = runner
        .submission("square")
        .records(records)
        .submit()
        .await
        .unwrap();

    let record = with_timeout("mixed run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Partial);
    assert_eq!(executions.load(Ordering::SeqCst), 4);

    let error = record.outcomes[&2].error().expect("validation error");
    assert_eq!(error.kind, ErrorKind::Validation);
    assert!(error.message.contains("n"));
    for index in [0usize, 1, 3, 4] {
        assert!(record.outcomes[&index].is_success());
    }
}

#[tokio::test]
async fn test_entirely_invalid_input_fails_before_dispatch() {
    let (registry, executions) = square_registry();
    let runner = runner_for(registry);

    let records = (0..3).map(|_| {
        let mut record = RawRecord::new();
        record.insert("n".into(), json!("not a number"));
        record
    });

    let handle = runner
        .submission("square")
        .records(records)
        .submit()
        .await
        .unwrap();

    let record = with_timeout("rejected run", Duration::from_secs(5), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Failed);
    assert_eq!(record.outcomes.len(), 3);
    assert!(record
        .outcomes
        .values()
        .all(|o| o.error().map(|e| e.kind == ErrorKind::Validation).unwrap_or(false)));
    assert_eq!(executions.load(Ordering::SeqCst), 0);
}
