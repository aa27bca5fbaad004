use std::time::Duration;

use sweeprun::{AllocationError, CompletionState};

use super::helpers::{record_n, runner_for, slow_registry, with_timeout};

#[tokio::test]
async fn test_run_id_is_available_before_completion() {
    let runner = runner_for(slow_registry(Duration::from_millis(200)));
    let handle = runner
        .submission("slow")
        .records((0..4).map(record_n))
        .submit()
        .await
        .unwrap();

    // The identifier and the registry entry exist before any leaf finishes.
    let run_id = handle.run_id().to_string();
    assert!(run_id.starts_with("slow/"));
    let record = runner.run_record(&run_id).unwrap();
    assert_eq!(record.completion_state, CompletionState::Pending);

    let record = with_timeout("slow run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Complete);
}

#[tokio::test]
async fn test_result_timeout_does_not_cancel_the_run() {
    let runner = runner_for(slow_registry(Duration::from_millis(200)));
    let handle = runner
        .submission("slow")
        .records((0..2).map(record_n))
        .submit()
        .await
        .unwrap();

    let err = handle
        .result_timeout(Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(err, AllocationError::ResultTimeout));

    // The underlying work was not cancelled and still completes.
    let record = with_timeout("after timeout", Duration::from_secs(10), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Complete);
    assert_eq!(record.outcomes.len(), 2);
}

#[tokio::test]
async fn test_cancel_resolves_promptly() {
    let runner = runner_for(slow_registry(Duration::from_secs(30)));
    let handle = runner
        .submission("slow")
        .records((0..8).map(record_n))
        .submit()
        .await
        .unwrap();

    handle.cancel();

    // result() must return promptly with the cancelled state instead of
    // blocking on the still-sleeping leaves.
    let record = with_timeout("cancelled run", Duration::from_secs(2), handle.result()).await;
    assert_eq!(record.completion_state, CompletionState::Cancelled);

    // The registry reports the same terminal state.
    let record = runner.run_record(&handle.run_id().to_string()).unwrap();
    assert_eq!(record.completion_state, CompletionState::Cancelled);
}

#[tokio::test]
async fn test_status_is_nonblocking() {
    let runner = runner_for(slow_registry(Duration::from_millis(100)));
    let handle = runner
        .submission("slow")
        .record(record_n(1))
        .submit()
        .await
        .unwrap();

    assert_eq!(handle.status(), CompletionState::Pending);
    with_timeout("status run", Duration::from_secs(10), handle.result()).await;
    assert_eq!(handle.status(), CompletionState::Complete);
}
