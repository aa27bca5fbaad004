use std::time::Duration;

use sweeprun::{AllocationError, Version, VersionPolicy};

use super::helpers::{record_n, runner_for, square_registry, with_timeout};

#[tokio::test]
async fn test_concurrent_bump_major_yields_distinct_versions() {
    let (registry, _executions) = square_registry();
    let runner = runner_for(registry);

    let (a, b) = tokio::join!(
        runner
            .submission("square")
            .record(record_n(1))
            .version_policy(VersionPolicy::BumpMajor)
            .submit(),
        runner
            .submission("square")
            .record(record_n(2))
            .version_policy(VersionPolicy::BumpMajor)
            .submit(),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_ne!(a.run_id().version(), b.run_id().version());
    with_timeout("run a", Duration::from_secs(10), a.result()).await;
    with_timeout("run b", Duration::from_secs(10), b.result()).await;
}

#[tokio::test]
async fn test_explicit_version_conflict_rejects_submission() {
    let (registry, _executions) = square_registry();
    let runner = runner_for(registry);

    let first = runner
        .submission("square")
        .record(record_n(1))
        .version_policy(VersionPolicy::Explicit(Version::new(2, 0)))
        .submit()
        .await
        .unwrap();
    assert_eq!(first.run_id().version(), Version::new(2, 0));

    let err = runner
        .submission("square")
        .record(record_n(2))
        .version_policy(VersionPolicy::Explicit(Version::new(2, 0)))
        .submit()
        .await
        .unwrap_err();
    assert!(matches!(err, AllocationError::VersionConflict { .. }));
}

#[tokio::test]
async fn test_bump_policies_build_on_prior_versions() {
    let (registry, _executions) = square_registry();
    let runner = runner_for(registry);

    let first = runner
        .submission("square")
        .record(record_n(1))
        .version_policy(VersionPolicy::BumpMajor)
        .submit()
        .await
        .unwrap();
    assert_eq!(first.run_id().version(), Version::new(1, 0));

    let second = runner
        .submission("square")
        .record(record_n(2))
        .version_policy(VersionPolicy::BumpMinor)
        .submit()
        .await
        .unwrap();
    assert_eq!(second.run_id().version(), Version::new(1, 1));

    // Timestamp runs share the highest version but never the same id.
    let third = runner
        .submission("square")
        .record(record_n(3))
        .version_policy(VersionPolicy::Timestamp)
        .submit()
        .await
        .unwrap();
    let fourth = runner
        .submission("square")
        .record(record_n(4))
        .version_policy(VersionPolicy::Timestamp)
        .submit()
        .await
        .unwrap();
    assert_eq!(third.run_id().version(), Version::new(1, 1));
    assert_ne!(third.run_id().to_string(), fourth.run_id().to_string());
}
