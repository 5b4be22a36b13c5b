use formrelay::core::RunMetrics;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_are_not_lost() {
    let metrics = Arc::new(RunMetrics::new());
    let mut handles = Vec::new();
    for task in 0..8 {
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(async move {
            for _ in 0..250 {
                if task % 2 == 0 {
                    metrics.record_success();
                } else {
                    metrics.record_failure();
                }
                metrics.increment_retry("Billing");
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.success_count, 1000);
    assert_eq!(snapshot.failure_count, 1000);
    assert_eq!(snapshot.total_outcomes, 2000);
    assert_eq!(snapshot.retries.get("Billing"), Some(&2000));
}

#[test]
fn test_summary_without_activity() {
    insta::assert_snapshot!(RunMetrics::new().snapshot().summary(), @r"
    Submission metrics:
    - successes: 0
    - failures: 0
    - retries: none
    - average submission time: 0.00 ms
    ");
}

#[test]
fn test_summary_lists_retries_and_average() {
    let metrics = RunMetrics::new();
    metrics.record_success();
    metrics.record_success();
    metrics.record_failure();
    metrics.increment_retry("ProductCatalogService");
    metrics.increment_retry("CreditCheckSystem");
    metrics.increment_retry("CreditCheckSystem");
    metrics.record_duration(Duration::from_millis(10));
    metrics.record_duration(Duration::from_millis(15));

    insta::assert_snapshot!(metrics.snapshot().summary(), @r"
    Submission metrics:
    - successes: 2
    - failures: 1
    - retries: CreditCheckSystem=2, ProductCatalogService=1
    - average submission time: 12.50 ms
    ");
}

#[test]
fn test_snapshot_is_a_copy() {
    let metrics = RunMetrics::new();
    let before = metrics.snapshot();
    metrics.record_success();
    assert_eq!(before.success_count, 0);
    assert_eq!(metrics.snapshot().success_count, 1);
    assert_eq!(metrics.snapshot().durations_ms.len(), 0);
}
