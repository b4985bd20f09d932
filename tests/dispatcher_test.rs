//! Dispatcher concurrency bounds and graceful shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use triage::domain::models::config::DispatcherConfig;
use triage::services::{Dispatcher, Submission};

fn dispatcher(pool_size: usize, queue_depth: usize) -> Dispatcher {
    Dispatcher::new(&DispatcherConfig {
        pool_size,
        queue_depth,
        shutdown_timeout_secs: 30,
    })
}

#[tokio::test(start_paused = true)]
async fn test_running_jobs_never_exceed_pool_size() {
    let dispatcher = dispatcher(2, 10);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let mut submissions = Vec::new();
    for _ in 0..6 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        let done = Arc::clone(&done);
        let submission = dispatcher
            .submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        submissions.push(submission);
    }

    assert_eq!(&submissions[..2], &[Submission::Spawned, Submission::Spawned]);
    assert!(submissions[2..].iter().all(|s| *s == Submission::Queued));
    assert!(dispatcher.busy_workers() <= 2);

    let summary = dispatcher.shutdown().await;
    assert_eq!(summary.finished, 6);
    assert_eq!(summary.aborted, 0);
    assert_eq!(done.load(Ordering::SeqCst), 6);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_saturation_runs_job_in_caller() {
    let dispatcher = dispatcher(1, 1);
    dispatcher
        .submit(tokio::time::sleep(Duration::from_secs(10)))
        .await
        .unwrap();
    dispatcher
        .submit(tokio::time::sleep(Duration::from_secs(10)))
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    let third = dispatcher
        .submit(tokio::time::sleep(Duration::from_secs(3)))
        .await
        .unwrap();

    assert_eq!(third, Submission::RanInCaller);
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(dispatcher.in_flight().await, 2);
    dispatcher.shutdown().await;
}
