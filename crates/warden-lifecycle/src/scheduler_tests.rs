//! Tests for the coalescing scheduler.

use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::time::Duration;

use tokio::sync::Semaphore;

/// Job whose runs block on a semaphore until the test releases them.
fn gated_job(gate: Arc<Semaphore>, runs: Arc<AtomicUsize>) -> CoalescingScheduler {
    CoalescingScheduler::new(move || {
        let gate = gate.clone();
        let runs = runs.clone();
        async move {
            gate.acquire().await.unwrap().forget();
            runs.fetch_add(1, Ordering::SeqCst);
        }
    })
}

async fn wait_with_timeout(scheduler: &CoalescingScheduler) {
    tokio::time::timeout(Duration::from_secs(5), scheduler.wait())
        .await
        .expect("scheduler never became idle");
}

#[tokio::test]
async fn test_single_trigger_runs_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let scheduler = CoalescingScheduler::new(move || {
        let runs = runs_clone.clone();
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert_eq!(scheduler.trigger(), TriggerOutcome::Started);
    wait_with_timeout(&scheduler).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.completed_runs(), 1);
    assert!(scheduler.is_idle());
}

#[tokio::test]
async fn test_wait_on_idle_returns_immediately() {
    let scheduler = CoalescingScheduler::new(|| async {});
    assert!(scheduler.is_idle());
    wait_with_timeout(&scheduler).await;
    assert_eq!(scheduler.completed_runs(), 0);
}

#[tokio::test]
async fn test_burst_coalesces_into_one_follow_up() {
    let gate = Arc::new(Semaphore::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let scheduler = gated_job(gate.clone(), runs.clone());

    assert_eq!(scheduler.trigger(), TriggerOutcome::Started);
    assert_eq!(scheduler.trigger(), TriggerOutcome::Queued);
    assert_eq!(scheduler.trigger(), TriggerOutcome::Coalesced);
    assert_eq!(scheduler.trigger(), TriggerOutcome::Coalesced);
    assert!(!scheduler.is_idle());

    gate.add_permits(10);
    wait_with_timeout(&scheduler).await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.completed_runs(), 2);
}

#[tokio::test]
async fn test_wait_blocks_until_follow_up_finishes() {
    let gate = Arc::new(Semaphore::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let scheduler = gated_job(gate.clone(), runs.clone());

    scheduler.trigger();
    scheduler.trigger();

    let waiter = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.wait().await })
    };

    // First run only.
    gate.add_permits(1);
    tokio::time::timeout(Duration::from_secs(5), async {
        while runs.load(Ordering::SeqCst) < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());
    assert!(!scheduler.is_idle());

    gate.add_permits(1);
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_trigger_after_idle_starts_fresh_run() {
    let scheduler = CoalescingScheduler::new(|| async {});

    assert_eq!(scheduler.trigger(), TriggerOutcome::Started);
    wait_with_timeout(&scheduler).await;
    assert_eq!(scheduler.trigger(), TriggerOutcome::Started);
    wait_with_timeout(&scheduler).await;

    assert_eq!(scheduler.completed_runs(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_never_overlap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));

    let scheduler = {
        let in_flight = in_flight.clone();
        let overlapped = overlapped.clone();
        CoalescingScheduler::new(move || {
            let in_flight = in_flight.clone();
            let overlapped = overlapped.clone();
            async move {
                if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlapped.store(true, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
    };

    let mut handles = Vec::new();
    for _ in 0..16 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                scheduler.trigger();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    wait_with_timeout(&scheduler).await;

    assert!(!overlapped.load(Ordering::SeqCst));
    let completed = scheduler.completed_runs();
    assert!(completed >= 1);
    assert!(completed <= 16 * 25);
}

#[tokio::test]
async fn test_panicking_job_does_not_wedge_wait() {
    let scheduler = CoalescingScheduler::new(|| async {
        panic!("job failed");
    });

    scheduler.trigger();
    scheduler.trigger();
    wait_with_timeout(&scheduler).await;

    assert!(scheduler.is_idle());
    assert_eq!(scheduler.completed_runs(), 0);
}

#[test]
fn test_outcome_display() {
    assert_eq!(TriggerOutcome::Started.to_string(), "started");
    assert_eq!(TriggerOutcome::Queued.to_string(), "queued");
    assert_eq!(TriggerOutcome::Coalesced.to_string(), "coalesced");
}
