//! Dispatcher lifecycle integration tests.
//!
//! These tests drive the engine through its public surface only:
//! submit -> queue -> permit -> station -> execute -> stats -> shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use kitchen_core::{
    testing::{fixtures, MockExecutor},
    DispatchError, Dispatcher, DispatcherConfig, ItemKind, JobStage, PriorityClass,
    SimulatedExecutor, StationState, StatsEvent, StatsSnapshot,
};

/// Polls until `done` holds for the dispatcher's snapshot, or panics after `limit`.
async fn wait_for<F>(dispatcher: &Dispatcher, limit: Duration, done: F)
where
    F: Fn(&StatsSnapshot) -> bool,
{
    let deadline = Instant::now() + limit;
    while !done(&dispatcher.snapshot()) {
        assert!(Instant::now() < deadline, "condition not reached in {:?}", limit);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_high_priority_dequeued_before_normal() {
    let executor = MockExecutor::new();
    let dispatcher = Dispatcher::start(fixtures::fast_config(1), Arc::new(executor.clone())).unwrap();

    // Both land before the single worker gets to run.
    let normal = dispatcher
        .submit(6, ItemKind::Steak, PriorityClass::Normal)
        .unwrap();
    let high = dispatcher
        .submit(5, ItemKind::Burger, PriorityClass::High)
        .unwrap();

    wait_for(&dispatcher, Duration::from_secs(5), |s| s.completed == 2).await;
    assert_eq!(executor.executed_ids(), vec![high, normal]);

    dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_fifo_within_class() {
    let executor = MockExecutor::new();
    let dispatcher = Dispatcher::start(fixtures::fast_config(1), Arc::new(executor.clone())).unwrap();

    let mut expected_high = Vec::new();
    let mut expected_normal = Vec::new();
    for station in 1..=10 {
        let priority = if station % 3 == 0 {
            PriorityClass::High
        } else {
            PriorityClass::Normal
        };
        let id = dispatcher.submit(station, ItemKind::Burger, priority).unwrap();
        match priority {
            PriorityClass::High => expected_high.push(id),
            PriorityClass::Normal => expected_normal.push(id),
        }
    }

    wait_for(&dispatcher, Duration::from_secs(5), |s| s.completed == 10).await;

    let expected: Vec<_> = expected_high.into_iter().chain(expected_normal).collect();
    assert_eq!(executor.executed_ids(), expected);

    dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_permits_bound_concurrent_holders() {
    let executor = MockExecutor::new().with_duration(Duration::from_secs(10));
    let config = DispatcherConfig::default()
        .with_workers(3)
        .with_permit_capacity(2);
    let dispatcher = Dispatcher::start(config, Arc::new(executor.clone())).unwrap();

    for station in 1..=3 {
        dispatcher
            .submit(station, ItemKind::Burger, PriorityClass::Normal)
            .unwrap();
    }

    // Every worker has dequeued; one executes, one waits on the station, one on a permit.
    tokio::time::sleep(Duration::from_millis(1)).await;
    let status = dispatcher.status();
    assert_eq!(status.in_flight, 3);
    assert_eq!(status.permits_in_use, 2);
    assert!(matches!(status.station, StationState::Busy(_)));

    let mut max_in_use = 0;
    while dispatcher.snapshot().completed < 3 {
        max_in_use = max_in_use.max(dispatcher.status().permits_in_use);
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    assert!(max_in_use <= 2);
    assert_eq!(executor.max_concurrent(), 1);

    let report = dispatcher.shutdown(Duration::from_secs(60)).await.unwrap();
    assert_eq!(report.dropped, 0);
    assert_eq!(dispatcher.status().permits_in_use, 0);
}

#[tokio::test(start_paused = true)]
async fn test_single_station_serializes_execution() {
    let unit = Duration::from_millis(1000);
    let config = DispatcherConfig::default()
        .with_workers(3)
        .with_execution_units(1);
    let dispatcher = Dispatcher::start(config, Arc::new(SimulatedExecutor::from_units(1, unit))).unwrap();

    let start = Instant::now();
    for i in 0..100u32 {
        let priority = if i % 2 == 0 {
            PriorityClass::High
        } else {
            PriorityClass::Normal
        };
        dispatcher
            .submit(i % 15 + 1, ItemKind::Steak, priority)
            .unwrap();
    }

    wait_for(&dispatcher, Duration::from_secs(500), |s| s.completed == 100).await;
    assert!(start.elapsed() >= unit * 100);

    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.records.len(), 100);
    assert_eq!(snapshot.untracked, 0);
    let min = snapshot.min_duration().unwrap();
    let max = snapshot.max_duration().unwrap();
    assert!(min >= unit);
    assert!(min <= max);
    assert!(snapshot.average_duration().unwrap() >= unit);
    assert_eq!(snapshot.completion_rate(), Some(100.0));

    dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_queued_and_drains_in_flight() {
    let executor = MockExecutor::new().with_duration(Duration::from_secs(10));
    let dispatcher = Dispatcher::start(
        DispatcherConfig::default().with_workers(1),
        Arc::new(executor.clone()),
    )
    .unwrap();

    let first = dispatcher
        .submit(1, ItemKind::Burger, PriorityClass::Normal)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let queued: Vec<_> = (2..=6)
        .map(|station| {
            dispatcher
                .submit(station, ItemKind::Steak, PriorityClass::High)
                .unwrap()
        })
        .collect();
    assert_eq!(dispatcher.status().queue.total(), 5);

    let report = dispatcher.shutdown(Duration::from_secs(60)).await.unwrap();
    assert_eq!(report.dropped, 5);
    assert_eq!(report.drained, 1);

    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.dropped, 5);
    assert_eq!(snapshot.pending(), 0);
    assert_eq!(snapshot.record(first).unwrap().stage, JobStage::Done);
    for id in queued {
        assert_eq!(snapshot.record(id).unwrap().stage, JobStage::Queued);
    }
    assert_eq!(executor.executed_ids(), vec![first]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_timeout_reports_abandoned() {
    let executor = MockExecutor::new().with_duration(Duration::from_secs(600));
    let dispatcher = Dispatcher::start(
        DispatcherConfig::default().with_workers(2),
        Arc::new(executor),
    )
    .unwrap();

    let cooking = dispatcher
        .submit(1, ItemKind::Burger, PriorityClass::High)
        .unwrap();
    let waiting = dispatcher
        .submit(2, ItemKind::Steak, PriorityClass::Normal)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let result = dispatcher.shutdown(Duration::from_secs(1)).await;
    match result {
        Err(DispatchError::ShutdownTimeout {
            dropped,
            drained,
            abandoned,
        }) => {
            assert_eq!(dropped, 0);
            assert_eq!(drained, 0);
            assert_eq!(abandoned, 2);
        }
        other => panic!("expected ShutdownTimeout, got {:?}", other),
    }

    // Let aborted and cancelled workers unwind; they must not record again.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.pending(), 0);
    assert_eq!(snapshot.failed, 2);
    assert_eq!(snapshot.completed, 0);
    for job_id in [cooking, waiting] {
        let record = snapshot.record(job_id).unwrap();
        assert_eq!(record.stage, JobStage::Done);
        assert!(!record.completed);
    }

    assert!(matches!(
        dispatcher.shutdown(Duration::from_secs(1)).await,
        Err(DispatchError::Closed)
    ));
}

#[tokio::test]
async fn test_failed_jobs_counted_and_pool_survives() {
    let executor = MockExecutor::new();
    executor.fail_station(7);
    executor.panic_station(8);
    let dispatcher = Dispatcher::start(fixtures::fast_config(2), Arc::new(executor)).unwrap();

    let failing = dispatcher
        .submit(7, ItemKind::Burger, PriorityClass::Normal)
        .unwrap();
    dispatcher
        .submit(8, ItemKind::Burger, PriorityClass::Normal)
        .unwrap();
    for station in 1..=4 {
        dispatcher
            .submit(station, ItemKind::Steak, PriorityClass::Normal)
            .unwrap();
    }

    wait_for(&dispatcher, Duration::from_secs(5), |s| s.completed + s.failed == 6).await;

    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.completed, 4);
    assert_eq!(snapshot.failed, 2);
    let record = snapshot.record(failing).unwrap();
    assert_eq!(record.stage, JobStage::Done);
    assert!(!record.completed);

    let status = dispatcher.status();
    assert_eq!(status.permits_in_use, 0);
    assert_eq!(status.in_flight, 0);

    dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters_keep_stats_consistent() {
    let dispatcher = Arc::new(
        Dispatcher::start(fixtures::fast_config(3), Arc::new(MockExecutor::new())).unwrap(),
    );

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                for i in 0..25u32 {
                    let priority = if (p + i) % 2 == 0 {
                        PriorityClass::High
                    } else {
                        PriorityClass::Normal
                    };
                    dispatcher
                        .submit(i % 15 + 1, ItemKind::Burger, priority)
                        .unwrap();
                    let snapshot = dispatcher.snapshot();
                    assert!(snapshot.completed <= snapshot.received);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    wait_for(&dispatcher, Duration::from_secs(10), |s| s.completed == 100).await;

    let first = dispatcher.snapshot();
    let second = dispatcher.snapshot();
    assert_eq!(first, second);
    assert_eq!(first.received, 100);
    assert_eq!(first.high_priority_count + first.normal_count, 100);
    assert!(first.min_duration_ms <= first.max_duration_ms);
    assert_eq!(first.records.len(), 100);
    assert!(first.records.iter().all(|r| r.completed));

    dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_subscribe_receives_job_events() {
    let dispatcher = Dispatcher::start(fixtures::fast_config(1), Arc::new(MockExecutor::new())).unwrap();
    let mut events = dispatcher.subscribe();

    let job_id = dispatcher
        .submit(2, ItemKind::Steak, PriorityClass::High)
        .unwrap();

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event not received")
            .unwrap();
        seen.push(event);
    }

    assert!(matches!(
        seen[0],
        StatsEvent::Submitted { job_id: id, tracked: true, .. } if id == job_id
    ));
    assert!(matches!(
        seen[1],
        StatsEvent::StageChanged { stage: JobStage::Executing, .. }
    ));
    assert!(matches!(seen[2], StatsEvent::Completed { job_id: id, .. } if id == job_id));

    dispatcher.shutdown(Duration::from_secs(5)).await.unwrap();
}
