//! Integration tests for the scheduler engine.
//!
//! These drive whole runs through `start`: concurrency bounds, FIFO
//! ordering, failure aggregation, hook behavior, and locking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, timeout};

use tasklane_scheduler::{
    QueueStrategy, Scheduler, SchedulerError, SchedulerOptions, TaskFailure, TaskHandle, start,
};

const TIMEOUT: Duration = Duration::from_secs(5);

type Sched = Scheduler<u32, String>;

/// Tracks how many units are inside their body at once.
#[derive(Clone, Default)]
struct Gauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn failed(msg: &str) -> TaskFailure<String> {
    TaskFailure::Failed(msg.to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_slots_five_tasks() {
    let gauge = Gauge::default();
    let handles: Arc<Mutex<Vec<TaskHandle<u32, String>>>> = Arc::default();

    let init_gauge = gauge.clone();
    let init_handles = Arc::clone(&handles);
    let completion = start(
        move |s: Sched| async move {
            init_gauge.enter();
            for i in 1..=5 {
                let g = init_gauge.clone();
                let h = s
                    .schedule(move || async move {
                        g.enter();
                        sleep(Duration::from_millis(5)).await;
                        g.exit();
                        Ok(i)
                    })
                    .unwrap();
                init_handles.lock().unwrap().push(h);
            }
            sleep(Duration::from_millis(5)).await;
            init_gauge.exit();
            Ok::<_, String>(0)
        },
        SchedulerOptions::new().max_concurrency(2),
    )
    .unwrap();

    let value = timeout(TIMEOUT, completion).await.unwrap();
    assert_eq!(value, Ok(0));
    assert!(gauge.peak() <= 2, "peak concurrency {}", gauge.peak());

    let handles = std::mem::take(&mut *handles.lock().unwrap());
    let mut values = Vec::new();
    for h in handles {
        values.push(h.await.unwrap());
    }
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn failure_then_success_on_single_slot() {
    let handles: Arc<Mutex<Vec<TaskHandle<u32, String>>>> = Arc::default();
    let init_handles = Arc::clone(&handles);
    let completion = start(
        move |s: Sched| async move {
            let a = s.schedule(|| async { Err("x".to_string()) }).unwrap();
            let b = s.schedule(|| async { Ok(42) }).unwrap();
            init_handles.lock().unwrap().extend([a, b]);
            Ok::<_, String>(0)
        },
        SchedulerOptions::new().max_concurrency(1),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[failed("x")]);
    assert_eq!(err.errors().cloned().collect::<Vec<_>>(), vec!["x".to_string()]);

    let mut handles = std::mem::take(&mut *handles.lock().unwrap()).into_iter();
    assert_eq!(handles.next().unwrap().await, Err(failed("x")));
    assert_eq!(handles.next().unwrap().await, Ok(42));
}

#[tokio::test]
async fn swallowing_rejection_resolves_completion() {
    let completion = start(
        |s: Sched| async move {
            let h = s.schedule(|| async { Err("ignored".to_string()) }).unwrap();
            // The handle still sees the real failure.
            assert_eq!(h.await, Err(failed("ignored")));
            Ok::<_, String>(5)
        },
        SchedulerOptions::new().on_rejected(|_| Ok(())),
    )
    .unwrap();

    assert_eq!(timeout(TIMEOUT, completion).await.unwrap(), Ok(5));
}

#[tokio::test]
async fn substituted_rejection_is_recorded_instead() {
    let completion = start(
        |s: Sched| async move {
            s.schedule(|| async { Err("original".to_string()) }).unwrap();
            Ok::<_, String>(0)
        },
        SchedulerOptions::new().on_rejected(|f: &TaskFailure<String>| {
            Err(format!("wrapped({f})"))
        }),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[failed("wrapped(original)")]);
}

#[tokio::test]
async fn failing_resolve_hook_is_captured() {
    let completion = start(
        |s: Sched| async move {
            let low = s.schedule(|| async { Ok(1) }).unwrap();
            let high = s.schedule(|| async { Ok(100) }).unwrap();
            // Handles are unaffected by what the hook records.
            assert_eq!(low.await, Ok(1));
            assert_eq!(high.await, Ok(100));
            Ok::<_, String>(0)
        },
        SchedulerOptions::new().on_resolved(|v: &u32| {
            if *v > 10 {
                Err(format!("{v} too big"))
            } else {
                Ok(())
            }
        }),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[failed("100 too big")]);
}

#[tokio::test]
async fn failures_are_kept_in_settlement_order() {
    let completion = start(
        |s: Sched| async move {
            s.schedule(|| async {
                sleep(Duration::from_millis(60)).await;
                Err("slow".to_string())
            })
            .unwrap();
            s.schedule(|| async { Err("fast".to_string()) }).unwrap();
            Ok::<_, String>(0)
        },
        SchedulerOptions::new(),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[failed("fast"), failed("slow")]);
}

#[tokio::test]
async fn sibling_failures_do_not_abort_work() {
    let done = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&done);
    let completion = start(
        move |s: Sched| async move {
            for i in 0..10_u32 {
                let counter = Arc::clone(&counter);
                s.schedule(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if i % 3 == 0 {
                        Err(format!("task {i}"))
                    } else {
                        Ok(i)
                    }
                })
                .unwrap();
            }
            Ok::<_, String>(0)
        },
        SchedulerOptions::new().max_concurrency(3),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(done.load(Ordering::SeqCst), 10);
    let mut messages: Vec<_> = err.errors().cloned().collect();
    messages.sort();
    assert_eq!(messages, vec!["task 0", "task 3", "task 6", "task 9"]);
}

#[tokio::test]
async fn initializer_failure_fails_completion() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let completion = start(
        move |s: Sched| async move {
            s.schedule(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .unwrap();
            Err::<u32, _>("init broke".to_string())
        },
        SchedulerOptions::new(),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[failed("init broke")]);
    assert_eq!(ran.load(Ordering::SeqCst), 1, "scheduled task still ran");
}

#[tokio::test]
async fn task_panic_becomes_failure() {
    let completion = start(
        |s: Sched| async move {
            let h = s
                .schedule(|| async {
                    if true {
                        panic!("kaboom");
                    }
                    Ok(0)
                })
                .unwrap();
            assert_eq!(h.await, Err(TaskFailure::Panicked("kaboom".into())));
            Ok::<_, String>(0)
        },
        SchedulerOptions::new(),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[TaskFailure::Panicked("kaboom".into())]);
}

#[tokio::test]
async fn hook_panic_becomes_failure() {
    let completion = start(
        |s: Sched| async move {
            s.schedule(|| async { Ok(1) }).unwrap();
            Ok::<_, String>(0)
        },
        SchedulerOptions::new().on_resolved(|_| panic!("hook exploded")),
    )
    .unwrap();

    let err = timeout(TIMEOUT, completion).await.unwrap().unwrap_err();
    assert_eq!(err.failures(), &[TaskFailure::Panicked("hook exploded".into())]);
}

#[tokio::test]
async fn schedule_after_settlement_is_locked() {
    let completion = start(
        |s: Sched| async move {
            s.schedule(|| async { Ok(1) }).unwrap();
            Ok::<_, String>(s.clone())
        },
        SchedulerOptions::new(),
    )
    .unwrap();

    let s = timeout(TIMEOUT, completion).await.unwrap().unwrap();
    assert!(s.is_locked());
    let before = s.stats();
    assert!(matches!(s.schedule(|| async { Ok(2) }), Err(SchedulerError::Locked)));
    assert!(matches!(s.schedule_fn(|| Ok(3)), Err(SchedulerError::Locked)));
    let after = s.stats();
    assert_eq!(before.submitted, after.submitted);
    assert_eq!(after.resolved, 1);
}

#[tokio::test]
async fn invalid_limits_fail_synchronously() {
    let err = start(
        |_s: Sched| async move { Ok::<_, String>(()) },
        SchedulerOptions::new().max_concurrency(0),
    )
    .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConcurrency(_)));

    for raw in ["0", "-1", "NaN", "lots"] {
        let err = raw.parse::<tasklane_scheduler::Concurrency>().unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConcurrency(_)), "{raw}");
    }
}

/// Every task schedules two children until depth 4; 1 + 2 + 4 + 8 + 16 tasks.
fn spawn_tree(s: Sched, depth: u32, gauge: Gauge, count: Arc<AtomicUsize>) {
    let child = s.clone();
    s.schedule(move || async move {
        gauge.enter();
        count.fetch_add(1, Ordering::SeqCst);
        if depth < 4 {
            for _ in 0..2 {
                spawn_tree(child.clone(), depth + 1, gauge.clone(), Arc::clone(&count));
            }
        }
        sleep(Duration::from_millis(1)).await;
        gauge.exit();
        Ok(depth)
    })
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reentrant_scheduling_respects_the_limit() {
    for strategy in [QueueStrategy::Ring, QueueStrategy::Deque] {
        let gauge = Gauge::default();
        let count = Arc::new(AtomicUsize::new(0));
        let (g, c) = (gauge.clone(), Arc::clone(&count));
        let completion = start(
            move |s: Sched| async move {
                spawn_tree(s.clone(), 0, g, c);
                Ok::<_, String>(s.clone())
            },
            SchedulerOptions::new()
                .max_concurrency(3)
                .queue_strategy(strategy),
        )
        .unwrap();

        let s = timeout(TIMEOUT, completion).await.unwrap().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 31);
        assert!(gauge.peak() <= 3, "peak concurrency {}", gauge.peak());
        let stats = s.stats();
        assert!(stats.peak_live_units <= 3);
        assert_eq!(stats.resolved, 31);
        assert_eq!(stats.submitted, 31);
    }
}

#[tokio::test]
async fn unbounded_never_queues() {
    let completion = start(
        |s: Sched| async move {
            for i in 0..50 {
                s.schedule(move || async move { Ok(i) }).unwrap();
            }
            assert_eq!(s.pending_len(), 0);
            Ok::<_, String>(s.clone())
        },
        SchedulerOptions::new(),
    )
    .unwrap();

    let s = timeout(TIMEOUT, completion).await.unwrap().unwrap();
    let stats = s.stats();
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.admitted, 50);
    assert_eq!(stats.peak_live_units, 51);
}

#[tokio::test]
async fn hooks_finish_before_the_slot_is_reused() {
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let task_log = Arc::clone(&log);
    let resolved_log = Arc::clone(&log);
    let rejected_log = Arc::clone(&log);
    let completion = start(
        move |s: Sched| async move {
            for i in 0..5_u32 {
                let log = Arc::clone(&task_log);
                s.schedule(move || async move {
                    log.lock().unwrap().push(format!("run{i}"));
                    tokio::task::yield_now().await;
                    if i == 2 {
                        Err(format!("task {i}"))
                    } else {
                        Ok(i)
                    }
                })
                .unwrap();
            }
            Ok::<_, String>(0)
        },
        SchedulerOptions::new()
            .max_concurrency(1)
            .on_resolved(move |v: &u32| {
                resolved_log.lock().unwrap().push(format!("ok{v}"));
                Ok(())
            })
            .on_rejected(move |_| {
                rejected_log.lock().unwrap().push("rej".to_string());
                Ok(())
            }),
    )
    .unwrap();

    assert_eq!(timeout(TIMEOUT, completion).await.unwrap(), Ok(0));
    assert_eq!(
        *log.lock().unwrap(),
        ["run0", "ok0", "run1", "ok1", "run2", "rej", "run3", "ok3", "run4", "ok4"]
    );
}
