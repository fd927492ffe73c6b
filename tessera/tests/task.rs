use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};
use tessera::{RuntimeBuilder, RuntimeMetrics};
use tessera::error::JoinError;
use tessera::task::{self, Builder, JoinSet, Priority, TaskState, spawn, spawn_blocking, yield_now};
use tessera::time::sleep;

async fn fail(message: &'static str) {
    panic!("{message}");
}

#[tessera::test]
async fn spawned_task_returns_its_output() {
    let handle = spawn(async { 21 * 2 });
    assert_eq!(handle.await, Ok(42));
}

#[tessera::test]
async fn panicking_task_reports_the_message() {
    let handle = spawn(fail("boom"));

    assert_eq!(handle.await, Err(JoinError::Panicked("boom".to_owned())));
}

#[tessera::test(worker_threads = 1)]
async fn a_panic_does_not_kill_the_worker() {
    let failed = spawn(fail("first task fails"));
    assert!(failed.await.unwrap_err().is_panic());

    // The single worker is still alive to run this one.
    assert_eq!(spawn(async { "still running" }).await, Ok("still running"));
}

#[tessera::test]
async fn abort_cancels_a_sleeping_task() {
    let flag = Arc::new(AtomicBool::new(false));

    let handle = spawn({
        let flag = flag.clone();
        async move {
            sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        }
    });

    sleep(Duration::from_millis(10)).await;
    handle.abort();
    assert!(handle.is_finished());

    let result = handle.await;
    assert!(result.unwrap_err().is_cancelled());

    sleep(Duration::from_millis(150)).await;
    assert!(!flag.load(Ordering::SeqCst));
}

#[tessera::test]
async fn abort_after_completion_keeps_the_output() {
    let handle = spawn(async { 7 });
    while !handle.is_finished() {
        yield_now().await;
    }

    handle.abort();
    assert_eq!(handle.await, Ok(7));
}

/// Blocks its worker inside `poll` until released, then finishes with
/// `output` or stays pending.
struct Stall {
    entered: Arc<AtomicBool>,
    release: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
    wake_itself: bool,
    output: Option<u32>,
}

impl Future for Stall {
    type Output = u32;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<u32> {
        if self.wake_itself {
            cx.waker().wake_by_ref();
        }

        self.entered.store(true, Ordering::SeqCst);
        while !self.release.load(Ordering::SeqCst) {
            thread::yield_now();
        }

        match self.output.take() {
            Some(value) => Poll::Ready(value),
            None => Poll::Pending,
        }
    }
}

impl Drop for Stall {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Aborts a task while a worker is inside its `poll`, then lets the poll
/// return. Reports the join result, whether the future was already dropped
/// when the join resolved, and the final counters.
fn abort_while_polling(
    wake_itself: bool,
    output: Option<u32>,
) -> (Result<u32, JoinError>, bool, RuntimeMetrics) {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();
    let entered = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicBool::new(false));

    let handle = rt.spawn(Stall {
        entered: entered.clone(),
        release: release.clone(),
        dropped: dropped.clone(),
        wake_itself,
        output,
    });

    while !entered.load(Ordering::SeqCst) {
        thread::yield_now();
    }

    handle.abort();
    assert!(!handle.is_finished());
    assert!(!dropped.load(Ordering::SeqCst));

    let info = rt
        .tasks()
        .into_iter()
        .find(|info| info.id == handle.id())
        .expect("task is still listed mid-poll");
    assert_eq!(info.state, TaskState::Cancelling);

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        release.store(true, Ordering::SeqCst);
    });

    let result = rt.block_on(handle);
    let dropped_at_join = dropped.load(Ordering::SeqCst);
    releaser.join().unwrap();

    (result, dropped_at_join, rt.metrics())
}

#[test]
fn abort_during_a_poll_resolves_after_the_future_is_dropped() {
    let (result, dropped_at_join, metrics) = abort_while_polling(true, None);

    assert_eq!(result, Err(JoinError::Cancelled));
    assert!(dropped_at_join);
    assert_eq!(metrics.cancelled_tasks, 1);
    assert_eq!(metrics.completed_tasks, 0);
    assert_eq!(metrics.live_tasks, 0);
}

#[test]
fn abort_during_the_final_poll_keeps_the_output() {
    let (result, dropped_at_join, metrics) = abort_while_polling(false, Some(5));

    assert_eq!(result, Ok(5));
    assert!(dropped_at_join);
    assert_eq!(metrics.cancelled_tasks, 0);
    assert_eq!(metrics.completed_tasks, 1);
    assert_eq!(metrics.live_tasks, 0);
}

#[tessera::test]
async fn dropping_the_handle_detaches_the_task() {
    let (tx, rx) = tessera::sync::channel();

    drop(spawn(async move {
        sleep(Duration::from_millis(10)).await;
        tx.send("detached").unwrap();
    }));

    assert_eq!(rx.recv().await, Some("detached"));
}

#[test]
fn yield_now_lets_siblings_run() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let parent = rt.spawn({
        let log = log.clone();
        async move {
            let worker = |name: &'static str| {
                let log = log.clone();
                async move {
                    for _ in 0..3 {
                        log.lock().unwrap().push(name);
                        yield_now().await;
                    }
                }
            };

            let a = spawn(worker("a"));
            let b = spawn(worker("b"));
            a.await.unwrap();
            b.await.unwrap();
        }
    });
    rt.block_on(parent).unwrap();

    assert_eq!(*log.lock().unwrap(), ["a", "b", "a", "b", "a", "b"]);
}

#[test]
fn builder_metadata_shows_up_in_task_listing() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();
    let deadline = Instant::now() + Duration::from_secs(60);

    let handle = rt.block_on(async move {
        let handle = Builder::new()
            .name("sleeper")
            .priority(Priority::High)
            .deadline(deadline)
            .spawn(sleep(Duration::from_secs(10)));

        // Give the worker time to poll it once.
        sleep(Duration::from_millis(20)).await;
        handle
    });

    let tasks = rt.tasks();
    let info = tasks
        .iter()
        .find(|info| info.id == handle.id())
        .expect("sleeping task is listed");

    assert_eq!(info.name.as_deref(), Some("sleeper"));
    assert_eq!(info.priority, Priority::High);
    assert_eq!(info.deadline, Some(deadline));
    assert_eq!(info.state, TaskState::Sleeping);

    handle.abort();
    assert!(rt.tasks().iter().all(|info| info.id != handle.id()));
    assert!(rt.metrics().cancelled_tasks >= 1);
}

#[tessera::test]
async fn task_past_its_deadline_still_completes() {
    let handle = Builder::new()
        .name("late")
        .deadline(Instant::now())
        .spawn(async {
            sleep(Duration::from_millis(5)).await;
            "finished"
        });

    assert_eq!(handle.await, Ok("finished"));
}

#[test]
fn metrics_count_outcomes() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();

    rt.block_on(async {
        let ok = spawn(async { 1 });
        let failed = spawn(fail("counted"));
        assert!(ok.await.is_ok());
        assert!(failed.await.is_err());
    });

    let metrics = rt.metrics();
    assert_eq!(metrics.spawned_tasks, 2);
    assert_eq!(metrics.completed_tasks, 1);
    assert_eq!(metrics.panicked_tasks, 1);
    assert!(metrics.polls >= 2);
    assert_eq!(metrics.live_tasks, 0);
}

#[test]
fn runtime_drop_cancels_pending_tasks() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();
    let dropped = Arc::new(AtomicBool::new(false));

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let handle = rt.spawn({
        let guard = SetOnDrop(dropped.clone());
        async move {
            let _guard = guard;
            sleep(Duration::from_secs(60)).await;
        }
    });

    rt.block_on(sleep(Duration::from_millis(20)));
    drop(rt);

    assert!(dropped.load(Ordering::SeqCst));
    assert!(handle.is_finished());
}

#[test]
#[should_panic(expected = "must be called within the context of a tessera runtime")]
fn spawn_outside_a_runtime_panics() {
    let _ = spawn(async {});
}

#[tessera::test]
async fn spawn_blocking_returns_the_closure_result() {
    let handle = spawn_blocking(|| {
        std::thread::sleep(Duration::from_millis(20));
        std::thread::current().name().map(str::to_owned)
    });

    assert_eq!(handle.await, Ok(Some("tessera-blocking".to_owned())));
}

#[tessera::test]
async fn spawn_blocking_does_not_stall_other_tasks() {
    let blocking = spawn_blocking(|| std::thread::sleep(Duration::from_millis(100)));

    let start = Instant::now();
    sleep(Duration::from_millis(10)).await;
    assert!(start.elapsed() < Duration::from_millis(90));

    blocking.await.unwrap();
}

#[tessera::test]
async fn spawn_blocking_panic_becomes_join_error() {
    let handle = spawn_blocking(|| -> u32 { panic!("blocking failure") });

    assert_eq!(
        handle.await,
        Err(JoinError::Panicked("blocking failure".to_owned()))
    );
}

#[tessera::test]
async fn joinset_join_next_in_completion_order() {
    let mut set = JoinSet::new();

    set.spawn(async {
        sleep(Duration::from_millis(80)).await;
        "slow"
    });
    set.spawn(async {
        sleep(Duration::from_millis(10)).await;
        "fast"
    });

    assert_eq!(set.join_next().await, Some(Ok("fast")));
    assert_eq!(set.join_next().await, Some(Ok("slow")));
    assert_eq!(set.join_next().await, None);
}

#[tessera::test]
async fn joinset_join_all_collects_everything() {
    let mut set = JoinSet::new();
    for i in 0..5u32 {
        set.spawn(async move { i * i });
    }

    let mut results: Vec<u32> = set.join_all().await.into_iter().map(Result::unwrap).collect();
    results.sort_unstable();

    assert_eq!(results, vec![0, 1, 4, 9, 16]);
    assert!(set.is_empty());
}

#[tessera::test]
async fn joinset_abort_all() {
    let mut set = JoinSet::new();

    set.spawn(async move {
        sleep(Duration::from_millis(500)).await;
        "should be cancelled"
    });

    set.abort_all();

    assert!(set.is_empty());
    assert!(set.join_next().await.is_none());
}

#[tessera::test]
async fn joinset_drop_cancels_tasks() {
    let flag = Arc::new(AtomicBool::new(false));

    {
        let mut set = JoinSet::new();
        let flag = flag.clone();
        set.spawn(async move {
            sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        });
    }

    sleep(Duration::from_millis(150)).await;

    assert!(!flag.load(Ordering::SeqCst));
}

#[tessera::test]
async fn joinset_is_empty_and_len() {
    let mut set = JoinSet::new();
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);

    set.spawn(async move { sleep(Duration::from_millis(10)).await });
    set.spawn(async move { sleep(Duration::from_millis(10)).await });
    assert_eq!(set.len(), 2);

    set.join_next().await;
    assert_eq!(set.len(), 1);

    set.join_next().await;
    assert!(set.is_empty());
}

#[test]
fn task_ids_are_unique() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();

    let ids = rt.block_on(async {
        let handles: Vec<_> = (0..50).map(|_| task::spawn(async {})).collect();
        let ids: Vec<_> = handles.iter().map(|h| h.id()).collect();
        for handle in handles {
            handle.await.unwrap();
        }
        ids
    });

    let unique: std::collections::HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}
