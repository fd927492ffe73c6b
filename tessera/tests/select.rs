use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tessera::future::select_all;
use tessera::sync::channel;
use tessera::time::sleep;
use tessera::{RuntimeBuilder, select};

#[tessera::test]
async fn select_single_future() {
    let result = select! {
        async { 42 } => |v| v * 2,
    };

    assert_eq!(result, 84);
}

#[tessera::test]
async fn select_prefers_earlier_branch_when_both_ready() {
    let result = select! {
        async { 10 } => |v| v,
        async { 20 } => |v| v,
    };

    assert_eq!(result, 10);
}

#[tessera::test]
async fn select_handlers_may_differ_in_input_type() {
    let result = select! {
        async { 42i32 } => |v| format!("number: {}", v),
        async { "hello" } => |v| format!("string: {}", v),
    };

    assert_eq!(result, "number: 42");
}

#[tessera::test]
async fn select_first_to_finish_wins() {
    let start = Instant::now();

    let result = select! {
        sleep(Duration::from_millis(300)) => |_| "slow",
        sleep(Duration::from_millis(10)) => |_| "fast",
    };

    assert_eq!(result, "fast");
    assert!(start.elapsed() < Duration::from_millis(250));
}

#[tessera::test]
async fn select_with_captured_values() {
    let multiplier = 10;

    let result = select! {
        async { 5 } => |v| v * multiplier,
        async { 3 } => |v| v * multiplier,
    };

    assert_eq!(result, 50);
}

#[tessera::test]
async fn select_pattern_binding() {
    let result = select! {
        async { (1, 2) } => |(a, b)| a + b,
        async { (3, 4) } => |(a, b)| a * b,
    };

    assert_eq!(result, 3);
}

#[tessera::test]
async fn select_option_pattern() {
    let result = select! {
        async { None::<i32> } => |opt: Option<i32>| opt.unwrap_or(-1),
        async { Some(42) } => |opt: Option<i32>| opt.unwrap_or(0),
    };

    assert_eq!(result, -1);
}

#[tessera::test]
async fn select_losing_branch_never_runs_again() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();

    select! {
        sleep(Duration::from_millis(10)) => |_| {},
        async move {
            sleep(Duration::from_millis(100)).await;
            c.fetch_add(1, Ordering::SeqCst);
        } => |_| {},
    };

    sleep(Duration::from_millis(200)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tessera::test]
async fn select_over_channel_and_timer() {
    let (tx, rx) = channel::<u32>();

    tessera::task::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        tx.send(7).unwrap();
    });

    let got = select! {
        rx.recv() => |v: Option<u32>| v,
        sleep(Duration::from_secs(5)) => |_| None,
    };

    assert_eq!(got, Some(7));
}

#[test]
fn select_drops_the_losing_timer() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();

    rt.block_on(async {
        select! {
            async {} => |_| {},
            sleep(Duration::from_secs(10)) => |_| {},
        };
    });

    // The losing sleep was never polled, so it never registered a timer.
    assert_eq!(rt.metrics().pending_timers, 0);

    rt.block_on(async {
        select! {
            sleep(Duration::from_millis(10)) => |_| {},
            sleep(Duration::from_secs(10)) => |_| {},
        };
    });

    assert_eq!(rt.metrics().pending_timers, 0);
}

type Racer = Pin<Box<dyn Future<Output = u64> + Send>>;

#[tessera::test]
async fn select_all_reports_winner_index() {
    let racers: Vec<Racer> = (0..4u64)
        .map(|i| -> Racer {
            Box::pin(async move {
                sleep(Duration::from_millis(200 - i * 50)).await;
                i
            })
        })
        .collect();

    let (value, index) = select_all(racers).await;

    assert_eq!(value, 3);
    assert_eq!(index, 3);
}

#[tessera::test]
#[should_panic(expected = "select_all requires at least one future")]
async fn select_all_panics_on_empty_input() {
    select_all(Vec::<Racer>::new()).await;
}
