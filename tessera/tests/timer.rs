use std::time::{Duration, Instant};
use tessera::task;
use tessera::time::{interval, sleep, sleep_until};

#[tessera::test]
async fn sleep_waits_at_least_the_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await;

    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[tessera::test]
async fn zero_sleep_is_immediate() {
    let start = Instant::now();
    sleep(Duration::ZERO).await;

    assert!(start.elapsed() < Duration::from_millis(50));
}

#[tessera::test]
async fn sleep_until_past_deadline_is_immediate() {
    let deadline = Instant::now();
    let start = Instant::now();
    sleep_until(deadline).await;

    assert!(start.elapsed() < Duration::from_millis(50));
}

#[tessera::test]
async fn sleep_until_future_deadline() {
    let deadline = Instant::now() + Duration::from_millis(30);
    sleep_until(deadline).await;

    assert!(Instant::now() >= deadline);
}

#[tessera::test]
async fn reset_moves_the_deadline() {
    let start = Instant::now();
    let mut timer = sleep(Duration::from_secs(10));
    timer.reset(start + Duration::from_millis(20));
    assert_eq!(timer.deadline(), start + Duration::from_millis(20));

    timer.await;
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tessera::test(worker_threads = 4)]
async fn many_sleeps_fire_in_deadline_order() {
    let (tx, rx) = tessera::sync::channel();

    for i in (0..5u64).rev() {
        let tx = tx.clone();
        task::spawn(async move {
            sleep(Duration::from_millis(20 + i * 30)).await;
            tx.send(i).unwrap();
        });
    }
    drop(tx);

    let mut order = Vec::new();
    while let Some(i) = rx.recv().await {
        order.push(i);
    }

    assert_eq!(order, vec![0, 1, 2, 3, 4]);
}

#[tessera::test]
async fn interval_first_tick_after_one_period() {
    let start = Instant::now();
    let mut ticker = interval(Duration::from_millis(20));

    ticker.tick().await;
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[tessera::test]
async fn interval_ticks_are_spaced_by_period() {
    let mut ticker = interval(Duration::from_millis(15));
    assert_eq!(ticker.period(), Duration::from_millis(15));

    let mut previous = ticker.tick().await;
    for _ in 0..3 {
        let next = ticker.tick().await;
        assert!(next - previous >= Duration::from_millis(15));
        previous = next;
    }
}

#[tessera::test]
async fn interval_skips_missed_ticks() {
    let mut ticker = interval(Duration::from_millis(10));
    let first = ticker.tick().await;

    // Fall several periods behind.
    std::thread::sleep(Duration::from_millis(55));

    let late = ticker.tick().await;
    let after = ticker.tick().await;

    // The late tick fires once, then the grid restarts from now instead of
    // bursting through the missed ones.
    assert_eq!(late, first + Duration::from_millis(10));
    assert!(after >= first + Duration::from_millis(55));
}

#[test]
#[should_panic(expected = "interval period must be non-zero")]
fn interval_rejects_zero_period() {
    let _ = interval(Duration::ZERO);
}
