use std::time::{Duration, Instant};
use tessera::RuntimeBuilder;
use tessera::error::Elapsed;
use tessera::task;
use tessera::time::{sleep, timeout};

#[tessera::test]
async fn timeout_completes_before_deadline() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(10)).await;
        123
    });

    let result = timeout(Duration::from_millis(500), handle).await;

    assert!(matches!(result, Ok(Ok(123))), "got {result:?}");
}

#[tessera::test]
async fn timeout_expires() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(200)).await;
        456
    });

    let result = timeout(Duration::from_millis(20), handle).await;

    assert_eq!(result.unwrap_err(), Elapsed);
}

#[tessera::test]
async fn timeout_of_ready_future_never_elapses() {
    let result = timeout(Duration::ZERO, async { "ready" }).await;
    assert_eq!(result, Ok("ready"));
}

#[test]
fn timeout_fires_at_its_own_deadline_and_cancels_inner_sleep() {
    let rt = RuntimeBuilder::new().worker_threads(2).build().unwrap();

    let (result, elapsed) = rt.block_on(async {
        let start = Instant::now();
        let result = timeout(Duration::from_millis(50), sleep(Duration::from_millis(500))).await;
        (result, start.elapsed())
    });

    assert_eq!(result, Err(Elapsed));
    assert!(elapsed >= Duration::from_millis(50), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "fired late: {elapsed:?}");

    // The inner sleep was dropped with the timeout, taking its timer along.
    assert_eq!(rt.metrics().pending_timers, 0);
}

#[test]
fn successful_timeout_leaves_no_timer_behind() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    let result = rt.block_on(async {
        timeout(Duration::from_secs(10), sleep(Duration::from_millis(10))).await
    });

    assert_eq!(result, Ok(()));
    assert_eq!(rt.metrics().pending_timers, 0);
}

#[tessera::test]
async fn timeout_error_converts_into_crate_error() {
    async fn slow() -> tessera::Result<u32> {
        let value = timeout(Duration::from_millis(5), async {
            sleep(Duration::from_secs(1)).await;
            1
        })
        .await?;
        Ok(value)
    }

    assert!(matches!(slow().await, Err(tessera::Error::Elapsed(_))));
}
