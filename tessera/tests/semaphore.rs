use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tessera::RuntimeBuilder;
use tessera::error::{AcquireError, TryAcquireError};
use tessera::sync::Semaphore;
use tessera::task;
use tessera::time::sleep;

#[test]
fn never_more_holders_than_permits() {
    let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();

    let semaphore = Arc::new(Semaphore::new(3));
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    rt.block_on({
        let semaphore = semaphore.clone();
        let peak = peak.clone();
        async move {
            let handles: Vec<_> = (0..20)
                .map(|_| {
                    let semaphore = semaphore.clone();
                    let active = active.clone();
                    let peak = peak.clone();
                    task::spawn(async move {
                        let _permit = semaphore.acquire().await.unwrap();

                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                })
                .collect();

            for handle in handles {
                handle.await.unwrap();
            }
        }
    });

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(semaphore.available_permits(), 3);
}

#[tessera::test]
async fn try_acquire_reports_exhaustion() {
    let semaphore = Semaphore::new(1);

    let permit = semaphore.try_acquire().unwrap();
    assert_eq!(
        semaphore.try_acquire().unwrap_err(),
        TryAcquireError::NoPermits
    );

    drop(permit);
    assert_eq!(semaphore.available_permits(), 1);
}

#[tessera::test]
async fn forgotten_permit_is_not_returned() {
    let semaphore = Semaphore::new(2);

    semaphore.acquire().await.unwrap().forget();
    assert_eq!(semaphore.available_permits(), 1);

    semaphore.add_permits(1);
    assert_eq!(semaphore.available_permits(), 2);
}

#[tessera::test]
async fn add_permits_wakes_a_waiter() {
    let semaphore = Arc::new(Semaphore::new(0));

    let waiter = task::spawn({
        let semaphore = semaphore.clone();
        async move {
            semaphore.acquire().await.unwrap().forget();
            "acquired"
        }
    });

    sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    semaphore.add_permits(1);
    assert_eq!(waiter.await.unwrap(), "acquired");
    assert_eq!(semaphore.available_permits(), 0);
}

#[tessera::test]
async fn close_fails_pending_and_future_acquires() {
    let semaphore = Arc::new(Semaphore::new(0));

    let waiter = task::spawn({
        let semaphore = semaphore.clone();
        async move { semaphore.acquire().await.map(|permit| permit.forget()) }
    });

    sleep(Duration::from_millis(20)).await;
    semaphore.close();

    assert_eq!(waiter.await.unwrap(), Err(AcquireError::Closed));
    assert!(semaphore.is_closed());
    assert!(matches!(semaphore.acquire().await, Err(AcquireError::Closed)));
    assert_eq!(
        semaphore.try_acquire().unwrap_err(),
        TryAcquireError::Closed
    );
}
