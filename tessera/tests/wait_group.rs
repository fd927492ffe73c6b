use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tessera::sync::WaitGroup;
use tessera::task;
use tessera::time::sleep;

#[tessera::test(worker_threads = 4)]
async fn wait_resolves_after_every_done() {
    let group = WaitGroup::new();
    let finished = Arc::new(AtomicUsize::new(0));

    for i in 0..10u64 {
        group.add(1);
        let group = group.clone();
        let finished = finished.clone();
        task::spawn(async move {
            sleep(Duration::from_millis(5 + i * 2)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            group.done();
        });
    }

    group.wait().await;

    assert_eq!(group.count(), 0);
    assert_eq!(finished.load(Ordering::SeqCst), 10);
}

#[tessera::test]
async fn wait_on_zero_count_is_immediate() {
    let group = WaitGroup::new();
    group.wait().await;

    group.add(2);
    group.done();
    group.done();
    group.wait().await;
}

#[tessera::test]
async fn several_waiters_are_all_released() {
    let group = WaitGroup::new();
    group.add(1);

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let group = group.clone();
            task::spawn(async move { group.wait().await })
        })
        .collect();

    sleep(Duration::from_millis(20)).await;
    assert!(waiters.iter().all(|w| !w.is_finished()));

    group.done();
    for waiter in waiters {
        waiter.await.unwrap();
    }
}

#[test]
#[should_panic(expected = "WaitGroup::done called more times than add")]
fn done_without_add_panics() {
    WaitGroup::new().done();
}
