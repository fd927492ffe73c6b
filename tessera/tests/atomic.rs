use std::ptr;
use std::sync::{Arc, Barrier};
use std::thread;
use tessera::atomic::{AtomicCell, AtomicRefCount, Backoff, Ordering};

#[test]
fn cell_basic_operations() {
    let cell = AtomicCell::new(10u32);

    assert_eq!(cell.swap(20, Ordering::AcqRel), 10);
    assert_eq!(cell.fetch_sub(5, Ordering::AcqRel), 20);
    assert_eq!(cell.fetch_max(40, Ordering::AcqRel), 15);
    assert_eq!(cell.fetch_min(3, Ordering::AcqRel), 40);
    assert_eq!(cell.fetch_or(0b100, Ordering::AcqRel), 3);
    assert_eq!(cell.fetch_and(0b110, Ordering::AcqRel), 0b111);
    assert_eq!(cell.fetch_xor(0b010, Ordering::AcqRel), 0b110);
    assert_eq!(cell.load(Ordering::Acquire), 0b100);

    cell.store(1, Ordering::Release);
    assert_eq!(cell.into_inner(), 1);
}

#[test]
fn cell_fetch_update_retries_until_applied() {
    let cell = AtomicCell::new(7usize);

    assert_eq!(
        cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(10)),
        Err(7)
    );
    assert_eq!(
        cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n * 2)),
        Ok(7)
    );
    assert_eq!(cell.get(), 14);
}

#[test]
fn cell_holds_bools_and_pointers() {
    let flag = AtomicCell::new(false);
    assert_eq!(flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire), Ok(false));
    assert_eq!(flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire), Err(true));

    let mut value = 3i32;
    let pointer = AtomicCell::new(ptr::null_mut::<i32>());
    assert!(pointer.load(Ordering::Acquire).is_null());

    pointer.store(&mut value, Ordering::Release);
    assert_eq!(pointer.load(Ordering::Acquire), &mut value as *mut i32);
}

#[test]
fn concurrent_fetch_add_loses_no_update() {
    let cell = Arc::new(AtomicCell::new(0u64));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let cell = cell.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    cell.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(cell.load(Ordering::Acquire), 80_000);
}

#[test]
fn concurrent_weak_cas_loop_counts_exactly() {
    let cell = Arc::new(AtomicCell::new(0i64));

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let cell = cell.clone();
            thread::spawn(move || {
                let backoff = Backoff::new();
                for _ in 0..5_000 {
                    let mut current = cell.load(Ordering::Relaxed);
                    loop {
                        match cell.compare_exchange_weak(
                            current,
                            current + 1,
                            Ordering::AcqRel,
                            Ordering::Relaxed,
                        ) {
                            Ok(_) => break,
                            Err(observed) => {
                                current = observed;
                                backoff.spin();
                            }
                        }
                    }
                    backoff.reset();
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(cell.get(), 20_000);
}

#[test]
fn refcount_zero_is_observed_by_exactly_one_of_two_threads() {
    for _ in 0..200 {
        let count = Arc::new(AtomicRefCount::new(2));
        let barrier = Arc::new(Barrier::new(2));

        let threads: Vec<_> = (0..2)
            .map(|_| {
                let count = count.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    count.decrement()
                })
            })
            .collect();

        let results: Vec<bool> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|&&zero| zero).count(), 1);
        assert_eq!(count.count(), 0);
    }
}

#[test]
fn refcount_two_decrements_from_one_reach_zero_once() {
    // Starting at 1 with one extra owner handed to a second thread.
    let count = Arc::new(AtomicRefCount::new(1));
    count.increment();

    let other = {
        let count = count.clone();
        thread::spawn(move || count.decrement())
    };

    let here = count.decrement();
    let there = other.join().unwrap();

    assert!(here ^ there);
}

#[test]
#[should_panic(expected = "reference count released below zero")]
fn refcount_underflow_panics() {
    let count = AtomicRefCount::new(1);
    assert!(count.decrement());
    count.decrement();
}

#[test]
fn backoff_completes_after_enough_snoozes() {
    let backoff = Backoff::new();
    assert!(!backoff.is_completed());

    for _ in 0..20 {
        backoff.snooze();
    }
    assert!(backoff.is_completed());

    backoff.reset();
    assert!(!backoff.is_completed());
}
