/*!
 * Butex Integration Tests
 *
 * Wake/wait/requeue behaviour across threads, for every parking strategy
 */

use butex::{
    Butex, ButexCore, ButexMemory, Context, Deadline, StrategyType, SyncConfig, WaitError,
};
use parking_lot::Mutex;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const STRATEGIES: [StrategyType; 3] = [
    StrategyType::Futex,
    StrategyType::Condvar,
    StrategyType::SpinWait,
];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn long_deadline() -> Option<Deadline> {
    Some(Deadline::after(Duration::from_secs(10)))
}

/// Block until `count` waiters are queued (waiters register asynchronously)
fn wait_for_waiters(butex: &ButexCore, count: usize) {
    let give_up = Instant::now() + Duration::from_secs(10);
    while butex.waiter_count() != count && Instant::now() < give_up {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(butex.waiter_count(), count, "waiters never queued");
}

#[test]
fn test_wake_all_resumes_every_waiter() {
    init_logging();
    const WAITERS: usize = 100;

    let butex = Butex::create();
    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let butex = butex.clone();
            thread::spawn(move || butex.wait(0, long_deadline()))
        })
        .collect();

    wait_for_waiters(&butex, WAITERS);
    assert_eq!(butex.wake_all(), WAITERS);

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
    assert_eq!(butex.wake_all(), 0);
}

#[test]
fn test_each_strategy_wakes_all() {
    for strategy in STRATEGIES {
        let butex = Butex::with_config(SyncConfig::with_strategy(strategy));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let butex = butex.clone();
                thread::spawn(move || butex.wait(0, long_deadline()))
            })
            .collect();

        wait_for_waiters(&butex, 8);
        assert_eq!(butex.wake_all(), 8, "strategy {}", strategy);

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(()), "strategy {}", strategy);
        }
    }
}

#[test]
fn test_wake_is_fifo() {
    init_logging();
    const WAITERS: usize = 6;

    let butex = Butex::create();
    let resumed = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();

    // Serialize enqueue order: waiter i only starts once i waiters are queued
    for index in 0..WAITERS {
        let (butex_clone, resumed) = (butex.clone(), resumed.clone());
        handles.push(thread::spawn(move || {
            let result = butex_clone.wait(0, long_deadline());
            resumed.lock().push(index);
            result
        }));
        wait_for_waiters(&butex, index + 1);
    }

    for index in 0..WAITERS {
        assert_eq!(butex.wake(), 1);

        let give_up = Instant::now() + Duration::from_secs(10);
        while resumed.lock().len() <= index && Instant::now() < give_up {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(resumed.lock()[index], index, "wake #{} resumed the wrong waiter", index);
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
}

#[test]
fn test_no_lost_wakeup_after_mutation() {
    let butex = Butex::create();
    butex.store(1);
    assert_eq!(butex.wake(), 0);

    let start = Instant::now();
    assert_eq!(butex.wait(0, None), Err(WaitError::ValueMismatch));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_mutate_then_wake_races_wait() {
    // Whatever the interleaving, the waiter ends: woken or mismatched, never stuck
    for strategy in STRATEGIES {
        for _ in 0..50 {
            let butex = Butex::with_config(SyncConfig::with_strategy(strategy));
            let barrier = Arc::new(Barrier::new(2));

            let waiter = {
                let (butex, barrier) = (butex.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    butex.wait(0, long_deadline())
                })
            };

            barrier.wait();
            butex.store(1);
            butex.wake();

            let result = waiter.join().unwrap();
            assert!(
                result.is_ok() || result == Err(WaitError::ValueMismatch),
                "unexpected {:?} with {}",
                result,
                strategy
            );
        }
    }
}

#[test]
fn test_requeue_wakes_one_and_moves_the_rest() {
    init_logging();
    let a = Butex::create();
    let b = Butex::create();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let a = a.clone();
            thread::spawn(move || a.wait(0, long_deadline()))
        })
        .collect();

    wait_for_waiters(&a, 5);
    assert_eq!(a.requeue(&b), 1);
    assert_eq!(a.waiter_count(), 0);
    assert_eq!(b.waiter_count(), 4);

    assert_eq!(b.wake_all(), 4);
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
}

#[test]
fn test_requeue_into_placement_butex() {
    let heap = Butex::with_config(SyncConfig::with_strategy(StrategyType::Condvar));
    let memory = Arc::new(ButexMemory::new());
    memory.construct_with(SyncConfig::with_strategy(StrategyType::Futex));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let heap = heap.clone();
            thread::spawn(move || heap.wait(0, long_deadline()))
        })
        .collect();

    wait_for_waiters(&heap, 3);
    let target = memory.locate().unwrap();
    assert_eq!(heap.requeue(&target), 1);

    // Condvar-parked waiters resumed through a futex-configured butex
    assert_eq!(target.wake_all(), 2);
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
}

#[test]
fn test_requeue_races_wake_on_target() {
    // Every waiter on the source is accounted for exactly once
    for _ in 0..20 {
        let a = Butex::create();
        let b = Butex::create();
        let woken_total = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let a = a.clone();
                thread::spawn(move || a.wait(0, long_deadline()))
            })
            .collect();
        wait_for_waiters(&a, 4);

        let barrier = Arc::new(Barrier::new(2));
        let waker = {
            let (b, barrier, total) = (b.clone(), barrier.clone(), woken_total.clone());
            thread::spawn(move || {
                barrier.wait();
                total.fetch_add(b.wake_all(), Ordering::SeqCst);
            })
        };

        barrier.wait();
        woken_total.fetch_add(a.requeue(&b), Ordering::SeqCst);
        waker.join().unwrap();
        woken_total.fetch_add(b.wake_all(), Ordering::SeqCst);

        assert_eq!(woken_total.load(Ordering::SeqCst), 4);
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(()));
        }
    }
}

#[test]
#[serial]
fn test_timeout_bound() {
    let butex = Butex::create();
    let start = Instant::now();

    let result = butex.wait(0, Some(Deadline::after(Duration::from_millis(100))));

    let elapsed = start.elapsed();
    assert_eq!(result, Err(WaitError::Timeout));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(500), "overshot: {:?}", elapsed);
    assert_eq!(butex.waiter_count(), 0);
}

#[test]
#[serial]
fn test_timeout_bound_every_strategy() {
    for strategy in STRATEGIES {
        let butex = Butex::with_config(SyncConfig::with_strategy(strategy));
        let start = Instant::now();

        let result = butex.wait(0, Some(Deadline::after(Duration::from_millis(50))));

        assert_eq!(result, Err(WaitError::Timeout), "strategy {}", strategy);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}

#[test]
#[serial]
fn test_wake_at_deadline_reports_exactly_one_outcome() {
    init_logging();
    for strategy in STRATEGIES {
        for _ in 0..30 {
            let butex = Butex::with_config(SyncConfig::with_strategy(strategy));
            let deadline = Deadline::after(Duration::from_millis(10));

            let waiter = {
                let butex = butex.clone();
                thread::spawn(move || butex.wait(0, Some(deadline)))
            };

            thread::sleep(deadline.remaining());
            let woken = butex.wake();
            let result = waiter.join().unwrap();

            // Woken iff the wake won; otherwise the timeout did
            match result {
                Ok(()) => assert_eq!(woken, 1, "strategy {}", strategy),
                Err(WaitError::Timeout) => assert_eq!(woken, 0, "strategy {}", strategy),
                other => panic!("unexpected {:?} with {}", other, strategy),
            }
            assert_eq!(butex.waiter_count(), 0);
        }
    }
}

#[test]
fn test_stop_reaches_requeued_waiter() {
    init_logging();
    let a = Butex::create();
    let b = Butex::create();
    let ctx = Context::new();

    let first = {
        let a = a.clone();
        thread::spawn(move || a.wait(0, long_deadline()))
    };
    wait_for_waiters(&a, 1);

    let second = {
        let (a, ctx) = (a.clone(), ctx.clone());
        thread::spawn(move || a.wait_in(&ctx, 0, long_deadline()))
    };
    wait_for_waiters(&a, 2);

    assert_eq!(a.requeue(&b), 1);
    assert_eq!(first.join().unwrap(), Ok(()));
    assert_eq!(b.waiter_count(), 1);

    // The stop has to find the record on `b`, not on `a`
    ctx.stop();
    assert_eq!(second.join().unwrap(), Err(WaitError::Interrupted));
    assert_eq!(a.waiter_count(), 0);
    assert_eq!(b.waiter_count(), 0);
    assert_eq!(b.wake(), 0);
}

#[test]
fn test_wake_except_skips_one_context() {
    let butex = Butex::create();
    let contexts: Vec<Context> = (0..3).map(|_| Context::new()).collect();
    let excluded = contexts[0].id();

    let handles: Vec<_> = contexts
        .iter()
        .cloned()
        .map(|ctx| {
            let butex = butex.clone();
            thread::spawn(move || butex.wait_in(&ctx, 0, long_deadline()))
        })
        .collect();

    wait_for_waiters(&butex, 3);
    assert_eq!(butex.wake_except(excluded), 2);
    assert_eq!(butex.waiter_count(), 1);

    let mut handles = handles.into_iter();
    let excluded_handle = handles.next().unwrap();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }

    assert!(!excluded_handle.is_finished());
    assert_eq!(butex.wake(), 1);
    assert_eq!(excluded_handle.join().unwrap(), Ok(()));
}

#[test]
fn test_stop_interrupts_wait_immediately() {
    init_logging();
    let butex = Butex::create();
    let (tx, rx) = std::sync::mpsc::channel();

    let waiter = {
        let butex = butex.clone();
        thread::spawn(move || {
            tx.send(Context::current()).unwrap();
            let start = Instant::now();
            (butex.wait(0, None), start.elapsed())
        })
    };

    let ctx = rx.recv().unwrap();
    wait_for_waiters(&butex, 1);
    ctx.stop();

    let (result, elapsed) = waiter.join().unwrap();
    assert_eq!(result, Err(WaitError::Interrupted));
    assert!(elapsed < Duration::from_secs(5));
    assert_eq!(butex.waiter_count(), 0);
}

#[test]
fn test_stop_does_not_end_uninterruptible_wait() {
    let butex = Butex::create();
    let ctx = Context::new();

    let waiter = {
        let (butex, ctx) = (butex.clone(), ctx.clone());
        thread::spawn(move || butex.wait_uninterruptible_in(&ctx, 0, long_deadline()))
    };

    wait_for_waiters(&butex, 1);
    ctx.stop();

    thread::sleep(Duration::from_millis(100));
    assert!(!waiter.is_finished());
    assert_eq!(butex.waiter_count(), 1);

    // The wake ends the wait; the pending stop shows in the outcome
    assert_eq!(butex.wake(), 1);
    assert_eq!(waiter.join().unwrap(), Err(WaitError::Interrupted));
}

#[test]
fn test_uninterruptible_wait_without_stop_succeeds() {
    let butex = Butex::create();
    let waiter = {
        let butex = butex.clone();
        thread::spawn(move || butex.wait_uninterruptible(0, long_deadline()))
    };

    wait_for_waiters(&butex, 1);
    assert_eq!(butex.wake(), 1);
    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn test_destroy_races_pinned_wake() {
    init_logging();
    for _ in 0..100 {
        let butex = Butex::create();
        let waiter = {
            let butex = butex.clone();
            thread::spawn(move || butex.wait(0, long_deadline()))
        };
        wait_for_waiters(&butex, 1);

        let pin = butex.pin_before_wake();
        let barrier = Arc::new(Barrier::new(2));

        let destroyer = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                butex.destroy()
            })
        };
        let waker = thread::spawn(move || {
            barrier.wait();
            pin.wake_and_unpin()
        });

        destroyer.join().unwrap();
        assert_eq!(waker.join().unwrap(), 1);
        assert_eq!(waiter.join().unwrap(), Ok(()));
    }
}

#[test]
fn test_destroy_and_unpin_free_exactly_once() {
    for _ in 0..200 {
        let butex = Butex::create();
        let pin = butex.pin_before_wake();
        let barrier = Arc::new(Barrier::new(2));

        let destroyer = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                butex.destroy()
            })
        };
        let unpinner = thread::spawn(move || {
            barrier.wait();
            pin.unpin()
        });

        let by_destroy = destroyer.join().unwrap();
        let by_unpin = unpinner.join().unwrap();
        assert!(by_destroy != by_unpin, "freed twice or leaked");
    }
}

#[test]
fn test_typed_butex_wait_and_wake() {
    let flag = Butex::create_typed::<i32>();
    flag.store(-1);

    let waiter = {
        let flag = flag.clone();
        thread::spawn(move || flag.wait(-1, long_deadline()))
    };

    wait_for_waiters(flag.as_butex(), 1);
    flag.store(0);
    assert_eq!(flag.wake_all(), 1);
    assert_eq!(waiter.join().unwrap(), Ok(()));
}
