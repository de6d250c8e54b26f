//! Concurrency tests for completion latches and signals.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use earcon_core::{CountdownLatch, OnceFlag, Signal};

#[test]
fn test_latch_fires_once_across_threads() {
    for _ in 0..50 {
        let latch = Arc::new(CountdownLatch::new(1));
        let fired = Arc::new(AtomicUsize::new(0));

        latch.arm(8);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = latch.clone();
                let fired = fired.clone();
                thread::spawn(move || {
                    // Duplicate reports from the same operation are absorbed
                    for _ in 0..2 {
                        if latch.count_down() {
                            fired.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        if latch.release() {
            fired.fetch_add(1, Ordering::SeqCst);
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(latch.is_fired());
        assert_eq!(latch.remaining(), 0);
    }
}

#[test]
fn test_once_flag_across_threads() {
    let flag = Arc::new(OnceFlag::new());
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let flag = flag.clone();
            let winners = winners.clone();
            thread::spawn(move || {
                if flag.claim() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert!(flag.is_claimed());
}

#[test]
fn test_signal_emits_from_worker_threads() {
    let signal = Arc::new(Signal::<usize>::new());
    let total = Arc::new(AtomicUsize::new(0));

    let total_clone = total.clone();
    signal.connect(move |value| {
        total_clone.fetch_add(*value, Ordering::SeqCst);
    });

    let handles: Vec<_> = (1..=4)
        .map(|value| {
            let signal = signal.clone();
            thread::spawn(move || signal.emit(value))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), 10);
    assert_eq!(signal.emit_count(), 4);
}
