//! Monotonic clocks
//!
//! The engine never reads wall-clock time directly. Every timestamp it
//! records (tween begin, pause start, cycle end) comes from a [`Clock`],
//! which lets hosts and tests substitute their own notion of time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic time source, in seconds
pub trait Clock: Send + Sync {
    /// Seconds elapsed since an arbitrary fixed origin. Never decreases.
    fn now(&self) -> f64;
}

/// Clock backed by [`Instant`], with its origin at construction
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// Stores the current time as `f64` bits so it can be shared between a
/// driving thread and the engine without a lock.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(seconds: f64) -> Self {
        Self {
            bits: AtomicU64::new(seconds.to_bits()),
        }
    }

    /// Move time forward by `seconds`. Negative values are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + seconds).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Jump to an absolute time. Moving backwards is ignored.
    pub fn set(&self, seconds: f64) {
        let mut current = self.bits.load(Ordering::Acquire);
        while f64::from_bits(current) < seconds {
            match self.bits.compare_exchange_weak(
                current,
                seconds.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);

        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.now(), 0.75);

        // Going backwards is not allowed
        clock.advance(-1.0);
        assert_eq!(clock.now(), 0.75);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_at(2.0);
        clock.set(5.0);
        assert_eq!(clock.now(), 5.0);

        clock.set(1.0);
        assert_eq!(clock.now(), 5.0);
    }

    #[test]
    fn test_manual_clock_shared_between_threads() {
        let clock = Arc::new(ManualClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        clock.advance(0.5);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(clock.now(), 200.0);
    }
}
