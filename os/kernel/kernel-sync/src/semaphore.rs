use core::hint::spin_loop;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Counting semaphore.
///
/// Producers call [`release`](Self::release) to add a permit; consumers call
/// [`acquire`](Self::acquire) to take one, spinning until a permit is
/// available. Permits accumulate — a release with no waiter is never lost.
///
/// The page-frame manager uses this **edge-triggered**: the modified-page
/// queues release one permit per empty→non-empty transition, not one per
/// enqueued page, and the write-back daemon drains every available page per
/// acquired permit.
pub struct Semaphore {
    permits: AtomicUsize,
}

impl Semaphore {
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: AtomicUsize::new(permits),
        }
    }

    /// Adds one permit, waking at most one spinning [`acquire`](Self::acquire).
    #[inline]
    pub fn release(&self) {
        self.permits.fetch_add(1, Ordering::Release);
    }

    /// Takes one permit if immediately available.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        let mut current = self.permits.load(Ordering::Relaxed);
        while current > 0 {
            match self.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    /// Spins until a permit can be taken.
    #[inline]
    pub fn acquire(&self) {
        while !self.try_acquire() {
            while self.permits.load(Ordering::Relaxed) == 0 {
                spin_loop();
            }
        }
    }

    /// Current permit count (racy; for introspection and tests).
    #[inline]
    #[must_use]
    pub fn permits(&self) -> usize {
        self.permits.load(Ordering::Acquire)
    }
}
