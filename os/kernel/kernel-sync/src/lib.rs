//! # Kernel synchronization primitives
//!
//! The locking discipline throughout the kernel's bookkeeping paths is:
//! disable interrupts, take a spinlock, do O(1)-ish work, release the lock,
//! restore interrupts. [`Mutex::lock_irq`] packages that sequence; the raw
//! lock flavors ([`RawSpin`], [`RawTicket`]) decide fairness. [`Semaphore`]
//! is the counting primitive background daemons block on.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod mutex;
mod raw_spin;
mod raw_ticket;
mod semaphore;

pub use irq::{IrqGuard, IrqMutex};
pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;
pub use raw_ticket::RawTicket;
pub use semaphore::Semaphore;

pub type SpinMutex<T> = Mutex<T, RawSpin>;
pub type TicketMutex<T> = Mutex<T, RawTicket>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

impl<T> TicketMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawTicket::new(), value)
    }
}

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
}

pub trait RawUnlock {
    unsafe fn raw_unlock(&self);
}
