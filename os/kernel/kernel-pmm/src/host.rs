use alloc::boxed::Box;
use core::time::Duration;

/// Scheduling priority of a page daemon.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DaemonPriority {
    /// Runs only when nothing else wants the CPU (the scrubber).
    Lowest,
    /// Near the top, but below real-time (the write-back daemon).
    High,
}

/// The kernel-thread facility hosting the page daemons.
///
/// The page-frame manager does not know how threads are created or
/// scheduled; boot code hands it an implementation of this trait. Daemon
/// bodies never return.
pub trait DaemonHost: Sync {
    /// Creates, prioritizes, and resumes one kernel thread running `body`.
    fn spawn_daemon(
        &self,
        name: &'static str,
        priority: DaemonPriority,
        body: Box<dyn FnOnce() + Send + 'static>,
    );

    /// Suspends the calling thread for at least `period`.
    fn sleep(&self, period: Duration);
}
