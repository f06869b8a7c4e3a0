use crate::manager::{PageFrameManager, WriteTake};
use crate::window::PhysPageWindow;
use kernel_memory_addresses::PageFrameNumber;

/// Opaque backing object of a frame, consumed only by the write-back
/// daemon. The VM layer binds one to a frame via
/// [`attach_cache`](PageFrameManager::attach_cache).
///
/// Implementations must not block in [`is_temporary`](Self::is_temporary):
/// it is consulted under the registry lock. The actual store write runs
/// with the lock dropped and may sleep.
pub trait PageCache: Send + Sync {
    /// Whether this cache backs anonymous/temporary memory. Such pages are
    /// only written back during a low-memory trimming cycle, never
    /// routinely.
    fn is_temporary(&self) -> bool;

    /// Clears the modified bit on every virtual mapping of `frame`, so that
    /// writes landing after this point are detected as new.
    fn clear_modified(&self, frame: PageFrameNumber);

    /// Writes one page of content to the backing store at `offset`.
    fn write_page(&self, offset: u64, contents: &[u8]) -> Result<(), WriteBackError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WriteBackError {
    #[error("backing store rejected the write at offset {0:#x}")]
    StoreRejected(u64),
    #[error("device error: {0}")]
    Device(&'static str),
}

/// The write-back daemon.
///
/// Sleeps on the manager's [`modified_wake`] semaphore, which is released
/// once per empty→non-empty transition of the modified queues — an
/// edge-triggered wake, not a per-page signal. Each wake therefore drains
/// everything available instead of assuming one signal means one page.
///
/// [`modified_wake`]: PageFrameManager::modified_wake
pub struct PageWriter<'a, W> {
    pmm: &'a PageFrameManager<W>,
}

impl<'a, W: PhysPageWindow> PageWriter<'a, W> {
    #[must_use]
    pub const fn new(pmm: &'a PageFrameManager<W>) -> Self {
        Self { pmm }
    }

    /// Drains the modified queue once; returns the number of pages written.
    ///
    /// The drain is bounded by the queue length at entry so that anonymous
    /// pages rotated back to the queue (they are only flushed under memory
    /// pressure) cannot keep a single drain spinning.
    pub fn drain(&self) -> usize {
        let budget = self.pmm.modified_len();
        let mut written = 0;
        for _ in 0..budget {
            match self.pmm.writeback_take() {
                WriteTake::Empty => break,
                WriteTake::Requeued => {}
                WriteTake::Job {
                    idx,
                    pfn,
                    cache,
                    offset,
                } => {
                    let Some(cache) = cache else {
                        // A modified page with no backing object cannot be
                        // written anywhere; parking it keeps the queue from
                        // wedging on it forever.
                        log::warn!("modified frame {pfn} has no backing cache; parking it");
                        self.pmm.writeback_finish(idx, true);
                        continue;
                    };
                    // Unmark the mappings first so stores racing with the
                    // write-out re-dirty the page.
                    cache.clear_modified(pfn);
                    let result = self
                        .pmm
                        .with_frame_contents(idx, |contents| cache.write_page(offset, contents));
                    match result {
                        Ok(()) => {
                            self.pmm.writeback_finish(idx, true);
                            written += 1;
                        }
                        Err(e) => {
                            log::warn!("write-back of frame {pfn} failed: {e}; page stays modified");
                            self.pmm.writeback_finish(idx, false);
                        }
                    }
                    // Dropping `cache` releases the reference taken at pickup.
                }
            }
        }
        written
    }

    /// The daemon loop. Runs for the life of the kernel.
    pub fn run(&self) -> ! {
        log::info!("page writer running");
        loop {
            self.pmm.modified_wake().acquire();
            let written = self.drain();
            if written > 0 {
                log::debug!("wrote back {written} page(s)");
            }
        }
    }
}
