use crate::host::DaemonHost;
use crate::manager::PageFrameManager;
use crate::window::PhysPageWindow;
use core::time::Duration;

/// Frames zeroed per scrubber tick.
pub const SCRUB_BATCH: usize = 16;

/// Pause between scrubber ticks.
pub const SCRUB_INTERVAL: Duration = Duration::from_millis(100);

/// The page scrubber daemon.
///
/// A periodic sweep that converts reclaimed-but-dirty `Free` pages into
/// zero-filled `Clear` pages so that [`allocate`] requests for clear memory
/// rarely have to zero inline. There is no urgency signal: whatever a tick
/// does not get to is simply left for the next one, and the daemon never
/// blocks waiting for more work.
///
/// [`allocate`]: PageFrameManager::allocate
pub struct PageScrubber<'a, W> {
    pmm: &'a PageFrameManager<W>,
}

impl<'a, W: PhysPageWindow> PageScrubber<'a, W> {
    #[must_use]
    pub const fn new(pmm: &'a PageFrameManager<W>) -> Self {
        Self { pmm }
    }

    /// One tick: claim up to [`SCRUB_BATCH`] frames off the free queue,
    /// zero them with the lock dropped, and park them on the clear queue.
    /// Returns how many frames were scrubbed.
    pub fn scrub_batch(&self) -> usize {
        let mut taken = [0u32; SCRUB_BATCH];
        let count = self.pmm.scrub_take(&mut taken);
        if count == 0 {
            return 0;
        }
        // The frames are Busy here: zeroing happens without the lock.
        for &idx in &taken[..count] {
            self.pmm.zero_frame_at(idx);
        }
        self.pmm.scrub_finish(&taken[..count]);
        log::trace!("scrubbed {count} page(s)");
        count
    }

    /// The daemon loop. Runs for the life of the kernel.
    pub fn run<H: DaemonHost>(&self, host: &H) -> ! {
        log::info!("page scrubber running");
        loop {
            self.scrub_batch();
            host.sleep(SCRUB_INTERVAL);
        }
    }
}
