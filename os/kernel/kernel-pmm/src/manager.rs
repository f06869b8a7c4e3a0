use crate::frame::{Frame, FrameInfo, PageState, QueueKind};
use crate::host::{DaemonHost, DaemonPriority};
use crate::queue::QueueSet;
use crate::scrub::PageScrubber;
use crate::stats::PageStats;
use crate::window::PhysPageWindow;
use crate::writeback::{PageCache, PageWriter};
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_info::boot::PhysicalMemoryRange;
use kernel_memory_addresses::{PAGE_SHIFT, PAGE_SIZE, PageFrameNumber, PhysicalAddress};
use kernel_sync::{Semaphore, TicketMutex};

/// Which reclaimable pool an allocation wants to draw from.
///
/// This only expresses the caller's zeroing preference: either pool may
/// satisfy either request (cross-fill), and a `Clear` request served from
/// the free pool is zeroed on the way out.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FreePool {
    /// Any reclaimed page; contents undefined.
    Free,
    /// A zero-filled page.
    Clear,
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum PmmError {
    #[error("frame range starting at {start} ({length} pages) is outside the managed window")]
    RangeOutOfBounds {
        start: PageFrameNumber,
        length: u64,
    },
}

/// Everything the global lock protects: the frame registry, the five
/// queues, and the per-state counters.
struct PmmInner {
    frames: Vec<Frame>,
    queues: QueueSet,
    stats: PageStats,
}

impl PmmInner {
    const fn new() -> Self {
        Self {
            frames: Vec::new(),
            queues: QueueSet::new(),
            stats: PageStats::new(),
        }
    }

    /// The state-transition engine: the single place allowed to change a
    /// frame's state.
    ///
    /// Decrements the counter for the current state, splices the frame
    /// between queues when the coarse mapping changes, increments the new
    /// counter, and stores the new state. Returns whether the modified
    /// union went empty→non-empty, i.e. whether the caller must release the
    /// write-back wakeup once the lock is dropped.
    fn set_state(&mut self, idx: u32, new_state: PageState) -> bool {
        let Self {
            frames,
            queues,
            stats,
        } = self;
        let old_state = frames[idx as usize].state;
        let old_queue = old_state.queue();
        let new_queue = new_state.queue();

        let mut wake = false;
        if old_queue != new_queue {
            let union_was_empty = queues.modified_union_len() == 0;
            queues.queue_mut(old_queue).remove(frames, idx);
            queues.queue_mut(new_queue).push_back(frames, idx);
            wake = new_queue.tracks_modified() && union_was_empty;
        }

        stats.dec(old_state);
        stats.inc(new_state);
        frames[idx as usize].state = new_state;
        wake
    }
}

/// The physical page-frame manager.
///
/// One long-lived service object, constructed during boot via
/// [`new`](Self::new) → [`init_post_heap`](Self::init_post_heap) →
/// [`start_daemons`](Self::start_daemons), and passed by reference to
/// everything that allocates physical memory.
pub struct PageFrameManager<W> {
    window: W,
    base_frame: PageFrameNumber,
    frame_count: u64,
    inner: TicketMutex<PmmInner>,
    /// Released once per empty→non-empty transition of the modified union.
    modified_wake: Semaphore,
    /// Externally-owned low-memory ("trimming") mode; gates write-back of
    /// anonymous pages.
    low_memory: AtomicBool,
}

impl<W> PageFrameManager<W> {
    /// Pre-heap initialization: size the managed frame window from the boot
    /// memory map. No allocation happens here; the registry itself is built
    /// by [`init_post_heap`](Self::init_post_heap).
    ///
    /// The window spans from the first range's start to the last range's
    /// end. Frames inside gaps of a non-contiguous map remain tracked as
    /// allocatable; the condition is surfaced loudly instead of silently
    /// inherited.
    pub fn new(window: W, ranges: &[PhysicalMemoryRange]) -> Self {
        let (base_frame, frame_count) = frame_window(ranges);
        assert!(
            frame_count <= u64::from(u32::MAX),
            "physical memory map exceeds the registry's index width"
        );
        if ranges.is_empty() {
            log::warn!("empty physical memory map; no frames will be managed");
        }
        for pair in ranges.windows(2) {
            if pair[0].end() != pair[1].start {
                log::warn!(
                    "physical memory map is not contiguous ({:#x}..{:#x} then {:#x}); \
                     frames in between stay tracked as allocatable",
                    pair[0].start,
                    pair[0].end(),
                    pair[1].start,
                );
            }
        }
        Self {
            window,
            base_frame,
            frame_count,
            inner: TicketMutex::new(PmmInner::new()),
            modified_wake: Semaphore::new(0),
            low_memory: AtomicBool::new(false),
        }
    }

    /// Builds the frame registry (requires a working heap) and folds in the
    /// ranges the boot loader already consumed.
    ///
    /// Every frame starts out `Free` on the free queue; reserved ranges are
    /// then claimed through [`mark_range_reserved`](Self::mark_range_reserved).
    /// A reserved range falling outside the managed window is logged and
    /// skipped — boot continues.
    pub fn init_post_heap(
        &self,
        ranges: &[PhysicalMemoryRange],
        reserved: &[PhysicalMemoryRange],
    ) {
        debug_assert_eq!(
            frame_window(ranges),
            (self.base_frame, self.frame_count),
            "init_post_heap must see the same memory map as new()"
        );
        {
            let mut guard = self.inner.lock_irq();
            let inner = &mut *guard;
            assert!(inner.frames.is_empty(), "init_post_heap called twice");

            inner.frames = (0..self.frame_count)
                .map(|i| Frame::new(self.base_frame + i))
                .collect();
            let PmmInner {
                frames,
                queues,
                stats,
            } = inner;
            for idx in 0..frames.len() as u32 {
                queues.queue_mut(QueueKind::Free).push_back(frames, idx);
                stats.inc(PageState::Free);
            }
        }
        log::info!(
            "page-frame registry ready: {} frames starting at {}",
            self.frame_count,
            self.base_frame,
        );

        for range in reserved {
            let start = PageFrameNumber::containing_address(PhysicalAddress::new(range.start));
            let length = range.page_count(PAGE_SHIFT);
            if let Err(e) = self.mark_range_reserved(start, length) {
                log::warn!(
                    "boot-reserved range {:#x}+{:#x} ignored: {e}",
                    range.start,
                    range.size,
                );
            }
        }
    }

    /// Moves a frame to `new_state` through the state-transition engine.
    ///
    /// This is how a caller returns ownership of a `Busy` frame (by moving
    /// it to its resting state) and how the VM layer dirties or reclaims
    /// pages. Panics if `pfn` is outside the managed window — that is a
    /// programmer error, not a runtime condition.
    pub fn transition(&self, pfn: PageFrameNumber, new_state: PageState) {
        let idx = self
            .index_of(pfn)
            .expect("transition: frame number outside the managed window");
        let wake = self.inner.lock_irq().set_state(idx, new_state);
        if wake {
            self.modified_wake.release();
        }
    }

    /// O(1) bounds-checked lookup. `None` outside the managed window or
    /// before the registry is built.
    #[must_use]
    pub fn lookup(&self, pfn: PageFrameNumber) -> Option<FrameInfo> {
        let idx = self.index_of(pfn)?;
        let guard = self.inner.lock_irq();
        let frame = guard.frames.get(idx as usize)?;
        Some(FrameInfo {
            number: frame.number,
            state: frame.state,
            mappings: frame.mappings,
        })
    }

    /// Total number of frames in the managed window.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.frame_count
    }

    /// First frame of the managed window.
    #[must_use]
    pub const fn base_frame(&self) -> PageFrameNumber {
        self.base_frame
    }

    /// Number of immediately allocatable frames (free + clear queues).
    #[must_use]
    pub fn free_count(&self) -> u64 {
        let guard = self.inner.lock_irq();
        guard.queues.queue(QueueKind::Free).len() + guard.queues.queue(QueueKind::Clear).len()
    }

    /// Snapshot of the per-state counters.
    #[must_use]
    pub fn stats(&self) -> PageStats {
        self.inner.lock_irq().stats
    }

    /// Live length of one queue.
    #[must_use]
    pub fn queue_len(&self, kind: QueueKind) -> u64 {
        self.inner.lock_irq().queues.queue(kind).len()
    }

    /// The write-back daemon's wakeup semaphore.
    ///
    /// Released exactly once per empty→non-empty transition of the union of
    /// the modified queues; the consumer must drain fully per acquired
    /// permit.
    #[must_use]
    pub const fn modified_wake(&self) -> &Semaphore {
        &self.modified_wake
    }

    /// Records one more live mapping of the frame.
    pub fn add_mapping(&self, pfn: PageFrameNumber) {
        let idx = self
            .index_of(pfn)
            .expect("add_mapping: frame number outside the managed window");
        self.inner.lock_irq().frames[idx as usize].mappings += 1;
    }

    /// Records the removal of one live mapping; returns the remaining count.
    pub fn remove_mapping(&self, pfn: PageFrameNumber) -> u32 {
        let idx = self
            .index_of(pfn)
            .expect("remove_mapping: frame number outside the managed window");
        let mut guard = self.inner.lock_irq();
        let mappings = &mut guard.frames[idx as usize].mappings;
        debug_assert!(*mappings > 0, "mapping count underflow");
        *mappings = mappings.saturating_sub(1);
        *mappings
    }

    /// Binds the frame to its backing object. Only the write-back daemon
    /// consults the binding.
    pub fn attach_cache(&self, pfn: PageFrameNumber, cache: Arc<dyn PageCache>, offset: u64) {
        let idx = self
            .index_of(pfn)
            .expect("attach_cache: frame number outside the managed window");
        let mut guard = self.inner.lock_irq();
        let frame = &mut guard.frames[idx as usize];
        frame.cache = Some(cache);
        frame.cache_offset = offset;
    }

    /// Unbinds and returns the frame's backing object, if any.
    pub fn detach_cache(&self, pfn: PageFrameNumber) -> Option<Arc<dyn PageCache>> {
        let idx = self.index_of(pfn)?;
        let mut guard = self.inner.lock_irq();
        let frame = &mut guard.frames[idx as usize];
        frame.cache_offset = 0;
        frame.cache.take()
    }

    /// Enters or leaves the global low-memory ("trimming") mode. While set,
    /// the write-back daemon also flushes anonymous pages.
    pub fn set_low_memory(&self, trimming: bool) {
        self.low_memory.store(trimming, Ordering::Relaxed);
    }

    #[must_use]
    pub fn low_memory(&self) -> bool {
        self.low_memory.load(Ordering::Relaxed)
    }

    /// Marks `[start, start + length)` as consumed by the boot environment.
    ///
    /// `Free`/`Clear` frames become `Unused`; `Wired` frames are accepted
    /// silently (already pinned and accounted for); anything else should not
    /// happen and is skipped with a warning rather than crashing boot.
    pub fn mark_range_reserved(
        &self,
        start: PageFrameNumber,
        length: u64,
    ) -> Result<(), PmmError> {
        let in_bounds = start >= self.base_frame
            && (start - self.base_frame)
                .checked_add(length)
                .is_some_and(|end| end <= self.frame_count);
        if !in_bounds {
            return Err(PmmError::RangeOutOfBounds { start, length });
        }

        let first = (start - self.base_frame) as u32;
        let mut skipped: u64 = 0;
        let mut first_odd: Option<(PageFrameNumber, PageState)> = None;
        {
            let mut guard = self.inner.lock_irq();
            for idx in first..first + length as u32 {
                let state = guard.frames[idx as usize].state;
                match state {
                    PageState::Free | PageState::Clear => {
                        let wake = guard.set_state(idx, PageState::Unused);
                        debug_assert!(!wake);
                    }
                    PageState::Wired => {}
                    other => {
                        skipped += 1;
                        if first_odd.is_none() {
                            first_odd = Some((start + u64::from(idx - first), other));
                        }
                    }
                }
            }
        }
        if let Some((pfn, state)) = first_odd {
            log::warn!(
                "mark_range_reserved: {skipped} frame(s) in unexpected states left untouched \
                 (first: {pfn} in state {})",
                state.name(),
            );
        }
        Ok(())
    }

    #[inline]
    fn index_of(&self, pfn: PageFrameNumber) -> Option<u32> {
        if pfn < self.base_frame {
            return None;
        }
        let offset = pfn - self.base_frame;
        (offset < self.frame_count).then(|| offset as u32)
    }
}

impl<W: PhysPageWindow> PageFrameManager<W> {
    /// Allocates one frame from the reclaimable pools.
    ///
    /// Pops from the queue matching `pool`, cross-filling from the other of
    /// {free, clear} when empty. The frame comes back `Busy`: the caller
    /// exclusively owns it (contents included) until it calls
    /// [`transition`](Self::transition) to the frame's resting state —
    /// allocation never picks that state. A `Clear` request served from the
    /// free pool is zeroed after the lock is dropped.
    ///
    /// # Panics
    ///
    /// Halts the kernel when both pools are empty. There is no graceful
    /// out-of-memory path at this layer by design.
    pub fn allocate(&self, pool: FreePool) -> PageFrameNumber {
        let (primary, fallback) = match pool {
            FreePool::Free => (QueueKind::Free, QueueKind::Clear),
            FreePool::Clear => (QueueKind::Clear, QueueKind::Free),
        };
        let (idx, needs_zero) = {
            let mut guard = self.inner.lock_irq();
            let taken = guard
                .queues
                .queue(primary)
                .head()
                .map(|idx| (idx, primary))
                .or_else(|| guard.queues.queue(fallback).head().map(|idx| (idx, fallback)));
            let Some((idx, origin)) = taken else {
                panic!("out of physical pages: free and clear pools are both empty");
            };
            let wake = guard.set_state(idx, PageState::Busy);
            debug_assert!(!wake);
            (idx, pool == FreePool::Clear && origin == QueueKind::Free)
        };
        if needs_zero {
            self.zero_frame_at(idx);
        }
        self.base_frame + u64::from(idx)
    }

    /// Claims one exact frame, e.g. a known framebuffer address.
    ///
    /// Succeeds only when the frame is currently `Free`, `Clear`, or
    /// `Unused`; any other state returns `None` — the address may
    /// legitimately already be taken, so this is not an error. The claim
    /// goes through the transition engine, which keeps the `Unused` counter
    /// and the counters-sum invariant intact.
    pub fn allocate_specific(
        &self,
        pfn: PageFrameNumber,
        pool: FreePool,
    ) -> Option<PageFrameNumber> {
        let idx = self.index_of(pfn)?;
        let needs_zero = {
            let mut guard = self.inner.lock_irq();
            let state = guard.frames.get(idx as usize)?.state;
            match state {
                PageState::Free | PageState::Clear | PageState::Unused => {}
                _ => return None,
            }
            let wake = guard.set_state(idx, PageState::Busy);
            debug_assert!(!wake);
            pool == FreePool::Clear && state != PageState::Clear
        };
        if needs_zero {
            self.zero_frame_at(idx);
        }
        Some(pfn)
    }

    /// Allocates the first contiguous run of `length` frames that are all
    /// currently `Free` or `Clear`, claiming each through the engine.
    ///
    /// Returns the first frame of the span (the rest follow by physical
    /// adjacency), or `None` when no qualifying span exists — unlike
    /// [`allocate`](Self::allocate), exhaustion here is not fatal.
    pub fn allocate_run(&self, pool: FreePool, length: u64) -> Option<PageFrameNumber> {
        if length == 0 || length > self.frame_count {
            return None;
        }
        let mut needs_zero: Vec<u32> = Vec::new();
        let span_start = {
            let mut guard = self.inner.lock_irq();
            let mut run_start: u32 = 0;
            let mut run: u64 = 0;
            let mut found = None;
            for idx in 0..guard.frames.len() as u32 {
                match guard.frames[idx as usize].state {
                    PageState::Free | PageState::Clear => {
                        if run == 0 {
                            run_start = idx;
                        }
                        run += 1;
                        if run == length {
                            found = Some(run_start);
                            break;
                        }
                    }
                    _ => run = 0,
                }
            }
            let span_start = found?;
            for idx in span_start..span_start + length as u32 {
                let state = guard.frames[idx as usize].state;
                let wake = guard.set_state(idx, PageState::Busy);
                debug_assert!(!wake);
                if pool == FreePool::Clear && state != PageState::Clear {
                    needs_zero.push(idx);
                }
            }
            span_start
        };
        for idx in needs_zero {
            self.zero_frame_at(idx);
        }
        Some(self.base_frame + u64::from(span_start))
    }

    /// Starts the scrubber and write-back daemons on the host's thread
    /// facility. Must be called last in the lifecycle sequence.
    pub fn start_daemons<H>(&'static self, host: &'static H)
    where
        H: DaemonHost,
        W: Send + Sync + 'static,
    {
        host.spawn_daemon(
            "page_scrubber",
            DaemonPriority::Lowest,
            Box::new(move || PageScrubber::new(self).run(host)),
        );
        host.spawn_daemon(
            "page_writer",
            DaemonPriority::High,
            Box::new(move || PageWriter::new(self).run()),
        );
        log::info!("page daemons started");
    }

    /// Zeroes the contents of a `Busy` frame through the physical window.
    /// The lock must not be held: zeroing is slow, and `Busy` already
    /// guarantees exclusive access to the contents.
    pub(crate) fn zero_frame_at(&self, idx: u32) {
        let pa = (self.base_frame + u64::from(idx)).base_address();
        // SAFETY: the frame is Busy (exclusively owned by this caller) and
        // lies inside the managed window, so the mapping covers one whole
        // writable page.
        unsafe {
            let va = self.window.map(pa);
            ptr::write_bytes(va, 0, PAGE_SIZE);
            self.window.unmap(va);
        }
    }

    /// Runs `f` over the contents of a `Busy` frame through the physical
    /// window. The lock must not be held.
    pub(crate) fn with_frame_contents<R>(&self, idx: u32, f: impl FnOnce(&[u8]) -> R) -> R {
        let pa = (self.base_frame + u64::from(idx)).base_address();
        // SAFETY: as for `zero_frame_at`; the window maps one whole page and
        // Busy excludes concurrent mutation.
        unsafe {
            let va = self.window.map(pa);
            let result = f(core::slice::from_raw_parts(va, PAGE_SIZE));
            self.window.unmap(va);
            result
        }
    }

    /// Scrubber pickup: claims up to `out.len()` frames off the free queue,
    /// transitioning each to `Busy`. Returns how many were taken.
    pub(crate) fn scrub_take(&self, out: &mut [u32]) -> usize {
        let mut guard = self.inner.lock_irq();
        let mut taken = 0;
        while taken < out.len() {
            let Some(idx) = guard.queues.queue(QueueKind::Free).head() else {
                break;
            };
            let wake = guard.set_state(idx, PageState::Busy);
            debug_assert!(!wake);
            out[taken] = idx;
            taken += 1;
        }
        taken
    }

    /// Scrubber completion: the frames' contents are now zero.
    pub(crate) fn scrub_finish(&self, taken: &[u32]) {
        let mut guard = self.inner.lock_irq();
        for &idx in taken {
            let wake = guard.set_state(idx, PageState::Clear);
            debug_assert!(!wake);
        }
    }

    /// Write-back pickup from the head of the modified queue.
    pub(crate) fn writeback_take(&self) -> WriteTake {
        let mut guard = self.inner.lock_irq();
        let inner = &mut *guard;
        let Some(idx) = inner.queues.queue(QueueKind::Modified).head() else {
            return WriteTake::Empty;
        };
        let (pfn, offset, anonymous) = {
            let frame = &inner.frames[idx as usize];
            (
                frame.number,
                frame.cache_offset,
                frame.cache.as_ref().is_some_and(|c| c.is_temporary()),
            )
        };
        if anonymous && !self.low_memory() {
            // Anonymous memory is only written back under memory pressure.
            // Rotate the frame to the back without a state change: the union
            // never empties, so no wakeup edge is produced.
            let PmmInner { frames, queues, .. } = inner;
            let queue = queues.queue_mut(QueueKind::Modified);
            queue.remove(frames, idx);
            queue.push_back(frames, idx);
            return WriteTake::Requeued;
        }
        let cache = inner.frames[idx as usize].cache.clone();
        // Busy excludes the frame from further pickup while I/O is outstanding.
        let wake = inner.set_state(idx, PageState::Busy);
        debug_assert!(!wake);
        WriteTake::Job {
            idx,
            pfn,
            cache,
            offset,
        }
    }

    /// Write-back completion. On success the frame rests `Active` when it
    /// still has live mappings, `Inactive` otherwise; on failure it returns
    /// to `Modified` for a later retry.
    ///
    /// The daemon is the wakeup's only consumer, so the engine's edge signal
    /// is dropped here: a failure requeue must not wake the daemon to retry
    /// immediately, and it drains the queue before sleeping anyway.
    pub(crate) fn writeback_finish(&self, idx: u32, success: bool) {
        let mut guard = self.inner.lock_irq();
        let resting = if success {
            if guard.frames[idx as usize].mappings > 0 {
                PageState::Active
            } else {
                PageState::Inactive
            }
        } else {
            PageState::Modified
        };
        let _ = guard.set_state(idx, resting);
    }

    /// Length of the plain modified queue (drain budget per wake).
    pub(crate) fn modified_len(&self) -> u64 {
        self.inner.lock_irq().queues.queue(QueueKind::Modified).len()
    }
}

impl<W> PageFrameManager<W> {
    /// Snapshot of the frame numbers currently on one queue.
    pub(crate) fn queue_frames(&self, kind: QueueKind) -> Vec<PageFrameNumber> {
        let guard = self.inner.lock_irq();
        guard
            .queues
            .queue(kind)
            .iter(&guard.frames)
            .map(|idx| guard.frames[idx as usize].number)
            .collect()
    }
}

/// One write-back pickup.
pub(crate) enum WriteTake {
    /// Modified queue empty.
    Empty,
    /// Head was anonymous memory outside a trimming cycle; rotated back.
    Requeued,
    /// A frame claimed `Busy` for write-out.
    Job {
        idx: u32,
        pfn: PageFrameNumber,
        cache: Option<Arc<dyn PageCache>>,
        offset: u64,
    },
}

/// `(base_frame, frame_count)` spanned by the boot memory map.
///
/// Assumes the reported ranges are sorted; the window runs from the first
/// range's start to the last range's end, gaps included.
fn frame_window(ranges: &[PhysicalMemoryRange]) -> (PageFrameNumber, u64) {
    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        return (PageFrameNumber::new(0), 0);
    };
    let base = first.start >> PAGE_SHIFT;
    let end = last.end() >> PAGE_SHIFT;
    (PageFrameNumber::new(base), end - base)
}
