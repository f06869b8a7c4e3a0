//! Shared fixtures: a buffer-backed physical window standing in for real
//! RAM, a recording backing cache, and daemon hosts.

#![allow(dead_code)]

use kernel_info::boot::PhysicalMemoryRange;
use kernel_memory_addresses::{PAGE_SHIFT, PAGE_SIZE, PageFrameNumber, PhysicalAddress};
use kernel_pmm::{
    DaemonHost, DaemonPriority, PageCache, PageFrameManager, PhysPageWindow, WriteBackError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Physical base of the simulated RAM (1 MiB, like a kernel loaded above
/// low memory).
pub const BASE_PA: u64 = 0x10_0000;

/// Byte every simulated frame is filled with before any zeroing happens.
pub const DIRT: u8 = 0xA5;

struct RamInner {
    base_pa: u64,
    len: usize,
    buf: *mut u8,
}

// Safety: the buffer is leaked for the process lifetime and all concurrent
// access goes through frames the manager hands out exclusively (Busy).
unsafe impl Send for RamInner {}
unsafe impl Sync for RamInner {}

/// Buffer-backed [`PhysPageWindow`]: "physical" addresses starting at
/// `base_pa` map into one leaked allocation.
#[derive(Clone)]
pub struct TestRam(Arc<RamInner>);

impl TestRam {
    pub fn new(base_pa: u64, frames: usize) -> Self {
        let len = frames * PAGE_SIZE;
        let buf = Box::leak(vec![DIRT; len].into_boxed_slice()).as_mut_ptr();
        Self(Arc::new(RamInner { base_pa, len, buf }))
    }

    fn offset_of(&self, pa: u64) -> usize {
        let offset = pa.checked_sub(self.0.base_pa).expect("address below test RAM");
        let offset = usize::try_from(offset).unwrap();
        assert!(offset + PAGE_SIZE <= self.0.len, "address beyond test RAM");
        offset
    }

    /// Copies out the current contents of one frame.
    pub fn frame_bytes(&self, pfn: PageFrameNumber) -> Vec<u8> {
        let offset = self.offset_of(pfn.base_address().as_u64());
        unsafe { std::slice::from_raw_parts(self.0.buf.add(offset), PAGE_SIZE).to_vec() }
    }

    /// Overwrites one frame with `byte`.
    pub fn fill_frame(&self, pfn: PageFrameNumber, byte: u8) {
        let offset = self.offset_of(pfn.base_address().as_u64());
        unsafe { std::ptr::write_bytes(self.0.buf.add(offset), byte, PAGE_SIZE) }
    }
}

impl PhysPageWindow for TestRam {
    unsafe fn map(&self, pa: PhysicalAddress) -> *mut u8 {
        let offset = self.offset_of(pa.as_u64());
        unsafe { self.0.buf.add(offset) }
    }

    unsafe fn unmap(&self, _va: *mut u8) {}
}

pub struct Fixture {
    pub ram: TestRam,
    pub pmm: PageFrameManager<TestRam>,
}

/// A manager over `frames` pages of simulated RAM, fully initialized.
pub fn fixture(frames: u64) -> Fixture {
    fixture_with_reserved(frames, &[])
}

pub fn fixture_with_reserved(frames: u64, reserved: &[PhysicalMemoryRange]) -> Fixture {
    let ranges = [PhysicalMemoryRange::new(BASE_PA, frames * PAGE_SIZE as u64)];
    fixture_with_ranges(frames, &ranges, reserved)
}

/// A manager over an arbitrary memory map; the simulated RAM covers the
/// whole window spanned by the map (gaps included) so gap frames are
/// touchable too.
pub fn fixture_with_ranges(
    window_frames: u64,
    ranges: &[PhysicalMemoryRange],
    reserved: &[PhysicalMemoryRange],
) -> Fixture {
    let ram = TestRam::new(BASE_PA, usize::try_from(window_frames).unwrap());
    let pmm = PageFrameManager::new(ram.clone(), ranges);
    pmm.init_post_heap(ranges, reserved);
    Fixture { ram, pmm }
}

/// First frame of the simulated RAM.
pub fn base_frame() -> PageFrameNumber {
    PageFrameNumber::new(BASE_PA >> PAGE_SHIFT)
}

/// Recording [`PageCache`]: remembers every store write and every
/// modified-bit clear, with optional write-failure injection.
pub struct TestCache {
    temporary: bool,
    pub fail_writes: AtomicBool,
    pub writes: Mutex<Vec<(u64, Vec<u8>)>>,
    pub cleared: Mutex<Vec<PageFrameNumber>>,
}

impl TestCache {
    pub fn new(temporary: bool) -> Arc<Self> {
        Arc::new(Self {
            temporary,
            fail_writes: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
            cleared: Mutex::new(Vec::new()),
        })
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl PageCache for TestCache {
    fn is_temporary(&self) -> bool {
        self.temporary
    }

    fn clear_modified(&self, frame: PageFrameNumber) {
        self.cleared.lock().unwrap().push(frame);
    }

    fn write_page(&self, offset: u64, contents: &[u8]) -> Result<(), WriteBackError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(WriteBackError::Device("injected failure"));
        }
        self.writes.lock().unwrap().push((offset, contents.to_vec()));
        Ok(())
    }
}

/// [`DaemonHost`] that records spawn requests without running the bodies.
#[derive(Default)]
pub struct RecordingHost {
    pub spawned: Mutex<Vec<(&'static str, DaemonPriority)>>,
}

impl DaemonHost for RecordingHost {
    fn spawn_daemon(
        &self,
        name: &'static str,
        priority: DaemonPriority,
        _body: Box<dyn FnOnce() + Send + 'static>,
    ) {
        self.spawned.lock().unwrap().push((name, priority));
    }

    fn sleep(&self, period: std::time::Duration) {
        std::thread::sleep(period);
    }
}

/// [`DaemonHost`] backed by real detached threads.
pub struct ThreadHost;

impl DaemonHost for ThreadHost {
    fn spawn_daemon(
        &self,
        name: &'static str,
        _priority: DaemonPriority,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) {
        std::thread::Builder::new()
            .name(name.into())
            .spawn(body)
            .expect("spawn daemon thread");
    }

    fn sleep(&self, period: std::time::Duration) {
        std::thread::sleep(period);
    }
}
