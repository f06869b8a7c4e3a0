use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::{PhysicalAddress, page_align_down};

/// Transient physical-page mapping window.
///
/// Zeroing and write-back need to touch page *contents* without a permanent
/// per-page mapping. The mapping strategy (direct map, identity, temporary
/// slot) differs between kernel, loader, and tests, so the page-frame
/// manager only sees this trait.
pub trait PhysPageWindow {
    /// Maps one page frame and returns a pointer to its first byte, valid
    /// until the matching [`unmap`](Self::unmap).
    ///
    /// # Safety
    /// - `pa` must be frame-aligned and inside RAM the caller exclusively
    ///   owns (a `Busy` frame).
    /// - The returned pointer covers exactly one page.
    unsafe fn map(&self, pa: PhysicalAddress) -> *mut u8;

    /// Releases a mapping produced by [`map`](Self::map).
    ///
    /// # Safety
    /// `va` must come from a prior `map` on the same window, and no access
    /// through it may happen afterwards.
    unsafe fn unmap(&self, va: *mut u8);
}

/// [`PhysPageWindow`] for kernels with a higher-half direct map (HHDM).
///
/// Every physical address is permanently visible at `HHDM_BASE + pa`, so
/// mapping is plain address arithmetic and unmapping is a no-op.
///
/// # Safety
/// The HHDM mapping must be present and cover the whole managed range
/// before the first page is zeroed or written back.
pub struct HhdmWindow;

impl PhysPageWindow for HhdmWindow {
    unsafe fn map(&self, pa: PhysicalAddress) -> *mut u8 {
        debug_assert_eq!(page_align_down(pa.as_u64()), pa.as_u64());
        (HHDM_BASE + pa.as_u64()) as usize as *mut u8
    }

    unsafe fn unmap(&self, _va: *mut u8) {
        // The direct map is permanent.
    }
}
