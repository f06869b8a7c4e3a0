//! Page geometry.
//!
//! The kernel manages physical memory in 4 KiB frames exclusively; larger
//! page sizes terminate at the paging layer and never reach the frame
//! bookkeeping.

/// Log2 of the page size.
pub const PAGE_SHIFT: u32 = 12;

/// Size of one physical page frame in bytes.
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

/// Align `addr` downwards to the containing page boundary.
///
/// ```rust
/// # use kernel_memory_addresses::{page_align_down, page_align_up};
/// assert_eq!(page_align_down(0x1234), 0x1000);
/// assert_eq!(page_align_up(0x1234), 0x2000);
/// assert_eq!(page_align_up(0x1000), 0x1000);
/// ```
#[inline]
#[must_use]
pub const fn page_align_down(addr: u64) -> u64 {
    addr & !(PAGE_SIZE as u64 - 1)
}

/// Align `addr` upwards to the next page boundary.
#[inline]
#[must_use]
pub const fn page_align_up(addr: u64) -> u64 {
    (addr + (PAGE_SIZE as u64 - 1)) & !(PAGE_SIZE as u64 - 1)
}

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(PAGE_SIZE == 4096);
};
