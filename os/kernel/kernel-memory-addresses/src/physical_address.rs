use crate::{PAGE_SHIFT, PageFrameNumber};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Physical memory address.
///
/// A thin wrapper around `u64` that denotes **physical** addresses (host RAM
/// / MMIO). The type carries intent and prevents accidental mix-ups with
/// virtual addresses or frame numbers.
///
/// ### Semantics
/// - Use [`PhysicalAddress::frame`] to derive the containing page frame for
///   the kernel's 4 KiB page geometry.
/// - Combine a [`PageFrameNumber`] with an in-page offset via
///   [`PageFrameNumber::base_address`] plus `+` to reconstruct an address.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
/// let frame = pa.frame();
/// assert_eq!(frame.base_address().as_u64() & (PAGE_SIZE as u64 - 1), 0);
/// assert_eq!(pa.page_offset(), 0x42);
/// assert_eq!(frame.base_address() + pa.page_offset(), pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The page frame containing this address.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PageFrameNumber {
        PageFrameNumber::new(self.0 >> PAGE_SHIFT)
    }

    /// Byte offset of this address within its page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & ((1 << PAGE_SHIFT) - 1)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}
