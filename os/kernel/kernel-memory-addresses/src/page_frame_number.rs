use crate::{PAGE_SHIFT, PhysicalAddress};
use core::fmt;
use core::ops::{Add, AddAssign, Sub};

/// Physical page-frame number.
///
/// Identifies one 4 KiB physical page by its absolute index: frame `n`
/// covers physical bytes `[n << PAGE_SHIFT, (n + 1) << PAGE_SHIFT)`. This is
/// the unit the page-frame manager allocates, reclaims, and scrubs.
///
/// ### Semantics
/// - [`base_address`](Self::base_address) returns the first byte of the frame
///   as a [`PhysicalAddress`].
/// - Arithmetic (`+`, `-`) moves in whole frames, never bytes.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pfn = PageFrameNumber::new(0x1234);
/// assert_eq!(pfn.base_address().as_u64(), 0x1234 << PAGE_SHIFT);
/// assert_eq!(pfn + 1, PageFrameNumber::new(0x1235));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageFrameNumber(u64);

impl PageFrameNumber {
    #[inline]
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The first byte of this frame.
    #[inline]
    #[must_use]
    pub const fn base_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << PAGE_SHIFT)
    }

    /// The frame containing `addr`.
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: PhysicalAddress) -> Self {
        addr.frame()
    }
}

impl fmt::Debug for PageFrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PFN({})", self.0)
    }
}

impl fmt::Display for PageFrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PageFrameNumber {
    #[inline]
    fn from(n: u64) -> Self {
        Self::new(n)
    }
}

impl Add<u64> for PageFrameNumber {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PageFrameNumber {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl Sub for PageFrameNumber {
    type Output = u64;

    /// Distance between two frames, in frames.
    #[inline]
    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}
