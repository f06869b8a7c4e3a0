//! # Memory Layout

/// End of userspace VA range after which Kernel space begins.
pub const LAST_USERSPACE_ADDRESS: u64 = 0xffff_0000_0000_0000;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
///
/// The page-frame manager's transient physical-page window relies on this
/// mapping to zero and write back page contents without creating a
/// permanent per-page mapping.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

const _: () = {
    assert!(HHDM_BASE >= LAST_USERSPACE_ADDRESS);
};
