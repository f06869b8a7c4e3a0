//! # Kernel Configuration and Boot Interface
//!
//! This crate defines the data structures and memory layout constants that
//! govern the hand-off between the boot environment and the kernel's physical
//! memory manager. It is the authoritative source for the physical memory map
//! contract and for system-wide layout configuration.
//!
//! ## Overview
//!
//! Physical memory management needs exactly two pieces of information from
//! the boot environment: which ranges of physical memory are installed, and
//! which of those ranges the boot loader already consumed before the kernel
//! took over. This crate centralizes both so the contract cannot drift
//! between the loader and the kernel subsystems consuming it.
//!
//! ## Architecture
//!
//! The crate is organized into two modules:
//!
//! ### Boot Information ([`boot`])
//! Defines the loader-to-kernel memory map hand-off:
//! * **Physical Ranges**: `(start, size)` descriptors of installed RAM
//! * **Reserved Ranges**: the same descriptor type for loader-consumed memory
//! * **ABI Stability**: `#[repr(C)]` structures with fixed-size integers
//!
//! ### Memory Layout ([`memory`])
//! Establishes the kernel's virtual memory constants:
//! * **Higher Half Design**: kernel execution at high virtual addresses
//! * **Physical Memory Mapping**: HHDM (Higher Half Direct Mapping) base,
//!   used by the transient physical-page window
//!
//! ## Configuration Management
//!
//! All layout values are `const` and validated with compile-time assertions;
//! there is no runtime configuration surface. The constants are shared by the
//! loader, the page-frame manager, and anything else that touches physical
//! memory through the direct map.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
