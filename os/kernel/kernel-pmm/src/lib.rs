//! # Physical Page-Frame Manager
//!
//! This crate tracks every physical page of RAM in the managed range, hands
//! frames out to callers (region creation, page-fault resolution, DMA
//! setup), reclaims them, and keeps a background supply of pre-zeroed pages
//! ready. It is the single authority over physical page-frame state.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Allocation API                           │
//! │   allocate / allocate_specific / allocate_run /          │
//! │   mark_range_reserved / lookup / total / free_count      │
//! └───────────────────────┬──────────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────────┐
//! │              State-Transition Engine                     │
//! │   one chokepoint mutates frame state, moves frames       │
//! │   between queues, and keeps the per-state counters       │
//! │   in lock-step                                           │
//! └───────────────────────┬──────────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────────┐
//! │         Frame Registry + Queue Set + Statistics          │
//! │   one descriptor per physical page; five coarse queues   │
//! │   (free, clear, active, modified, modified_temporary)    │
//! │   grouping nine fine-grained states                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Two background daemons feed off the same registry:
//! * the **scrubber** ([`PageScrubber`]) periodically converts `Free` pages
//!   into zero-filled `Clear` pages, and
//! * the **write-back daemon** ([`PageWriter`]) drains the modified queue to
//!   each page's backing store, woken once per empty→non-empty transition of
//!   the modified queues (edge-triggered, drains fully per wake).
//!
//! ## Concurrency Model
//!
//! One global interrupt-masked ticket lock protects the registry, all five
//! queues, and the counters. The convention on every path is: mask
//! interrupts, take the lock, do O(1)-ish bookkeeping, release. No zeroing,
//! no I/O, and no semaphore wait ever happens under the lock — the `Busy`
//! state is the token that grants a caller exclusive, lock-free access to a
//! single frame's *contents* for the duration of a slow operation.
//!
//! ## Lifecycle
//!
//! The manager is one explicit service object constructed during boot and
//! passed by reference; it is not an ambient singleton. Bring-up is strictly
//! three-phase, because the frame array itself needs a working heap:
//!
//! ```text
//! PageFrameManager::new(window, ranges)        // pre-heap: sizes the window
//!     .init_post_heap(ranges, reserved)        // builds the registry
//!     .start_daemons(host)                     // spawns scrubber + writer
//! ```
//!
//! Frames are created once here and never destroyed; "freeing" a frame only
//! ever transitions it back to `Free`/`Clear`.
//!
//! ## Error Model
//!
//! Pool exhaustion on the generic [`allocate`](PageFrameManager::allocate)
//! path halts the kernel — there is deliberately no graceful out-of-memory
//! path at this layer. Everything a caller can reasonably handle
//! (unavailable specific frame, no contiguous span, out-of-bounds ranges)
//! comes back as `Option`/[`Result`](PmmError) instead.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod debug;
mod frame;
mod host;
mod manager;
mod queue;
mod scrub;
mod stats;
mod window;
mod writeback;

pub use debug::{dump_free_page_table, dump_page_stats};
pub use frame::{FrameInfo, PageState, QueueKind};
pub use host::{DaemonHost, DaemonPriority};
pub use manager::{FreePool, PageFrameManager, PmmError};
pub use scrub::{PageScrubber, SCRUB_BATCH, SCRUB_INTERVAL};
pub use stats::PageStats;
pub use window::{HhdmWindow, PhysPageWindow};
pub use writeback::{PageCache, PageWriter, WriteBackError};
