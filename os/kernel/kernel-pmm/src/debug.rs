//! Kernel-debugger introspection commands.
//!
//! The debugger owns its command table; it registers these formatters as
//! `dump_page_stats` / `dump_free_page_table` and hands them a sink.

use crate::frame::{PageState, QueueKind};
use crate::manager::PageFrameManager;
use core::fmt;
use kernel_memory_addresses::PageFrameNumber;

/// Formats the per-state counters and pool totals.
pub fn dump_page_stats<W>(
    pmm: &PageFrameManager<W>,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    let stats = pmm.stats();
    writeln!(
        out,
        "page frames: {} total starting at {}, {} allocatable",
        pmm.total(),
        pmm.base_frame(),
        pmm.free_count(),
    )?;
    for state in PageState::ALL {
        writeln!(out, "{:>20}: {}", state.name(), stats.get(state))?;
    }
    writeln!(out, "{:>20}: {}", "sum", stats.total())
}

/// Formats the contents of the free and clear queues as contiguous runs.
pub fn dump_free_page_table<W>(
    pmm: &PageFrameManager<W>,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    for kind in [QueueKind::Free, QueueKind::Clear] {
        let mut frames = pmm.queue_frames(kind);
        frames.sort_unstable();
        let label = match kind {
            QueueKind::Free => "free",
            _ => "clear",
        };
        writeln!(out, "{label} queue ({} frames):", frames.len())?;
        write_runs(&frames, out)?;
    }
    Ok(())
}

/// Writes a sorted frame list as `#start-#end (len)` runs.
fn write_runs(frames: &[PageFrameNumber], out: &mut dyn fmt::Write) -> fmt::Result {
    let mut iter = frames.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(&next) = iter.peek() {
            if next != end + 1 {
                break;
            }
            end = next;
            iter.next();
        }
        if start == end {
            writeln!(out, "  {start}")?;
        } else {
            writeln!(out, "  {start}-{end} ({} frames)", end - start + 1)?;
        }
    }
    Ok(())
}
