mod common;

use common::{BASE_PA, Fixture, base_frame, fixture, fixture_with_ranges, fixture_with_reserved};
use kernel_info::boot::PhysicalMemoryRange;
use kernel_memory_addresses::PAGE_SIZE;
use kernel_pmm::{
    FreePool, PageScrubber, PageState, QueueKind, dump_free_page_table, dump_page_stats,
};

/// The two registry-wide invariants: the nine counters sum to the frame
/// total, and every queue is exactly as long as the states mapping to it.
fn assert_invariants(fx: &Fixture) {
    let stats = fx.pmm.stats();
    assert_eq!(stats.total(), fx.pmm.total(), "counters do not sum to total");

    for kind in [
        QueueKind::Free,
        QueueKind::Clear,
        QueueKind::Active,
        QueueKind::Modified,
        QueueKind::ModifiedTemporary,
    ] {
        let expected: u64 = PageState::ALL
            .iter()
            .filter(|s| s.queue() == kind)
            .map(|&s| stats.get(s))
            .sum();
        assert_eq!(
            fx.pmm.queue_len(kind),
            expected,
            "queue {kind:?} disagrees with the state counters"
        );
    }
}

/// 1024 frames with a 10-frame boot-reserved range: 1014 allocatable, and
/// the reservation shows up as exactly ten `Unused` frames.
#[test]
fn boot_reservation_accounting() {
    let fx = fixture_with_reserved(
        1024,
        &[PhysicalMemoryRange::new(BASE_PA, 10 * PAGE_SIZE as u64)],
    );

    assert_eq!(fx.pmm.total(), 1024);
    assert_eq!(fx.pmm.free_count(), 1014);
    assert_eq!(fx.pmm.stats().get(PageState::Unused), 10);
    assert_invariants(&fx);
}

#[test]
fn invariants_hold_across_a_messy_operation_mix() {
    let fx = fixture(64);
    assert_invariants(&fx);

    let a = fx.pmm.allocate(FreePool::Free);
    fx.pmm.transition(a, PageState::Active);
    let b = fx.pmm.allocate(FreePool::Clear);
    fx.pmm.transition(b, PageState::Wired);
    let c = fx.pmm.allocate(FreePool::Free);
    fx.pmm.transition(c, PageState::Modified);
    let d = fx.pmm.allocate(FreePool::Free);
    fx.pmm.transition(d, PageState::ModifiedTemporary);
    assert_invariants(&fx);

    PageScrubber::new(&fx.pmm).scrub_batch();
    assert_invariants(&fx);

    let run = fx.pmm.allocate_run(FreePool::Free, 8).unwrap();
    assert_invariants(&fx);

    // release everything back into the pools
    for pfn in [a, c, d] {
        fx.pmm.transition(pfn, PageState::Free);
    }
    for i in 0..8 {
        fx.pmm.transition(run + i, PageState::Free);
    }
    assert_invariants(&fx);
    assert_eq!(fx.pmm.stats().get(PageState::Wired), 1);
}

/// A non-contiguous memory map still tracks the gap frames as allocatable
/// (inherited window arithmetic, surfaced with a warning rather than
/// changed silently).
#[test]
fn gap_frames_stay_allocatable() {
    let page = PAGE_SIZE as u64;
    let ranges = [
        PhysicalMemoryRange::new(BASE_PA, 2 * page),
        PhysicalMemoryRange::new(BASE_PA + 4 * page, 2 * page),
    ];
    let fx = fixture_with_ranges(6, &ranges, &[]);

    // the window spans first start .. last end, gap included
    assert_eq!(fx.pmm.total(), 6);
    assert_eq!(fx.pmm.free_count(), 6);

    // a frame inside the gap is claimable like any other
    let gap = base_frame() + 2;
    assert_eq!(fx.pmm.allocate_specific(gap, FreePool::Free), Some(gap));
}

#[test]
fn frame_window_is_exposed_before_the_registry_exists() {
    let ranges = [PhysicalMemoryRange::new(BASE_PA, 16 * PAGE_SIZE as u64)];
    let ram = common::TestRam::new(BASE_PA, 16);
    let pmm = kernel_pmm::PageFrameManager::new(ram, &ranges);

    // `new` records the window; the registry itself needs the heap
    assert_eq!(pmm.total(), 16);
    assert_eq!(pmm.base_frame(), base_frame());
    assert!(pmm.lookup(base_frame()).is_none());
    assert_eq!(pmm.free_count(), 0);
}

#[test]
fn dump_page_stats_reports_every_state() {
    let fx = fixture_with_reserved(
        32,
        &[PhysicalMemoryRange::new(BASE_PA, 4 * PAGE_SIZE as u64)],
    );
    let pfn = fx.pmm.allocate(FreePool::Free);
    fx.pmm.transition(pfn, PageState::Active);

    let mut out = String::new();
    dump_page_stats(&fx.pmm, &mut out).unwrap();

    for state in PageState::ALL {
        assert!(out.contains(state.name()), "missing {}", state.name());
    }
    assert!(out.contains("32 total"));
}

#[test]
fn dump_free_page_table_compresses_runs() {
    let fx = fixture(8);
    // carve a hole so the free queue is two runs
    fx.pmm
        .allocate_specific(base_frame() + 3, FreePool::Free)
        .unwrap();

    let mut out = String::new();
    dump_free_page_table(&fx.pmm, &mut out).unwrap();

    assert!(out.contains("free queue (7 frames):"));
    assert!(out.contains("clear queue (0 frames):"));
    let base = base_frame().as_u64();
    assert!(out.contains(&format!("#{}-#{} (3 frames)", base, base + 2)));
    assert!(out.contains(&format!("#{}-#{} (4 frames)", base + 4, base + 7)));
}
