use crate::writeback::PageCache;
use alloc::sync::Arc;
use kernel_memory_addresses::PageFrameNumber;

/// Fine-grained lifecycle state of one physical page frame.
///
/// The set is closed: every frame is in exactly one of these states at all
/// times, and every state maps to exactly one coarse [`QueueKind`] via
/// [`queue`](Self::queue).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PageState {
    /// Reclaimed, contents undefined. Eligible for allocation and scrubbing.
    Free,
    /// Reclaimed and known zero-filled.
    Clear,
    /// Mapped and recently used.
    Active,
    /// Mapped but idle; `mappings == 0` when write-back parks a page here.
    Inactive,
    /// Exclusively owned by whoever transitioned it here, for the duration
    /// of a slow operation (zeroing, I/O). Not reclaimable by anyone else.
    Busy,
    /// Pinned; never paged or reclaimed.
    Wired,
    /// Carved out of the pool (boot-reserved ranges, firmware memory).
    Unused,
    /// Dirty; awaiting write-back to the backing store.
    Modified,
    /// Dirty anonymous/temporary memory; written back only under memory
    /// pressure.
    ModifiedTemporary,
}

impl PageState {
    /// Number of states; the statistics block keeps one counter per state.
    pub const COUNT: usize = 9;

    /// All states, in counter order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Free,
        Self::Clear,
        Self::Active,
        Self::Inactive,
        Self::Busy,
        Self::Wired,
        Self::Unused,
        Self::Modified,
        Self::ModifiedTemporary,
    ];

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// The fixed, total state→queue mapping.
    ///
    /// Five queues group the nine states; `active` is the catch-all for
    /// every state that is neither reclaimable nor dirty.
    #[must_use]
    pub const fn queue(self) -> QueueKind {
        match self {
            Self::Free => QueueKind::Free,
            Self::Clear => QueueKind::Clear,
            Self::Active | Self::Inactive | Self::Busy | Self::Wired | Self::Unused => {
                QueueKind::Active
            }
            Self::Modified => QueueKind::Modified,
            Self::ModifiedTemporary => QueueKind::ModifiedTemporary,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Clear => "clear",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Busy => "busy",
            Self::Wired => "wired",
            Self::Unused => "unused",
            Self::Modified => "modified",
            Self::ModifiedTemporary => "modified_temporary",
        }
    }
}

/// The five coarse queues grouping the nine states.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum QueueKind {
    Free,
    Clear,
    Active,
    Modified,
    ModifiedTemporary,
}

impl QueueKind {
    /// Whether this queue participates in the write-back daemon's
    /// edge-triggered wakeup (the modified union).
    #[inline]
    pub(crate) const fn tracks_modified(self) -> bool {
        matches!(self, Self::Modified | Self::ModifiedTemporary)
    }
}

/// One frame descriptor. Created at registry build time, never destroyed.
pub(crate) struct Frame {
    /// Absolute physical page index.
    pub(crate) number: PageFrameNumber,
    pub(crate) state: PageState,
    /// Live mapping count; consulted only to pick `Active` vs `Inactive`
    /// when write-back releases the frame.
    pub(crate) mappings: u32,
    /// Opaque backing object, used only by the write-back daemon.
    pub(crate) cache: Option<Arc<dyn PageCache>>,
    /// Byte offset of this page within its backing object.
    pub(crate) cache_offset: u64,
    /// Intrusive queue linkage: registry indices of the neighbors in the
    /// frame's current queue.
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl Frame {
    pub(crate) const fn new(number: PageFrameNumber) -> Self {
        Self {
            number,
            state: PageState::Free,
            mappings: 0,
            cache: None,
            cache_offset: 0,
            prev: None,
            next: None,
        }
    }
}

/// Read-only snapshot of one frame, for introspection and the debugger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameInfo {
    pub number: PageFrameNumber,
    pub state: PageState,
    pub mappings: u32,
}
