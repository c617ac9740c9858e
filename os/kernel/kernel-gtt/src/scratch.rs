use crate::entry::{CacheLevel, GttEntry, encode};
use crate::generation::HardwareCaps;
use kernel_gpu_addresses::PhysicalPage;

/// The page every unused slot points at.
///
/// Filling unmapped slots with a valid entry to a harmless page means stray
/// GPU accesses read garbage instead of faulting or hitting memory someone
/// else owns. The entries are encoded once up front.
#[derive(Copy, Clone, Debug)]
pub struct ScratchPage {
    page: PhysicalPage,
    global_entry: GttEntry,
    ppgtt_entry: GttEntry,
}

impl ScratchPage {
    #[must_use]
    pub fn new(caps: &HardwareCaps, page: PhysicalPage) -> Self {
        Self {
            page,
            global_entry: encode(caps, page, CacheLevel::None),
            ppgtt_entry: encode(caps, page, CacheLevel::Llc),
        }
    }

    #[inline]
    #[must_use]
    pub const fn page(&self) -> PhysicalPage {
        self.page
    }

    /// Entry written into unused global-table slots (uncached).
    #[inline]
    #[must_use]
    pub const fn global_entry(&self) -> GttEntry {
        self.global_entry
    }

    /// Entry written into unused per-process slots (LLC cached).
    #[inline]
    #[must_use]
    pub const fn ppgtt_entry(&self) -> GttEntry {
        self.ppgtt_entry
    }
}
