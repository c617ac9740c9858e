//! # Global Table
//!
//! The hardware-wide table translating the whole GPU aperture. The low part
//! of the aperture is CPU-mappable through the fictitious range; the rest is
//! reachable by the GPU only. One page right below `end` is never handed out.
//!
//! ```text
//!  start            mappable_end                  end - PAGE     end
//!    ├──── mappable ──────┼────── GPU only ──────────┼── guard ──┤
//!    └──────────────── reserved_size ────────────────┘
//! ```

use crate::binder::{self, TableDirectory};
use crate::entry::GttEntry;
use crate::error::{GttError, GttResult};
use crate::layout::{GLOBAL_APERTURE_END, GLOBAL_TABLE_PAGES, PAGE_SIZE};
use crate::window::TableMapper;
use alloc::vec::Vec;
use kernel_gpu_addresses::{GttAddress, GttSlot, PhysicalPage};

/// Page-table pages backing the global table, in aperture order.
#[derive(Debug)]
pub struct GlobalTable {
    directory: Vec<PhysicalPage>,
}

/// Boundaries of the managed aperture range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GttSpace {
    start: GttAddress,
    end: GttAddress,
    mappable_end: GttAddress,
}

impl GlobalTable {
    /// Wrap the pages backing the global table.
    ///
    /// ### Debug assertions
    /// - Asserts there are at most [`GLOBAL_TABLE_PAGES`] pages.
    #[must_use]
    pub fn new(directory: Vec<PhysicalPage>) -> Self {
        debug_assert!(directory.len() <= GLOBAL_TABLE_PAGES);
        Self { directory }
    }

    #[inline]
    #[must_use]
    pub fn pages(&self) -> &[PhysicalPage] {
        &self.directory
    }

    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`] if `slot` is outside the table.
    pub fn read_entry<M: TableMapper + ?Sized>(&self, mapper: &M, slot: GttSlot) -> GttResult<GttEntry> {
        binder::read(mapper, self, slot).map(GttEntry::from_bits)
    }
}

impl TableDirectory for GlobalTable {
    #[inline]
    fn directory_len(&self) -> usize {
        self.directory.len()
    }

    #[inline]
    fn table_page(&self, index: usize) -> PhysicalPage {
        self.directory[index]
    }
}

impl GttSpace {
    /// Validate and record the aperture boundaries.
    ///
    /// `mappable_end` is clamped to `end`.
    ///
    /// # Errors
    /// [`GttError::InvalidRange`] if `start` exceeds `mappable_end` or `end`,
    /// if the range is not page aligned, leaves no room for the guard page, or
    /// reaches past the global table.
    pub fn new(start: GttAddress, mappable_end: GttAddress, end: GttAddress) -> GttResult<Self> {
        let valid = start <= mappable_end
            && start <= end
            && start.is_page_aligned()
            && end.is_page_aligned()
            && end - start >= PAGE_SIZE
            && end.as_u64() <= GLOBAL_APERTURE_END;
        if !valid {
            return Err(GttError::InvalidRange {
                start,
                mappable_end,
                end,
            });
        }

        Ok(Self {
            start,
            end,
            mappable_end: mappable_end.min(end),
        })
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> GttAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> GttAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn mappable_end(&self) -> GttAddress {
        self.mappable_end
    }

    /// Bytes covered by `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.end.as_u64() - self.start.as_u64()
    }

    /// Bytes of the CPU-mappable part.
    #[inline]
    #[must_use]
    pub const fn mappable_total(&self) -> u64 {
        self.mappable_end.as_u64() - self.start.as_u64()
    }

    /// Bytes handed to the space allocator: everything but the guard page.
    #[inline]
    #[must_use]
    pub const fn reserved_size(&self) -> u64 {
        self.total() - PAGE_SIZE
    }

    /// Slot range `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn slots(&self) -> (GttSlot, usize) {
        (self.start.slot(), GttSlot::count_for(self.total()))
    }
}
