//! # Aliasing Per-Process Table
//!
//! A second, process-private translation table that aliases the global
//! aperture layout. Its page-table pages are pointed at by directory entries
//! stored in the last [`PPGTT_DIRECTORY_ENTRIES`] slots of the global table,
//! so the hardware finds the directory at a fixed byte offset inside the
//! global table.
//!
//! ```text
//!  global table slots
//!  ┌──────────────────────────────┬──────────────┐
//!  │ aperture entries             │ PDE 0 .. 511 │  ← PPGTT_FIRST_DIRECTORY_SLOT
//!  └──────────────────────────────┴──────┬───────┘
//!                                        ▼
//!                      512 page-table pages × 1024 entries
//! ```

use crate::binder::{self, TableDirectory};
use crate::entry::{CacheLevel, DirectoryEntry, GttEntry};
use crate::error::{GttError, GttResult};
use crate::generation::HardwareCaps;
use crate::layout::{ENTRY_SIZE, PPGTT_DIRECTORY_ENTRIES, PPGTT_FIRST_DIRECTORY_SLOT};
use crate::object::ObjectBinding;
use crate::platform::TablePageProvider;
use crate::scratch::ScratchPage;
use crate::window::TableMapper;
use alloc::vec;
use alloc::vec::Vec;
use kernel_gpu_addresses::{GttSlot, PhysicalPage};
use log::{debug, warn};

/// The aliasing per-process translation table.
#[derive(Debug)]
pub struct Ppgtt {
    directory: Vec<PhysicalPage>,
    scratch_entry: GttEntry,
    first_directory_slot: GttSlot,
    directory_offset: u32,
}

impl Ppgtt {
    /// Allocate, wire and scratch-fill the table.
    ///
    /// Pages are obtained one at a time. If any allocation fails, every page
    /// obtained so far is unwired and freed before returning.
    ///
    /// # Errors
    /// [`GttError::OutOfMemory`] with the directory index that failed.
    pub fn create<P>(platform: &mut P, scratch: &ScratchPage) -> GttResult<Self>
    where
        P: TablePageProvider + TableMapper,
    {
        let mut slots: Vec<Option<PhysicalPage>> = vec![None; PPGTT_DIRECTORY_ENTRIES];

        for index in 0..PPGTT_DIRECTORY_ENTRIES {
            let Some(page) = platform.alloc_page() else {
                warn!("PPGTT: out of memory at directory index {index}");
                release_directory(platform, &slots);
                return Err(GttError::OutOfMemory { index });
            };
            platform.wire(page);
            slots[index] = Some(page);
        }

        #[allow(clippy::cast_possible_truncation)]
        let ppgtt = Self {
            directory: slots.into_iter().flatten().collect(),
            scratch_entry: scratch.ppgtt_entry(),
            first_directory_slot: GttSlot::new(PPGTT_FIRST_DIRECTORY_SLOT),
            directory_offset: (PPGTT_FIRST_DIRECTORY_SLOT * ENTRY_SIZE) as u32,
        };

        // Covers exactly the pages allocated above.
        let scratch_raw = ppgtt.scratch_entry.into_bits();
        binder::write_range(&*platform, &ppgtt, GttSlot::new(0), ppgtt.entry_count(), |_| scratch_raw);

        debug!(
            "PPGTT: {} directory pages, directory at offset {:#x}",
            ppgtt.directory.len(),
            ppgtt.directory_offset
        );
        Ok(ppgtt)
    }

    /// Unwire and free every page-table page.
    pub fn destroy<P: TablePageProvider + ?Sized>(self, provider: &mut P) {
        debug!("PPGTT: releasing {} directory pages", self.directory.len());
        for page in self.directory {
            provider.unwire(page);
            provider.free_page(page);
        }
    }

    /// Page-table pages in directory order.
    #[inline]
    #[must_use]
    pub fn pages(&self) -> &[PhysicalPage] {
        &self.directory
    }

    /// Directory entries as they are written into the global table.
    pub fn directory_entries(&self) -> impl Iterator<Item = DirectoryEntry> + '_ {
        self.directory.iter().map(|p| DirectoryEntry::for_table(*p))
    }

    /// Global-table slot of the first directory entry.
    #[inline]
    #[must_use]
    pub const fn first_directory_slot(&self) -> GttSlot {
        self.first_directory_slot
    }

    /// Byte offset of the directory inside the global table.
    #[inline]
    #[must_use]
    pub const fn directory_offset(&self) -> u32 {
        self.directory_offset
    }

    #[inline]
    #[must_use]
    pub const fn scratch_entry(&self) -> GttEntry {
        self.scratch_entry
    }

    /// Map an object's pages at its placement.
    ///
    /// # Errors
    /// See [`binder::bind_object`].
    pub fn bind_object<M: TableMapper + ?Sized>(
        &self,
        mapper: &M,
        caps: &HardwareCaps,
        obj: &ObjectBinding,
        level: CacheLevel,
    ) -> GttResult<()> {
        binder::bind_object(mapper, self, caps, obj, level)
    }

    /// Point an object's slots back at scratch.
    ///
    /// # Errors
    /// See [`binder::unbind_object`].
    pub fn unbind_object<M: TableMapper + ?Sized>(&self, mapper: &M, obj: &ObjectBinding) -> GttResult<()> {
        binder::unbind_object(mapper, self, obj, self.scratch_entry)
    }

    /// Point `[first, first + count)` at scratch.
    ///
    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`] if the range does not fit.
    pub fn clear_range<M: TableMapper + ?Sized>(&self, mapper: &M, first: GttSlot, count: usize) -> GttResult<()> {
        binder::clear(mapper, self, first, count, self.scratch_entry)
    }

    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`] if `slot` is outside the table.
    pub fn read_entry<M: TableMapper + ?Sized>(&self, mapper: &M, slot: GttSlot) -> GttResult<GttEntry> {
        binder::read(mapper, self, slot).map(GttEntry::from_bits)
    }
}

impl TableDirectory for Ppgtt {
    #[inline]
    fn directory_len(&self) -> usize {
        self.directory.len()
    }

    #[inline]
    fn table_page(&self, index: usize) -> PhysicalPage {
        self.directory[index]
    }
}

/// Unwire and free the pages of a partially built directory.
fn release_directory<P: TablePageProvider + ?Sized>(provider: &mut P, slots: &[Option<PhysicalPage>]) {
    for page in slots.iter().flatten() {
        provider.unwire(*page);
        provider.free_page(*page);
    }
}
