//! # Binder
//!
//! Writes runs of entries into a table that is split over page-table pages.
//!
//! A slot range `[first, first + count)` is walked one page-table page at a
//! time: each touched page is opened through a [`TableWindow`](crate::window::TableWindow),
//! its share of the range is written, and the window is closed before moving
//! on to the next page.
//!
//! ```text
//!  first = 1020, count = 8, ENTRIES_PER_PAGE = 1024
//!
//!  page 0  [ ... | 1020 1021 1022 1023 ]   4 entries
//!  page 1  [ 0 1 2 3 | ... ]               4 entries
//! ```
//!
//! Ranges are checked against the table before anything is written, so a
//! rejected call leaves the table untouched.

use crate::entry::{CacheLevel, GttEntry, encode};
use crate::error::{GttError, GttResult};
use crate::generation::HardwareCaps;
use crate::layout::ENTRIES_PER_PAGE;
use crate::object::ObjectBinding;
use crate::window::{TableMapper, with_mapped};
use kernel_gpu_addresses::{GttSlot, PhysicalPage};

/// Access to the page-table pages making up one table.
pub trait TableDirectory {
    /// Number of page-table pages.
    fn directory_len(&self) -> usize;

    /// Page-table page at directory index `index`.
    fn table_page(&self, index: usize) -> PhysicalPage;

    /// Number of slots the table translates.
    #[inline]
    fn entry_count(&self) -> usize {
        self.directory_len() * ENTRIES_PER_PAGE
    }
}

/// Fail unless `[first, first + count)` lies within `dir`.
///
/// # Errors
/// [`GttError::SlotRangeOutOfBounds`] if the range does not fit.
pub fn check_range<D: TableDirectory + ?Sized>(dir: &D, first: GttSlot, count: usize) -> GttResult<()> {
    check_slots(first, count, dir.entry_count())
}

/// Fail unless `[first, first + count)` ends at or below slot `limit`.
///
/// # Errors
/// [`GttError::SlotRangeOutOfBounds`] if the range does not fit.
pub fn check_slots(first: GttSlot, count: usize, limit: usize) -> GttResult<()> {
    match first.as_usize().checked_add(count) {
        Some(end) if end <= limit => Ok(()),
        _ => Err(GttError::SlotRangeOutOfBounds {
            first: first.as_usize(),
            count,
            limit,
        }),
    }
}

/// Walk `[first, first + count)` page by page, storing `value(k)` into the
/// `k`-th slot of the range.
///
/// The range must already have been checked against `dir`.
pub(crate) fn write_range<M, D>(
    mapper: &M,
    dir: &D,
    first: GttSlot,
    count: usize,
    mut value: impl FnMut(usize) -> u32,
) where
    M: TableMapper + ?Sized,
    D: TableDirectory + ?Sized,
{
    let mut act_pd = first.as_usize() / ENTRIES_PER_PAGE;
    let mut first_pte = first.as_usize() % ENTRIES_PER_PAGE;
    let mut remaining = count;
    let mut written = 0;

    while remaining > 0 {
        let last_pte = (first_pte + remaining).min(ENTRIES_PER_PAGE);

        // SAFETY: directory pages are owned by `dir`, and this is the only
        // window open on this thread.
        unsafe {
            with_mapped(mapper, dir.table_page(act_pd), |table| {
                for i in first_pte..last_pte {
                    table.set(i, value(written));
                    written += 1;
                }
            });
        }

        remaining -= last_pte - first_pte;
        first_pte = 0;
        act_pd += 1;
    }
}

/// Map `pages` in order, starting at `first`, at cache level `level`.
///
/// # Errors
/// - [`GttError::SlotRangeOutOfBounds`] if the pages do not fit.
/// - [`GttError::AddressTooWide`] if a page is beyond what `caps` can encode.
pub fn insert<M, D>(
    mapper: &M,
    dir: &D,
    caps: &HardwareCaps,
    first: GttSlot,
    pages: &[PhysicalPage],
    level: CacheLevel,
) -> GttResult<()>
where
    M: TableMapper + ?Sized,
    D: TableDirectory + ?Sized,
{
    check_range(dir, first, pages.len())?;
    if let Some(page) = pages.iter().find(|p| !p.base().fits_width(caps.address_bits)) {
        return Err(GttError::AddressTooWide {
            address: page.base(),
            bits: caps.address_bits,
        });
    }
    write_range(mapper, dir, first, pages.len(), |k| {
        encode(caps, pages[k], level).into_bits()
    });
    Ok(())
}

/// Point `[first, first + count)` at the scratch entry.
///
/// # Errors
/// [`GttError::SlotRangeOutOfBounds`] if the range does not fit.
pub fn clear<M, D>(mapper: &M, dir: &D, first: GttSlot, count: usize, scratch: GttEntry) -> GttResult<()>
where
    M: TableMapper + ?Sized,
    D: TableDirectory + ?Sized,
{
    check_range(dir, first, count)?;
    let raw = scratch.into_bits();
    write_range(mapper, dir, first, count, |_| raw);
    Ok(())
}

/// Read the raw word in `slot`.
///
/// Also serves as a posting read: it does not return before earlier writes
/// to the same page have landed.
///
/// # Errors
/// [`GttError::SlotRangeOutOfBounds`] if the slot is outside the table.
pub fn read<M, D>(mapper: &M, dir: &D, slot: GttSlot) -> GttResult<u32>
where
    M: TableMapper + ?Sized,
    D: TableDirectory + ?Sized,
{
    check_range(dir, slot, 1)?;
    let i = slot.as_usize();
    // SAFETY: see `write_range`.
    let raw = unsafe {
        with_mapped(mapper, dir.table_page(i / ENTRIES_PER_PAGE), |table| {
            table.get(i % ENTRIES_PER_PAGE)
        })
    };
    Ok(raw)
}

/// Slot range an object occupies, checked against `dir` and the object's
/// page list.
pub(crate) fn object_range<D: TableDirectory + ?Sized>(
    dir: &D,
    obj: &ObjectBinding,
) -> GttResult<(GttSlot, usize)> {
    debug_assert!(obj.placement.is_page_aligned(), "unaligned placement {:?}", obj.placement);
    let first = obj.first_slot();
    let count = obj.slot_count();
    check_range(dir, first, count)?;
    Ok((first, count))
}

/// Map an object's backing pages at its placement.
///
/// # Errors
/// - [`GttError::SlotRangeOutOfBounds`] if the object does not fit `dir`.
/// - [`GttError::PageListTooShort`] if the object lacks backing pages.
/// - [`GttError::AddressTooWide`] if a backing page cannot be encoded.
pub fn bind_object<M, D>(
    mapper: &M,
    dir: &D,
    caps: &HardwareCaps,
    obj: &ObjectBinding,
    level: CacheLevel,
) -> GttResult<()>
where
    M: TableMapper + ?Sized,
    D: TableDirectory + ?Sized,
{
    let (first, count) = object_range(dir, obj)?;
    if obj.pages.len() < count {
        return Err(GttError::PageListTooShort {
            needed: count,
            available: obj.pages.len(),
        });
    }
    insert(mapper, dir, caps, first, &obj.pages[..count], level)
}

/// Point an object's slots back at scratch.
///
/// # Errors
/// [`GttError::SlotRangeOutOfBounds`] if the object does not fit `dir`.
pub fn unbind_object<M, D>(mapper: &M, dir: &D, obj: &ObjectBinding, scratch: GttEntry) -> GttResult<()>
where
    M: TableMapper + ?Sized,
    D: TableDirectory + ?Sized,
{
    let (first, count) = object_range(dir, obj)?;
    clear(mapper, dir, first, count, scratch)
}
