//! # Page Table Window
//!
//! Page-table pages are not permanently mapped for the CPU. To touch one, the
//! caller opens a [`TableWindow`]: the current thread is pinned to its CPU,
//! the page gets a temporary CPU mapping, and both are released when the
//! window is dropped, on every exit path.
//!
//! ```text
//!  open:  pin_cpu ─► map_table ─► &mut TablePage
//!  drop:  unmap_table ─► unpin_cpu
//! ```
//!
//! Only one window is open per thread at a time; the binder walks a range one
//! page after the other.

use crate::entry::GttEntry;
use crate::layout::ENTRIES_PER_PAGE;
use core::ops::{Deref, DerefMut, Range};
use core::ptr::NonNull;
use kernel_gpu_addresses::PhysicalPage;

/// The contents of one page-table page: `ENTRIES_PER_PAGE` raw entry words.
#[repr(C, align(4096))]
pub struct TablePage {
    words: [u32; ENTRIES_PER_PAGE],
}

/// Establishes temporary CPU mappings of page-table pages.
///
/// # Safety
/// - `map_table` must return a pointer to the page's contents that stays
///   valid and writable until the matching `unmap_table`.
/// - Implementations may assume `pin_cpu` was called before `map_table` and
///   that `unpin_cpu` follows `unmap_table`.
pub trait TableMapper {
    /// Keep the current thread on this CPU and hold off preemption.
    fn pin_cpu(&self);

    /// Undo [`pin_cpu`](Self::pin_cpu).
    fn unpin_cpu(&self);

    /// Map `page` for CPU access.
    ///
    /// # Safety
    /// `page` must be a page-table page that is not mapped through another
    /// live window.
    unsafe fn map_table(&self, page: PhysicalPage) -> NonNull<TablePage>;

    /// Tear down a mapping returned by [`map_table`](Self::map_table).
    ///
    /// # Safety
    /// `table` must come from `map_table(page)` and must not be used afterwards.
    unsafe fn unmap_table(&self, page: PhysicalPage, table: NonNull<TablePage>);
}

/// A scoped CPU mapping of one page-table page.
pub struct TableWindow<'m, M: TableMapper + ?Sized> {
    mapper: &'m M,
    page: PhysicalPage,
    table: NonNull<TablePage>,
}

impl TablePage {
    /// A page with every entry zero.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            words: [0; ENTRIES_PER_PAGE],
        }
    }

    /// Raw word at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: usize) -> u32 {
        self.words[i]
    }

    /// Store a raw word at `i`.
    #[inline]
    pub const fn set(&mut self, i: usize, v: u32) {
        self.words[i] = v;
    }

    /// Entry at `i`.
    #[inline]
    #[must_use]
    pub const fn entry(&self, i: usize) -> GttEntry {
        GttEntry::from_bits(self.words[i])
    }

    /// Store `v` into every slot of `range`.
    #[inline]
    pub fn fill(&mut self, range: Range<usize>, v: u32) {
        self.words[range].fill(v);
    }

    #[inline]
    #[must_use]
    pub const fn words(&self) -> &[u32; ENTRIES_PER_PAGE] {
        &self.words
    }
}

impl<'m, M: TableMapper + ?Sized> TableWindow<'m, M> {
    /// Pin the CPU and map `page`.
    ///
    /// # Safety
    /// `page` must be a page-table page owned by the caller, and no other
    /// window on it may be alive.
    pub unsafe fn open(mapper: &'m M, page: PhysicalPage) -> Self {
        mapper.pin_cpu();
        let table = unsafe { mapper.map_table(page) };
        Self {
            mapper,
            page,
            table,
        }
    }

    #[inline]
    #[must_use]
    pub const fn page(&self) -> PhysicalPage {
        self.page
    }
}

impl<M: TableMapper + ?Sized> Deref for TableWindow<'_, M> {
    type Target = TablePage;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the mapping is valid until drop.
        unsafe { self.table.as_ref() }
    }
}

impl<M: TableMapper + ?Sized> DerefMut for TableWindow<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the mapping is valid until drop and exclusive to this window.
        unsafe { self.table.as_mut() }
    }
}

impl<M: TableMapper + ?Sized> Drop for TableWindow<'_, M> {
    fn drop(&mut self) {
        // SAFETY: `table` came from `map_table(self.page)` and dies with us.
        unsafe { self.mapper.unmap_table(self.page, self.table) };
        self.mapper.unpin_cpu();
    }
}

/// Run `f` on `page` through a short-lived [`TableWindow`].
///
/// # Safety
/// Same contract as [`TableWindow::open`]; `f` must not open a window on the
/// same page.
pub unsafe fn with_mapped<M, R>(mapper: &M, page: PhysicalPage, f: impl FnOnce(&mut TablePage) -> R) -> R
where
    M: TableMapper + ?Sized,
{
    let mut window = unsafe { TableWindow::open(mapper, page) };
    f(&mut window)
}
