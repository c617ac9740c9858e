//! # Translation Table Layout
//!
//! Fixed geometry of the global table and the aliasing per-process table.

pub use kernel_gpu_addresses::{PAGE_SHIFT, PAGE_SIZE};

/// Size of one table entry in bytes.
pub const ENTRY_SIZE: usize = 4;

/// Entries held by one page-table page.
#[allow(clippy::cast_possible_truncation)]
pub const ENTRIES_PER_PAGE: usize = PAGE_SIZE as usize / ENTRY_SIZE;

/// Entries in the global table (2 GiB of aperture).
pub const GLOBAL_ENTRIES: usize = 512 * 1024;

/// Page-table pages backing the global table.
pub const GLOBAL_TABLE_PAGES: usize = GLOBAL_ENTRIES / ENTRIES_PER_PAGE;

/// Largest aperture address the global table can translate (exclusive).
pub const GLOBAL_APERTURE_END: u64 = GLOBAL_ENTRIES as u64 * PAGE_SIZE;

/// Directory entries (and page-table pages) of the aliasing PPGTT.
pub const PPGTT_DIRECTORY_ENTRIES: usize = 512;

/// Entries addressable through the aliasing PPGTT.
pub const PPGTT_ENTRIES: usize = PPGTT_DIRECTORY_ENTRIES * ENTRIES_PER_PAGE;

/// First global-table slot holding a PPGTT directory entry.
///
/// The directory is carved out of the very end of the global table.
pub const PPGTT_FIRST_DIRECTORY_SLOT: usize = GLOBAL_ENTRIES - PPGTT_DIRECTORY_ENTRIES;

/// First aperture address whose slot holds a PPGTT directory entry.
pub const PPGTT_DIRECTORY_APERTURE_START: u64 = PPGTT_FIRST_DIRECTORY_SLOT as u64 * PAGE_SIZE;

/// Delay after a failed idle request before carrying on, in microseconds.
pub const IDLE_RETRY_DELAY_US: u32 = 10;

const _: () = {
    assert!(ENTRIES_PER_PAGE == 1024);
    assert!(GLOBAL_ENTRIES.is_multiple_of(ENTRIES_PER_PAGE));
    assert!(PPGTT_FIRST_DIRECTORY_SLOT.is_multiple_of(16));
    assert!(GLOBAL_APERTURE_END == 2 * 1024 * 1024 * 1024);
};
