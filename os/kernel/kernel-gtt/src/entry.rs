//! # Translation Table Entries
//!
//! Both the global table and the per-process table use 32-bit entries with
//! the same address encoding: physical address bits 31:12 stay in place and
//! bits 39:32 are folded into bits 11:4.
//!
//! | Bits   | Field | Meaning |
//! |--------|-------|---------|
//! | 0      | valid | Entry translates |
//! | 1–2    | cache | Cache class, see [`HardwareCaps::cache_bits`] |
//! | 3      | –     | Reserved |
//! | 4–11   | addr  | Physical bits 39:32 (35:32 on 36-bit parts) |
//! | 12–31  | addr  | Physical bits 31:12 |
//!
//! Directory entries use the same address layout but carry no cache class.

use crate::generation::HardwareCaps;
use bitfield_struct::bitfield;
use kernel_gpu_addresses::{PhysicalAddress, PhysicalPage};

/// Cache-coherency level requested for an object's mapping.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CacheLevel {
    /// Uncached, not snooped.
    #[default]
    None,
    /// Snooped through the last-level cache.
    Llc,
    /// Last-level plus mid-level cache.
    LlcMlc,
}

/// One translation entry (PTE).
#[doc(alias = "PTE")]
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct GttEntry {
    /// Bit 0: entry translates.
    pub valid: bool,

    /// Bits 1–2: cache class.
    #[bits(2)]
    pub cache: u8,

    #[bits(1)]
    __res_3: u8,

    /// Bits 4–11: physical address bits 39:32.
    #[bits(8)]
    addr_39_32: u8,

    /// Bits 12–31: physical address bits 31:12.
    #[bits(20)]
    addr_31_12: u32,
}

/// One page-directory entry (PDE): points at a page-table page.
#[doc(alias = "PDE")]
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Bit 0: entry points at a page-table page.
    pub valid: bool,

    #[bits(3)]
    __res_1_3: u8,

    /// Bits 4–11: physical address bits 39:32.
    #[bits(8)]
    addr_39_32: u8,

    /// Bits 12–31: physical address bits 31:12.
    #[bits(20)]
    addr_31_12: u32,
}

impl GttEntry {
    /// Valid entry mapping `page` with the given cache class bits.
    #[inline]
    #[must_use]
    pub const fn mapping(page: PhysicalPage, cache_bits: u8) -> Self {
        let mut e = Self::new().with_valid(true).with_cache(cache_bits);
        e.set_physical_address(page.base());
        e
    }

    /// Store a 4 KiB aligned physical address.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        debug_assert!(pa.is_page_aligned());
        debug_assert!(pa.fits_width(40));
        self.set_addr_31_12(((pa.as_u64() >> 12) & 0xF_FFFF) as u32);
        self.set_addr_39_32(((pa.as_u64() >> 32) & 0xFF) as u8);
    }

    /// The physical address this entry points at.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(
            ((self.addr_39_32() as u64) << 32) | ((self.addr_31_12() as u64) << 12),
        )
    }
}

impl DirectoryEntry {
    /// Valid entry pointing at page-table page `table`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn for_table(table: PhysicalPage) -> Self {
        let pa = table.base().as_u64();
        debug_assert!(table.base().fits_width(40));
        Self::new()
            .with_valid(true)
            .with_addr_31_12(((pa >> 12) & 0xF_FFFF) as u32)
            .with_addr_39_32(((pa >> 32) & 0xFF) as u8)
    }

    /// The page-table page this entry points at.
    #[inline]
    #[must_use]
    pub const fn table_page(self) -> PhysicalPage {
        PhysicalPage::from_addr(PhysicalAddress::new(
            ((self.addr_39_32() as u64) << 32) | ((self.addr_31_12() as u64) << 12),
        ))
    }
}

/// Encode a valid entry mapping `page` at `level` for the given hardware.
///
/// ### Debug assertions
/// - Asserts the address fits the generation's physical address width.
#[inline]
#[must_use]
pub fn encode(caps: &HardwareCaps, page: PhysicalPage, level: CacheLevel) -> GttEntry {
    debug_assert!(
        page.base().fits_width(caps.address_bits),
        "{page:?} exceeds {} address bits",
        caps.address_bits
    );
    GttEntry::mapping(page, caps.cache_bits(level))
}

/// Recover the physical address and cache level from an entry.
///
/// Returns `None` for entries that are not valid.
#[inline]
#[must_use]
pub fn decode(caps: &HardwareCaps, entry: GttEntry) -> Option<(PhysicalAddress, Option<CacheLevel>)> {
    if !entry.valid() {
        return None;
    }
    Some((entry.physical_address(), caps.cache_level(entry.cache())))
}
