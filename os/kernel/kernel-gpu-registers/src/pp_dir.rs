use crate::ring_register;
use bitfield_struct::bitfield;

/// `RING_PP_DIR_BASE`: where an engine finds its page directory.
///
/// The directory lives inside the global table; its position is given as a
/// byte offset into the global table, expressed in 64-byte cachelines and
/// stored in the upper half of the register.
#[bitfield(u32)]
pub struct PpDirBase {
    #[bits(16)]
    __res_0_15: u16,

    /// Bits 16–31: directory offset in cachelines.
    #[bits(16)]
    pub directory_cachelines: u16,
}

/// `RING_PP_DIR_DCLV`: directory cacheline valid mask.
///
/// Each bit validates one cacheline (16 directory entries, 64 MiB of address
/// space) of the page directory.
#[bitfield(u32)]
pub struct PpDirDclv {
    #[bits(32)]
    pub valid_mask: u32,
}

impl PpDirBase {
    /// Size of one directory cacheline in bytes.
    pub const CACHELINE: u32 = 64;

    /// Build from the directory's byte offset within the global table.
    ///
    /// ### Debug assertions
    /// - Asserts the offset is cacheline aligned.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_directory_offset(byte_offset: u32) -> Self {
        debug_assert!(byte_offset.is_multiple_of(Self::CACHELINE));
        Self::new().with_directory_cachelines((byte_offset / Self::CACHELINE) as u16)
    }

    /// Directory byte offset encoded in this value.
    #[inline]
    #[must_use]
    pub const fn directory_offset(self) -> u32 {
        self.directory_cachelines() as u32 * Self::CACHELINE
    }
}

impl PpDirDclv {
    /// Every cacheline valid: the full 2 GiB per-process range.
    #[inline]
    #[must_use]
    pub const fn two_gigabytes() -> Self {
        Self::new().with_valid_mask(0xffff_ffff)
    }
}

ring_register!(PpDirBase, 0x228);
ring_register!(PpDirDclv, 0x220);
