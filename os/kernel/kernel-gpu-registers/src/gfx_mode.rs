use crate::{mmio_register, ring_register};
use bitfield_struct::bitfield;

/// `GFX_MODE`: chipset-wide graphics mode register (masked).
///
/// On generation 6 this is the single switch that turns per-process
/// translation on for every engine at once.
///
/// Bits 16–31 are the write mask for bits 0–15: a write only changes the low
/// bits whose mask bit is set.
#[bitfield(u32)]
pub struct GfxMode {
    /// Bits 0–8: unrelated mode bits.
    #[bits(9)]
    __low: u16,

    /// Bit 9: `PPGTT_ENABLE`: translate through the per-process table.
    pub ppgtt_enable: bool,

    /// Bits 10–15: unrelated mode bits.
    #[bits(6)]
    __high: u8,

    /// Bits 16–24: write mask for bits 0–8.
    #[bits(9)]
    __mask_low: u16,

    /// Bit 25: write mask for `ppgtt_enable`.
    pub ppgtt_enable_mask: bool,

    /// Bits 26–31: write mask for bits 10–15.
    #[bits(6)]
    __mask_high: u8,
}

/// `RING_MODE_GEN7`: per-engine mode register (masked), generation 7+.
///
/// Same layout as [`GfxMode`]; on generation 7 per-process translation is
/// switched per engine instead of globally.
#[bitfield(u32)]
pub struct RingMode {
    /// Bits 0–8: unrelated mode bits.
    #[bits(9)]
    __low: u16,

    /// Bit 9: `PPGTT_ENABLE`.
    pub ppgtt_enable: bool,

    /// Bits 10–15.
    #[bits(6)]
    __high: u8,

    /// Bits 16–24: write mask for bits 0–8.
    #[bits(9)]
    __mask_low: u16,

    /// Bit 25: write mask for `ppgtt_enable`.
    pub ppgtt_enable_mask: bool,

    /// Bits 26–31.
    #[bits(6)]
    __mask_high: u8,
}

impl GfxMode {
    /// Masked write that sets `PPGTT_ENABLE` and leaves every other bit alone.
    #[inline]
    #[must_use]
    pub const fn enable_ppgtt() -> Self {
        Self::new()
            .with_ppgtt_enable(true)
            .with_ppgtt_enable_mask(true)
    }
}

impl RingMode {
    /// Masked write that sets `PPGTT_ENABLE` on one engine.
    #[inline]
    #[must_use]
    pub const fn enable_ppgtt() -> Self {
        Self::new()
            .with_ppgtt_enable(true)
            .with_ppgtt_enable_mask(true)
    }
}

mmio_register!(GfxMode, 0x2520);
ring_register!(RingMode, 0x29c);
