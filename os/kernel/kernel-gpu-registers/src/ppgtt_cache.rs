//! Chipset cache-policy and fault-handling registers touched while enabling
//! per-process translation.

use crate::mmio_register;
use bitfield_struct::bitfield;

/// Field value selecting 64-byte PPGTT cache lines.
pub const PPGTT_CACHE_64B: u8 = 0b11;

/// `GAC_ECO_BITS`: graphics arbiter chicken bits (generation 6).
#[bitfield(u32)]
pub struct GacEcoBits {
    #[bits(8)]
    __res_0_7: u8,

    /// Bits 8–9: PPGTT cache line size ([`PPGTT_CACHE_64B`] = 64 bytes).
    #[bits(2)]
    pub ppgtt_cache: u8,

    #[bits(22)]
    __res_10_31: u32,
}

/// `GAB_CTL`: graphics arbiter control (generation 6).
#[bitfield(u32)]
pub struct GabCtl {
    #[bits(8)]
    __res_0_7: u8,

    /// Bit 8: keep the engine running after a PPGTT page fault.
    pub cont_after_pagefault: bool,

    #[bits(23)]
    __res_9_31: u32,
}

/// `GAM_ECOCHK`: graphics arbiter memory chicken bits.
///
/// Generation 6 additionally needs the SNB bit; generation 7 only programs
/// the cache policy.
#[bitfield(u32)]
pub struct GamEcoChk {
    #[bits(3)]
    __res_0_2: u8,

    /// Bits 3–4: PPGTT cache policy ([`PPGTT_CACHE_64B`] = 64 bytes).
    #[bits(2)]
    pub ppgtt_cache: u8,

    #[bits(5)]
    __res_5_9: u8,

    /// Bit 10: Sandy Bridge PPGTT enable bit.
    pub snb_bit: bool,

    #[bits(21)]
    __res_11_31: u32,
}

mmio_register!(GacEcoBits, 0x1_4090);
mmio_register!(GabCtl, 0x2_4000);
mmio_register!(GamEcoChk, 0x4090);
