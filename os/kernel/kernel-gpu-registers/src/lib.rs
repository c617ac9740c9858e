//! # Typed GPU MMIO Registers
//!
//! Register values are bit-packed with [`bitfield_struct`] so call sites set
//! named fields instead of shifting masks. Reads and writes go through a
//! [`RegisterIo`] transport supplied by the platform; this crate never touches
//! MMIO itself.
//!
//! Two addressing schemes exist:
//!
//! - [`MmioRegister`]: a single register at a fixed offset (chipset-wide).
//! - [`RingRegister`]: one instance per command-ring [`Engine`], at
//!   `engine.mmio_base() + RING_OFFSET`.
//!
//! Some registers are *masked*: the upper 16 bits select which of the lower
//! 16 bits a write actually changes. Their types expose constructors that set
//! both halves, see [`GfxMode::enable_ppgtt`].

#![cfg_attr(not(any(test, doctest)), no_std)]

mod engine;
mod gfx_mode;
mod ppgtt_cache;
mod pp_dir;

pub use engine::Engine;
pub use gfx_mode::{GfxMode, RingMode};
pub use pp_dir::{PpDirBase, PpDirDclv};
pub use ppgtt_cache::{GabCtl, GacEcoBits, GamEcoChk, PPGTT_CACHE_64B};

/// Register transport.
///
/// Implemented by the platform on top of the mapped MMIO BAR.
pub trait RegisterIo {
    /// Read the 32-bit register at byte `offset`.
    fn read_register(&self, offset: u32) -> u32;

    /// Write the 32-bit register at byte `offset`.
    fn write_register(&mut self, offset: u32, value: u32);
}

/// A register at a fixed MMIO offset.
pub trait MmioRegister: Copy {
    /// Byte offset from the MMIO base.
    const OFFSET: u32;

    fn from_raw(raw: u32) -> Self;

    fn into_raw(self) -> u32;

    /// Read the current register value.
    #[inline]
    fn load<R: RegisterIo + ?Sized>(io: &R) -> Self {
        Self::from_raw(io.read_register(Self::OFFSET))
    }

    /// Write this value to the register.
    #[inline]
    fn store<R: RegisterIo + ?Sized>(self, io: &mut R) {
        io.write_register(Self::OFFSET, self.into_raw());
    }

    /// Read-modify-write, keeping every bit `f` does not touch.
    #[inline]
    fn modify<R: RegisterIo + ?Sized>(io: &mut R, f: impl FnOnce(Self) -> Self) {
        f(Self::load(io)).store(io);
    }
}

/// A register instantiated once per command-ring engine.
pub trait RingRegister: Copy {
    /// Byte offset from the engine's MMIO base.
    const RING_OFFSET: u32;

    fn from_raw(raw: u32) -> Self;

    fn into_raw(self) -> u32;

    /// Absolute MMIO offset of this register for `engine`.
    #[inline]
    #[must_use]
    fn offset_for(engine: Engine) -> u32 {
        engine.mmio_base() + Self::RING_OFFSET
    }

    #[inline]
    fn load_ring<R: RegisterIo + ?Sized>(io: &R, engine: Engine) -> Self {
        Self::from_raw(io.read_register(Self::offset_for(engine)))
    }

    #[inline]
    fn store_ring<R: RegisterIo + ?Sized>(self, io: &mut R, engine: Engine) {
        io.write_register(Self::offset_for(engine), self.into_raw());
    }
}

macro_rules! mmio_register {
    ($ty:ty, $offset:expr) => {
        impl $crate::MmioRegister for $ty {
            const OFFSET: u32 = $offset;

            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self::from_bits(raw)
            }

            #[inline]
            fn into_raw(self) -> u32 {
                self.into_bits()
            }
        }
    };
}

macro_rules! ring_register {
    ($ty:ty, $offset:expr) => {
        impl $crate::RingRegister for $ty {
            const RING_OFFSET: u32 = $offset;

            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self::from_bits(raw)
            }

            #[inline]
            fn into_raw(self) -> u32 {
                self.into_bits()
            }
        }
    };
}

pub(crate) use mmio_register;
pub(crate) use ring_register;
