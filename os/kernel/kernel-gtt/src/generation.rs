//! # Hardware Generations
//!
//! The handful of generation differences this subsystem cares about are
//! resolved once into [`HardwareCaps`] when the device handle is built.

use crate::entry::CacheLevel;
use crate::layout::{GLOBAL_APERTURE_END, PAGE_SIZE, PPGTT_DIRECTORY_APERTURE_START};

/// GPU hardware generation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Generation {
    /// Pre-LLC chipsets. Global table only.
    Gen5,
    /// Sandy Bridge. Per-process translation switched chipset-wide.
    Gen6,
    /// Ivy Bridge and later. Per-process translation switched per engine.
    Gen7,
}

/// How per-process translation is enabled in hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PpgttMode {
    /// One shared mode bit plus chipset cache and fault-handling bits.
    Chipset,
    /// One mode bit per command-ring engine.
    PerEngine,
}

/// Capabilities derived from a [`Generation`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HardwareCaps {
    pub generation: Generation,
    /// `None` if the hardware has no per-process tables.
    pub ppgtt: Option<PpgttMode>,
    /// Has last-level-cache snooping classes, including LLC + MLC.
    pub llc: bool,
    /// Physical address bits a table entry can encode.
    pub address_bits: u32,
}

impl Generation {
    #[must_use]
    pub const fn caps(self) -> HardwareCaps {
        match self {
            Self::Gen5 => HardwareCaps {
                generation: self,
                ppgtt: None,
                llc: false,
                address_bits: 36,
            },
            Self::Gen6 => HardwareCaps {
                generation: self,
                ppgtt: Some(PpgttMode::Chipset),
                llc: true,
                address_bits: 40,
            },
            Self::Gen7 => HardwareCaps {
                generation: self,
                ppgtt: Some(PpgttMode::PerEngine),
                llc: true,
                address_bits: 40,
            },
        }
    }
}

impl HardwareCaps {
    /// Entry cache-class bits for `level`.
    ///
    /// Without LLC classes, LLC and LLC+MLC both degrade to the plain
    /// "system cached" class.
    #[must_use]
    pub const fn cache_bits(&self, level: CacheLevel) -> u8 {
        match (self.llc, level) {
            (false, CacheLevel::None) => 0b00,
            (false, CacheLevel::Llc | CacheLevel::LlcMlc) => 0b11,
            (true, CacheLevel::None) => 0b01,
            (true, CacheLevel::Llc) => 0b10,
            (true, CacheLevel::LlcMlc) => 0b11,
        }
    }

    /// End of the aperture range objects may occupy.
    ///
    /// With per-process translation the last [`PPGTT_DIRECTORY_ENTRIES`](crate::layout::PPGTT_DIRECTORY_ENTRIES)
    /// global slots hold the PPGTT directory and are never handed out.
    #[must_use]
    pub const fn usable_aperture_end(&self) -> u64 {
        if self.ppgtt.is_some() {
            PPGTT_DIRECTORY_APERTURE_START
        } else {
            GLOBAL_APERTURE_END
        }
    }

    /// Last usable slot, exclusive. See [`usable_aperture_end`](Self::usable_aperture_end).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn usable_slot_limit(&self) -> usize {
        (self.usable_aperture_end() / PAGE_SIZE) as usize
    }

    /// Inverse of [`cache_bits`](Self::cache_bits), picking the best level
    /// that produces `bits`.
    #[must_use]
    pub const fn cache_level(&self, bits: u8) -> Option<CacheLevel> {
        match (self.llc, bits) {
            (false, 0b00) | (true, 0b01) => Some(CacheLevel::None),
            (false, 0b11) | (true, 0b10) => Some(CacheLevel::Llc),
            (true, 0b11) => Some(CacheLevel::LlcMlc),
            _ => None,
        }
    }
}
