//! # Hardware Programming
//!
//! Points every command-ring engine at the aliasing PPGTT directory and turns
//! per-process translation on.
//!
//! The directory entries are written into the global table first and read
//! back once, so the directory is complete in memory before any engine is
//! told where it lives.

use crate::binder::{self, TableDirectory};
use crate::entry::DirectoryEntry;
use crate::error::GttResult;
use crate::generation::{HardwareCaps, PpgttMode};
use crate::global::GlobalTable;
use crate::ppgtt::Ppgtt;
use crate::window::TableMapper;
use kernel_gpu_registers::{
    Engine, GabCtl, GacEcoBits, GamEcoChk, GfxMode, MmioRegister, PPGTT_CACHE_64B, PpDirBase, PpDirDclv, RegisterIo,
    RingMode, RingRegister,
};
use log::{debug, info};

/// Publish `ppgtt`'s directory and enable per-process translation on `engines`.
///
/// # Errors
/// [`GttError::SlotRangeOutOfBounds`](crate::GttError::SlotRangeOutOfBounds)
/// if the global table does not reach the directory slots. Nothing is written
/// in that case.
pub fn program_hardware<P>(
    platform: &mut P,
    global: &GlobalTable,
    ppgtt: &Ppgtt,
    caps: &HardwareCaps,
    engines: &[Engine],
) -> GttResult<()>
where
    P: TableMapper + RegisterIo,
{
    let Some(mode) = caps.ppgtt else {
        return Ok(());
    };

    let first = ppgtt.first_directory_slot();
    let count = ppgtt.directory_len();
    binder::check_range(global, first, count)?;

    let pages = ppgtt.pages();
    binder::write_range(&*platform, global, first, count, |k| {
        DirectoryEntry::for_table(pages[k]).into_bits()
    });
    // Posting read: the directory must be in memory before the engines see it.
    binder::read(&*platform, global, first)?;
    debug!("PPGTT: {count} directory entries written at slot {first}");

    let base = PpDirBase::from_directory_offset(ppgtt.directory_offset());

    match mode {
        PpgttMode::Chipset => {
            GacEcoBits::modify(platform, |r| r.with_ppgtt_cache(PPGTT_CACHE_64B));
            GabCtl::modify(platform, |r| r.with_cont_after_pagefault(true));
            GamEcoChk::modify(platform, |r| {
                r.with_snb_bit(true).with_ppgtt_cache(PPGTT_CACHE_64B)
            });
            GfxMode::enable_ppgtt().store(platform);
        }
        PpgttMode::PerEngine => {
            GamEcoChk::new().with_ppgtt_cache(PPGTT_CACHE_64B).store(platform);
        }
    }

    for &engine in engines {
        if mode == PpgttMode::PerEngine {
            RingMode::enable_ppgtt().store_ring(platform, engine);
        }
        PpDirDclv::two_gigabytes().store_ring(platform, engine);
        base.store_ring(platform, engine);
    }

    info!(
        "PPGTT: enabled on {} engine(s), directory base {:#x}",
        engines.len(),
        base.into_bits()
    );
    Ok(())
}
