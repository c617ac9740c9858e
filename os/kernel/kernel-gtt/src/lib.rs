//! # GPU Graphics Translation Tables
//!
//! Maintains the tables through which the GPU translates aperture addresses
//! to physical memory, binds buffer objects into them, and programs the
//! hardware to find them.
//!
//! ## Tables
//!
//! | Table | Slots | Backing |
//! |-------|-------|---------|
//! | Global table | one per 4 KiB of aperture, up to [`GLOBAL_ENTRIES`](layout::GLOBAL_ENTRIES) | pages supplied by the platform |
//! | Aliasing PPGTT | [`PPGTT_ENTRIES`](layout::PPGTT_ENTRIES) | [`PPGTT_DIRECTORY_ENTRIES`](layout::PPGTT_DIRECTORY_ENTRIES) wired pages |
//!
//! Every slot either maps an object page or holds the entry of the
//! [`ScratchPage`]; a zero word is never left in a range the GPU may use.
//!
//! ```text
//!   ObjectBinding { placement, size, pages }
//!         │
//!         ▼  first = placement / 4 KiB, count = size / 4 KiB
//!   ┌───────────── binder ─────────────┐
//!   │ slot range split per table page  │
//!   │   TableWindow(page n)   write    │
//!   │   TableWindow(page n+1) write    │
//!   └──────────────────────────────────┘
//!         │
//!         ▼
//!   GttEntry = addr[31:12] | addr[39:32] << 4 | cache << 1 | valid
//! ```
//!
//! ## Entry points
//!
//! All operations hang off [`GpuDevice`], which owns the [`Platform`]
//! (page provider, table mapper, register transport, space allocator,
//! fictitious memory, GPU sync, CPU cache maintenance) plus the table state.
//!
//! - [`GpuDevice::init_global_table`] / [`GpuDevice::restore_mappings`]
//! - [`GpuDevice::init_per_process_table`] / [`GpuDevice::cleanup_per_process_table`]
//! - [`GpuDevice::bind_object`] / [`GpuDevice::unbind_object`] and the
//!   `ppgtt_` variants
//! - [`GpuDevice::program_hardware`]
//! - [`GpuDevice::prepare_object`] / [`GpuDevice::finish_object`]

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod binder;
mod device;
pub mod entry;
mod error;
pub mod generation;
pub mod global;
pub mod hw;
pub mod idle;
pub mod layout;
mod object;
pub mod platform;
pub mod ppgtt;
pub mod scratch;
pub mod window;

#[cfg(test)]
mod testing;

pub use crate::device::{DeviceInfo, GpuDevice};
pub use crate::entry::{CacheLevel, DirectoryEntry, GttEntry};
pub use crate::error::{GttError, GttResult};
pub use crate::generation::{Generation, HardwareCaps, PpgttMode};
pub use crate::global::{GlobalTable, GttSpace};
pub use crate::idle::IdleState;
pub use crate::object::ObjectBinding;
pub use crate::platform::Platform;
pub use crate::ppgtt::Ppgtt;
pub use crate::scratch::ScratchPage;
pub use crate::window::{TableMapper, TablePage, TableWindow};
pub use kernel_gpu_addresses::{GttAddress, GttSlot, PhysicalAddress, PhysicalPage};
pub use kernel_gpu_registers::Engine;
