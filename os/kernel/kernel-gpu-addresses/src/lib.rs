//! # GPU Memory Address Types
//!
//! Strongly typed wrappers for the two address kinds the GPU translation
//! tables deal with:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] / [`PhysicalPage`] | Bus/physical memory backing a GPU object or a page-table page. |
//! | [`GttAddress`] / [`GttSlot`] | Offset inside the GPU-visible aperture, and the translation slot that covers it. |
//!
//! The translation tables only ever operate on 4 KiB pages, so unlike
//! CPU paging there is no page-size parameter: a [`PhysicalPage`] is always
//! 4 KiB aligned and a [`GttSlot`] always covers [`PAGE_SIZE`] bytes.
//!
//! ```text
//!   GttAddress 0x0000_2345
//!        │
//!        ├── slot   = addr >> 12      → GttSlot(2)
//!        └── offset = addr & 0xfff    → 0x345
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod gtt_address;
mod physical_address;
mod physical_page;

pub use gtt_address::{GttAddress, GttSlot};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;

/// Size of a translated page in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

const _: () = assert!(1 << PAGE_SHIFT == PAGE_SIZE);
