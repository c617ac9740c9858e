//! # Platform Collaborators
//!
//! Everything this subsystem needs from the rest of the driver, expressed as
//! traits so the device handle can be driven by real hardware or by a
//! simulation. [`Platform`] bundles them.

use crate::window::TableMapper;
use kernel_gpu_addresses::{GttAddress, PhysicalAddress, PhysicalPage};
use kernel_gpu_registers::RegisterIo;

/// Source of physical pages for page tables.
///
/// Returned pages **must** be 4 KiB aligned and zero filled.
pub trait TablePageProvider {
    /// Allocate one page. `None` on out-of-memory.
    fn alloc_page(&mut self) -> Option<PhysicalPage>;

    /// Return a page obtained from [`alloc_page`](Self::alloc_page).
    fn free_page(&mut self, page: PhysicalPage);

    /// Pin the page against relocation and paging.
    fn wire(&mut self, page: PhysicalPage);

    /// Undo [`wire`](Self::wire).
    fn unwire(&mut self, page: PhysicalPage);
}

/// Allocator state for the GPU address range handed out to objects.
pub trait SpaceAllocator {
    /// Make `[start, start + size)` available for object placement.
    fn reserve(&mut self, start: GttAddress, size: u64);
}

/// CPU memory attribute for a registered fictitious range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryAttribute {
    WriteBack,
    WriteCombining,
    Uncacheable,
}

/// Registers device memory as CPU-mappable ("fictitious") pages.
pub trait FictitiousMemory {
    /// Register `[start, end)` with the given attribute.
    ///
    /// # Errors
    /// Returns the platform's error number on failure.
    fn register_range(
        &mut self,
        start: PhysicalAddress,
        end: PhysicalAddress,
        attr: MemoryAttribute,
    ) -> Result<(), i32>;
}

/// GPU and chipset synchronisation.
pub trait GpuSync {
    /// Wait for outstanding GPU work. Returns `false` if the GPU did not idle.
    fn request_idle(&mut self) -> bool;

    /// Flush chipset write buffers so prior table writes reach memory.
    fn chipset_flush(&mut self);

    /// Busy-wait for `us` microseconds.
    fn delay_us(&mut self, us: u32);
}

/// CPU cache maintenance for object backing pages.
pub trait CpuCache {
    /// Write back and invalidate CPU cache lines covering `pages`.
    fn flush_pages(&mut self, pages: &[PhysicalPage]);
}

/// All collaborators of a [`GpuDevice`](crate::GpuDevice).
pub trait Platform:
    TablePageProvider + TableMapper + RegisterIo + SpaceAllocator + FictitiousMemory + GpuSync + CpuCache
{
}

impl<T> Platform for T where
    T: TablePageProvider
        + TableMapper
        + RegisterIo
        + SpaceAllocator
        + FictitiousMemory
        + GpuSync
        + CpuCache
{
}
