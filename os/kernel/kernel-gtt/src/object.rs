use crate::entry::CacheLevel;
use alloc::vec::Vec;
use kernel_gpu_addresses::{GttAddress, GttSlot, PhysicalPage};

/// Binding state of one GPU buffer object.
///
/// The record itself belongs to the buffer-object manager; this subsystem
/// reads the placement and page list and maintains the two binding flags.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ObjectBinding {
    /// Page-aligned offset in the aperture.
    pub placement: GttAddress,
    /// Size in bytes.
    pub size: u64,
    /// Backing pages, in aperture order.
    pub pages: Vec<PhysicalPage>,
    /// Cache level the object was last bound with.
    pub cache_level: CacheLevel,
    pub bound_global: bool,
    pub bound_ppgtt: bool,
}

impl ObjectBinding {
    #[must_use]
    pub const fn new(placement: GttAddress, size: u64, pages: Vec<PhysicalPage>, cache_level: CacheLevel) -> Self {
        Self {
            placement,
            size,
            pages,
            cache_level,
            bound_global: false,
            bound_ppgtt: false,
        }
    }

    /// First slot the object occupies.
    #[inline]
    #[must_use]
    pub const fn first_slot(&self) -> GttSlot {
        self.placement.slot()
    }

    /// Number of slots the object occupies. A trailing partial page takes a
    /// whole slot.
    #[inline]
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        GttSlot::count_for(self.size)
    }

    /// Whether the object is bound anywhere.
    #[inline]
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.bound_global || self.bound_ppgtt
    }
}
