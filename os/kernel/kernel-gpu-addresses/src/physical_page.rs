use crate::{PAGE_SIZE, PhysicalAddress};
use core::fmt;

/// A 4 KiB physical page, identified by its page-aligned base.
///
/// Used for page-table pages, object backing pages and the scratch page.
///
/// ### Invariants
/// - The low 12 bits of the base are always zero.
///
/// ### Examples
/// ```rust
/// # use kernel_gpu_addresses::*;
/// let page = PhysicalPage::from_addr(PhysicalAddress::new(0x5555_0000));
/// assert_eq!(page.base().as_u64(), 0x5555_0000);
/// assert_eq!(page.frame_number(), 0x55550);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage(PhysicalAddress);

impl PhysicalPage {
    /// Page at a page-aligned address.
    ///
    /// ### Debug assertions
    /// - Asserts the address is 4 KiB aligned.
    #[inline]
    #[must_use]
    pub const fn from_addr(pa: PhysicalAddress) -> Self {
        debug_assert!(pa.is_page_aligned(), "physical page base not 4K aligned");
        Self(pa)
    }

    /// The page containing `pa` (low bits dropped).
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(PhysicalAddress::new(pa.as_u64() & !(PAGE_SIZE - 1)))
    }

    /// Page with the given frame number (`base >> 12`).
    #[inline]
    #[must_use]
    pub const fn from_frame_number(pfn: u64) -> Self {
        Self(PhysicalAddress::new(pfn << crate::PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn frame_number(self) -> u64 {
        self.0.as_u64() >> crate::PAGE_SHIFT
    }
}

impl fmt::Debug for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage({:#012X})", self.0.as_u64())
    }
}

impl fmt::Display for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<PhysicalPage> for PhysicalAddress {
    #[inline]
    fn from(p: PhysicalPage) -> Self {
        p.base()
    }
}
