//! Simulated platform for unit tests.
//!
//! Physical memory is a map from frame number to a heap-allocated,
//! 4 KiB-aligned [`TablePage`]. Only pages handed out by the simulated
//! provider can be mapped; object backing pages are just addresses.

#![allow(clippy::cast_possible_truncation)]

use crate::device::{DeviceInfo, GpuDevice};
use crate::entry::CacheLevel;
use crate::generation::Generation;
use crate::global::GlobalTable;
use crate::layout::{GLOBAL_TABLE_PAGES, PAGE_SIZE};
use crate::object::ObjectBinding;
use crate::platform::{CpuCache, FictitiousMemory, GpuSync, MemoryAttribute, SpaceAllocator, TablePageProvider};
use crate::window::{TableMapper, TablePage};
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;
use kernel_gpu_addresses::{GttAddress, PhysicalAddress, PhysicalPage};
use kernel_gpu_registers::{Engine, RegisterIo};
use std::collections::{BTreeMap, BTreeSet};

/// Scratch page used by simulated devices. Never backed by a frame.
pub const SCRATCH_PAGE: PhysicalPage = PhysicalPage::from_addr(PhysicalAddress::new(0x0F00_0000));

/// CPU physical address of aperture offset zero on simulated devices.
pub const APERTURE_BASE: PhysicalAddress = PhysicalAddress::new(0xC000_0000);

/// First frame handed out by the simulated page provider (2 GiB).
const FIRST_FRAME: u64 = 0x8_0000;

pub struct SimPlatform {
    frames: RefCell<BTreeMap<u64, Box<TablePage>>>,
    next_frame: u64,
    allocs_until_failure: Option<usize>,
    wired: BTreeSet<u64>,
    freed: usize,

    pinned: Cell<usize>,
    open_windows: Cell<usize>,
    windows_opened: Cell<usize>,
    max_open_windows: Cell<usize>,

    registers: BTreeMap<u32, u32>,
    register_writes: Vec<(u32, u32)>,

    reservations: Vec<(GttAddress, u64)>,
    fictitious: Vec<(PhysicalAddress, PhysicalAddress, MemoryAttribute)>,
    fictitious_error: Option<i32>,

    idle_ok: bool,
    idle_requests: usize,
    delays: Vec<u32>,
    chipset_flushes: usize,
    flushed: Vec<PhysicalPage>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            frames: RefCell::new(BTreeMap::new()),
            next_frame: FIRST_FRAME,
            allocs_until_failure: None,
            wired: BTreeSet::new(),
            freed: 0,
            pinned: Cell::new(0),
            open_windows: Cell::new(0),
            windows_opened: Cell::new(0),
            max_open_windows: Cell::new(0),
            registers: BTreeMap::new(),
            register_writes: Vec::new(),
            reservations: Vec::new(),
            fictitious: Vec::new(),
            fictitious_error: None,
            idle_ok: true,
            idle_requests: 0,
            delays: Vec::new(),
            chipset_flushes: 0,
            flushed: Vec::new(),
        }
    }

    /// Make the `k`-th allocation from now on fail (0 = the next one).
    pub fn fail_alloc_at(&mut self, k: usize) {
        self.allocs_until_failure = Some(k);
    }

    pub fn fail_fictitious(&mut self, errno: i32) {
        self.fictitious_error = Some(errno);
    }

    pub fn set_idle_ok(&mut self, ok: bool) {
        self.idle_ok = ok;
    }

    pub fn set_register(&mut self, offset: u32, value: u32) {
        self.registers.insert(offset, value);
    }

    /// A full-size global table backed by freshly allocated pages.
    pub fn global_table(&mut self) -> GlobalTable {
        GlobalTable::new(
            (0..GLOBAL_TABLE_PAGES)
                .map(|_| self.alloc_page().expect("global table page"))
                .collect(),
        )
    }

    pub fn live_pages(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn wired_pages(&self) -> usize {
        self.wired.len()
    }

    pub fn freed_pages(&self) -> usize {
        self.freed
    }

    pub fn pinned(&self) -> usize {
        self.pinned.get()
    }

    pub fn open_windows(&self) -> usize {
        self.open_windows.get()
    }

    pub fn windows_opened(&self) -> usize {
        self.windows_opened.get()
    }

    pub fn max_open_windows(&self) -> usize {
        self.max_open_windows.get()
    }

    /// Raw word `i` of a provider page, read without opening a window.
    pub fn peek(&self, page: PhysicalPage, i: usize) -> u32 {
        self.frames.borrow()[&page.frame_number()].get(i)
    }

    pub fn page_words(&self, page: PhysicalPage) -> Vec<u32> {
        self.frames.borrow()[&page.frame_number()].words().to_vec()
    }

    pub fn register(&self, offset: u32) -> u32 {
        self.read_register(offset)
    }

    pub fn register_writes(&self) -> &[(u32, u32)] {
        &self.register_writes
    }

    pub fn reservations(&self) -> &[(GttAddress, u64)] {
        &self.reservations
    }

    pub fn fictitious_ranges(&self) -> &[(PhysicalAddress, PhysicalAddress, MemoryAttribute)] {
        &self.fictitious
    }

    pub fn idle_requests(&self) -> usize {
        self.idle_requests
    }

    pub fn delays(&self) -> &[u32] {
        &self.delays
    }

    pub fn chipset_flushes(&self) -> usize {
        self.chipset_flushes
    }

    pub fn flushed_pages(&self) -> &[PhysicalPage] {
        &self.flushed
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TablePageProvider for SimPlatform {
    fn alloc_page(&mut self) -> Option<PhysicalPage> {
        match self.allocs_until_failure {
            Some(0) => {
                self.allocs_until_failure = None;
                return None;
            }
            Some(n) => self.allocs_until_failure = Some(n - 1),
            None => {}
        }

        let pfn = self.next_frame;
        self.next_frame += 1;
        self.frames.borrow_mut().insert(pfn, Box::new(TablePage::zeroed()));
        Some(PhysicalPage::from_frame_number(pfn))
    }

    fn free_page(&mut self, page: PhysicalPage) {
        assert!(!self.wired.contains(&page.frame_number()), "freeing wired {page}");
        let removed = self.frames.borrow_mut().remove(&page.frame_number());
        assert!(removed.is_some(), "double free of {page}");
        self.freed += 1;
    }

    fn wire(&mut self, page: PhysicalPage) {
        assert!(self.wired.insert(page.frame_number()), "{page} wired twice");
    }

    fn unwire(&mut self, page: PhysicalPage) {
        assert!(self.wired.remove(&page.frame_number()), "{page} not wired");
    }
}

impl TableMapper for SimPlatform {
    fn pin_cpu(&self) {
        self.pinned.set(self.pinned.get() + 1);
    }

    fn unpin_cpu(&self) {
        assert!(self.pinned.get() > 0, "unbalanced unpin");
        self.pinned.set(self.pinned.get() - 1);
    }

    unsafe fn map_table(&self, page: PhysicalPage) -> NonNull<TablePage> {
        assert!(self.pinned.get() > 0, "mapping {page} while not pinned");
        let mut frames = self.frames.borrow_mut();
        let frame = frames.get_mut(&page.frame_number()).expect("mapping unknown page");

        self.open_windows.set(self.open_windows.get() + 1);
        self.windows_opened.set(self.windows_opened.get() + 1);
        self.max_open_windows
            .set(self.max_open_windows.get().max(self.open_windows.get()));

        NonNull::from(&mut **frame)
    }

    unsafe fn unmap_table(&self, page: PhysicalPage, table: NonNull<TablePage>) {
        let frames = self.frames.borrow();
        let frame = &frames[&page.frame_number()];
        assert_eq!(NonNull::from(&**frame), table, "unmapping foreign pointer");
        self.open_windows.set(self.open_windows.get() - 1);
    }
}

impl RegisterIo for SimPlatform {
    fn read_register(&self, offset: u32) -> u32 {
        self.registers.get(&offset).copied().unwrap_or(0)
    }

    fn write_register(&mut self, offset: u32, value: u32) {
        self.registers.insert(offset, value);
        self.register_writes.push((offset, value));
    }
}

impl SpaceAllocator for SimPlatform {
    fn reserve(&mut self, start: GttAddress, size: u64) {
        self.reservations.push((start, size));
    }
}

impl FictitiousMemory for SimPlatform {
    fn register_range(
        &mut self,
        start: PhysicalAddress,
        end: PhysicalAddress,
        attr: MemoryAttribute,
    ) -> Result<(), i32> {
        if let Some(errno) = self.fictitious_error {
            return Err(errno);
        }
        self.fictitious.push((start, end, attr));
        Ok(())
    }
}

impl GpuSync for SimPlatform {
    fn request_idle(&mut self) -> bool {
        self.idle_requests += 1;
        self.idle_ok
    }

    fn chipset_flush(&mut self) {
        self.chipset_flushes += 1;
    }

    fn delay_us(&mut self, us: u32) {
        self.delays.push(us);
    }
}

impl CpuCache for SimPlatform {
    fn flush_pages(&mut self, pages: &[PhysicalPage]) {
        self.flushed.extend_from_slice(pages);
    }
}

/// `n` consecutive pages starting at physical address `base`.
pub fn backing_pages(base: u64, n: usize) -> Vec<PhysicalPage> {
    (0..n as u64)
        .map(|i| PhysicalPage::from_addr(PhysicalAddress::new(base + i * PAGE_SIZE)))
        .collect()
}

/// An unbound object at `placement` with contiguous backing starting at `backing`.
pub fn object(placement: u64, size: u64, backing: u64) -> ObjectBinding {
    let pages = backing_pages(backing, size.div_ceil(PAGE_SIZE) as usize);
    ObjectBinding::new(GttAddress::new(placement), size, pages, CacheLevel::None)
}

/// A device with a full global table, every engine, and idling enabled.
pub fn sim_device(generation: Generation) -> GpuDevice<SimPlatform> {
    let mut sim = SimPlatform::new();
    let global = sim.global_table();
    let info = DeviceInfo {
        generation,
        engines: Engine::ALL.to_vec(),
        aperture_base: APERTURE_BASE,
        idle_maps: true,
    };
    GpuDevice::new(sim, info, global, SCRATCH_PAGE)
}
