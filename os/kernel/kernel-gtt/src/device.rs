use crate::binder::{self, TableDirectory};
use crate::entry::{CacheLevel, GttEntry};
use crate::error::{GttError, GttResult};
use crate::generation::{Generation, HardwareCaps};
use crate::global::{GlobalTable, GttSpace};
use crate::hw;
use crate::idle::IdleState;
use crate::object::ObjectBinding;
use crate::platform::{MemoryAttribute, Platform};
use crate::ppgtt::Ppgtt;
use crate::scratch::ScratchPage;
use alloc::vec::Vec;
use kernel_gpu_addresses::{GttAddress, GttSlot, PhysicalAddress, PhysicalPage};
use kernel_gpu_registers::Engine;
use log::{debug, info, warn};

/// Static description of a device.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub generation: Generation,
    /// Command-ring engines that are brought up.
    pub engines: Vec<Engine>,
    /// Physical address of aperture offset zero, as seen by the CPU.
    pub aperture_base: PhysicalAddress,
    /// Table edits require an idle GPU.
    pub idle_maps: bool,
}

/// Translation-table state of one GPU.
///
/// Everything the hardware reads through its translation tables is
/// reachable from here; all mutation goes through `&mut self`, so the
/// caller's device lock is the only lock.
pub struct GpuDevice<P: Platform> {
    platform: P,
    info: DeviceInfo,
    caps: HardwareCaps,
    global: GlobalTable,
    scratch: ScratchPage,
    space: Option<GttSpace>,
    aliasing_ppgtt: Option<Ppgtt>,
    idle: IdleState,
}

impl<P: Platform> GpuDevice<P> {
    /// Build a device handle over `global`, with `scratch_page` backing every
    /// unused slot.
    #[must_use]
    pub fn new(platform: P, info: DeviceInfo, global: GlobalTable, scratch_page: PhysicalPage) -> Self {
        let caps = info.generation.caps();
        let idle = IdleState::new(info.idle_maps);
        Self {
            platform,
            scratch: ScratchPage::new(&caps, scratch_page),
            info,
            caps,
            global,
            space: None,
            aliasing_ppgtt: None,
            idle,
        }
    }

    #[inline]
    #[must_use]
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    #[inline]
    pub const fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    #[inline]
    #[must_use]
    pub const fn info(&self) -> &DeviceInfo {
        &self.info
    }

    #[inline]
    #[must_use]
    pub const fn caps(&self) -> &HardwareCaps {
        &self.caps
    }

    #[inline]
    #[must_use]
    pub const fn scratch(&self) -> &ScratchPage {
        &self.scratch
    }

    #[inline]
    #[must_use]
    pub const fn global_table(&self) -> &GlobalTable {
        &self.global
    }

    /// Aperture boundaries, once the global table is initialized.
    #[inline]
    #[must_use]
    pub const fn space(&self) -> Option<&GttSpace> {
        self.space.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn aliasing_ppgtt(&self) -> Option<&Ppgtt> {
        self.aliasing_ppgtt.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn idle_state(&self) -> &IdleState {
        &self.idle
    }

    /// Take over `[start, end)` of the aperture. Runs once per device.
    ///
    /// On hardware with per-process translation, `end` is lowered to
    /// [`HardwareCaps::usable_aperture_end`] so the PPGTT directory slots
    /// stay out of the managed range. Everything but the guard page below
    /// `end` goes to the space allocator, every slot of the range is pointed
    /// at scratch, and `[start, mappable_end)` is registered as
    /// write-combining fictitious memory.
    ///
    /// # Errors
    /// - [`GttError::AlreadyInitialized`] on a second call. Nothing is
    ///   changed.
    /// - [`GttError::InvalidRange`] for inconsistent boundaries. Nothing is
    ///   changed.
    /// - [`GttError::SlotRangeOutOfBounds`] if the global table is shorter
    ///   than `end`. Nothing is changed.
    /// - [`GttError::RangeReservationFailed`] if the fictitious range cannot
    ///   be registered. The space reservation is left to the caller to undo.
    pub fn init_global_table(
        &mut self,
        start: GttAddress,
        mappable_end: GttAddress,
        end: GttAddress,
    ) -> GttResult<()> {
        if self.space.is_some() {
            return Err(GttError::AlreadyInitialized);
        }

        let usable_end = GttAddress::new(self.caps.usable_aperture_end());
        let end = if end > usable_end {
            info!("GTT: end {end} lowered to {usable_end}, above is the PPGTT directory");
            usable_end
        } else {
            end
        };

        let space = GttSpace::new(start, mappable_end, end)?;
        let (first, count) = space.slots();
        binder::check_range(&self.global, first, count)?;

        self.platform.reserve(space.start(), space.reserved_size());
        self.space = Some(space);

        binder::clear(&self.platform, &self.global, first, count, self.scratch.global_entry())?;

        let fictitious_start = self.info.aperture_base + space.start().as_u64();
        let fictitious_end = fictitious_start + space.mappable_total();
        info!(
            "taking over the fictitious range {:#x}-{:#x}",
            fictitious_start.as_u64(),
            fictitious_end.as_u64()
        );

        self.platform
            .register_range(fictitious_start, fictitious_end, MemoryAttribute::WriteCombining)
            .map_err(GttError::RangeReservationFailed)
    }

    /// Create the aliasing PPGTT. Does nothing if one already exists.
    ///
    /// On failure the partially built table is fully released and the device
    /// carries on without per-process translation.
    ///
    /// # Errors
    /// - [`GttError::PerProcessUnsupported`] on hardware without PPGTT.
    /// - [`GttError::OutOfMemory`] if a page-table page cannot be allocated.
    pub fn init_per_process_table(&mut self) -> GttResult<()> {
        if self.caps.ppgtt.is_none() {
            return Err(GttError::PerProcessUnsupported);
        }
        if self.aliasing_ppgtt.is_some() {
            return Ok(());
        }

        match Ppgtt::create(&mut self.platform, &self.scratch) {
            Ok(ppgtt) => {
                info!(
                    "aliasing PPGTT ready: {} directory pages",
                    ppgtt.directory_len()
                );
                self.aliasing_ppgtt = Some(ppgtt);
                Ok(())
            }
            Err(e) => {
                warn!("{e}; disabling per-process translation");
                Err(e)
            }
        }
    }

    /// Release the aliasing PPGTT, if any.
    pub fn cleanup_per_process_table(&mut self) {
        if let Some(ppgtt) = self.aliasing_ppgtt.take() {
            ppgtt.destroy(&mut self.platform);
            info!("aliasing PPGTT released");
        }
    }

    /// Map `obj` into the global table at its placement.
    ///
    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`] (also for objects reaching the
    /// PPGTT directory slots), [`GttError::PageListTooShort`] or
    /// [`GttError::AddressTooWide`]; the table is left untouched.
    pub fn bind_object(&mut self, obj: &mut ObjectBinding, level: CacheLevel) -> GttResult<()> {
        self.check_usable(obj)?;
        binder::bind_object(&self.platform, &self.global, &self.caps, obj, level)?;
        obj.cache_level = level;
        obj.bound_global = true;
        debug!("GTT: bound {}+{} {level:?}", obj.first_slot(), obj.slot_count());
        Ok(())
    }

    /// Point `obj`'s global slots back at scratch.
    ///
    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`]; the table is left untouched.
    pub fn unbind_object(&mut self, obj: &mut ObjectBinding) -> GttResult<()> {
        self.check_usable(obj)?;
        binder::unbind_object(&self.platform, &self.global, obj, self.scratch.global_entry())?;
        obj.bound_global = false;
        debug!("GTT: unbound {}+{}", obj.first_slot(), obj.slot_count());
        Ok(())
    }

    /// Map `obj` into the aliasing PPGTT. Does nothing without one.
    ///
    /// # Errors
    /// Same as [`bind_object`](Self::bind_object).
    pub fn ppgtt_bind_object(&mut self, obj: &mut ObjectBinding, level: CacheLevel) -> GttResult<()> {
        let Some(ppgtt) = &self.aliasing_ppgtt else {
            debug!("PPGTT: no table, not binding {}", obj.first_slot());
            return Ok(());
        };
        ppgtt.bind_object(&self.platform, &self.caps, obj, level)?;
        obj.cache_level = level;
        obj.bound_ppgtt = true;
        debug!("PPGTT: bound {}+{} {level:?}", obj.first_slot(), obj.slot_count());
        Ok(())
    }

    /// Point `obj`'s PPGTT slots back at scratch.
    ///
    /// # Errors
    /// Same as [`unbind_object`](Self::unbind_object).
    pub fn ppgtt_unbind_object(&mut self, obj: &mut ObjectBinding) -> GttResult<()> {
        if let Some(ppgtt) = &self.aliasing_ppgtt {
            ppgtt.unbind_object(&self.platform, obj)?;
            debug!("PPGTT: unbound {}+{}", obj.first_slot(), obj.slot_count());
        }
        obj.bound_ppgtt = false;
        Ok(())
    }

    /// Publish the aliasing PPGTT to the hardware. Does nothing without one.
    ///
    /// # Errors
    /// See [`hw::program_hardware`].
    pub fn program_hardware(&mut self) -> GttResult<()> {
        match &self.aliasing_ppgtt {
            Some(ppgtt) => hw::program_hardware(
                &mut self.platform,
                &self.global,
                ppgtt,
                &self.caps,
                &self.info.engines,
            ),
            None => Ok(()),
        }
    }

    /// Rebuild the global table after a GPU reset.
    ///
    /// The managed range is cleared, then every object in `objects` that is
    /// bound in the global table is flushed from the CPU caches and bound
    /// again, in order. A single chipset flush follows. The PPGTT directory
    /// slots lie outside the managed range and are left as they are.
    ///
    /// # Errors
    /// - [`GttError::SlotRangeOutOfBounds`] if an object reaches past the
    ///   usable aperture. Checked before the table is cleared.
    /// - Otherwise the first binding error. Objects after it are not rebound.
    pub fn restore_mappings<'a>(&mut self, objects: impl IntoIterator<Item = &'a ObjectBinding>) -> GttResult<()> {
        let objects: Vec<&ObjectBinding> = objects.into_iter().filter(|o| o.bound_global).collect();
        for obj in &objects {
            self.check_usable(obj)?;
        }

        if let Some(space) = self.space {
            let (first, count) = space.slots();
            binder::clear(&self.platform, &self.global, first, count, self.scratch.global_entry())?;
        }

        for obj in &objects {
            self.platform.flush_pages(&obj.pages);
            binder::bind_object(&self.platform, &self.global, &self.caps, obj, obj.cache_level)?;
        }

        self.platform.chipset_flush();
        debug!("GTT: restored {} object(s)", objects.len());
        Ok(())
    }

    /// Fail unless `obj` stays below the PPGTT directory slots.
    fn check_usable(&self, obj: &ObjectBinding) -> GttResult<()> {
        binder::check_slots(obj.first_slot(), obj.slot_count(), self.caps.usable_slot_limit())
    }

    /// Hook run before an object's pages are bound.
    ///
    /// # Errors
    /// None at present.
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    pub const fn prepare_object(&self, _obj: &ObjectBinding) -> GttResult<()> {
        Ok(())
    }

    /// Tear down every binding `obj` still holds, inside an idle section.
    ///
    /// # Errors
    /// The first unbind error.
    pub fn finish_object(&mut self, obj: &mut ObjectBinding) -> GttResult<()> {
        self.idle_section(|dev| {
            if obj.bound_global {
                dev.unbind_object(obj)?;
            }
            if obj.bound_ppgtt {
                dev.ppgtt_unbind_object(obj)?;
            }
            Ok(())
        })
    }

    /// Enter an idle section. Pass the result to
    /// [`end_idle_section`](Self::end_idle_section).
    pub fn begin_idle_section(&mut self) -> bool {
        self.idle.begin(&mut self.platform)
    }

    pub const fn end_idle_section(&mut self, prior: bool) {
        self.idle.end(prior);
    }

    /// Run `f` inside an idle section.
    pub fn idle_section<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let prior = self.begin_idle_section();
        let result = f(self);
        self.end_idle_section(prior);
        result
    }

    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`] if `slot` is outside the table.
    pub fn read_global_entry(&self, slot: GttSlot) -> GttResult<GttEntry> {
        self.global.read_entry(&self.platform, slot)
    }

    /// `None` without an aliasing PPGTT.
    ///
    /// # Errors
    /// [`GttError::SlotRangeOutOfBounds`] if `slot` is outside the table.
    pub fn read_ppgtt_entry(&self, slot: GttSlot) -> GttResult<Option<GttEntry>> {
        self.aliasing_ppgtt
            .as_ref()
            .map(|p| p.read_entry(&self.platform, slot))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{DirectoryEntry, decode};
    use crate::layout::{PAGE_SIZE, PPGTT_DIRECTORY_APERTURE_START, PPGTT_FIRST_DIRECTORY_SLOT};
    use crate::testing::{APERTURE_BASE, SimPlatform, object, sim_device};
    use kernel_gpu_registers::{GfxMode, MmioRegister, RingMode, RingRegister};

    fn init(dev: &mut GpuDevice<SimPlatform>) {
        dev.init_global_table(GttAddress::new(0), GttAddress::new(0x1000_0000), GttAddress::new(0x2000_0000))
            .unwrap();
    }

    fn global_words(dev: &GpuDevice<SimPlatform>) -> Vec<u32> {
        dev.global_table()
            .pages()
            .iter()
            .flat_map(|p| dev.platform().page_words(*p))
            .collect()
    }

    #[test]
    fn global_init_scenario() {
        let mut dev = sim_device(Generation::Gen6);
        init(&mut dev);

        let space = dev.space().unwrap();
        assert_eq!(space.mappable_total(), 0x1000_0000);
        assert_eq!(space.total(), 0x2000_0000);
        assert_eq!(
            dev.platform().reservations(),
            &[(GttAddress::new(0), 0x2000_0000 - PAGE_SIZE)]
        );

        let scratch = dev.scratch().global_entry().into_bits();
        let words = global_words(&dev);
        assert!(words[..0x2_0000].iter().all(|w| *w == scratch));
        assert!(words[0x2_0000..].iter().all(|w| *w == 0));

        assert_eq!(
            dev.platform().fictitious_ranges(),
            &[(
                APERTURE_BASE,
                APERTURE_BASE + 0x1000_0000,
                MemoryAttribute::WriteCombining
            )]
        );
    }

    #[test]
    fn global_init_rejects_inverted_range_untouched() {
        let mut dev = sim_device(Generation::Gen6);
        let err = dev
            .init_global_table(GttAddress::new(0x2000), GttAddress::new(0x1000), GttAddress::new(0x4000))
            .unwrap_err();
        assert!(matches!(err, GttError::InvalidRange { .. }));
        assert!(dev.space().is_none());
        assert!(dev.platform().reservations().is_empty());
        assert!(global_words(&dev).iter().all(|w| *w == 0));
    }

    #[test]
    fn global_init_reports_fictitious_failure() {
        let mut dev = sim_device(Generation::Gen6);
        dev.platform_mut().fail_fictitious(12);
        let err = dev
            .init_global_table(GttAddress::new(0), GttAddress::new(0x1_0000), GttAddress::new(0x2_0000))
            .unwrap_err();
        assert!(matches!(err, GttError::RangeReservationFailed(12)));
        assert_eq!(dev.platform().reservations().len(), 1);
    }

    #[test]
    fn bind_writes_llc_entries_at_placement() {
        let mut dev = sim_device(Generation::Gen6);
        init(&mut dev);
        let mut obj = object(0x2000, 0x3000, 0x4000_0000);

        dev.bind_object(&mut obj, CacheLevel::Llc).unwrap();
        assert!(obj.bound_global);

        let scratch = dev.scratch().global_entry();
        assert_eq!(dev.read_global_entry(GttSlot::new(1)).unwrap(), scratch);
        assert_eq!(dev.read_global_entry(GttSlot::new(5)).unwrap(), scratch);
        for (k, slot) in (2..=4).enumerate() {
            let e = dev.read_global_entry(GttSlot::new(slot)).unwrap();
            let (pa, level) = decode(dev.caps(), e).unwrap();
            assert_eq!(pa, obj.pages[k].base());
            assert_eq!(level, Some(CacheLevel::Llc));
        }
    }

    #[test]
    fn bind_then_unbind_restores_scratch() {
        let mut dev = sim_device(Generation::Gen7);
        init(&mut dev);
        let before = global_words(&dev);

        let mut obj = object(0x3F_E000, 0x5000, 0x4000_0000);
        dev.bind_object(&mut obj, CacheLevel::LlcMlc).unwrap();
        assert_ne!(global_words(&dev), before);

        dev.unbind_object(&mut obj).unwrap();
        assert!(!obj.bound_global);
        assert_eq!(global_words(&dev), before);
    }

    #[test]
    fn rejected_bind_leaves_table_untouched() {
        let mut dev = sim_device(Generation::Gen6);
        init(&mut dev);
        let before = global_words(&dev);

        let mut short = object(0x1000, 0x3000, 0x4000_0000);
        short.pages.truncate(2);
        assert!(matches!(
            dev.bind_object(&mut short, CacheLevel::Llc),
            Err(GttError::PageListTooShort { needed: 3, available: 2 })
        ));

        let mut past_end = object(0x7FFF_F000, 0x2000, 0x4000_0000);
        assert!(matches!(
            dev.bind_object(&mut past_end, CacheLevel::Llc),
            Err(GttError::SlotRangeOutOfBounds { .. })
        ));

        assert!(!short.bound_global && !past_end.bound_global);
        assert_eq!(global_words(&dev), before);
    }

    #[test]
    fn restore_reproduces_sequential_binds() {
        let mut objects = vec![
            object(0x0000, 0x2000, 0x4000_0000),
            object(0x3FF000, 0x3000, 0x5000_0000),
            object(0x1000, 0x1000, 0x6000_0000),
            object(0x80_0000, 0x1000, 0x7000_0000),
        ];
        let levels = [CacheLevel::Llc, CacheLevel::None, CacheLevel::LlcMlc, CacheLevel::Llc];

        let mut fresh = sim_device(Generation::Gen6);
        init(&mut fresh);
        for (obj, level) in objects.iter_mut().zip(levels).take(3) {
            fresh.bind_object(obj, level).unwrap();
        }
        let expected = global_words(&fresh);

        let mut dev = sim_device(Generation::Gen6);
        init(&mut dev);
        for (obj, level) in objects.iter_mut().zip(levels).take(3) {
            dev.bind_object(obj, level).unwrap();
        }
        // Garbage from a reset, plus an object that is no longer bound.
        let mut stale = objects[3].clone();
        dev.bind_object(&mut stale, CacheLevel::Llc).unwrap();
        let flushes = dev.platform().chipset_flushes();

        dev.restore_mappings(&objects).unwrap();

        assert_eq!(global_words(&dev), expected);
        assert_eq!(dev.platform().chipset_flushes(), flushes + 1);
        assert_eq!(dev.platform().flushed_pages().len(), 2 + 3 + 1);
    }

    fn directory_words(dev: &GpuDevice<SimPlatform>) -> Vec<u32> {
        let ppgtt = dev.aliasing_ppgtt().unwrap();
        (0..ppgtt.pages().len())
            .map(|i| {
                dev.read_global_entry(ppgtt.first_directory_slot() + i)
                    .unwrap()
                    .into_bits()
            })
            .collect()
    }

    #[test]
    fn directory_slots_stay_out_of_the_managed_range() {
        let mut dev = sim_device(Generation::Gen7);
        dev.init_global_table(GttAddress::new(0), GttAddress::new(0x1000_0000), GttAddress::new(0x8000_0000))
            .unwrap();

        let space = *dev.space().unwrap();
        assert_eq!(space.end().as_u64(), PPGTT_DIRECTORY_APERTURE_START);
        assert_eq!(
            dev.platform().reservations(),
            &[(GttAddress::new(0), PPGTT_DIRECTORY_APERTURE_START - PAGE_SIZE)]
        );

        dev.init_per_process_table().unwrap();
        dev.program_hardware().unwrap();
        let published = directory_words(&dev);
        let ppgtt = dev.aliasing_ppgtt().unwrap();
        for (raw, page) in published.iter().zip(ppgtt.pages()) {
            assert_eq!(DirectoryEntry::from_bits(*raw), DirectoryEntry::for_table(*page));
        }

        let mut on_directory = object(PPGTT_DIRECTORY_APERTURE_START, 0x1000, 0x4000_0000);
        assert!(matches!(
            dev.bind_object(&mut on_directory, CacheLevel::Llc),
            Err(GttError::SlotRangeOutOfBounds { limit: PPGTT_FIRST_DIRECTORY_SLOT, .. })
        ));
        let mut straddling = object(PPGTT_DIRECTORY_APERTURE_START - 0x1000, 0x2000, 0x4000_0000);
        assert!(dev.bind_object(&mut straddling, CacheLevel::Llc).is_err());
        assert!(!on_directory.bound_global && !straddling.bound_global);
        assert_eq!(directory_words(&dev), published);

        let mut last = object(PPGTT_DIRECTORY_APERTURE_START - 0x2000, 0x2000, 0x4000_0000);
        dev.bind_object(&mut last, CacheLevel::Llc).unwrap();
        assert_eq!(directory_words(&dev), published);

        dev.restore_mappings([&last]).unwrap();
        assert_eq!(directory_words(&dev), published);
        let e = dev.read_global_entry(last.first_slot() + 1).unwrap();
        assert_eq!(e.physical_address(), last.pages[1].base());

        // A stale record on the directory slots is refused before anything is cleared.
        on_directory.bound_global = true;
        assert!(dev.restore_mappings([&last, &on_directory]).is_err());
        assert_eq!(dev.read_global_entry(last.first_slot()).unwrap().physical_address(), last.pages[0].base());
        assert_eq!(directory_words(&dev), published);
    }

    #[test]
    fn full_aperture_is_usable_without_ppgtt() {
        let mut dev = sim_device(Generation::Gen5);
        dev.init_global_table(GttAddress::new(0), GttAddress::new(0x1000_0000), GttAddress::new(0x8000_0000))
            .unwrap();
        assert_eq!(dev.space().unwrap().end().as_u64(), 0x8000_0000);

        let mut top = object(0x7FFF_F000, 0x1000, 0x4000_0000);
        dev.bind_object(&mut top, CacheLevel::None).unwrap();
        assert!(top.bound_global);
    }

    #[test]
    fn global_init_runs_once() {
        let mut dev = sim_device(Generation::Gen6);
        init(&mut dev);

        assert!(matches!(
            dev.init_global_table(GttAddress::new(0), GttAddress::new(0x1000), GttAddress::new(0x2000)),
            Err(GttError::AlreadyInitialized)
        ));
        assert_eq!(dev.platform().reservations().len(), 1);
        assert_eq!(dev.platform().fictitious_ranges().len(), 1);
        assert_eq!(dev.space().unwrap().end().as_u64(), 0x2000_0000);
    }

    #[test]
    fn per_process_table_lifecycle() {
        let mut dev = sim_device(Generation::Gen7);
        init(&mut dev);
        let baseline = dev.platform().live_pages();

        dev.init_per_process_table().unwrap();
        assert!(dev.aliasing_ppgtt().is_some());
        dev.init_per_process_table().unwrap();
        assert_eq!(dev.platform().live_pages(), baseline + 512);

        dev.program_hardware().unwrap();
        for engine in dev.info().engines.clone() {
            assert_eq!(
                dev.platform().register(RingMode::offset_for(engine)),
                (1 << 25) | (1 << 9)
            );
        }
        assert_eq!(dev.platform().register(GfxMode::OFFSET), 0);

        dev.cleanup_per_process_table();
        dev.cleanup_per_process_table();
        assert!(dev.aliasing_ppgtt().is_none());
        assert_eq!(dev.platform().live_pages(), baseline);
        assert_eq!(dev.read_ppgtt_entry(GttSlot::new(0)).unwrap(), None);
    }

    #[test]
    fn per_process_table_unsupported_on_gen5() {
        let mut dev = sim_device(Generation::Gen5);
        assert!(matches!(
            dev.init_per_process_table(),
            Err(GttError::PerProcessUnsupported)
        ));
        dev.program_hardware().unwrap();
        assert!(dev.platform().register_writes().is_empty());
    }

    #[test]
    fn per_process_table_oom_leaves_device_without_ppgtt() {
        let mut dev = sim_device(Generation::Gen6);
        let baseline = dev.platform().live_pages();
        dev.platform_mut().fail_alloc_at(100);

        assert!(matches!(
            dev.init_per_process_table(),
            Err(GttError::OutOfMemory { index: 100 })
        ));
        assert!(dev.aliasing_ppgtt().is_none());
        assert_eq!(dev.platform().live_pages(), baseline);

        let mut obj = object(0, 0x1000, 0x4000_0000);
        dev.ppgtt_bind_object(&mut obj, CacheLevel::Llc).unwrap();
        assert!(!obj.bound_ppgtt);
    }

    #[test]
    fn finish_object_unbinds_everything_while_idle() {
        let mut dev = sim_device(Generation::Gen6);
        init(&mut dev);
        dev.init_per_process_table().unwrap();

        let mut obj = object(0x10_0000, 0x2000, 0x4000_0000);
        dev.prepare_object(&obj).unwrap();
        dev.bind_object(&mut obj, CacheLevel::Llc).unwrap();
        dev.ppgtt_bind_object(&mut obj, CacheLevel::Llc).unwrap();
        assert!(obj.is_bound());

        dev.platform_mut().set_idle_ok(false);
        dev.finish_object(&mut obj).unwrap();

        assert!(!obj.is_bound());
        assert!(dev.idle_state().interruptible);
        assert_eq!(dev.platform().idle_requests(), 1);
        assert_eq!(dev.platform().delays(), &[crate::layout::IDLE_RETRY_DELAY_US]);

        let slot = obj.first_slot();
        assert_eq!(dev.read_global_entry(slot).unwrap(), dev.scratch().global_entry());
        assert_eq!(
            dev.read_ppgtt_entry(slot).unwrap(),
            Some(dev.scratch().ppgtt_entry())
        );
    }
}
