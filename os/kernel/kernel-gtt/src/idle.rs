//! # Idle Coordinator
//!
//! Some hardware cannot tolerate table edits while the GPU is busy. On such
//! devices, edits are bracketed by an idle section that turns off
//! interruptible waits and asks the GPU to drain. A GPU that refuses to idle
//! is logged and waited out briefly; the edit goes ahead regardless.

use crate::error::GttError;
use crate::layout::IDLE_RETRY_DELAY_US;
use crate::platform::GpuSync;
use log::error;

/// Idling policy and the current interruptible-wait flag of a device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IdleState {
    /// Mapping edits require an idle GPU.
    pub idle_maps: bool,
    /// Waits on the GPU may be interrupted.
    pub interruptible: bool,
}

impl IdleState {
    #[must_use]
    pub const fn new(idle_maps: bool) -> Self {
        Self {
            idle_maps,
            interruptible: true,
        }
    }

    /// Enter an idle section, returning the flag to hand to [`end`](Self::end).
    pub fn begin<S: GpuSync + ?Sized>(&mut self, sync: &mut S) -> bool {
        let prior = self.interruptible;
        if self.idle_maps {
            self.interruptible = false;
            if !sync.request_idle() {
                error!("{}", GttError::IdleTimeout);
                sync.delay_us(IDLE_RETRY_DELAY_US);
            }
        }
        prior
    }

    /// Leave an idle section entered with [`begin`](Self::begin).
    pub const fn end(&mut self, prior: bool) {
        if self.idle_maps {
            self.interruptible = prior;
        }
    }
}
