/// Online-CPU set tracker.
///
/// Thin synchronization wrapper over the set of CPUs currently online.
/// Readers take a `StableView`, which blocks hotplug transitions from
/// completing for as long as it is held; transitions take the write side
/// of the same lock. This is what keeps a resolved target CPU from going
/// offline between validation and interrupt delivery.

use spin::{RwLock, RwLockReadGuard};

use crate::cpu::{CpuId, CpuMask};
use crate::error::{SmiError, SmiResult};

pub struct OnlineCpus {
    mask: RwLock<CpuMask>,
}

impl OnlineCpus {
    pub const fn new() -> Self {
        OnlineCpus {
            mask: RwLock::new(CpuMask::new()),
        }
    }

    /// Whether `cpu` is online at call time. For an answer that stays
    /// valid across a multi-step operation, use `stable_view`.
    pub fn is_online(&self, cpu: CpuId) -> bool {
        self.mask.read().contains(cpu)
    }

    /// Copy of the whole online set.
    pub fn snapshot(&self) -> CpuMask {
        *self.mask.read()
    }

    /// Number of CPUs currently online.
    pub fn count(&self) -> usize {
        self.mask.read().count()
    }

    /// Acquires a view under which no hotplug transition can complete.
    /// Released on drop; hold it only for the span of one operation.
    pub fn stable_view(&self) -> StableView<'_> {
        StableView {
            mask: self.mask.read(),
        }
    }

    /// Records `cpu` as online. Waits for live stable views to drain.
    ///
    /// A second online event without an intervening offline event is a
    /// hotplug protocol violation and is surfaced, never ignored.
    pub fn mark_online(&self, cpu: CpuId) -> SmiResult<()> {
        if self.mask.write().insert(cpu) {
            Ok(())
        } else {
            Err(SmiError::ProtocolDesync(cpu))
        }
    }

    /// Records `cpu` as offline. Waits for live stable views to drain,
    /// so an in-flight issue that already resolved this CPU finishes
    /// delivery first.
    pub fn mark_offline(&self, cpu: CpuId) -> SmiResult<()> {
        if self.mask.write().remove(cpu) {
            Ok(())
        } else {
            Err(SmiError::ProtocolDesync(cpu))
        }
    }
}

/// Scoped read access to the online set; hotplug transitions block until
/// every live view is dropped.
pub struct StableView<'a> {
    mask: RwLockReadGuard<'a, CpuMask>,
}

impl StableView<'_> {
    pub fn is_online(&self, cpu: CpuId) -> bool {
        self.mask.contains(cpu)
    }

    pub fn iter(&self) -> impl Iterator<Item = CpuId> + '_ {
        self.mask.iter()
    }
}
