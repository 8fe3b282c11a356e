/// Migration pinning for "current CPU" resolution.
///
/// Resolving the `current` token is only meaningful if the calling context
/// cannot migrate between reading its CPU id and the interrupt being
/// dispatched. The platform supplies that capability; the issue path takes
/// it as an RAII scope so a pin can never leak past one operation.

use crate::cpu::CpuId;

/// Capability to observe and pin the calling context's CPU. Supplied by
/// the platform layer; all methods apply to the calling context only.
pub trait CpuLocal: Send + Sync {
    /// CPU the caller is presently executing on. Without a pin in place
    /// this value may be stale the moment it is read.
    fn current_cpu(&self) -> CpuId;

    /// Disables migration for the calling context and returns the CPU it
    /// is now held on. Must be balanced by `unpin`; use `PinGuard::new`
    /// rather than calling this directly.
    fn pin(&self) -> CpuId;

    /// Re-enables migration for the calling context.
    fn unpin(&self);
}

/// Scoped migration pin. The calling context stays on `cpu()` until the
/// guard is dropped, on every exit path.
pub struct PinGuard<'a> {
    cpu: CpuId,
    owner: &'a dyn CpuLocal,
}

impl<'a> PinGuard<'a> {
    pub fn new(owner: &'a dyn CpuLocal) -> Self {
        let cpu = owner.pin();
        PinGuard { cpu, owner }
    }

    /// The CPU the caller is pinned to.
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.owner.unpin();
    }
}
