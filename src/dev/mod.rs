/// Device-naming collaborator interface.
///
/// The naming filesystem itself is external. This module owns the name
/// format for per-CPU endpoints and the registration contract the control
/// surface drives against it.

pub mod endpoint;
pub mod issue;

use alloc::format;
use alloc::string::String;

use crate::cpu::CpuId;
use crate::error::SmiResult;

/// Fixed chrdev major owned by the surface registration.
pub const SMI_MAJOR: u32 = 73;

/// Name the chrdev range is claimed under.
pub const SMI_CHRDEV: &str = "cpu/smi";

/// Device class grouping the per-CPU nodes.
pub const SMI_CLASS: &str = "smi";

/// Opaque handle to one user-visible naming entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNode(pub u64);

/// Naming-filesystem registration surface.
///
/// Mirrors the three allocations the surface owns: the chrdev range, the
/// device class, and the per-CPU nodes. Failures carry
/// `SmiError::Registration` with the failing step.
pub trait DeviceRegistry: Send + Sync {
    /// Claims the chrdev range for `major` under `name`.
    fn register_chrdev(&self, major: u32, name: &str) -> SmiResult<()>;

    /// Releases the chrdev range.
    fn unregister_chrdev(&self, major: u32);

    /// Creates the device class the per-CPU nodes hang off.
    fn create_class(&self, name: &str) -> SmiResult<()>;

    /// Destroys the device class.
    fn destroy_class(&self);

    /// Publishes one naming entry for `cpu`; `name` comes from `devnode`.
    fn create(&self, cpu: CpuId, name: &str) -> SmiResult<DeviceNode>;

    /// Retracts a previously published entry.
    fn destroy(&self, node: DeviceNode);
}

/// Formats the naming entry for `cpu`'s endpoint.
pub fn devnode(cpu: CpuId) -> String {
    format!("cpu/{}/smi", cpu)
}
