use crate::cpu::CpuId;

/// Errors surfaced by the control surface.
///
/// Everything is reported synchronously to the immediate caller; nothing
/// is retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmiError {
    /// The payload could not be consumed or carried no bytes. No side
    /// effect was attempted.
    Transport,
    /// A hotplug callback fired for a CPU already in that lifecycle state
    /// (double online or double offline). The notification source and the
    /// endpoint state have diverged; fatal to the operation observing it.
    ProtocolDesync(CpuId),
    /// The requested CPU was not online at delivery time. No interrupt
    /// was dispatched.
    TargetUnavailable(CpuId),
    /// Start-up could not complete the named registration step.
    Registration(RegistrationStep),
}

/// The start-up step that failed, for `SmiError::Registration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Claiming the chrdev range.
    Chrdev,
    /// Creating the device class.
    Class,
    /// Claiming the hotplug callback slot.
    Hotplug,
}

pub type SmiResult<T> = Result<T, SmiError>;
