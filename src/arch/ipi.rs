/// Interprocessor interrupt interface.
///
/// The control surface consumes interrupt delivery as a capability; the
/// x86_64 local-APIC backend in `arch::x86_64` is the one concrete
/// implementation this crate ships.

use crate::cpu::CpuId;

/// Interrupt delivery mode, as understood by the local interrupt
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Ordinary vectored interrupt.
    Fixed(u8),
    /// System Management Interrupt. The vector field is ignored by
    /// hardware for this mode.
    Smi,
    /// Non-maskable interrupt.
    Nmi,
}

/// Platform capability to deliver an interrupt to one CPU.
///
/// Dispatch is fire-and-forget: an implementation may block on the local
/// interrupt controller accepting the command, never on the remote
/// handler running.
pub trait IpiSender: Send + Sync {
    fn send(&self, cpu: CpuId, mode: DeliveryMode);
}
