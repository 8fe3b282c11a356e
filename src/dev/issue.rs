/// Write protocol and issue path.
///
/// One write against an endpoint resolves to exactly one IPI of SMI
/// delivery mode, or to a reported failure with no side effect. Target
/// resolution, hotplug fencing and delivery all happen inside a single
/// call here.

use alloc::sync::Arc;

use crate::arch::ipi::{DeliveryMode, IpiSender};
use crate::cpu::online::OnlineCpus;
use crate::cpu::pin::{CpuLocal, PinGuard};
use crate::cpu::CpuId;
use crate::error::{SmiError, SmiResult};

/// Content bytes accepted per write; longer writes are truncated, and the
/// caller sees how many bytes were consumed.
pub const SMI_PAYLOAD_MAX: usize = 63;

/// Reserved broadcast selectors. Declared by the wire protocol but not
/// consumed by the issue path; their resolution is still undecided.
pub const SMI_SHORTCUT_ALL: u32 = 1;
pub const SMI_SHORTCUT_ALLBUTSELF: u32 = 2;

/// Target selected by one write payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The CPU the endpoint is bound to.
    Bound,
    /// The CPU the calling context is presently executing on.
    Current,
}

/// Parses a payload into its target selector and the number of bytes
/// consumed. The only recognized token is the exact bytes `current`;
/// anything else selects the bound CPU.
pub fn parse_payload(payload: &[u8]) -> SmiResult<(Target, usize)> {
    if payload.is_empty() {
        return Err(SmiError::Transport);
    }
    let consumed = payload.len().min(SMI_PAYLOAD_MAX);
    let target = if &payload[..consumed] == b"current" {
        Target::Current
    } else {
        Target::Bound
    };
    Ok((target, consumed))
}

/// The issue protocol, with its collaborators injected once.
pub struct IssuePath {
    online: Arc<OnlineCpus>,
    ipi: Arc<dyn IpiSender>,
    cpu_local: Arc<dyn CpuLocal>,
}

impl IssuePath {
    pub fn new(
        online: Arc<OnlineCpus>,
        ipi: Arc<dyn IpiSender>,
        cpu_local: Arc<dyn CpuLocal>,
    ) -> Self {
        IssuePath {
            online,
            ipi,
            cpu_local,
        }
    }

    /// Handles one write against the endpoint bound to `bound`.
    ///
    /// For the `current` token the calling context is pinned before its
    /// CPU id is read, so migration cannot invalidate the resolved
    /// target. The target is then validated and the IPI dispatched under
    /// a stable view of the online set. Pin and view are released on
    /// every exit path. Returns the number of payload bytes consumed.
    pub fn write(&self, bound: CpuId, payload: &[u8]) -> SmiResult<usize> {
        let (target, consumed) = parse_payload(payload)?;

        let mut pin = None;
        let cpu = match target {
            Target::Current => {
                let guard = PinGuard::new(&*self.cpu_local);
                let cpu = guard.cpu();
                pin = Some(guard);
                cpu
            }
            Target::Bound => bound,
        };

        let view = self.online.stable_view();
        if !view.is_online(cpu) {
            return Err(SmiError::TargetUnavailable(cpu));
        }

        log::info!(
            "smi: sending SMI IPI to cpu {} from {}",
            cpu,
            self.cpu_local.current_cpu()
        );
        self.ipi.send(cpu, DeliveryMode::Smi);

        drop(view);
        drop(pin);
        Ok(consumed)
    }
}
