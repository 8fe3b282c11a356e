/// Process-wide SMI control surface.
///
/// Owns the registration lifetime: the chrdev range, the device class and
/// the hotplug callback slot. All collaborators are injected at
/// construction; `start` and `stop` bound the validity of every endpoint.

use alloc::sync::Arc;
use spin::Mutex;

use crate::arch::ipi::IpiSender;
use crate::cpu::online::OnlineCpus;
use crate::cpu::pin::CpuLocal;
use crate::cpu::CpuId;
use crate::dev::endpoint::EndpointTable;
use crate::dev::issue::IssuePath;
use crate::dev::{DeviceRegistry, SMI_CHRDEV, SMI_CLASS, SMI_MAJOR};
use crate::error::{RegistrationStep, SmiError, SmiResult};
use crate::hotplug::{HotplugEvents, HotplugToken};

pub struct SmiControl {
    registry: Arc<dyn DeviceRegistry>,
    hotplug: Arc<HotplugEvents>,
    endpoints: Arc<EndpointTable>,
    issue: IssuePath,
    token: Mutex<Option<HotplugToken>>,
}

impl SmiControl {
    pub fn new(
        online: Arc<OnlineCpus>,
        hotplug: Arc<HotplugEvents>,
        registry: Arc<dyn DeviceRegistry>,
        ipi: Arc<dyn IpiSender>,
        cpu_local: Arc<dyn CpuLocal>,
    ) -> Self {
        let endpoints = Arc::new(EndpointTable::new(registry.clone()));
        let issue = IssuePath::new(online, ipi, cpu_local);
        SmiControl {
            registry,
            hotplug,
            endpoints,
            issue,
            token: Mutex::new(None),
        }
    }

    /// Brings the surface up. CPUs already online receive endpoints before
    /// this returns; a partial failure unwinds the completed steps in
    /// reverse and leaves nothing registered.
    pub fn start(&self) -> SmiResult<()> {
        let mut token = self.token.lock();
        if token.is_some() {
            // The callback slot is single-owner; a second start is a
            // registration failure, not a no-op.
            return Err(SmiError::Registration(RegistrationStep::Hotplug));
        }

        if let Err(e) = self.registry.register_chrdev(SMI_MAJOR, SMI_CHRDEV) {
            log::error!("smi: cannot register chrdev range: {:?}", e);
            return Err(e);
        }
        if let Err(e) = self.registry.create_class(SMI_CLASS) {
            log::error!("smi: cannot create device class: {:?}", e);
            self.registry.unregister_chrdev(SMI_MAJOR);
            return Err(e);
        }
        match self.hotplug.subscribe(self.endpoints.clone()) {
            Ok(t) => {
                *token = Some(t);
                Ok(())
            }
            Err(e) => {
                log::error!("smi: cannot subscribe to hotplug events: {:?}", e);
                self.registry.destroy_class();
                self.registry.unregister_chrdev(SMI_MAJOR);
                Err(e)
            }
        }
    }

    /// Tears the surface down: every live endpoint is destroyed, then the
    /// class and chrdev range are released. Idempotent once stopped.
    pub fn stop(&self) -> SmiResult<()> {
        let mut token = self.token.lock();
        let t = match token.take() {
            Some(t) => t,
            None => return Ok(()),
        };
        self.hotplug.unsubscribe(t)?;
        self.registry.destroy_class();
        self.registry.unregister_chrdev(SMI_MAJOR);
        Ok(())
    }

    /// Handles one write against the endpoint bound to `cpu`. Returns the
    /// number of payload bytes consumed.
    pub fn write(&self, cpu: CpuId, payload: &[u8]) -> SmiResult<usize> {
        self.issue.write(cpu, payload)
    }

    /// Whether `cpu/<id>/smi` is currently published for `cpu`.
    pub fn has_endpoint(&self, cpu: CpuId) -> bool {
        self.endpoints.has_endpoint(cpu)
    }

    /// Number of endpoints currently published.
    pub fn live_endpoints(&self) -> usize {
        self.endpoints.live_count()
    }
}
