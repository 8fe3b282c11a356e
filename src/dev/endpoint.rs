/// Per-CPU endpoint lifecycle.
///
/// Keeps the set of live endpoints in 1:1 correspondence with the online
/// CPU set: one `cpu/<id>/smi` naming entry per online CPU, created on
/// the online callback, destroyed on the offline callback, nothing else
/// ever touches the table.

use alloc::sync::Arc;
use spin::Mutex;

use super::{devnode, DeviceNode, DeviceRegistry};
use crate::cpu::{CpuId, MAX_CPUS};
use crate::error::{SmiError, SmiResult};
use crate::hotplug::CpuStateCallbacks;

struct Endpoint {
    node: DeviceNode,
}

pub struct EndpointTable {
    registry: Arc<dyn DeviceRegistry>,
    slots: Mutex<[Option<Endpoint>; MAX_CPUS]>,
}

impl EndpointTable {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        const EMPTY: Option<Endpoint> = None;
        EndpointTable {
            registry,
            slots: Mutex::new([EMPTY; MAX_CPUS]),
        }
    }

    /// Whether an endpoint is live for `cpu`.
    pub fn has_endpoint(&self, cpu: CpuId) -> bool {
        match self.slots.lock().get(cpu as usize) {
            Some(slot) => slot.is_some(),
            None => false,
        }
    }

    /// Number of live endpoints.
    pub fn live_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }
}

impl CpuStateCallbacks for EndpointTable {
    fn on_cpu_online(&self, cpu: CpuId) -> SmiResult<()> {
        let mut slots = self.slots.lock();
        let slot = slots
            .get_mut(cpu as usize)
            .ok_or(SmiError::ProtocolDesync(cpu))?;
        if slot.is_some() {
            // Two online events without an intervening offline: the
            // notification source and this table have diverged.
            return Err(SmiError::ProtocolDesync(cpu));
        }
        let node = self.registry.create(cpu, &devnode(cpu))?;
        *slot = Some(Endpoint { node });
        Ok(())
    }

    fn on_cpu_offline(&self, cpu: CpuId) -> SmiResult<()> {
        let mut slots = self.slots.lock();
        let slot = slots
            .get_mut(cpu as usize)
            .ok_or(SmiError::ProtocolDesync(cpu))?;
        match slot.take() {
            Some(endpoint) => {
                self.registry.destroy(endpoint.node);
                Ok(())
            }
            None => Err(SmiError::ProtocolDesync(cpu)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct FakeRegistry {
        created: Mutex<Vec<(CpuId, String)>>,
        destroyed: Mutex<Vec<DeviceNode>>,
    }

    impl DeviceRegistry for FakeRegistry {
        fn register_chrdev(&self, _major: u32, _name: &str) -> SmiResult<()> {
            Ok(())
        }
        fn unregister_chrdev(&self, _major: u32) {}
        fn create_class(&self, _name: &str) -> SmiResult<()> {
            Ok(())
        }
        fn destroy_class(&self) {}
        fn create(&self, cpu: CpuId, name: &str) -> SmiResult<DeviceNode> {
            self.created.lock().push((cpu, String::from(name)));
            Ok(DeviceNode(cpu as u64))
        }
        fn destroy(&self, node: DeviceNode) {
            self.destroyed.lock().push(node);
        }
    }

    #[test]
    fn test_online_creates_named_entry() {
        let registry = Arc::new(FakeRegistry::default());
        let table = EndpointTable::new(registry.clone());

        table.on_cpu_online(3).unwrap();
        assert!(table.has_endpoint(3));
        assert_eq!(table.live_count(), 1);
        assert_eq!(
            registry.created.lock().as_slice(),
            &[(3, String::from("cpu/3/smi"))]
        );
    }

    #[test]
    fn test_offline_destroys_entry() {
        let registry = Arc::new(FakeRegistry::default());
        let table = EndpointTable::new(registry.clone());

        table.on_cpu_online(0).unwrap();
        table.on_cpu_online(1).unwrap();
        table.on_cpu_offline(1).unwrap();

        assert!(table.has_endpoint(0));
        assert!(!table.has_endpoint(1));
        assert_eq!(table.live_count(), 1);
        assert_eq!(registry.destroyed.lock().as_slice(), &[DeviceNode(1)]);
    }

    #[test]
    fn test_double_online_is_desync() {
        let registry = Arc::new(FakeRegistry::default());
        let table = EndpointTable::new(registry.clone());

        table.on_cpu_online(2).unwrap();
        assert_eq!(table.on_cpu_online(2), Err(SmiError::ProtocolDesync(2)));
        // The violating event created nothing.
        assert_eq!(registry.created.lock().len(), 1);
    }

    #[test]
    fn test_offline_without_endpoint_is_desync() {
        let registry = Arc::new(FakeRegistry::default());
        let table = EndpointTable::new(registry);
        assert_eq!(table.on_cpu_offline(5), Err(SmiError::ProtocolDesync(5)));
    }

    #[test]
    fn test_hotplug_sequence_keeps_invariant() {
        let registry = Arc::new(FakeRegistry::default());
        let table = EndpointTable::new(registry);

        let mut live: Vec<CpuId> = Vec::new();
        let sequence: &[(CpuId, bool)] = &[
            (0, true),
            (1, true),
            (1, false),
            (2, true),
            (0, false),
            (1, true),
        ];
        for &(cpu, up) in sequence {
            if up {
                table.on_cpu_online(cpu).unwrap();
                live.push(cpu);
            } else {
                table.on_cpu_offline(cpu).unwrap();
                live.retain(|&c| c != cpu);
            }
            assert_eq!(table.live_count(), live.len());
            for &c in &live {
                assert!(table.has_endpoint(c));
            }
        }
    }
}
