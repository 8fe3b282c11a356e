/// CPU-state notification service.
///
/// Hotplug transitions enter here from the platform control path. The
/// service flips the online-set tracker before invoking any callbacks, so
/// endpoint creation and destruction are never observable ahead of the
/// online set itself, and an offline transition waits for in-flight
/// issues holding a stable view.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

use crate::cpu::online::OnlineCpus;
use crate::cpu::CpuId;
use crate::error::{RegistrationStep, SmiError, SmiResult};

/// Synchronous hotplug transition callbacks.
///
/// `on_cpu_online` runs after the CPU is recorded online; `on_cpu_offline`
/// runs after it is recorded offline. Either may fail, and a failure is
/// surfaced to whoever initiated the transition.
pub trait CpuStateCallbacks: Send + Sync {
    fn on_cpu_online(&self, cpu: CpuId) -> SmiResult<()>;
    fn on_cpu_offline(&self, cpu: CpuId) -> SmiResult<()>;
}

/// Subscription handle; pass it back to `unsubscribe` on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotplugToken(u64);

pub struct HotplugEvents {
    online: Arc<OnlineCpus>,
    subscribers: Mutex<Vec<(u64, Arc<dyn CpuStateCallbacks>)>>,
    next_token: AtomicU64,
}

impl HotplugEvents {
    pub fn new(online: Arc<OnlineCpus>) -> Self {
        HotplugEvents {
            online,
            subscribers: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Platform entry point: `cpu` has finished coming online.
    ///
    /// On a callback failure the already-notified subscribers are unwound
    /// in reverse and the CPU is recorded offline again, so the caller can
    /// abort the bring-up cleanly.
    pub fn cpu_up(&self, cpu: CpuId) -> SmiResult<()> {
        self.online.mark_online(cpu)?;
        let subs = self.subscribers.lock();
        for (i, (_, cb)) in subs.iter().enumerate() {
            if let Err(e) = cb.on_cpu_online(cpu) {
                for (_, notified) in subs[..i].iter().rev() {
                    let _ = notified.on_cpu_offline(cpu);
                }
                let _ = self.online.mark_offline(cpu);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Platform entry point: `cpu` is going offline.
    ///
    /// The tracker update waits for every live stable view, then the
    /// subscribers tear down in reverse subscription order.
    pub fn cpu_down(&self, cpu: CpuId) -> SmiResult<()> {
        self.online.mark_offline(cpu)?;
        let subs = self.subscribers.lock();
        for (_, cb) in subs.iter().rev() {
            cb.on_cpu_offline(cpu)?;
        }
        Ok(())
    }

    /// Installs `callbacks` and replays `on_cpu_online` for every CPU that
    /// is already online; boot CPUs never produce a transition event of
    /// their own. A mid-replay failure unwinds the replayed CPUs in
    /// reverse and leaves nothing installed.
    pub fn subscribe(&self, callbacks: Arc<dyn CpuStateCallbacks>) -> SmiResult<HotplugToken> {
        let mut subs = self.subscribers.lock();

        let present: Vec<CpuId> = self.online.snapshot().iter().collect();
        for (i, &cpu) in present.iter().enumerate() {
            if let Err(e) = callbacks.on_cpu_online(cpu) {
                for &replayed in present[..i].iter().rev() {
                    let _ = callbacks.on_cpu_offline(replayed);
                }
                return Err(e);
            }
        }

        let id = self.next_token.fetch_add(1, Ordering::Relaxed);
        subs.push((id, callbacks));
        Ok(HotplugToken(id))
    }

    /// Removes the subscription and replays `on_cpu_offline` for every CPU
    /// still online, leaving the subscriber with zero live state. No
    /// callbacks fire for this token afterwards.
    pub fn unsubscribe(&self, token: HotplugToken) -> SmiResult<()> {
        let mut subs = self.subscribers.lock();
        let pos = subs
            .iter()
            .position(|(id, _)| *id == token.0)
            .ok_or(SmiError::Registration(RegistrationStep::Hotplug))?;
        let (_, callbacks) = subs.remove(pos);

        let present: Vec<CpuId> = self.online.snapshot().iter().collect();
        for &cpu in present.iter().rev() {
            callbacks.on_cpu_offline(cpu)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        events: Mutex<Vec<(CpuId, bool)>>,
        fail_online_for: Option<CpuId>,
    }

    impl Recorder {
        fn new() -> Self {
            Recorder {
                events: Mutex::new(Vec::new()),
                fail_online_for: None,
            }
        }

        fn failing_on(cpu: CpuId) -> Self {
            Recorder {
                events: Mutex::new(Vec::new()),
                fail_online_for: Some(cpu),
            }
        }

        fn events(&self) -> Vec<(CpuId, bool)> {
            self.events.lock().clone()
        }
    }

    impl CpuStateCallbacks for Recorder {
        fn on_cpu_online(&self, cpu: CpuId) -> SmiResult<()> {
            if self.fail_online_for == Some(cpu) {
                return Err(SmiError::Registration(RegistrationStep::Class));
            }
            self.events.lock().push((cpu, true));
            Ok(())
        }
        fn on_cpu_offline(&self, cpu: CpuId) -> SmiResult<()> {
            self.events.lock().push((cpu, false));
            Ok(())
        }
    }

    fn service_with_online(cpus: &[CpuId]) -> (Arc<OnlineCpus>, HotplugEvents) {
        let online = Arc::new(OnlineCpus::new());
        for &cpu in cpus {
            online.mark_online(cpu).unwrap();
        }
        let events = HotplugEvents::new(online.clone());
        (online, events)
    }

    #[test]
    fn test_subscribe_replays_boot_cpus() {
        let (_, events) = service_with_online(&[0, 1]);
        let recorder = Arc::new(Recorder::new());
        events.subscribe(recorder.clone()).unwrap();
        assert_eq!(recorder.events(), vec![(0, true), (1, true)]);
    }

    #[test]
    fn test_subscribe_unwinds_on_replay_failure() {
        let (_, events) = service_with_online(&[0, 1, 2]);
        let recorder = Arc::new(Recorder::failing_on(2));
        let r = events.subscribe(recorder.clone());
        assert_eq!(r, Err(SmiError::Registration(RegistrationStep::Class)));
        // 0 and 1 were replayed, then unwound in reverse.
        assert_eq!(
            recorder.events(),
            vec![(0, true), (1, true), (1, false), (0, false)]
        );
        // Nothing installed: later transitions reach no subscriber.
        events.cpu_up(3).unwrap();
        assert_eq!(recorder.events().len(), 4);
    }

    #[test]
    fn test_transitions_reach_subscriber() {
        let (online, events) = service_with_online(&[0]);
        let recorder = Arc::new(Recorder::new());
        events.subscribe(recorder.clone()).unwrap();

        events.cpu_up(1).unwrap();
        assert!(online.is_online(1));
        events.cpu_down(1).unwrap();
        assert!(!online.is_online(1));

        assert_eq!(recorder.events(), vec![(0, true), (1, true), (1, false)]);
    }

    #[test]
    fn test_duplicate_transition_is_desync() {
        let (online, events) = service_with_online(&[]);
        events.cpu_up(4).unwrap();
        assert_eq!(events.cpu_up(4), Err(SmiError::ProtocolDesync(4)));
        assert!(online.is_online(4));
        events.cpu_down(4).unwrap();
        assert_eq!(events.cpu_down(4), Err(SmiError::ProtocolDesync(4)));
    }

    #[test]
    fn test_failed_cpu_up_rolls_back_tracker() {
        let (online, events) = service_with_online(&[]);
        let recorder = Arc::new(Recorder::failing_on(7));
        events.subscribe(recorder).unwrap();
        assert!(events.cpu_up(7).is_err());
        assert!(!online.is_online(7));
    }

    #[test]
    fn test_unsubscribe_tears_down_in_reverse() {
        let (_, events) = service_with_online(&[0, 5]);
        let recorder = Arc::new(Recorder::new());
        let token = events.subscribe(recorder.clone()).unwrap();
        events.unsubscribe(token).unwrap();
        assert_eq!(
            recorder.events(),
            vec![(0, true), (5, true), (5, false), (0, false)]
        );
        // Token is gone.
        assert_eq!(
            events.unsubscribe(token),
            Err(SmiError::Registration(RegistrationStep::Hotplug))
        );
        // Later transitions no longer reach the old subscriber.
        events.cpu_up(9).unwrap();
        assert_eq!(recorder.events().len(), 4);
    }
}
