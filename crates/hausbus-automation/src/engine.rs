//! Logic lifecycle and dispatch engine

use crate::logic::{Logic, LogicContext};
use crate::services::ServiceProviders;
use crate::statistics::StatisticsStore;
use hausbus_core::{Capability, DeviceRegistry, PositionPath, StatusListener};
use std::sync::{Arc, Mutex};

/// Adapter subscribing one logic instance to the device registry.
///
/// Forwards the logic's declared capabilities, so the registry only
/// delivers event kinds the rule actually handles.
struct LogicSubscription {
    logic: Arc<dyn Logic>,
}

impl StatusListener for LogicSubscription {
    fn listener_id(&self) -> String {
        self.logic.id()
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.logic.capabilities()
    }

    fn presence_changed(&self, path: &PositionPath, present: bool) {
        self.logic.presence_changed(path, present);
    }

    fn on_off_changed(&self, path: &PositionPath, is_on: bool) {
        self.logic.on_off_changed(path, is_on);
    }

    fn illuminance_changed(&self, path: &PositionPath, lux: f32) {
        self.logic.illuminance_changed(path, lux);
    }
}

/// Registry and dispatcher for all active logic instances.
///
/// Enforces the one-instance-per-(name, position) invariant: registering
/// a second instance with the same identity stops and unsubscribes the
/// old one before the new one takes over, atomically with respect to
/// concurrent registrations.
pub struct LogicEngine {
    devices: Arc<DeviceRegistry>,
    services: Arc<ServiceProviders>,
    statistics: Arc<dyn StatisticsStore>,
    logics: Mutex<Vec<Arc<dyn Logic>>>,
}

impl LogicEngine {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        services: Arc<ServiceProviders>,
        statistics: Arc<dyn StatisticsStore>,
    ) -> Self {
        Self {
            devices,
            services,
            statistics,
            logics: Mutex::new(Vec::new()),
        }
    }

    /// Bind, start and subscribe a logic instance, replacing any previous
    /// instance with the same `(name, position)` identity.
    pub fn register(&self, logic: Arc<dyn Logic>) {
        logic.bind(LogicContext {
            devices: self.devices.clone(),
            services: self.services.clone(),
            statistics: self.statistics.clone(),
        });
        logic.start();

        let mut logics = self.logics.lock().unwrap_or_else(|e| e.into_inner());
        let existing = logics.iter().position(|old| {
            old.name().eq_ignore_ascii_case(logic.name())
                && logic.positions().iter().any(|p| old.contains(p))
        });
        if let Some(index) = existing {
            let old = logics.remove(index);
            old.stop();
            self.devices.remove_listener(&old.id());
            tracing::info!("Replacing logic {}", old.id());
        } else {
            tracing::info!("Adding logic {}", logic.id());
        }
        self.devices.add_listener(Arc::new(LogicSubscription {
            logic: logic.clone(),
        }));
        logics.push(logic);
    }

    /// Stop and unsubscribe a specific instance. No-op if not registered.
    pub fn unregister(&self, logic: &Arc<dyn Logic>) {
        let mut logics = self.logics.lock().unwrap_or_else(|e| e.into_inner());
        let Some(index) = logics.iter().position(|l| Arc::ptr_eq(l, logic)) else {
            return;
        };
        let removed = logics.remove(index);
        removed.stop();
        self.devices.remove_listener(&removed.id());
        tracing::info!("Removed logic {}", removed.id());
    }

    /// Stop and unsubscribe whatever instance matches the identity.
    /// No-op if not found.
    pub fn unregister_at(&self, path: &PositionPath, name: &str) {
        let mut logics = self.logics.lock().unwrap_or_else(|e| e.into_inner());
        let Some(index) = logics.iter().position(|l| l.has_identity(path, name)) else {
            return;
        };
        let removed = logics.remove(index);
        removed.stop();
        self.devices.remove_listener(&removed.id());
        tracing::info!("Removed logic {}", removed.id());
    }

    #[must_use]
    pub fn get_logic(&self, path: &PositionPath, name: &str) -> Option<Arc<dyn Logic>> {
        let logics = self.logics.lock().unwrap_or_else(|e| e.into_inner());
        logics.iter().find(|l| l.has_identity(path, name)).cloned()
    }

    /// Names of all logics whose scope covers `path`.
    #[must_use]
    pub fn logic_names(&self, path: &PositionPath) -> Vec<String> {
        let logics = self.logics.lock().unwrap_or_else(|e| e.into_inner());
        logics
            .iter()
            .filter(|l| l.contains(path))
            .map(|l| l.name().to_string())
            .collect()
    }

    /// Stop every registered instance. Instances stay registered; a
    /// misbehaving stop in one rule never prevents the others from
    /// stopping.
    pub fn stop(&self) {
        let logics: Vec<Arc<dyn Logic>> = {
            let guard = self.logics.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        for logic in logics {
            logic.stop();
        }
        tracing::info!("Logic engine stopped");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let logics = self.logics.lock().unwrap_or_else(|e| e.into_inner());
        logics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
