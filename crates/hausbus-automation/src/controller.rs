//! Top-level wiring of registry, logic engine and schedule engine

use crate::engine::LogicEngine;
use crate::logic::Logic;
use crate::schedule::{ScheduleEngine, TaskRegistry};
use crate::services::ServiceProviders;
use crate::statistics::{NoStatistics, StatisticsStore};
use hausbus_core::{CommandPort, Device, DeviceRegistry, NullCommandPort};
use std::path::PathBuf;
use std::sync::Arc;

type TaskHook = Box<dyn FnOnce(&Arc<DeviceRegistry>, &TaskRegistry) + Send>;

/// A fully wired automation controller.
pub struct Controller {
    devices: Arc<DeviceRegistry>,
    logic: Arc<LogicEngine>,
    schedules: Arc<ScheduleEngine>,
}

impl Controller {
    #[must_use]
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    #[must_use]
    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }

    #[must_use]
    pub fn logic(&self) -> &Arc<LogicEngine> {
        &self.logic
    }

    #[must_use]
    pub fn schedules(&self) -> &Arc<ScheduleEngine> {
        &self.schedules
    }

    /// Stop every logic instance and the schedule tick.
    pub fn shutdown(&self) {
        self.logic.stop();
        self.schedules.shutdown();
        tracing::info!("Controller shut down");
    }
}

/// Builder mirroring the deployment style: devices, rules and scheduled
/// tasks are declared up front, then `build()` wires everything and
/// starts the engines.
pub struct ControllerBuilder {
    command_port: Arc<dyn CommandPort>,
    data_dir: PathBuf,
    services: ServiceProviders,
    statistics: Arc<dyn StatisticsStore>,
    devices: Vec<Device>,
    logics: Vec<Arc<dyn Logic>>,
    task_hooks: Vec<TaskHook>,
}

impl ControllerBuilder {
    #[must_use]
    pub fn new() -> Self {
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        Self {
            command_port: Arc::new(NullCommandPort),
            data_dir: PathBuf::from(data_dir),
            services: ServiceProviders::default(),
            statistics: Arc::new(NoStatistics),
            devices: Vec::new(),
            logics: Vec::new(),
            task_hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn command_port(mut self, port: Arc<dyn CommandPort>) -> Self {
        self.command_port = port;
        self
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn services(mut self, services: ServiceProviders) -> Self {
        self.services = services;
        self
    }

    #[must_use]
    pub fn statistics(mut self, statistics: Arc<dyn StatisticsStore>) -> Self {
        self.statistics = statistics;
        self
    }

    #[must_use]
    pub fn device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    #[must_use]
    pub fn logic(mut self, logic: Arc<dyn Logic>) -> Self {
        self.logics.push(logic);
        self
    }

    /// Register named schedule actions. The hook runs after the device
    /// registry exists but before persisted schedules are loaded, so
    /// reloaded records can resolve these names.
    #[must_use]
    pub fn tasks<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Arc<DeviceRegistry>, &TaskRegistry) + Send + 'static,
    {
        self.task_hooks.push(Box::new(hook));
        self
    }

    pub async fn build(self) -> Controller {
        let devices = Arc::new(DeviceRegistry::new(self.command_port));
        for device in self.devices {
            devices.register(device);
        }

        let logic = Arc::new(LogicEngine::new(
            devices.clone(),
            Arc::new(self.services),
            self.statistics,
        ));
        for instance in self.logics {
            logic.register(instance);
        }

        let tasks = Arc::new(TaskRegistry::new());
        for hook in self.task_hooks {
            hook(&devices, &tasks);
        }

        let schedule_path = self.data_dir.join("schedules.json");
        let schedules = Arc::new(ScheduleEngine::new(schedule_path, tasks).await);
        schedules.run();

        Controller {
            devices,
            logic,
            schedules,
        }
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
