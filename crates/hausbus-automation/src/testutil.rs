//! Shared helpers for rule tests

use crate::logic::LogicContext;
use crate::services::ServiceProviders;
use crate::statistics::NoStatistics;
use hausbus_core::{Command, CommandPort, DeviceRegistry, GatewayError};
use std::sync::{Arc, Mutex};

/// Command port recording every actuation for assertions.
#[derive(Default)]
pub(crate) struct RecordingPort {
    commands: Mutex<Vec<Command>>,
}

impl RecordingPort {
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandPort for RecordingPort {
    fn send(&self, command: &Command) -> Result<(), GatewayError> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Fresh context over a recording registry.
pub(crate) fn context() -> (LogicContext, Arc<DeviceRegistry>, Arc<RecordingPort>) {
    let port = Arc::new(RecordingPort::default());
    let devices = Arc::new(DeviceRegistry::new(port.clone()));
    let ctx = LogicContext {
        devices: devices.clone(),
        services: Arc::new(ServiceProviders::default()),
        statistics: Arc::new(NoStatistics),
    };
    (ctx, devices, port)
}
