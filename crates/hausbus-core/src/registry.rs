//! In-memory device registry with capability-gated event fan-out

use crate::device::{Device, DeviceKind};
use crate::gateway::{Command, CommandPort, GatewayError};
use crate::listener::{Capability, StatusListener};
use crate::path::PositionPath;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};

/// Registry of all devices on the bus.
///
/// Holds the last known state per device (keyed by path id), fans status
/// changes out to capability-matching listeners and routes actuation
/// through the gateway command port. Actuations are echoed back through
/// the normal report path, so rules observe their own writes as ordinary
/// on/off events.
pub struct DeviceRegistry {
    devices: DashMap<String, Device>,
    listeners: RwLock<Vec<Arc<dyn StatusListener>>>,
    port: Arc<dyn CommandPort>,
}

impl DeviceRegistry {
    pub fn new(port: Arc<dyn CommandPort>) -> Self {
        Self {
            devices: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
            port,
        }
    }

    /// Add or replace a device.
    pub fn register(&self, device: Device) {
        let id = device.position_path().id();
        tracing::info!("Registered {:?} at {}", device.kind(), device.position_path());
        self.devices.insert(id, device);
    }

    /// Device of the given kind at exactly this path.
    #[must_use]
    pub fn device(&self, kind: DeviceKind, path: &PositionPath) -> Option<Device> {
        self.devices
            .iter()
            .map(|entry| entry.value().clone())
            .find(|d| d.kind() == kind && d.position_path().is_same(path))
    }

    /// First device of the given kind in the same room as `path`.
    #[must_use]
    pub fn device_in_room(&self, kind: DeviceKind, path: &PositionPath) -> Option<Device> {
        self.devices
            .iter()
            .map(|entry| entry.value().clone())
            .find(|d| d.kind() == kind && d.position_path().same_room(path))
    }

    #[must_use]
    pub fn all_devices(&self) -> Vec<Device> {
        self.devices.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn add_listener(&self, listener: Arc<dyn StatusListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    pub fn remove_listener(&self, listener_id: &str) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|l| l.listener_id() != listener_id);
    }

    /// Presence report from the gateway side.
    pub fn report_presence(&self, path: &PositionPath, present: bool) {
        if let Some(mut device) = self.devices.get_mut(&path.id()) {
            device.state_mut().present = present;
        }
        for listener in self.listeners_with(Capability::Presence) {
            listener.presence_changed(path, present);
        }
    }

    /// On/off report from the gateway side (or an actuation echo).
    pub fn report_on_off(&self, path: &PositionPath, is_on: bool) {
        if let Some(mut device) = self.devices.get_mut(&path.id()) {
            device.state_mut().on = is_on;
            if !is_on {
                device.state_mut().brightness = 0;
            }
        }
        for listener in self.listeners_with(Capability::OnOff) {
            listener.on_off_changed(path, is_on);
        }
    }

    /// Illuminance report from the gateway side.
    pub fn report_lux(&self, path: &PositionPath, lux: f32) {
        if let Some(mut device) = self.devices.get_mut(&path.id()) {
            device.state_mut().lux = lux;
        }
        for listener in self.listeners_with(Capability::Illuminance) {
            listener.illuminance_changed(path, lux);
        }
    }

    /// Switch the device at `path` on.
    pub fn turn_on(&self, path: &PositionPath) -> Result<(), GatewayError> {
        self.port.send(&Command::SwitchOn(path.clone()))?;
        self.report_on_off(path, true);
        Ok(())
    }

    /// Switch the device at `path` off.
    pub fn turn_off(&self, path: &PositionPath) -> Result<(), GatewayError> {
        self.port.send(&Command::SwitchOff(path.clone()))?;
        self.report_on_off(path, false);
        Ok(())
    }

    /// Set a dimmer's brightness in percent.
    ///
    /// The resulting on/off transition is echoed like any other actuation,
    /// so rules tracking the dimmer see it come on and go out.
    pub fn set_brightness(&self, path: &PositionPath, percent: u8) -> Result<(), GatewayError> {
        let percent = percent.min(100);
        self.port.send(&Command::SetBrightness(path.clone(), percent))?;
        if let Some(mut device) = self.devices.get_mut(&path.id()) {
            device.state_mut().brightness = percent;
        }
        self.report_on_off(path, percent > 0);
        Ok(())
    }

    /// Snapshot of the listeners declaring `capability`, taken without
    /// holding the lock across the callbacks.
    fn listeners_with(&self, capability: Capability) -> Vec<Arc<dyn StatusListener>> {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners
            .iter()
            .filter(|l| l.capabilities().contains(&capability))
            .cloned()
            .collect()
    }
}
