//! KNX device representation

use crate::path::PositionPath;
use serde::{Deserialize, Serialize};

/// Device classes known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Light,
    Dimmer,
    Plug,
    PresenceSensor,
    LuxSensor,
}

/// Last known state of a device.
///
/// Only the fields relevant to the device kind carry meaning; the rest
/// keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceState {
    /// On/off state for lights, dimmers and plugs.
    #[serde(default)]
    pub on: bool,
    /// Dimmer brightness in percent (0-100).
    #[serde(default)]
    pub brightness: u8,
    /// Last measured illuminance for lux sensors.
    #[serde(default)]
    pub lux: f32,
    /// Last reported presence for presence sensors.
    #[serde(default)]
    pub present: bool,
}

/// A device on the bus, addressed by its [`PositionPath`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    path: PositionPath,
    kind: DeviceKind,
    #[serde(default)]
    state: DeviceState,
}

impl Device {
    pub fn new(kind: DeviceKind, path: PositionPath) -> Self {
        Self {
            path,
            kind,
            state: DeviceState::default(),
        }
    }

    #[must_use]
    pub fn position_path(&self) -> &PositionPath {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.on
    }

    #[must_use]
    pub fn brightness(&self) -> u8 {
        self.state.brightness
    }

    #[must_use]
    pub fn current_lux(&self) -> f32 {
        self.state.lux
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.state.present
    }

    pub(crate) fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}
