//! Switch a room's light on when presence is detected

use crate::logic::{Logic, LogicBinding, LogicContext};
use dashmap::DashMap;
use hausbus_core::{Capability, DeviceKind, PositionPath};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Window during which a repeated presence event does not re-actuate a
/// light that was just switched on.
const IGNORE_WINDOW: Duration = Duration::from_secs(10);

/// Turns on a light in the room where presence was detected.
///
/// With a minimum-illuminance threshold configured the light only comes
/// on while the room measures at or under that threshold; illuminance
/// changes re-evaluate the rule while presence is active, so a room
/// darkening around someone already inside still lights up.
pub struct AutoLightOnLogic {
    positions: Vec<PositionPath>,
    min_lux: f32,
    binding: LogicBinding,
    recently_lit: DashMap<String, Instant>,
}

impl AutoLightOnLogic {
    /// Rule without an illuminance gate: presence always turns the light on.
    pub fn at(positions: Vec<PositionPath>) -> Arc<Self> {
        Self::with_min_lux(0.0, positions)
    }

    /// Rule gated on measured illuminance at or under `min_lux`.
    pub fn with_min_lux(min_lux: f32, positions: Vec<PositionPath>) -> Arc<Self> {
        assert!(!positions.is_empty(), "rule needs at least one position");
        Arc::new(Self {
            positions,
            min_lux,
            binding: LogicBinding::new(),
            recently_lit: DashMap::new(),
        })
    }

    fn switch_on_by_lux(&self, path: &PositionPath) {
        let Some(ctx) = self.binding.context() else {
            return;
        };

        let room = path.room_id();
        if let Some(last) = self.recently_lit.get(&room) {
            if last.elapsed() < IGNORE_WINDOW {
                tracing::debug!("Light in room {} recently actuated, ignoring", path.room());
                return;
            }
        }

        let Some(light) = ctx.devices.device_in_room(DeviceKind::Light, path) else {
            return;
        };
        if self.min_lux > 0.0 {
            if let Some(sensor) = ctx.devices.device_in_room(DeviceKind::LuxSensor, path) {
                if sensor.current_lux() > self.min_lux {
                    return;
                }
            }
        }

        tracing::info!("Switching on light in room {}", path.room());
        match ctx.devices.turn_on(light.position_path()) {
            Ok(()) => {
                self.recently_lit.insert(room, Instant::now());
            }
            Err(e) => {
                tracing::error!("Switching on light failed for {}: {}", path.path(), e);
            }
        }
    }
}

impl Logic for AutoLightOnLogic {
    fn name(&self) -> &str {
        "AutoLightOn"
    }

    fn positions(&self) -> &[PositionPath] {
        &self.positions
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Presence, Capability::Illuminance]
    }

    fn bind(&self, ctx: LogicContext) {
        self.binding.bind(ctx);
    }

    fn presence_changed(&self, path: &PositionPath, present: bool) {
        if !self.in_scope_room(path) {
            return;
        }
        if present {
            self.switch_on_by_lux(path);
        }
    }

    fn illuminance_changed(&self, path: &PositionPath, _lux: f32) {
        if !self.in_scope_room(path) || self.min_lux <= 0.0 {
            return;
        }
        let Some(ctx) = self.binding.context() else {
            return;
        };
        // Re-evaluate only while someone is actually in the room.
        let present = ctx
            .devices
            .device_in_room(DeviceKind::PresenceSensor, path)
            .is_some_and(|sensor| sensor.is_present());
        if present {
            self.switch_on_by_lux(path);
        }
    }
}
