//! Proportional dimmer control towards a target illuminance

use crate::logic::{Logic, LogicBinding, LogicContext};
use hausbus_core::{Capability, DeviceKind, PositionPath};
use std::sync::Arc;

/// Target illuminance presets per room use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLux {
    Night,
    Floor,
    LivingRoom,
    Office,
    WorkingPlace,
    DaylightBoost,
}

impl TargetLux {
    #[must_use]
    pub fn lux(self) -> f32 {
        match self {
            TargetLux::Night => 30.0,
            TargetLux::Floor => 100.0,
            TargetLux::LivingRoom => 250.0,
            TargetLux::Office => 500.0,
            TargetLux::WorkingPlace => 750.0,
            TargetLux::DaylightBoost => 900.0,
        }
    }
}

/// Bounded-step, deadbanded P-controller driving a dimmer towards a
/// target illuminance.
///
/// The clamp order is load-bearing: step clamp first, then the absolute
/// clamp into `[min_dim, 100]`, then the deadband gate deciding whether
/// to write at all. A dimmer at 0 % gets a fixed soft-start floor
/// instead of a proportional jump.
pub struct DimmerByLuxLogic {
    positions: Vec<PositionPath>,
    target_lux: f32,
    kp: f64,
    min_dim: u8,
    max_step: i32,
    deadband: i32,
    binding: LogicBinding,
}

impl DimmerByLuxLogic {
    /// Standard tuning: moderate proportional factor, 5 % floor so the
    /// light never fully drops out, 8 % maximum step, 2 % deadband.
    pub fn at(target: TargetLux, positions: Vec<PositionPath>) -> Arc<Self> {
        Self::with_tuning(target.lux(), 0.12, 5, 8, 2, positions)
    }

    pub fn with_tuning(
        target_lux: f32,
        kp: f64,
        min_dim: u8,
        max_step: i32,
        deadband: i32,
        positions: Vec<PositionPath>,
    ) -> Arc<Self> {
        assert!(!positions.is_empty(), "rule needs at least one position");
        Arc::new(Self {
            positions,
            target_lux,
            kp,
            min_dim,
            max_step,
            deadband,
            binding: LogicBinding::new(),
        })
    }

    fn regulate(&self, path: &PositionPath) {
        let Some(ctx) = self.binding.context() else {
            return;
        };
        let Some(dimmer) = ctx.devices.device_in_room(DeviceKind::Dimmer, path) else {
            return;
        };
        let Some(sensor) = ctx.devices.device_in_room(DeviceKind::LuxSensor, path) else {
            return;
        };

        let measured = sensor.current_lux();
        let current = i32::from(dimmer.brightness());

        // Soft start: do not jump straight up when switching on.
        if current == 0 {
            if let Err(e) = ctx.devices.set_brightness(dimmer.position_path(), self.min_dim) {
                tracing::error!("Soft start failed for {}: {}", path.path(), e);
            }
            return;
        }

        let error = f64::from(self.target_lux - measured);
        let delta = (self.kp * error).round() as i32;
        let delta = delta.clamp(-self.max_step, self.max_step);
        let new_level = (current + delta).clamp(i32::from(self.min_dim), 100);

        // Deadband against flicker.
        if (new_level - current).abs() >= self.deadband {
            tracing::debug!(
                "Dimming room {} from {}% to {}% (measured {} lx)",
                path.room(),
                current,
                new_level,
                measured
            );
            if let Err(e) = ctx
                .devices
                .set_brightness(dimmer.position_path(), new_level as u8)
            {
                tracing::error!("Dimming failed for {}: {}", path.path(), e);
            }
        }
    }
}

impl Logic for DimmerByLuxLogic {
    fn name(&self) -> &str {
        "DimmerByLux"
    }

    fn positions(&self) -> &[PositionPath] {
        &self.positions
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::OnOff, Capability::Illuminance]
    }

    fn bind(&self, ctx: LogicContext) {
        self.binding.bind(ctx);
    }

    fn on_off_changed(&self, path: &PositionPath, is_on: bool) {
        if !self.contains(path) || !is_on {
            return;
        }
        self.regulate(path);
    }

    fn illuminance_changed(&self, path: &PositionPath, _lux: f32) {
        if !self.in_scope_room(path) {
            return;
        }
        self.regulate(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::context;
    use hausbus_core::Device;

    fn office() -> PositionPath {
        PositionPath::new("home", "upper", "office")
    }

    fn dimmer() -> PositionPath {
        office().with_device("desk")
    }

    fn lux_sensor() -> PositionPath {
        office().with_device("lux")
    }

    fn setup(target_lux: f32) -> (Arc<DimmerByLuxLogic>, crate::logic::LogicContext) {
        let (ctx, devices, _) = context();
        devices.register(Device::new(DeviceKind::Dimmer, dimmer()));
        devices.register(Device::new(DeviceKind::LuxSensor, lux_sensor()));
        let rule = DimmerByLuxLogic::with_tuning(target_lux, 0.12, 5, 8, 2, vec![dimmer()]);
        rule.bind(ctx.clone());
        (rule, ctx)
    }

    fn brightness(ctx: &crate::logic::LogicContext) -> u8 {
        ctx.devices
            .device(DeviceKind::Dimmer, &dimmer())
            .unwrap()
            .brightness()
    }

    #[test]
    fn soft_start_from_zero_applies_the_floor() {
        let (rule, ctx) = setup(300.0);
        ctx.devices.report_lux(&lux_sensor(), 10.0);
        rule.on_off_changed(&dimmer(), true);
        assert_eq!(brightness(&ctx), 5);
    }

    #[test]
    fn step_is_clamped_before_the_absolute_clamp() {
        let (rule, ctx) = setup(300.0);
        ctx.devices.set_brightness(&dimmer(), 50).unwrap();
        ctx.devices.report_lux(&lux_sensor(), 200.0);

        // error = 100, raw delta = round(0.12 * 100) = 12, clamped to 8.
        rule.illuminance_changed(&lux_sensor(), 200.0);
        assert_eq!(brightness(&ctx), 58);
    }

    #[test]
    fn small_delta_inside_deadband_writes_nothing() {
        let (rule, ctx) = setup(300.0);
        ctx.devices.set_brightness(&dimmer(), 50).unwrap();
        // error = 8.3, delta = round(1.0) = 1, |1| < deadband 2.
        ctx.devices.report_lux(&lux_sensor(), 291.7);

        rule.illuminance_changed(&lux_sensor(), 291.7);
        assert_eq!(brightness(&ctx), 50);
    }

    #[test]
    fn bright_room_dims_down_but_never_below_floor() {
        let (rule, ctx) = setup(300.0);
        ctx.devices.set_brightness(&dimmer(), 9).unwrap();
        ctx.devices.report_lux(&lux_sensor(), 2000.0);

        // Huge negative error, step clamp -8, absolute clamp to min 5.
        rule.illuminance_changed(&lux_sensor(), 2000.0);
        assert_eq!(brightness(&ctx), 5);
    }

    #[test]
    fn level_never_exceeds_one_hundred() {
        let (rule, ctx) = setup(900.0);
        ctx.devices.set_brightness(&dimmer(), 98).unwrap();
        ctx.devices.report_lux(&lux_sensor(), 100.0);

        rule.illuminance_changed(&lux_sensor(), 100.0);
        assert_eq!(brightness(&ctx), 100);
    }

    #[test]
    fn off_event_does_not_regulate() {
        let (rule, ctx) = setup(300.0);
        ctx.devices.set_brightness(&dimmer(), 50).unwrap();
        ctx.devices.report_lux(&lux_sensor(), 100.0);

        rule.on_off_changed(&dimmer(), false);
        assert_eq!(brightness(&ctx), 50);
    }
}
