//! Switch a room's plug on when presence is detected

use crate::logic::{Logic, LogicBinding, LogicContext};
use hausbus_core::{Capability, DeviceKind, PositionPath};
use std::sync::Arc;

/// Turns on the room's plug whenever presence is detected. Has no off
/// logic of its own; pair it with [`AutoPresenceOffLogic`] or
/// [`AutoUsageOffLogic`].
///
/// [`AutoPresenceOffLogic`]: crate::rules::AutoPresenceOffLogic
/// [`AutoUsageOffLogic`]: crate::rules::AutoUsageOffLogic
pub struct AutoPlugOnLogic {
    positions: Vec<PositionPath>,
    binding: LogicBinding,
}

impl AutoPlugOnLogic {
    pub fn at(positions: Vec<PositionPath>) -> Arc<Self> {
        assert!(!positions.is_empty(), "rule needs at least one position");
        Arc::new(Self {
            positions,
            binding: LogicBinding::new(),
        })
    }
}

impl Logic for AutoPlugOnLogic {
    fn name(&self) -> &str {
        "AutoPlugOn"
    }

    fn positions(&self) -> &[PositionPath] {
        &self.positions
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Presence]
    }

    fn bind(&self, ctx: LogicContext) {
        self.binding.bind(ctx);
    }

    fn presence_changed(&self, path: &PositionPath, present: bool) {
        if !self.in_scope_room(path) || !present {
            return;
        }
        let Some(ctx) = self.binding.context() else {
            return;
        };
        let Some(plug) = ctx.devices.device_in_room(DeviceKind::Plug, path) else {
            return;
        };
        if let Err(e) = ctx.devices.turn_on(plug.position_path()) {
            tracing::error!("Switching on plug failed for {}: {}", path.path(), e);
        }
    }
}
