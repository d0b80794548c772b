//! Logic contract: stateful automation units bound to positions

use crate::services::ServiceProviders;
use crate::statistics::StatisticsStore;
use hausbus_core::{Capability, DeviceRegistry, PositionPath};
use std::sync::{Arc, OnceLock};

/// Collaborators handed to a logic instance when the engine registers it.
#[derive(Clone)]
pub struct LogicContext {
    pub devices: Arc<DeviceRegistry>,
    pub services: Arc<ServiceProviders>,
    pub statistics: Arc<dyn StatisticsStore>,
}

/// A stateful automation rule bound to one or more positions.
///
/// Instances are created by a rule's `at(..)` factory, bound to their
/// collaborators and started by the [`LogicEngine`](crate::engine::LogicEngine),
/// and receive device events through capability-gated dispatch. `stop()`
/// must release every timer the instance owns; a callback firing after
/// `stop()` has to be a no-op.
pub trait Logic: Send + Sync {
    fn name(&self) -> &str;

    /// Configured scope. Factories guarantee this is non-empty.
    fn positions(&self) -> &[PositionPath];

    /// Event kinds this rule handles.
    fn capabilities(&self) -> &'static [Capability];

    /// Called by the engine before `start()`.
    fn bind(&self, ctx: LogicContext);

    fn start(&self) {}

    fn stop(&self) {}

    fn presence_changed(&self, _path: &PositionPath, _present: bool) {}

    fn on_off_changed(&self, _path: &PositionPath, _is_on: bool) {}

    fn illuminance_changed(&self, _path: &PositionPath, _lux: f32) {}

    /// Exact-path membership in the configured scope.
    fn contains(&self, path: &PositionPath) -> bool {
        self.positions().iter().any(|p| p.is_same(path))
    }

    /// Room-granularity membership in the configured scope.
    fn in_scope_room(&self, path: &PositionPath) -> bool {
        self.positions().iter().any(|p| p.same_room(path))
    }

    /// Identity test used for idempotent registration: same name
    /// (case-insensitive) and the probe path inside the configured scope.
    fn has_identity(&self, path: &PositionPath, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name) && self.contains(path)
    }

    /// Stable id derived from name and primary position.
    fn id(&self) -> String {
        let position = self
            .positions()
            .first()
            .map(PositionPath::id)
            .unwrap_or_default();
        format!("{}@{}", self.name(), position)
    }
}

/// Late-bound collaborator slot embedded by every rule.
///
/// Set once at registration; handlers that run before binding (which the
/// engine never does) fall through as no-ops.
#[derive(Default)]
pub struct LogicBinding {
    ctx: OnceLock<LogicContext>,
}

impl LogicBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, ctx: LogicContext) {
        if self.ctx.set(ctx).is_err() {
            tracing::debug!("Logic already bound, keeping existing context");
        }
    }

    #[must_use]
    pub fn context(&self) -> Option<&LogicContext> {
        self.ctx.get()
    }
}
