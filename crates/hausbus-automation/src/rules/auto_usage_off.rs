//! Hard ceiling on continuous on-duration

use crate::logic::{Logic, LogicBinding, LogicContext};
use dashmap::DashMap;
use hausbus_core::{Capability, PositionPath};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Switches an actuator off after a fixed maximum on-duration,
/// independent of presence.
///
/// At most one delayed off-action is pending per device: a repeated
/// on-event replaces (cancels) the previous countdown, an off-event
/// cancels it outright.
pub struct AutoUsageOffLogic {
    positions: Vec<PositionPath>,
    max_usage: Duration,
    binding: LogicBinding,
    pending: Arc<DashMap<String, JoinHandle<()>>>,
}

impl AutoUsageOffLogic {
    pub fn at(max_usage: Duration, positions: Vec<PositionPath>) -> Arc<Self> {
        assert!(!positions.is_empty(), "rule needs at least one position");
        Arc::new(Self {
            positions,
            max_usage,
            binding: LogicBinding::new(),
            pending: Arc::new(DashMap::new()),
        })
    }

    fn cancel_pending(&self, device_id: &str) {
        if let Some((_, handle)) = self.pending.remove(device_id) {
            handle.abort();
        }
    }
}

impl Logic for AutoUsageOffLogic {
    fn name(&self) -> &str {
        "AutoUsageOff"
    }

    fn positions(&self) -> &[PositionPath] {
        &self.positions
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::OnOff]
    }

    fn bind(&self, ctx: LogicContext) {
        self.binding.bind(ctx);
    }

    fn stop(&self) {
        for entry in self.pending.iter() {
            entry.value().abort();
        }
        self.pending.clear();
    }

    fn on_off_changed(&self, path: &PositionPath, is_on: bool) {
        if !self.contains(path) {
            return;
        }
        let device_id = path.id();
        self.cancel_pending(&device_id);
        if !is_on {
            return;
        }

        let Some(ctx) = self.binding.context() else {
            return;
        };
        // Events may arrive from a gateway thread outside the runtime.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("No async runtime, cannot arm usage countdown for {}", path);
            return;
        };
        let devices = ctx.devices.clone();
        let pending = self.pending.clone();
        let path = path.clone();
        let max_usage = self.max_usage;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(max_usage).await;
            tracing::info!("Usage ceiling reached, switching off {}", path);
            if let Err(e) = devices.turn_off(&path) {
                tracing::error!("Usage off failed for {}: {}", path.path(), e);
            }
            pending.remove(&path.id());
        });
        self.pending.insert(device_id, handle);
    }
}
