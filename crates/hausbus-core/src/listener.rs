//! Capability-typed status notification contracts

use crate::path::PositionPath;

/// Event capabilities a listener can declare.
///
/// The registry only delivers an event kind to listeners that declare the
/// matching capability, so a listener never receives events it has no
/// handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Presence,
    OnOff,
    Illuminance,
}

/// Receiver of device status changes.
///
/// Handlers default to no-ops; implementors override exactly the handlers
/// for the capabilities they declare. Handlers may be called concurrently
/// from gateway ingestion and from actuation echoes.
pub trait StatusListener: Send + Sync {
    /// Stable identity used for listener removal.
    fn listener_id(&self) -> String;

    /// Event kinds this listener handles.
    fn capabilities(&self) -> &'static [Capability];

    fn presence_changed(&self, _path: &PositionPath, _present: bool) {}

    fn on_off_changed(&self, _path: &PositionPath, _is_on: bool) {}

    fn illuminance_changed(&self, _path: &PositionPath, _lux: f32) {}
}
