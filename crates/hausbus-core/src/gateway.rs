//! BAOS gateway command boundary

use crate::path::PositionPath;
use thiserror::Error;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Gateway not connected")]
    NotConnected,

    #[error("Transmit failed: {0}")]
    Transmit(String),
}

/// Actuation commands sent towards the physical bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SwitchOn(PositionPath),
    SwitchOff(PositionPath),
    /// Brightness in percent (0-100).
    SetBrightness(PositionPath, u8),
}

/// Outbound command sink towards the KNX/BAOS gateway.
///
/// The wire protocol lives behind this trait; the automation core only
/// ever sees `send`.
pub trait CommandPort: Send + Sync {
    fn send(&self, command: &Command) -> Result<(), GatewayError>;
}

/// Command port that only logs, for tests and dry-run deployments.
#[derive(Debug, Default)]
pub struct NullCommandPort;

impl CommandPort for NullCommandPort {
    fn send(&self, command: &Command) -> Result<(), GatewayError> {
        tracing::debug!("Dropping command {:?} (no gateway attached)", command);
        Ok(())
    }
}
