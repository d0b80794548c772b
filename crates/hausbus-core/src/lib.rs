//! KNX device abstraction layer
//!
//! This crate provides the hierarchical position addressing, the device
//! model with capability-typed status events, and the in-memory device
//! registry that sits between the BAOS gateway and the automation rules.

pub mod device;
pub mod gateway;
pub mod listener;
pub mod path;
pub mod registry;

pub use device::{Device, DeviceKind};
pub use gateway::{Command, CommandPort, GatewayError, NullCommandPort};
pub use listener::{Capability, StatusListener};
pub use path::PositionPath;
pub use registry::DeviceRegistry;
