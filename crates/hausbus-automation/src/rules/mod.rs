//! Library of concrete automation rules

mod auto_light_on;
mod auto_plug_on;
mod auto_presence_off;
mod auto_usage_off;
mod dimmer_by_lux;

pub use auto_light_on::AutoLightOnLogic;
pub use auto_plug_on::AutoPlugOnLogic;
pub use auto_presence_off::AutoPresenceOffLogic;
pub use auto_usage_off::AutoUsageOffLogic;
pub use dimmer_by_lux::{DimmerByLuxLogic, TargetLux};
