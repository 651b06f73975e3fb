//! Typed views over Flexit GO responses.

pub mod device;
pub mod mode;
pub mod plant;
pub mod sensors;
pub mod values;

pub use device::DeviceInfo;
pub use mode::{ModeChange, ModeWrite, PresetMode, VentilationMode};
pub use plant::Plant;
pub(crate) use plant::PlantsResponse;
pub use sensors::{FilterStatus, SensorReadings};
pub use values::DatapointValues;
