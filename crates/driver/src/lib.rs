//! Sensor-side script loading for sensorasm.
//!
//! A [`SessionRegistry`] maps each open sensor to its currently loaded
//! firmware image. Callers own the registry and pass it to whatever needs
//! it; there is no process-wide sensor table.
//!
//! # Example
//!
//! ```
//! use sensorasm_driver::{SensorId, SessionRegistry};
//!
//! let mut registry = SessionRegistry::new();
//! registry.open(SensorId(0), "ov5640").unwrap();
//!
//! let script = b".function init\nWI2C $0x3008, $0x82, $1\n.endfunction\n";
//! let image = registry.load_script(SensorId(0), script).unwrap();
//! assert_eq!(image.function("init"), Some(0));
//! ```

pub mod session;

// Re-export commonly used types
pub use session::{
    DriverError, RegistryConfig, Result, SensorId, SensorSession, SessionRegistry,
};
