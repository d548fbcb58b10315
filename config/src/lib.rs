//! Configuration types and loading for dshift.
//!
//! The configuration describes a source and a target database together with the tables
//! that should be shifted between them. It is loaded from a YAML or JSON file and can be
//! overridden with `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config_from_path};
