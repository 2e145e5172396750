//! attrscope basic library
//!
//! Provides functions shared by the attrscope crates:
//! - logging bootstrap
//! - configuration value resolution (ENV > file > default)

pub mod config_loader;
pub mod logging;

pub use config_loader::{get_bool_config, get_config_value, parse_bool};
