//! Configuration loading helper functions
//! Provides utilities for loading configuration with fallback logic

use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, warn};

/// Get configuration value with priority: ENV > file > default
///
/// # Arguments
/// * `file_value` - Value from the configuration file, if it set one
/// * `env_var` - Environment variable name to check
/// * `default` - Default value to use as fallback
pub fn get_config_value<T>(file_value: Option<T>, env_var: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    // Priority 1: Environment variable
    if let Ok(env_str) = std::env::var(env_var) {
        match env_str.trim().parse::<T>() {
            Ok(val) => {
                debug!("Using {} from environment: {}", env_var, env_str);
                return val;
            },
            Err(e) => {
                warn!("Failed to parse {} from environment: {}", env_var, e);
            },
        }
    }

    // Priority 2: File value
    if let Some(val) = file_value {
        return val;
    }

    // Priority 3: Default value
    default
}

/// Parse an operator-style boolean: `true/false`, `1/0`, `on/off`, `yes/no`
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Boolean variant of [`get_config_value`] accepting [`parse_bool`] spellings
pub fn get_bool_config(file_value: Option<bool>, env_var: &str, default: bool) -> bool {
    if let Ok(env_str) = std::env::var(env_var) {
        match parse_bool(&env_str) {
            Some(val) => {
                debug!("Using {} from environment: {}", env_var, env_str);
                return val;
            },
            None => warn!("Failed to parse {} from environment: {}", env_var, env_str),
        }
    }
    file_value.unwrap_or(default)
}
