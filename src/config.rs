//! Engine configuration loaded from environment variables.
//!
//! Every value has a default; the environment can override it:
//! - `CLOB_INITIAL_CAPACITY`: resting-order slots pre-allocated at startup
//! - `CLOB_DEPTH_LEVELS`: default number of levels in depth snapshots
//! - `CLOB_PIN_TO_CORE`: pin the engine thread to the last CPU core

use std::str::FromStr;

use crate::error::{ClobError, Result};

const DEFAULT_INITIAL_CAPACITY: u32 = 1_000_000;
const DEFAULT_DEPTH_LEVELS: usize = 10;

/// Engine sizing and placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Arena nodes allocated up front. The arena still grows past this.
    pub initial_capacity: u32,
    /// Levels per side returned when the caller does not ask for a count
    pub depth_levels: usize,
    /// Pin the run loop to the last available core
    pub pin_to_core: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            depth_levels: DEFAULT_DEPTH_LEVELS,
            pin_to_core: false,
        }
    }
}

impl EngineConfig {
    /// Loads the configuration from the process environment.
    ///
    /// Unset or empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ClobError::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(non_empty_var)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = parse_var(&lookup, "CLOB_INITIAL_CAPACITY")? {
            if value == u32::MAX {
                return Err(ClobError::Config(
                    "CLOB_INITIAL_CAPACITY must be below u32::MAX".to_string(),
                ));
            }
            config.initial_capacity = value;
        }
        if let Some(value) = parse_var(&lookup, "CLOB_DEPTH_LEVELS")? {
            config.depth_levels = value;
        }
        if let Some(value) = lookup("CLOB_PIN_TO_CORE") {
            config.pin_to_core = parse_flag(&value).ok_or_else(|| {
                ClobError::Config(format!("CLOB_PIN_TO_CORE: expected a boolean, got {value:?}"))
            })?;
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ClobError::Config(format!("{name}: {e} (got {raw:?})"))),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
