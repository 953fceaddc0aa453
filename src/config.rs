//! Configuration loader and validator
//!
//! Loads bridge configuration from TOML files in the configs/ directory.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::joycon::calibration::{DeadZone, DEFAULT_INNER_DEAD_ZONE, DEFAULT_OUTER_DEAD_ZONE};
use crate::joycon::constants::{
    POLL_TIMEOUT_MS, SUBCOMMAND_REPLY_ATTEMPTS, SUBCOMMAND_REPLY_TIMEOUT_MS,
};
use crate::joycon::controller::SessionOptions;
use crate::joycon::types::{ConnectionType, Hand};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Controllers to open, one session each
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

/// Settings shared by every session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// How the controllers are attached
    #[serde(default)]
    pub connection: ConnectionType,

    /// Deadline for each input report read
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: i32,

    /// Deadline for each read while waiting for a subcommand reply
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: i32,

    /// Reads to spend on one subcommand reply
    #[serde(default = "default_reply_attempt_limit")]
    pub reply_attempt_limit: usize,

    /// Stick inner dead zone (0.0 to 1.0)
    #[serde(default = "default_inner_dead_zone")]
    pub inner_dead_zone: f32,

    /// Stick outer dead zone (0.0 to 1.0)
    #[serde(default = "default_outer_dead_zone")]
    pub outer_dead_zone: f32,

    /// Print state as JSON lines instead of text
    #[serde(default)]
    pub print_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: ConnectionType::default(),
            poll_timeout_ms: default_poll_timeout_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
            reply_attempt_limit: default_reply_attempt_limit(),
            inner_dead_zone: default_inner_dead_zone(),
            outer_dead_zone: default_outer_dead_zone(),
            print_json: false,
        }
    }
}

fn default_poll_timeout_ms() -> i32 { POLL_TIMEOUT_MS }
fn default_reply_timeout_ms() -> i32 { SUBCOMMAND_REPLY_TIMEOUT_MS }
fn default_reply_attempt_limit() -> usize { SUBCOMMAND_REPLY_ATTEMPTS }
fn default_inner_dead_zone() -> f32 { DEFAULT_INNER_DEAD_ZONE }
fn default_outer_dead_zone() -> f32 { DEFAULT_OUTER_DEAD_ZONE }

/// One controller to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub hand: Hand,

    /// Player number shown on the LEDs (1 to 8)
    #[serde(default)]
    pub player: Option<u8>,

    /// Platform HID path, takes precedence over `serial`
    #[serde(default)]
    pub path: Option<String>,

    /// Serial number, to pick one of several identical controllers
    #[serde(default)]
    pub serial: Option<String>,
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        SessionOptions {
            connection: settings.connection,
            poll_timeout_ms: settings.poll_timeout_ms,
            reply_timeout_ms: settings.reply_timeout_ms,
            reply_attempt_limit: settings.reply_attempt_limit,
            dead_zone: DeadZone {
                inner: settings.inner_dead_zone,
                outer: settings.outer_dead_zone,
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::parse(&content)?;

        info!("✓ Config loaded");
        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        debug!("  - Connection: {:?}", config.settings.connection);
        debug!("  - Controllers: {}", config.controllers.len());

        config.validate()?;
        Ok(config)
    }

    /// Options for every session opened from this configuration
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::from(&self.settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;

        if settings.poll_timeout_ms <= 0 || settings.reply_timeout_ms <= 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }

        if settings.reply_attempt_limit == 0 {
            return Err(ConfigError::Invalid("reply_attempt_limit must be at least 1".into()));
        }

        if !(0.0..1.0).contains(&settings.inner_dead_zone) {
            return Err(ConfigError::Invalid(
                "inner_dead_zone must be between 0.0 and 1.0".into()
            ));
        }

        if !(0.0..1.0).contains(&settings.outer_dead_zone) {
            return Err(ConfigError::Invalid(
                "outer_dead_zone must be between 0.0 and 1.0".into()
            ));
        }

        if settings.inner_dead_zone + settings.outer_dead_zone >= 1.0 {
            return Err(ConfigError::Invalid(
                "inner_dead_zone and outer_dead_zone leave no usable stick range".into()
            ));
        }

        if self.controllers.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one controller is required".into()
            ));
        }

        let mut players = HashSet::new();
        for (index, controller) in self.controllers.iter().enumerate() {
            if controller.hand == Hand::None && controller.path.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "controllers[{}]: hand must be 'left' or 'right' unless a path is given",
                    index
                )));
            }

            if let Some(player) = controller.player {
                if !(1..=8).contains(&player) {
                    return Err(ConfigError::Invalid(format!(
                        "controllers[{}]: player must be between 1 and 8, got {}",
                        index, player
                    )));
                }
                if !players.insert(player) {
                    return Err(ConfigError::Invalid(format!(
                        "controllers[{}]: player {} is used twice",
                        index, player
                    )));
                }
            }
        }

        Ok(())
    }
}
