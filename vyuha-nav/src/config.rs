//! Configuration loading for VyuhaNav.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::NavError;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct NavConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
}

/// Network connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Robot host address (default: 127.0.0.1 for a local bridge)
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port number (default: 7777)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection timeout in milliseconds (default: 5000)
    #[serde(default = "default_connect_timeout")]
    pub timeout_ms: u64,
}

/// Robot calibration parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct RobotConfig {
    /// Encoder pulses for one 25cm cell advance.
    /// CM_PER_PULSE = pi*5/30 ~ 0.5236 cm, 25 / 0.5236 ~ 47.7; tuned on
    /// the real robot to 46.
    #[serde(default = "default_pulses_per_cell")]
    pub pulses_per_cell: u32,

    /// Encoder pulses for one 90° point turn.
    /// Arc = pi*15/4 ~ 11.78 cm, ~23 theoretical; tuned to 30.
    #[serde(default = "default_pulses_per_turn")]
    pub pulses_per_turn: u32,

    /// Motor speed setting sent as `V<n>` (default: 150)
    #[serde(default = "default_speed")]
    pub speed: u16,
}

/// Route execution timing.
#[derive(Clone, Debug, Deserialize)]
pub struct RouteConfig {
    /// Encoder wait timeout for one 90° turn (default: 5000)
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_ms: u64,

    /// Encoder wait timeout for one cell advance (default: 8000)
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout_ms: u64,

    /// Settle delay after stop commands and odometry reset (default: 350)
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Settle delay after zeroing the step counter (default: 100)
    #[serde(default = "default_zero_settle")]
    pub zero_settle_ms: u64,

    /// Settle delay after a completed forward move (default: 300)
    #[serde(default = "default_post_forward_settle")]
    pub post_forward_settle_ms: u64,
}

/// Autonomous mapping phase settings.
#[derive(Clone, Debug, Deserialize)]
pub struct MappingConfig {
    /// Seconds without a new cell before mapping is considered done.
    #[serde(default = "default_idle_stop")]
    pub idle_stop_secs: f32,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7777
}
fn default_connect_timeout() -> u64 {
    5000
}
fn default_pulses_per_cell() -> u32 {
    46
}
fn default_pulses_per_turn() -> u32 {
    30
}
fn default_speed() -> u16 {
    150
}
fn default_turn_timeout() -> u64 {
    5000
}
fn default_forward_timeout() -> u64 {
    8000
}
fn default_settle() -> u64 {
    350
}
fn default_zero_settle() -> u64 {
    100
}
fn default_post_forward_settle() -> u64 {
    300
}
fn default_idle_stop() -> f32 {
    8.0
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_connect_timeout(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            pulses_per_cell: default_pulses_per_cell(),
            pulses_per_turn: default_pulses_per_turn(),
            speed: default_speed(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            turn_timeout_ms: default_turn_timeout(),
            forward_timeout_ms: default_forward_timeout(),
            settle_ms: default_settle(),
            zero_settle_ms: default_zero_settle(),
            post_forward_settle_ms: default_post_forward_settle(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            idle_stop_secs: default_idle_stop(),
        }
    }
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            robot: RobotConfig::default(),
            route: RouteConfig::default(),
            mapping: MappingConfig::default(),
        }
    }
}

impl NavConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: NavConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the full address string for connection
    pub fn address(&self) -> String {
        format!("{}:{}", self.connection.host, self.connection.port)
    }
}

impl RouteConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NavConfig::default();
        assert_eq!(config.robot.pulses_per_cell, 46);
        assert_eq!(config.robot.pulses_per_turn, 30);
        assert_eq!(config.route.turn_timeout_ms, 5000);
        assert_eq!(config.route.forward_timeout_ms, 8000);
        assert_eq!(config.address(), "127.0.0.1:7777");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml_str = r#"
            [connection]
            host = "10.0.0.42"

            [robot]
            pulses_per_cell = 50
        "#;
        let config: NavConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.host, "10.0.0.42");
        assert_eq!(config.connection.port, 7777);
        assert_eq!(config.robot.pulses_per_cell, 50);
        assert_eq!(config.robot.speed, 150);
        assert_eq!(config.mapping.idle_stop_secs, 8.0);
    }
}
