//! Global configuration types for Blocktask.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! HTTP server, editor layout defaults, and telemetry.

use serde::{Deserialize, Serialize};

use crate::block::Position;

/// Top-level configuration.
///
/// Loaded from `~/.blocktask/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub layout: LayoutDefaults,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Canvas position given to root blocks that arrive without one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutDefaults {
    #[serde(default = "default_x")]
    pub x: f64,
    #[serde(default = "default_y")]
    pub y: f64,
    /// Vertical gap between successive root chains placed on load.
    #[serde(default = "default_row_gap")]
    pub row_gap: f64,
}

fn default_x() -> f64 {
    200.0
}

fn default_y() -> f64 {
    100.0
}

fn default_row_gap() -> f64 {
    150.0
}

impl Default for LayoutDefaults {
    fn default() -> Self {
        Self {
            x: default_x(),
            y: default_y(),
            row_gap: default_row_gap(),
        }
    }
}

impl LayoutDefaults {
    /// Position of the `index`-th root chain.
    pub fn position(&self, index: usize) -> Position {
        Position {
            x: self.x,
            y: self.y + self.row_gap * index as f64,
        }
    }
}

/// Tracing export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}
