use super::defaults::{MAX_OVERSCAN, MIN_ESTIMATED_PAGE_HEIGHT};
use serde::Deserialize;
use std::time::Duration;

/// High-level viewer configuration; deserializable from TOML.
///
/// This flat form is what per-book override files store. The on-disk base
/// config uses the sectioned layout in `tables.rs`.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_estimated_page_height")]
    pub estimated_page_height: f32,
    #[serde(default = "crate::config::defaults::default_overscan")]
    pub overscan: u32,
    #[serde(default = "crate::config::defaults::default_enable_snap")]
    pub enable_snap: bool,
    #[serde(default = "crate::config::defaults::default_client_width")]
    pub client_width: f32,
    #[serde(default = "crate::config::defaults::default_client_height")]
    pub client_height: f32,
    #[serde(default = "crate::config::defaults::default_spread_mode")]
    pub spread_mode: bool,
    #[serde(default = "crate::config::defaults::default_smooth_scroll_restore_delay_ms")]
    pub smooth_scroll_restore_delay_ms: u64,
    #[serde(default = "crate::config::defaults::default_base_url")]
    pub base_url: String,
    #[serde(default = "crate::config::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            estimated_page_height: crate::config::defaults::default_estimated_page_height(),
            overscan: crate::config::defaults::default_overscan(),
            enable_snap: crate::config::defaults::default_enable_snap(),
            client_width: crate::config::defaults::default_client_width(),
            client_height: crate::config::defaults::default_client_height(),
            spread_mode: crate::config::defaults::default_spread_mode(),
            smooth_scroll_restore_delay_ms:
                crate::config::defaults::default_smooth_scroll_restore_delay_ms(),
            base_url: crate::config::defaults::default_base_url(),
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Clamp values into ranges the viewport can work with.
    pub fn sanitized(mut self) -> Self {
        self.estimated_page_height = if self.estimated_page_height.is_finite() {
            self.estimated_page_height.max(MIN_ESTIMATED_PAGE_HEIGHT)
        } else {
            crate::config::defaults::default_estimated_page_height()
        };
        self.overscan = self.overscan.min(MAX_OVERSCAN);
        self.client_width = sanitize_extent(self.client_width);
        self.client_height = sanitize_extent(self.client_height);
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.smooth_scroll_restore_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let config = AppConfig {
            estimated_page_height: -5.0,
            overscan: 500,
            client_width: f32::NAN,
            base_url: " http://host:8000/ ".to_string(),
            ..AppConfig::default()
        }
        .sanitized();

        assert_eq!(config.estimated_page_height, 1.0);
        assert_eq!(config.overscan, 32);
        assert_eq!(config.client_width, 0.0);
        assert_eq!(config.base_url, "http://host:8000");
    }

    #[test]
    fn flat_form_fills_missing_fields() {
        let config: AppConfig = toml::from_str("overscan = 4\nspread_mode = true\n").expect("parse");
        assert_eq!(config.overscan, 4);
        assert!(config.spread_mode);
        assert_eq!(config.smooth_scroll_restore_delay_ms, 500);
        assert_eq!(config.log_level, LogLevel::Debug);
    }
}
