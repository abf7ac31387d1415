use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout of `conf/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    viewport: ViewportTable,
    #[serde(default)]
    reader: ReaderTable,
    #[serde(default)]
    server: ServerTable,
    #[serde(default)]
    logging: LoggingTable,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            estimated_page_height: tables.viewport.estimated_page_height,
            overscan: tables.viewport.overscan,
            enable_snap: tables.viewport.enable_snap,
            client_width: tables.viewport.client_width,
            client_height: tables.viewport.client_height,
            spread_mode: tables.reader.spread_mode,
            smooth_scroll_restore_delay_ms: tables.reader.smooth_scroll_restore_delay_ms,
            base_url: tables.server.base_url,
            request_timeout_secs: tables.server.request_timeout_secs,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            viewport: ViewportTable {
                estimated_page_height: config.estimated_page_height,
                overscan: config.overscan,
                enable_snap: config.enable_snap,
                client_width: config.client_width,
                client_height: config.client_height,
            },
            reader: ReaderTable {
                spread_mode: config.spread_mode,
                smooth_scroll_restore_delay_ms: config.smooth_scroll_restore_delay_ms,
            },
            server: ServerTable {
                base_url: config.base_url.clone(),
                request_timeout_secs: config.request_timeout_secs,
            },
            logging: LoggingTable {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ViewportTable {
    #[serde(default = "defaults::default_estimated_page_height")]
    estimated_page_height: f32,
    #[serde(default = "defaults::default_overscan")]
    overscan: u32,
    #[serde(default = "defaults::default_enable_snap")]
    enable_snap: bool,
    #[serde(default = "defaults::default_client_width")]
    client_width: f32,
    #[serde(default = "defaults::default_client_height")]
    client_height: f32,
}

impl Default for ViewportTable {
    fn default() -> Self {
        ViewportTable {
            estimated_page_height: defaults::default_estimated_page_height(),
            overscan: defaults::default_overscan(),
            enable_snap: defaults::default_enable_snap(),
            client_width: defaults::default_client_width(),
            client_height: defaults::default_client_height(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReaderTable {
    #[serde(default = "defaults::default_spread_mode")]
    spread_mode: bool,
    #[serde(default = "defaults::default_smooth_scroll_restore_delay_ms")]
    smooth_scroll_restore_delay_ms: u64,
}

impl Default for ReaderTable {
    fn default() -> Self {
        ReaderTable {
            spread_mode: defaults::default_spread_mode(),
            smooth_scroll_restore_delay_ms: defaults::default_smooth_scroll_restore_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ServerTable {
    #[serde(default = "defaults::default_base_url")]
    base_url: String,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for ServerTable {
    fn default() -> Self {
        ServerTable {
            base_url: defaults::default_base_url(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingTable {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingTable {
    fn default() -> Self {
        LoggingTable {
            log_level: defaults::default_log_level(),
        }
    }
}
