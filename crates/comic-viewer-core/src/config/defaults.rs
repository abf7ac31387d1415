use crate::smooth_scroll::SMOOTH_SCROLL_RESTORE_DELAY_MS;

/// Upper bound on the overscan radius accepted from config.
pub(crate) const MAX_OVERSCAN: u32 = 32;
pub(crate) const MIN_ESTIMATED_PAGE_HEIGHT: f32 = 1.0;

pub(crate) fn default_estimated_page_height() -> f32 {
    1200.0
}

pub(crate) fn default_overscan() -> u32 {
    2
}

pub(crate) fn default_enable_snap() -> bool {
    false
}

pub(crate) fn default_client_width() -> f32 {
    900.0
}

pub(crate) fn default_client_height() -> f32 {
    1000.0
}

pub(crate) fn default_spread_mode() -> bool {
    false
}

pub(crate) fn default_smooth_scroll_restore_delay_ms() -> u64 {
    SMOOTH_SCROLL_RESTORE_DELAY_MS
}

pub(crate) fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    15
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
