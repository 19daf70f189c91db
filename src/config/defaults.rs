pub(crate) fn default_max_rendered_segments() -> usize {
    140
}

pub(crate) fn default_virtual_buffer() -> usize {
    24
}

pub(crate) fn default_virtual_threshold() -> usize {
    40
}

pub(crate) fn default_initial_average_height() -> f64 {
    32.0
}

pub(crate) fn default_frame_interval_ms() -> u64 {
    16
}

pub(crate) fn default_retry_interval_ms() -> u64 {
    80
}

pub(crate) fn default_max_attempts() -> u32 {
    20
}

pub(crate) fn default_stability_epsilon_px() -> f64 {
    0.5
}

pub(crate) fn default_save_debounce_ms() -> u64 {
    1000
}

pub(crate) fn default_window_width() -> f32 {
    1024.0
}

pub(crate) fn default_window_height() -> f32 {
    768.0
}

pub(crate) fn default_font_size() -> u32 {
    18
}

pub(crate) fn default_line_spacing() -> f32 {
    1.4
}

pub(crate) fn default_paragraph_spacing() -> f32 {
    8.0
}

pub(crate) fn default_namespace() -> String {
    "lanternleaf.reader".to_string()
}

pub(crate) fn default_cache_dir() -> String {
    ".cache/reader-state".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
