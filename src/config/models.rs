use serde::Deserialize;
use std::time::Duration;

/// Reading-view configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct ReaderConfig {
    #[serde(default = "crate::config::defaults::default_max_rendered_segments")]
    pub max_rendered_segments: usize,
    #[serde(default = "crate::config::defaults::default_virtual_buffer")]
    pub virtual_buffer: usize,
    #[serde(default = "crate::config::defaults::default_virtual_threshold")]
    pub virtual_threshold: usize,
    #[serde(default = "crate::config::defaults::default_initial_average_height")]
    pub initial_average_height: f64,
    #[serde(default = "crate::config::defaults::default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "crate::config::defaults::default_stability_epsilon_px")]
    pub stability_epsilon_px: f64,
    #[serde(default = "crate::config::defaults::default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    #[serde(default = "crate::config::defaults::default_window_width")]
    pub window_width: f32,
    #[serde(default = "crate::config::defaults::default_window_height")]
    pub window_height: f32,
    #[serde(default = "crate::config::defaults::default_font_size")]
    pub font_size: u32,
    #[serde(default = "crate::config::defaults::default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "crate::config::defaults::default_paragraph_spacing")]
    pub paragraph_spacing: f32,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "crate::config::defaults::default_namespace")]
    pub namespace: String,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        use crate::config::defaults::*;
        ReaderConfig {
            max_rendered_segments: default_max_rendered_segments(),
            virtual_buffer: default_virtual_buffer(),
            virtual_threshold: default_virtual_threshold(),
            initial_average_height: default_initial_average_height(),
            frame_interval_ms: default_frame_interval_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: default_max_attempts(),
            stability_epsilon_px: default_stability_epsilon_px(),
            save_debounce_ms: default_save_debounce_ms(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            paragraph_spacing: default_paragraph_spacing(),
            language: Language::default(),
            namespace: default_namespace(),
            cache_dir: default_cache_dir(),
            log_level: default_log_level(),
        }
    }
}

impl ReaderConfig {
    /// Clamp values that would break the windowing or retry math.
    pub fn sanitized(mut self) -> Self {
        use crate::config::defaults::*;
        self.max_rendered_segments = self.max_rendered_segments.max(1);
        if self.virtual_buffer >= self.max_rendered_segments {
            self.virtual_buffer = self.max_rendered_segments / 2;
        }
        self.virtual_threshold = self.virtual_threshold.min(self.max_rendered_segments);
        if !self.initial_average_height.is_finite() || self.initial_average_height <= 0.0 {
            self.initial_average_height = default_initial_average_height();
        }
        self.frame_interval_ms = self.frame_interval_ms.max(1);
        self.retry_interval_ms = self.retry_interval_ms.max(1);
        self.max_attempts = self.max_attempts.max(1);
        if !self.stability_epsilon_px.is_finite() || self.stability_epsilon_px < 0.0 {
            self.stability_epsilon_px = default_stability_epsilon_px();
        }
        if !self.window_width.is_finite() || self.window_width < 1.0 {
            self.window_width = default_window_width();
        }
        if !self.window_height.is_finite() || self.window_height < 1.0 {
            self.window_height = default_window_height();
        }
        self.font_size = self.font_size.clamp(8, 72);
        if !self.line_spacing.is_finite() {
            self.line_spacing = default_line_spacing();
        }
        self.line_spacing = self.line_spacing.clamp(0.8, 3.0);
        if !self.paragraph_spacing.is_finite() || self.paragraph_spacing < 0.0 {
            self.paragraph_spacing = default_paragraph_spacing();
        }
        if self.namespace.trim().is_empty() {
            self.namespace = default_namespace();
        }
        self
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

/// Word pattern used when wrapping tokens into lookup spans.
#[derive(Debug, Clone, Copy, Default, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Default, Deserialize, serde::Serialize, PartialEq, Eq)]
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
