use super::defaults;
use super::models::{Language, LogLevel, ReaderConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    virtualization: VirtualizationConfig,
    #[serde(default)]
    restoration: RestorationConfig,
    #[serde(default)]
    progress: ProgressConfig,
    #[serde(default)]
    layout: LayoutConfig,
    #[serde(default)]
    text: TextConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for ReaderConfig {
    fn from(tables: ConfigTables) -> Self {
        ReaderConfig {
            max_rendered_segments: tables.virtualization.max_rendered_segments,
            virtual_buffer: tables.virtualization.virtual_buffer,
            virtual_threshold: tables.virtualization.virtual_threshold,
            initial_average_height: tables.virtualization.initial_average_height,
            frame_interval_ms: tables.restoration.frame_interval_ms,
            retry_interval_ms: tables.restoration.retry_interval_ms,
            max_attempts: tables.restoration.max_attempts,
            stability_epsilon_px: tables.restoration.stability_epsilon_px,
            save_debounce_ms: tables.progress.save_debounce_ms,
            window_width: tables.layout.window_width,
            window_height: tables.layout.window_height,
            font_size: tables.layout.font_size,
            line_spacing: tables.layout.line_spacing,
            paragraph_spacing: tables.layout.paragraph_spacing,
            language: tables.text.language,
            namespace: tables.storage.namespace,
            cache_dir: tables.storage.cache_dir,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&ReaderConfig> for ConfigTables {
    fn from(config: &ReaderConfig) -> Self {
        ConfigTables {
            virtualization: VirtualizationConfig {
                max_rendered_segments: config.max_rendered_segments,
                virtual_buffer: config.virtual_buffer,
                virtual_threshold: config.virtual_threshold,
                initial_average_height: config.initial_average_height,
            },
            restoration: RestorationConfig {
                frame_interval_ms: config.frame_interval_ms,
                retry_interval_ms: config.retry_interval_ms,
                max_attempts: config.max_attempts,
                stability_epsilon_px: config.stability_epsilon_px,
            },
            progress: ProgressConfig {
                save_debounce_ms: config.save_debounce_ms,
            },
            layout: LayoutConfig {
                window_width: config.window_width,
                window_height: config.window_height,
                font_size: config.font_size,
                line_spacing: config.line_spacing,
                paragraph_spacing: config.paragraph_spacing,
            },
            text: TextConfig {
                language: config.language,
            },
            storage: StorageConfig {
                namespace: config.namespace.clone(),
                cache_dir: config.cache_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct VirtualizationConfig {
    #[serde(default = "defaults::default_max_rendered_segments")]
    max_rendered_segments: usize,
    #[serde(default = "defaults::default_virtual_buffer")]
    virtual_buffer: usize,
    #[serde(default = "defaults::default_virtual_threshold")]
    virtual_threshold: usize,
    #[serde(default = "defaults::default_initial_average_height")]
    initial_average_height: f64,
}

impl Default for VirtualizationConfig {
    fn default() -> Self {
        VirtualizationConfig {
            max_rendered_segments: defaults::default_max_rendered_segments(),
            virtual_buffer: defaults::default_virtual_buffer(),
            virtual_threshold: defaults::default_virtual_threshold(),
            initial_average_height: defaults::default_initial_average_height(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct RestorationConfig {
    #[serde(default = "defaults::default_frame_interval_ms")]
    frame_interval_ms: u64,
    #[serde(default = "defaults::default_retry_interval_ms")]
    retry_interval_ms: u64,
    #[serde(default = "defaults::default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "defaults::default_stability_epsilon_px")]
    stability_epsilon_px: f64,
}

impl Default for RestorationConfig {
    fn default() -> Self {
        RestorationConfig {
            frame_interval_ms: defaults::default_frame_interval_ms(),
            retry_interval_ms: defaults::default_retry_interval_ms(),
            max_attempts: defaults::default_max_attempts(),
            stability_epsilon_px: defaults::default_stability_epsilon_px(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ProgressConfig {
    #[serde(default = "defaults::default_save_debounce_ms")]
    save_debounce_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            save_debounce_ms: defaults::default_save_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LayoutConfig {
    #[serde(default = "defaults::default_window_width")]
    window_width: f32,
    #[serde(default = "defaults::default_window_height")]
    window_height: f32,
    #[serde(default = "defaults::default_font_size")]
    font_size: u32,
    #[serde(default = "defaults::default_line_spacing")]
    line_spacing: f32,
    #[serde(default = "defaults::default_paragraph_spacing")]
    paragraph_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            window_width: defaults::default_window_width(),
            window_height: defaults::default_window_height(),
            font_size: defaults::default_font_size(),
            line_spacing: defaults::default_line_spacing(),
            paragraph_spacing: defaults::default_paragraph_spacing(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
struct TextConfig {
    #[serde(default)]
    language: Language,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_namespace")]
    namespace: String,
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            namespace: defaults::default_namespace(),
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
