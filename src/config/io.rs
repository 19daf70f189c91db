use super::models::ReaderConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the reader configuration, falling back to defaults on any failure.
pub fn load_config(path: &Path) -> ReaderConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return ReaderConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            ReaderConfig::default()
        }
    }
}

/// Parse the sectioned TOML form into a sanitized config.
pub fn parse_config(contents: &str) -> Result<ReaderConfig> {
    let tables: ConfigTables =
        toml::from_str(contents).context("failed to parse reader config tables")?;
    Ok(ReaderConfig::from(tables).sanitized())
}

pub fn serialize_config(config: &ReaderConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("failed to serialize reader config")
}
