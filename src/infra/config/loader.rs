use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if !config_path.exists() {
        return Ok(config);
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
        path: config_path.clone(),
        source,
    })?;

    let file_config: FileConfig = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
        path: config_path.clone(),
        source,
    })?;

    file_config.merge_into(&mut config);
    validate(&config).map_err(|details| AppError::ConfigInvalid {
        path: config_path,
        details,
    })?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), String> {
    if config.messaging.broadcast_topic.trim().is_empty() {
        return Err("messaging.broadcast_topic must not be empty".to_owned());
    }
    if config.selector.page_size == 0 {
        return Err("selector.page_size must be at least 1".to_owned());
    }
    if config.resolution.lookup_concurrency == 0 {
        return Err("resolution.lookup_concurrency must be at least 1".to_owned());
    }

    Ok(())
}
