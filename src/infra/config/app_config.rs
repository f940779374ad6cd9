use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    domain::topic::DEFAULT_BROADCAST_TOPIC,
    usecases::{
        incremental_selector::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE_MS},
        messaging_session::DEFAULT_HISTORY_LIMIT,
        resolve_page::DEFAULT_LOOKUP_CONCURRENCY,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub messaging: MessagingConfig,
    pub selector: SelectorConfig,
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Daily rolling log files go here when set; otherwise logs go to stderr.
    pub file_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            file_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagingConfig {
    pub broadcast_topic: String,
    pub history_limit: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            broadcast_topic: DEFAULT_BROADCAST_TOPIC.to_owned(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorConfig {
    pub page_size: usize,
    pub search_debounce_ms: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionConfig {
    pub lookup_concurrency: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}
