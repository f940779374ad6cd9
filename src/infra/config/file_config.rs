use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AppConfig, LogConfig, MessagingConfig, ResolutionConfig, SelectorConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub messaging: Option<FileMessagingConfig>,
    pub selector: Option<FileSelectorConfig>,
    pub resolution: Option<FileResolutionConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(messaging) = self.messaging {
            messaging.merge_into(&mut config.messaging);
        }

        if let Some(selector) = self.selector {
            selector.merge_into(&mut config.selector);
        }

        if let Some(resolution) = self.resolution {
            resolution.merge_into(&mut config.resolution);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file_dir: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file_dir) = self.file_dir {
            config.file_dir = Some(file_dir);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileMessagingConfig {
    pub broadcast_topic: Option<String>,
    pub history_limit: Option<usize>,
}

impl FileMessagingConfig {
    fn merge_into(self, config: &mut MessagingConfig) {
        if let Some(topic) = self.broadcast_topic {
            config.broadcast_topic = topic;
        }

        if let Some(limit) = self.history_limit {
            config.history_limit = limit;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSelectorConfig {
    pub page_size: Option<usize>,
    pub search_debounce_ms: Option<u64>,
}

impl FileSelectorConfig {
    fn merge_into(self, config: &mut SelectorConfig) {
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }

        if let Some(debounce_ms) = self.search_debounce_ms {
            config.search_debounce_ms = debounce_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileResolutionConfig {
    pub lookup_concurrency: Option<usize>,
}

impl FileResolutionConfig {
    fn merge_into(self, config: &mut ResolutionConfig) {
        if let Some(concurrency) = self.lookup_concurrency {
            config.lookup_concurrency = concurrency;
        }
    }
}
