use anyhow::Result;

use crate::infra::{config::AppConfig, contracts::ConfigAdapter};

/// Hands out a fixed config without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter {
    pub config: AppConfig,
}

impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_config_returns_what_it_holds() {
        let mut config = AppConfig::default();
        config.selector.page_size = 5;
        let adapter = StubConfigAdapter {
            config: config.clone(),
        };

        assert_eq!(adapter.load().expect("stub config must load"), config);
    }
}
