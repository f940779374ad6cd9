use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::infra::{
    config::{load, AppConfig},
    contracts::ConfigAdapter,
};

#[derive(Debug, Clone, Default)]
pub struct FileConfigAdapter {
    path: Option<PathBuf>,
}

impl FileConfigAdapter {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(load(self.path.as_deref())?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_config_from_given_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("mgchat.toml");
        fs::write(&path, "[resolution]\nlookup_concurrency = 3\n").expect("write config");

        let config = FileConfigAdapter::new(Some(&path))
            .load()
            .expect("config must load");

        assert_eq!(config.resolution.lookup_concurrency, 3);
    }

    #[test]
    fn surfaces_loader_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("mgchat.toml");
        fs::write(&path, "not = [valid").expect("write config");

        let error = FileConfigAdapter::new(Some(&path))
            .load()
            .expect_err("broken config must fail");

        assert!(error.to_string().starts_with("failed to parse config file"));
    }
}
