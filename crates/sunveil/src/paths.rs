//! Locates the configuration directory, honouring `SUNVEIL_CONFIG_DIR`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;
use fieldconfig::CONFIG_FILE_NAME;

pub const ENV_CONFIG_DIR: &str = "SUNVEIL_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "sunveil";
const APPLICATION: &str = "sunveil";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }

        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        let config_dir = ensure_directory(project_dirs.config_dir(), "config")?;
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

fn ensure_directory(path: &Path, label: &str) -> Result<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "failed to create sunveil {label} directory at {}",
                path.display()
            )
        })?;
    }
    Ok(path.to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
