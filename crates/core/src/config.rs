use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::params::BlurArgs;

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_DATA_DIR: &str = "FRAMEBLUR_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub blur: BlurConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlurConfig {
    pub kernel_size: i32,
    /// Passed through to the kernel arguments; the box filter ignores it.
    pub sigma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub batch_size: usize,
    pub workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            blur: BlurConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            sigma: 0.0,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            workers: 1,
        }
    }
}

impl BlurConfig {
    /// Encode as the `BlurArgs` blob handed to the kernel.
    pub fn to_args_blob(&self) -> Vec<u8> {
        BlurArgs::new(self.kernel_size, self.sigma).to_blob()
    }
}

impl ExecutionConfig {
    pub fn normalized(&self) -> Self {
        Self {
            batch_size: self.batch_size.max(1),
            workers: self.workers.max(1),
        }
    }
}

impl AppConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config TOML: {}", path.display()))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .context("config path does not have a parent directory")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory: {}", parent.display()))?;

        let encoded = toml::to_string_pretty(self).context("failed to serialize config TOML")?;
        fs::write(path, encoded)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Resolve the data directory:
/// 1. CLI override if provided
/// 2. FRAMEBLUR_DATA_DIR environment variable
/// 3. Default: ./data
pub fn data_dir(cli_override: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_override {
        return path.to_path_buf();
    }

    if let Some(env_dir) = env::var_os(ENV_DATA_DIR) {
        return PathBuf::from(env_dir);
    }

    PathBuf::from("data")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

/// Create the data directory and a default config.toml if either is missing.
pub fn initialize_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    }

    let cfg_path = config_path(data_dir);
    if !cfg_path.exists() {
        AppConfig::default().save_to_path(&cfg_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BlurParameters;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.blur.kernel_size, 3);
        assert_eq!(cfg.blur.sigma, 0.0);
        assert_eq!(cfg.execution.batch_size, 8);
        assert_eq!(cfg.execution.workers, 1);
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut original = AppConfig::default();
        original.blur.kernel_size = 7;
        original.blur.sigma = 1.25;
        original.execution.workers = 4;

        let encoded = toml::to_string_pretty(&original).expect("serialize config");
        let decoded: AppConfig = toml::from_str(&encoded).expect("deserialize config");
        assert_eq!(decoded, original);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let decoded: AppConfig = toml::from_str("[blur]\nkernel_size = 5\n").unwrap();
        assert_eq!(decoded.blur.kernel_size, 5);
        assert_eq!(decoded.blur.sigma, 0.0);
        assert_eq!(decoded.execution, ExecutionConfig::default());
    }

    #[test]
    fn load_from_nonexistent_file_returns_defaults() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let loaded = AppConfig::load_from_path(&temp.path().join("missing.toml"))
            .expect("load config from nonexistent path");
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn load_from_empty_file_returns_defaults() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "   \n").unwrap();
        assert_eq!(AppConfig::load_from_path(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn load_from_invalid_toml_reports_path() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[blur\nkernel_size = ").unwrap();

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config TOML"));
    }

    #[test]
    fn blur_config_encodes_kernel_args() {
        let blur = BlurConfig {
            kernel_size: 9,
            sigma: 2.5,
        };
        let params = BlurParameters::resolve(&blur.to_args_blob()).unwrap();
        assert_eq!(params.window_size, 9);
        assert_eq!(params.sigma, 2.5);
    }

    #[test]
    fn execution_config_normalizes_zero_values() {
        let normalized = ExecutionConfig {
            batch_size: 0,
            workers: 0,
        }
        .normalized();
        assert_eq!(normalized.batch_size, 1);
        assert_eq!(normalized.workers, 1);
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let result = data_dir(Some(Path::new("/custom")));
        assert_eq!(result, PathBuf::from("/custom"));
    }

    #[test]
    fn data_dir_env_then_default() {
        let old = env::var_os(ENV_DATA_DIR);

        env::set_var(ENV_DATA_DIR, "/env/path");
        assert_eq!(data_dir(None), PathBuf::from("/env/path"));

        env::remove_var(ENV_DATA_DIR);
        assert_eq!(data_dir(None), PathBuf::from("data"));

        if let Some(val) = old {
            env::set_var(ENV_DATA_DIR, val);
        }
    }

    #[test]
    fn config_path_is_data_dir_join_config_toml() {
        let result = config_path(Path::new("/data"));
        assert_eq!(result, PathBuf::from("/data/config.toml"));
    }

    #[test]
    fn initialize_creates_data_dir_and_config() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path().join("nested");
        initialize_data_dir(&dir).expect("initialize data dir");

        assert!(dir.exists());
        let loaded = AppConfig::load_from_path(&dir.join("config.toml")).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn initialize_preserves_existing_config() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let cfg_path = temp.path().join("config.toml");
        let custom_content = "[blur]\nkernel_size = 11\n";
        fs::write(&cfg_path, custom_content).expect("write custom config");

        initialize_data_dir(temp.path()).expect("initialize data dir");

        let content = fs::read_to_string(&cfg_path).expect("read config");
        assert_eq!(content, custom_content);
    }
}
