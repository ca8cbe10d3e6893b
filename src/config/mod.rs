use crate::models::BridgeConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

pub const CONFIG_FILE_NAME: &str = "ui-bridge.yaml";
pub const ENV_PREFIX: &str = "UI_BRIDGE";

/// Loads and saves the bridge configuration.
///
/// Sources, lowest precedence first:
/// - built-in defaults ([`BridgeConfig::default`])
/// - `ui-bridge.yaml` in the configuration directory (optional)
/// - `UI_BRIDGE__*` environment variables, `__` separating nested keys
///   (e.g. `UI_BRIDGE__WINDOW__TITLE`)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        Self::with_env_prefix(config_dir, ENV_PREFIX)
    }

    /// Same as [`new`](Self::new) but reads environment overrides under `prefix`.
    pub fn with_env_prefix<P: AsRef<Utf8Path>>(config_dir: P, prefix: &str) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_prefix: prefix.to_string(),
        })
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Load the layered configuration and clamp unusable values.
    pub fn load(&self) -> Result<BridgeConfig> {
        if !self.config_path.exists() {
            tracing::info!(
                "Config file not found at {}, using defaults and environment",
                self.config_path
            );
        }

        let settings = Config::builder()
            .add_source(
                File::from(self.config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: BridgeConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_dir);
        Ok(config.validated())
    }

    /// Write `config` as YAML to the configuration file.
    pub fn save(&self, config: &BridgeConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }
}
