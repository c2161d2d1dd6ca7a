use crate::dispatch::DispatchSettings;
use crate::normalize::CalibrationProfile;
use crate::protocol::Framing;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "wiimote-streamer";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_DEVICE_NAME: &str = "Nintendo Wii Remote";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StreamerConfig {
    pub calibration: CalibrationProfile,
    pub dispatch: DispatchSettings,
    pub protocol: ProtocolConfig,
    pub device: DeviceConfig,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationProfile::emulator(),
            dispatch: DispatchSettings::default(),
            protocol: ProtocolConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    pub framing: Framing,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base name of the kernel input devices
    pub name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

impl StreamerConfig {
    /// Loads the configuration, creating the default file on first start.
    ///
    /// An explicit path has to exist; only the default location is created.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !tokio::fs::try_exists(&path)
                    .await
                    .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
                {
                    return Err(eyre!("Config file does not exist: {}", path.display()));
                }
                path
            }
            None => {
                let path = default_config_path();
                Self::ensure_default_config(&path).await?;
                path
            }
        };

        Self::read_from(&path).await
    }

    // Reads, parses and validates one config file
    pub async fn read_from(path: &Path) -> Result<Self> {
        debug!("Reading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

        let config = Self::parse(&content)?;
        info!(
            "Loaded config from {} ({:?} framing, accel mode {:?})",
            path.display(),
            config.protocol.framing,
            config.calibration.accel.mode
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.calibration
            .validate()
            .map_err(|e| eyre!("Invalid calibration: {}", e))?;
        self.dispatch
            .validate()
            .map_err(|e| eyre!("Invalid dispatch settings: {}", e))?;
        if self.device.name.trim().is_empty() {
            return Err(eyre!("Device name must not be empty"));
        }
        Ok(())
    }

    /// Writes the default configuration if no file exists at `path`.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config file: {}", e))?;

        info!("Created default config at {}", path.display());
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| {
        warn!("Could not determine config directory, using current directory");
        PathBuf::from(".")
    });
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}
