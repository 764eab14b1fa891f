use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persistent driver configuration, loaded once at driver-state construction.
///
/// The data model forbids runtime reconfiguration, so unlike a typical app
/// config this has no `update_config` path — only load-or-create-default at
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub format: FormatSettings,
    pub ring: RingSettings,
    pub codec: CodecSettings,
    pub clock: ClockSettings,
    pub volume: VolumeSettings,
    pub transport: TransportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSettings {
    /// Sample rate R in Hz.
    pub sample_rate: u32,
    /// Channel count N.
    pub channels: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSettings {
    /// Ring capacity C_r in frames.
    pub capacity_frames: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecSettings {
    /// Codec frame size F_c in PCM frames.
    pub frame_frames: u32,
    /// Maximum compressed packet size P_max in bytes.
    pub max_packet_bytes: u32,
    pub bitrate: u32,
    pub complexity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockSettings {
    /// Zero-timestamp period P in frames.
    pub period_frames: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSettings {
    pub default_scalar: f32,
    /// Lower bound of the decibel range, D_min.
    pub min_db: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    pub peer_host: String,
    pub egress_port: u16,
    pub ingress_port: u16,
    pub reconnect_backoff_ms: u32,
    pub accumulator_poll_ms: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            format: FormatSettings::default(),
            ring: RingSettings::default(),
            codec: CodecSettings::default(),
            clock: ClockSettings::default(),
            volume: VolumeSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl Default for RingSettings {
    fn default() -> Self {
        Self {
            capacity_frames: 8192,
        }
    }
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            frame_frames: 960,
            max_packet_bytes: 1500,
            bitrate: 64000,
            complexity: 5,
        }
    }
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            period_frames: 480,
        }
    }
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            default_scalar: 1.0,
            min_db: -96.0,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            peer_host: "localhost".to_string(),
            egress_port: 9001,
            ingress_port: 9002,
            reconnect_backoff_ms: 1000,
            accumulator_poll_ms: 2,
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    config: DriverConfig,
}

impl ConfigManager {
    pub fn with_config(config: DriverConfig) -> Self {
        Self {
            config_path: PathBuf::from("fallback_config.toml"),
            config,
        }
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let config = Self::load_or_create_config(&config_path)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    pub fn get_config(&self) -> &DriverConfig {
        &self.config
    }

    fn load_or_create_config(config_path: &PathBuf) -> Result<DriverConfig> {
        if config_path.exists() {
            info!("Loading configuration from: {:?}", config_path);
            let config_str =
                fs::read_to_string(config_path).context("Failed to read configuration file")?;

            match toml::from_str::<DriverConfig>(&config_str) {
                Ok(config) => {
                    info!("Configuration loaded successfully");
                    Ok(config)
                }
                Err(e) => {
                    warn!("Failed to parse configuration file: {}. Using defaults.", e);
                    let default_config = DriverConfig::default();
                    if let Err(save_err) = Self::save_config_to_path(&default_config, config_path)
                    {
                        error!("Failed to save default configuration: {}", save_err);
                    }
                    Ok(default_config)
                }
            }
        } else {
            info!("No configuration file found. Creating default configuration.");
            let default_config = DriverConfig::default();
            Self::save_config_to_path(&default_config, config_path)?;
            Ok(default_config)
        }
    }

    fn save_config_to_path(config: &DriverConfig, path: &PathBuf) -> Result<()> {
        let config_str =
            toml::to_string_pretty(config).context("Failed to serialize default configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path, config_str).context("Failed to write default configuration file")?;

        info!("Default configuration saved to: {:?}", path);
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("auracard")
        } else {
            let home_dir = dirs::home_dir().context("Could not determine home directory")?;
            home_dir.join(".auracard")
        };

        Ok(config_dir.join("config.toml"))
    }
}
