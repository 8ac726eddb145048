use crate::geolocation::GeolocationOptions;
use crate::intake::{EntryPoint, LocationRequirement};
use crate::types::Coordinates;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub map: MapConfig,
    pub seed: SeedConfig,
    pub geolocation: GeolocationConfig,
    pub intake: IntakeConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
    /// Zoom used when centring on the user's own position.
    pub locate_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        // Lagos, Nigeria
        Self {
            center_lat: 6.5244,
            center_lng: 3.3792,
            zoom: 11,
            locate_zoom: 13,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SeedConfig {
    /// CSV of initial points. The built-in sample set is used when unset.
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeolocationConfig {
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
    pub high_accuracy: bool,
    /// Fixed device position for kiosk deployments.
    pub device: Option<DevicePosition>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        let options = GeolocationOptions::default();
        Self {
            timeout_ms: options.timeout.as_millis() as u64,
            maximum_age_ms: options.maximum_age.as_millis() as u64,
            high_accuracy: options.high_accuracy,
            device: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DevicePosition {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IntakeConfig {
    pub manual_requires_location: bool,
    pub map_click_requires_location: bool,
    /// How many submitted reports the session remembers.
    pub recent_reports: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            manual_requires_location: true,
            map_click_requires_location: false,
            recent_reports: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served at `/` (the map front end), if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.check()?;
        Ok(config)
    }

    /// Uses `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn check(&self) -> Result<()> {
        self.map.center()?;
        if let Some(device) = &self.geolocation.device {
            device.coordinates()?;
        }
        Ok(())
    }
}

impl MapConfig {
    pub fn center(&self) -> Result<Coordinates> {
        Coordinates::new(self.center_lat, self.center_lng).ok_or_else(|| {
            anyhow!(
                "Map centre {}, {} is not a valid position",
                self.center_lat,
                self.center_lng
            )
        })
    }
}

impl DevicePosition {
    pub fn coordinates(&self) -> Result<Coordinates> {
        Coordinates::new(self.lat, self.lng)
            .ok_or_else(|| anyhow!("Device position {}, {} is not valid", self.lat, self.lng))
    }
}

impl GeolocationConfig {
    pub fn options(&self) -> GeolocationOptions {
        GeolocationOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            maximum_age: Duration::from_millis(self.maximum_age_ms),
            high_accuracy: self.high_accuracy,
        }
    }
}

impl IntakeConfig {
    pub fn requirement(&self, entry: &EntryPoint) -> LocationRequirement {
        let required = match entry {
            EntryPoint::Manual => self.manual_requires_location,
            EntryPoint::MapClick(_) => self.map_click_requires_location,
        };
        if required {
            LocationRequirement::Required
        } else {
            LocationRequirement::Optional
        }
    }
}
