use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinates;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATABASE_PATH: &str = "weather.db";
pub const DEFAULT_EXPORT_PATH: &str = "weather.xlsx";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file: {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration to TOML")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine platform config directory")]
    NoConfigDir,

    #[error(
        "No value configured for `{0}`.\n\
         Hint: pass it on the command line, set it in the environment, or run `meteolog configure`."
    )]
    Missing(&'static str),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Provider section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// One configuration layer: the file on disk, or the command-line/environment
/// overrides. Unset fields fall through to the next layer.
///
/// Example TOML:
/// ```toml
/// interval_secs = 60
/// latitude = 55.75
/// longitude = 37.62
/// row_count = 7
///
/// [provider]
/// timezone = "UTC"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<PathBuf>,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Validated provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub timezone: String,
    pub timeout: Duration,
}

/// Validated runtime configuration, built once at startup and passed down.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub interval: Duration,
    pub location: Coordinates,
    pub row_count: NonZeroUsize,
    pub database_path: PathBuf,
    pub export_path: PathBuf,
    pub provider: ProviderSettings,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from an explicit path; a missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(write_err)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let dirs =
            ProjectDirs::from("dev", "meteolog", "meteolog").ok_or(ConfigError::NoConfigDir)?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Layers `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merged_with(self, overrides: Config) -> Config {
        Config {
            interval_secs: overrides.interval_secs.or(self.interval_secs),
            latitude: overrides.latitude.or(self.latitude),
            longitude: overrides.longitude.or(self.longitude),
            row_count: overrides.row_count.or(self.row_count),
            database_path: overrides.database_path.or(self.database_path),
            export_path: overrides.export_path.or(self.export_path),
            provider: ProviderConfig {
                base_url: overrides.provider.base_url.or(self.provider.base_url),
                timezone: overrides.provider.timezone.or(self.provider.timezone),
                timeout_secs: overrides.provider.timeout_secs.or(self.provider.timeout_secs),
            },
        }
    }

    /// The configured coordinates, range-checked.
    pub fn location(&self) -> Result<Coordinates, ConfigError> {
        let latitude = self.latitude.ok_or(ConfigError::Missing("latitude"))?;
        let longitude = self.longitude.ok_or(ConfigError::Missing("longitude"))?;

        check_range("latitude", latitude, 90.0)?;
        check_range("longitude", longitude, 180.0)?;

        Ok(Coordinates::new(latitude, longitude))
    }

    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        let timeout_secs = self.provider.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "provider.timeout_secs",
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        Ok(ProviderSettings {
            base_url: self
                .provider
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timezone: self
                .provider
                .timezone
                .clone()
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Validate everything the recorder needs to run.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let interval_secs = self.interval_secs.ok_or(ConfigError::Missing("interval_secs"))?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "interval_secs",
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        let row_count = self.row_count.ok_or(ConfigError::Missing("row_count"))?;
        let row_count = NonZeroUsize::new(row_count).ok_or_else(|| ConfigError::Invalid {
            field: "row_count",
            reason: "must be a positive integer".to_string(),
        })?;

        Ok(Settings {
            interval: Duration::from_secs(interval_secs),
            location: self.location()?,
            row_count,
            database_path: self
                .database_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            export_path: self
                .export_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH)),
            provider: self.provider_settings()?,
        })
    }
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (-limit..=limit).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside -{limit}..={limit}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        Config {
            interval_secs: Some(60),
            latitude: Some(55.75),
            longitude: Some(37.62),
            row_count: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn settings_fill_in_defaults() {
        let settings = complete().settings().expect("complete config must validate");

        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(settings.location, Coordinates::new(55.75, 37.62));
        assert_eq!(settings.row_count.get(), 7);
        assert_eq!(settings.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(settings.export_path, PathBuf::from(DEFAULT_EXPORT_PATH));
        assert_eq!(settings.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.provider.timezone, DEFAULT_TIMEZONE);
        assert_eq!(settings.provider.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn missing_interval_is_reported_with_hint() {
        let cfg = Config {
            interval_secs: None,
            ..complete()
        };
        let err = cfg.settings().unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("interval_secs"));
        assert!(msg.contains("meteolog configure"));
    }

    #[test]
    fn zero_interval_and_zero_rows_are_rejected() {
        let cfg = Config {
            interval_secs: Some(0),
            ..complete()
        };
        assert!(matches!(
            cfg.settings(),
            Err(ConfigError::Invalid { field: "interval_secs", .. })
        ));

        let cfg = Config {
            row_count: Some(0),
            ..complete()
        };
        assert!(matches!(
            cfg.settings(),
            Err(ConfigError::Invalid { field: "row_count", .. })
        ));
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        let cfg = Config {
            latitude: Some(91.0),
            ..complete()
        };
        assert!(matches!(
            cfg.location(),
            Err(ConfigError::Invalid { field: "latitude", .. })
        ));

        let cfg = Config {
            longitude: Some(f64::NAN),
            ..complete()
        };
        assert!(matches!(
            cfg.location(),
            Err(ConfigError::Invalid { field: "longitude", .. })
        ));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = Config {
            provider: ProviderConfig {
                timezone: Some("UTC".to_string()),
                ..Default::default()
            },
            ..complete()
        };
        let overrides = Config {
            interval_secs: Some(5),
            latitude: Some(-33.9),
            ..Default::default()
        };

        let merged = file.merged_with(overrides);

        assert_eq!(merged.interval_secs, Some(5));
        assert_eq!(merged.latitude, Some(-33.9));
        assert_eq!(merged.longitude, Some(37.62));
        assert_eq!(merged.provider.timezone.as_deref(), Some("UTC"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config {
            provider: ProviderConfig {
                timeout_secs: Some(3),
                ..Default::default()
            },
            ..complete()
        };
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_loads_as_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval_secs = \"soon\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
