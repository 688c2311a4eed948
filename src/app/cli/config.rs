//! TOML configuration file parsing and loading
//!
//! This module handles loading and parsing of TOML configuration files,
//! including default config file discovery and validation of config values.
//! Values from the file only fill fields the command line left unset.

use super::args::Args;
use crate::queue::api::QueueConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Error reading configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid [queue] table: {source}")]
    Queue {
        #[source]
        source: toml::de::Error,
    },
}

/// Default configuration file location, `<config_dir>/Jobqueue/jobqueue.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Jobqueue").join("jobqueue.toml"))
}

impl Args {
    /// Load the config file into `args` and return the raw TOML table
    ///
    /// An explicitly given file must exist; the default location is only
    /// used when present.
    pub async fn parse_config_file(
        args: &mut Self,
        config_file: Option<PathBuf>,
    ) -> Result<Option<toml::Table>, ConfigError> {
        let config_path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile { path });
                }
                Some(path)
            }
            None => default_config_path().filter(|path| path.exists()),
        };

        let Some(path) = config_path else {
            return Ok(None);
        };

        log::debug!("Loading configuration from {}", path.display());
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let config = Self::parse_config_str(&path, &contents)?;
        Self::apply_toml_values(args, &config)?;
        Ok(Some(config))
    }

    fn parse_config_str(path: &Path, contents: &str) -> Result<toml::Table, ConfigError> {
        toml::from_str::<toml::Table>(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a non-negative integer, rejecting other types and negative numbers
    fn toml_count(table: &toml::Table, key: &str) -> Result<Option<usize>, ConfigError> {
        let Some(value) = table.get(key) else {
            return Ok(None);
        };
        let number = value.as_integer().ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an integer, found {}", value.type_str()),
        })?;
        usize::try_from(number)
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a non-negative count, found {}", number),
            })
    }

    fn toml_string(table: &toml::Table, key: &str) -> Result<Option<String>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected a string, found {}", value.type_str()),
                }),
        }
    }

    /// Apply TOML configuration values to Args
    pub fn apply_toml_values(args: &mut Self, config: &toml::Table) -> Result<(), ConfigError> {
        if !args.color && !args.no_color {
            if let Some(color) = config.get("color").and_then(|v| v.as_bool()) {
                args.color = color;
                args.no_color = !color;
            }
        }
        if args.log_level.is_none() {
            args.log_level = Self::toml_string(config, "log-level")?;
        }
        if args.log_file.is_none() {
            args.log_file = Self::toml_string(config, "log-file")?.map(PathBuf::from);
        }
        if args.log_format.is_none() {
            args.log_format = Self::toml_string(config, "log-format")?;
        }
        if args.format.is_none() {
            args.format = Self::toml_string(config, "format")?;
        }
        if let Some(format) = args.format.as_deref() {
            if format != "text" && format != "json" {
                return Err(ConfigError::InvalidValue {
                    key: "format".to_string(),
                    message: format!("expected 'text' or 'json', found '{}'", format),
                });
            }
        }

        if let Some(queue) = config.get("queue") {
            let table = queue.as_table().ok_or_else(|| ConfigError::InvalidValue {
                key: "queue".to_string(),
                message: "expected a table".to_string(),
            })?;
            let queue_config = QueueConfig::from_toml_table(table)
                .map_err(|source| ConfigError::Queue { source })?;
            args.queue = Some(queue_config);
        }

        if let Some(simulation) = config.get("simulation") {
            let table = simulation
                .as_table()
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "simulation".to_string(),
                    message: "expected a table".to_string(),
                })?;
            Self::apply_simulation_table(args, table)?;
        }

        Ok(())
    }

    fn apply_simulation_table(args: &mut Self, table: &toml::Table) -> Result<(), ConfigError> {
        let fields: [(&str, &mut Option<usize>); 6] = [
            ("producers", &mut args.producers),
            ("jobs", &mut args.jobs),
            ("sessions", &mut args.sessions),
            ("early-leavers", &mut args.early_leavers),
            ("leave-after", &mut args.leave_after),
            ("observers", &mut args.observers),
        ];
        for (key, target) in fields {
            if target.is_none() {
                *target = Self::toml_count(table, key)?;
            }
        }
        Ok(())
    }

    /// Check that the merged settings describe a runnable simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.early_leavers() > self.sessions() {
            return Err(ConfigError::InvalidValue {
                key: "early-leavers".to_string(),
                message: format!(
                    "{} early leavers requested but only {} sessions",
                    self.early_leavers(),
                    self.sessions()
                ),
            });
        }
        self.queue_config()
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "queue".to_string(),
                message: e.to_string(),
            })
    }
}
