use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8050;
pub const DEFAULT_DATA_PATH: &str = "data/sales.csv";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Process settings, read once at startup from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub data_path: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl Config {
    /// Reads `HOST`, `PORT`, `DEBUG`, `DATA_PATH` and `STATIC_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; unset or blank
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(host) = get("HOST") {
            config.host = host.trim().to_string();
        }
        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "PORT",
                    value: port.clone(),
                })?;
        }
        if let Some(debug) = get("DEBUG") {
            config.debug = parse_flag(&debug).ok_or(ConfigError::InvalidValue {
                name: "DEBUG",
                value: debug.clone(),
            })?;
        }
        if let Some(path) = get("DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }
        if let Some(dir) = get("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// The `host:port` pair to listen on; host names are resolved at bind time.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8050");
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "10000"),
            ("DEBUG", "yes"),
            ("DATA_PATH", "/srv/sales.csv"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:10000");
        assert!(config.debug);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.data_path, PathBuf::from("/srv/sales.csv"));
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = config_from(&[("PORT", "  ")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            config_from(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidValue {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
        assert!(config_from(&[("DEBUG", "maybe")]).is_err());
        assert!(config_from(&[("PORT", "70000")]).is_err());
    }
}
