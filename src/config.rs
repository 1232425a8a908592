use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "MedReport";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3330";
/// Ollama's OpenAI-compatible endpoint.
pub const DEFAULT_VISION_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision";
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_HISTORY_WINDOW: u32 = 10;
pub const DEFAULT_IDENTITY_SALT: &str = "medreport-identity-v1";

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medreport_lib=info,medreport=info,tower_http=info,warn"
}

/// Get the application data directory: `~/MedReport/`.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Cannot determine home directory; set MEDREPORT_DB_PATH")]
    NoHomeDir,
}

/// Runtime configuration, read from `MEDREPORT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub vision_url: String,
    pub vision_model: String,
    pub vision_api_key: Option<String>,
    pub extraction_timeout: Duration,
    pub request_timeout: Duration,
    pub history_window: u32,
    pub identity_salt: String,
}

impl AppConfig {
    /// True when no deployment salt was configured. Digests made with the
    /// public default can be reversed by enumerating phone numbers.
    pub fn uses_default_identity_salt(&self) -> bool {
        self.identity_salt == DEFAULT_IDENTITY_SALT
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = match get("MEDREPORT_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join("medreport.db"),
        };

        let bind_raw = get("MEDREPORT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "MEDREPORT_BIND_ADDR",
            expected: "a socket address such as 127.0.0.1:3330",
            value: bind_raw.clone(),
        })?;

        let extraction_secs = parse_positive(
            "MEDREPORT_EXTRACTION_TIMEOUT_SECS",
            get("MEDREPORT_EXTRACTION_TIMEOUT_SECS"),
            DEFAULT_EXTRACTION_TIMEOUT_SECS,
        )?;
        let request_secs = parse_positive(
            "MEDREPORT_REQUEST_TIMEOUT_SECS",
            get("MEDREPORT_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let history_window = parse_positive(
            "MEDREPORT_HISTORY_WINDOW",
            get("MEDREPORT_HISTORY_WINDOW"),
            u64::from(DEFAULT_HISTORY_WINDOW),
        )?;
        let history_window = u32::try_from(history_window).map_err(|_| ConfigError::Invalid {
            var: "MEDREPORT_HISTORY_WINDOW",
            expected: "a positive integer",
            value: history_window.to_string(),
        })?;

        Ok(Self {
            db_path,
            bind_addr,
            vision_url: get("MEDREPORT_VISION_URL").unwrap_or_else(|| DEFAULT_VISION_URL.into()),
            vision_model: get("MEDREPORT_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.into()),
            vision_api_key: get("MEDREPORT_VISION_API_KEY"),
            extraction_timeout: Duration::from_secs(extraction_secs),
            request_timeout: Duration::from_secs(request_secs),
            history_window,
            identity_salt: get("MEDREPORT_IDENTITY_SALT")
                .unwrap_or_else(|| DEFAULT_IDENTITY_SALT.into()),
        })
    }
}

fn parse_positive(
    var: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a positive integer",
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_with(&[("MEDREPORT_DB_PATH", "/tmp/m.db")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/m.db"));
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.vision_url, DEFAULT_VISION_URL);
        assert_eq!(config.vision_api_key, None);
        assert_eq!(config.extraction_timeout, Duration::from_secs(120));
        assert_eq!(config.history_window, 10);
    }

    #[test]
    fn default_db_path_under_home() {
        if let Some(home) = dirs::home_dir() {
            let config = config_with(&[]).unwrap();
            assert!(config.db_path.starts_with(home));
            assert!(config.db_path.ends_with("MedReport/medreport.db"));
        }
    }

    #[test]
    fn overrides_are_read() {
        let config = config_with(&[
            ("MEDREPORT_DB_PATH", "/tmp/m.db"),
            ("MEDREPORT_BIND_ADDR", "0.0.0.0:8080"),
            ("MEDREPORT_VISION_API_KEY", "sk-test"),
            ("MEDREPORT_EXTRACTION_TIMEOUT_SECS", "30"),
            ("MEDREPORT_HISTORY_WINDOW", "4"),
            ("MEDREPORT_IDENTITY_SALT", "pepper"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.vision_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.extraction_timeout, Duration::from_secs(30));
        assert_eq!(config.history_window, 4);
        assert_eq!(config.identity_salt, "pepper");
    }

    #[test]
    fn default_salt_is_detected() {
        let config = config_with(&[("MEDREPORT_DB_PATH", "/tmp/m.db")]).unwrap();
        assert!(config.uses_default_identity_salt());

        let config = config_with(&[
            ("MEDREPORT_DB_PATH", "/tmp/m.db"),
            ("MEDREPORT_IDENTITY_SALT", "site-secret"),
        ])
        .unwrap();
        assert!(!config.uses_default_identity_salt());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_with(&[
            ("MEDREPORT_DB_PATH", "/tmp/m.db"),
            ("MEDREPORT_VISION_API_KEY", "   "),
        ])
        .unwrap();
        assert_eq!(config.vision_api_key, None);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = config_with(&[
            ("MEDREPORT_DB_PATH", "/tmp/m.db"),
            ("MEDREPORT_HISTORY_WINDOW", "ten"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "MEDREPORT_HISTORY_WINDOW", .. }
        ));

        let err = config_with(&[
            ("MEDREPORT_DB_PATH", "/tmp/m.db"),
            ("MEDREPORT_EXTRACTION_TIMEOUT_SECS", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MEDREPORT_EXTRACTION_TIMEOUT_SECS"));
    }

    #[test]
    fn invalid_bind_addr_is_error() {
        let err = config_with(&[
            ("MEDREPORT_DB_PATH", "/tmp/m.db"),
            ("MEDREPORT_BIND_ADDR", "localhost"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "MEDREPORT_BIND_ADDR", .. }));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
