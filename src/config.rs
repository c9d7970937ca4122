use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub control: ControlConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    pub socket_path: PathBuf,
    pub read_timeout_ms: u64,
    /// File mode applied to the socket after binding
    pub socket_mode: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// X display to connect to; `$DISPLAY` when unset
    #[serde(default)]
    pub name: Option<String>,
}

/// Parameters of the scripted display used by `--dry-run`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DryRunConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    pub windows: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            control: ControlConfig {
                socket_path: PathBuf::from("/tmp/rwm-socket"),
                read_timeout_ms: 1000,
                socket_mode: 0o600,
            },
            display: DisplayConfig::default(),
            dry_run: DryRunConfig {
                screen_width: 1920,
                screen_height: 1080,
                windows: 0,
            },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("RWM_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        if self.control.socket_path.as_os_str().is_empty() {
            anyhow::bail!("control.socket_path must not be empty");
        }

        if self.control.read_timeout_ms == 0 {
            anyhow::bail!("control.read_timeout_ms must be greater than 0");
        }

        if self.control.socket_mode > 0o777 {
            anyhow::bail!(
                "control.socket_mode must be a permission mode, got {:o}",
                self.control.socket_mode
            );
        }

        if self.dry_run.screen_width == 0 || self.dry_run.screen_height == 0 {
            anyhow::bail!("dry_run screen size must be non-zero");
        }

        Ok(())
    }
}

impl ControlConfig {
    /// How long a connected client gets to send its command
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.socket_path, PathBuf::from("/tmp/rwm-socket"));
        assert_eq!(config.control.read_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.control.read_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.control.socket_mode = 0o4755;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dry_run.screen_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.dry_run.screen_width, 1920);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[control]\nsocket_path = \"/run/user/1000/rwm\"\n\n[dry_run]\nwindows = 3\n\n[display]\nname = \":1\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.control.socket_path, PathBuf::from("/run/user/1000/rwm"));
        assert_eq!(config.control.read_timeout_ms, 1000);
        assert_eq!(config.dry_run.windows, 3);
        assert_eq!(config.dry_run.screen_height, 1080);
        assert_eq!(config.display.name.as_deref(), Some(":1"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"xml\"").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
