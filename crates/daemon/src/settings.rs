//! Daemon settings
//!
//! Layered with the `config` crate: serde defaults, then an optional TOML
//! file, then `KAIROS__SECTION__KEY` environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use kairos_core::application::{RepositoryConfig, RetryConfig, SchedulerConfig};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "~/.kairos/scheduler.toml";
const ENV_PREFIX: &str = "KAIROS";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    pub callback: RetryConfig,
    pub scheduler: SchedulerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Also write daily-rolled JSON logs here
    pub directory: Option<String>,
}

impl Settings {
    /// Load settings; an explicit `path` must exist, the default one may not
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let (file, required) = match path {
            Some(path) => (shellexpand::tilde(path).into_owned(), true),
            None => (shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned(), false),
        };

        let builder = Config::builder()
            .add_source(File::new(&file, FileFormat::Toml).required(required))
            .add_source(Self::environment());
        Self::build(builder)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.repository.sqlite_path = settings
            .repository
            .sqlite_path
            .map(|path| shellexpand::tilde(&path).into_owned());
        Ok(settings)
    }
}
