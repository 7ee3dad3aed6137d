use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://invest-public-api.tinkoff.ru/rest";

/// Process configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api: ApiSettings,
    pub database: DatabaseSettings,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub token: String,
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("token", &if self.token.is_empty() { "not set" } else { "set" })
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "quantify_moex_stocks".to_string(),
            user: "quantify_system_account".to_string(),
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(env_lookup)
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_dir = match lookup("LOG_DIR") {
            Some(dir) if dir.is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => Some(PathBuf::from("logs")),
        };

        Ok(Self {
            api: ApiSettings::from_lookup(&lookup)?,
            database: DatabaseSettings::from_lookup(&lookup)?,
            log_dir,
        })
    }
}

impl ApiSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            token: required(&lookup, "API_TOKEN")?,
            base_url: lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        })
    }
}

impl DatabaseSettings {
    /// Database section only; the reporting tool has no use for the API token.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| SettingsError::Invalid {
                key: "DB_PORT",
                reason: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port,
            name: lookup("DB_NAME").unwrap_or(defaults.name),
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: required(&lookup, "DB_PASSWORD")?,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(SettingsError::Missing(key))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
