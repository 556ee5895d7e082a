use crate::consent::ConsentMode;
use crate::error::{Result, SecurePulseError};
use crate::identity::poll::{DEFAULT_INTERVAL_MS, DEFAULT_MAX_ATTEMPTS};
use crate::identity::{Locale, PollOptions};
use crate::session::FileSessionStore;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployed Identity Service (Azure App Service)
pub const PRODUCTION_SERVICE_URL: &str = "https://securepulse-identity.azurewebsites.net";
/// Identity Service started locally
pub const DEVELOPMENT_SERVICE_URL: &str = "http://localhost:3000";

pub const SERVICE_URL_ENV: &str = "SECUREPULSE_IDENTITY_SERVICE_URL";
pub const ENVIRONMENT_ENV: &str = "SECUREPULSE_ENV";
pub const CONFIG_DIR_ENV: &str = "SECUREPULSE_CONFIG_DIR";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn default_service_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_SERVICE_URL,
            Environment::Development => DEVELOPMENT_SERVICE_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

/// Main configuration structure (`config.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_service_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    pub locale: Locale,

    pub consent_mode: ConsentMode,

    pub request_timeout_secs: u64,

    /// Log level or filter directive used when neither `--verbose` nor
    /// `RUST_LOG` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    pub poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity_service_url: None,
            environment: None,
            locale: Locale::default(),
            consent_mode: ConsentMode::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: None,
            poll: PollConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
    pub transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_ms: DEFAULT_INTERVAL_MS,
            transient_retries: 0,
        }
    }
}

impl PollConfig {
    pub fn to_options(&self) -> PollOptions {
        PollOptions::default()
            .max_attempts(self.max_attempts)
            .interval_ms(self.interval_ms)
            .transient_retries(self.transient_retries)
    }
}

/// Fully resolved settings the client runs with
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub service_url: String,
    pub environment: Environment,
    pub locale: Locale,
    pub consent_mode: ConsentMode,
    pub poll: PollOptions,
    pub request_timeout: Duration,
}

/// Configuration manager
#[derive(Clone, Debug)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Open the config directory (`SECUREPULSE_CONFIG_DIR` or the platform default)
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("com", "securepulse", "securepulse")
                .ok_or_else(|| {
                    SecurePulseError::ConfigError("Failed to determine config directory".into())
                })?
                .config_dir()
                .to_path_buf(),
        };

        Self::with_dir(config_dir)
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn env_file(&self) -> PathBuf {
        self.config_dir.join(".env")
    }

    /// Session store shared by `onboard` and `callback`
    pub fn session_store(&self) -> FileSessionStore {
        FileSessionStore::in_dir(&self.config_dir)
    }

    /// Load main config
    pub fn load_config(&self) -> Result<Config> {
        let config_path = self.config_file();

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save main config
    pub fn save_config(&self, config: &Config) -> Result<()> {
        let contents = toml::to_string_pretty(config).map_err(|e| {
            SecurePulseError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(self.config_file(), contents)?;
        Ok(())
    }

    /// Persist the Identity Service base URL
    pub fn set_service_url(&self, url: &str) -> Result<()> {
        let url = validate_service_url(url)?;
        let mut config = self.load_config()?;
        config.identity_service_url = Some(url);
        self.save_config(&config)
    }

    /// Variables from `.env` in the config directory, empty when absent
    pub fn load_env_file(&self) -> Result<HashMap<String, String>> {
        let env_path = self.env_file();

        if !env_path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(env_path)?;
        Ok(parse_env_file(&contents))
    }

    /// Resolve settings from the process environment, `.env` and `config.toml`.
    ///
    /// `service_url_override` (the `--service-url` flag) beats everything.
    pub fn settings(&self, service_url_override: Option<&str>) -> Result<Settings> {
        let config = self.load_config()?;
        let dotenv = self.load_env_file()?;
        resolve_settings(
            &config,
            &dotenv,
            |key| std::env::var(key).ok(),
            service_url_override,
        )
    }
}

/// Settings precedence: override, process env, `.env`, config file, environment default
pub fn resolve_settings<F>(
    config: &Config,
    dotenv: &HashMap<String, String>,
    env: F,
    service_url_override: Option<&str>,
) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    let environment = match non_empty(env(ENVIRONMENT_ENV))
        .or_else(|| non_empty(dotenv.get("ENVIRONMENT").cloned()))
    {
        Some(value) => value
            .parse::<Environment>()
            .map_err(SecurePulseError::ConfigError)?,
        None => config.environment.unwrap_or_default(),
    };

    let service_url = match non_empty(service_url_override.map(str::to_string))
        .or_else(|| non_empty(env(SERVICE_URL_ENV)))
        .or_else(|| non_empty(dotenv.get("IDENTITY_SERVICE_URL").cloned()))
        .or_else(|| non_empty(config.identity_service_url.clone()))
    {
        Some(url) => validate_service_url(&url)?,
        None => environment.default_service_url().to_string(),
    };

    Ok(Settings {
        service_url,
        environment,
        locale: config.locale,
        consent_mode: config.consent_mode,
        poll: config.poll.to_options(),
        request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
    })
}

/// Accept only absolute http(s) URLs; the trailing slash is dropped
pub fn validate_service_url(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url.trim()).map_err(|e| {
        SecurePulseError::ConfigError(format!("Invalid Identity Service URL '{}': {}", url, e))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SecurePulseError::ConfigError(format!(
            "Identity Service URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    Ok(url.trim().trim_end_matches('/').to_string())
}

/// Parse simple .env file format
///
/// ```text
/// # SecurePulse local development
/// ENVIRONMENT=development
/// IDENTITY_SERVICE_URL="http://localhost:3000"
/// ```
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();

            // Remove surrounding quotes if present
            let value = if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                &value[1..value.len() - 1]
            } else {
                value
            };

            vars.insert(key.trim().to_uppercase(), value.to_string());
        }
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_to_production_url() {
        let settings = resolve_settings(&Config::default(), &HashMap::new(), no_env, None).unwrap();
        assert_eq!(settings.service_url, PRODUCTION_SERVICE_URL);
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.poll, PollOptions::default());
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_development_uses_local_url() {
        let env = |key: &str| (key == ENVIRONMENT_ENV).then(|| "development".to_string());
        let settings = resolve_settings(&Config::default(), &HashMap::new(), env, None).unwrap();
        assert_eq!(settings.service_url, DEVELOPMENT_SERVICE_URL);
    }

    #[test]
    fn test_url_precedence() {
        let config = Config {
            identity_service_url: Some("https://from-config.example".into()),
            ..Default::default()
        };
        let mut dotenv = HashMap::new();
        dotenv.insert(
            "IDENTITY_SERVICE_URL".to_string(),
            "https://from-dotenv.example".to_string(),
        );
        let env = |key: &str| {
            (key == SERVICE_URL_ENV).then(|| "https://from-env.example/".to_string())
        };

        let settings = resolve_settings(&config, &HashMap::new(), no_env, None).unwrap();
        assert_eq!(settings.service_url, "https://from-config.example");

        let settings = resolve_settings(&config, &dotenv, no_env, None).unwrap();
        assert_eq!(settings.service_url, "https://from-dotenv.example");

        let settings = resolve_settings(&config, &dotenv, env, None).unwrap();
        assert_eq!(settings.service_url, "https://from-env.example");

        let settings =
            resolve_settings(&config, &dotenv, env, Some("http://127.0.0.1:9000")).unwrap();
        assert_eq!(settings.service_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(validate_service_url("not a url").is_err());
        assert!(validate_service_url("ftp://example.com").is_err());
        assert_eq!(
            validate_service_url(" http://localhost:3000/ ").unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_parse_env_file() {
        let vars = parse_env_file(
            "# comment\n\nexport ENVIRONMENT=dev\nidentity_service_url='http://localhost:4000'\nBROKEN\n",
        );
        assert_eq!(vars.get("ENVIRONMENT").map(String::as_str), Some("dev"));
        assert_eq!(
            vars.get("IDENTITY_SERVICE_URL").map(String::as_str),
            Some("http://localhost:4000")
        );
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_config_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path()).unwrap();

        assert_eq!(manager.load_config().unwrap(), Config::default());

        manager.set_service_url("http://localhost:3000/").unwrap();
        let config = manager.load_config().unwrap();
        assert_eq!(
            config.identity_service_url.as_deref(),
            Some("http://localhost:3000")
        );

        fs::write(
            manager.config_file(),
            "consent_mode = \"popup\"\nlocale = \"fr-CA\"\nlog_level = \"debug\"\n\
             [poll]\nmax_attempts = 5\n",
        )
        .unwrap();
        let config = manager.load_config().unwrap();
        assert_eq!(config.consent_mode, ConsentMode::Popup);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.locale, Locale::FrCa);
        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.poll.interval_ms, DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn test_settings_reads_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path()).unwrap();
        fs::write(manager.env_file(), "ENVIRONMENT=development\n").unwrap();

        let config = manager.load_config().unwrap();
        let dotenv = manager.load_env_file().unwrap();
        let settings = resolve_settings(&config, &dotenv, no_env, None).unwrap();
        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.service_url, DEVELOPMENT_SERVICE_URL);
    }
}
