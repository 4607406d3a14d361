use std::fs;
use std::path::{Path, PathBuf};

use accounts::SmtpSettings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

const APP_NAME: &str = "taskdeck";
const MASK: &str = "********";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Cross-site cookies (`SameSite=None; Secure`) when set
    pub production: bool,
    /// Allowed CORS origin, also the base of password reset links
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            production: false,
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: None,
            password: None,
            from_name: "Todo App".to_string(),
        }
    }
}

impl EmailConfig {
    /// SMTP settings, if credentials are configured
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let username = self.username.clone().filter(|u| !u.is_empty())?;
        let password = self.password.clone().filter(|p| !p.is_empty())?;

        Some(SmtpSettings {
            host: self.host.clone(),
            port: self.port,
            username,
            password,
            from_name: self.from_name.clone(),
        })
    }
}

/// Database configuration - re-exported from db crate
pub use db::DatabaseConfig;

impl Config {
    /// Apply environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("TASKDECK_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Invalid TASKDECK_PORT value {port:?}: {e}"),
            }
        }
        if let Some(production) = lookup("TASKDECK_PRODUCTION") {
            match parse_bool(&production) {
                Some(production) => self.server.production = production,
                None => warn!("Invalid TASKDECK_PRODUCTION value {production:?}"),
            }
        }
        if let Some(url) = lookup("FRONTEND_URL") {
            self.server.frontend_url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(user) = lookup("EMAIL_USER") {
            self.email.username = Some(user);
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            self.email.password = Some(password);
        }
    }

    /// Copy with every secret masked, for display
    pub fn redacted(&self) -> Config {
        let mut cfg = self.clone();
        mask(&mut cfg.auth.jwt_secret);
        mask(&mut cfg.database.password);
        mask(&mut cfg.email.password);
        cfg
    }
}

fn mask(value: &mut Option<String>) {
    if value.is_some() {
        *value = Some(MASK.to_string());
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    // TASKDECK_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var("TASKDECK_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .context("Could not determine config directory")
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn get_db_path(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.database.path {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("db"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_file()?)
}

pub fn load_config_from(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &get_config_file()?)
}

pub fn save_config_to(config: &Config, config_file: &Path) -> Result<()> {
    if let Some(config_dir) = config_file.parent() {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                fs::set_permissions(config_dir, perms)?;
            }
        }
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(config_file, contents)
        .with_context(|| format!("Failed to write config file: {}", config_file.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(config_file, perms)?;
    }

    Ok(())
}

/// Keys accepted by `config get` / `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "server.host",
    "server.port",
    "server.production",
    "server.frontend_url",
    "auth.jwt_secret",
    "database.path",
    "database.url",
    "database.namespace",
    "database.username",
    "database.password",
    "email.host",
    "email.port",
    "email.username",
    "email.password",
    "email.from_name",
];

pub fn get_config_value(config: &Config, key: &str) -> Option<String> {
    let secret = |value: &Option<String>| value.as_ref().map(|_| MASK.to_string());

    match key {
        "server.host" => Some(config.server.host.clone()),
        "server.port" => Some(config.server.port.to_string()),
        "server.production" => Some(config.server.production.to_string()),
        "server.frontend_url" => Some(config.server.frontend_url.clone()),
        "auth.jwt_secret" => secret(&config.auth.jwt_secret),
        "database.path" => config.database.path.as_ref().map(|p| p.display().to_string()),
        "database.url" => config.database.url.clone(),
        "database.namespace" => config.database.namespace.clone(),
        "database.username" => config.database.username.clone(),
        "database.password" => secret(&config.database.password),
        "email.host" => Some(config.email.host.clone()),
        "email.port" => Some(config.email.port.to_string()),
        "email.username" => config.email.username.clone(),
        "email.password" => secret(&config.email.password),
        "email.from_name" => Some(config.email.from_name.clone()),
        _ => None,
    }
}

pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server.host" => config.server.host = value.to_string(),
        "server.port" => {
            config.server.port = value
                .parse()
                .with_context(|| format!("Invalid port: {}", value))?
        }
        "server.production" => {
            config.server.production = parse_bool(value)
                .with_context(|| format!("Invalid boolean: {}", value))?
        }
        "server.frontend_url" => config.server.frontend_url = value.to_string(),
        "auth.jwt_secret" => config.auth.jwt_secret = Some(value.to_string()),
        "database.path" => config.database.path = Some(PathBuf::from(value)),
        "database.url" => config.database.url = Some(value.to_string()),
        "database.namespace" => config.database.namespace = Some(value.to_string()),
        "database.username" => config.database.username = Some(value.to_string()),
        "database.password" => config.database.password = Some(value.to_string()),
        "email.host" => config.email.host = value.to_string(),
        "email.port" => {
            config.email.port = value
                .parse()
                .with_context(|| format!("Invalid port: {}", value))?
        }
        "email.username" => config.email.username = Some(value.to_string()),
        "email.password" => config.email.password = Some(value.to_string()),
        "email.from_name" => config.email.from_name = value.to_string(),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}
