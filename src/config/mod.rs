//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Session cookie attributes and token lifetimes
//! - Mail delivery backends

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub company: CompanyConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Superuser created by `--create-superuser`
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API with credentials (cookies)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,
    /// Validity window of activation and password-reset links
    #[serde(default = "default_activation_ttl")]
    pub activation_token_ttl_secs: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
}

/// Upper bound for any configured token lifetime (ten years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn default_access_ttl() -> u64 {
    300
}

fn default_refresh_ttl() -> u64 {
    86_400
}

fn default_activation_ttl() -> u64 {
    86_400
}

fn default_password_min_length() -> usize {
    8
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// `SameSite` attribute applied to the session cookies
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

/// Session cookie configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookieConfig {
    #[serde(default = "default_access_cookie")]
    pub access_name: String,
    #[serde(default = "default_refresh_cookie")]
    pub refresh_name: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub secure: bool,
    #[serde(default = "default_true")]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: SameSitePolicy,
}

fn default_access_cookie() -> String {
    "access".to_string()
}

fn default_refresh_cookie() -> String {
    "refresh".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_name: default_access_cookie(),
            refresh_name: default_refresh_cookie(),
            path: default_cookie_path(),
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::default(),
        }
    }
}

/// Company identity used in employee numbers and outgoing mail
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompanyConfig {
    /// Prefix of every employee number (`<ABBR>-<year>-<id>`)
    #[serde(default = "default_company_abbr")]
    pub abbreviation: String,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_activation_path")]
    pub activation_path: String,
    #[serde(default = "default_password_reset_path")]
    pub password_reset_path: String,
}

fn default_company_abbr() -> String {
    "RBS".to_string()
}

fn default_site_name() -> String {
    "ReelService".to_string()
}

fn default_domain() -> String {
    "localhost:3000".to_string()
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_activation_path() -> String {
    "auth/activate/{uid}/{token}".to_string()
}

fn default_password_reset_path() -> String {
    "password-reset/{uid}/{token}".to_string()
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            abbreviation: default_company_abbr(),
            site_name: default_site_name(),
            domain: default_domain(),
            protocol: default_protocol(),
            activation_path: default_activation_path(),
            password_reset_path: default_password_reset_path(),
        }
    }
}

/// Mail delivery backend
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Deliver through an SMTP relay
    Smtp,
    /// Only log outgoing messages - default for development
    #[default]
    Log,
    /// Keep messages in an in-process outbox
    Memory,
}

/// Mail configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    #[serde(default)]
    pub backend: MailBackend,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Use STARTTLS instead of implicit TLS
    #[serde(default = "default_true")]
    pub starttls: bool,
}

fn default_from_address() -> String {
    "ReelService <no-reply@localhost>".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailBackend::default(),
            from_address: default_from_address(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            starttls: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "hr-onboarding")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/hr-onboarding")
}

fn default_log_prefix() -> String {
    "hr-onboarding".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Bootstrap superuser credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    pub superuser_email: String,
    pub superuser_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                cors_origins: vec![],
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production-minimum-32-characters-long".to_string(),
                access_token_ttl_secs: default_access_ttl(),
                refresh_token_ttl_secs: default_refresh_ttl(),
                activation_token_ttl_secs: default_activation_ttl(),
                password_min_length: default_password_min_length(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/onboarding.db".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            cookies: CookieConfig::default(),
            company: CompanyConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
            bootstrap: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("ONBOARDING_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/hr-onboarding/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("hr-onboarding/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ONBOARDING_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ONBOARDING_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ONBOARDING_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(target) = std::env::var("ONBOARDING_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Ok(dir) = std::env::var("ONBOARDING_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        if let Ok(abbr) = std::env::var("ONBOARDING_COMPANY_ABBR") {
            self.company.abbreviation = abbr;
        }
        if let Ok(domain) = std::env::var("ONBOARDING_DOMAIN") {
            self.company.domain = domain;
        }

        if let Ok(host) = std::env::var("ONBOARDING_SMTP_HOST") {
            self.mail.smtp_host = Some(host);
            self.mail.backend = MailBackend::Smtp;
        }
        if let Ok(username) = std::env::var("ONBOARDING_SMTP_USERNAME") {
            self.mail.smtp_username = Some(username);
        }
        if let Ok(password) = std::env::var("ONBOARDING_SMTP_PASSWORD") {
            self.mail.smtp_password = Some(password);
        }
        if let Ok(from) = std::env::var("ONBOARDING_MAIL_FROM") {
            self.mail.from_address = from;
        }

        if let (Ok(email), Ok(password)) = (
            std::env::var("ONBOARDING_SUPERUSER_EMAIL"),
            std::env::var("ONBOARDING_SUPERUSER_PASSWORD"),
        ) {
            self.bootstrap = Some(BootstrapConfig {
                superuser_email: email,
                superuser_password: password,
            });
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("JWT secret must be at least 32 characters long");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        let ttls = [
            self.auth.access_token_ttl_secs,
            self.auth.refresh_token_ttl_secs,
            self.auth.activation_token_ttl_secs,
        ];
        if ttls.iter().any(|&ttl| ttl == 0 || ttl > MAX_TOKEN_TTL_SECS) {
            anyhow::bail!(
                "Token lifetimes must be between 1 and {} seconds",
                MAX_TOKEN_TTL_SECS
            );
        }

        if self.auth.access_token_ttl_secs > self.auth.refresh_token_ttl_secs {
            anyhow::bail!("Access token lifetime cannot exceed the refresh token lifetime");
        }

        let abbr = &self.company.abbreviation;
        if abbr.is_empty() || !abbr.chars().all(|c| c.is_ascii_uppercase()) {
            anyhow::bail!(
                "Company abbreviation must be non-empty uppercase ASCII, got {:?}",
                abbr
            );
        }

        for template in [&self.company.activation_path, &self.company.password_reset_path] {
            if !template.contains("{uid}") || !template.contains("{token}") {
                anyhow::bail!(
                    "Link path template {:?} must contain {{uid}} and {{token}}",
                    template
                );
            }
        }

        if self.cookies.same_site == SameSitePolicy::None && !self.cookies.secure {
            anyhow::bail!("SameSite=None cookies must be marked secure");
        }

        if self.mail.backend == MailBackend::Smtp && self.mail.smtp_host.is_none() {
            anyhow::bail!("SMTP mail backend requires mail.smtp_host");
        }

        Ok(())
    }
}
