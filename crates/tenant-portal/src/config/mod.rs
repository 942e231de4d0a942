use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = PortalConfig::default();
        let portal = PortalConfig {
            portal_url: env::var("APP_PORTAL_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.portal_url),
            invitation_ttl_days: parse_number("APP_INVITATION_TTL_DAYS")?
                .unwrap_or(defaults.invitation_ttl_days),
            lease_term_days: parse_number("APP_LEASE_TERM_DAYS")?
                .unwrap_or(defaults.lease_term_days),
            deposit_multiplier: parse_number("APP_DEPOSIT_MULTIPLIER")?
                .unwrap_or(defaults.deposit_multiplier),
            max_proof_bytes: parse_number("APP_MAX_PROOF_BYTES")?
                .unwrap_or(defaults.max_proof_bytes),
            admin_emails: env::var("APP_ADMIN_EMAILS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            identity_service_key: env::var("APP_IDENTITY_SERVICE_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            proof_storage_dir: env::var("APP_PROOF_STORAGE_DIR")
                .unwrap_or(defaults.proof_storage_dir),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            portal,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Onboarding and payment policy knobs shared by the workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub portal_url: String,
    pub invitation_ttl_days: i64,
    pub lease_term_days: i64,
    pub deposit_multiplier: u32,
    pub max_proof_bytes: usize,
    pub admin_emails: Vec<String>,
    pub identity_service_key: Option<String>,
    pub proof_storage_dir: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            portal_url: "http://localhost:3000".to_string(),
            invitation_ttl_days: 7,
            lease_term_days: 365,
            deposit_multiplier: 2,
            max_proof_bytes: 5 * 1024 * 1024,
            admin_emails: Vec::new(),
            identity_service_key: None,
            proof_storage_dir: "./proofs".to_string(),
        }
    }
}

impl PortalConfig {
    pub fn invitation_ttl(&self) -> Duration {
        Duration::days(self.invitation_ttl_days)
    }

    pub fn lease_term(&self) -> Duration {
        Duration::days(self.lease_term_days)
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.portal_url)
    }

    pub fn accept_url(&self, invitation_id: &str) -> String {
        format!("{}/accept-invitation/{invitation_id}", self.portal_url)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a non-negative whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
