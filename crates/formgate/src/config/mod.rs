use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub payments: PaymentProviderConfig,
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

        let payments = PaymentProviderConfig::from_env(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            payments,
        })
    }
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

/// Credentials and endpoints for the Paystack integration.
///
/// The secret key signs webhook payloads as well as authenticating outbound
/// calls, so a production deployment without one is a misconfiguration.
#[derive(Debug, Clone)]
pub struct PaymentProviderConfig {
    pub secret_key: String,
    pub base_url: String,
    pub callback_url: String,
}

const DEV_SECRET_KEY: &str = "sk_test_local";

impl PaymentProviderConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let secret_key = match env::var("PAYSTACK_SECRET_KEY") {
            Ok(value) if !value.trim().is_empty() => value,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingPaymentSecret);
            }
            _ => DEV_SECRET_KEY.to_string(),
        };

        let base_url = env::var("PAYSTACK_BASE_URL")
            .unwrap_or_else(|_| "https://api.paystack.co".to_string());
        let callback_url = env::var("PAYMENT_CALLBACK_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/payment/verify".to_string());

        Ok(Self {
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            callback_url,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingPaymentSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingPaymentSecret => {
                write!(f, "PAYSTACK_SECRET_KEY must be set outside development")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::MissingPaymentSecret => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
