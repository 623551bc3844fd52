use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub reports: ReportConfig,
    pub notifications: NotificationConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "1221".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let public_base_url = env::var("APP_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();
        let output_dir = env::var("REPORT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/pdfs"));

        let notifications = NotificationConfig {
            api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.emailit.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: non_empty_var("EMAIL_API_KEY"),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".to_string()),
            from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Lead Audit".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            reports: ReportConfig {
                output_dir,
                public_base_url,
                brand_name: env::var("APP_BRAND").unwrap_or_else(|_| "Lead Audit".to_string()),
                booking_url: non_empty_var("BOOKING_URL"),
                website_url: non_empty_var("BRAND_WEBSITE_URL"),
            },
            notifications,
            admin: AdminConfig {
                api_token: non_empty_var("ADMIN_API_TOKEN"),
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where rendered reports land and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub public_base_url: String,
    pub brand_name: String,
    pub booking_url: Option<String>,
    pub website_url: Option<String>,
}

impl ReportConfig {
    /// Public download URL for a rendered report file.
    pub fn report_url(&self, file_name: &str) -> String {
        format!("{}/pdfs/{}", self.public_base_url, file_name)
    }
}

/// Transactional e-mail API settings.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub admin_email: String,
    pub from_name: String,
}

/// Bearer token guarding the admin dashboard. `None` disables the admin routes.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    pub api_token: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
