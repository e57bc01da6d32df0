use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::onboarding::IntakePolicy;

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
    pub registration: RegistrationConfig,
    pub admin: Option<AdminSeed>,
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

        let min_age = match env::var("APP_MIN_AGE") {
            Ok(raw) => raw.parse::<u8>().map_err(|_| ConfigError::InvalidMinAge)?,
            Err(_) => IntakePolicy::default().min_age,
        };
        let max_cv_bytes = match env::var("APP_MAX_CV_BYTES") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidCvLimit)?,
            Err(_) => IntakePolicy::default().max_cv_bytes,
        };

        let admin = match (env::var("APP_ADMIN_USERNAME"), env::var("APP_ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(AdminSeed { username, password }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            registration: RegistrationConfig {
                min_age,
                max_cv_bytes,
            },
            admin,
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

/// Tracing controls. ANSI coloring is only useful on an interactive
/// terminal, so it follows the environment.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Registration limits that feed the intake policy.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub min_age: u8,
    pub max_cv_bytes: usize,
}

impl RegistrationConfig {
    pub fn intake_policy(&self) -> IntakePolicy {
        IntakePolicy {
            min_age: self.min_age,
            max_cv_bytes: self.max_cv_bytes,
            ..IntakePolicy::default()
        }
    }
}

/// Administrative account created at startup when configured.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidMinAge,
    InvalidCvLimit,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidMinAge => write!(f, "APP_MIN_AGE must be a valid u8"),
            ConfigError::InvalidCvLimit => write!(f, "APP_MAX_CV_BYTES must be a byte count"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidMinAge
            | ConfigError::InvalidCvLimit => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_MIN_AGE");
        env::remove_var("APP_MAX_CV_BYTES");
        env::remove_var("APP_ADMIN_USERNAME");
        env::remove_var("APP_ADMIN_PASSWORD");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.telemetry.ansi);
        assert_eq!(config.registration.min_age, 18);
        assert!(config.admin.is_none());
    }

    #[test]
    fn production_disables_ansi_logging() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(!config.telemetry.ansi);
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn registration_limits_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MIN_AGE", "16");
        env::set_var("APP_MAX_CV_BYTES", "1024");
        let config = AppConfig::load().expect("config loads");
        let policy = config.registration.intake_policy();
        assert_eq!(policy.min_age, 16);
        assert_eq!(policy.max_cv_bytes, 1024);
    }

    #[test]
    fn admin_seed_requires_both_variables() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ADMIN_USERNAME", "root");
        let config = AppConfig::load().expect("config loads");
        assert!(config.admin.is_none());

        env::set_var("APP_ADMIN_PASSWORD", "super-secret");
        let config = AppConfig::load().expect("config loads");
        let seed = config.admin.expect("admin seed present");
        assert_eq!(seed.username, "root");
        reset_env();
    }
}
