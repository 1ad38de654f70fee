use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

use crate::services::credentials::DEFAULT_HASH_ITERATIONS;
use crate::services::mailer::SmtpSettings;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_URL: &str = "postgres://localhost/popnplan";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ADMIN_EMAIL: &str = "admin@popnplan.local";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEV_JWT_SECRET: &str = "popnplan-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuth {
    /// Admin routes accept any caller.
    Open,
    /// Admin routes need a bearer token issued to a user account.
    Required,
}

#[derive(Debug, Clone)]
pub enum MailBackend {
    Console,
    Smtp(SmtpSettings),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub password_hash_iterations: u32,
    pub admin_email: String,
    pub admin_auth: AdminAuth,
    pub cors_allowed_origins: Option<String>,
    pub mail: MailBackend,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = match var("RUST_ENV").map(|v| v.to_lowercase()).as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };

        let host = parse_or(&var, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(&var, "PORT", DEFAULT_PORT)?;

        let store_backend = match var("STORE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let jwt_secret = match (var("JWT_SECRET"), environment) {
            (Some(secret), _) => secret,
            (None, Environment::Production) => return Err(ConfigError::Missing("JWT_SECRET")),
            (None, Environment::Development) => {
                tracing::warn!("JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let admin_auth = match var("ADMIN_AUTH").map(|v| v.to_lowercase()).as_deref() {
            None | Some("open") => AdminAuth::Open,
            Some("required") => AdminAuth::Required,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "ADMIN_AUTH",
                    value: other.to_string(),
                })
            }
        };

        let mail = match var("MAIL_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("console") => MailBackend::Console,
            Some("smtp") => MailBackend::Smtp(SmtpSettings {
                host: var("SMTP_HOST").ok_or(ConfigError::Missing("SMTP_HOST"))?,
                port: parse_or(&var, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username: var("SMTP_USERNAME").unwrap_or_default(),
                password: var("SMTP_PASSWORD").unwrap_or_default(),
                from_email: var("EMAIL_FROM").ok_or(ConfigError::Missing("EMAIL_FROM"))?,
                from_name: var("EMAIL_FROM_NAME").unwrap_or_else(|| "POP N' PLAN".to_string()),
            }),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "MAIL_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            environment,
            bind_addr: SocketAddr::new(host, port),
            store_backend,
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                &var,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            jwt_secret,
            password_hash_iterations: parse_or(
                &var,
                "PASSWORD_HASH_ITERATIONS",
                DEFAULT_HASH_ITERATIONS,
            )?,
            admin_email: var("ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            admin_auth,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
            mail,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
