use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use gatehouse_application::{
    DEFAULT_RETENTION_DAYS, RetentionPolicy, RouterConfig, SweepConfig, VisitConfig,
};
use gatehouse_core::AppError;
use gatehouse_domain::AuditCategory;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

/// Process configuration, read once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub max_occupancy: usize,
    pub visitor_retention_days: i64,
    pub visit: VisitConfig,
    pub retention: RetentionPolicy,
    pub router: RouterConfig,
    pub sweeps: SweepConfig,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let max_occupancy = parse_env("GATEHOUSE_MAX_OCCUPANCY", 100_usize)?;
        let visitor_retention_days = parse_env("GATEHOUSE_VISITOR_RETENTION_DAYS", 730_i64)?;

        let visit = VisitConfig {
            qr_ttl_hours: parse_env("GATEHOUSE_QR_TTL_HOURS", VisitConfig::default().qr_ttl_hours)?,
            no_show_grace_minutes: parse_env(
                "GATEHOUSE_NO_SHOW_GRACE_MINUTES",
                VisitConfig::default().no_show_grace_minutes,
            )?,
        };

        let retention = RetentionPolicy::new(
            parse_env("GATEHOUSE_RETENTION_DAYS_DEFAULT", DEFAULT_RETENTION_DAYS)?,
            category_overrides()?,
            env::var("GATEHOUSE_AUTO_PURGE")
                .unwrap_or_else(|_| "false".to_owned())
                .eq_ignore_ascii_case("true"),
        );

        let router = RouterConfig {
            retry_attempts: parse_env(
                "GATEHOUSE_NOTIFY_RETRY_ATTEMPTS",
                RouterConfig::default().retry_attempts,
            )?,
            ..RouterConfig::default()
        };

        let email_provider = match env::var("EMAIL_PROVIDER")
            .unwrap_or_else(|_| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty_env("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                EmailProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty_env("SMTP_HOST")?,
                    port,
                    username: required_non_empty_env("SMTP_USERNAME")?,
                    password: required_non_empty_env("SMTP_PASSWORD")?,
                    from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            api_host,
            api_port,
            max_occupancy,
            visitor_retention_days,
            visit,
            retention,
            router,
            sweeps: SweepConfig::default(),
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

// GATEHOUSE_RETENTION_DAYS_<CATEGORY> overrides the default per ledger
// category, e.g. GATEHOUSE_RETENTION_DAYS_SECURITY=3650.
fn category_overrides() -> Result<HashMap<AuditCategory, i64>, AppError> {
    let categories = [
        AuditCategory::Authentication,
        AuditCategory::Authorization,
        AuditCategory::DataAccess,
        AuditCategory::DataModification,
        AuditCategory::SystemAccess,
        AuditCategory::Security,
        AuditCategory::Privacy,
        AuditCategory::Compliance,
        AuditCategory::Error,
    ];

    let mut overrides = HashMap::new();
    for category in categories {
        let key = format!(
            "GATEHOUSE_RETENTION_DAYS_{}",
            category.as_str().to_ascii_uppercase()
        );
        if let Ok(value) = env::var(&key) {
            let days = value
                .parse::<i64>()
                .map_err(|error| AppError::Validation(format!("invalid {key}: {error}")))?;
            overrides.insert(category, days);
        }
    }
    Ok(overrides)
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {key}: {error}"))),
        Err(_) => Ok(default),
    }
}

fn required_non_empty_env(key: &str) -> Result<String, AppError> {
    let value = env::var(key)
        .map_err(|_| AppError::Validation(format!("{key} environment variable is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{key} must not be empty")));
    }
    Ok(value)
}
