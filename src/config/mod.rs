mod file_config;

pub use file_config::{AuthConfig, FileConfig, JobsConfig, MailConfig, VerificationConfig};

use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const MIN_JWT_SECRET_LENGTH: usize = 16;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    /// 0 disables the metrics listener.
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub jwt_secret: Option<String>,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub verification_url: Option<String>,
    pub verified_redirect_url: Option<String>,
    pub request_activation_redirect_url: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_sender_email: Option<String>,
    pub mail_sender_name: Option<String>,
    pub email_template_path: Option<PathBuf>,
    pub token_prune_interval_hours: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub logging_level: RequestsLoggingLevel,

    pub auth: AuthSettings,
    pub verification: VerificationSettings,
    pub mail: MailSettings,
    pub jobs: JobsSettings,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSettings {
    pub verification_url: String,
    pub verified_redirect_url: String,
    pub request_activation_redirect_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub template_path: Option<PathBuf>,
}

impl MailSettings {
    /// Whether emails go out through the HTTP mail API. Otherwise they are only logged.
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct JobsSettings {
    pub token_prune_interval_hours: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = match file.metrics_port.unwrap_or(cli.metrics_port) {
            0 => None,
            port => Some(port),
        };

        let logging_level = file
            .logging_level
            .as_deref()
            .and_then(parse_logging_level)
            .unwrap_or_else(|| cli.logging_level.clone());

        let auth = resolve_auth(cli, file.auth.unwrap_or_default())?;
        let verification = resolve_verification(cli, port, file.verification.unwrap_or_default());
        let mail = resolve_mail(cli, file.mail.unwrap_or_default())?;

        let token_prune_interval_hours = file
            .jobs
            .and_then(|j| j.token_prune_interval_hours)
            .unwrap_or(cli.token_prune_interval_hours);
        if token_prune_interval_hours == 0 {
            bail!("token_prune_interval_hours must be greater than 0");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            auth,
            verification,
            mail,
            jobs: JobsSettings {
                token_prune_interval_hours,
            },
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
        }
    }
}

fn resolve_auth(cli: &CliConfig, file: AuthConfig) -> Result<AuthSettings> {
    let jwt_secret = file
        .jwt_secret
        .or_else(|| cli.jwt_secret.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("jwt_secret must be specified via --jwt-secret or in config file")
        })?;
    if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
        bail!(
            "jwt_secret must be at least {} characters long",
            MIN_JWT_SECRET_LENGTH
        );
    }

    let access_minutes = file
        .access_token_ttl_minutes
        .unwrap_or(cli.access_token_ttl_minutes);
    let refresh_days = file
        .refresh_token_ttl_days
        .unwrap_or(cli.refresh_token_ttl_days);
    if access_minutes <= 0 || refresh_days <= 0 {
        bail!("Token lifetimes must be positive");
    }

    Ok(AuthSettings {
        jwt_secret,
        access_token_ttl: chrono::Duration::minutes(access_minutes),
        refresh_token_ttl: chrono::Duration::days(refresh_days),
    })
}

fn resolve_verification(
    cli: &CliConfig,
    port: u16,
    file: VerificationConfig,
) -> VerificationSettings {
    VerificationSettings {
        verification_url: file
            .verification_url
            .or_else(|| cli.verification_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}/v1/auth/account/activation", port)),
        verified_redirect_url: file
            .verified_redirect_url
            .or_else(|| cli.verified_redirect_url.clone())
            .unwrap_or_else(|| "http://localhost:3000/account/verified".to_string()),
        request_activation_redirect_url: file
            .request_activation_redirect_url
            .or_else(|| cli.request_activation_redirect_url.clone())
            .unwrap_or_else(|| "http://localhost:3000/account/request-activation".to_string()),
    }
}

fn resolve_mail(cli: &CliConfig, file: MailConfig) -> Result<MailSettings> {
    let api_url = file.api_url.or_else(|| cli.mail_api_url.clone());
    let api_key = file.api_key.or_else(|| cli.mail_api_key.clone());
    if api_url.is_some() != api_key.is_some() {
        bail!("mail api_url and api_key must be configured together");
    }

    Ok(MailSettings {
        api_url,
        api_key,
        sender_email: file
            .sender_email
            .or_else(|| cli.mail_sender_email.clone())
            .unwrap_or_else(|| "noreply@journ.app".to_string()),
        sender_name: file.sender_name.or_else(|| cli.mail_sender_name.clone()),
        template_path: file
            .template_path
            .map(PathBuf::from)
            .or_else(|| cli.email_template_path.clone()),
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
