use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Sections
    pub auth: Option<AuthConfig>,
    pub verification: Option<VerificationConfig>,
    pub mail: Option<MailConfig>,
    pub jobs: Option<JobsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub access_token_ttl_minutes: Option<i64>,
    pub refresh_token_ttl_days: Option<i64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    /// Public URL of the activation endpoint, used in emailed links.
    pub verification_url: Option<String>,
    pub verified_redirect_url: Option<String>,
    pub request_activation_redirect_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub template_path: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct JobsConfig {
    pub token_prune_interval_hours: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            port = 4000
            logging_level = "headers"

            [auth]
            jwt_secret = "0123456789abcdef"
            refresh_token_ttl_days = 14

            [verification]
            verified_redirect_url = "https://journ.app/verified"

            [mail]
            api_url = "https://api.brevo.com/v3/smtp/email"
            api_key = "key"
            sender_email = "noreply@journ.app"

            [jobs]
            token_prune_interval_hours = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(4000));
        assert_eq!(config.db_dir, None);
        let auth = config.auth.unwrap();
        assert_eq!(auth.jwt_secret.as_deref(), Some("0123456789abcdef"));
        assert_eq!(auth.refresh_token_ttl_days, Some(14));
        assert_eq!(auth.access_token_ttl_minutes, None);
        assert_eq!(
            config.verification.unwrap().verified_redirect_url.as_deref(),
            Some("https://journ.app/verified")
        );
        assert_eq!(config.mail.unwrap().sender_email.as_deref(), Some("noreply@journ.app"));
        assert_eq!(config.jobs.unwrap().token_prune_interval_hours, Some(6));
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = TempDir::new().unwrap();
        assert!(FileConfig::load(&dir.path().join("missing.toml")).is_err());

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        let err = FileConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
