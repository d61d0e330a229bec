//! Verification email rendering.

use super::models::{EmailAddress, OutgoingEmail};
use anyhow::{Context, Result};
use std::path::Path;

pub const VERIFICATION_SUBJECT: &str = "Account Registration";

const DEFAULT_VERIFICATION_HTML: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <p>Hi {{first_name}},</p>
    <p>Thanks for signing up. Please confirm your email address by following the link below.</p>
    <p><a href="{{verification_link}}">Verify my account</a></p>
    <p>The link expires in 24 hours.</p>
  </body>
</html>
"#;

/// HTML body with `{{first_name}}` and `{{verification_link}}` placeholders.
#[derive(Debug, Clone)]
pub struct VerificationEmailTemplate {
    html: String,
}

impl Default for VerificationEmailTemplate {
    fn default() -> Self {
        Self {
            html: DEFAULT_VERIFICATION_HTML.to_string(),
        }
    }
}

impl VerificationEmailTemplate {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read email template {:?}", path))?;
        Ok(Self { html })
    }

    pub fn render(&self, to_email: &str, first_name: &str, verification_link: &str) -> OutgoingEmail {
        let html = self
            .html
            .replace("{{first_name}}", first_name)
            .replace("{{verification_link}}", verification_link);
        let text = format!(
            "Hi {},\n\nPlease confirm your email address by opening this link:\n{}\n\nThe link expires in 24 hours.\n",
            first_name, verification_link
        );
        OutgoingEmail {
            to: EmailAddress::new(to_email, Some(first_name.to_string())),
            subject: VERIFICATION_SUBJECT.to_string(),
            html,
            text,
        }
    }
}
