use super::models::{EmailAddress, OutgoingEmail};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Email transport. Called from task actions, on a blocking thread.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: &'a EmailAddress,
    to: Vec<&'a EmailAddress>,
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
}

/// Sends through a transactional email HTTP API (Brevo-compatible JSON).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: EmailAddress,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, sender: EmailAddress) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for the mailer")?;
        Ok(Self {
            client,
            api_url,
            api_key,
            sender,
        })
    }

    async fn send_async(&self, email: &OutgoingEmail) -> Result<()> {
        let body = SendEmailBody {
            sender: &self.sender,
            to: vec![&email.to],
            subject: &email.subject,
            html_content: &email.html,
            text_content: &email.text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach email API at {}", self.api_url))?;

        let status = response.status();
        if status.is_success() {
            info!("Sent \"{}\" to {}", email.subject, email.to.email);
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        bail!("Email API returned {}: {}", status, body)
    }
}

impl Mailer for HttpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let handle = Handle::try_current().context("The HTTP mailer needs a Tokio runtime")?;
        handle.block_on(self.send_async(email))
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(
            "No email provider configured, \"{}\" for {}:\n{}",
            email.subject, email.to.email, email.text
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent_to(&self, email: &str) -> Option<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to.email == email)
            .cloned()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::Arc;

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: EmailAddress::new("alice@example.com", Some("alice".to_string())),
            subject: "Account Registration".to_string(),
            html: "<p>hi</p>".to_string(),
            text: "hi".to_string(),
        }
    }

    async fn spawn_email_api(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/v3/smtp/email",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| async move {
                        let key = headers
                            .get("api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(|s| s.to_string());
                        captured.lock().unwrap().push((key, body));
                        status
                    },
                ),
            )
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v3/smtp/email", addr), captured)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_mailer_posts_json_payload() {
        let (url, captured) = spawn_email_api(StatusCode::CREATED).await;
        let mailer = HttpMailer::new(
            url,
            "key-123".to_string(),
            EmailAddress::new("noreply@journ.local", Some("Journ".to_string())),
        )
        .unwrap();

        tokio::task::spawn_blocking(move || mailer.send(&email()))
            .await
            .unwrap()
            .unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (key, body) = &captured[0];
        assert_eq!(key.as_deref(), Some("key-123"));
        assert_eq!(body["sender"]["email"], "noreply@journ.local");
        assert_eq!(body["to"][0]["email"], "alice@example.com");
        assert_eq!(body["to"][0]["name"], "alice");
        assert_eq!(body["subject"], "Account Registration");
        assert_eq!(body["htmlContent"], "<p>hi</p>");
        assert_eq!(body["textContent"], "hi");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_mailer_reports_rejections() {
        let (url, _captured) = spawn_email_api(StatusCode::BAD_REQUEST).await;
        let mailer = HttpMailer::new(
            url,
            "key".to_string(),
            EmailAddress::new("noreply@journ.local", None),
        )
        .unwrap();

        let result = tokio::task::spawn_blocking(move || mailer.send(&email()))
            .await
            .unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn http_mailer_needs_a_runtime() {
        let mailer = HttpMailer::new(
            "http://127.0.0.1:9/".to_string(),
            "key".to_string(),
            EmailAddress::new("noreply@journ.local", None),
        )
        .unwrap();
        assert!(mailer.send(&email()).is_err());
    }

    #[test]
    fn memory_mailer_keeps_messages() {
        let mailer = MemoryMailer::default();
        mailer.send(&email()).unwrap();
        assert_eq!(mailer.sent().len(), 1);
        assert!(mailer.last_sent_to("alice@example.com").is_some());
        assert!(mailer.last_sent_to("bob@example.com").is_none());
        assert!(LogMailer.send(&email()).is_ok());
    }
}
