use super::code::VerificationCode;
use crate::background_jobs::{TaskContext, TaskError, TaskHandle, TaskRunner};
use crate::clock::Clock;
use crate::notifications::VerificationEmailTemplate;
use crate::server::metrics;
use crate::user::FullUserStore;
use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Codes are redeemable for strictly less than this long after issue.
pub const VERIFICATION_EXPIRY_HOURS: i64 = 24;

pub fn verification_expiry() -> Duration {
    Duration::hours(VERIFICATION_EXPIRY_HOURS)
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("No account is registered with this email")]
    NotFound,
    #[error("Account is already verified")]
    AlreadyActive,
    #[error("The verification code is malformed")]
    Malformed,
    #[error("The verification code is not valid, please restart account verification")]
    NoMatch,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl VerificationError {
    pub fn label(&self) -> &'static str {
        match self {
            VerificationError::NotFound => "not_found",
            VerificationError::AlreadyActive => "already_active",
            VerificationError::Malformed => "malformed",
            VerificationError::NoMatch => "no_match",
            VerificationError::Store(_) => "store_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The account was activated by this call.
    Verified,
    /// The code is too old. Nothing was changed.
    Expired,
}

impl RedeemOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RedeemOutcome::Verified => "verified",
            RedeemOutcome::Expired => "expired",
        }
    }
}

/// Public URLs involved in the activation round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationLinks {
    /// Server endpoint the emailed link points at.
    pub verification_url: String,
    /// Where a successfully verified user is sent.
    pub verified_redirect_url: String,
    /// Where a user holding an expired code is sent to ask for a new one.
    pub request_activation_redirect_url: String,
}

/// What `issue_code` produced: the new code and the task delivering it.
#[derive(Debug)]
pub struct IssuedCode {
    pub user_id: usize,
    pub code: VerificationCode,
    pub delivery: TaskHandle,
}

pub struct VerificationManager {
    store: Arc<dyn FullUserStore>,
    runner: TaskRunner,
    clock: Arc<dyn Clock>,
    links: VerificationLinks,
    template: VerificationEmailTemplate,
}

impl VerificationManager {
    pub fn new(
        store: Arc<dyn FullUserStore>,
        runner: TaskRunner,
        clock: Arc<dyn Clock>,
        links: VerificationLinks,
        template: VerificationEmailTemplate,
    ) -> Self {
        Self {
            store,
            runner,
            clock,
            links,
            template,
        }
    }

    pub fn links(&self) -> &VerificationLinks {
        &self.links
    }

    pub fn verification_link(&self, code: &VerificationCode) -> String {
        format!("{}?code={}", self.links.verification_url, code.encode())
    }

    /// Replaces the user's code with a fresh one and emails the link.
    pub fn issue_code(&self, email: &str) -> Result<IssuedCode, VerificationError> {
        let record = self
            .store
            .get_verification_by_email(email.trim())?
            .ok_or(VerificationError::NotFound)?;
        if record.activated {
            return Err(VerificationError::AlreadyActive);
        }

        let code = VerificationCode::generate();
        let stored =
            self.store
                .set_verification_code(record.user_id, &code.to_string(), self.clock.now())?;
        if !stored {
            // Activated between the lookup and the write.
            return Err(VerificationError::AlreadyActive);
        }
        info!("Issued a new verification code for user {}", record.user_id);

        let delivery = self.send_link(&record.email, &record.username, &code);
        Ok(IssuedCode {
            user_id: record.user_id,
            code,
            delivery,
        })
    }

    /// Dispatches the email carrying the link for `code`. Delivery failures
    /// only reach the task supervisor.
    pub fn send_link(&self, email: &str, username: &str, code: &VerificationCode) -> TaskHandle {
        let message = self
            .template
            .render(email, username, &self.verification_link(code));
        self.runner.run_immediate(
            "verification_email",
            Arc::new(move |ctx: &TaskContext| {
                if ctx.is_cancelled() {
                    return Err(TaskError::Cancelled);
                }
                ctx.mailer.send(&message)?;
                Ok(())
            }),
        )
    }

    pub fn redeem_code(&self, encoded: &str) -> Result<RedeemOutcome, VerificationError> {
        let result = self.redeem(encoded);
        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(err) => err.label(),
        };
        metrics::record_verification_outcome(label);
        result
    }

    fn redeem(&self, encoded: &str) -> Result<RedeemOutcome, VerificationError> {
        let code = VerificationCode::decode(encoded).map_err(|_| VerificationError::Malformed)?;
        let code = code.to_string();

        let record = self
            .store
            .get_verification_by_code(&code)?
            .ok_or(VerificationError::NoMatch)?;
        if record.activated {
            return Err(VerificationError::AlreadyActive);
        }

        let elapsed = match record.issued_at {
            Some(issued_at) => self.clock.now() - issued_at,
            None => {
                warn!("User {} has a code but no issue time", record.user_id);
                return Ok(RedeemOutcome::Expired);
            }
        };
        if elapsed >= verification_expiry() {
            debug!(
                "Code for user {} expired {:?} ago",
                record.user_id,
                elapsed - verification_expiry()
            );
            return Ok(RedeemOutcome::Expired);
        }

        if self.store.activate_user(record.user_id, &code)? {
            info!("Activated user {}", record.user_id);
            return Ok(RedeemOutcome::Verified);
        }

        // Lost a race against another redemption or a reissue.
        match self.store.get_verification_by_code(&code)? {
            Some(current) if current.activated => Err(VerificationError::AlreadyActive),
            _ => Err(VerificationError::NoMatch),
        }
    }
}
