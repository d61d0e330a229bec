//! Outgoing email: message models, the verification template and transports.

mod mailer;
mod models;
mod template;

pub use mailer::{HttpMailer, LogMailer, Mailer, MemoryMailer};
pub use models::{EmailAddress, OutgoingEmail};
pub use template::{VerificationEmailTemplate, VERIFICATION_SUBJECT};
