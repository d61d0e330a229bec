//! Single-use, time-boxed account verification codes.

mod code;
mod manager;

pub use code::{MalformedCode, VerificationCode};
pub use manager::{
    verification_expiry, IssuedCode, RedeemOutcome, VerificationError, VerificationLinks,
    VerificationManager, VERIFICATION_EXPIRY_HOURS,
};
