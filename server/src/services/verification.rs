//! One-time email verification codes.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use rand::Rng;

use crate::models::Account;

/// Codes expire this many minutes after issue.
pub const CODE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// A uniformly random 6-digit code valid until `now + 10 minutes`.
pub fn issue(now: DateTime<Utc>) -> IssuedCode {
    let code = rand::thread_rng().gen_range(100_000..=999_999u32);
    IssuedCode {
        code: code.to_string(),
        expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    AlreadyVerified,
    /// No code outstanding, or `now` is past the expiry instant.
    Expired,
    Mismatch,
    Accepted,
}

/// Checks `submitted` against the code stored on `account` without mutating it.
///
/// The expiry instant itself is still valid. Comparison is exact string
/// equality.
pub fn check(account: &Account, submitted: &str, now: DateTime<Utc>) -> CodeCheck {
    if account.is_verified {
        return CodeCheck::AlreadyVerified;
    }

    let (Some(code), Some(expires_at)) = (
        account.verification_code.as_deref(),
        account.verification_expires,
    ) else {
        return CodeCheck::Expired;
    };

    if code.is_empty() || now > expires_at {
        return CodeCheck::Expired;
    }

    if constant_time_eq(code.as_bytes(), submitted.as_bytes()) {
        CodeCheck::Accepted
    } else {
        CodeCheck::Mismatch
    }
}

/// Stores a freshly issued code on the account.
pub fn attach(account: &mut Account, issued: &IssuedCode, now: DateTime<Utc>) {
    account.verification_code = Some(issued.code.clone());
    account.verification_expires = Some(issued.expires_at);
    account.updated_at = now;
}

/// Marks the account verified and clears the code.
pub fn confirm(account: &mut Account, now: DateTime<Utc>) {
    account.is_verified = true;
    account.verification_code = None;
    account.verification_expires = None;
    account.updated_at = now;
}
