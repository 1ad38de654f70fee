//! Account registration, email verification and login.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::account::AccountProfile;
use crate::models::{Account, AccountKind};
use crate::services::credentials::{CredentialError, Credentials};
use crate::services::mailer::{resend_email, verification_email, Mailer};
use crate::services::verification::{self, CodeCheck};
use crate::store::{AccountStore, StoreError};

/// Stored in place of a password hash for accounts that must never log in.
const UNUSABLE_PASSWORD: &str = "!";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists and is verified")]
    AlreadyExists,

    #[error("Missing email or code")]
    MissingEmailOrCode,

    #[error("Missing email")]
    MissingEmail,

    #[error("User not found")]
    NotFound,

    #[error("User already verified")]
    AlreadyVerified,

    #[error("Code expired. Please request a new code.")]
    CodeExpired,

    #[error("Invalid verification code")]
    InvalidCode,

    /// Same message for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before login")]
    NotVerified,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Registration data that already passed boundary validation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub profile: AccountProfile,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub account: Account,
}

/// Creates an unverified account, or refreshes an unverified one with the
/// same email, and emails it a new code. Returns the account email.
pub async fn register<S: AccountStore>(
    store: &S,
    credentials: &Credentials,
    mailer: &Mailer,
    kind: AccountKind,
    new_account: NewAccount,
    now: DateTime<Utc>,
) -> Result<String, AccountError> {
    let existing = store
        .find_account_by_email(kind, &new_account.email)
        .await?;
    if existing.as_ref().is_some_and(|a| a.is_verified) {
        return Err(AccountError::AlreadyExists);
    }

    let password_hash = credentials
        .hash_password_blocking(&new_account.password)
        .await?;
    let issued = verification::issue(now);

    let account = match existing {
        Some(mut account) => {
            account.password_hash = password_hash;
            account.apply_profile(new_account.profile, now);
            verification::attach(&mut account, &issued, now);
            store.update_account(&account).await?;
            account
        }
        None => {
            let mut account = Account::new(kind, new_account.email, password_hash, now);
            account.apply_profile(new_account.profile, now);
            verification::attach(&mut account, &issued, now);
            store.insert_account(&account).await.map_err(|e| match e {
                StoreError::Duplicate { .. } => AccountError::AlreadyExists,
                other => AccountError::Store(other),
            })?;
            account
        }
    };

    info!(account_id = %account.id, kind = %kind, "Verification code issued");
    mailer
        .send_logged(&verification_email(&account.email, &issued.code))
        .await;

    Ok(account.email)
}

pub async fn verify<S: AccountStore>(
    store: &S,
    kind: AccountKind,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(), AccountError> {
    if email.is_empty() || code.is_empty() {
        return Err(AccountError::MissingEmailOrCode);
    }

    let mut account = store
        .find_account_by_email(kind, email)
        .await?
        .ok_or(AccountError::NotFound)?;

    match verification::check(&account, code, now) {
        CodeCheck::AlreadyVerified => Err(AccountError::AlreadyVerified),
        CodeCheck::Expired => Err(AccountError::CodeExpired),
        CodeCheck::Mismatch => Err(AccountError::InvalidCode),
        CodeCheck::Accepted => {
            verification::confirm(&mut account, now);
            store.update_account(&account).await?;
            info!(account_id = %account.id, kind = %kind, "Account verified");
            Ok(())
        }
    }
}

/// Issues and emails a fresh code. Not rate limited.
pub async fn resend_code<S: AccountStore>(
    store: &S,
    mailer: &Mailer,
    kind: AccountKind,
    email: &str,
    now: DateTime<Utc>,
) -> Result<(), AccountError> {
    if email.is_empty() {
        return Err(AccountError::MissingEmail);
    }

    let mut account = store
        .find_account_by_email(kind, email)
        .await?
        .ok_or(AccountError::NotFound)?;
    if account.is_verified {
        return Err(AccountError::AlreadyVerified);
    }

    let issued = verification::issue(now);
    verification::attach(&mut account, &issued, now);
    store.update_account(&account).await?;

    info!(account_id = %account.id, kind = %kind, "Verification code reissued");
    mailer
        .send_logged(&resend_email(&account.email, &issued.code))
        .await;
    Ok(())
}

pub async fn login<S: AccountStore>(
    store: &S,
    credentials: &Credentials,
    kind: AccountKind,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<LoginOutcome, AccountError> {
    let account = store
        .find_account_by_email(kind, email)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    if !account.is_verified {
        return Err(AccountError::NotVerified);
    }

    if !credentials
        .verify_password_blocking(password, &account.password_hash)
        .await?
    {
        return Err(AccountError::InvalidCredentials);
    }

    let token = credentials.issue_token(account.id, account.kind, now)?;
    info!(account_id = %account.id, kind = %kind, "Login succeeded");
    Ok(LoginOutcome { token, account })
}

/// Looks up the administrator identity by email, creating it on first start.
pub async fn ensure_system_account<S: AccountStore>(
    store: &S,
    email: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, StoreError> {
    if let Some(account) = store
        .find_account_by_email(AccountKind::System, email)
        .await?
    {
        return Ok(account.id);
    }

    let mut account = Account::new(
        AccountKind::System,
        email.to_string(),
        UNUSABLE_PASSWORD.to_string(),
        now,
    );
    account.is_verified = true;

    match store.insert_account(&account).await {
        Ok(()) => {
            info!(account_id = %account.id, "Created system account");
            Ok(account.id)
        }
        // Another instance created it first
        Err(StoreError::Duplicate { .. }) => store
            .find_account_by_email(AccountKind::System, email)
            .await?
            .map(|a| a.id)
            .ok_or(StoreError::Duplicate {
                entity: "account",
                id: email.to_string(),
            }),
        Err(e) => Err(e),
    }
}
