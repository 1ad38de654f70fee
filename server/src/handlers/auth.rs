//! Account handlers. The same routes serve `/api/auth` (users) and
//! `/api/member` (members); the account kind arrives as a request extension.

use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use chrono::Utc;
use serde::Serialize;

use crate::models::account::{
    AccountProfile, LoginRequest, MemberSummary, RegisterAccountRequest, ResendCodeRequest,
    VerifyCodeRequest,
};
use crate::models::AccountKind;
use crate::services::accounts::{self, NewAccount};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;
use crate::utils::response::success;
use crate::utils::validation::Validator;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_CONTACT_LEN: usize = 7;

#[derive(Serialize)]
struct MsgResponse {
    msg: &'static str,
}

#[derive(Serialize)]
struct CodeSentResponse {
    msg: &'static str,
    email: String,
}

#[derive(Serialize)]
struct LoginResponse {
    msg: &'static str,
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    member: Option<MemberSummary>,
}

pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<AccountKind>,
    JsonBody(request): JsonBody<RegisterAccountRequest>,
) -> Result<Response, AppError> {
    let new_account = validate_registration(kind, request)?;

    let email = accounts::register(
        &state.store,
        &state.credentials,
        &state.mailer,
        kind,
        new_account,
        Utc::now(),
    )
    .await?;

    Ok(success(CodeSentResponse {
        msg: "Verification code sent",
        email,
    }))
}

fn validate_registration(
    kind: AccountKind,
    request: RegisterAccountRequest,
) -> Result<NewAccount, AppError> {
    let mut v = Validator::new();

    let (email, password, profile) = match kind {
        AccountKind::Member => {
            let name = v.required("name", request.name.as_deref(), "Name is required");
            let email = v.email("email", request.email.as_deref(), "Valid email is required");
            let contact = v.required(
                "contact",
                request.contact.as_deref(),
                "Contact is required",
            );
            let password = v.min_len(
                "password",
                request.password.as_deref(),
                MIN_PASSWORD_LEN,
                "Password must be at least 6 characters",
            );
            (email, password, AccountProfile::Member { name, contact })
        }
        AccountKind::User | AccountKind::System => {
            let college = v.required(
                "college",
                request.college.as_deref(),
                "College is required",
            );
            let committee = v.required(
                "committee",
                request.committee.as_deref(),
                "Committee is required",
            );
            let email = v.email("email", request.email.as_deref(), "Valid email is required");
            let contact = v.min_len(
                "contact",
                request.contact.as_deref().map(str::trim),
                MIN_CONTACT_LEN,
                "Valid contact is required",
            );
            let password = v.min_len(
                "password",
                request.password.as_deref(),
                MIN_PASSWORD_LEN,
                "Password must be at least 6 characters",
            );
            v.check(
                "confirmPassword",
                request.confirm_password.as_deref() == request.password.as_deref(),
                "Passwords do not match",
            );
            (
                email,
                password,
                AccountProfile::User {
                    college,
                    committee,
                    contact,
                },
            )
        }
    };

    v.finish()?;
    Ok(NewAccount {
        email,
        password,
        profile,
    })
}

pub async fn verify<S: Store>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<AccountKind>,
    JsonBody(request): JsonBody<VerifyCodeRequest>,
) -> Result<Response, AppError> {
    let email = request.email.unwrap_or_default();
    let code = request.code.unwrap_or_default();

    // The code must match exactly as issued
    accounts::verify(&state.store, kind, email.trim(), &code, Utc::now()).await?;
    Ok(success(MsgResponse {
        msg: "Registration successful",
    }))
}

pub async fn resend_code<S: Store>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<AccountKind>,
    JsonBody(request): JsonBody<ResendCodeRequest>,
) -> Result<Response, AppError> {
    let email = request.email.unwrap_or_default();

    accounts::resend_code(&state.store, &state.mailer, kind, email.trim(), Utc::now()).await?;
    Ok(success(MsgResponse {
        msg: "Verification code resent",
    }))
}

pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<AccountKind>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    let mut v = Validator::new();
    let email = v.email("email", request.email.as_deref(), "Valid email is required");
    v.required(
        "password",
        request.password.as_deref(),
        "Password is required",
    );
    v.finish()?;

    // Compared exactly as sent, not trimmed
    let password = request.password.unwrap_or_default();

    let outcome = accounts::login(
        &state.store,
        &state.credentials,
        kind,
        &email,
        &password,
        Utc::now(),
    )
    .await?;

    let member = (kind == AccountKind::Member).then(|| MemberSummary::from(&outcome.account));
    Ok(success(LoginResponse {
        msg: "Login successful",
        token: outcome.token,
        member,
    }))
}
