use axum::extract::{Path, State};
use axum::response::Response;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::admin::Admin;
use crate::models::message::{BroadcastRequest, SendMessageRequest};
use crate::models::MessageType;
use crate::services::messaging;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;
use crate::utils::response::{created, success};
use crate::utils::validation::Validator;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SentResponse {
    message: &'static str,
    message_id: Uuid,
}

#[derive(Serialize)]
struct MarkedReadResponse {
    message: &'static str,
    updated: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastResponse {
    message: String,
    sent_to: usize,
}

fn parse_message_type(
    v: &mut Validator,
    raw: Option<&str>,
    default: MessageType,
) -> MessageType {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            v.fail("messageType", "Invalid message type");
            default
        }),
    }
}

pub async fn send_message<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> Result<Response, AppError> {
    let mut v = Validator::new();
    let receiver = v.required(
        "receiverId",
        request.receiver_id.as_deref(),
        "Receiver is required",
    );
    let receiver_id = Uuid::parse_str(&receiver).unwrap_or_else(|_| {
        if !receiver.is_empty() {
            v.fail("receiverId", "Invalid receiver id");
        }
        Uuid::nil()
    });
    let content = v.required(
        "content",
        request.content.as_deref(),
        "Message content is required",
    );
    let message_type =
        parse_message_type(&mut v, request.message_type.as_deref(), MessageType::Text);
    v.finish()?;

    let message_id = messaging::send(
        &state.store,
        state.system_account,
        receiver_id,
        content,
        message_type,
        Utc::now(),
    )
    .await?;

    Ok(created(SentResponse {
        message: "Message sent successfully",
        message_id,
    }))
}

pub async fn conversation<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let messages = match Uuid::parse_str(user_id.trim()) {
        Ok(user_id) => {
            state
                .store
                .conversation(state.system_account, user_id)
                .await?
        }
        Err(_) => Vec::new(),
    };
    Ok(success(messages))
}

pub async fn mark_read<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let updated = match Uuid::parse_str(user_id.trim()) {
        Ok(user_id) => state.store.mark_read(user_id, state.system_account).await?,
        Err(_) => 0,
    };
    Ok(success(MarkedReadResponse {
        message: "Messages marked as read",
        updated,
    }))
}

pub async fn conversations<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
) -> Result<Response, AppError> {
    let messages = state.store.messages_involving(state.system_account).await?;
    Ok(success(messaging::summarize(state.system_account, messages)))
}

pub async fn broadcast<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    JsonBody(request): JsonBody<BroadcastRequest>,
) -> Result<Response, AppError> {
    let mut v = Validator::new();
    let content = v.required(
        "content",
        request.content.as_deref(),
        "Message content is required",
    );
    let message_type = parse_message_type(
        &mut v,
        request.message_type.as_deref(),
        MessageType::Announcement,
    );
    v.finish()?;

    let sent_to = messaging::broadcast(
        &state.store,
        state.system_account,
        &content,
        message_type,
        Utc::now(),
    )
    .await?;

    Ok(created(BroadcastResponse {
        message: format!("Broadcast sent to {sent_to} members"),
        sent_to,
    }))
}
