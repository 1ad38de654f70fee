use axum::extract::{Path, State};
use axum::response::Response;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::admin::Admin;
use crate::models::event::{CreateEventRequest, UpdateEventRequest};
use crate::models::registration::{RegisterForEventRequest, UpdateStatusRequest};
use crate::models::{Event, EventRegistration, Registrant, RegistrationStatus};
use crate::services::{events, registration};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;
use crate::utils::response::{created, empty_success, success};
use crate::utils::validation::Validator;

#[derive(Serialize)]
struct EventResponse {
    message: &'static str,
    event: Event,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredResponse {
    message: &'static str,
    registration_id: Uuid,
}

#[derive(Serialize)]
struct StatusResponse {
    message: &'static str,
    registration: EventRegistration,
}

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

/// Ids that do not parse cannot name a stored record.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

pub async fn list_events<S: Store>(State(state): State<AppState<S>>) -> Result<Response, AppError> {
    let events = state.store.list_active_events().await?;
    Ok(success(events))
}

pub async fn get_event<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id).ok_or_else(event_not_found)?;
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(event_not_found)?;
    Ok(success(event))
}

pub async fn create_event<S: Store>(
    State(state): State<AppState<S>>,
    admin: Admin,
    JsonBody(request): JsonBody<CreateEventRequest>,
) -> Result<Response, AppError> {
    let mut v = Validator::new();
    v.required("title", request.title.as_deref(), "Title is required");
    v.required(
        "description",
        request.description.as_deref(),
        "Description is required",
    );
    v.required("date", request.date.as_deref(), "Date is required");
    v.required("time", request.time.as_deref(), "Time is required");
    v.check(
        "maxParticipants",
        request.max_participants.map_or(true, |max| max >= 0),
        "Max participants must be a non-negative number",
    );
    v.finish()?;

    let created_by = admin
        .account_id
        .or(request.created_by)
        .unwrap_or(state.system_account);

    let event = events::create_event(&state.store, request, created_by, Utc::now()).await?;
    Ok(created(EventResponse {
        message: "Event created successfully",
        event,
    }))
}

pub async fn update_event<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<UpdateEventRequest>,
) -> Result<Response, AppError> {
    let mut v = Validator::new();
    v.check(
        "maxParticipants",
        update.max_participants.map_or(true, |max| max >= 0),
        "Max participants must be a non-negative number",
    );
    for (param, value) in [
        ("title", &update.title),
        ("description", &update.description),
        ("date", &update.date),
        ("time", &update.time),
    ] {
        v.check(
            param,
            value.as_deref().map_or(true, |s| !s.trim().is_empty()),
            "Field cannot be empty",
        );
    }
    v.finish()?;

    let id = parse_id(&id).ok_or_else(event_not_found)?;
    let event = events::update_event(&state.store, id, update, Utc::now())
        .await?
        .ok_or_else(event_not_found)?;

    Ok(success(EventResponse {
        message: "Event updated successfully",
        event,
    }))
}

pub async fn delete_event<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id).ok_or_else(event_not_found)?;
    events::delete_event(&state.store, id)
        .await?
        .ok_or_else(event_not_found)?;
    Ok(empty_success("Event deleted successfully"))
}

pub async fn event_registrations<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let registrations = match parse_id(&id) {
        Some(id) => state.store.list_registrations_for_event(id).await?,
        None => Vec::new(),
    };
    Ok(success(registrations))
}

pub async fn all_registrations<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
) -> Result<Response, AppError> {
    let registrations = state.store.list_all_registrations().await?;
    Ok(success(registrations))
}

pub async fn register_for_event<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<RegisterForEventRequest>,
) -> Result<Response, AppError> {
    let mut v = Validator::new();
    let name = v.required(
        "registrantName",
        request.registrant_name.as_deref(),
        "Name is required",
    );
    let email = v.email(
        "registrantEmail",
        request.registrant_email.as_deref(),
        "Valid email is required",
    );
    let phone = v.required(
        "registrantPhone",
        request.registrant_phone.as_deref(),
        "Phone number is required",
    );
    let class = v.required(
        "registrantClass",
        request.registrant_class.as_deref(),
        "Class is required",
    );
    let roll_no = v.required(
        "registrantRollNo",
        request.registrant_roll_no.as_deref(),
        "Roll number is required",
    );
    let prn = v.required(
        "registrantPRN",
        request.registrant_prn.as_deref(),
        "PRN is required",
    );
    v.finish()?;

    let event_id = parse_id(&id).ok_or_else(event_not_found)?;
    let registrant = Registrant {
        name,
        email,
        phone,
        class,
        roll_no,
        prn,
        aadhar_file: request.aadhar_file.unwrap_or_default(),
        receipt_file: request.receipt_file.unwrap_or_default(),
    };

    let registration_id =
        registration::register_for_event(&state.store, event_id, registrant, Utc::now()).await?;

    Ok(created(RegisteredResponse {
        message: "Registration successful",
        registration_id,
    }))
}

pub async fn set_registration_status<S: Store>(
    State(state): State<AppState<S>>,
    _admin: Admin,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateStatusRequest>,
) -> Result<Response, AppError> {
    let status: RegistrationStatus = request
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid status".to_string()))?;

    let not_found = || AppError::NotFound("Registration not found".to_string());
    let id = parse_id(&id).ok_or_else(not_found)?;
    let registration = events::set_registration_status(&state.store, id, status)
        .await?
        .ok_or_else(not_found)?;

    Ok(success(StatusResponse {
        message: "Registration status updated",
        registration,
    }))
}
