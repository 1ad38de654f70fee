//! Event registration with duplicate and capacity gates.
//!
//! Gates run in a fixed order: existence/activity, duplicate email, capacity.
//! The insert itself is guarded by the store, so two requests racing past the
//! gates still cannot double-register an email or over-fill an event.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{EventRegistration, Registrant};
use crate::store::{EventStore, InsertOutcome, RegistrationStore, StoreError};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("event not found")]
    NotFound,

    #[error("event is inactive")]
    Inactive,

    #[error("already registered for this event")]
    AlreadyRegistered,

    #[error("event is full")]
    EventFull,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registers `registrant` for the event and returns the new registration id.
pub async fn register_for_event<S>(
    store: &S,
    event_id: Uuid,
    registrant: Registrant,
    now: DateTime<Utc>,
) -> Result<Uuid, RegistrationError>
where
    S: EventStore + RegistrationStore,
{
    let event = store
        .find_event(event_id)
        .await?
        .ok_or(RegistrationError::NotFound)?;

    if !event.is_active {
        debug!(%event_id, "Registration refused: event inactive");
        return Err(RegistrationError::Inactive);
    }

    if store
        .find_registration_by_email(event_id, &registrant.email)
        .await?
        .is_some()
    {
        debug!(%event_id, "Registration refused: email already registered");
        return Err(RegistrationError::AlreadyRegistered);
    }

    let taken = store.count_registrations(event_id).await?;
    if taken >= i64::from(event.max_participants) {
        debug!(%event_id, taken, max = event.max_participants, "Registration refused: event full");
        return Err(RegistrationError::EventFull);
    }

    let registration = EventRegistration::new(&event, registrant, now);
    match store.insert_registration(&registration).await? {
        InsertOutcome::Inserted => {
            info!(%event_id, registration_id = %registration.id, "Registration created");
            Ok(registration.id)
        }
        InsertOutcome::Duplicate => Err(RegistrationError::AlreadyRegistered),
        InsertOutcome::Full => Err(RegistrationError::EventFull),
        InsertOutcome::EventMissing => Err(RegistrationError::NotFound),
    }
}
