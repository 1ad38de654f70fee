//! Event administration.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::event::{CreateEventRequest, UpdateEventRequest};
use crate::models::{Event, EventRegistration, RegistrationStatus};
use crate::store::{EventStore, RegistrationStore, StoreResult};

pub async fn create_event<S: EventStore>(
    store: &S,
    request: CreateEventRequest,
    created_by: Uuid,
    now: DateTime<Utc>,
) -> StoreResult<Event> {
    let event = Event::from_request(request, created_by, now);
    store.insert_event(&event).await?;
    info!(event_id = %event.id, %created_by, "Event created");
    Ok(event)
}

/// Applies a partial update. `None` when the event does not exist.
pub async fn update_event<S: EventStore>(
    store: &S,
    id: Uuid,
    update: UpdateEventRequest,
    now: DateTime<Utc>,
) -> StoreResult<Option<Event>> {
    let Some(mut event) = store.find_event(id).await? else {
        return Ok(None);
    };

    event.apply(update, now);
    if !store.update_event(&event).await? {
        return Ok(None);
    }
    info!(event_id = %id, "Event updated");
    Ok(Some(event))
}

/// Deletes the event together with every registration that points at it.
/// Returns `None` when the event does not exist, otherwise the number of
/// registrations removed.
pub async fn delete_event<S: EventStore>(store: &S, id: Uuid) -> StoreResult<Option<u64>> {
    let removed = store.delete_event(id).await?;
    if let Some(removed) = removed {
        info!(event_id = %id, registrations_removed = removed, "Event deleted");
    }
    Ok(removed)
}

pub async fn set_registration_status<S: RegistrationStore>(
    store: &S,
    id: Uuid,
    status: RegistrationStatus,
) -> StoreResult<Option<EventRegistration>> {
    let updated = store.set_registration_status(id, status).await?;
    if updated.is_some() {
        info!(registration_id = %id, %status, "Registration status updated");
    }
    Ok(updated)
}
