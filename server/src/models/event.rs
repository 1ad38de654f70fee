use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_MAX_PARTICIPANTS: i32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub image: String,
    pub venue: String,
    pub max_participants: i32,
    pub registration_deadline: String,
    pub is_active: bool,
    pub created_by: Uuid,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Title, date, time and venue of an event, attached to registration listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub date: String,
    pub time: String,
    pub venue: String,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            date: event.date.clone(),
            time: event.time.clone(),
            venue: event.venue.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub image: Option<String>,
    pub venue: Option<String>,
    pub max_participants: Option<i32>,
    pub registration_deadline: Option<String>,
    pub is_active: Option<bool>,
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub image: Option<String>,
    pub venue: Option<String>,
    pub max_participants: Option<i32>,
    pub registration_deadline: Option<String>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl Event {
    /// Builds a new event from a request that already passed validation.
    pub fn from_request(request: CreateEventRequest, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: request.title.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            date: request.date.unwrap_or_default(),
            time: request.time.unwrap_or_default(),
            image: request.image.unwrap_or_default(),
            venue: request.venue.unwrap_or_default(),
            max_participants: request
                .max_participants
                .unwrap_or(DEFAULT_MAX_PARTICIPANTS),
            registration_deadline: request.registration_deadline.unwrap_or_default(),
            is_active: request.is_active.unwrap_or(true),
            created_by,
            tags: request.tags,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateEventRequest, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(time) = update.time {
            self.time = time;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(venue) = update.venue {
            self.venue = venue;
        }
        if let Some(max) = update.max_participants {
            self.max_participants = max;
        }
        if let Some(deadline) = update.registration_deadline {
            self.registration_deadline = deadline;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_request_applies_defaults() {
        let now = Utc::now();
        let creator = Uuid::new_v4();
        let event = Event::from_request(
            CreateEventRequest {
                title: Some("Hackathon".into()),
                description: Some("24h build".into()),
                date: Some("2025-03-01".into()),
                time: Some("09:00".into()),
                ..Default::default()
            },
            creator,
            now,
        );

        assert_eq!(event.max_participants, DEFAULT_MAX_PARTICIPANTS);
        assert!(event.is_active);
        assert_eq!(event.venue, "");
        assert_eq!(event.created_by, creator);
        assert_eq!(event.created_at, now);
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let now = Utc::now();
        let mut event = Event::from_request(
            CreateEventRequest {
                title: Some("Old".into()),
                description: Some("Desc".into()),
                date: Some("d".into()),
                time: Some("t".into()),
                tags: vec!["music".into()],
                ..Default::default()
            },
            Uuid::new_v4(),
            now,
        );

        let later = now + chrono::Duration::minutes(5);
        event.apply(
            UpdateEventRequest {
                title: Some("New".into()),
                is_active: Some(false),
                ..Default::default()
            },
            later,
        );

        assert_eq!(event.title, "New");
        assert_eq!(event.description, "Desc");
        assert!(!event.is_active);
        assert_eq!(event.tags, vec!["music".to_string()]);
        assert_eq!(event.updated_at, later);
    }
}
