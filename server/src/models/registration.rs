use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::event::{Event, EventSummary};
use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "approved" => Ok(RegistrationStatus::Approved),
            "rejected" => Ok(RegistrationStatus::Rejected),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TryFrom<String> for RegistrationStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Title of the event when the registration was made. Later renames are
    /// not copied here.
    pub event_title: String,
    pub registrant_name: String,
    pub registrant_email: String,
    pub registrant_phone: String,
    pub registrant_class: String,
    pub registrant_roll_no: String,
    #[serde(rename = "registrantPRN")]
    pub registrant_prn: String,
    pub aadhar_file: String,
    pub receipt_file: String,
    pub registration_date: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: RegistrationStatus,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registrant details submitted with `POST /events/{id}/register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForEventRequest {
    pub registrant_name: Option<String>,
    pub registrant_email: Option<String>,
    pub registrant_phone: Option<String>,
    pub registrant_class: Option<String>,
    pub registrant_roll_no: Option<String>,
    #[serde(rename = "registrantPRN")]
    pub registrant_prn: Option<String>,
    pub aadhar_file: Option<String>,
    pub receipt_file: Option<String>,
}

/// Validated registrant details.
#[derive(Debug, Clone, PartialEq)]
pub struct Registrant {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub class: String,
    pub roll_no: String,
    pub prn: String,
    pub aadhar_file: String,
    pub receipt_file: String,
}

impl EventRegistration {
    pub fn new(event: &Event, registrant: Registrant, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: event.id,
            event_title: event.title.clone(),
            registrant_name: registrant.name,
            registrant_email: registrant.email,
            registrant_phone: registrant.phone,
            registrant_class: registrant.class,
            registrant_roll_no: registrant.roll_no,
            registrant_prn: registrant.prn,
            aadhar_file: registrant.aadhar_file,
            receipt_file: registrant.receipt_file,
            registration_date: now,
            status: RegistrationStatus::Pending,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationWithEvent {
    #[serde(flatten)]
    pub registration: EventRegistration,
    /// `None` when the event was removed without its registrations.
    pub event: Option<EventSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_exact() {
        assert_eq!("approved".parse(), Ok(RegistrationStatus::Approved));
        assert_eq!(
            RegistrationStatus::try_from("pending".to_string()),
            Ok(RegistrationStatus::Pending)
        );
        assert!("Approved".parse::<RegistrationStatus>().is_err());
        assert!("cancelled".parse::<RegistrationStatus>().is_err());
    }

    #[test]
    fn test_registration_serializes_prn_field_name() {
        let event = Event {
            id: Uuid::new_v4(),
            title: "Quiz".into(),
            description: String::new(),
            date: String::new(),
            time: String::new(),
            image: String::new(),
            venue: String::new(),
            max_participants: 10,
            registration_deadline: String::new(),
            is_active: true,
            created_by: Uuid::new_v4(),
            tags: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let registrant = Registrant {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            phone: "9999999999".into(),
            class: "TE".into(),
            roll_no: "12".into(),
            prn: "PRN42".into(),
            aadhar_file: String::new(),
            receipt_file: String::new(),
        };

        let registration = EventRegistration::new(&event, registrant, Utc::now());
        let json = serde_json::to_value(&registration).unwrap();

        assert_eq!(json["registrantPRN"], "PRN42");
        assert_eq!(json["eventTitle"], "Quiz");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["isVerified"], false);
    }
}
