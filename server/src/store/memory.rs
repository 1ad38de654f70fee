//! In-process store for tests and database-less local runs.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Account, AccountKind, Event, EventRegistration, EventSummary, Message, RegistrationStatus,
    RegistrationWithEvent,
};
use crate::store::{
    AccountStore, EventStore, InsertOutcome, MessageStore, RegistrationStore, StoreError,
    StoreResult,
};

#[derive(Debug, Default)]
struct Collections {
    events: Vec<Event>,
    registrations: Vec<EventRegistration>,
    accounts: Vec<Account>,
    messages: Vec<Message>,
}

/// Collections kept in insertion order behind one lock. Cloning shares the
/// underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<T, K: Ord>(
    items: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> K,
) -> Vec<T> {
    let mut out: Vec<T> = items.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

impl EventStore for MemoryStore {
    async fn list_active_events(&self) -> StoreResult<Vec<Event>> {
        let data = self.inner.read().await;
        Ok(newest_first(
            data.events.iter().filter(|e| e.is_active).cloned(),
            |e| e.created_at,
        ))
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let data = self.inner.read().await;
        Ok(data.events.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut data = self.inner.write().await;
        if data.events.iter().any(|e| e.id == event.id) {
            return Err(StoreError::Duplicate {
                entity: "event",
                id: event.id.to_string(),
            });
        }
        data.events.push(event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<bool> {
        let mut data = self.inner.write().await;
        match data.events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => {
                *slot = event.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut data = self.inner.write().await;
        let before = data.events.len();
        data.events.retain(|e| e.id != id);
        if data.events.len() == before {
            return Ok(None);
        }

        let before = data.registrations.len();
        data.registrations.retain(|r| r.event_id != id);
        Ok(Some((before - data.registrations.len()) as u64))
    }
}

impl RegistrationStore for MemoryStore {
    async fn find_registration_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<EventRegistration>> {
        let data = self.inner.read().await;
        Ok(data
            .registrations
            .iter()
            .find(|r| r.event_id == event_id && r.registrant_email == email)
            .cloned())
    }

    async fn count_registrations(&self, event_id: Uuid) -> StoreResult<i64> {
        let data = self.inner.read().await;
        let count = data
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_registration(
        &self,
        registration: &EventRegistration,
    ) -> StoreResult<InsertOutcome> {
        let mut data = self.inner.write().await;

        let Some(event) = data.events.iter().find(|e| e.id == registration.event_id) else {
            return Ok(InsertOutcome::EventMissing);
        };
        let capacity = i64::from(event.max_participants);

        let mut taken = 0i64;
        for existing in data
            .registrations
            .iter()
            .filter(|r| r.event_id == registration.event_id)
        {
            if existing.registrant_email == registration.registrant_email {
                return Ok(InsertOutcome::Duplicate);
            }
            taken += 1;
        }
        if taken >= capacity {
            return Ok(InsertOutcome::Full);
        }

        data.registrations.push(registration.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> StoreResult<Vec<EventRegistration>> {
        let data = self.inner.read().await;
        Ok(newest_first(
            data.registrations
                .iter()
                .filter(|r| r.event_id == event_id)
                .cloned(),
            |r| r.registration_date,
        ))
    }

    async fn list_all_registrations(&self) -> StoreResult<Vec<RegistrationWithEvent>> {
        let data = self.inner.read().await;
        let rows = data.registrations.iter().map(|r| RegistrationWithEvent {
            registration: r.clone(),
            event: data
                .events
                .iter()
                .find(|e| e.id == r.event_id)
                .map(EventSummary::from),
        });
        Ok(newest_first(rows, |row| row.registration.registration_date))
    }

    async fn set_registration_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
    ) -> StoreResult<Option<EventRegistration>> {
        let mut data = self.inner.write().await;
        Ok(data
            .registrations
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| {
                r.status = status;
                r.updated_at = Utc::now();
                r.clone()
            }))
    }
}

impl AccountStore for MemoryStore {
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let data = self.inner.read().await;
        Ok(data.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        let data = self.inner.read().await;
        Ok(data
            .accounts
            .iter()
            .find(|a| a.kind == kind && a.email == email)
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let mut data = self.inner.write().await;
        if data
            .accounts
            .iter()
            .any(|a| a.id == account.id || (a.kind == account.kind && a.email == account.email))
        {
            return Err(StoreError::Duplicate {
                entity: "account",
                id: account.email.clone(),
            });
        }
        data.accounts.push(account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> StoreResult<bool> {
        let mut data = self.inner.write().await;
        match data.accounts.iter_mut().find(|a| a.id == account.id) {
            Some(slot) => {
                *slot = account.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_account_ids(&self, kind: AccountKind) -> StoreResult<Vec<Uuid>> {
        let data = self.inner.read().await;
        Ok(data
            .accounts
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.id)
            .collect())
    }
}

impl MessageStore for MemoryStore {
    async fn insert_messages(&self, messages: &[Message]) -> StoreResult<()> {
        let mut data = self.inner.write().await;
        data.messages.extend_from_slice(messages);
        Ok(())
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> StoreResult<Vec<Message>> {
        let data = self.inner.read().await;
        let mut out: Vec<Message> = data
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    async fn messages_involving(&self, account_id: Uuid) -> StoreResult<Vec<Message>> {
        let data = self.inner.read().await;
        let mut out: Vec<Message> = data
            .messages
            .iter()
            .filter(|m| m.sender_id == account_id || m.receiver_id == account_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    async fn mark_read(&self, sender: Uuid, receiver: Uuid) -> StoreResult<u64> {
        let mut data = self.inner.write().await;
        let mut updated = 0;
        for message in data
            .messages
            .iter_mut()
            .filter(|m| m.sender_id == sender && m.receiver_id == receiver && !m.is_read)
        {
            message.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}
