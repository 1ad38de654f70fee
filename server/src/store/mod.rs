//! Document store seam.
//!
//! Each collection has its own repository trait; [`Store`] bundles them so
//! handlers can be generic over one parameter. [`PgStore`] is the production
//! backend, [`MemoryStore`] keeps everything in process.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, AccountKind, Event, EventRegistration, Message, RegistrationStatus,
    RegistrationWithEvent,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a guarded registration insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A registration for the same (event, email) already exists.
    Duplicate,
    /// The event had no free seats left when the insert ran.
    Full,
    /// The event disappeared between the lookup and the insert.
    EventMissing,
}

pub trait EventStore: Send + Sync {
    /// Active events, newest first.
    fn list_active_events(&self) -> impl Future<Output = StoreResult<Vec<Event>>> + Send;

    fn find_event(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<Event>>> + Send;

    fn insert_event(&self, event: &Event) -> impl Future<Output = StoreResult<()>> + Send;

    /// Replaces the stored event. Returns `false` when no event has that id.
    fn update_event(&self, event: &Event) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Removes the event and every registration for it in one atomic step.
    /// Returns the number of registrations removed, or `None` when no event
    /// has that id.
    fn delete_event(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<u64>>> + Send;
}

pub trait RegistrationStore: Send + Sync {
    fn find_registration_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> impl Future<Output = StoreResult<Option<EventRegistration>>> + Send;

    fn count_registrations(&self, event_id: Uuid)
        -> impl Future<Output = StoreResult<i64>> + Send;

    /// Inserts `registration` only if its event still exists, has a free seat
    /// and holds no registration for the same email. The check and the insert
    /// are atomic.
    fn insert_registration(
        &self,
        registration: &EventRegistration,
    ) -> impl Future<Output = StoreResult<InsertOutcome>> + Send;

    /// Registrations of one event, newest first.
    fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<EventRegistration>>> + Send;

    /// Every registration with its event summary, newest first.
    fn list_all_registrations(
        &self,
    ) -> impl Future<Output = StoreResult<Vec<RegistrationWithEvent>>> + Send;

    fn set_registration_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
    ) -> impl Future<Output = StoreResult<Option<EventRegistration>>> + Send;
}

pub trait AccountStore: Send + Sync {
    fn find_account(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    fn find_account_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    /// Fails with [`StoreError::Duplicate`] when (kind, email) is taken.
    fn insert_account(&self, account: &Account) -> impl Future<Output = StoreResult<()>> + Send;

    fn update_account(&self, account: &Account) -> impl Future<Output = StoreResult<bool>> + Send;

    fn list_account_ids(
        &self,
        kind: AccountKind,
    ) -> impl Future<Output = StoreResult<Vec<Uuid>>> + Send;
}

pub trait MessageStore: Send + Sync {
    fn insert_messages(&self, messages: &[Message])
        -> impl Future<Output = StoreResult<()>> + Send;

    /// Messages exchanged between `a` and `b` in either direction, oldest first.
    fn conversation(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<Message>>> + Send;

    /// Every message sent or received by `account_id`, oldest first.
    fn messages_involving(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<Message>>> + Send;

    /// Marks unread messages from `sender` to `receiver` as read.
    fn mark_read(
        &self,
        sender: Uuid,
        receiver: Uuid,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}

pub trait Store:
    EventStore + RegistrationStore + AccountStore + MessageStore + Clone + 'static
{
}

impl<T> Store for T where
    T: EventStore + RegistrationStore + AccountStore + MessageStore + Clone + 'static
{
}
