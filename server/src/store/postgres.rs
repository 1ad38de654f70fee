//! PostgreSQL backend.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    Account, AccountKind, Event, EventRegistration, EventSummary, Message, RegistrationStatus,
    RegistrationWithEvent,
};
use crate::store::{
    AccountStore, EventStore, InsertOutcome, MessageStore, RegistrationStore, StoreError,
    StoreResult,
};

const EVENT_COLUMNS: &str = "id, title, description, date, time, image, venue, max_participants, \
     registration_deadline, is_active, created_by, tags, created_at, updated_at";

const REGISTRATION_COLUMNS: &str = "id, event_id, event_title, registrant_name, registrant_email, \
     registrant_phone, registrant_class, registrant_roll_no, registrant_prn, aadhar_file, \
     receipt_file, registration_date, status, is_verified, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, kind, email, contact, password_hash, is_verified, \
     verification_code, verification_expires, college, committee, name, role, avatar_url, \
     points, joined_date, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, message_type, is_read, timestamp, created_at";

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("Migrations run successfully");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

impl EventStore for PgStore {
    async fn list_active_events(&self) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE is_active = TRUE ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&sql)
            .bind(event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.date)
            .bind(&event.time)
            .bind(&event.image)
            .bind(&event.venue)
            .bind(event.max_participants)
            .bind(&event.registration_deadline)
            .bind(event.is_active)
            .bind(event.created_by)
            .bind(&event.tags)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate {
                        entity: "event",
                        id: event.id.to_string(),
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, date = $4, time = $5, image = $6, \
             venue = $7, max_participants = $8, registration_deadline = $9, is_active = $10, \
             tags = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.date)
        .bind(&event.time)
        .bind(&event.image)
        .bind(&event.venue)
        .bind(event.max_participants)
        .bind(&event.registration_deadline)
        .bind(event.is_active)
        .bind(&event.tags)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM event_registrations WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(removed.rows_affected()))
    }
}

/// Row of the registration + event join used by the admin listing.
#[derive(FromRow)]
struct RegistrationJoinRow {
    #[sqlx(flatten)]
    registration: EventRegistration,
    joined_event_id: Option<Uuid>,
    joined_title: Option<String>,
    joined_date: Option<String>,
    joined_time: Option<String>,
    joined_venue: Option<String>,
}

impl From<RegistrationJoinRow> for RegistrationWithEvent {
    fn from(row: RegistrationJoinRow) -> Self {
        let event = row.joined_event_id.map(|id| EventSummary {
            id,
            title: row.joined_title.unwrap_or_default(),
            date: row.joined_date.unwrap_or_default(),
            time: row.joined_time.unwrap_or_default(),
            venue: row.joined_venue.unwrap_or_default(),
        });
        Self {
            registration: row.registration,
            event,
        }
    }
}

impl RegistrationStore for PgStore {
    async fn find_registration_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<EventRegistration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM event_registrations \
             WHERE event_id = $1 AND registrant_email = $2"
        );
        Ok(sqlx::query_as::<_, EventRegistration>(&sql)
            .bind(event_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_registrations(&self, event_id: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn insert_registration(
        &self,
        registration: &EventRegistration,
    ) -> StoreResult<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent registrations for the same event.
        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT max_participants FROM events WHERE id = $1 FOR UPDATE")
                .bind(registration.event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(capacity) = capacity else {
            return Ok(InsertOutcome::EventMissing);
        };

        let taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
                .bind(registration.event_id)
                .fetch_one(&mut *tx)
                .await?;
        if taken >= i64::from(capacity) {
            return Ok(InsertOutcome::Full);
        }

        let sql = format!(
            "INSERT INTO event_registrations ({REGISTRATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (event_id, registrant_email) DO NOTHING"
        );
        let result = sqlx::query(&sql)
            .bind(registration.id)
            .bind(registration.event_id)
            .bind(&registration.event_title)
            .bind(&registration.registrant_name)
            .bind(&registration.registrant_email)
            .bind(&registration.registrant_phone)
            .bind(&registration.registrant_class)
            .bind(&registration.registrant_roll_no)
            .bind(&registration.registrant_prn)
            .bind(&registration.aadhar_file)
            .bind(&registration.receipt_file)
            .bind(registration.registration_date)
            .bind(registration.status.as_str())
            .bind(registration.is_verified)
            .bind(registration.created_at)
            .bind(registration.updated_at)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }

        tx.commit().await?;
        Ok(InsertOutcome::Inserted)
    }

    async fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> StoreResult<Vec<EventRegistration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM event_registrations \
             WHERE event_id = $1 ORDER BY registration_date DESC"
        );
        Ok(sqlx::query_as::<_, EventRegistration>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_all_registrations(&self) -> StoreResult<Vec<RegistrationWithEvent>> {
        let rows = sqlx::query_as::<_, RegistrationJoinRow>(
            "SELECT r.id, r.event_id, r.event_title, r.registrant_name, r.registrant_email, \
             r.registrant_phone, r.registrant_class, r.registrant_roll_no, r.registrant_prn, \
             r.aadhar_file, r.receipt_file, r.registration_date, r.status, r.is_verified, \
             r.created_at, r.updated_at, \
             e.id AS joined_event_id, e.title AS joined_title, e.date AS joined_date, \
             e.time AS joined_time, e.venue AS joined_venue \
             FROM event_registrations r LEFT JOIN events e ON e.id = r.event_id \
             ORDER BY r.registration_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RegistrationWithEvent::from).collect())
    }

    async fn set_registration_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
    ) -> StoreResult<Option<EventRegistration>> {
        let sql = format!(
            "UPDATE event_registrations SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {REGISTRATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, EventRegistration>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }
}

impl AccountStore for PgStore {
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_account_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE kind = $1 AND email = $2");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(kind.as_str())
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        );
        sqlx::query(&sql)
            .bind(account.id)
            .bind(account.kind.as_str())
            .bind(&account.email)
            .bind(&account.contact)
            .bind(&account.password_hash)
            .bind(account.is_verified)
            .bind(&account.verification_code)
            .bind(account.verification_expires)
            .bind(&account.college)
            .bind(&account.committee)
            .bind(&account.name)
            .bind(&account.role)
            .bind(&account.avatar_url)
            .bind(account.points)
            .bind(account.joined_date)
            .bind(account.created_at)
            .bind(account.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate {
                        entity: "account",
                        id: account.email.clone(),
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET contact = $2, password_hash = $3, is_verified = $4, \
             verification_code = $5, verification_expires = $6, college = $7, committee = $8, \
             name = $9, role = $10, avatar_url = $11, points = $12, joined_date = $13, \
             updated_at = $14 WHERE id = $1",
        )
        .bind(account.id)
        .bind(&account.contact)
        .bind(&account.password_hash)
        .bind(account.is_verified)
        .bind(&account.verification_code)
        .bind(account.verification_expires)
        .bind(&account.college)
        .bind(&account.committee)
        .bind(&account.name)
        .bind(&account.role)
        .bind(&account.avatar_url)
        .bind(account.points)
        .bind(account.joined_date)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_account_ids(&self, kind: AccountKind) -> StoreResult<Vec<Uuid>> {
        Ok(
            sqlx::query_scalar("SELECT id FROM accounts WHERE kind = $1 ORDER BY created_at")
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?,
        )
    }
}

impl MessageStore for PgStore {
    async fn insert_messages(&self, messages: &[Message]) -> StoreResult<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        for message in messages {
            sqlx::query(&sql)
                .bind(message.id)
                .bind(message.sender_id)
                .bind(message.receiver_id)
                .bind(&message.content)
                .bind(message.message_type.as_str())
                .bind(message.is_read)
                .bind(message.timestamp)
                .bind(message.created_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> StoreResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY created_at ASC, seq ASC"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(a)
            .bind(b)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn messages_involving(&self, account_id: Uuid) -> StoreResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE sender_id = $1 OR receiver_id = $1 ORDER BY created_at ASC, seq ASC"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn mark_read(&self, sender: Uuid, receiver: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE sender_id = $1 AND receiver_id = $2 AND is_read = FALSE",
        )
        .bind(sender)
        .bind(receiver)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Needs a disposable database: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::CreateEventRequest;
    use crate::models::Registrant;
    use chrono::Utc;

    async fn store() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PgStore::connect(&url, 25).await.unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    fn event(max: i32) -> Event {
        Event::from_request(
            CreateEventRequest {
                title: Some("Workshop".into()),
                description: Some("Rust".into()),
                date: Some("2025-01-01".into()),
                time: Some("10:00".into()),
                max_participants: Some(max),
                ..Default::default()
            },
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    fn registration(event: &Event, email: &str) -> EventRegistration {
        EventRegistration::new(
            event,
            Registrant {
                name: "N".into(),
                email: email.into(),
                phone: "1".into(),
                class: "C".into(),
                roll_no: "R".into(),
                prn: "P".into(),
                aadhar_file: String::new(),
                receipt_file: String::new(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_insert_registration_is_guarded() {
        let Some(store) = store().await else { return };
        let e = event(1);
        store.insert_event(&e).await.unwrap();

        assert_eq!(
            store
                .insert_registration(&registration(&e, "a@x.com"))
                .await
                .unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store
                .insert_registration(&registration(&e, "a@x.com"))
                .await
                .unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(
            store
                .insert_registration(&registration(&e, "b@x.com"))
                .await
                .unwrap(),
            InsertOutcome::Full
        );
        assert_eq!(
            store
                .insert_registration(&registration(&event(5), "c@x.com"))
                .await
                .unwrap(),
            InsertOutcome::EventMissing
        );

        store.delete_event(e.id).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_inserts_respect_capacity() {
        let Some(store) = store().await else { return };
        let e = event(5);
        store.insert_event(&e).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                let registration = registration(&e, &format!("{i}@x.com"));
                tokio::spawn(async move { store.insert_registration(&registration).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 5);
        assert_eq!(store.count_registrations(e.id).await.unwrap(), 5);

        assert_eq!(store.delete_event(e.id).await.unwrap(), Some(5));
        assert_eq!(store.count_registrations(e.id).await.unwrap(), 0);
        assert_eq!(store.delete_event(e.id).await.unwrap(), None);
    }
}
