//! Messages between the system account and members.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::message::ConversationSummary;
use crate::models::{AccountKind, Message, MessageType};
use crate::store::{AccountStore, MessageStore, StoreResult};

pub async fn send<S: MessageStore>(
    store: &S,
    admin_id: Uuid,
    receiver_id: Uuid,
    content: String,
    message_type: MessageType,
    now: DateTime<Utc>,
) -> StoreResult<Uuid> {
    let message = Message::new(admin_id, receiver_id, content, message_type, now);
    store
        .insert_messages(std::slice::from_ref(&message))
        .await?;
    info!(message_id = %message.id, %receiver_id, "Message sent");
    Ok(message.id)
}

/// Sends one copy of the message to every member. Returns how many were sent.
pub async fn broadcast<S>(
    store: &S,
    admin_id: Uuid,
    content: &str,
    message_type: MessageType,
    now: DateTime<Utc>,
) -> StoreResult<usize>
where
    S: MessageStore + AccountStore,
{
    let members = store.list_account_ids(AccountKind::Member).await?;
    let messages: Vec<Message> = members
        .into_iter()
        .map(|member| Message::new(admin_id, member, content.to_string(), message_type, now))
        .collect();

    store.insert_messages(&messages).await?;
    info!(recipients = messages.len(), "Broadcast sent");
    Ok(messages.len())
}

/// Groups the admin's messages by counterpart, newest conversation first.
///
/// `messages` must be in creation order. Only unread messages addressed to
/// the admin count as unread.
pub fn summarize(admin_id: Uuid, messages: Vec<Message>) -> Vec<ConversationSummary> {
    let mut by_account: HashMap<Uuid, ConversationSummary> = HashMap::new();
    let mut order: Vec<Uuid> = Vec::new();

    for message in messages {
        let other = if message.sender_id == admin_id {
            message.receiver_id
        } else {
            message.sender_id
        };
        let unread = u64::from(message.receiver_id == admin_id && !message.is_read);

        match by_account.get_mut(&other) {
            Some(summary) => {
                summary.unread_count += unread;
                summary.last_message = message;
            }
            None => {
                order.push(other);
                by_account.insert(
                    other,
                    ConversationSummary {
                        account_id: other,
                        last_message: message,
                        unread_count: unread,
                    },
                );
            }
        }
    }

    let mut summaries: Vec<ConversationSummary> = order
        .into_iter()
        .filter_map(|id| by_account.remove(&id))
        .collect();
    summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
    summaries
}
