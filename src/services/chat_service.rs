use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::message::{preview, Message, MessagePage, MessageResponse};
use crate::models::notification::{Notification, NotificationKind};
use crate::services::notification_service::NotificationService;
use crate::services::user_service::UserService;
use crate::utils::Claims;

pub const PAGE_SIZE: u64 = 20;

fn conversation(a: ObjectId, b: ObjectId) -> Document {
    doc! { "$or": [
        { "sender_id": a, "receiver_id": b },
        { "sender_id": b, "receiver_id": a },
    ] }
}

pub struct ChatService {
    collection: Collection<Message>,
    users: Arc<UserService>,
    notifications: Arc<NotificationService>,
}

impl ChatService {
    pub fn new(db: Arc<Database>, users: Arc<UserService>, notifications: Arc<NotificationService>) -> Self {
        Self { collection: db.collection("messages"), users, notifications }
    }

    pub async fn send(&self, sender: &Claims, receiver_id: ObjectId, content: &str) -> Result<MessageResponse, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("content is required".to_string()));
        }
        let sender_id = sender.object_id()?;
        let receiver = self.users.get_user(receiver_id).await?;

        let mut message = Message {
            id: None,
            sender_id,
            receiver_id,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        message.id = self.collection.insert_one(&message).await?.inserted_id.as_object_id();

        let mut note = Notification::new(
            NotificationKind::NewMessage,
            sender_id,
            &sender.username,
            receiver_id,
            preview(content),
        );
        if let Some(id) = message.id {
            note = note.about(id.to_hex());
        }
        self.notifications.send(note).await;

        Ok(to_response(message, &sender.username, &receiver.username))
    }

    /// 1-based pages of 20, newest page first; each page is returned oldest-first.
    pub async fn page(&self, user_id: ObjectId, other_id: ObjectId, page: u64) -> Result<MessagePage, AppError> {
        let page = page.max(1);
        let mut messages: Vec<Message> = self
            .collection
            .find(conversation(user_id, other_id))
            .sort(doc! { "timestamp": -1 })
            .skip((page - 1) * PAGE_SIZE)
            .limit(PAGE_SIZE as i64 + 1)
            .await?
            .try_collect()
            .await?;

        let is_last_page = messages.len() as u64 <= PAGE_SIZE;
        messages.truncate(PAGE_SIZE as usize);
        messages.reverse();

        let messages = self.resolve(messages).await?;
        Ok(MessagePage { messages, page, is_last_page })
    }

    pub async fn history(&self, user_id: ObjectId, other_id: ObjectId) -> Result<Vec<MessageResponse>, AppError> {
        let messages: Vec<Message> = self
            .collection
            .find(conversation(user_id, other_id))
            .sort(doc! { "timestamp": 1 })
            .await?
            .try_collect()
            .await?;
        self.resolve(messages).await
    }

    async fn resolve(&self, messages: Vec<Message>) -> Result<Vec<MessageResponse>, AppError> {
        let mut ids: Vec<ObjectId> = messages.iter().flat_map(|m| [m.sender_id, m.receiver_id]).collect();
        ids.sort();
        ids.dedup();
        let names: HashMap<ObjectId, String> = self
            .users
            .list_by_ids(&ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u.username)))
            .collect();
        let name = |id: &ObjectId| names.get(id).cloned().unwrap_or_else(|| "Unknown".to_string());

        Ok(messages
            .into_iter()
            .map(|m| {
                let (sender, receiver) = (name(&m.sender_id), name(&m.receiver_id));
                to_response(m, &sender, &receiver)
            })
            .collect())
    }
}

fn to_response(m: Message, sender_username: &str, receiver_username: &str) -> MessageResponse {
    MessageResponse {
        id: m.id.map(|oid| oid.to_hex()).unwrap_or_default(),
        sender_id: m.sender_id.to_hex(),
        receiver_id: m.receiver_id.to_hex(),
        sender_username: sender_username.to_string(),
        receiver_username: receiver_username.to_string(),
        content: m.content,
        timestamp: m.timestamp,
    }
}
