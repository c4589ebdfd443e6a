use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::notification::{Notification, RequestStatus};

pub struct NotificationService {
    collection: Collection<Notification>,
}

impl NotificationService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { collection: db.collection("notifications") }
    }

    pub async fn insert(&self, notification: Notification) -> Result<ObjectId, AppError> {
        let result = self.collection.insert_one(notification).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("notification insert returned no id".to_string()))
    }

    /// Fire-and-forget delivery: a failed notification never fails the action that caused it.
    pub async fn send(&self, notification: Notification) {
        let kind = notification.kind;
        if let Err(e) = self.insert(notification).await {
            tracing::warn!(?kind, error = %e, "failed to store notification");
        }
    }

    pub async fn list(&self, user_id: ObjectId, unread_only: bool) -> Result<Vec<Notification>, AppError> {
        let mut filter = doc! { "to_user_id": user_id };
        if unread_only {
            filter.insert("read", false);
        }
        let cursor = self.collection.find(filter).sort(doc! { "created_at": -1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn unread_count(&self, user_id: ObjectId) -> Result<u64, AppError> {
        Ok(self
            .collection
            .count_documents(doc! { "to_user_id": user_id, "read": false })
            .await?)
    }

    pub async fn get(&self, id: ObjectId) -> Result<Notification, AppError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_read(&self, id: ObjectId, user_id: ObjectId) -> Result<(), AppError> {
        let notification = self.get(id).await?;
        if notification.to_user_id != user_id {
            return Err(AppError::Forbidden("Not your notification".to_string()));
        }
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "read": true } })
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: ObjectId) -> Result<u64, AppError> {
        let result = self
            .collection
            .update_many(
                doc! { "to_user_id": user_id, "read": false },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }

    /// Resolves a connection request; it also counts as read.
    pub async fn set_request_status(&self, id: ObjectId, status: RequestStatus) -> Result<(), AppError> {
        let status = bson::to_bson(&status)?;
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "status": status, "read": true } })
            .await?;
        Ok(())
    }
}
