use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::meeting::{Meeting, MeetingStatus, MeetingWindow};
use crate::models::notification::{Notification, NotificationKind};
use crate::models::user::Role;
use crate::services::notification_service::NotificationService;
use crate::services::user_service::UserService;
use crate::utils::Claims;

pub struct NewMeeting {
    pub mentor_id: ObjectId,
    pub mentee_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub meeting_link: Option<String>,
}

#[derive(Default)]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub meeting_link: Option<String>,
    pub status: Option<MeetingStatus>,
}

pub fn parse_time(raw: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest(format!("{field} must be an RFC 3339 timestamp")))
}

fn check_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::BadRequest("end_time must be after start_time".to_string()));
    }
    Ok(())
}

/// Filter for one user's meetings in `window`, relative to `now`.
pub fn window_filter(user_id: ObjectId, window: MeetingWindow, now: DateTime<Utc>) -> Document {
    let now = bson::DateTime::from_chrono(now);
    let mut filter = doc! { "$or": [ { "mentor_id": user_id }, { "mentee_id": user_id } ] };
    match window {
        MeetingWindow::All => {}
        MeetingWindow::Upcoming => {
            filter.insert("start_time", doc! { "$gt": now });
            filter.insert("status", "scheduled");
        }
        MeetingWindow::Past => {
            filter.insert("end_time", doc! { "$lt": now });
        }
        MeetingWindow::Current => {
            filter.insert("start_time", doc! { "$lte": now });
            filter.insert("end_time", doc! { "$gte": now });
            filter.insert("status", "scheduled");
        }
    }
    filter
}

pub struct MeetingService {
    collection: Collection<Meeting>,
    users: Arc<UserService>,
    notifications: Arc<NotificationService>,
}

impl MeetingService {
    pub fn new(db: Arc<Database>, users: Arc<UserService>, notifications: Arc<NotificationService>) -> Self {
        Self { collection: db.collection("meetings"), users, notifications }
    }

    pub async fn schedule(&self, caller: &Claims, input: NewMeeting) -> Result<Meeting, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }
        let caller_id = caller.object_id()?;
        if caller_id != input.mentor_id && caller_id != input.mentee_id {
            return Err(AppError::Forbidden("You can only schedule your own meetings".to_string()));
        }
        self.users.get_with_role(input.mentor_id, Role::Mentor).await?;
        self.users.get_with_role(input.mentee_id, Role::Mentee).await?;

        let start_time = parse_time(&input.start_time, "start_time")?;
        let end_time = parse_time(&input.end_time, "end_time")?;
        check_order(start_time, end_time)?;

        let now = Utc::now();
        let mut meeting = Meeting {
            id: None,
            mentor_id: input.mentor_id,
            mentee_id: input.mentee_id,
            title: input.title.trim().to_string(),
            description: input.description.unwrap_or_default(),
            start_time,
            end_time,
            meeting_link: input.meeting_link.unwrap_or_default(),
            status: MeetingStatus::Scheduled,
            created_by: caller_id,
            created_at: now,
            updated_at: now,
        };
        meeting.id = self.collection.insert_one(&meeting).await?.inserted_id.as_object_id();

        self.notify(caller, &meeting, NotificationKind::MeetingScheduled, "scheduled").await;
        Ok(meeting)
    }

    pub async fn list(&self, caller: &Claims, window: MeetingWindow) -> Result<Vec<Meeting>, AppError> {
        let filter = window_filter(caller.object_id()?, window, Utc::now());
        let order = if window == MeetingWindow::Past { -1 } else { 1 };
        let cursor = self.collection.find(filter).sort(doc! { "start_time": order }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn get(&self, caller: &Claims, id: ObjectId) -> Result<Meeting, AppError> {
        let meeting = self
            .collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("Meeting not found".to_string()))?;
        if !meeting.is_participant(&caller.object_id()?) {
            return Err(AppError::Forbidden("You are not part of this meeting".to_string()));
        }
        Ok(meeting)
    }

    pub async fn update(&self, caller: &Claims, id: ObjectId, changes: MeetingChanges) -> Result<Meeting, AppError> {
        let mut meeting = self.get(caller, id).await?;

        if let Some(title) = changes.title.filter(|t| !t.trim().is_empty()) {
            meeting.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            meeting.description = description;
        }
        if let Some(link) = changes.meeting_link {
            meeting.meeting_link = link;
        }
        if let Some(raw) = changes.start_time {
            meeting.start_time = parse_time(&raw, "start_time")?;
        }
        if let Some(raw) = changes.end_time {
            meeting.end_time = parse_time(&raw, "end_time")?;
        }
        if let Some(status) = changes.status {
            meeting.status = status;
        }
        check_order(meeting.start_time, meeting.end_time)?;
        meeting.updated_at = Utc::now();

        self.collection.replace_one(doc! { "_id": id }, &meeting).await?;
        self.notify(caller, &meeting, NotificationKind::MeetingUpdated, "updated").await;
        Ok(meeting)
    }

    /// Meetings are never deleted, only marked cancelled.
    pub async fn cancel(&self, caller: &Claims, id: ObjectId) -> Result<(), AppError> {
        let meeting = self.get(caller, id).await?;
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "status": "cancelled", "updated_at": bson::DateTime::now() } },
            )
            .await?;
        self.notify(caller, &meeting, NotificationKind::MeetingCancelled, "cancelled").await;
        Ok(())
    }

    async fn notify(&self, caller: &Claims, meeting: &Meeting, kind: NotificationKind, verb: &str) {
        let Ok(caller_id) = caller.object_id() else { return };
        let mut note = Notification::new(
            kind,
            caller_id,
            &caller.username,
            meeting.counterpart(&caller_id),
            format!("{} {verb} the meeting \"{}\"", caller.username, meeting.title),
        );
        if let Some(id) = meeting.id {
            note = note.about(id.to_hex());
        }
        self.notifications.send(note).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_times_are_normalized_to_utc() {
        let t = parse_time("2026-03-01T10:00:00+02:00", "start_time").unwrap();
        assert_eq!(t.to_rfc3339(), "2026-03-01T08:00:00+00:00");
    }

    #[test]
    fn bad_times_are_client_errors() {
        assert!(matches!(parse_time("tomorrow", "start_time"), Err(AppError::BadRequest(_))));
        let start = parse_time("2026-03-01T10:00:00Z", "start_time").unwrap();
        assert!(check_order(start, start).is_err());
    }

    #[test]
    fn current_window_brackets_now() {
        let user = ObjectId::new();
        let filter = window_filter(user, MeetingWindow::Current, Utc::now());
        assert!(filter.get_document("start_time").unwrap().contains_key("$lte"));
        assert!(filter.get_document("end_time").unwrap().contains_key("$gte"));
        assert_eq!(filter.get_str("status").unwrap(), "scheduled");
    }
}
