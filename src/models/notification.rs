use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ConnectionRequest,
    ConnectionAccepted,
    NewMessage,
    RoadmapCreated,
    RoadmapUpdated,
    ModuleCompleted,
    InterviewCompleted,
    MeetingScheduled,
    MeetingUpdated,
    MeetingCancelled,
    FeedbackReceived,
}

/// Only connection requests carry a status.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from_user_id: ObjectId,
    pub to_user_id: ObjectId,
    pub from_username: String,
    pub message: String,
    /// Id of the roadmap, meeting or message the notification is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        from_user_id: ObjectId,
        from_username: &str,
        to_user_id: ObjectId,
        message: String,
    ) -> Self {
        Notification {
            id: None,
            kind,
            from_user_id,
            to_user_id,
            from_username: from_username.to_string(),
            message,
            related_id: None,
            status: (kind == NotificationKind::ConnectionRequest).then_some(RequestStatus::Pending),
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn about(mut self, related_id: impl Into<String>) -> Self {
        self.related_id = Some(related_id.into());
        self
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from_user_id: String,
    pub to_user_id: String,
    pub from_username: String,
    pub message: String,
    pub related_id: Option<String>,
    pub status: Option<RequestStatus>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        NotificationResponse {
            id: n.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            kind: n.kind,
            from_user_id: n.from_user_id.to_hex(),
            to_user_id: n.to_user_id.to_hex(),
            from_username: n.from_username,
            message: n.message,
            related_id: n.related_id,
            status: n.status,
            read: n.read,
            created_at: n.created_at,
        }
    }
}
