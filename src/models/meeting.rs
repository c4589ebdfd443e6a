use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Meeting {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub mentor_id: ObjectId,
    pub mentee_id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub meeting_link: String,
    pub status: MeetingStatus,
    pub created_by: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn is_participant(&self, user_id: &ObjectId) -> bool {
        &self.mentor_id == user_id || &self.mentee_id == user_id
    }

    pub fn counterpart(&self, user_id: &ObjectId) -> ObjectId {
        if &self.mentor_id == user_id { self.mentee_id } else { self.mentor_id }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct MeetingResponse {
    pub id: String,
    pub mentor_id: String,
    pub mentee_id: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meeting_link: String,
    pub status: MeetingStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Meeting> for MeetingResponse {
    fn from(m: Meeting) -> Self {
        MeetingResponse {
            id: m.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            mentor_id: m.mentor_id.to_hex(),
            mentee_id: m.mentee_id.to_hex(),
            title: m.title,
            description: m.description,
            start_time: m.start_time,
            end_time: m.end_time,
            meeting_link: m.meeting_link,
            status: m.status,
            created_by: m.created_by.to_hex(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Which slice of a user's meetings to list, relative to `now`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeetingWindow {
    All,
    Upcoming,
    Past,
    Current,
}
