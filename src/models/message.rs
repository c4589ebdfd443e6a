use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Flat chat message; a conversation is every message between one pair of users.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub sender_id: ObjectId,
    pub receiver_id: ObjectId,
    pub content: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender_username: String,
    pub receiver_username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    pub page: u64,
    #[serde(rename = "isLastPage")]
    pub is_last_page: bool,
}

pub const PREVIEW_CHARS: usize = 50;

/// First 50 characters followed by "...", counted in chars so multibyte text is not split.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_not_truncated() {
        assert_eq!(preview("hello"), "hello");
    }

    #[test]
    fn long_messages_are_cut_at_fifty_chars() {
        let text = "é".repeat(60);
        let cut = preview(&text);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
    }
}
