//! Id normalization for documents written by older clients, which stored
//! references either as ObjectId or as a 24-char hex string.

use bson::{oid::ObjectId, Bson};
use serde::{de::Error, Deserialize, Deserializer};

pub fn object_id<'de, D>(deserializer: D) -> Result<ObjectId, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::ObjectId(oid) => Ok(oid),
        Bson::String(hex) => ObjectId::parse_str(&hex).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected ObjectId or hex string, found {other}"))),
    }
}

pub fn optional_object_id<'de, D>(deserializer: D) -> Result<Option<ObjectId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::Null => Ok(None),
        Bson::ObjectId(oid) => Ok(Some(oid)),
        Bson::String(hex) if hex.is_empty() => Ok(None),
        Bson::String(hex) => ObjectId::parse_str(&hex).map(Some).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected ObjectId or hex string, found {other}"))),
    }
}

pub fn parse(raw: &str, what: &str) -> Result<ObjectId, crate::errors::AppError> {
    ObjectId::parse_str(raw)
        .map_err(|_| crate::errors::AppError::BadRequest(format!("Invalid {what} ID")))
}
