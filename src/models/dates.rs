//! Timestamps stored as BSON datetimes. Older documents and model-edited drafts may
//! carry RFC 3339 strings or epoch milliseconds instead; both are accepted on read.

use bson::{serde_helpers::chrono_datetime_as_bson_datetime, Bson};
use chrono::{DateTime, Utc};
use serde::{de::Error, Deserialize, Deserializer, Serializer};

fn from_bson<E: Error>(value: Bson) -> Result<Option<DateTime<Utc>>, E> {
    match value {
        Bson::Null => Ok(None),
        Bson::DateTime(dt) => Ok(Some(dt.to_chrono())),
        Bson::String(raw) if raw.trim().is_empty() => Ok(None),
        Bson::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(E::custom),
        Bson::Int64(millis) => Ok(Some(bson::DateTime::from_millis(millis).to_chrono())),
        other => Err(E::custom(format!("expected a datetime, found {other}"))),
    }
}

pub mod required {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        chrono_datetime_as_bson_datetime::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        from_bson(Bson::deserialize(deserializer)?)?.ok_or_else(|| D::Error::custom("missing datetime"))
    }
}

pub mod optional {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => chrono_datetime_as_bson_datetime::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        from_bson(Bson::deserialize(deserializer)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Stamped {
        #[serde(with = "super::required")]
        at: chrono::DateTime<chrono::Utc>,
        #[serde(default, with = "super::optional", skip_serializing_if = "Option::is_none")]
        done: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[test]
    fn stored_as_bson_datetimes() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let stamped = Stamped { at, done: Some(at) };
        let doc = bson::to_document(&stamped).unwrap();
        assert!(matches!(doc.get("at"), Some(bson::Bson::DateTime(_))));
        assert!(matches!(doc.get("done"), Some(bson::Bson::DateTime(_))));
        assert_eq!(bson::from_document::<Stamped>(doc).unwrap(), stamped);
    }

    #[test]
    fn legacy_strings_and_nulls_are_read() {
        let raw = bson::doc! { "at": "2026-03-01T09:00:00+01:00", "done": bson::Bson::Null };
        let stamped: Stamped = bson::from_document(raw).unwrap();
        assert_eq!(stamped.at, chrono::Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());
        assert_eq!(stamped.done, None);

        let missing: Stamped = bson::from_document(bson::doc! { "at": bson::DateTime::now() }).unwrap();
        assert_eq!(missing.done, None);
    }
}
