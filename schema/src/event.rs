use bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const LOGOUT_EVENT_TYPE: &str = "logout";

/// Presence reported by a client, normalized to lowercase.
///
/// Anything other than the three known values is kept verbatim (lowercased) in
/// `Unknown`, so it can still be shown on the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClientStatus {
    Active,
    Idle,
    LoggedOut,
    Unknown(String),
}

impl ClientStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.to_lowercase();
        match normalized.as_str() {
            "active" => ClientStatus::Active,
            "idle" => ClientStatus::Idle,
            "logged_out" => ClientStatus::LoggedOut,
            _ => ClientStatus::Unknown(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Idle => "idle",
            ClientStatus::LoggedOut => "logged_out",
            ClientStatus::Unknown(raw) => raw,
        }
    }
}

/// A missing status reads as `n/a`
impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::Unknown("n/a".to_string())
    }
}

impl Serialize for ClientStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClientStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| ClientStatus::parse(&s)).unwrap_or_default())
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub client_status: ClientStatus,
    #[serde(default, deserialize_with = "null_as_false")]
    pub tab_focused: bool,
    /// Client clock at send time. Never used for ordering or staleness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<String>,
    /// Any other keys the client attached
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub event_type: String,
    pub metadata: EventMetadata,
    /// Assigned by the server on insert, authoritative for ordering
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub server_timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        user_id: impl Into<String>,
        event_type: impl Into<String>,
        metadata: EventMetadata,
        server_timestamp: DateTime<Utc>,
    ) -> Self {
        Event {
            id: None,
            user_id: user_id.into(),
            event_type: event_type.into(),
            metadata,
            server_timestamp,
        }
    }

    /// The canonical logout event. It has the same shape as a heartbeat so the
    /// latest-event lookup treats both alike.
    pub fn logout(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let metadata = EventMetadata {
            client_status: ClientStatus::LoggedOut,
            tab_focused: false,
            client_timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            extra: serde_json::Map::new(),
        };
        Event::new(user_id, LOGOUT_EVENT_TYPE, metadata, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn client_status_is_case_insensitive() {
        assert_eq!(ClientStatus::parse("ACTIVE"), ClientStatus::Active);
        assert_eq!(ClientStatus::parse("Idle"), ClientStatus::Idle);
        assert_eq!(ClientStatus::parse("Logged_Out"), ClientStatus::LoggedOut);
        assert_eq!(
            ClientStatus::parse("Away"),
            ClientStatus::Unknown("away".to_string())
        );
    }

    #[test]
    fn metadata_defaults_when_fields_are_missing() {
        let metadata: EventMetadata = serde_json::from_value(json!({})).unwrap();
        assert_eq!(metadata.client_status, ClientStatus::Unknown("n/a".into()));
        assert!(!metadata.tab_focused);
        assert_eq!(metadata.client_timestamp, None);

        let metadata: EventMetadata =
            serde_json::from_value(json!({"client_status": null, "tab_focused": null})).unwrap();
        assert_eq!(metadata.client_status, ClientStatus::default());
        assert!(!metadata.tab_focused);
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let metadata: EventMetadata = serde_json::from_value(json!({
            "client_status": "Active",
            "tab_focused": true,
            "client_timestamp": "2024-01-01T00:00:00Z",
            "page": "/quiz/3"
        }))
        .unwrap();
        assert_eq!(metadata.client_status, ClientStatus::Active);
        assert!(metadata.tab_focused);
        assert_eq!(metadata.extra.get("page"), Some(&json!("/quiz/3")));

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["client_status"], json!("active"));
        assert_eq!(value["page"], json!("/quiz/3"));
    }

    #[test]
    fn server_timestamp_is_stored_as_bson_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let event = Event::logout("MCA-428", now);
        let document = bson::to_document(&event).unwrap();

        assert!(document.get("_id").is_none());
        assert_eq!(
            document.get_datetime("server_timestamp").unwrap(),
            &bson::DateTime::from_chrono(now)
        );
        let metadata = document.get_document("metadata").unwrap();
        assert_eq!(metadata.get_str("client_status").unwrap(), "logged_out");
        assert!(!metadata.get_bool("tab_focused").unwrap());
        assert_eq!(document.get_str("event_type").unwrap(), LOGOUT_EVENT_TYPE);
    }
}
