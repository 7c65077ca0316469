use chrono::{DateTime, Utc};
use schema::{Event, EventMetadata};
use serde::Deserialize;

use crate::{error::Error, store::EventStore};

/// Event as posted by a client. Every field is required, but they are optional
/// here so a missing one is a validation error rather than a parse error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventPayload {
    pub user_id: Option<String>,
    pub event_type: Option<String>,
    pub metadata: Option<EventMetadata>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LogoutPayload {
    pub user_id: Option<String>,
}

/// Stamps the event with `now` and appends it. Duplicates are stored as is.
pub async fn record_event<S: EventStore>(
    store: &S,
    payload: EventPayload,
    now: DateTime<Utc>,
) -> Result<Event, Error> {
    let (Some(user_id), Some(event_type), Some(metadata)) =
        (payload.user_id, payload.event_type, payload.metadata)
    else {
        return Err(Error::Validation(
            "Missing required fields (user_id, event_type, metadata).".to_string(),
        ));
    };

    let event = store
        .insert(Event::new(user_id, event_type, metadata, now))
        .await?;
    tracing::info!(
        user_id = %event.user_id,
        event_type = %event.event_type,
        id = ?event.id,
        "attendance event recorded"
    );
    Ok(event)
}

/// Appends the canonical logout event for the user
pub async fn record_logout<S: EventStore>(
    store: &S,
    payload: LogoutPayload,
    now: DateTime<Utc>,
) -> Result<Event, Error> {
    let Some(user_id) = payload.user_id.filter(|id| !id.is_empty()) else {
        return Err(Error::Validation(
            "Missing user_id for logout event.".to_string(),
        ));
    };

    let event = store.insert(Event::logout(user_id, now)).await?;
    tracing::info!(user_id = %event.user_id, id = ?event.id, "logout event recorded");
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEventStore;
    use chrono::TimeZone;
    use schema::ClientStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn payload() -> EventPayload {
        EventPayload {
            user_id: Some("MCA-428".to_string()),
            event_type: Some("heartbeat".to_string()),
            metadata: Some(EventMetadata {
                client_status: ClientStatus::Active,
                tab_focused: true,
                // Clients may send anything here, it is never trusted
                client_timestamp: Some("1999-12-31T23:59:59Z".to_string()),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn record_event_uses_server_time() {
        let store = InMemoryEventStore::new();
        let event = record_event(&store, payload(), now()).await.unwrap();
        assert_eq!(event.server_timestamp, now());
        assert_eq!(event.user_id, "MCA-428");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn record_event_requires_all_fields() {
        let store = InMemoryEventStore::new();
        for payload in [
            EventPayload {
                user_id: None,
                ..payload()
            },
            EventPayload {
                event_type: None,
                ..payload()
            },
            EventPayload {
                metadata: None,
                ..payload()
            },
        ] {
            let err = record_event(&store, payload, now()).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn identical_events_are_both_stored() {
        let store = InMemoryEventStore::new();
        record_event(&store, payload(), now()).await.unwrap();
        record_event(&store, payload(), now()).await.unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn record_logout_synthesizes_logout_event() {
        let store = InMemoryEventStore::new();
        let event = record_logout(
            &store,
            LogoutPayload {
                user_id: Some("MCA-112".to_string()),
            },
            now(),
        )
        .await
        .unwrap();

        assert_eq!(event.event_type, "logout");
        assert_eq!(event.metadata.client_status, ClientStatus::LoggedOut);
        assert!(!event.metadata.tab_focused);
        assert!(event.metadata.client_timestamp.is_some());
        assert_eq!(event.server_timestamp, now());
    }

    #[tokio::test]
    async fn record_logout_requires_user_id() {
        let store = InMemoryEventStore::new();
        for user_id in [None, Some(String::new())] {
            let err = record_logout(&store, LogoutPayload { user_id }, now())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }
}
