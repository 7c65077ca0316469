use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use schema::{Event, ObjectId};

use crate::error::Error;

/// Append-only log of attendance events
pub trait EventStore: Send + Sync {
    /// Appends `event`, returning it with its store id set
    fn insert(&self, event: Event) -> impl Future<Output = Result<Event, Error>> + Send;

    /// Deletes every event, returning how many were removed
    fn clear(&self) -> impl Future<Output = Result<u64, Error>> + Send;

    /// For each of `user_ids`, the event with the greatest `server_timestamp`.
    /// Users without events are absent from the map.
    fn latest_per_user(
        &self,
        user_ids: &[String],
    ) -> impl Future<Output = Result<HashMap<String, Event>, Error>> + Send;
}

/// Whether the event store could be reached at startup
#[derive(Clone, Debug)]
pub enum StoreHandle<S> {
    Connected(S),
    Unavailable(String),
}

impl<S> StoreHandle<S> {
    pub fn connected(&self) -> Result<&S, Error> {
        match self {
            StoreHandle::Connected(store) => Ok(store),
            StoreHandle::Unavailable(reason) => Err(Error::StoreUnavailable(reason.clone())),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryEventStore {
    events: Arc<Mutex<Vec<Event>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Event>>, Error> {
        self.events
            .lock()
            .map_err(|_| Error::Store("in-memory event store lock poisoned".to_string()))
    }
}

impl EventStore for InMemoryEventStore {
    async fn insert(&self, mut event: Event) -> Result<Event, Error> {
        event.id.get_or_insert_with(ObjectId::new);
        self.lock()?.push(event.clone());
        Ok(event)
    }

    async fn clear(&self) -> Result<u64, Error> {
        let mut events = self.lock()?;
        let deleted_count = events.len() as u64;
        events.clear();
        Ok(deleted_count)
    }

    async fn latest_per_user(&self, user_ids: &[String]) -> Result<HashMap<String, Event>, Error> {
        let wanted: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        let events = self.lock()?;

        let mut latest: HashMap<String, Event> = HashMap::new();
        // Later inserts win ties
        for event in events.iter().filter(|e| wanted.contains(e.user_id.as_str())) {
            match latest.get(&event.user_id) {
                Some(current) if current.server_timestamp > event.server_timestamp => {}
                _ => {
                    latest.insert(event.user_id.clone(), event.clone());
                }
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use schema::{ClientStatus, EventMetadata};

    fn heartbeat(user_id: &str, client_status: ClientStatus, minute: u32) -> Event {
        let metadata = EventMetadata {
            client_status,
            ..Default::default()
        };
        let server_timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 9, minute, 0).unwrap();
        Event::new(user_id, "heartbeat", metadata, server_timestamp)
    }

    #[tokio::test]
    async fn insert_assigns_an_id() {
        let store = InMemoryEventStore::new();
        let stored = store
            .insert(heartbeat("MCA-428", ClientStatus::Active, 0))
            .await
            .unwrap();
        assert!(stored.id.is_some());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn latest_per_user_picks_newest_event() {
        let store = InMemoryEventStore::new();
        store
            .insert(heartbeat("MCA-428", ClientStatus::Idle, 5))
            .await
            .unwrap();
        store
            .insert(heartbeat("MCA-428", ClientStatus::Active, 1))
            .await
            .unwrap();
        store
            .insert(heartbeat("MCA-112", ClientStatus::Active, 2))
            .await
            .unwrap();
        store
            .insert(heartbeat("tch-99b3", ClientStatus::Active, 3))
            .await
            .unwrap();

        let latest = store
            .latest_per_user(&["MCA-428".to_string(), "MCA-112".to_string()])
            .await
            .unwrap();

        assert_eq!(latest.len(), 2);
        assert_eq!(latest["MCA-428"].metadata.client_status, ClientStatus::Idle);
        assert_eq!(latest["MCA-112"].metadata.client_status, ClientStatus::Active);
        assert!(!latest.contains_key("tch-99b3"));
    }

    #[tokio::test]
    async fn later_insert_wins_timestamp_ties() {
        let store = InMemoryEventStore::new();
        let first = store
            .insert(heartbeat("MCA-428", ClientStatus::Active, 0))
            .await
            .unwrap();
        let second = store
            .insert(heartbeat("MCA-428", ClientStatus::Active, 0))
            .await
            .unwrap();

        let latest = store
            .latest_per_user(&["MCA-428".to_string()])
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(latest["MCA-428"].id, second.id);
    }

    #[tokio::test]
    async fn clear_reports_deleted_count() {
        let store = InMemoryEventStore::new();
        for minute in 0..3 {
            let mut event = heartbeat("MCA-112", ClientStatus::Idle, minute);
            event.server_timestamp += Duration::seconds(1);
            store.insert(event).await.unwrap();
        }
        assert_eq!(store.clear().await.unwrap(), 3);
        assert!(store.is_empty().unwrap());
        assert_eq!(store.clear().await.unwrap(), 0);
    }

    #[test]
    fn unavailable_handle_is_an_error() {
        let handle: StoreHandle<InMemoryEventStore> =
            StoreHandle::Unavailable("connection refused".to_string());
        let err = handle.connected().unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert_eq!(err.status_code(), 503);

        let handle = StoreHandle::Connected(InMemoryEventStore::new());
        assert!(handle.connected().is_ok());
    }
}
