use std::collections::HashMap;

use attendance_utils::{
    error::Error,
    store::{EventStore, StoreHandle},
};
use futures_util::TryStreamExt;
use mongodb::{Client, Collection, bson::doc};
use schema::{
    Event,
    db::{self, EVENTS_COLLECTION},
};
use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct MongoEventStore {
    collection: Collection<Event>,
}

impl MongoEventStore {
    pub fn new(client: &Client) -> Self {
        MongoEventStore {
            collection: db::get_collection::<Event>(client, EVENTS_COLLECTION),
        }
    }

    /// Connects once at startup. A failure is kept as `Unavailable` so
    /// requests can report it instead of the process exiting.
    pub async fn connect(uri: &str) -> StoreHandle<Self> {
        match db::client(uri).await {
            Ok(client) => {
                info!(
                    database = %db::database(&client).name(),
                    "MongoDB connection successful"
                );
                StoreHandle::Connected(MongoEventStore::new(&client))
            }
            Err(e) => {
                error!(error = %e, "unable to connect to MongoDB");
                StoreHandle::Unavailable(e.to_string())
            }
        }
    }
}

fn store_error(e: mongodb::error::Error) -> Error {
    Error::Store(e.to_string())
}

#[derive(Deserialize)]
struct LatestEvent {
    #[serde(rename = "_id")]
    user_id: String,
    latest_event: Event,
}

impl EventStore for MongoEventStore {
    #[tracing::instrument(skip_all, err(Debug))]
    async fn insert(&self, mut event: Event) -> Result<Event, Error> {
        let res = self
            .collection
            .insert_one(&event)
            .await
            .map_err(store_error)?;
        event.id = res.inserted_id.as_object_id();
        Ok(event)
    }

    #[tracing::instrument(skip_all, err(Debug))]
    async fn clear(&self) -> Result<u64, Error> {
        let res = self
            .collection
            .delete_many(doc! {})
            .await
            .map_err(store_error)?;
        Ok(res.deleted_count)
    }

    #[tracing::instrument(skip_all, fields(users = user_ids.len()), err(Debug))]
    async fn latest_per_user(&self, user_ids: &[String]) -> Result<HashMap<String, Event>, Error> {
        let pipeline = [
            doc! {"$match": {"user_id": {"$in": user_ids.to_vec()}}},
            // Newest first, later inserts first on ties
            doc! {"$sort": {"server_timestamp": -1, "_id": -1}},
            doc! {"$group": {"_id": "$user_id", "latest_event": {"$first": "$$ROOT"}}},
        ];

        let latest: Vec<LatestEvent> = self
            .collection
            .aggregate(pipeline)
            .with_type::<LatestEvent>()
            .await
            .map_err(store_error)?
            .try_collect()
            .await
            .map_err(store_error)?;

        Ok(latest
            .into_iter()
            .map(|l| (l.user_id, l.latest_event))
            .collect())
    }
}
