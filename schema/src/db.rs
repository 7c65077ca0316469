use std::time::Duration;

use mongodb::{Client, Collection, Database, bson::doc, options::ClientOptions};

/// Used when the connection URI does not name a database
pub const DEFAULT_DATABASE: &str = "attendance_tracking_db";
pub const EVENTS_COLLECTION: &str = "events";

const APP_NAME: &str = "attendance-service";

pub fn database(client: &Client) -> Database {
    client
        .default_database()
        .unwrap_or_else(|| client.database(DEFAULT_DATABASE))
}

pub fn get_collection<T>(client: &Client, collection_name: &str) -> Collection<T>
where
    T: Send + Sync,
{
    database(client).collection::<T>(collection_name)
}

pub async fn client(uri: &str) -> mongodb::error::Result<Client> {
    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.app_name = Some(APP_NAME.to_string());
    client_options
        .server_selection_timeout
        .get_or_insert(Duration::from_secs(5));

    // Get a handle to the cluster
    let client = Client::with_options(client_options)?;

    // Ping the server to see if you can connect to the cluster
    database(&client).run_command(doc! {"ping": 1}).await?;

    Ok(client)
}
