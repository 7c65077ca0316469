//! Attendance data model shared by the service and its utilities.
//!
//! - `event`: attendance events as stored in the `events` collection
//! - `user`: identities handed out by the auth gate
//! - `db`: MongoDB connection helpers
pub mod db;
pub mod event;
pub mod user;

pub use bson::oid::ObjectId;
pub use event::{ClientStatus, Event, EventMetadata};
pub use user::{Role, UserIdentity};
