//! Attendance Tracking Utility Functions
//!
//! ## Current API
//!
//! - Derive a presentable status from a student's latest event
//! - Record heartbeat and logout events
//! - Build the teacher dashboard report
//! - Look up users in the static directory
//! - Event store contract, with an in-memory store
//!
pub mod directory;
pub mod error;
pub mod ingest;
pub mod report;
pub mod status;
pub mod store;
