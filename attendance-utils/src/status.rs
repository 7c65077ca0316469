use std::fmt;

use chrono::{DateTime, Duration, Timelike, Utc};
use schema::{ClientStatus, Event};
use serde::{Serialize, Serializer};

pub const DEFAULT_STALE_AFTER_IN_S: i64 = 5 * 60;
/// IST
pub const DEFAULT_DISPLAY_OFFSET_IN_M: i64 = 5 * 60 + 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusConfig {
    /// Non-logout events older than this no longer count as presence
    pub stale_after: Duration,
    /// Added to the server timestamp for display only
    pub display_offset: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            stale_after: Duration::seconds(DEFAULT_STALE_AFTER_IN_S),
            display_offset: Duration::minutes(DEFAULT_DISPLAY_OFFSET_IN_M),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    NeverLoggedIn,
    LoggedOut,
    OfflineInactive,
    Active,
    Idle,
    /// Unrecognized client status, title-cased
    Unknown(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NeverLoggedIn => f.write_str("Never Logged In"),
            Status::LoggedOut => f.write_str("Logged Out"),
            Status::OfflineInactive => f.write_str("Offline (Inactive)"),
            Status::Active => f.write_str("Active"),
            Status::Idle => f.write_str("Idle"),
            Status::Unknown(raw) => write!(f, "Unknown ({raw})"),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    NotApplicable,
    Focused,
    Blurred,
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Focus::NotApplicable => "N/A",
            Focus::Focused => "Focused",
            Focus::Blurred => "Blurred",
        })
    }
}

impl Serialize for Focus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedStatus {
    pub status: Status,
    pub focus: Focus,
    /// Local time with the offset baked in, or `N/A`
    pub timestamp: String,
}

/// Maps a user's latest event to what the dashboard shows.
///
/// The checks run in a fixed order and the first match wins:
/// 1. no event: never logged in
/// 2. explicit logout, however old
/// 3. stale event: offline
/// 4. active or idle, with tab focus
/// 5. anything else: unknown
pub fn derive_status(
    latest_event: Option<&Event>,
    now: DateTime<Utc>,
    config: &StatusConfig,
) -> DerivedStatus {
    let Some(event) = latest_event else {
        return DerivedStatus {
            status: Status::NeverLoggedIn,
            focus: Focus::NotApplicable,
            timestamp: "N/A".to_string(),
        };
    };

    let metadata = &event.metadata;
    let tab_focus = if metadata.tab_focused {
        Focus::Focused
    } else {
        Focus::Blurred
    };

    let (status, focus) = match &metadata.client_status {
        ClientStatus::LoggedOut => (Status::LoggedOut, Focus::NotApplicable),
        _ if is_stale(event.server_timestamp, now, config.stale_after) => {
            (Status::OfflineInactive, Focus::NotApplicable)
        }
        ClientStatus::Active => (Status::Active, tab_focus),
        ClientStatus::Idle => (Status::Idle, tab_focus),
        ClientStatus::Unknown(raw) => (Status::Unknown(title_case(raw)), Focus::NotApplicable),
    };

    DerivedStatus {
        status,
        focus,
        timestamp: display_timestamp(event.server_timestamp, config.display_offset),
    }
}

/// A threshold reaching before the earliest representable instant never goes stale
fn is_stale(server_timestamp: DateTime<Utc>, now: DateTime<Utc>, stale_after: Duration) -> bool {
    now.checked_sub_signed(stale_after)
        .is_some_and(|threshold| server_timestamp < threshold)
}

/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` with no zone suffix.
/// Falls back to the unshifted time if the offset leaves chrono's range.
pub fn display_timestamp(server_timestamp: DateTime<Utc>, offset: Duration) -> String {
    let local = server_timestamp
        .checked_add_signed(offset)
        .unwrap_or(server_timestamp)
        .naive_utc();
    if local.nanosecond() / 1_000 == 0 {
        local.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        local.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Uppercases the first letter of every run of letters, lowercases the rest
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
