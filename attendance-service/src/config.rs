use std::{env::var, fmt, sync::Arc};

use attendance_utils::{
    directory::UserDirectory,
    status::{DEFAULT_DISPLAY_OFFSET_IN_M, DEFAULT_STALE_AFTER_IN_S, StatusConfig},
    store::StoreHandle,
};
use chrono::Duration;
use tracing::warn;

pub const MAX_ACTIVITY_TIMEOUT_IN_S: i64 = 30 * 24 * 60 * 60;
pub const MAX_DISPLAY_OFFSET_IN_M: i64 = 24 * 60;

#[derive(Clone)]
pub struct AppState<S> {
    pub store: StoreHandle<S>,
    pub directory: Arc<dyn UserDirectory>,
    pub status_config: StatusConfig,
}

#[derive(Clone, Debug)]
pub struct EnvVars {
    pub activity_timeout_in_s: i64,
    pub directory_path: Option<String>,
    pub display_offset_in_m: i64,
    pub environment: Environment,
    pub mongodb_uri: String,
    pub port: u16,
    pub request_body_size_limit: usize,
    pub request_timeout_in_ms: u64,
    pub sentry_dsn: Option<String>,
}

#[derive(Clone, Debug)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                warn!(
                    "ENVIRONMENT value '{}' is not valid. Defaulting to 'production'.",
                    other
                );
                Environment::Production
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        })
    }
}

impl EnvVars {
    pub fn new() -> Self {
        let mongodb_uri = match var("MONGODB_URI") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                let default_mongodb_uri = "mongodb://localhost:27017/".to_string();
                warn!("MONGODB_URI not set. Defaulting to {default_mongodb_uri}");
                default_mongodb_uri
            }
        };

        let port = match var("PORT") {
            Ok(port_string) => port_string.parse().expect("PORT to be parseable as u16"),
            Err(_e) => {
                let default_port = 5000;
                warn!("PORT not set. Defaulting to {default_port}");
                default_port
            }
        };

        let activity_timeout_in_s = parse_activity_timeout_in_s(var("ACTIVITY_TIMEOUT_IN_S").ok());
        let display_offset_in_m = parse_display_offset_in_m(var("DISPLAY_OFFSET_IN_M").ok());

        let directory_path = match var("DIRECTORY_PATH") {
            Ok(s) if !s.is_empty() => Some(s),
            _ => {
                warn!("DIRECTORY_PATH not set. Using the built-in demo roster.");
                None
            }
        };

        let request_timeout_in_ms = match var("REQUEST_TIMEOUT_IN_MS") {
            Ok(s) => s
                .parse()
                .expect("REQUEST_TIMEOUT_IN_MS to be valid unsigned integer"),
            Err(_e) => {
                let default_request_timeout = 30_000;
                warn!("REQUEST_TIMEOUT_IN_MS not set. Defaulting to {default_request_timeout}");
                default_request_timeout
            }
        };

        let request_body_size_limit = match var("REQUEST_BODY_SIZE_LIMIT") {
            Ok(s) => s
                .parse()
                .expect("REQUEST_BODY_SIZE_LIMIT to be valid unsigned integer"),
            Err(_e) => {
                let default_request_body_size_limit = 5 * 1024 * 1024;
                warn!(
                    "REQUEST_BODY_SIZE_LIMIT not set. Defaulting to {default_request_body_size_limit}"
                );
                default_request_body_size_limit
            }
        };

        let sentry_dsn = match var("SENTRY_DSN") {
            Ok(dsn_string) if !dsn_string.is_empty() => {
                assert!(
                    dsn_string.parse::<sentry::types::Dsn>().is_ok(),
                    "SENTRY_DSN is not valid DSN."
                );
                Some(dsn_string)
            }
            _ => {
                warn!("SENTRY_DSN not set.");
                None
            }
        };

        let environment = match var("ENVIRONMENT") {
            Ok(v) => v.into(),
            Err(_e) => {
                warn!("ENVIRONMENT not set. Defaulting to 'production'.");
                Environment::Production
            }
        };

        EnvVars {
            activity_timeout_in_s,
            directory_path,
            display_offset_in_m,
            environment,
            mongodb_uri,
            port,
            request_body_size_limit,
            request_timeout_in_ms,
            sentry_dsn,
        }
    }

    pub fn status_config(&self) -> StatusConfig {
        StatusConfig {
            stale_after: Duration::try_seconds(self.activity_timeout_in_s)
                .expect("ACTIVITY_TIMEOUT_IN_S to be range checked"),
            display_offset: Duration::try_minutes(self.display_offset_in_m)
                .expect("DISPLAY_OFFSET_IN_M to be range checked"),
        }
    }
}

fn parse_activity_timeout_in_s(value: Option<String>) -> i64 {
    let Some(s) = value else {
        return DEFAULT_STALE_AFTER_IN_S;
    };
    let seconds: i64 = s
        .parse()
        .expect("ACTIVITY_TIMEOUT_IN_S to be a whole number of seconds");
    assert!(
        (1..=MAX_ACTIVITY_TIMEOUT_IN_S).contains(&seconds),
        "ACTIVITY_TIMEOUT_IN_S must be between 1 and {MAX_ACTIVITY_TIMEOUT_IN_S} (30 days)"
    );
    seconds
}

/// Negative offsets are west of UTC
fn parse_display_offset_in_m(value: Option<String>) -> i64 {
    let Some(s) = value else {
        return DEFAULT_DISPLAY_OFFSET_IN_M;
    };
    let minutes: i64 = s
        .parse()
        .expect("DISPLAY_OFFSET_IN_M to be a whole number of minutes");
    assert!(
        (-MAX_DISPLAY_OFFSET_IN_M..=MAX_DISPLAY_OFFSET_IN_M).contains(&minutes),
        "DISPLAY_OFFSET_IN_M must be within +/-{MAX_DISPLAY_OFFSET_IN_M} minutes"
    );
    minutes
}
