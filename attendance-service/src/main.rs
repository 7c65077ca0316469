use std::{sync::Arc, time::Duration};

use anyhow::Context;
use attendance_service::{app, config, mongo::MongoEventStore, with_layers};
use attendance_utils::directory::{InMemoryDirectory, UserDirectory};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,attendance_utils=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        // Log to stdout
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(sentry::integrations::tracing::layer())
        .init();

    info!("Starting attendance service...");
    let env_vars = config::EnvVars::new();

    let _guard = if let Some(sentry_dsn) = env_vars.sentry_dsn.clone() {
        info!("initializing Sentry");
        // NOTE: Events are only emitted, once the guard goes out of scope.
        Some(sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(env_vars.environment.to_string().into()),
                traces_sample_rate: 1.0,
                ..Default::default()
            },
        )))
    } else {
        None
    };

    if let Err(e) = run(env_vars).await {
        error!("Server error: {e:?}");
    }
}

async fn run(env_vars: config::EnvVars) -> anyhow::Result<()> {
    let directory: Arc<dyn UserDirectory> = match &env_vars.directory_path {
        Some(path) => Arc::new(
            InMemoryDirectory::from_json_file(path).context("unable to load user directory")?,
        ),
        None => Arc::new(InMemoryDirectory::demo()),
    };
    info!(
        users = directory.entries().len(),
        students = directory.students().len(),
        "user directory loaded"
    );

    let store = MongoEventStore::connect(&env_vars.mongodb_uri).await;

    let app_state = config::AppState {
        store,
        directory,
        status_config: env_vars.status_config(),
    };

    warn!("/admin routes are not protected by authentication");

    let app = with_layers(
        app(app_state),
        Duration::from_millis(env_vars.request_timeout_in_ms),
        env_vars.request_body_size_limit,
    );

    let port = env_vars.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("unable to bind to port {port}"))?;
    info!(port, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with an error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
