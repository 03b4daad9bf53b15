//! HTTP surface of the wedding invitation site.
//!
//! # Routes
//! - `GET  /api/greeting`: whole guestbook grouped by day.
//! - `POST /api/greeting`: append one message (`{ "data": { ... } }`).
//! - `GET  /api/greeting/events`: server-sent insert notifications.
//! - `GET  /api/user?username=`: invited-guest lookup.
//! - `GET  /health`
//!
//! When a static directory is configured, the prebuilt invitation page is
//! served from it for every other path.
//!
//! Greetings written by other processes sharing the database file are
//! picked up by [`watcher::spawn_insert_watcher`] and pushed like local ones.

use std::path::Path;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use invitation_core::{db::open_db, InsertNotifier};
use log::{error, info};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod watcher;

use config::Settings;
use error::ServerError;
use routes::{
    greeting_create_handler, greeting_events_handler, greeting_list_handler, health_handler,
    user_lookup_handler,
};
use state::AppState;
use watcher::spawn_insert_watcher;

/// Builds the application router around `state`.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route(
            "/api/greeting",
            get(greeting_list_handler).post(greeting_create_handler),
        )
        .route("/api/greeting/events", get(greeting_events_handler))
        .route("/api/user", get(user_lookup_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state);

    match static_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => app,
    }
}

/// Opens the store, binds the configured port and serves until a
/// shutdown signal arrives.
pub async fn run(settings: Settings) -> Result<(), ServerError> {
    info!("event=server_init module=server status=start");
    let conn = open_db(&settings.db_path)?;
    let state = AppState::new(conn, InsertNotifier::new(settings.event_capacity))
        .with_day_offset(settings.day_offset);
    if let Some(every) = settings.insert_poll {
        spawn_insert_watcher(state.clone(), every);
    }

    let address = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&address).await?;
    info!("event=server_bind module=server status=ok address={address}");

    serve(listener, state, settings.static_dir.as_deref()).await
}

/// Serves on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    static_dir: Option<&Path>,
) -> Result<(), ServerError> {
    let app = router(state.clone(), static_dir);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            state.begin_shutdown();
        })
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("event=signal_install module=server status=error error={err}");
            std::future::pending::<()>().await;
        }
        info!("event=shutdown module=server status=start signal=ctrl_c");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=shutdown module=server status=start signal=terminate");
            }
            Err(err) => {
                error!("event=signal_install module=server status=error error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
