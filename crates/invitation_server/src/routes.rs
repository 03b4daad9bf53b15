use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use invitation_core::{
    core_version, GreetingEvent, GuestLookup, Guestbook, NewGreeting, SubscriptionEvent,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState};

pub const INSERTED_EVENT: &str = "greeting_inserted";
pub const LAGGED_EVENT: &str = "greeting_lagged";
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct CreateGreetingRequest {
    pub data: NewGreeting,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessBody {
    #[serde(rename = "isSuccess")]
    pub is_success: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupBody {
    pub data: GuestLookup,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub version: String,
}

pub async fn greeting_list_handler(
    State(state): State<AppState>,
) -> Result<Json<Guestbook>, ApiError> {
    let guestbook = state.blocking(|state| state.list_greetings()).await?;
    Ok(Json(guestbook))
}

pub async fn greeting_create_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateGreetingRequest>, JsonRejection>,
) -> Result<Json<SuccessBody>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::MalformedPayload(err.body_text()))?;

    state
        .blocking(move |state| state.append_greeting(&request.data))
        .await?;

    Ok(Json(SuccessBody { is_success: true }))
}

/// Pushes one SSE event per inserted message until the client leaves or
/// the server shuts down.
pub async fn greeting_events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.notifier().subscribe();
    let mut shutdown = state.shutdown_receiver();

    let events = stream! {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                next = subscription.next_event() => next,
                _ = shutdown.changed() => None,
            };
            let Some(next) = next else {
                break;
            };

            match next {
                SubscriptionEvent::Event(GreetingEvent::Inserted(message)) => {
                    match Event::default().event(INSERTED_EVENT).json_data(&message) {
                        Ok(event) => yield Ok::<Event, Infallible>(event),
                        Err(err) => warn!("event=greeting_push module=api status=error error={err}"),
                    }
                }
                SubscriptionEvent::Lagged(skipped) => {
                    yield Ok(Event::default().event(LAGGED_EVENT).data(skipped.to_string()));
                }
            }
        }
        info!("event=greeting_push module=api status=ok detail=stream_closed");
    };

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

pub async fn user_lookup_handler(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<LookupBody>, ApiError> {
    let data = match query.username {
        Some(username) => {
            state
                .blocking(move |state| state.lookup_guest(&username))
                .await?
        }
        None => GuestLookup::not_invited(),
    };

    Ok(Json(LookupBody { data }))
}

pub async fn health_handler() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
        version: core_version().to_string(),
    })
}
