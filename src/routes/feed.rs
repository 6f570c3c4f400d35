//! Change feed subscription: `GET /feed/{type}` streams server-sent events.
//!
//! `{type}` is the wire resource type (`planets`) or the model type (`planet`). Each event is
//! named after the operation (`addRecord`, `replaceRelatedRecords`, ...) and carries the
//! [`FeedEvent`](crate::feed::FeedEvent) as JSON. A subscriber that falls behind the channel
//! buffer skips the missed events.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

async fn subscribe(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let record_type = match state.codec.record_type(&resource_type) {
        Some(t) => t.to_string(),
        None if state.codec.schema().has_model(&resource_type) => resource_type.clone(),
        None => return Err(AppError::NotFound(format!("unknown resource type '{}'", resource_type))),
    };
    tracing::debug!(record_type = %record_type, "feed subscriber connected");
    let receiver = state.pubsub.subscribe(&record_type);
    let stream = BroadcastStream::new(receiver).filter_map(move |item| {
        let event = match item {
            Ok(event) => Some(Event::default().event(event.operation.name()).json_data(&event)),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "feed subscriber lagged");
                None
            }
        };
        futures::future::ready(event)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub fn feed_routes(state: AppState) -> Router {
    Router::new().route("/feed/:type", get(subscribe)).with_state(state)
}
