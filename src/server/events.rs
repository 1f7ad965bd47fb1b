//! Event history endpoint.
//!
//! Read-only listing of the most recent stored events, oldest first,
//! projected down to the fields a caller needs. The raw payload is
//! never exposed here.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::webhooks::Event;

/// Query parameters for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events to return (most recent first retained).
    pub limit: Option<usize>,
}

/// Projection of a stored event for the history surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventView {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub repository: String,
    pub sender: String,
    pub summary: String,
}

impl From<Event> for EventView {
    fn from(event: Event) -> EventView {
        EventView {
            timestamp: event.received_at,
            kind: event.kind.as_str().to_string(),
            repository: event.repository,
            sender: event.sender,
            summary: event.summary,
        }
    }
}

/// Returns the most recent stored events as a JSON array.
pub async fn events_handler(
    State(app_state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventView>> {
    let events = app_state.store().list(query.limit);
    Json(events.into_iter().map(EventView::from).collect())
}
