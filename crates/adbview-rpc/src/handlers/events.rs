//! Server-sent event stream of bridge events.

use crate::server::AppState;
use adbview_core::{BridgeEvent, EventName};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated event names; all events when absent.
    only: Option<String>,
}

fn parse_names(only: Option<&str>) -> Result<Vec<EventName>, String> {
    only.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<EventName>)
        .collect()
}

fn to_sse(event: &BridgeEvent) -> Event {
    Event::default()
        .event(event.name().as_str())
        .data(event.payload().to_string())
}

/// `GET /events`: one SSE message per bridge event, named after the event,
/// with the JSON payload as data.
pub async fn handle_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let names = parse_names(query.only.as_deref()).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    debug!("Event stream opened for {:?}", names);

    let (receiver, filter) = state
        .bridge
        .controller()
        .events()
        .subscribe(&names)
        .into_parts();

    let stream = BroadcastStream::new(receiver).filter_map(move |item| match item {
        Ok(event) if filter.is_empty() || filter.contains(&event.name()) => {
            Some(Ok(to_sse(&event)))
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!("Event stream lagged, skipped {} events", skipped);
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_names(None).unwrap(), Vec::<EventName>::new());
        assert_eq!(
            parse_names(Some("logcat-data, logcat-closed")).unwrap(),
            vec![EventName::LogcatData, EventName::LogcatClosed]
        );
        assert!(parse_names(Some("logcat-data,spawn")).is_err());
    }
}
