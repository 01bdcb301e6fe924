use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

/// GET /events
///
/// Each accepted report is one `new_data` event carrying the raw payload
/// JSON. Late subscribers start from the next publish; a lagged subscriber is
/// told to resync rather than fed a backlog.
pub async fn telemetry_sse(
    State(state): State<AppState>,
) -> Sse<impl futures_util::stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bus.subscribe();
    let updates = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(json) => Some(Ok(Event::default().event("new_data").data(json))),
            Err(_) => None,
        },
        Err(_) => Some(Ok(Event::default().event("resync").data("{}"))),
    });
    let initial = tokio_stream::once(Ok(Event::default().event("connected").data("{}")));
    let stream = initial.chain(updates);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
