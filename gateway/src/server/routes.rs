use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::{Stream, StreamExt, stream::BoxStream};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use weather_gateway_core::{Dispatcher, OperationRequest, OutgoingEvent};

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/mcp", post(mcp_stream))
        .route("/health", get(health))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Every body, even an undecodable one, gets a well-formed event stream
/// ending in exactly one terminal event.
async fn mcp_stream(
    State(dispatcher): State<Dispatcher>,
    body: Bytes,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events: BoxStream<'static, OutgoingEvent> = match OperationRequest::from_slice(&body) {
        Ok(request) => dispatcher.handle(request).boxed(),
        Err((id, err)) => Dispatcher::reject(id, err).boxed(),
    };

    Sse::new(events.map(|event| {
        if event.is_terminal() {
            tracing::debug!(id = %event.id(), "closing event stream");
        }
        Event::default().json_data(event)
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn fallback(uri: Uri) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("No route found for {uri}"))
}
