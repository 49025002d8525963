use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::trace::TraceLayer;

use crate::battle::Battle;
use crate::engine::RaidEngine;

pub mod api;
pub mod routes;

pub fn run_server(bind_addr: &str, engine: Arc<RaidEngine>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!(bind_addr, "server listening");
        println!("bossraid server listening on http://{bind_addr}");
        axum::serve(listener, router(engine)).await
    })
}

/// Every route goes through [`routes::route_request`] except the per-battle event stream.
pub fn router(engine: Arc<RaidEngine>) -> Router {
    Router::new()
        .route("/api/battles/:id/events", get(battle_events))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn dispatch(
    State(engine): State<Arc<RaidEngine>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let body = String::from_utf8_lossy(&body).into_owned();
    // Transactions may sleep between retries.
    let response = tokio::task::spawn_blocking(move || {
        routes::route_request(&engine, method.as_str(), &path, &body)
    })
    .await;
    match response {
        Ok(response) => into_axum(response),
        Err(err) => into_axum(routes::error_response(
            500,
            &err.to_string(),
        )),
    }
}

async fn battle_events(State(engine): State<Arc<RaidEngine>>, Path(id): Path<String>) -> Response {
    match engine.get_battle(&id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return into_axum(routes::error_response(
                404,
                &format!("Battle '{id}' not found"),
            ))
        }
        Err(err) => {
            return into_axum(routes::error_response(
                500,
                &err.to_string(),
            ))
        }
    }

    let (tx, rx) = mpsc::unbounded_channel::<Battle>();
    let subscription = engine.subscribe(&id, move |battle| {
        let _ = tx.send(battle.clone());
    });
    tracing::debug!(battle_id = %id, "event stream opened");

    // The subscription lives as long as the stream; a client disconnect drops both.
    let stream = UnboundedReceiverStream::new(rx).map(move |battle| {
        let _subscription = &subscription;
        Event::default()
            .event("battle")
            .id(battle.version.to_string())
            .json_data(&battle)
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn into_axum(response: routes::HttpResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}
