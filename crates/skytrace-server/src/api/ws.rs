//! WebSocket streaming of tracker snapshots.
//!
//! Each connection is one tracker subscriber. The callback only enqueues;
//! GeoJSON rendering and socket writes happen on the connection task.
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use serde_json::json;
use skytrace_core::{PathCollection, Snapshot};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::state::AppState;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::channel::<(Arc<Snapshot>, Arc<PathCollection>)>(state.stream_buffer);

    // Held for the life of the connection; dropping it unsubscribes.
    let _subscription = state.tracker.subscribe(move |snapshot, paths| {
        match tx.try_send((snapshot, paths)) {
            Ok(()) => {}
            // Drop the update; a newer snapshot will arrive soon.
            Err(TrySendError::Full(_)) => tracing::debug!("Stream client lagging; update dropped"),
            Err(TrySendError::Closed(_)) => {}
        }
        Ok(())
    });

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            update = rx.recv() => {
                let Some((snapshot, paths)) = update else {
                    break;
                };
                let payload = json!({
                    "type": "snapshot",
                    "flights": snapshot.to_geojson(),
                    "paths": paths.to_geojson(),
                });
                if socket.send(Message::Text(payload.to_string())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Stream client disconnected");
}
