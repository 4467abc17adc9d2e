//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::time;

use crate::error::ChatError;
use crate::AppState;

use super::events::{InboundEvent, OutboundEvent};

/// Close codes (4000-range for application-level).
const CLOSE_NOT_AUTHENTICATED: u16 = 4003;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let gateway = state.gateway.clone();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (mut connection, mut outbox) = gateway.on_accept();

    let auth_deadline = time::sleep(state.config.auth_timeout);
    tokio::pin!(auth_deadline);

    loop {
        tokio::select! {
            // Client sends us a frame. Each event is fully handled before the
            // next is read, which keeps one connection's sends in order.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match InboundEvent::parse(text.as_str()) {
                            Ok(event) => {
                                let _ = gateway.on_event(&mut connection, event).await;
                            }
                            Err(err) => gateway.reject(connection.id(), &err),
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        gateway.reject(
                            connection.id(),
                            &ChatError::invalid("binary frames are not supported"),
                        );
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %connection.id(), "ws read error");
                        break;
                    }
                }
            }

            // Event queued for this connection by the gateway or the fanout service.
            Some(event) = outbox.recv() => {
                if send_event(&mut ws_tx, &event).await.is_err() {
                    break;
                }
            }

            // Authentication deadline.
            _ = &mut auth_deadline, if !connection.is_authenticated() => {
                tracing::debug!(connection_id = %connection.id(), "authentication timeout");
                let _ = send_close(&mut ws_tx, CLOSE_NOT_AUTHENTICATED, "Authentication timeout").await;
                break;
            }
        }
    }

    gateway.on_disconnect(&mut connection);
}

async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &Arc<OutboundEvent>,
) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(json) => ws_tx.send(Message::Text(json.into())).await,
        Err(err) => {
            tracing::error!(?err, "failed to serialize outbound event");
            Ok(())
        }
    }
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
