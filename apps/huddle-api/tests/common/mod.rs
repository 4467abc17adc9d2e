#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use huddle_api::auth::identity::TrustedIdentity;
use huddle_api::config::Config;
use huddle_api::db::memory::MemoryChatStore;
use huddle_api::db::store::ChatStore;
use huddle_api::error::StoreError;
use huddle_api::models::message::ChatMessage;
use huddle_api::models::participant::ChatParticipant;
use huddle_api::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// In-memory store whose next insert can be made to fail.
#[derive(Default)]
pub struct TestStore {
    pub inner: MemoryChatStore,
    fail_next_insert: AtomicBool,
}

impl TestStore {
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatStore for TestStore {
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.insert_message(message).await
    }

    async fn list_participants(&self, chat_id: &str) -> Result<Vec<ChatParticipant>, StoreError> {
        self.inner.list_participants(chat_id).await
    }
}

pub fn test_config() -> Config {
    Config {
        auth_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

/// Build a test AppState over an in-memory store.
pub fn test_state(config: Config) -> (AppState, Arc<TestStore>) {
    let store = Arc::new(TestStore::default());
    let state = AppState::build(config, store.clone(), Arc::new(TrustedIdentity)).expect("state");
    (state, store)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the background.
pub async fn start_server(config: Config) -> (SocketAddr, AppState, Arc<TestStore>) {
    let (state, store) = test_state(config);
    let app = huddle_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, store)
}

pub async fn connect(addr: SocketAddr) -> WsStream {
    let url = format!("ws://{addr}/ws");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws
}

pub async fn send_json(ws: &mut WsStream, value: serde_json::Value) {
    ws.send(tungstenite::Message::Text(value.to_string().into()))
        .await
        .expect("ws send");
}

pub async fn send_message(ws: &mut WsStream, chat_id: &str, content: &str) {
    send_json(
        ws,
        serde_json::json!({
            "event": "message",
            "data": { "chatId": chat_id, "content": content }
        }),
    )
    .await;
}

/// Next non-control frame, or `None` if nothing arrives within `wait`.
pub async fn next_frame(ws: &mut WsStream, wait: Duration) -> Option<tungstenite::Message> {
    let deadline = time::Instant::now() + wait;
    loop {
        let msg = time::timeout_at(deadline, ws.next()).await.ok()??;
        match msg.expect("ws read error") {
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => return Some(other),
        }
    }
}

/// Next JSON event, failing the test after five seconds.
pub async fn next_event(ws: &mut WsStream) -> serde_json::Value {
    let msg = next_frame(ws, Duration::from_secs(5))
        .await
        .expect("timeout waiting for event");
    let text = msg.into_text().expect("not text");
    serde_json::from_str(&text).expect("parse event")
}

/// Assert that no event arrives within a short window.
pub async fn assert_silent(ws: &mut WsStream) {
    if let Some(msg) = next_frame(ws, Duration::from_millis(300)).await {
        panic!("expected no event, got: {msg:?}");
    }
}

/// Authenticate and wait for the acknowledgement. Returns the connection id.
pub async fn authenticate(ws: &mut WsStream, user_id: &str) -> String {
    send_json(
        ws,
        serde_json::json!({ "event": "authenticate", "data": { "userId": user_id } }),
    )
    .await;
    let ack = next_event(ws).await;
    assert_eq!(ack["event"], "authenticated", "unexpected event: {ack}");
    assert_eq!(ack["data"]["userId"], user_id);
    ack["data"]["connectionId"]
        .as_str()
        .expect("connectionId")
        .to_string()
}

/// Open a connection already authenticated as `user_id`.
pub async fn connect_as(addr: SocketAddr, user_id: &str) -> WsStream {
    let mut ws = connect(addr).await;
    authenticate(&mut ws, user_id).await;
    ws
}
