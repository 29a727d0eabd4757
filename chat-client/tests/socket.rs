//! `ChatSocket` against a local WebSocket server.

use chat_client::config::ReconnectPolicy;
use chat_client::transport::{handler, ChatSocket, ConnectionState, EventKind, TransportEvent};
use chat_client::{ChatError, ChatTransport};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use shared::dto::events::ServerEvent;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(5);

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

fn socket(url: &str, ack_timeout: Duration) -> ChatSocket {
    ChatSocket::with_options(
        url,
        ack_timeout,
        ReconnectPolicy {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            max_attempts: 0,
        },
    )
}

async fn wait_connected(socket: &ChatSocket) {
    let mut status = socket.watch_status();
    timeout(WAIT, status.wait_for(|s| s.state == ConnectionState::Connected))
        .await
        .expect("connection timed out")
        .unwrap();
}

/// Next text frame from the client, parsed
async fn next_frame(ws: &mut WebSocketStream<TcpStream>) -> Option<Value> {
    while let Some(Ok(frame)) = ws.next().await {
        if let WsMessage::Text(text) = frame {
            return Some(serde_json::from_str(&text).unwrap());
        }
    }
    None
}

async fn send(ws: &mut WebSocketStream<TcpStream>, value: Value) {
    ws.send(WsMessage::Text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_push_events_and_acks() {
    let (listener, url) = listen().await;
    let (auth_tx, mut auth_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let header = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let _ = auth_tx.send(header);
            Ok(resp)
        })
        .await
        .unwrap();

        send(
            &mut ws,
            json!({"event": "typing:start", "data": {"chat_id": "c1", "user_id": "u2"}}),
        )
        .await;

        while let Some(frame) = next_frame(&mut ws).await {
            if frame["event"] == "message:send" {
                send(
                    &mut ws,
                    json!({"event": "ack", "data": {
                        "ref": frame["ref"],
                        "ok": true,
                        "message": {
                            "id": "m1",
                            "sender_id": "me",
                            "content": frame["data"]["content"],
                            "timestamp": "2024-05-01T10:00:00Z"
                        }
                    }}),
                )
                .await;
            }
        }
    });

    let socket = socket(&url, Duration::from_secs(2));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    socket.on(
        EventKind::TypingStart,
        handler(move |event| {
            let _ = events_tx.send(event.clone());
        }),
    );

    socket.connect("secret-token").unwrap();
    socket.connect("secret-token").unwrap();
    wait_connected(&socket).await;

    assert_eq!(auth_rx.recv().await.unwrap().as_deref(), Some("Bearer secret-token"));

    let event = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
    match event {
        TransportEvent::Server(ServerEvent::TypingStart(signal)) => {
            assert_eq!(signal.chat_id, "c1");
            assert_eq!(signal.user_id, "u2");
        }
        other => panic!("unexpected event {other:?}"),
    }

    let ack = socket.send_message("c1", "hello").await.unwrap();
    assert!(ack.ok);
    assert_eq!(ack.message.unwrap().content, "hello");
    assert_eq!(socket.pending_acks(), 0);
    assert!(socket.status().messages_received >= 2);

    socket.disconnect();
    assert_eq!(socket.connection_state(), ConnectionState::Disconnected);
    server.abort();
}

#[tokio::test]
async fn test_missing_and_negative_acks() {
    let (listener, url) = listen().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(frame) = next_frame(&mut ws).await {
            // Joins are rejected, sends are never acknowledged
            if frame["event"] == "chat:join" {
                send(
                    &mut ws,
                    json!({"event": "ack", "data": {"ref": frame["ref"], "ok": false, "error": "not a participant"}}),
                )
                .await;
            }
        }
    });

    let socket = socket(&url, Duration::from_millis(200));
    socket.connect("tok").unwrap();
    wait_connected(&socket).await;

    match socket.join_chat("c9").await {
        Err(ChatError::Rejected(reason)) => assert_eq!(reason, "not a participant"),
        other => panic!("expected rejection, got {other:?}"),
    }

    match socket.send_message("c9", "anyone?").await {
        Err(ChatError::Timeout(command)) => assert_eq!(command, "message:send"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(socket.pending_acks(), 0);

    socket.disconnect();
    server.abort();
}

#[tokio::test]
async fn test_reconnect_rejoins_rooms() {
    let (listener, url) = listen().await;
    let (rejoin_tx, mut rejoin_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(async move {
        // First connection: acknowledge the join, then drop the client
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let join = next_frame(&mut ws).await.unwrap();
        send(&mut ws, json!({"event": "ack", "data": {"ref": join["ref"], "ok": true}})).await;
        ws.close(None).await.unwrap();
        drop(ws);

        // Second connection: the client re-joins on its own
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let frame = next_frame(&mut ws).await.unwrap();
        let _ = rejoin_tx.send(frame);
        while next_frame(&mut ws).await.is_some() {}
    });

    let socket = socket(&url, Duration::from_secs(2));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    socket.on(
        EventKind::Connection,
        handler(move |event| {
            let _ = events_tx.send(event.clone());
        }),
    );

    socket.connect("tok").unwrap();
    wait_connected(&socket).await;
    socket.join_chat("c1").await.unwrap();

    let frame = timeout(WAIT, rejoin_rx.recv()).await.unwrap().unwrap();
    assert_eq!(frame["event"], "chat:join");
    assert_eq!(frame["data"]["chat_id"], "c1");
    assert!(frame["ref"].is_string());

    let mut saw_reconnecting = false;
    loop {
        match timeout(WAIT, events_rx.recv()).await.unwrap().unwrap() {
            TransportEvent::Connection(ConnectionState::Reconnecting) => saw_reconnecting = true,
            TransportEvent::Reconnected => break,
            _ => {}
        }
    }
    assert!(saw_reconnecting);
    assert_eq!(socket.joined_rooms(), vec!["c1".to_string()]);

    socket.disconnect();
    server.abort();
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    // Bind then drop so nothing listens on the port
    let (listener, url) = listen().await;
    drop(listener);

    let socket = ChatSocket::with_options(
        url,
        Duration::from_millis(100),
        ReconnectPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            max_attempts: 2,
        },
    );
    socket.connect("tok").unwrap();

    let mut status = socket.watch_status();
    let failed = timeout(WAIT, status.wait_for(|s| s.state == ConnectionState::Failed))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert!(failed.last_error.is_some());
    assert!(matches!(socket.send_message("c1", "hi").await, Err(ChatError::Disconnected)));
}

#[tokio::test]
async fn test_rejected_token_fails_without_retry() {
    let (listener, url) = listen().await;

    let server = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = tokio_tungstenite::accept_hdr_async(stream, |_: &Request, _: Response| -> Result<Response, ErrorResponse> {
                let mut denied = ErrorResponse::new(Some("invalid token".to_string()));
                *denied.status_mut() = StatusCode::UNAUTHORIZED;
                Err(denied)
            })
            .await;
        }
    });

    let socket = socket(&url, Duration::from_secs(1));
    socket.connect("expired").unwrap();

    let mut status = socket.watch_status();
    let failed = timeout(WAIT, status.wait_for(|s| s.state == ConnectionState::Failed))
        .await
        .expect("socket never gave up")
        .unwrap()
        .clone();
    assert_eq!(failed.connection_attempts, 1);
    assert!(failed.last_error.is_some());

    // Still a single attempt once the backoff delay has passed
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(socket.status().connection_attempts, 1);
    assert_eq!(socket.connection_state(), ConnectionState::Failed);
    server.abort();
}
