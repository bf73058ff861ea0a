//! Gateway lifecycle against a local websocket server.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use melisa_api::{Gateway, GatewayConfig, GatewayMessage, Intents, MelisaError};
use serde_json::{json, Value};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{self, UnboundedReceiver},
    time::timeout,
};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    WebSocketStream,
};

type Server = WebSocketStream<TcpStream>;

async fn send_json(ws: &mut Server, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Next client payload with the given op, skipping heartbeats.
async fn expect_op(ws: &mut Server, op: u64) -> Value {
    while let Some(msg) = ws.next().await {
        if let Message::Text(text) = msg.unwrap() {
            let payload: Value = serde_json::from_str(text.as_str()).unwrap();
            if payload["op"] == op {
                return payload;
            }
            assert_eq!(payload["op"], 1, "unexpected payload: {payload}");
        }
    }
    panic!("connection ended before op {op}");
}

async fn hello(ws: &mut Server) {
    hello_every(ws, 45_000).await;
}

async fn hello_every(ws: &mut Server, heartbeat_interval: u64) {
    send_json(ws, json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval}})).await;
}

/// Code of the close frame the client sends, skipping heartbeats.
async fn expect_close(ws: &mut Server) -> u16 {
    while let Some(msg) = ws.next().await {
        match msg.unwrap() {
            Message::Close(Some(frame)) => return u16::from(frame.code),
            Message::Text(text) => {
                let payload: Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(payload["op"], 1, "unexpected payload: {payload}");
            }
            _ => {}
        }
    }
    panic!("connection ended without a close frame");
}

async fn ready(ws: &mut Server, url: &str) {
    send_json(
        ws,
        json!({
            "op": 0,
            "s": 1,
            "t": "READY",
            "d": {
                "v": 10,
                "session_id": "abc",
                "resume_gateway_url": url,
                "user": {"id": "1", "username": "melisa", "discriminator": "0001", "bot": true},
                "guilds": [{"id": "100", "unavailable": true}],
                "shard": [0, 1]
            }
        }),
    )
    .await;
}

async fn close_with(mut ws: Server, code: u16) {
    ws.close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: "bye".into(),
    }))
    .await
    .ok();
    while let Some(Ok(_)) = ws.next().await {}
}

async fn accept(listener: &TcpListener) -> Server {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

fn gateway(url: &str) -> (Gateway, UnboundedReceiver<GatewayMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let config = GatewayConfig {
        token: "secret".into(),
        intents: Intents::GUILDS | Intents::GUILD_MESSAGES,
        mobile: false,
        url: url.to_string(),
        presence: None,
    };
    (Gateway::new(0, 1, config, tx), rx)
}

async fn next_message(rx: &mut UnboundedReceiver<GatewayMessage>) -> GatewayMessage {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no gateway message in time")
        .expect("gateway channel closed")
}

#[tokio::test]
async fn identify_ready_then_fatal_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;

        let identify = expect_op(&mut ws, 2).await;
        assert_eq!(identify["d"]["token"], "secret");
        assert_eq!(identify["d"]["shard"], json!([0, 1]));
        assert_eq!(identify["d"]["intents"], json!(1 | (1 << 9)));
        assert_eq!(identify["d"]["compress"], false);

        ready(&mut ws, &server_url).await;
        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();

    match next_message(&mut rx).await {
        GatewayMessage::Dispatch { shard_id, name, data } => {
            assert_eq!(shard_id, 0);
            assert_eq!(name, "READY");
            assert_eq!(data["session_id"], "abc");
        }
        other => panic!("expected READY, got {other:?}"),
    }

    match next_message(&mut rx).await {
        GatewayMessage::Closed { shard_id, error } => {
            assert_eq!(shard_id, 0);
            assert!(matches!(error, Some(MelisaError::LoginFailure)));
        }
        other => panic!("expected Closed, got {other:?}"),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn reconnect_request_resumes_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;

        // Ask the client to reconnect; it closes this socket itself.
        send_json(&mut ws, json!({"op": 7, "d": null})).await;
        while let Some(Ok(_)) = ws.next().await {}

        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        let resume = expect_op(&mut ws, 6).await;
        assert_eq!(resume["d"]["token"], "secret");
        assert_eq!(resume["d"]["session_id"], "abc");
        assert_eq!(resume["d"]["seq"], 1);

        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();

    assert!(matches!(
        next_message(&mut rx).await,
        GatewayMessage::Dispatch { ref name, .. } if name == "READY"
    ));
    assert!(matches!(
        next_message(&mut rx).await,
        GatewayMessage::Closed {
            error: Some(MelisaError::LoginFailure),
            ..
        }
    ));

    server.await.unwrap();
}

#[tokio::test]
async fn requested_close_reports_no_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();
    assert!(matches!(
        next_message(&mut rx).await,
        GatewayMessage::Dispatch { .. }
    ));

    gateway.close().await.unwrap();
    assert!(matches!(
        next_message(&mut rx).await,
        GatewayMessage::Closed { error: None, .. }
    ));
    assert!(!gateway.session().await.can_resume());

    server.await.unwrap();
}

async fn expect_ready_then_login_failure(rx: &mut UnboundedReceiver<GatewayMessage>) {
    assert!(matches!(
        next_message(rx).await,
        GatewayMessage::Dispatch { ref name, .. } if name == "READY"
    ));
    assert!(matches!(
        next_message(rx).await,
        GatewayMessage::Closed {
            error: Some(MelisaError::LoginFailure),
            ..
        }
    ));
}

#[tokio::test]
async fn zombie_connection_closes_with_4000_and_resumes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        // Short interval and no acks.
        hello_every(&mut ws, 200).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;

        assert_eq!(expect_close(&mut ws).await, 4000);
        while let Some(Ok(_)) = ws.next().await {}

        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        let resume = expect_op(&mut ws, 6).await;
        assert_eq!(resume["d"]["session_id"], "abc");
        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();
    expect_ready_then_login_failure(&mut rx).await;

    server.await.unwrap();
}

#[tokio::test]
async fn resumable_invalid_session_resumes_in_place() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;

        send_json(&mut ws, json!({"op": 9, "d": true})).await;
        let resume = expect_op(&mut ws, 6).await;
        assert_eq!(resume["d"]["session_id"], "abc");
        assert_eq!(resume["d"]["seq"], 1);

        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();
    expect_ready_then_login_failure(&mut rx).await;

    server.await.unwrap();
}

#[tokio::test]
async fn invalid_session_drops_session_and_identifies_again() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;

        send_json(&mut ws, json!({"op": 9, "d": false})).await;
        let started = Instant::now();
        let identify = expect_op(&mut ws, 2).await;
        assert_eq!(identify["d"]["token"], "secret");
        assert!(started.elapsed() >= Duration::from_millis(900));

        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();
    expect_ready_then_login_failure(&mut rx).await;
    assert!(!gateway.session().await.can_resume());

    server.await.unwrap();
}

async fn reidentify_after_close(code: u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;
        close_with(ws, code).await;

        // Fresh session: identify, never resume.
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        let identify = expect_op(&mut ws, 2).await;
        assert_eq!(identify["d"]["shard"], json!([0, 1]));
        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();
    expect_ready_then_login_failure(&mut rx).await;
    assert!(!gateway.session().await.can_resume());

    server.await.unwrap();
}

#[tokio::test]
async fn close_4009_identifies_with_a_new_session() {
    reidentify_after_close(4009).await;
}

#[tokio::test]
async fn close_4007_identifies_with_a_new_session() {
    reidentify_after_close(4007).await;
}

#[tokio::test]
async fn lost_transport_reconnects_after_backoff_and_resumes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server_url = url.clone();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        hello(&mut ws).await;
        expect_op(&mut ws, 2).await;
        ready(&mut ws, &server_url).await;

        // Drop the socket without a close frame.
        drop(ws);
        let dropped = Instant::now();

        let mut ws = accept(&listener).await;
        assert!(dropped.elapsed() >= Duration::from_millis(900));
        hello(&mut ws).await;
        let resume = expect_op(&mut ws, 6).await;
        assert_eq!(resume["d"]["session_id"], "abc");
        close_with(ws, 4004).await;
    });

    let (gateway, mut rx) = gateway(&url);
    gateway.launch().await.unwrap();
    expect_ready_then_login_failure(&mut rx).await;

    server.await.unwrap();
}
