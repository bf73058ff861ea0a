//! REST client against a throwaway local HTTP server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use melisa_api::{HttpClient, MelisaError, MessagesApi, RestApp, Snowflake, UsersApi};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Mutex,
};

const USER: &str = r#"{"id":"1","username":"melisa","discriminator":"0001"}"#;

type Requests = Arc<Mutex<Vec<String>>>;

/// Answer one connection per canned response, in order, and record each raw request.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::default();

    let seen = requests.clone();
    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            seen.lock().await.push(request);

            let response = format!(
                "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    (format!("http://{addr}"), requests)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_ascii_lowercase()
}

fn rest(base: &str, max_ttl: u32) -> RestApp {
    RestApp::from_http(
        HttpClient::with_base_url("secret", base)
            .unwrap()
            .with_max_ttl(max_ttl),
    )
}

#[tokio::test]
async fn retries_server_errors() {
    let (base, requests) = serve(vec![(502, "{}"), (200, USER)]).await;

    let user = rest(&base, 2).fetch_user(Snowflake::from(1)).await.unwrap();
    assert_eq!(user.username, "melisa");

    let requests = requests.lock().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("get /users/1 "));
    assert!(requests[0].contains("authorization: bot secret"));
    assert!(requests[0].contains("user-agent: discordbot ("));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (base, requests) = serve(vec![(404, r#"{"message":"Unknown User","code":10013}"#)]).await;

    let err = rest(&base, 3)
        .fetch_user(Snowflake::from(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MelisaError::NotFound(_)));
    assert_eq!(requests.lock().await.len(), 1);
}

#[tokio::test]
async fn gives_up_when_ttl_is_spent() {
    let (base, requests) = serve(vec![(500, "{}"), (500, "{}"), (500, "{}")]).await;

    // The last failure returns at once instead of sleeping out a backoff.
    let started = Instant::now();
    let err = rest(&base, 2)
        .fetch_user(Snowflake::from(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MelisaError::Server(_)));
    assert_eq!(requests.lock().await.len(), 2);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn waits_out_a_rate_limit() {
    let (base, requests) = serve(vec![
        (429, r#"{"retry_after":0.05,"global":false,"message":"You are being rate limited."}"#),
        (200, USER),
    ])
    .await;

    let user = rest(&base, 1).fetch_user(Snowflake::from(1)).await.unwrap();
    assert_eq!(user.id, Snowflake::from(1));
    assert_eq!(requests.lock().await.len(), 2);
}

#[tokio::test]
async fn audit_log_reason_is_sent() {
    let (base, requests) = serve(vec![(204, "")]).await;

    rest(&base, 1)
        .delete_message(Snowflake::from(10), Snowflake::from(20), Some("cleanup"))
        .await
        .unwrap();

    let requests = requests.lock().await;
    assert!(requests[0].starts_with("delete /channels/10/messages/20 "));
    assert!(requests[0].contains("x-audit-log-reason: cleanup"));
}
