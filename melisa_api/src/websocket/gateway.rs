//! A single Discord gateway connection.
//!
//! The gateway owns the socket, the heartbeat and the session. Dispatches are
//! forwarded untouched over a channel as [`GatewayMessage::Dispatch`]; turning
//! them into models and events is the client's job.

use std::fmt::{self, Debug, Formatter};
use std::{sync::Arc, time::Duration};

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use rand::Rng;
use serde_json::Value;
use tokio::{
    net::TcpStream,
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        Mutex,
    },
    task::JoinHandle,
    time::{sleep, timeout, Instant},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::{
    error::MelisaError,
    json,
    types::{
        guild::LARGE_THRESHOLD,
        intents::Intents,
        presence::{Activity, StatusType, UpdatePresence},
        snowflake::Snowflake,
        websocket::{
            ClientToServerEvent, GatewayPayload, Hello, Identify, IdentifyProperties, OpCode,
            RequestGuildMembers, Resume,
        },
    },
    websocket::compression::ZlibInflater,
};

pub const GATEWAY_VERSION: u8 = 10;
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

const MAX_RETRIES: u32 = 10;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Connection state for the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Reconnecting,
}

/// What a gateway reports to whoever drives it.
#[derive(Debug)]
pub enum GatewayMessage {
    Dispatch {
        shard_id: u32,
        name: String,
        data: Value,
    },
    /// The gateway stopped and will not reconnect on its own. `error` is
    /// `None` when the stop was requested.
    Closed {
        shard_id: u32,
        error: Option<MelisaError>,
    },
}

/// How a connection ended.
#[derive(Debug)]
enum Next {
    /// Reconnect right away and resume.
    Resume,
    /// Drop the session, reconnect and identify.
    Reidentify,
    /// Reconnect with backoff, resuming when possible.
    Lost,
    Stop,
    Fatal(MelisaError),
}

/// Build the connection url for a gateway base such as `wss://gateway.discord.gg`.
pub fn gateway_url(base: &str) -> String {
    format!(
        "{}/?v={GATEWAY_VERSION}&encoding=json&compress=zlib-stream",
        base.trim_end_matches('/')
    )
}

/// Everything needed to identify, shared by the shards of a client.
#[derive(Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub intents: Intents,
    pub mobile: bool,
    /// Gateway base url, without query.
    pub url: String,
    pub presence: Option<UpdatePresence>,
}

impl Debug for GatewayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("mobile", &self.mobile)
            .field("url", &self.url)
            .field("presence", &self.presence)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub session_id: Option<String>,
    pub resume_url: Option<String>,
    pub sequence: Option<u64>,
}

impl Session {
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.sequence.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
struct HeartbeatState {
    acked: bool,
    last_sent: Option<Instant>,
    latency: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Gateway {
    /* ───────────────────────── Public configuration ───────────────────────── */
    pub shard_id: u32,
    pub num_shards: u32,

    /* ───────────────────────── Internal plumbing ──────────────────────────── */
    config: Arc<GatewayConfig>,
    presence: Arc<Mutex<Option<UpdatePresence>>>,
    session: Arc<Mutex<Session>>,
    heartbeat: Arc<Mutex<HeartbeatState>>,
    ws_tx: Arc<Mutex<Option<WsWriter>>>,
    control: Arc<Mutex<Option<UnboundedSender<Next>>>>,
    runner: Arc<Mutex<Option<JoinHandle<()>>>>,
    connection_state: Arc<Mutex<ConnectionState>>,
    events: UnboundedSender<GatewayMessage>,
}

impl Debug for Gateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("shard_id", &self.shard_id)
            .field("num_shards", &self.num_shards)
            .field("config", &self.config)
            .field("session", &self.session)
            .field("connection_state", &self.connection_state)
            .finish()
    }
}

impl Gateway {
    pub fn new(
        shard_id: u32,
        num_shards: u32,
        config: GatewayConfig,
        events: UnboundedSender<GatewayMessage>,
    ) -> Self {
        let presence = config.presence.clone();
        Self {
            shard_id,
            num_shards,
            config: Arc::new(config),
            presence: Arc::new(Mutex::new(presence)),
            session: Arc::new(Mutex::new(Session::default())),
            heartbeat: Arc::new(Mutex::new(HeartbeatState::default())),
            ws_tx: Arc::new(Mutex::new(None)),
            control: Arc::new(Mutex::new(None)),
            runner: Arc::new(Mutex::new(None)),
            connection_state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            events,
        }
    }

    /* ───────────────────────────── Public API ───────────────────────────── */

    /// Open the socket and spawn the read loop. Identify (or resume) follows
    /// the server's HELLO.
    pub async fn launch(&self) -> Result<(), MelisaError> {
        if self.ws_tx.lock().await.is_some() {
            return Err(MelisaError::Other(format!(
                "Shard {} is already running",
                self.shard_id
            )));
        }

        *self.connection_state.lock().await = ConnectionState::Connecting;

        match self.connect().await {
            Ok((read, control)) => {
                let gateway = self.clone();
                let handle = tokio::spawn(async move { gateway.run(read, control).await });
                *self.runner.lock().await = Some(handle);
                Ok(())
            }
            Err(e) => {
                *self.connection_state.lock().await = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Close with 1000, which also invalidates the session on Discord's side.
    pub async fn close(&self) -> Result<(), MelisaError> {
        self.shutdown(1000, "Closing").await?;
        self.session.lock().await.clear();
        Ok(())
    }

    /// Stop the connection but keep the session so the next launch resumes.
    pub async fn shutdown(&self, code: u16, reason: &str) -> Result<(), MelisaError> {
        *self.connection_state.lock().await = ConnectionState::Closing;

        let sent = self.close_ws(code, reason).await;
        self.signal(Next::Stop).await;

        let handle = self.runner.lock().await.take();
        if let Some(mut handle) = handle {
            if timeout(Duration::from_secs(5), &mut handle).await.is_err() {
                warn!(shard_id = self.shard_id, "read loop did not stop, aborting it");
                handle.abort();
            }
        }

        self.stop_heartbeat().await;
        *self.connection_state.lock().await = ConnectionState::Disconnected;
        sent
    }

    pub async fn update_presence(
        &self,
        activity: Option<Activity>,
        status: Option<StatusType>,
    ) -> Result<(), MelisaError> {
        let presence = UpdatePresence::new(activity, status);
        *self.presence.lock().await = Some(presence.clone());
        debug!(shard_id = self.shard_id, "updating presence");
        self.send(ClientToServerEvent::PresenceUpdate(presence))
            .await
    }

    /// Ask for GUILD_MEMBERS_CHUNK dispatches. `limit` 0 means all members
    /// matching `query`.
    pub async fn request_guild_members(
        &self,
        guild_id: Snowflake,
        query: Option<&str>,
        limit: u32,
    ) -> Result<(), MelisaError> {
        self.send(ClientToServerEvent::RequestGuildMembers(
            RequestGuildMembers {
                guild_id,
                query: Some(query.unwrap_or_default().to_string()),
                limit,
                presences: None,
                user_ids: None,
                nonce: None,
            },
        ))
        .await
    }

    /// Time between the last heartbeat and its ack.
    pub async fn latency(&self) -> Option<Duration> {
        self.heartbeat.lock().await.latency
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.lock().await
    }

    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    /* ────────────────────────── Socket setup ────────────────────────── */

    async fn connect(&self) -> Result<(WsReader, UnboundedReceiver<Next>), MelisaError> {
        let base = {
            let session = self.session.lock().await;
            match (&session.session_id, &session.resume_url) {
                (Some(_), Some(resume_url)) => resume_url.clone(),
                _ => self.config.url.clone(),
            }
        };

        let url = Url::parse(&gateway_url(&base))
            .map_err(|e| MelisaError::InvalidArgument(format!("Invalid gateway URL: {e}")))?;

        debug!(shard_id = self.shard_id, %url, "connecting to gateway");
        let (stream, _) = connect_async(url.as_str()).await?;
        let (write, read) = stream.split();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *self.ws_tx.lock().await = Some(write);
        *self.control.lock().await = Some(control_tx);
        *self.connection_state.lock().await = ConnectionState::Connected;

        Ok((read, control_rx))
    }

    /// Read loop plus reconnect handling, until the gateway stops for good.
    async fn run(self, mut read: WsReader, mut control: UnboundedReceiver<Next>) {
        loop {
            let mut next = self.read_loop(&mut read, &mut control).await;

            self.stop_heartbeat().await;
            *self.ws_tx.lock().await = None;
            *self.control.lock().await = None;

            if *self.connection_state.lock().await == ConnectionState::Closing {
                next = Next::Stop;
            }

            let first_wait = match next {
                Next::Stop => {
                    info!(shard_id = self.shard_id, "shard closed");
                    self.finish(None).await;
                    return;
                }
                Next::Fatal(e) => {
                    error!(shard_id = self.shard_id, error = %e, "shard closed with a fatal error");
                    self.finish(Some(e)).await;
                    return;
                }
                Next::Reidentify => {
                    self.session.lock().await.clear();
                    Duration::ZERO
                }
                Next::Resume => Duration::ZERO,
                Next::Lost => Duration::from_secs(1),
            };

            match self.reconnect(first_wait).await {
                Ok(Some((new_read, new_control))) => {
                    read = new_read;
                    control = new_control;
                }
                Ok(None) => {
                    info!(shard_id = self.shard_id, "shard closed while reconnecting");
                    self.finish(None).await;
                    return;
                }
                Err(e) => {
                    error!(
                        shard_id = self.shard_id,
                        error = %e,
                        "maximum reconnection attempts reached, giving up"
                    );
                    self.finish(Some(e)).await;
                    return;
                }
            }
        }
    }

    async fn finish(&self, error: Option<MelisaError>) {
        *self.connection_state.lock().await = ConnectionState::Disconnected;
        let _ = self.events.send(GatewayMessage::Closed {
            shard_id: self.shard_id,
            error,
        });
    }

    /// Exponential backoff: 1s doubling up to 60s, at most 10 failures in a row.
    async fn reconnect(
        &self,
        first_wait: Duration,
    ) -> Result<Option<(WsReader, UnboundedReceiver<Next>)>, MelisaError> {
        let mut retry_count = 0;
        let mut retry_delay = Duration::from_secs(1);
        let mut wait = first_wait;

        loop {
            if *self.connection_state.lock().await == ConnectionState::Closing {
                return Ok(None);
            }
            *self.connection_state.lock().await = ConnectionState::Reconnecting;

            if !wait.is_zero() {
                info!(
                    shard_id = self.shard_id,
                    attempt = retry_count + 1,
                    max = MAX_RETRIES,
                    ?wait,
                    "connection lost, reconnecting"
                );
                sleep(wait).await;
            }

            match self.connect().await {
                Ok(pair) => {
                    info!(shard_id = self.shard_id, "reconnected to the gateway");
                    return Ok(Some(pair));
                }
                Err(e) => {
                    warn!(shard_id = self.shard_id, error = %e, "reconnection attempt failed");
                    retry_count += 1;
                    if retry_count >= MAX_RETRIES {
                        return Err(e);
                    }
                    retry_delay = std::cmp::min(retry_delay * 2, MAX_BACKOFF);
                    wait = retry_delay;
                }
            }
        }
    }

    /* ──────────────────────────── Read loop ──────────────────────────── */

    async fn read_loop(&self, read: &mut WsReader, control: &mut UnboundedReceiver<Next>) -> Next {
        let mut inflater = ZlibInflater::new();

        loop {
            tokio::select! {
                next = control.recv() => return next.unwrap_or(Next::Stop),
                frame = read.next() => {
                    let Some(frame) = frame else {
                        debug!(shard_id = self.shard_id, "gateway stream ended");
                        return Next::Lost;
                    };
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(shard_id = self.shard_id, error = %e, "error reading gateway frame");
                            return Next::Lost;
                        }
                    };

                    let text = match frame {
                        WsMessage::Text(text) => text.as_str().to_owned(),
                        WsMessage::Binary(bytes) => match inflater.push(&bytes) {
                            Ok(Some(text)) => text,
                            Ok(None) => continue,
                            Err(e) => {
                                warn!(shard_id = self.shard_id, error = %e, "failed to inflate frame");
                                return Next::Lost;
                            }
                        },
                        WsMessage::Close(frame) => return self.on_close(frame),
                        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
                    };

                    let payload = match json::from_str::<GatewayPayload>(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(shard_id = self.shard_id, error = %e, "failed to deserialize gateway payload");
                            continue;
                        }
                    };

                    if let Some(next) = self.handle_payload(payload).await {
                        return next;
                    }
                }
            }
        }
    }

    fn on_close(&self, frame: Option<CloseFrame>) -> Next {
        let Some(frame) = frame else {
            return Next::Lost;
        };
        let code = u16::from(frame.code);
        info!(
            shard_id = self.shard_id,
            code,
            reason = frame.reason.as_str(),
            "gateway closed the connection"
        );

        if let Some(err) = MelisaError::from_close_code(self.shard_id, code) {
            return Next::Fatal(err);
        }
        match code {
            4007 | 4009 => Next::Reidentify,
            _ => Next::Lost,
        }
    }

    async fn handle_payload(&self, payload: GatewayPayload) -> Option<Next> {
        trace!(shard_id = self.shard_id, op = ?payload.op, "received payload");

        let result = match payload.op {
            OpCode::Dispatch => {
                self.handle_dispatch(payload).await;
                Ok(())
            }
            OpCode::Heartbeat => self.send_heartbeat().await,
            OpCode::Reconnect => {
                info!(shard_id = self.shard_id, "gateway requested a reconnect");
                let _ = self.close_ws(4900, "Reconnect requested").await;
                return Some(Next::Resume);
            }
            OpCode::InvalidSession => {
                if payload.d.as_bool().unwrap_or(false) {
                    debug!(shard_id = self.shard_id, "invalid session, resuming");
                    self.send_resume().await
                } else {
                    self.session.lock().await.clear();
                    let secs = rand::rng().random_range(1..=5);
                    debug!(shard_id = self.shard_id, secs, "invalid session, identifying again");
                    sleep(Duration::from_secs(secs)).await;
                    self.send_identify().await
                }
            }
            OpCode::Hello => match serde_json::from_value::<Hello>(payload.d) {
                Ok(hello) => {
                    self.start_heartbeat(Duration::from_millis(hello.heartbeat_interval))
                        .await;
                    if self.session.lock().await.can_resume() {
                        self.send_resume().await
                    } else {
                        self.send_identify().await
                    }
                }
                Err(e) => Err(e.into()),
            },
            OpCode::HeartbeatAck => {
                let mut heartbeat = self.heartbeat.lock().await;
                heartbeat.acked = true;
                heartbeat.latency = heartbeat.last_sent.map(|sent| sent.elapsed());
                trace!(shard_id = self.shard_id, latency = ?heartbeat.latency, "heartbeat acked");
                Ok(())
            }
            other => {
                debug!(shard_id = self.shard_id, op = ?other, "ignoring opcode");
                Ok(())
            }
        };

        match result {
            Ok(()) => None,
            Err(e) => {
                warn!(shard_id = self.shard_id, error = %e, "failed to answer the gateway");
                Some(Next::Lost)
            }
        }
    }

    async fn handle_dispatch(&self, payload: GatewayPayload) {
        {
            let mut session = self.session.lock().await;
            if let Some(seq) = payload.s {
                session.sequence = Some(seq);
            }

            match payload.t.as_deref() {
                Some("READY") => {
                    session.session_id = payload
                        .d
                        .get("session_id")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    session.resume_url = payload
                        .d
                        .get("resume_gateway_url")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    info!(shard_id = self.shard_id, "shard is ready");
                }
                Some("RESUMED") => info!(shard_id = self.shard_id, "session resumed"),
                _ => {}
            }
        }

        let Some(name) = payload.t else {
            return;
        };
        debug!(shard_id = self.shard_id, event = %name, "dispatch");
        let _ = self.events.send(GatewayMessage::Dispatch {
            shard_id: self.shard_id,
            name,
            data: payload.d,
        });
    }

    /* ──────────────────────────── Heartbeat ──────────────────────────── */

    async fn start_heartbeat(&self, interval: Duration) {
        let mut heartbeat = self.heartbeat.lock().await;
        if let Some(task) = heartbeat.task.take() {
            task.abort();
        }
        heartbeat.acked = true;
        heartbeat.last_sent = None;

        let gateway = self.clone();
        heartbeat.task = Some(tokio::spawn(async move {
            gateway.heartbeat_loop(interval).await
        }));
    }

    async fn stop_heartbeat(&self) {
        if let Some(task) = self.heartbeat.lock().await.task.take() {
            task.abort();
        }
    }

    async fn heartbeat_loop(&self, interval: Duration) {
        let jitter = rand::random::<f64>();
        sleep(interval.mul_f64(jitter)).await;

        loop {
            let acked = self.heartbeat.lock().await.acked;
            if !acked {
                warn!(shard_id = self.shard_id, "heartbeat ack not received, reconnecting");
                let _ = self.close_ws(4000, "Zombied connection").await;
                self.signal(Next::Resume).await;
                return;
            }

            if let Err(e) = self.send_heartbeat().await {
                warn!(shard_id = self.shard_id, error = %e, "heartbeat failed");
                self.signal(Next::Lost).await;
                return;
            }

            sleep(interval).await;
        }
    }

    async fn send_heartbeat(&self) -> Result<(), MelisaError> {
        let seq = self.session.lock().await.sequence;
        self.send(ClientToServerEvent::Heartbeat(seq)).await?;

        let mut heartbeat = self.heartbeat.lock().await;
        heartbeat.acked = false;
        heartbeat.last_sent = Some(Instant::now());
        Ok(())
    }

    /* ───────────────────────────── Sending ───────────────────────────── */

    async fn send_identify(&self) -> Result<(), MelisaError> {
        let identify = Identify {
            token: self.config.token.clone(),
            intents: self.config.intents,
            properties: IdentifyProperties::new(self.config.mobile),
            compress: false,
            large_threshold: LARGE_THRESHOLD,
            shard: [self.shard_id, self.num_shards],
            presence: self.presence.lock().await.clone(),
        };
        info!(shard_id = self.shard_id, num_shards = self.num_shards, "identifying");
        self.send(ClientToServerEvent::Identify(identify)).await
    }

    async fn send_resume(&self) -> Result<(), MelisaError> {
        let session = self.session.lock().await.clone();
        let Some(session_id) = session.session_id else {
            return self.send_identify().await;
        };
        info!(shard_id = self.shard_id, seq = ?session.sequence, "resuming session");
        self.send(ClientToServerEvent::Resume(Resume {
            token: self.config.token.clone(),
            session_id,
            seq: session.sequence,
        }))
        .await
    }

    async fn send(&self, event: ClientToServerEvent) -> Result<(), MelisaError> {
        let text = json::to_string(&event.to_payload()?)?;

        let mut guard = self.ws_tx.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(MelisaError::Other(format!(
                "Shard {} is not connected",
                self.shard_id
            )));
        };

        trace!(shard_id = self.shard_id, op = ?event.op(), "sending payload");
        writer.send(WsMessage::Text(text.into())).await?;
        Ok(())
    }

    async fn close_ws(&self, code: u16, reason: &str) -> Result<(), MelisaError> {
        let mut guard = self.ws_tx.lock().await;
        if let Some(writer) = guard.as_mut() {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            };
            writer.send(WsMessage::Close(Some(frame))).await?;
        }
        *guard = None;
        Ok(())
    }

    async fn signal(&self, next: Next) {
        if let Some(control) = self.control.lock().await.as_ref() {
            let _ = control.send(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_has_version_and_compression() {
        assert_eq!(
            gateway_url("wss://gateway.discord.gg/"),
            "wss://gateway.discord.gg/?v=10&encoding=json&compress=zlib-stream"
        );
    }

    #[test]
    fn resume_needs_session_and_sequence() {
        let mut session = Session {
            session_id: Some("abc".into()),
            resume_url: None,
            sequence: None,
        };
        assert!(!session.can_resume());
        session.sequence = Some(3);
        assert!(session.can_resume());
        session.clear();
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn send_without_socket_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let gateway = Gateway::new(
            0,
            1,
            GatewayConfig {
                token: "t".into(),
                intents: Intents::default(),
                mobile: false,
                url: DEFAULT_GATEWAY_URL.into(),
                presence: None,
            },
            tx,
        );
        assert!(gateway.update_presence(None, None).await.is_err());
        assert_eq!(gateway.connection_state().await, ConnectionState::Disconnected);
        assert!(gateway.latency().await.is_none());
    }

    #[test]
    fn close_codes() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let gateway = Gateway::new(
            2,
            4,
            GatewayConfig {
                token: "t".into(),
                intents: Intents::default(),
                mobile: false,
                url: DEFAULT_GATEWAY_URL.into(),
                presence: None,
            },
            tx,
        );
        let frame = |code: u16| {
            Some(CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            })
        };

        assert!(matches!(
            gateway.on_close(frame(4014)),
            Next::Fatal(MelisaError::PrivilegedIntentsRequired { shard_id: 2 })
        ));
        assert!(matches!(gateway.on_close(frame(4009)), Next::Reidentify));
        assert!(matches!(gateway.on_close(frame(4000)), Next::Lost));
        assert!(matches!(gateway.on_close(None), Next::Lost));
    }
}
