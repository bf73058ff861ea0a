//! The Discord client: REST, cache, shards and event dispatch in one handle.

use std::fmt::{self, Debug, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures::FutureExt;
use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver},
        Mutex,
    },
    time::sleep,
};
use tracing::{debug, error, info, warn};

use crate::{
    api::{channels::ChannelsApi, gateway::GatewayApi, guilds::GuildsApi, users::UsersApi},
    cache::CacheManager,
    client::{
        http::{HttpClient, DEFAULT_API_BASE, DEFAULT_MAX_TTL},
        rest::RestApp,
    },
    error::MelisaError,
    logging::{init_logging, LogLevel},
    types::{
        channel::Channel,
        guild::Guild,
        intents::Intents,
        presence::{Activity, StatusType, UpdatePresence},
        snowflake::Snowflake,
        user::User,
    },
    websocket::{
        event_handler::{call_listener, Event, EventHandler},
        gateway::{GatewayConfig, GatewayMessage, DEFAULT_GATEWAY_URL},
        listeners,
        shard::{launch_buckets, Shard, ShardManager},
        waiters::Waiters,
    },
};

/// Pause between launch buckets in [`Client::run_autosharded`].
const BUCKET_PAUSE: Duration = Duration::from_secs(5);

/// Main client to interact with Discord.
#[derive(Clone)]
pub struct Client {
    /* ───────────────────────── Public configuration ───────────────────────── */
    pub intents: Intents,
    pub mobile: bool,
    pub gateway_url: String,

    /* ───────────────────────── Internal plumbing ──────────────────────────── */
    token: Arc<str>,
    rest: RestApp,
    cache: CacheManager,
    presence: Arc<Mutex<Option<UpdatePresence>>>,
    shards: Arc<Mutex<ShardManager>>,
    event_handler: Arc<Mutex<Option<Arc<dyn EventHandler>>>>,
    waiters: Waiters,
    user: Arc<Mutex<Option<User>>>,
    guilds_announced: Arc<AtomicBool>,
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("intents", &self.intents)
            .field("mobile", &self.mobile)
            .field("gateway_url", &self.gateway_url)
            .field("token", &"<redacted>")
            .field("rest", &self.rest)
            .field("cache", &self.cache)
            .field("event_handler", &"Arc<Mutex<Option<Arc<dyn EventHandler>>>>")
            .field("waiters", &self.waiters)
            .finish()
    }
}

/// Configures a [`Client`]. Obtained from [`Client::builder`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    token: String,
    intents: Intents,
    activity: Option<Activity>,
    status: Option<StatusType>,
    mobile: bool,
    cache: Option<CacheManager>,
    logs: Option<LogLevel>,
    api_base: String,
    gateway_url: String,
    max_retries: u32,
}

impl ClientBuilder {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            intents: Intents::default(),
            activity: None,
            status: None,
            mobile: false,
            cache: None,
            logs: Some(LogLevel::Info),
            api_base: DEFAULT_API_BASE.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            max_retries: DEFAULT_MAX_TTL,
        }
    }

    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    pub fn activity(mut self, activity: Activity) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn status(mut self, status: StatusType) -> Self {
        self.status = Some(status);
        self
    }

    /// Identify as the mobile client (shows the phone status icon).
    pub fn mobile(mut self, mobile: bool) -> Self {
        self.mobile = mobile;
        self
    }

    pub fn cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Log level of the subscriber installed by [`build`](Self::build).
    /// `None` leaves logging to the application.
    pub fn logs(mut self, level: Option<LogLevel>) -> Self {
        self.logs = level;
        self
    }

    pub fn api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    pub fn gateway_url(mut self, gateway_url: &str) -> Self {
        self.gateway_url = gateway_url.to_string();
        self
    }

    /// Attempts per REST request, counting the first.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Result<Client, MelisaError> {
        init_logging(self.logs);

        let http = HttpClient::with_base_url(&self.token, &self.api_base)?
            .with_max_ttl(self.max_retries);

        let presence = (self.activity.is_some() || self.status.is_some())
            .then(|| UpdatePresence::new(self.activity, self.status));

        Ok(Client {
            intents: self.intents,
            mobile: self.mobile,
            gateway_url: self.gateway_url,
            token: Arc::from(self.token),
            rest: RestApp::from_http(http),
            cache: self.cache.unwrap_or_default(),
            presence: Arc::new(Mutex::new(presence)),
            shards: Arc::new(Mutex::new(ShardManager::new())),
            event_handler: Arc::new(Mutex::new(None)),
            waiters: Waiters::new(),
            user: Arc::new(Mutex::new(None)),
            guilds_announced: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Client {
    pub fn builder(token: &str) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// A client with default settings and the given intents.
    pub fn new(token: &str, intents: Intents) -> Result<Self, MelisaError> {
        Self::builder(token).intents(intents).build()
    }

    /* ───────────────────────────── Accessors ───────────────────────────── */

    pub fn rest(&self) -> &RestApp {
        &self.rest
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// The bot user, known once a shard is READY.
    pub async fn user(&self) -> Option<User> {
        self.user.lock().await.clone()
    }

    pub(crate) async fn set_current_user(&self, user: User) {
        *self.user.lock().await = Some(user);
    }

    /// True the first time it is called.
    pub(crate) fn mark_guilds_announced(&self) -> bool {
        !self.guilds_announced.swap(true, Ordering::SeqCst)
    }

    pub async fn shards(&self) -> ShardManager {
        self.shards.lock().await.clone()
    }

    pub async fn shard(&self, shard_id: u32) -> Option<Shard> {
        self.shards.lock().await.get(shard_id).cloned()
    }

    /* ───────────────────────────── Listeners ───────────────────────────── */

    /// Register the event handler. A second call replaces the first handler.
    pub async fn listen<E: EventHandler>(&self, handler: E) {
        *self.event_handler.lock().await = Some(Arc::new(handler));
    }

    /// Hand `event` to the listener on its own task, then to the waiters.
    ///
    /// Listener errors and panics go to [`EventHandler::on_error`].
    pub fn dispatch(&self, event: Event) {
        let client = self.clone();
        let listener_event = event.clone();

        tokio::spawn(async move {
            let handler = client.event_handler.lock().await.clone();
            let Some(handler) = handler else {
                return;
            };
            let name = listener_event.name();

            let outcome = AssertUnwindSafe(call_listener(&*handler, &client, &listener_event))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => handler.on_error(&client, name, err.as_ref()).await,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    let err = MelisaError::Other(format!("listener panicked: {message}"));
                    handler.on_error(&client, name, &err).await;
                }
            }
        });

        let resolved = self.waiters.notify(&event);
        if resolved > 0 {
            debug!(event = event.name(), resolved, "resolved waiters");
        }
    }

    /// Wait for the next `event_name` event (e.g. `"on_message_create"`)
    /// accepted by `check`. Fails with [`MelisaError::Timeout`].
    pub async fn wait_for<F>(
        &self,
        event_name: &str,
        check: F,
        timeout: Duration,
    ) -> Result<Event, MelisaError>
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.waiters.wait_for(event_name, check, timeout).await
    }

    /* ───────────────────────────── Running ───────────────────────────── */

    /// Run a single shard. Blocks until Ctrl-C or a fatal gateway error.
    pub async fn run(&self) -> Result<(), MelisaError> {
        self.run_shards(1, None).await
    }

    /// Run `shard_ids` (all of `0..num_shards` by default) out of `num_shards`.
    pub async fn run_shards(
        &self,
        num_shards: u32,
        shard_ids: Option<Vec<u32>>,
    ) -> Result<(), MelisaError> {
        if num_shards == 0 {
            return Err(MelisaError::InvalidArgument(
                "num_shards must be at least 1".into(),
            ));
        }
        let ids = shard_ids.unwrap_or_else(|| (0..num_shards).collect());
        if let Some(bad) = ids.iter().find(|id| **id >= num_shards) {
            return Err(MelisaError::InvalidArgument(format!(
                "shard id {bad} is out of range for {num_shards} shards"
            )));
        }

        let url = self.gateway_url.clone();
        self.start_shards(url, num_shards, vec![ids], Duration::ZERO)
            .await
    }

    /// Run the shard count Discord recommends, starting `max_concurrency`
    /// shards at a time.
    pub async fn run_autosharded(&self) -> Result<(), MelisaError> {
        let info = self.rest.fetch_gateway_bot().await?;
        let ids: Vec<u32> = (0..info.shards.max(1)).collect();
        let buckets = launch_buckets(&ids, info.session_start_limit.max_concurrency);

        info!(
            shards = ids.len(),
            max_concurrency = info.session_start_limit.max_concurrency,
            remaining_sessions = info.session_start_limit.remaining,
            "autosharding"
        );
        self.start_shards(info.url, ids.len() as u32, buckets, BUCKET_PAUSE)
            .await
    }

    async fn start_shards(
        &self,
        url: String,
        num_shards: u32,
        buckets: Vec<Vec<u32>>,
        pause: Duration,
    ) -> Result<(), MelisaError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = GatewayConfig {
            token: self.token.to_string(),
            intents: self.intents,
            mobile: self.mobile,
            url,
            presence: self.presence.lock().await.clone(),
        };

        for (i, bucket) in buckets.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                sleep(pause).await;
            }
            for id in bucket {
                let shard = Shard::new(*id, num_shards, config.clone(), tx.clone());
                if let Err(e) = shard.launch().await {
                    error!(shard_id = id, error = %e, "failed to launch shard");
                    self.close().await;
                    return Err(e);
                }
                self.shards.lock().await.insert(shard);
            }
        }
        drop(tx);

        self.drive(rx).await
    }

    /// Feed gateway dispatches through the listeners until the client stops.
    async fn drive(&self, mut rx: UnboundedReceiver<GatewayMessage>) -> Result<(), MelisaError> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("received Ctrl-C, closing shards");
                    self.close().await;
                    return Ok(());
                }
                message = rx.recv() => match message {
                    Some(GatewayMessage::Dispatch { shard_id, name, data }) => {
                        match listeners::handle_dispatch(self, shard_id, &name, data).await {
                            Ok(event) => self.dispatch(event),
                            Err(e) => warn!(shard_id, event = %name, error = %e, "failed to parse dispatch"),
                        }
                    }
                    Some(GatewayMessage::Closed { shard_id, error: Some(error) }) => {
                        error!(shard_id, %error, "shard stopped");
                        self.close().await;
                        return Err(error);
                    }
                    Some(GatewayMessage::Closed { shard_id, error: None }) => {
                        debug!(shard_id, "shard closed");
                    }
                    None => return Ok(()),
                },
            }
        }
    }

    /// Close every shard. [`run`](Self::run) and friends return afterwards.
    pub async fn close(&self) {
        let shards = self.shards.lock().await.drain();
        for shard in shards {
            if let Err(e) = shard.close().await {
                warn!(shard_id = shard.id(), error = %e, "error while closing shard");
            }
        }
    }

    /// Change the presence on every running shard.
    pub async fn update_presence(
        &self,
        activity: Option<Activity>,
        status: Option<StatusType>,
    ) -> Result<(), MelisaError> {
        *self.presence.lock().await = Some(UpdatePresence::new(activity.clone(), status));
        let shards = self.shards().await;
        for shard in shards.iter() {
            shard.update_presence(activity.clone(), status).await?;
        }
        Ok(())
    }

    /* ─────────────────────────── REST shortcuts ─────────────────────────── */

    pub async fn fetch_user(&self, user_id: Snowflake) -> Result<User, MelisaError> {
        self.rest.fetch_user(user_id).await
    }

    pub async fn fetch_guild(&self, guild_id: Snowflake) -> Result<Guild, MelisaError> {
        self.rest.fetch_guild(guild_id).await
    }

    pub async fn fetch_channel(&self, channel_id: Snowflake) -> Result<Channel, MelisaError> {
        self.rest.fetch_channel(channel_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use async_trait::async_trait;
    use std::error::Error;
    use tokio::{sync::mpsc::UnboundedSender, time::timeout};

    /// Panics for shard 0, fails for shard 1 and succeeds otherwise.
    struct Flaky {
        seen: UnboundedSender<String>,
    }

    #[async_trait]
    impl EventHandler for Flaky {
        async fn on_shard_ready(&self, _client: &Client, shard_id: u32) -> Result<(), ListenerError> {
            match shard_id {
                0 => panic!("boom"),
                1 => Err("plain error".into()),
                id => {
                    let _ = self.seen.send(format!("ready {id}"));
                    Ok(())
                }
            }
        }

        async fn on_error(
            &self,
            _client: &Client,
            event_name: &str,
            error: &(dyn Error + Send + Sync),
        ) {
            let _ = self.seen.send(format!("{event_name}: {error}"));
        }
    }

    #[test]
    fn builder_defaults() {
        let client = Client::builder("secret-token").logs(None).build().unwrap();
        assert_eq!(client.intents, Intents::default());
        assert_eq!(client.gateway_url, DEFAULT_GATEWAY_URL);
        assert!(!client.mobile);
        assert_eq!(client.rest().http.max_ttl, DEFAULT_MAX_TTL);
        assert!(!format!("{client:?}").contains("secret-token"));
    }

    #[test]
    fn guilds_announced_once() {
        let client = Client::new("token", Intents::GUILDS).unwrap();
        assert!(client.mark_guilds_announced());
        assert!(!client.mark_guilds_announced());
        assert!(!client.clone().mark_guilds_announced());
    }

    #[tokio::test]
    async fn rejects_out_of_range_shard() {
        let client = Client::builder("token").logs(None).build().unwrap();
        let err = client.run_shards(2, Some(vec![0, 2])).await.unwrap_err();
        assert!(matches!(err, MelisaError::InvalidArgument(_)));
        assert!(matches!(
            client.run_shards(0, None).await,
            Err(MelisaError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn listener_errors_and_panics_reach_on_error() {
        let client = Client::builder("token").logs(None).build().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.listen(Flaky { seen: tx }).await;

        client.dispatch(Event::ShardReady(0));
        client.dispatch(Event::ShardReady(1));
        client.dispatch(Event::ShardReady(2));

        let mut seen = Vec::new();
        for _ in 0..3 {
            let line = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("listener did not report in time")
                .unwrap();
            seen.push(line);
        }
        seen.sort();

        assert_eq!(
            seen,
            vec![
                "on_shard_ready: Other error: listener panicked: boom".to_string(),
                "on_shard_ready: plain error".to_string(),
                "ready 2".to_string(),
            ]
        );
    }
}
