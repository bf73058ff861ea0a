//! Shards: one gateway connection per `[id, num_shards]` pair.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::{sync::mpsc::UnboundedSender, time::sleep};
use tracing::info;

use crate::{
    error::MelisaError,
    types::{
        presence::{Activity, StatusType},
        snowflake::Snowflake,
    },
    websocket::gateway::{ConnectionState, Gateway, GatewayConfig, GatewayMessage},
};

/// Default pause of [`Shard::reconnect`].
pub const RECONNECT_WAIT: Duration = Duration::from_secs(3);

/// Cheap to clone; clones drive the same connection.
#[derive(Debug, Clone)]
pub struct Shard {
    gateway: Gateway,
}

impl Shard {
    pub fn new(
        id: u32,
        num_shards: u32,
        config: GatewayConfig,
        events: UnboundedSender<GatewayMessage>,
    ) -> Self {
        Self {
            gateway: Gateway::new(id, num_shards, config, events),
        }
    }

    pub fn id(&self) -> u32 {
        self.gateway.shard_id
    }

    pub fn num_shards(&self) -> u32 {
        self.gateway.num_shards
    }

    /// Heartbeat round trip, `None` until the first ack.
    pub async fn latency(&self) -> Option<Duration> {
        self.gateway.latency().await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.gateway.connection_state().await
    }

    pub async fn launch(&self) -> Result<(), MelisaError> {
        info!(shard_id = self.id(), num_shards = self.num_shards(), "launching shard");
        self.gateway.launch().await
    }

    pub async fn close(&self) -> Result<(), MelisaError> {
        self.gateway.close().await
    }

    pub async fn update_presence(
        &self,
        activity: Option<Activity>,
        status: Option<StatusType>,
    ) -> Result<(), MelisaError> {
        self.gateway.update_presence(activity, status).await
    }

    pub async fn request_guild_members(
        &self,
        guild_id: Snowflake,
        query: Option<&str>,
        limit: u32,
    ) -> Result<(), MelisaError> {
        self.gateway
            .request_guild_members(guild_id, query, limit)
            .await
    }

    /// Drop the connection with 4000, wait (3 seconds by default) and
    /// launch again, resuming the session.
    pub async fn reconnect(&self, wait: Option<Duration>) -> Result<(), MelisaError> {
        self.gateway.shutdown(4000, "Reconnecting").await?;
        sleep(wait.unwrap_or(RECONNECT_WAIT)).await;
        self.gateway.launch().await
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

/// The shards of a client, by id.
#[derive(Debug, Clone, Default)]
pub struct ShardManager {
    shards: BTreeMap<u32, Shard>,
}

impl ShardManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shard: Shard) -> Option<Shard> {
        self.shards.insert(shard.id(), shard)
    }

    pub fn get(&self, id: u32) -> Option<&Shard> {
        self.shards.get(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Shard> {
        self.shards.remove(&id)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.shards.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    /// Empty the manager, handing back every shard.
    pub fn drain(&mut self) -> Vec<Shard> {
        std::mem::take(&mut self.shards).into_values().collect()
    }
}

/// Split shard ids into launch buckets of `max_concurrency`.
pub fn launch_buckets(shard_ids: &[u32], max_concurrency: u32) -> Vec<Vec<u32>> {
    shard_ids
        .chunks(max_concurrency.max(1) as usize)
        .map(<[u32]>::to_vec)
        .collect()
}
