//! Gateway wire payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::MelisaError,
    types::{
        guild::UnavailableGuild,
        intents::Intents,
        presence::UpdatePresence,
        snowflake::Snowflake,
        user::User,
    },
    util::enum_number,
};

enum_number! {
    pub enum OpCode: u8 {
        Dispatch = 0,
        Heartbeat = 1,
        Identify = 2,
        PresenceUpdate = 3,
        VoiceUpdate = 4,
        Resume = 6,
        Reconnect = 7,
        RequestMembers = 8,
        InvalidSession = 9,
        Hello = 10,
        HeartbeatAck = 11,
    }
}

/// Envelope of every gateway frame, in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: OpCode,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    pub fn new(mobile: bool) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: if mobile { "Discord iOS" } else { "Melisa" }.to_string(),
            device: "Melisa".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identify {
    pub token: String,
    pub intents: Intents,
    pub properties: IdentifyProperties,
    /// Payload compression; transport compression is negotiated in the url instead.
    pub compress: bool,
    pub large_threshold: u32,
    /// `[shard_id, num_shards]`
    pub shard: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub token: String,
    pub session_id: String,
    pub seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestGuildMembers {
    pub guild_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Every frame the client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientToServerEvent {
    Heartbeat(Option<u64>),
    Identify(Identify),
    PresenceUpdate(UpdatePresence),
    Resume(Resume),
    RequestGuildMembers(RequestGuildMembers),
}

impl ClientToServerEvent {
    pub fn op(&self) -> OpCode {
        match self {
            Self::Heartbeat(_) => OpCode::Heartbeat,
            Self::Identify(_) => OpCode::Identify,
            Self::PresenceUpdate(_) => OpCode::PresenceUpdate,
            Self::Resume(_) => OpCode::Resume,
            Self::RequestGuildMembers(_) => OpCode::RequestMembers,
        }
    }

    pub fn to_payload(&self) -> Result<GatewayPayload, MelisaError> {
        let d = match self {
            Self::Heartbeat(seq) => serde_json::to_value(seq)?,
            Self::Identify(identify) => serde_json::to_value(identify)?,
            Self::PresenceUpdate(presence) => serde_json::to_value(presence)?,
            Self::Resume(resume) => serde_json::to_value(resume)?,
            Self::RequestGuildMembers(request) => serde_json::to_value(request)?,
        };
        Ok(GatewayPayload {
            op: self.op(),
            d,
            s: None,
            t: None,
        })
    }
}

/// `d` of the HELLO frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Hello {
    /// Milliseconds.
    pub heartbeat_interval: u64,
}

/// `d` of the READY dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    #[serde(rename = "v")]
    pub version: u8,
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    pub resume_gateway_url: Option<String>,
    pub shard: Option<[u32; 2]>,
    #[serde(default)]
    pub application: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds until `remaining` resets.
    pub reset_after: u64,
    pub max_concurrency: u32,
}

/// Response of `GET gateway/bot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBotInfo {
    pub url: String,
    /// Recommended shard count.
    pub shards: u32,
    pub session_start_limit: SessionStartLimit,
}
