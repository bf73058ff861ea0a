use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::messages::MessagesApi,
    client::RestApp,
    error::MelisaError,
    types::{
        channel::{Channel, ChannelType},
        embed::Embed,
        emoji::Emoji,
        file::File,
        member::GuildMember,
        snowflake::Snowflake,
        timestamp::Timestamp,
        user::User,
    },
    util::{bitflags_serde, enum_number},
};

pub const MESSAGE_CONTENT_LIMIT: usize = 2000;
pub const MESSAGE_MAX_EMBEDS: usize = 10;
pub const MESSAGE_MAX_FILES: usize = 10;

enum_number! {
    pub enum MessageType: u8 {
        Default = 0,
        RecipientAdd = 1,
        RecipientRemove = 2,
        Call = 3,
        ChannelNameChange = 4,
        ChannelIconChange = 5,
        ChannelPinnedMessage = 6,
        GuildMemberJoin = 7,
        UserPremiumGuildSubscription = 8,
        UserPremiumGuildSubscriptionTier1 = 9,
        UserPremiumGuildSubscriptionTier2 = 10,
        UserPremiumGuildSubscriptionTier3 = 11,
        ChannelFollowAdd = 12,
        GuildDiscoveryDisqualified = 14,
        GuildDiscoveryRequalified = 15,
        GuildDiscoveryGracePeriodInitialWarning = 16,
        GuildDiscoveryGracePeriodFinalWarning = 17,
        ThreadCreated = 18,
        Reply = 19,
        ChatInputCommand = 20,
        ThreadStarterMessage = 21,
        GuildInviteReminder = 22,
        ContextMenuCommand = 23,
    }
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Default
    }
}

enum_number! {
    pub enum MessageActivityType: u8 {
        Join = 1,
        Spectate = 2,
        Listen = 3,
        JoinRequest = 5,
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageFlags: u32 {
        /// Published to following channels.
        const CROSSPOSTED = 1 << 0;
        /// Originated from a followed channel.
        const IS_CROSSPOST = 1 << 1;
        const SUPPRESS_EMBEDS = 1 << 2;
        const SOURCE_MESSAGE_DELETED = 1 << 3;
        const URGENT = 1 << 4;
        const HAS_THREAD = 1 << 5;
        /// Only visible to the interaction user.
        const EPHEMERAL = 1 << 6;
        const LOADING = 1 << 7;
        const FAILED_TO_MENTION_SOME_ROLES_IN_THREAD = 1 << 8;
    }
}

bitflags_serde!(MessageFlags: u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageActivity {
    #[serde(rename = "type")]
    pub kind: MessageActivityType,
    pub party_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_if_not_exists: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub description: Option<String>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub url: String,
    pub proxy_url: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub ephemeral: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reaction {
    pub count: u32,
    pub me: bool,
    pub emoji: Emoji,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMention {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StickerItem {
    pub id: Snowflake,
    pub name: String,
    pub format_type: u8,
}

/// Which mentions in the content actually ping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowedMentions {
    /// Any of "roles", "users" and "everyone".
    pub parse: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Snowflake>,
    #[serde(default)]
    pub replied_user: bool,
}

impl AllowedMentions {
    pub fn none() -> Self {
        Self::default()
    }
}

/// A message sent in a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author: Option<User>,
    /// Partial member, present on guild MESSAGE_CREATE.
    pub member: Option<GuildMember>,
    #[serde(default)]
    pub content: String,
    pub timestamp: Option<Timestamp>,
    pub edited_timestamp: Option<Timestamp>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub mention_roles: Vec<Snowflake>,
    #[serde(default)]
    pub mention_channels: Vec<ChannelMention>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Integer or string, whatever the sender chose.
    pub nonce: Option<Value>,
    #[serde(default)]
    pub pinned: bool,
    pub webhook_id: Option<Snowflake>,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    pub activity: Option<MessageActivity>,
    pub application_id: Option<Snowflake>,
    pub message_reference: Option<MessageReference>,
    pub flags: Option<MessageFlags>,
    pub referenced_message: Option<Box<Message>>,
    pub thread: Option<Channel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
    #[serde(default)]
    pub sticker_items: Vec<StickerItem>,

    #[serde(skip)]
    pub rest: Option<RestApp>,
}

/// Outgoing message. Without files it is sent as JSON, otherwise as
/// `multipart/form-data` with the JSON in `payload_json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Webhook executions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Webhook executions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip)]
    pub files: Vec<File>,
}

impl CreateMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn file(mut self, file: File) -> Self {
        self.files.push(file);
        self
    }

    pub fn reply_to(mut self, message_id: Snowflake) -> Self {
        self.message_reference = Some(MessageReference {
            message_id: Some(message_id),
            ..Default::default()
        });
        self
    }

    pub fn validate(&self) -> Result<(), MelisaError> {
        let content_len = self.content.as_ref().map_or(0, |c| c.chars().count());
        if content_len > MESSAGE_CONTENT_LIMIT {
            return Err(MelisaError::InvalidArgument(format!(
                "Message content must be {MESSAGE_CONTENT_LIMIT} or fewer in length"
            )));
        }
        if self.embeds.len() > MESSAGE_MAX_EMBEDS {
            return Err(MelisaError::InvalidArgument(format!(
                "A message can have at most {MESSAGE_MAX_EMBEDS} embeds"
            )));
        }
        if self.files.len() > MESSAGE_MAX_FILES {
            return Err(MelisaError::InvalidArgument(format!(
                "A message can have at most {MESSAGE_MAX_FILES} files"
            )));
        }
        if content_len == 0 && self.embeds.is_empty() && self.files.is_empty() {
            return Err(MelisaError::InvalidArgument(
                "Cannot send an empty message".into(),
            ));
        }
        for embed in &self.embeds {
            embed.validate()?;
        }
        Ok(())
    }

    /// The JSON body, with `attachments` describing each file when present.
    pub fn payload_json(&self) -> Result<Value, MelisaError> {
        let mut payload = serde_json::to_value(self)?;
        if !self.files.is_empty() {
            let attachments = self
                .files
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    let mut attachment = serde_json::json!({"id": i, "filename": f.filename});
                    if let Some(description) = &f.description {
                        attachment["description"] = Value::from(description.clone());
                    }
                    attachment
                })
                .collect::<Vec<_>>();
            payload["attachments"] = Value::Array(attachments);
        }
        Ok(payload)
    }
}

impl Message {
    pub fn inject_rest(&mut self, rest: RestApp) {
        if let Some(author) = self.author.as_mut() {
            author.inject_rest(rest.clone());
        }
        if let Some(member) = self.member.as_mut() {
            member.guild_id = self.guild_id;
            member.inject_rest(rest.clone());
        }
        for user in &mut self.mentions {
            user.inject_rest(rest.clone());
        }
        if let Some(referenced) = self.referenced_message.as_mut() {
            referenced.inject_rest(rest.clone());
        }
        if let Some(thread) = self.thread.as_mut() {
            thread.inject_rest(rest.clone());
        }
        self.rest = Some(rest);
    }

    fn rest(&self) -> Result<&RestApp, MelisaError> {
        self.rest.as_ref().ok_or(MelisaError::ClientNotAttached)
    }

    pub fn flags(&self) -> MessageFlags {
        self.flags.unwrap_or(MessageFlags::empty())
    }

    pub fn jump_url(&self) -> String {
        let guild = self
            .guild_id
            .map_or_else(|| "@me".to_string(), |id| id.to_string());
        format!(
            "https://discord.com/channels/{guild}/{}/{}",
            self.channel_id, self.id
        )
    }

    /// Send a message in the same channel that references this one.
    pub async fn reply(&self, content: &str) -> Result<Message, MelisaError> {
        let message = CreateMessage::new(content).reply_to(self.id);
        self.rest()?.create_message(self.channel_id, message).await
    }

    pub async fn delete(&self, reason: Option<&str>) -> Result<(), MelisaError> {
        self.rest()?
            .delete_message(self.channel_id, self.id, reason)
            .await
    }

    /// Pin this message. Requires `MANAGE_MESSAGES`; a channel holds at most 50 pins.
    pub async fn pin(&self, reason: Option<&str>) -> Result<(), MelisaError> {
        self.rest()?
            .pin_message(self.channel_id, self.id, reason)
            .await
    }

    pub async fn unpin(&self, reason: Option<&str>) -> Result<(), MelisaError> {
        self.rest()?
            .unpin_message(self.channel_id, self.id, reason)
            .await
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
