use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        channels::ChannelsApi,
        messages::{FetchMessagesOptions, MessagesApi},
        webhooks::WebhooksApi,
    },
    client::RestApp,
    error::MelisaError,
    types::{
        message::{CreateMessage, Message},
        snowflake::Snowflake,
        thread::{ThreadMember, ThreadMetadata},
        timestamp::Timestamp,
        user::User,
        webhook::Webhook,
    },
    util::{enum_number, Identifiable},
};

/// Discord returns at most this many messages per history request.
const HISTORY_PAGE_SIZE: usize = 100;

enum_number! {
    pub enum ChannelType: u8 {
        GuildText = 0,
        Dm = 1,
        GuildVoice = 2,
        GroupDm = 3,
        GuildCategory = 4,
        GuildNews = 5,
        GuildStore = 6,
        GuildNewsThread = 10,
        GuildPublicThread = 11,
        GuildPrivateThread = 12,
        GuildStageVoice = 13,
    }
}

impl Default for ChannelType {
    fn default() -> Self {
        Self::GuildText
    }
}

impl ChannelType {
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            Self::GuildNewsThread | Self::GuildPublicThread | Self::GuildPrivateThread
        )
    }

    pub fn is_private(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }
}

enum_number! {
    /// Camera quality in voice channels.
    pub enum VideoQualityModes: u8 {
        Auto = 1,
        Full = 2,
    }
}

enum_number! {
    pub enum OverwriteType: u8 {
        Role = 0,
        Member = 1,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    #[serde(default)]
    pub allow: String,
    #[serde(default)]
    pub deny: String,
}

/// Any kind of channel: guild text, voice, category, thread or DM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: ChannelType,
    pub guild_id: Option<Snowflake>,
    pub position: Option<i32>,
    #[serde(default)]
    pub permission_overwrites: Vec<PermissionOverwrite>,
    pub name: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
    pub last_message_id: Option<Snowflake>,
    pub bitrate: Option<u32>,
    pub user_limit: Option<u32>,
    /// Slowmode in seconds.
    pub rate_limit_per_user: Option<u32>,
    #[serde(default)]
    pub recipients: Vec<User>,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub application_id: Option<Snowflake>,
    /// Category for guild channels, parent channel for threads.
    pub parent_id: Option<Snowflake>,
    pub last_pin_timestamp: Option<Timestamp>,
    pub rtc_region: Option<String>,
    pub video_quality_mode: Option<VideoQualityModes>,
    pub message_count: Option<u32>,
    pub member_count: Option<u32>,
    pub thread_metadata: Option<ThreadMetadata>,
    pub member: Option<ThreadMember>,
    pub default_auto_archive_duration: Option<u32>,
    pub permissions: Option<String>,

    #[serde(skip)]
    pub rest: Option<RestApp>,
}

/// Body of `POST guilds/{guild}/channels`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateChannel {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChannelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_user: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_overwrites: Option<Vec<PermissionOverwrite>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
}

impl CreateChannel {
    pub fn new(name: impl Into<String>, kind: ChannelType) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), MelisaError> {
        let len = self.name.chars().count();
        if !(1..=100).contains(&len) {
            return Err(MelisaError::InvalidArgument(
                "Channel name must be 1-100 characters".into(),
            ));
        }
        if self.topic.as_ref().is_some_and(|t| t.chars().count() > 1024) {
            return Err(MelisaError::InvalidArgument(
                "Channel topic must be 0-1024 characters".into(),
            ));
        }
        if self.rate_limit_per_user.is_some_and(|s| s > 21600) {
            return Err(MelisaError::InvalidArgument(
                "Slowmode must be 0-21600 seconds".into(),
            ));
        }
        Ok(())
    }
}

struct HistoryCursor {
    rest: RestApp,
    channel_id: Snowflake,
    remaining: usize,
    before: Option<Snowflake>,
    after: Option<Snowflake>,
    around: Option<Snowflake>,
    buffer: VecDeque<Message>,
    exhausted: bool,
}

impl Channel {
    pub fn inject_rest(&mut self, rest: RestApp) {
        for user in &mut self.recipients {
            user.inject_rest(rest.clone());
        }
        self.rest = Some(rest);
    }

    fn rest(&self) -> Result<&RestApp, MelisaError> {
        self.rest.as_ref().ok_or(MelisaError::ClientNotAttached)
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }

    pub fn is_guild_channel(&self) -> bool {
        !self.kind.is_private()
    }

    pub fn is_thread(&self) -> bool {
        self.kind.is_thread()
    }

    pub async fn send(&self, message: CreateMessage) -> Result<Message, MelisaError> {
        self.rest()?.create_message(self.id, message).await
    }

    pub async fn fetch_message(&self, message_id: Snowflake) -> Result<Message, MelisaError> {
        self.rest()?.fetch_message(self.id, message_id).await
    }

    pub async fn delete(&self, reason: Option<&str>) -> Result<Channel, MelisaError> {
        self.rest()?.delete_channel(self.id, reason).await
    }

    pub async fn trigger_typing(&self) -> Result<(), MelisaError> {
        self.rest()?.trigger_typing(self.id).await
    }

    pub async fn create_webhook(
        &self,
        name: &str,
        avatar: Option<&[u8]>,
        reason: Option<&str>,
    ) -> Result<Webhook, MelisaError> {
        self.rest()?
            .create_webhook(self.id, name, avatar, reason)
            .await
    }

    pub async fn webhooks(&self) -> Result<Vec<Webhook>, MelisaError> {
        self.rest()?.fetch_channel_webhooks(self.id).await
    }

    /// Stream up to `limit` messages (100 by default), newest first.
    ///
    /// Requests are made lazily in pages of at most 100. The first page honors
    /// `before`, `after` or `around`; every following page continues before the
    /// oldest message seen so far. The stream ends on an empty page.
    ///
    /// ```ignore
    /// let messages: Vec<_> = channel.history(Some(250), None, None, None)?
    ///     .try_collect()
    ///     .await?;
    /// ```
    pub fn history(
        &self,
        limit: Option<usize>,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
        around: Option<Snowflake>,
    ) -> Result<BoxStream<'static, Result<Message, MelisaError>>, MelisaError> {
        let cursor = HistoryCursor {
            rest: self.rest()?.clone(),
            channel_id: self.id,
            remaining: limit.unwrap_or(HISTORY_PAGE_SIZE),
            before,
            after,
            around,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        Ok(stream::unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(message) = cursor.buffer.pop_front() {
                    return Some((Ok(message), cursor));
                }
                if cursor.exhausted || cursor.remaining == 0 {
                    return None;
                }

                let page_size = cursor.remaining.min(HISTORY_PAGE_SIZE);
                let opts = FetchMessagesOptions {
                    limit: Some(page_size as u8),
                    before: cursor.before,
                    after: cursor.after.take(),
                    around: cursor.around.take(),
                };

                match cursor.rest.fetch_messages(cursor.channel_id, &opts).await {
                    Ok(page) if page.is_empty() => cursor.exhausted = true,
                    Ok(page) => {
                        cursor.before = page.last().map(|m| m.id);
                        cursor.remaining -= page_size;
                        if page.len() < page_size {
                            cursor.exhausted = true;
                        }
                        cursor.buffer.extend(page);
                    }
                    Err(e) => {
                        cursor.exhausted = true;
                        return Some((Err(e), cursor));
                    }
                }
            }
        })
        .boxed())
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Identifiable for Channel {
    type Key = Snowflake;

    fn key(&self) -> Option<Snowflake> {
        Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_channel() {
        let channel: Channel = serde_json::from_value(serde_json::json!({
            "id": "456",
            "name": "test",
            "type": 0,
            "guild_id": 123,
            "nsfw": false,
            "rate_limit_per_user": 2
        }))
        .unwrap();

        assert_eq!(channel.kind, ChannelType::GuildText);
        assert_eq!(channel.guild_id, Some(Snowflake::from(123)));
        assert_eq!(channel.mention(), "<#456>");
        assert!(channel.is_guild_channel());
    }

    #[test]
    fn thread_types() {
        assert!(ChannelType::from(11).is_thread());
        assert!(ChannelType::GroupDm.is_private());
        assert_eq!(ChannelType::from(99), ChannelType::Unknown(99));
    }

    #[test]
    fn create_channel_limits() {
        assert!(CreateChannel::new("", ChannelType::GuildText).validate().is_err());
        let mut body = CreateChannel::new("general", ChannelType::GuildText);
        assert!(body.validate().is_ok());
        body.rate_limit_per_user = Some(50_000);
        assert!(body.validate().is_err());
    }

    #[test]
    fn history_needs_rest() {
        let channel = Channel::default();
        assert!(matches!(
            channel.history(None, None, None, None),
            Err(MelisaError::ClientNotAttached)
        ));
    }
}
