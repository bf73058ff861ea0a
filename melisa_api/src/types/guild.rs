use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::guilds::GuildsApi,
    client::RestApp,
    error::MelisaError,
    types::{
        channel::{Channel, CreateChannel},
        emoji::Emoji,
        member::GuildMember,
        role::Role,
        snowflake::Snowflake,
        thread::ThreadsList,
        timestamp::Timestamp,
    },
    util::{bitflags_serde, enum_number, id_map, Identifiable},
};

/// Guilds with at least this many members are "large".
pub const LARGE_THRESHOLD: u32 = 250;

enum_number! {
    pub enum DefaultMessageNotificationLevel: u8 {
        AllMessages = 0,
        OnlyMentions = 1,
    }
}

enum_number! {
    pub enum ExplicitContentFilterLevel: u8 {
        Disabled = 0,
        MembersWithoutRoles = 1,
        AllMembers = 2,
    }
}

enum_number! {
    pub enum MfaLevel: u8 {
        None = 0,
        Elevated = 1,
    }
}

enum_number! {
    pub enum VerificationLevel: u8 {
        None = 0,
        /// Verified email.
        Low = 1,
        /// Registered for longer than 5 minutes.
        Medium = 2,
        /// Member of the guild for longer than 10 minutes.
        High = 3,
        /// Verified phone number.
        VeryHigh = 4,
    }
}

enum_number! {
    pub enum GuildNsfwLevel: u8 {
        Default = 0,
        Explicit = 1,
        Safe = 2,
        AgeRestricted = 3,
    }
}

enum_number! {
    /// Server boost level.
    pub enum PremiumTier: u8 {
        None = 0,
        Tier1 = 1,
        Tier2 = 2,
        Tier3 = 3,
    }
}

bitflags! {
    /// Messages the system channel suppresses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SystemChannelFlags: u32 {
        const SUPPRESS_JOIN_NOTIFICATIONS = 1 << 0;
        const SUPPRESS_PREMIUM_SUBSCRIPTIONS = 1 << 1;
        const SUPPRESS_GUILD_REMINDER_NOTIFICATIONS = 1 << 2;
        const SUPPRESS_JOIN_NOTIFICATION_REPLIES = 1 << 3;
    }
}

bitflags_serde!(SystemChannelFlags: u32);

/// A guild as sent by GUILD_CREATE or `GET guilds/{id}`.
///
/// Roles, emojis, members, channels and threads arrive as arrays and are kept
/// as maps keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    pub icon: Option<String>,
    pub icon_hash: Option<String>,
    pub splash: Option<String>,
    pub discovery_splash: Option<String>,
    /// Only present on `GET users/@me/guilds`.
    pub owner: Option<bool>,
    pub owner_id: Option<Snowflake>,
    pub permissions: Option<String>,
    pub afk_channel_id: Option<Snowflake>,
    pub afk_timeout: Option<u32>,
    pub widget_enabled: Option<bool>,
    pub widget_channel_id: Option<Snowflake>,
    pub verification_level: Option<VerificationLevel>,
    pub default_message_notifications: Option<DefaultMessageNotificationLevel>,
    pub explicit_content_filter: Option<ExplicitContentFilterLevel>,
    #[serde(default, with = "id_map")]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(default, with = "id_map")]
    pub emojis: HashMap<Snowflake, Emoji>,
    #[serde(default)]
    pub features: Vec<String>,
    pub mfa_level: Option<MfaLevel>,
    pub application_id: Option<Snowflake>,
    pub system_channel_id: Option<Snowflake>,
    pub system_channel_flags: Option<SystemChannelFlags>,
    pub rules_channel_id: Option<Snowflake>,
    pub joined_at: Option<Timestamp>,
    pub large: Option<bool>,
    #[serde(default)]
    pub unavailable: bool,
    pub member_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub voice_states: Vec<Value>,
    #[serde(default, with = "id_map")]
    pub members: HashMap<Snowflake, GuildMember>,
    #[serde(default, with = "id_map")]
    pub channels: HashMap<Snowflake, Channel>,
    #[serde(default, with = "id_map")]
    pub threads: HashMap<Snowflake, Channel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presences: Vec<Value>,
    pub max_presences: Option<u32>,
    pub max_members: Option<u32>,
    pub vanity_url_code: Option<String>,
    pub description: Option<String>,
    pub banner: Option<String>,
    pub premium_tier: Option<PremiumTier>,
    pub premium_subscription_count: Option<u32>,
    pub preferred_locale: Option<String>,
    pub public_updates_channel_id: Option<Snowflake>,
    pub max_video_channel_users: Option<u32>,
    pub nsfw_level: Option<GuildNsfwLevel>,
    pub premium_progress_bar_enabled: Option<bool>,

    #[serde(skip)]
    pub rest: Option<RestApp>,
}

/// A guild that is offline or not yet sent by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

impl Guild {
    /// Parse a raw guild and stamp the guild id onto its children, which
    /// Discord omits inside the guild payload.
    pub fn from_value(value: Value) -> Result<Self, MelisaError> {
        let mut guild: Guild = serde_json::from_value(value)?;
        let id = guild.id;
        for role in guild.roles.values_mut() {
            role.guild_id = Some(id);
        }
        for member in guild.members.values_mut() {
            member.guild_id = Some(id);
        }
        for channel in guild.channels.values_mut().chain(guild.threads.values_mut()) {
            channel.guild_id = Some(id);
        }
        Ok(guild)
    }

    /// Placeholder stored for guilds listed as unavailable in READY.
    pub fn unavailable(id: Snowflake) -> Self {
        Self {
            id,
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn inject_rest(&mut self, rest: RestApp) {
        for member in self.members.values_mut() {
            member.inject_rest(rest.clone());
        }
        for channel in self.channels.values_mut().chain(self.threads.values_mut()) {
            channel.inject_rest(rest.clone());
        }
        self.rest = Some(rest);
    }

    fn rest(&self) -> Result<&RestApp, MelisaError> {
        self.rest.as_ref().ok_or(MelisaError::ClientNotAttached)
    }

    pub fn is_large(&self) -> bool {
        self.large
            .unwrap_or_else(|| self.member_count.unwrap_or(0) >= LARGE_THRESHOLD)
    }

    pub fn icon_url(&self) -> Option<String> {
        let cdn = self.rest.as_ref().map(|r| r.cdn.clone()).unwrap_or_default();
        self.icon.as_deref().map(|hash| {
            let format = if hash.starts_with("a_") { "gif" } else { "png" };
            cdn.guild_icon_url(self.id, hash, Some(format), None)
        })
    }

    pub fn get_channel(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.channels
            .get(&channel_id)
            .or_else(|| self.threads.get(&channel_id))
    }

    pub async fn create_channel(
        &self,
        body: &CreateChannel,
        reason: Option<&str>,
    ) -> Result<Channel, MelisaError> {
        body.validate()?;
        self.rest()?
            .create_guild_channel(self.id, body, reason)
            .await
    }

    /// Active threads the bot can see, private ones included.
    pub async fn active_threads(&self) -> Result<ThreadsList, MelisaError> {
        self.rest()?.active_threads(self.id).await
    }

    pub async fn kick(&self, user_id: Snowflake, reason: Option<&str>) -> Result<(), MelisaError> {
        self.rest()?
            .remove_guild_member(self.id, user_id, reason)
            .await
    }

    pub async fn ban(
        &self,
        user_id: Snowflake,
        delete_message_days: Option<u8>,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.rest()?
            .create_guild_ban(self.id, user_id, delete_message_days, reason)
            .await
    }

    pub async fn unban(&self, user_id: Snowflake, reason: Option<&str>) -> Result<(), MelisaError> {
        self.rest()?.remove_guild_ban(self.id, user_id, reason).await
    }
}

impl From<UnavailableGuild> for Guild {
    fn from(value: UnavailableGuild) -> Self {
        Self::unavailable(value.id)
    }
}

impl Identifiable for Guild {
    type Key = Snowflake;

    fn key(&self) -> Option<Snowflake> {
        Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn children_get_guild_id() {
        let guild = Guild::from_value(json!({
            "id": "123",
            "name": "test",
            "roles": [{"id": "5", "name": "@everyone", "color": 0, "permissions": "0"}],
            "channels": [{"id": "456", "name": "general", "type": 0}],
            "members": [{"user": {"id": "9", "username": "u", "discriminator": "0001"}}],
        }))
        .unwrap();

        let id = Snowflake::from(123);
        assert_eq!(guild.roles[&Snowflake::from(5)].guild_id, Some(id));
        assert_eq!(guild.channels[&Snowflake::from(456)].guild_id, Some(id));
        assert_eq!(guild.members[&Snowflake::from(9)].guild_id, Some(id));
    }

    #[test]
    fn large_falls_back_to_member_count() {
        let mut guild = Guild::unavailable(Snowflake::from(1));
        assert!(!guild.is_large());
        guild.member_count = Some(250);
        assert!(guild.is_large());
        guild.large = Some(false);
        assert!(!guild.is_large());
    }

    #[test]
    fn animated_icon_is_gif() {
        let mut guild = Guild::unavailable(Snowflake::from(1));
        guild.icon = Some("a_abc".into());
        assert_eq!(
            guild.icon_url().unwrap(),
            "https://cdn.discordapp.com/icons/1/a_abc.gif?size=1024"
        );
    }
}
