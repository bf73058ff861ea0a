use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    api::guilds::GuildsApi,
    client::RestApp,
    error::MelisaError,
    types::{snowflake::Snowflake, timestamp::Timestamp, user::User},
    util::Identifiable,
};

/// The longest timeout Discord accepts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// A user's membership in a guild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuildMember {
    pub user: Option<User>,
    pub nick: Option<String>,
    /// Guild specific avatar hash.
    pub avatar: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub joined_at: Option<Timestamp>,
    pub premium_since: Option<Timestamp>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    pub pending: Option<bool>,
    pub permissions: Option<String>,
    pub communication_disabled_until: Option<Timestamp>,
    pub guild_id: Option<Snowflake>,

    #[serde(skip)]
    pub rest: Option<RestApp>,
}

/// PATCH body for `guilds/{guild}/members/{user}`. Outer `None` leaves the
/// field untouched, inner `None` clears it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModifyGuildMember {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Snowflake>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Option<Snowflake>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_disabled_until: Option<Option<Timestamp>>,
}

impl GuildMember {
    pub fn inject_rest(&mut self, rest: RestApp) {
        if let Some(user) = self.user.as_mut() {
            user.inject_rest(rest.clone());
        }
        self.rest = Some(rest);
    }

    pub fn user_id(&self) -> Option<Snowflake> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn mention(&self) -> Option<String> {
        self.user_id().map(|id| format!("<@{id}>"))
    }

    pub fn display_name(&self) -> Option<&str> {
        self.nick
            .as_deref()
            .or_else(|| self.user.as_ref().map(|u| u.username.as_str()))
    }

    /// Guild avatar if set, then the user's own avatar.
    pub fn avatar_url(&self) -> Option<String> {
        let cdn = self
            .rest
            .as_ref()
            .map(|r| r.cdn.clone())
            .unwrap_or_default();
        match (&self.avatar, self.guild_id, self.user_id()) {
            (Some(hash), Some(guild_id), Some(user_id)) => {
                Some(cdn.guild_member_avatar_url(guild_id, user_id, hash, None, None))
            }
            _ => self.user.as_ref().map(|u| u.avatar_url()),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.communication_disabled_until
            .is_some_and(|until| until.datetime() > Utc::now())
    }

    fn ids(&self) -> Result<(&RestApp, Snowflake, Snowflake), MelisaError> {
        let rest = self.rest.as_ref().ok_or(MelisaError::ClientNotAttached)?;
        let guild_id = self
            .guild_id
            .ok_or_else(|| MelisaError::Other("Member has no guild id".into()))?;
        let user_id = self
            .user_id()
            .ok_or_else(|| MelisaError::Other("Member has no user".into()))?;
        Ok((rest, guild_id, user_id))
    }

    /// Time the member out for `duration`, until `until`, or lift the timeout
    /// when both are `None`. Passing both is an error.
    pub async fn timeout(
        &mut self,
        duration: Option<Duration>,
        until: Option<Timestamp>,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        let until = match (duration, until) {
            (Some(_), Some(_)) => {
                return Err(MelisaError::InvalidArgument(
                    "You can't use both duration and until at the same time".into(),
                ))
            }
            (Some(duration), None) => {
                let duration = duration.min(MAX_TIMEOUT);
                let delta = chrono::Duration::from_std(duration)
                    .map_err(|e| MelisaError::InvalidArgument(e.to_string()))?;
                Some(Timestamp::from(Utc::now() + delta))
            }
            (None, until) => until,
        };

        let (rest, guild_id, user_id) = self.ids()?;
        let body = ModifyGuildMember {
            communication_disabled_until: Some(until),
            ..Default::default()
        };
        rest.modify_guild_member(guild_id, user_id, &body, reason)
            .await?;
        self.communication_disabled_until = until;
        Ok(())
    }

    pub async fn kick(&self, reason: Option<&str>) -> Result<(), MelisaError> {
        let (rest, guild_id, user_id) = self.ids()?;
        rest.remove_guild_member(guild_id, user_id, reason).await
    }

    /// Ban the member, deleting up to 7 days of their messages.
    pub async fn ban(
        &self,
        delete_message_days: Option<u8>,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        let (rest, guild_id, user_id) = self.ids()?;
        rest.create_guild_ban(guild_id, user_id, delete_message_days, reason)
            .await
    }

    pub async fn add_role(&self, role_id: Snowflake, reason: Option<&str>) -> Result<(), MelisaError> {
        let (rest, guild_id, user_id) = self.ids()?;
        rest.add_guild_member_role(guild_id, user_id, role_id, reason)
            .await
    }

    pub async fn remove_role(
        &self,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        let (rest, guild_id, user_id) = self.ids()?;
        rest.remove_guild_member_role(guild_id, user_id, role_id, reason)
            .await
    }
}

impl Identifiable for GuildMember {
    type Key = Snowflake;

    fn key(&self) -> Option<Snowflake> {
        self.user_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_rejects_both_arguments() {
        let mut member = GuildMember::default();
        let err = member
            .timeout(Some(Duration::from_secs(60)), Some(Timestamp::now()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MelisaError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn detached_member_cannot_kick() {
        let member = GuildMember::default();
        assert!(matches!(
            member.kick(None).await,
            Err(MelisaError::ClientNotAttached)
        ));
    }

    #[test]
    fn clear_timeout_serializes_null() {
        let body = ModifyGuildMember {
            communication_disabled_until: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"communication_disabled_until":null}"#
        );
    }
}
