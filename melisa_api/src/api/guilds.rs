use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::{
    client::{RequestBody, RestApp},
    error::MelisaError,
    types::{
        channel::{Channel, CreateChannel},
        guild::Guild,
        member::{GuildMember, ModifyGuildMember},
        snowflake::Snowflake,
        thread::ThreadsList,
    },
};

/// Guild, member and ban endpoints.
#[async_trait]
pub trait GuildsApi {
    async fn fetch_guild(&self, guild_id: Snowflake) -> Result<Guild, MelisaError>;

    /// Requires `MANAGE_CHANNELS`.
    async fn create_guild_channel(
        &self,
        guild_id: Snowflake,
        body: &CreateChannel,
        reason: Option<&str>,
    ) -> Result<Channel, MelisaError>;

    async fn active_threads(&self, guild_id: Snowflake) -> Result<ThreadsList, MelisaError>;

    async fn fetch_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Result<GuildMember, MelisaError>;

    async fn modify_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        body: &ModifyGuildMember,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    /// Kick. Requires `KICK_MEMBERS`.
    async fn remove_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    /// Requires `BAN_MEMBERS`. `delete_message_days` is clamped to 0..=7.
    async fn create_guild_ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: Option<u8>,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    async fn remove_guild_ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    /// Requires `MANAGE_ROLES`.
    async fn add_guild_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    async fn remove_guild_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;
}

#[async_trait]
impl GuildsApi for RestApp {
    async fn fetch_guild(&self, guild_id: Snowflake) -> Result<Guild, MelisaError> {
        let value = self.http.get(&format!("guilds/{guild_id}")).await?;
        let mut guild = Guild::from_value(value.unwrap_or_default())?;
        guild.inject_rest(self.clone());
        Ok(guild)
    }

    async fn create_guild_channel(
        &self,
        guild_id: Snowflake,
        body: &CreateChannel,
        reason: Option<&str>,
    ) -> Result<Channel, MelisaError> {
        let mut channel: Channel = self
            .http
            .request_json(
                Method::POST,
                &format!("guilds/{guild_id}/channels"),
                RequestBody::json(body)?,
                reason,
            )
            .await?;
        channel.inject_rest(self.clone());
        Ok(channel)
    }

    async fn active_threads(&self, guild_id: Snowflake) -> Result<ThreadsList, MelisaError> {
        let mut list: ThreadsList = self
            .http
            .request_json(
                Method::GET,
                &format!("guilds/{guild_id}/threads/active"),
                RequestBody::Empty,
                None,
            )
            .await?;
        list.inject_rest(self.clone());
        Ok(list)
    }

    async fn fetch_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Result<GuildMember, MelisaError> {
        let mut member: GuildMember = self
            .http
            .request_json(
                Method::GET,
                &format!("guilds/{guild_id}/members/{user_id}"),
                RequestBody::Empty,
                None,
            )
            .await?;
        member.guild_id = Some(guild_id);
        member.inject_rest(self.clone());
        Ok(member)
    }

    async fn modify_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        body: &ModifyGuildMember,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .patch(
                &format!("guilds/{guild_id}/members/{user_id}"),
                RequestBody::json(body)?,
                reason,
            )
            .await?;
        Ok(())
    }

    async fn remove_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .delete(&format!("guilds/{guild_id}/members/{user_id}"), reason)
            .await?;
        Ok(())
    }

    async fn create_guild_ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: Option<u8>,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        let body = match delete_message_days {
            Some(days) => RequestBody::Json(json!({ "delete_message_days": days.min(7) })),
            None => RequestBody::Empty,
        };
        self.http
            .put(&format!("guilds/{guild_id}/bans/{user_id}"), body, reason)
            .await?;
        Ok(())
    }

    async fn remove_guild_ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .delete(&format!("guilds/{guild_id}/bans/{user_id}"), reason)
            .await?;
        Ok(())
    }

    async fn add_guild_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .put(
                &format!("guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
                RequestBody::Empty,
                reason,
            )
            .await?;
        Ok(())
    }

    async fn remove_guild_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .delete(
                &format!("guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
                reason,
            )
            .await?;
        Ok(())
    }
}
