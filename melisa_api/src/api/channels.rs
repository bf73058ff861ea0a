use async_trait::async_trait;
use reqwest::Method;

use crate::{
    client::{RequestBody, RestApp},
    error::MelisaError,
    types::{channel::Channel, snowflake::Snowflake, webhook::Webhook},
};

/// Channel endpoints that are not about messages.
#[async_trait]
pub trait ChannelsApi {
    async fn fetch_channel(&self, channel_id: Snowflake) -> Result<Channel, MelisaError>;

    /// Delete a guild channel or close a DM. Returns the deleted channel.
    async fn delete_channel(
        &self,
        channel_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<Channel, MelisaError>;

    /// Show the typing indicator for ~10 seconds.
    async fn trigger_typing(&self, channel_id: Snowflake) -> Result<(), MelisaError>;

    async fn fetch_channel_webhooks(&self, channel_id: Snowflake)
        -> Result<Vec<Webhook>, MelisaError>;
}

#[async_trait]
impl ChannelsApi for RestApp {
    async fn fetch_channel(&self, channel_id: Snowflake) -> Result<Channel, MelisaError> {
        let mut channel: Channel = self
            .http
            .request_json(
                Method::GET,
                &format!("channels/{channel_id}"),
                RequestBody::Empty,
                None,
            )
            .await?;
        channel.inject_rest(self.clone());
        Ok(channel)
    }

    async fn delete_channel(
        &self,
        channel_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<Channel, MelisaError> {
        let mut channel: Channel = self
            .http
            .request_json(
                Method::DELETE,
                &format!("channels/{channel_id}"),
                RequestBody::Empty,
                reason,
            )
            .await?;
        channel.inject_rest(self.clone());
        Ok(channel)
    }

    async fn trigger_typing(&self, channel_id: Snowflake) -> Result<(), MelisaError> {
        self.http
            .post(&format!("channels/{channel_id}/typing"), RequestBody::Empty, None)
            .await?;
        Ok(())
    }

    async fn fetch_channel_webhooks(
        &self,
        channel_id: Snowflake,
    ) -> Result<Vec<Webhook>, MelisaError> {
        let mut hooks: Vec<Webhook> = self
            .http
            .request_json(
                Method::GET,
                &format!("channels/{channel_id}/webhooks"),
                RequestBody::Empty,
                None,
            )
            .await?;
        for hook in &mut hooks {
            hook.inject_rest(self.clone());
        }
        Ok(hooks)
    }
}
