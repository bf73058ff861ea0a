use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::{
    api::messages::message_body,
    client::{RequestBody, RestApp},
    error::MelisaError,
    types::{
        message::{CreateMessage, Message},
        snowflake::Snowflake,
        webhook::{validate_webhook_name, Webhook},
    },
    util::image_data_uri,
};

#[async_trait]
pub trait WebhooksApi {
    /// Requires `MANAGE_WEBHOOKS`. `avatar` is raw png, jpeg, gif or webp bytes.
    async fn create_webhook(
        &self,
        channel_id: Snowflake,
        name: &str,
        avatar: Option<&[u8]>,
        reason: Option<&str>,
    ) -> Result<Webhook, MelisaError>;

    async fn fetch_webhook(&self, webhook_id: Snowflake) -> Result<Webhook, MelisaError>;

    async fn delete_webhook(
        &self,
        webhook_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    /// With `wait`, Discord confirms the send and returns the message.
    async fn execute_webhook(
        &self,
        webhook_id: Snowflake,
        token: &str,
        message: CreateMessage,
        wait: bool,
    ) -> Result<Option<Message>, MelisaError>;
}

#[async_trait]
impl WebhooksApi for RestApp {
    async fn create_webhook(
        &self,
        channel_id: Snowflake,
        name: &str,
        avatar: Option<&[u8]>,
        reason: Option<&str>,
    ) -> Result<Webhook, MelisaError> {
        validate_webhook_name(name)?;

        let mut body = json!({ "name": name });
        if let Some(bytes) = avatar {
            body["avatar"] = image_data_uri(bytes)?.into();
        }

        let mut hook: Webhook = self
            .http
            .request_json(
                Method::POST,
                &format!("channels/{channel_id}/webhooks"),
                RequestBody::Json(body),
                reason,
            )
            .await?;
        hook.inject_rest(self.clone());
        Ok(hook)
    }

    async fn fetch_webhook(&self, webhook_id: Snowflake) -> Result<Webhook, MelisaError> {
        let mut hook: Webhook = self
            .http
            .request_json(
                Method::GET,
                &format!("webhooks/{webhook_id}"),
                RequestBody::Empty,
                None,
            )
            .await?;
        hook.inject_rest(self.clone());
        Ok(hook)
    }

    async fn delete_webhook(
        &self,
        webhook_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .delete(&format!("webhooks/{webhook_id}"), reason)
            .await?;
        Ok(())
    }

    async fn execute_webhook(
        &self,
        webhook_id: Snowflake,
        token: &str,
        message: CreateMessage,
        wait: bool,
    ) -> Result<Option<Message>, MelisaError> {
        message.validate()?;
        let route = format!("webhooks/{webhook_id}/{token}?wait={wait}");

        let value = self
            .http
            .post(&route, message_body(&message)?, None)
            .await?;

        match value {
            Some(value) => {
                let mut sent: Message = serde_json::from_value(value)?;
                sent.inject_rest(self.clone());
                Ok(Some(sent))
            }
            None => Ok(None),
        }
    }
}
