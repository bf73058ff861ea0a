use serde::{Deserialize, Serialize};

use crate::{
    api::webhooks::WebhooksApi,
    client::RestApp,
    error::MelisaError,
    types::{
        message::{CreateMessage, Message},
        snowflake::Snowflake,
        user::User,
    },
    util::enum_number,
};

enum_number! {
    pub enum WebhookType: u8 {
        /// Posts messages to channels with a token.
        Incoming = 1,
        /// Posts followed news channel messages into this channel.
        ChannelFollower = 2,
        /// Used with interactions.
        Application = 3,
    }
}

/// Partial guild or channel attached to follower webhooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookSource {
    pub id: Snowflake,
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: WebhookType,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub user: Option<User>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Only present for incoming webhooks.
    pub token: Option<String>,
    pub application_id: Option<Snowflake>,
    pub source_guild: Option<WebhookSource>,
    pub source_channel: Option<WebhookSource>,
    pub url: Option<String>,

    #[serde(skip)]
    pub rest: Option<RestApp>,
}

/// Check a webhook name: 1 to 80 characters, and never containing "clyde".
pub fn validate_webhook_name(name: &str) -> Result<(), MelisaError> {
    let len = name.chars().count();
    if !(1..=80).contains(&len) {
        return Err(MelisaError::InvalidArgument(
            "Webhook name must be 1-80 characters".into(),
        ));
    }
    if name.to_lowercase().contains("clyde") {
        return Err(MelisaError::InvalidArgument(
            "Webhook name cannot contain `clyde`".into(),
        ));
    }
    Ok(())
}

impl Webhook {
    pub fn inject_rest(&mut self, rest: RestApp) {
        if let Some(user) = self.user.as_mut() {
            user.inject_rest(rest.clone());
        }
        self.rest = Some(rest);
    }

    fn rest(&self) -> Result<&RestApp, MelisaError> {
        self.rest.as_ref().ok_or(MelisaError::ClientNotAttached)
    }

    /// Create a webhook in `channel_id`. Requires `MANAGE_WEBHOOKS`.
    pub async fn create(
        rest: &RestApp,
        channel_id: Snowflake,
        name: &str,
        avatar: Option<&[u8]>,
        reason: Option<&str>,
    ) -> Result<Webhook, MelisaError> {
        rest.create_webhook(channel_id, name, avatar, reason).await
    }

    pub async fn delete(&self, reason: Option<&str>) -> Result<(), MelisaError> {
        self.rest()?.delete_webhook(self.id, reason).await
    }

    /// Post a message through this webhook. With `wait` Discord returns the
    /// created message.
    pub async fn execute(
        &self,
        message: CreateMessage,
        wait: bool,
    ) -> Result<Option<Message>, MelisaError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| MelisaError::InvalidArgument("Webhook has no token".into()))?;
        self.rest()?
            .execute_webhook(self.id, token, message, wait)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(validate_webhook_name("Captain Hook").is_ok());
        assert!(validate_webhook_name("").is_err());
        assert!(validate_webhook_name("my ClYdE").is_err());
        assert!(validate_webhook_name(&"x".repeat(81)).is_err());
    }

    #[test]
    fn parses_incoming_webhook() {
        let hook: Webhook = serde_json::from_str(
            r#"{"id": "1", "type": 1, "channel_id": "2", "name": "hook", "token": "abc"}"#,
        )
        .unwrap();
        assert_eq!(hook.kind, WebhookType::Incoming);
        assert_eq!(hook.token.as_deref(), Some("abc"));
    }
}
