use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::{
    client::{RequestBody, RestApp},
    error::MelisaError,
    types::{channel::Channel, snowflake::Snowflake, user::User},
};

/// User endpoints.
#[async_trait]
pub trait UsersApi {
    async fn fetch_user(&self, user_id: Snowflake) -> Result<User, MelisaError>;

    /// The bot user itself.
    async fn fetch_current_user(&self) -> Result<User, MelisaError>;

    /// Open a DM with `recipient_id`, or return the existing one.
    async fn create_dm_channel(&self, recipient_id: Snowflake) -> Result<Channel, MelisaError>;
}

#[async_trait]
impl UsersApi for RestApp {
    async fn fetch_user(&self, user_id: Snowflake) -> Result<User, MelisaError> {
        let mut user: User = self
            .http
            .request_json(Method::GET, &format!("users/{user_id}"), RequestBody::Empty, None)
            .await?;
        user.inject_rest(self.clone());
        Ok(user)
    }

    async fn fetch_current_user(&self) -> Result<User, MelisaError> {
        let mut user: User = self
            .http
            .request_json(Method::GET, "users/@me", RequestBody::Empty, None)
            .await?;
        user.inject_rest(self.clone());
        Ok(user)
    }

    async fn create_dm_channel(&self, recipient_id: Snowflake) -> Result<Channel, MelisaError> {
        let body = RequestBody::Json(json!({ "recipient_id": recipient_id }));
        let mut channel: Channel = self
            .http
            .request_json(Method::POST, "users/@me/channels", body, None)
            .await?;
        channel.inject_rest(self.clone());
        Ok(channel)
    }
}
