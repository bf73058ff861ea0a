use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use crate::{
    client::{RequestBody, RestApp},
    error::MelisaError,
    types::{
        message::{CreateMessage, Message},
        snowflake::Snowflake,
    },
    util::append_query,
};

/// Query of `GET channels/{id}/messages`. Discord honors only one of
/// `before`, `after` and `around`.
#[derive(Debug, Default, Serialize)]
pub struct FetchMessagesOptions {
    /// 1-100, defaults to 50 on Discord's side.
    pub limit: Option<u8>,
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub around: Option<Snowflake>,
}

/// Trait that holds the methods for message endpoints.
#[async_trait]
pub trait MessagesApi {
    /// Fetch up to 100 messages from the given channel, newest first.
    async fn fetch_messages(
        &self,
        channel_id: Snowflake,
        opts: &FetchMessagesOptions,
    ) -> Result<Vec<Message>, MelisaError>;

    async fn fetch_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<Message, MelisaError>;

    /// Send a message. A nonce is generated when none is given.
    async fn create_message(
        &self,
        channel_id: Snowflake,
        message: CreateMessage,
    ) -> Result<Message, MelisaError>;

    async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    async fn pin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;

    async fn unpin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError>;
}

/// JSON when there is nothing to upload, multipart otherwise.
pub(crate) fn message_body(message: &CreateMessage) -> Result<RequestBody, MelisaError> {
    let payload = message.payload_json()?;
    if message.files.is_empty() {
        Ok(RequestBody::Json(payload))
    } else {
        Ok(RequestBody::Multipart {
            payload,
            files: message.files.clone(),
        })
    }
}

#[async_trait]
impl MessagesApi for RestApp {
    async fn fetch_messages(
        &self,
        channel_id: Snowflake,
        opts: &FetchMessagesOptions,
    ) -> Result<Vec<Message>, MelisaError> {
        let route = append_query(&format!("channels/{channel_id}/messages"), opts)?;
        let mut messages: Vec<Message> = self
            .http
            .request_json(Method::GET, &route, RequestBody::Empty, None)
            .await?;

        // Attach the client reference to each message (OO style)
        for message in &mut messages {
            message.inject_rest(self.clone());
        }
        Ok(messages)
    }

    async fn fetch_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<Message, MelisaError> {
        let mut message: Message = self
            .http
            .request_json(
                Method::GET,
                &format!("channels/{channel_id}/messages/{message_id}"),
                RequestBody::Empty,
                None,
            )
            .await?;
        message.inject_rest(self.clone());
        Ok(message)
    }

    async fn create_message(
        &self,
        channel_id: Snowflake,
        mut message: CreateMessage,
    ) -> Result<Message, MelisaError> {
        message.validate()?;

        // Generate nonce if not provided
        if message.nonce.is_none() {
            let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
            message.nonce = Some(Snowflake::from_unix_millis(now).to_string());
        }

        let mut sent: Message = self
            .http
            .request_json(
                Method::POST,
                &format!("channels/{channel_id}/messages"),
                message_body(&message)?,
                None,
            )
            .await?;
        sent.inject_rest(self.clone());
        Ok(sent)
    }

    async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .delete(
                &format!("channels/{channel_id}/messages/{message_id}"),
                reason,
            )
            .await?;
        Ok(())
    }

    async fn pin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .put(
                &format!("channels/{channel_id}/pins/{message_id}"),
                RequestBody::Empty,
                reason,
            )
            .await?;
        Ok(())
    }

    async fn unpin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), MelisaError> {
        self.http
            .delete(&format!("channels/{channel_id}/pins/{message_id}"), reason)
            .await?;
        Ok(())
    }
}
