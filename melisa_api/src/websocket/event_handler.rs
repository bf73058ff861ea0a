use std::error::Error;

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;

use crate::{
    client::Client,
    error::ListenerError,
    types::{
        channel::Channel,
        guild::{Guild, UnavailableGuild},
        interaction::Interaction,
        message::Message,
    },
};

/// Everything a client hands to its [`EventHandler`] and waiters.
#[derive(Debug, Clone)]
pub enum Event {
    /// A shard finished identifying.
    ShardReady(u32),
    GuildCreate(Guild),
    /// `old` is the cached guild, if it was cached.
    GuildUpdate { old: Option<Guild>, new: Guild },
    /// Left, kicked, or the guild became unavailable.
    GuildRemove(UnavailableGuild),
    ChannelCreate(Channel),
    ChannelUpdate { old: Option<Channel>, new: Channel },
    ChannelDelete(Channel),
    MessageCreate(Message),
    InteractionCreate(Interaction),
    /// A dispatch without a dedicated listener.
    Raw { name: String, data: Value },
}

impl Event {
    /// Name of the listener method this event goes to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShardReady(_) => "on_shard_ready",
            Self::GuildCreate(_) => "on_guild_create",
            Self::GuildUpdate { .. } => "on_guild_update",
            Self::GuildRemove(_) => "on_guild_remove",
            Self::ChannelCreate(_) => "on_channel_create",
            Self::ChannelUpdate { .. } => "on_channel_update",
            Self::ChannelDelete(_) => "on_channel_delete",
            Self::MessageCreate(_) => "on_message_create",
            Self::InteractionCreate(_) => "on_interaction_create",
            Self::Raw { .. } => "on_raw_event",
        }
    }
}

/// An EventHandler-like trait. This is analogous to Serenity's EventHandler.
///
/// Every listener may fail; errors and panics end up in [`on_error`](Self::on_error)
/// and never stop the gateway.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Called for *every* event, before its dedicated listener.
    async fn on_event(&self, _client: &Client, _event: &Event) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_shard_ready(&self, _client: &Client, _shard_id: u32) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_guild_create(&self, _client: &Client, _guild: &Guild) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_guild_update(
        &self,
        _client: &Client,
        _old: Option<&Guild>,
        _new: &Guild,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_guild_remove(
        &self,
        _client: &Client,
        _guild: &UnavailableGuild,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_channel_create(
        &self,
        _client: &Client,
        _channel: &Channel,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_channel_update(
        &self,
        _client: &Client,
        _old: Option<&Channel>,
        _new: &Channel,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_channel_delete(
        &self,
        _client: &Client,
        _channel: &Channel,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_message_create(
        &self,
        _client: &Client,
        _message: &Message,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_interaction_create(
        &self,
        _client: &Client,
        _interaction: &Interaction,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_raw_event(
        &self,
        _client: &Client,
        _name: &str,
        _data: &Value,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Called when a listener returns an error or panics.
    async fn on_error(
        &self,
        _client: &Client,
        event_name: &str,
        error: &(dyn Error + Send + Sync),
    ) {
        report_listener_error(event_name, error);
    }
}

/// What the default [`EventHandler::on_error`] does: print the error chain to
/// stderr and log it.
pub fn report_listener_error(event_name: &str, error: &(dyn Error + Send + Sync)) {
    eprintln!("Ignoring exception in {event_name}:");
    eprintln!("  {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    error!(event = event_name, %error, "listener failed");
}

/// Run `on_event` and then the listener matching `event`.
pub(crate) async fn call_listener(
    handler: &dyn EventHandler,
    client: &Client,
    event: &Event,
) -> Result<(), ListenerError> {
    handler.on_event(client, event).await?;

    match event {
        Event::ShardReady(shard_id) => handler.on_shard_ready(client, *shard_id).await,
        Event::GuildCreate(guild) => handler.on_guild_create(client, guild).await,
        Event::GuildUpdate { old, new } => {
            handler.on_guild_update(client, old.as_ref(), new).await
        }
        Event::GuildRemove(guild) => handler.on_guild_remove(client, guild).await,
        Event::ChannelCreate(channel) => handler.on_channel_create(client, channel).await,
        Event::ChannelUpdate { old, new } => {
            handler.on_channel_update(client, old.as_ref(), new).await
        }
        Event::ChannelDelete(channel) => handler.on_channel_delete(client, channel).await,
        Event::MessageCreate(message) => handler.on_message_create(client, message).await,
        Event::InteractionCreate(interaction) => {
            handler.on_interaction_create(client, interaction).await
        }
        Event::Raw { name, data } => handler.on_raw_event(client, name, data).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::snowflake::Snowflake;

    #[test]
    fn names_match_listeners() {
        assert_eq!(Event::ShardReady(0).name(), "on_shard_ready");
        assert_eq!(
            Event::GuildRemove(UnavailableGuild {
                id: Snowflake(1),
                unavailable: false
            })
            .name(),
            "on_guild_remove"
        );
        assert_eq!(
            Event::Raw {
                name: "TYPING_START".into(),
                data: Value::Null
            }
            .name(),
            "on_raw_event"
        );
    }
}
