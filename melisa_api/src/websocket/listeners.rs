//! Turn raw dispatches into cache updates and [`Event`]s.

use serde_json::Value;
use tracing::debug;

use crate::{
    client::Client,
    error::MelisaError,
    types::{
        channel::Channel,
        guild::{Guild, UnavailableGuild},
        interaction::Interaction,
        message::Message,
        websocket::Ready,
    },
    websocket::event_handler::Event,
};

/// Apply one dispatch to the client state and build the event for it.
pub(crate) async fn handle_dispatch(
    client: &Client,
    shard_id: u32,
    name: &str,
    data: Value,
) -> Result<Event, MelisaError> {
    match name {
        "READY" => ready(client, shard_id, data).await,
        "GUILD_CREATE" => guild_create(client, data),
        "GUILD_UPDATE" => guild_update(client, data),
        "GUILD_DELETE" => guild_delete(client, data),
        "CHANNEL_CREATE" => channel_create(client, data),
        "CHANNEL_UPDATE" => channel_update(client, data),
        "CHANNEL_DELETE" => channel_delete(client, data),
        "MESSAGE_CREATE" => message_create(client, data),
        "INTERACTION_CREATE" => interaction_create(client, data),
        _ => {
            debug!(shard_id, event = name, "no listener for dispatch");
            Ok(Event::Raw {
                name: name.to_string(),
                data,
            })
        }
    }
}

async fn ready(client: &Client, shard_id: u32, data: Value) -> Result<Event, MelisaError> {
    let ready: Ready = serde_json::from_value(data)?;

    // Every shard sends READY; the placeholders only go in once.
    if client.mark_guilds_announced() {
        client.cache().set_none_guilds(&ready.guilds);
    }

    let mut user = ready.user;
    user.inject_rest(client.rest().clone());
    client.cache().set_user(user.clone());
    client.set_current_user(user).await;

    Ok(Event::ShardReady(shard_id))
}

fn guild_create(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut guild = Guild::from_value(data)?;
    guild.inject_rest(client.rest().clone());
    client.cache().set_guild(guild.clone());
    Ok(Event::GuildCreate(guild))
}

fn guild_update(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut new = Guild::from_value(data)?;
    new.inject_rest(client.rest().clone());

    let old = client.cache().get_guild(new.id);
    // GUILD_UPDATE carries no channels, members or threads.
    let mut cached = new.clone();
    if let Some(old) = &old {
        if cached.channels.is_empty() {
            cached.channels = old.channels.clone();
        }
        if cached.members.is_empty() {
            cached.members = old.members.clone();
        }
        if cached.threads.is_empty() {
            cached.threads = old.threads.clone();
        }
    }
    client.cache().set_guild(cached);

    Ok(Event::GuildUpdate { old, new })
}

fn guild_delete(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let guild: UnavailableGuild = serde_json::from_value(data)?;
    client.cache().remove_guild(guild.id);
    Ok(Event::GuildRemove(guild))
}

fn channel_create(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut channel: Channel = serde_json::from_value(data)?;
    channel.inject_rest(client.rest().clone());

    if channel.is_guild_channel() {
        client.cache().set_guild_channel(channel.clone());
    } else {
        client.cache().set_dm_channel(channel.clone());
    }
    Ok(Event::ChannelCreate(channel))
}

fn channel_update(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut new: Channel = serde_json::from_value(data)?;
    new.inject_rest(client.rest().clone());

    let old = client.cache().get_guild_channel(new.id);
    if !new.kind.is_private() {
        client.cache().set_guild_channel(new.clone());
    }
    Ok(Event::ChannelUpdate { old, new })
}

fn channel_delete(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut channel: Channel = serde_json::from_value(data)?;
    channel.inject_rest(client.rest().clone());
    client.cache().remove_guild_channel(channel.id);
    Ok(Event::ChannelDelete(channel))
}

fn message_create(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut message: Message = serde_json::from_value(data)?;
    message.inject_rest(client.rest().clone());

    if message.guild_id.is_some() {
        client
            .cache()
            .set_guild_channel_last_message_id(message.channel_id, message.id);
    }
    Ok(Event::MessageCreate(message))
}

fn interaction_create(client: &Client, data: Value) -> Result<Event, MelisaError> {
    let mut interaction: Interaction = serde_json::from_value(data)?;
    interaction.inject_rest(client.rest().clone());
    Ok(Event::InteractionCreate(interaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{intents::Intents, snowflake::Snowflake};
    use serde_json::json;

    fn client() -> Client {
        Client::builder("token")
            .intents(Intents::GUILDS)
            .logs(None)
            .build()
            .unwrap()
    }

    fn guild_payload() -> Value {
        json!({
            "id": "100",
            "name": "melisa",
            "channels": [{"id": "200", "name": "general", "type": 0}]
        })
    }

    #[tokio::test]
    async fn ready_announces_guilds_once() {
        let client = client();
        let ready = json!({
            "v": 10,
            "user": {"id": "1", "username": "bot", "discriminator": "0001"},
            "guilds": [{"id": "100", "unavailable": true}],
            "session_id": "abc",
            "resume_gateway_url": "wss://resume.discord.gg"
        });

        let event = handle_dispatch(&client, 0, "READY", ready.clone()).await.unwrap();
        assert!(matches!(event, Event::ShardReady(0)));
        assert!(client.cache().get_guild(Snowflake(100)).unwrap().unavailable);
        assert_eq!(client.user().await.unwrap().id, Snowflake(1));

        // A full guild arrives, then a second shard's READY must not clobber it.
        handle_dispatch(&client, 0, "GUILD_CREATE", guild_payload()).await.unwrap();
        handle_dispatch(&client, 1, "READY", ready).await.unwrap();
        assert!(!client.cache().get_guild(Snowflake(100)).unwrap().unavailable);
    }

    #[tokio::test]
    async fn guild_update_keeps_cached_channels() {
        let client = client();
        handle_dispatch(&client, 0, "GUILD_CREATE", guild_payload()).await.unwrap();

        let event = handle_dispatch(
            &client,
            0,
            "GUILD_UPDATE",
            json!({"id": "100", "name": "renamed"}),
        )
        .await
        .unwrap();

        let Event::GuildUpdate { old, new } = event else {
            panic!("expected a guild update");
        };
        assert_eq!(old.unwrap().name, "melisa");
        assert_eq!(new.name, "renamed");
        assert!(client.cache().get_guild_channel(Snowflake(200)).is_some());
    }

    #[tokio::test]
    async fn channel_lifecycle_updates_cache() {
        let client = client();
        handle_dispatch(&client, 0, "GUILD_CREATE", guild_payload()).await.unwrap();

        let created = json!({"id": "201", "name": "new", "type": 0, "guild_id": "100"});
        handle_dispatch(&client, 0, "CHANNEL_CREATE", created.clone()).await.unwrap();
        assert_eq!(client.cache().guild_channels_count(), 2);

        handle_dispatch(
            &client,
            0,
            "MESSAGE_CREATE",
            json!({
                "id": "300", "channel_id": "201", "guild_id": "100",
                "content": "hi", "timestamp": "2022-04-12T07:33:04+00:00"
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            client
                .cache()
                .get_guild_channel(Snowflake(201))
                .unwrap()
                .last_message_id,
            Some(Snowflake(300))
        );

        handle_dispatch(&client, 0, "CHANNEL_DELETE", created).await.unwrap();
        assert_eq!(client.cache().guild_channels_count(), 1);
    }

    #[tokio::test]
    async fn unknown_dispatch_is_raw() {
        let client = client();
        let event = handle_dispatch(&client, 0, "TYPING_START", json!({"x": 1}))
            .await
            .unwrap();
        assert!(matches!(event, Event::Raw { name, .. } if name == "TYPING_START"));
    }
}
