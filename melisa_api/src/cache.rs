//! In-memory cache shared by every shard of a [`Client`](crate::client::Client).
//!
//! Guild channels live inside their [`Guild`]; a symlink map from channel id to
//! guild id lets them be found without knowing the guild.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::types::{
    channel::{Channel, ChannelType},
    guild::{Guild, UnavailableGuild},
    snowflake::Snowflake,
    user::User,
};

/// Which guild channels are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelsCachingPolicy {
    All,
    None,
    Types(HashSet<ChannelType>),
}

impl ChannelsCachingPolicy {
    pub fn types(types: impl IntoIterator<Item = ChannelType>) -> Self {
        Self::Types(types.into_iter().collect())
    }

    pub fn allows(&self, kind: ChannelType) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Types(types) => types.contains(&kind),
        }
    }
}

impl Default for ChannelsCachingPolicy {
    fn default() -> Self {
        Self::types([ChannelType::GuildText])
    }
}

#[derive(Debug, Default)]
struct CacheState {
    guilds: HashMap<Snowflake, Guild>,
    users: HashMap<Snowflake, User>,
    dm_channels: HashMap<Snowflake, Channel>,
    /// Guild channel id to guild id.
    channel_symlinks: HashMap<Snowflake, Snowflake>,
}

/// Cheap to clone; clones share the same storage.
#[derive(Debug, Clone)]
pub struct CacheManager {
    disabled: bool,
    policy: ChannelsCachingPolicy,
    state: Arc<RwLock<CacheState>>,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManager {
    pub fn new() -> Self {
        Self::with_policy(ChannelsCachingPolicy::default())
    }

    /// Every setter becomes a no-op and every getter returns `None`.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::new()
        }
    }

    pub fn with_policy(policy: ChannelsCachingPolicy) -> Self {
        Self {
            disabled: false,
            policy,
            state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn policy(&self) -> &ChannelsCachingPolicy {
        &self.policy
    }

    /* ───────────────────────────── Counts ───────────────────────────── */

    pub fn guilds_count(&self) -> usize {
        self.state.read().guilds.len()
    }

    pub fn users_count(&self) -> usize {
        self.state.read().users.len()
    }

    pub fn guild_channels_count(&self) -> usize {
        self.state.read().channel_symlinks.len()
    }

    pub fn total_channels_count(&self) -> usize {
        let state = self.state.read();
        state.dm_channels.len() + state.channel_symlinks.len()
    }

    /* ───────────────────────────── Guilds ───────────────────────────── */

    /// Store a guild, keeping only the channels the policy allows.
    pub fn set_guild(&self, mut guild: Guild) {
        if self.disabled {
            return;
        }

        let mut state = self.state.write();

        // Symlinks left over from a previous copy of this guild.
        if let Some(old) = state.guilds.get(&guild.id) {
            let stale: Vec<Snowflake> = old.channels.keys().copied().collect();
            for id in stale {
                state.channel_symlinks.remove(&id);
            }
        }

        guild.channels.retain(|_, channel| self.policy.allows(channel.kind));
        for channel_id in guild.channels.keys() {
            state.channel_symlinks.insert(*channel_id, guild.id);
        }

        trace!(guild_id = %guild.id, channels = guild.channels.len(), "cached guild");
        state.guilds.insert(guild.id, guild);
    }

    pub fn get_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        if self.disabled {
            return None;
        }
        self.state.read().guilds.get(&guild_id).cloned()
    }

    /// Insert placeholders for the guilds announced by READY.
    pub fn set_none_guilds(&self, guilds: &[UnavailableGuild]) {
        if self.disabled {
            return;
        }

        let mut state = self.state.write();
        for guild in guilds {
            state.guilds.insert(guild.id, Guild::unavailable(guild.id));
        }
    }

    pub fn remove_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        if self.disabled {
            return None;
        }

        let mut state = self.state.write();
        let guild = state.guilds.remove(&guild_id)?;
        state.channel_symlinks.retain(|_, owner| *owner != guild_id);
        Some(guild)
    }

    /* ────────────────────────── Guild channels ────────────────────────── */

    /// Store a channel inside its cached guild. Ignored when the guild is not
    /// cached. A channel whose type the policy rejects is evicted instead.
    pub fn set_guild_channel(&self, channel: Channel) {
        if self.disabled {
            return;
        }
        if !self.policy.allows(channel.kind) {
            self.remove_guild_channel(channel.id);
            return;
        }
        let Some(guild_id) = channel.guild_id else {
            return;
        };

        let mut state = self.state.write();
        let Some(guild) = state.guilds.get_mut(&guild_id) else {
            return;
        };
        let channel_id = channel.id;
        guild.channels.insert(channel_id, channel);
        state.channel_symlinks.insert(channel_id, guild_id);
    }

    pub fn get_guild_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if self.disabled {
            return None;
        }

        let state = self.state.read();
        let guild_id = state.channel_symlinks.get(&channel_id)?;
        state.guilds.get(guild_id)?.channels.get(&channel_id).cloned()
    }

    pub fn remove_guild_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if self.disabled {
            return None;
        }

        let mut state = self.state.write();
        let guild_id = state.channel_symlinks.remove(&channel_id)?;
        state.guilds.get_mut(&guild_id)?.channels.remove(&channel_id)
    }

    pub fn set_guild_channel_last_message_id(&self, channel_id: Snowflake, message_id: Snowflake) {
        if self.disabled {
            return;
        }

        let mut state = self.state.write();
        let Some(guild_id) = state.channel_symlinks.get(&channel_id).copied() else {
            return;
        };
        if let Some(channel) = state
            .guilds
            .get_mut(&guild_id)
            .and_then(|guild| guild.channels.get_mut(&channel_id))
        {
            channel.last_message_id = Some(message_id);
        }
    }

    /* ───────────────────────── Users and DMs ───────────────────────── */

    pub fn set_user(&self, user: User) {
        if self.disabled {
            return;
        }
        self.state.write().users.insert(user.id, user);
    }

    pub fn get_user(&self, user_id: Snowflake) -> Option<User> {
        if self.disabled {
            return None;
        }
        self.state.read().users.get(&user_id).cloned()
    }

    pub fn set_dm_channel(&self, channel: Channel) {
        if self.disabled {
            return;
        }
        self.state.write().dm_channels.insert(channel.id, channel);
    }

    pub fn get_dm_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if self.disabled {
            return None;
        }
        self.state.read().dm_channels.get(&channel_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guild_with_channels() -> Guild {
        Guild::from_value(json!({
            "id": "123",
            "name": "test",
            "channels": [
                {"id": "456", "name": "general", "type": 0},
                {"id": "457", "name": "voice", "type": 2}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn default_policy_keeps_text_channels() {
        let cache = CacheManager::new();
        cache.set_guild(guild_with_channels());

        assert_eq!(cache.guild_channels_count(), 1);
        assert!(cache.get_guild_channel(Snowflake(456)).is_some());
        assert!(cache.get_guild_channel(Snowflake(457)).is_none());
    }

    #[test]
    fn none_policy_drops_channels() {
        let cache = CacheManager::with_policy(ChannelsCachingPolicy::None);
        cache.set_guild(guild_with_channels());

        let guild = cache.get_guild(Snowflake(123)).unwrap();
        assert!(guild.channels.is_empty());
        assert_eq!(cache.total_channels_count(), 0);
    }

    #[test]
    fn remove_guild_drops_symlinks() {
        let cache = CacheManager::with_policy(ChannelsCachingPolicy::All);
        cache.set_guild(guild_with_channels());
        assert_eq!(cache.guild_channels_count(), 2);

        let removed = cache.remove_guild(Snowflake(123)).unwrap();
        assert_eq!(removed.name, "test");
        assert_eq!(cache.guild_channels_count(), 0);
        assert!(cache.get_guild_channel(Snowflake(456)).is_none());
    }

    #[test]
    fn last_message_id_updates_cached_channel() {
        let cache = CacheManager::new();
        cache.set_guild(guild_with_channels());
        cache.set_guild_channel_last_message_id(Snowflake(456), Snowflake(999));

        let channel = cache.get_guild_channel(Snowflake(456)).unwrap();
        assert_eq!(channel.last_message_id, Some(Snowflake(999)));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = CacheManager::disabled();
        cache.set_guild(guild_with_channels());
        cache.set_none_guilds(&[UnavailableGuild {
            id: Snowflake(1),
            unavailable: true,
        }]);

        assert_eq!(cache.guilds_count(), 0);
        assert!(cache.get_guild(Snowflake(123)).is_none());
    }

    #[test]
    fn type_change_out_of_policy_evicts_channel() {
        let cache = CacheManager::new();
        cache.set_guild(guild_with_channels());
        assert!(cache.get_guild_channel(Snowflake(456)).is_some());

        let as_voice: Channel = serde_json::from_value(json!({
            "id": "456",
            "name": "general",
            "type": 2,
            "guild_id": "123"
        }))
        .unwrap();
        cache.set_guild_channel(as_voice);

        assert!(cache.get_guild_channel(Snowflake(456)).is_none());
        assert_eq!(cache.guild_channels_count(), 0);
        let guild = cache.get_guild(Snowflake(123)).unwrap();
        assert!(!guild.channels.contains_key(&Snowflake(456)));
    }
}
