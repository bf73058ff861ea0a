use bitflags::bitflags;

use crate::util::bitflags_serde;

bitflags! {
    /// Gateway intents select which events Discord pushes to a shard.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        const GUILDS = 1 << 0;
        /// Privileged.
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_BANS = 1 << 2;
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        const GUILD_INTEGRATIONS = 1 << 4;
        const GUILD_WEBHOOKS = 1 << 5;
        const GUILD_INVITES = 1 << 6;
        const GUILD_VOICE_STATES = 1 << 7;
        /// Privileged.
        const GUILD_PRESENCES = 1 << 8;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING = 1 << 11;
        const DIRECT_MESSAGES = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        /// Privileged.
        const MESSAGE_CONTENT = 1 << 15;
        const GUILD_SCHEDULED_EVENTS = 1 << 16;
        const AUTO_MODERATION_CONFIGURATION = 1 << 20;
        const AUTO_MODERATION_EXECUTION = 1 << 21;
    }
}

bitflags_serde!(Intents: u32);

impl Intents {
    /// Intents that must be switched on in the developer portal.
    pub fn privileged() -> Self {
        Self::GUILD_MEMBERS | Self::GUILD_PRESENCES | Self::MESSAGE_CONTENT
    }
}

impl Default for Intents {
    /// Everything except member and presence events.
    fn default() -> Self {
        Self::all() - Self::GUILD_PRESENCES - Self::GUILD_MEMBERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_drops_presences_and_members() {
        let intents = Intents::default();
        assert!(!intents.contains(Intents::GUILD_PRESENCES));
        assert!(!intents.contains(Intents::GUILD_MEMBERS));
        assert!(intents.contains(Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT));
    }

    #[test]
    fn difference_operator() {
        let mut intents = Intents::all() - Intents::GUILD_PRESENCES;
        intents -= Intents::GUILD_MEMBERS;
        assert_eq!(intents, Intents::default());
    }

    #[test]
    fn serializes_as_integer() {
        let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
        assert_eq!(serde_json::to_string(&intents).unwrap(), "513");
        let back: Intents = serde_json::from_str("513").unwrap();
        assert_eq!(back, intents);
    }
}
