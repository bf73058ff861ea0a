use serde::{Deserialize, Serialize};

use crate::{
    client::RestApp,
    types::{channel::Channel, snowflake::Snowflake, timestamp::Timestamp},
};

/// Thread-only fields of a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    #[serde(default)]
    pub archived: bool,
    /// Minutes of inactivity before the thread auto-archives: 60, 1440, 4320 or 10080.
    #[serde(default)]
    pub auto_archive_duration: u32,
    pub archive_timestamp: Option<Timestamp>,
    #[serde(default)]
    pub locked: bool,
    pub invitable: Option<bool>,
    pub create_timestamp: Option<Timestamp>,
}

/// A user's membership in a thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadMember {
    /// The thread id. Omitted inside GUILD_CREATE.
    pub id: Option<Snowflake>,
    pub user_id: Option<Snowflake>,
    pub join_timestamp: Option<Timestamp>,
    #[serde(default)]
    pub flags: u32,
}

/// Result of the active, archived and joined thread listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadsList {
    #[serde(default)]
    pub threads: Vec<Channel>,
    /// Memberships of the current user, one per joined thread.
    #[serde(default)]
    pub members: Vec<ThreadMember>,
    #[serde(default)]
    pub has_more: bool,
}

impl ThreadsList {
    pub fn inject_rest(&mut self, rest: RestApp) {
        for thread in &mut self.threads {
            thread.inject_rest(rest.clone());
        }
    }
}
