use serde::{Deserialize, Serialize};

use crate::{
    types::{cdn::CdnBuilder, color::Color, snowflake::Snowflake},
    util::Identifiable,
};

/// Extra data attached to managed roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleTags {
    pub bot_id: Option<Snowflake>,
    pub integration_id: Option<Snowflake>,
}

/// A guild role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Color,
    /// Shown separately in the member list.
    #[serde(default)]
    pub hoist: bool,
    pub icon: Option<String>,
    pub unicode_emoji: Option<String>,
    #[serde(default)]
    pub position: i32,
    /// Permission bit set as a decimal string.
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
    pub tags: Option<RoleTags>,
    pub guild_id: Option<Snowflake>,
}

impl Role {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }

    pub fn icon_url(&self, cdn: &CdnBuilder) -> Option<String> {
        self.icon
            .as_deref()
            .map(|hash| cdn.role_icon_url(self.id, hash, None, None))
    }
}

impl Identifiable for Role {
    type Key = Snowflake;

    fn key(&self) -> Option<Snowflake> {
        Some(self.id)
    }
}
