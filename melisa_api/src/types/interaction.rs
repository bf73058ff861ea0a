use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::RestApp,
    types::{
        channel::Channel, member::GuildMember, message::Message, role::Role,
        snowflake::Snowflake, user::User,
    },
    util::enum_number,
};

enum_number! {
    pub enum InteractionType: u8 {
        Ping = 1,
        ApplicationCommand = 2,
        MessageComponent = 3,
        ApplicationCommandAutocomplete = 4,
        ModalSubmit = 5,
    }
}

enum_number! {
    pub enum ApplicationCommandType: u8 {
        /// Slash command.
        ChatInput = 1,
        /// Right click on a user.
        User = 2,
        /// Right click on a message.
        Message = 3,
    }
}

/// Text keyed by Discord locale, e.g. `"en-US"` or `"uk"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedField(pub HashMap<String, String>);

impl LocalizedField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, locale: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(locale.into(), value.into());
        self
    }

    pub fn remove(mut self, locale: &str) -> Self {
        self.0.remove(locale);
        self
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }
}

/// Full objects for the ids referenced by command options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<Snowflake, User>,
    #[serde(default)]
    pub members: HashMap<Snowflake, GuildMember>,
    #[serde(default)]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(default)]
    pub channels: HashMap<Snowflake, Channel>,
    #[serde(default)]
    pub messages: HashMap<Snowflake, Message>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionData {
    pub id: Option<Snowflake>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ApplicationCommandType>,
    pub resolved: Option<ResolvedData>,
    /// Raw option tree of the invoked command.
    #[serde(default)]
    pub options: Vec<Value>,
    pub custom_id: Option<String>,
    pub component_type: Option<u8>,
    #[serde(default)]
    pub values: Vec<String>,
    pub target_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub data: Option<InteractionData>,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    /// Set when invoked in a guild.
    pub member: Option<GuildMember>,
    /// Set when invoked in a DM.
    pub user: Option<User>,
    pub token: String,
    #[serde(default)]
    pub version: u8,
    pub message: Option<Message>,
    pub locale: Option<String>,
    pub guild_locale: Option<String>,
}

impl Interaction {
    pub fn inject_rest(&mut self, rest: RestApp) {
        if let Some(member) = self.member.as_mut() {
            member.guild_id = self.guild_id;
            member.inject_rest(rest.clone());
        }
        if let Some(user) = self.user.as_mut() {
            user.inject_rest(rest.clone());
        }
        if let Some(message) = self.message.as_mut() {
            message.inject_rest(rest);
        }
    }

    /// The invoking user, whether the interaction came from a guild or a DM.
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }
}
