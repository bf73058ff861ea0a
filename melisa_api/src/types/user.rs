use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    api::users::UsersApi,
    client::RestApp,
    error::MelisaError,
    types::{channel::Channel, snowflake::Snowflake},
    util::{bitflags_serde, enum_number, Identifiable},
};

enum_number! {
    /// Nitro subscription level.
    pub enum PremiumType: u8 {
        None = 0,
        NitroClassic = 1,
        Nitro = 2,
    }
}

enum_number! {
    /// Visibility of a connection.
    pub enum VisibilityType: u8 {
        None = 0,
        Everyone = 1,
    }
}

bitflags! {
    /// Badges shown on a user's profile.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UserFlags: u64 {
        const STAFF = 1 << 0;
        const PARTNER = 1 << 1;
        const HYPESQUAD = 1 << 2;
        const BUG_HUNTER_LEVEL_1 = 1 << 3;
        const HYPESQUAD_ONLINE_HOUSE_1 = 1 << 6;
        const HYPESQUAD_ONLINE_HOUSE_2 = 1 << 7;
        const HYPESQUAD_ONLINE_HOUSE_3 = 1 << 8;
        const PREMIUM_EARLY_SUPPORTER = 1 << 9;
        const TEAM_PSEUDO_USER = 1 << 10;
        const BUG_HUNTER_LEVEL_2 = 1 << 14;
        const VERIFIED_BOT = 1 << 16;
        const VERIFIED_DEVELOPER = 1 << 17;
        const CERTIFIED_MODERATOR = 1 << 18;
        const BOT_HTTP_INTERACTIONS = 1 << 19;
    }
}

bitflags_serde!(UserFlags: u64);

/// A Discord user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
    pub mfa_enabled: Option<bool>,
    pub banner: Option<String>,
    pub accent_color: Option<u32>,
    pub locale: Option<String>,
    pub verified: Option<bool>,
    pub email: Option<String>,
    pub flags: Option<UserFlags>,
    pub premium_type: Option<PremiumType>,
    pub public_flags: Option<UserFlags>,

    #[serde(skip)]
    pub rest: Option<RestApp>,
}

impl User {
    pub fn inject_rest(&mut self, rest: RestApp) {
        self.rest = Some(rest);
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// The custom avatar, or the default one picked by discriminator.
    pub fn avatar_url(&self) -> String {
        let cdn = self
            .rest
            .as_ref()
            .map(|r| r.cdn.clone())
            .unwrap_or_default();
        match &self.avatar {
            Some(hash) => cdn.avatar_url(self.id, hash),
            None => cdn.default_avatar_url(&self.discriminator),
        }
    }

    /// Open (or fetch the existing) DM channel with this user.
    pub async fn create_dm_channel(&self) -> Result<Channel, MelisaError> {
        let rest = self.rest.as_ref().ok_or(MelisaError::ClientNotAttached)?;
        rest.create_dm_channel(self.id).await
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.username, self.discriminator)
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Identifiable for User {
    type Key = Snowflake;

    fn key(&self) -> Option<Snowflake> {
        Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "585766846268047370",
            "username": "melisa",
            "discriminator": "0575",
            "avatar": null,
            "public_flags": 131072,
            "premium_type": 2
        }))
        .unwrap();

        assert_eq!(user.to_string(), "melisa#0575");
        assert_eq!(user.mention(), "<@585766846268047370>");
        assert_eq!(user.premium_type, Some(PremiumType::Nitro));
        assert_eq!(user.public_flags, Some(UserFlags::VERIFIED_DEVELOPER));
        assert_eq!(
            user.avatar_url(),
            "https://cdn.discordapp.com/embed/avatars/0.png"
        );
    }
}
