use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    types::snowflake::Snowflake,
    util::{bitflags_serde, enum_number},
};

enum_number! {
    pub enum ActivityType: u8 {
        /// "Playing {name}"
        Game = 0,
        /// "Streaming {details}", only YouTube and Twitch urls work.
        Streaming = 1,
        /// "Listening to {name}"
        Listening = 2,
        /// "Watching {name}"
        Watching = 3,
        /// "{emoji} {name}"
        Custom = 4,
        /// "Competing in {name}"
        Competing = 5,
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActivityFlags: u32 {
        const INSTANCE = 1 << 0;
        const JOIN = 1 << 1;
        const SPECTATE = 1 << 2;
        const JOIN_REQUEST = 1 << 3;
        const SYNC = 1 << 4;
        const PLAY = 1 << 5;
        const PARTY_PRIVACY_FRIENDS = 1 << 6;
        const PARTY_PRIVACY_VOICE_CHANNEL = 1 << 7;
        const EMBEDDED = 1 << 8;
    }
}

bitflags_serde!(ActivityFlags: u32);

/// Online status of a user or of the bot itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    #[default]
    Online,
    Offline,
    Idle,
    Dnd,
    Invisible,
}

/// Unix millisecond start and end of an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityTimestamp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityEmoji {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityParty {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Current and maximum size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySecrets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectate: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

/// A rich presence activity. Bots can only set `name`, `type` and `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ActivityTimestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<ActivityEmoji>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<ActivityParty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<ActivityAssets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<ActivitySecrets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<ActivityFlags>,
    /// Buttons come back from the gateway as labels only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<serde_json::Value>,
}

impl Activity {
    pub fn new(name: impl Into<String>, kind: ActivityType) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            created_at: None,
            timestamps: None,
            application_id: None,
            details: None,
            state: None,
            emoji: None,
            party: None,
            assets: None,
            secrets: None,
            instance: None,
            flags: None,
            buttons: None,
        }
    }

    pub fn playing(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Game)
    }

    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        let mut activity = Self::new(name, ActivityType::Streaming);
        activity.url = Some(url.into());
        activity
    }

    pub fn listening(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Listening)
    }

    pub fn watching(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Watching)
    }

    pub fn competing(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Competing)
    }
}

/// Body of the gateway presence update (op 3) and of the identify presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePresence {
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: StatusType,
    pub afk: bool,
}

impl UpdatePresence {
    pub fn new(activity: Option<Activity>, status: Option<StatusType>) -> Self {
        let status = status.unwrap_or_default();
        let since = match status {
            StatusType::Idle => Some(chrono::Utc::now().timestamp_millis().max(0) as u64),
            _ => None,
        };
        Self {
            since,
            activities: activity.into_iter().collect(),
            status,
            afk: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_payload() {
        let presence = UpdatePresence::new(Some(Activity::watching("you")), Some(StatusType::Dnd));
        let value = serde_json::to_value(&presence).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "since": null,
                "activities": [{"name": "you", "type": 3}],
                "status": "dnd",
                "afk": false
            })
        );
    }

    #[test]
    fn unknown_activity_type_survives() {
        let activity: Activity =
            serde_json::from_str(r#"{"name": "x", "type": 42, "flags": 3}"#).unwrap();
        assert_eq!(activity.kind, ActivityType::Unknown(42));
        assert_eq!(
            activity.flags,
            Some(ActivityFlags::INSTANCE | ActivityFlags::JOIN)
        );
    }
}
