use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    types::{snowflake::Snowflake, user::User},
    util::Identifiable,
};

/// A custom guild emoji, or a unicode emoji when `id` is `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Emoji {
    pub id: Option<Snowflake>,
    pub name: Option<String>,
    /// Roles allowed to use this emoji.
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub user: Option<User>,
    pub require_colons: Option<bool>,
    pub managed: Option<bool>,
    #[serde(default)]
    pub animated: bool,
    pub available: Option<bool>,
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or_default();
        match self.id {
            Some(id) if self.animated => write!(f, "<a:{name}:{id}>"),
            Some(id) => write!(f, "<:{name}:{id}>"),
            None => f.write_str(name),
        }
    }
}

impl Identifiable for Emoji {
    type Key = Snowflake;

    fn key(&self) -> Option<Snowflake> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_custom_and_unicode() {
        let custom: Emoji =
            serde_json::from_str(r#"{"id": "41771983429993937", "name": "LUL", "animated": true}"#)
                .unwrap();
        assert_eq!(custom.to_string(), "<a:LUL:41771983429993937>");

        let unicode: Emoji = serde_json::from_str(r#"{"id": null, "name": "🔥"}"#).unwrap();
        assert_eq!(unicode.to_string(), "🔥");
    }
}
