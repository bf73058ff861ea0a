use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::MelisaError,
    types::{color::Color, timestamp::Timestamp},
};

pub const EMBED_TITLE_LIMIT: usize = 256;
pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;
pub const EMBED_MAX_FIELDS: usize = 25;
pub const EMBED_FIELD_NAME_LIMIT: usize = 256;
pub const EMBED_FIELD_VALUE_LIMIT: usize = 1024;
pub const EMBED_FOOTER_LIMIT: usize = 2048;
pub const EMBED_AUTHOR_LIMIT: usize = 256;
pub const EMBED_TOTAL_LIMIT: usize = 6000;

/// Kind of embed. Bots always send `rich`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedType {
    #[default]
    Rich,
    Image,
    Video,
    Gifv,
    Article,
    Link,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedThumbnail {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedVideo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedProvider {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Rich message content.
///
/// Setters validate Discord's length limits as they go and return the embed
/// so calls chain:
///
/// ```ignore
/// let embed = Embed::new()
///     .title("Status")?
///     .set_color(Color::BLURPLE)
///     .add_field("Ping", "42ms", true)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EmbedType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<EmbedVideo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<EmbedProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

fn check_len(what: &str, text: &str, limit: usize) -> Result<(), MelisaError> {
    let len = text.chars().count();
    if len > limit {
        return Err(MelisaError::EmbedField(format!(
            "{what} must be {limit} or fewer in length, got {len}"
        )));
    }
    Ok(())
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Result<Self, MelisaError> {
        let title = title.into();
        check_len("Embed title", &title, EMBED_TITLE_LIMIT)?;
        self.title = Some(title);
        Ok(self)
    }

    pub fn description(mut self, description: impl Into<String>) -> Result<Self, MelisaError> {
        let description = description.into();
        check_len("Embed description", &description, EMBED_DESCRIPTION_LIMIT)?;
        self.description = Some(description);
        Ok(self)
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn set_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// `None` stamps the embed with the current time.
    pub fn set_timestamp(mut self, timestamp: Option<Timestamp>) -> Self {
        self.timestamp = Some(timestamp.unwrap_or_else(Timestamp::now));
        self
    }

    pub fn set_author(
        mut self,
        name: impl Into<String>,
        url: Option<String>,
        icon_url: Option<String>,
    ) -> Result<Self, MelisaError> {
        let name = name.into();
        check_len("Embed author name", &name, EMBED_AUTHOR_LIMIT)?;
        self.author = Some(EmbedAuthor {
            name,
            url,
            icon_url,
            proxy_icon_url: None,
        });
        Ok(self)
    }

    pub fn set_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(EmbedImage {
            url: url.into(),
            ..Default::default()
        });
        self
    }

    pub fn set_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(EmbedThumbnail {
            url: url.into(),
            ..Default::default()
        });
        self
    }

    pub fn set_footer(
        mut self,
        text: impl Into<String>,
        icon_url: Option<String>,
    ) -> Result<Self, MelisaError> {
        let text = text.into();
        check_len("Embed footer text", &text, EMBED_FOOTER_LIMIT)?;
        self.footer = Some(EmbedFooter {
            text,
            icon_url,
            proxy_icon_url: None,
        });
        Ok(self)
    }

    fn make_field(name: String, value: String, inline: bool) -> Result<EmbedField, MelisaError> {
        check_len("Embed field name", &name, EMBED_FIELD_NAME_LIMIT)?;
        check_len("Embed field value", &value, EMBED_FIELD_VALUE_LIMIT)?;
        Ok(EmbedField {
            name,
            value,
            inline,
        })
    }

    pub fn add_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Result<Self, MelisaError> {
        if self.fields.len() >= EMBED_MAX_FIELDS {
            return Err(MelisaError::EmbedField(format!(
                "Embeds cannot have more than {EMBED_MAX_FIELDS} fields"
            )));
        }
        self.fields
            .push(Self::make_field(name.into(), value.into(), inline)?);
        Ok(self)
    }

    pub fn insert_field_at(
        mut self,
        index: usize,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Result<Self, MelisaError> {
        if self.fields.len() >= EMBED_MAX_FIELDS {
            return Err(MelisaError::EmbedField(format!(
                "Embeds cannot have more than {EMBED_MAX_FIELDS} fields"
            )));
        }
        let field = Self::make_field(name.into(), value.into(), inline)?;
        self.fields.insert(index.min(self.fields.len()), field);
        Ok(self)
    }

    pub fn edit_field(
        mut self,
        index: usize,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Result<Self, MelisaError> {
        let field = Self::make_field(name.into(), value.into(), inline)?;
        match self.fields.get_mut(index) {
            Some(slot) => *slot = field,
            None => {
                return Err(MelisaError::Index(format!(
                    "field index {index} out of range"
                )))
            }
        }
        Ok(self)
    }

    /// Out of range indexes are ignored.
    pub fn remove_field(mut self, index: usize) -> Self {
        if index < self.fields.len() {
            self.fields.remove(index);
        }
        self
    }

    pub fn clear_fields(mut self) -> Self {
        self.fields.clear();
        self
    }

    /// Characters Discord counts against the 6000 limit.
    pub fn total_length(&self) -> usize {
        let count = |s: &Option<String>| s.as_deref().map_or(0, |s| s.chars().count());

        count(&self.title)
            + count(&self.description)
            + self
                .fields
                .iter()
                .map(|f| f.name.chars().count() + f.value.chars().count())
                .sum::<usize>()
            + self.footer.as_ref().map_or(0, |f| f.text.chars().count())
            + self.author.as_ref().map_or(0, |a| a.name.chars().count())
    }

    /// Re-check every limit, including the ones a caller can bypass by
    /// writing the public fields directly.
    pub fn validate(&self) -> Result<(), MelisaError> {
        if let Some(title) = &self.title {
            check_len("Embed title", title, EMBED_TITLE_LIMIT)?;
        }
        if let Some(description) = &self.description {
            check_len("Embed description", description, EMBED_DESCRIPTION_LIMIT)?;
        }
        if self.fields.len() > EMBED_MAX_FIELDS {
            return Err(MelisaError::EmbedField(format!(
                "Embeds cannot have more than {EMBED_MAX_FIELDS} fields"
            )));
        }
        for field in &self.fields {
            check_len("Embed field name", &field.name, EMBED_FIELD_NAME_LIMIT)?;
            check_len("Embed field value", &field.value, EMBED_FIELD_VALUE_LIMIT)?;
        }
        if let Some(footer) = &self.footer {
            check_len("Embed footer text", &footer.text, EMBED_FOOTER_LIMIT)?;
        }
        if let Some(author) = &self.author {
            check_len("Embed author name", &author.name, EMBED_AUTHOR_LIMIT)?;
        }
        let total = self.total_length();
        if total > EMBED_TOTAL_LIMIT {
            return Err(MelisaError::EmbedField(format!(
                "Embed total length must be {EMBED_TOTAL_LIMIT} or fewer, got {total}"
            )));
        }
        Ok(())
    }

    /// JSON object with unset parts left out.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_limit() {
        let err = Embed::new().title("x".repeat(257)).unwrap_err();
        assert!(matches!(err, MelisaError::EmbedField(_)));
    }

    #[test]
    fn field_count_limit() {
        let mut embed = Embed::new();
        for i in 0..EMBED_MAX_FIELDS {
            embed = embed.add_field(i.to_string(), "v", false).unwrap();
        }
        assert!(embed.add_field("one", "too many", false).is_err());
    }

    #[test]
    fn edit_out_of_range() {
        let embed = Embed::new().add_field("a", "b", false).unwrap();
        let embed = embed.edit_field(0, "c", "d", true).unwrap();
        assert_eq!(embed.fields[0].name, "c");
        assert!(matches!(
            embed.edit_field(3, "x", "y", false),
            Err(MelisaError::Index(_))
        ));
    }

    #[test]
    fn remove_and_clear() {
        let embed = Embed::new()
            .add_field("a", "1", false)
            .unwrap()
            .add_field("b", "2", false)
            .unwrap()
            .insert_field_at(0, "z", "0", true)
            .unwrap();
        assert_eq!(embed.fields[0].name, "z");
        let embed = embed.remove_field(0).remove_field(42);
        assert_eq!(embed.fields.len(), 2);
        assert!(embed.clear_fields().fields.is_empty());
    }
}
