//! Image urls on `cdn.discordapp.com`.

use std::fmt::Display;

pub const CDN_URL: &str = "https://cdn.discordapp.com";

/// Builds CDN urls with a default image format and size.
///
/// Every method takes optional overrides for the format and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnBuilder {
    pub image_format: String,
    pub size: u16,
}

impl Default for CdnBuilder {
    fn default() -> Self {
        Self::new("png")
    }
}

impl CdnBuilder {
    pub fn new(image_format: &str) -> Self {
        Self {
            image_format: image_format.to_string(),
            size: 1024,
        }
    }

    pub fn with_size(mut self, size: u16) -> Self {
        self.size = size;
        self
    }

    fn image(&self, path: &str, format: Option<&str>, size: Option<u16>) -> String {
        format!(
            "{CDN_URL}/{path}.{}?size={}",
            format.unwrap_or(&self.image_format),
            size.unwrap_or(self.size)
        )
    }

    pub fn avatar_url(&self, user_id: impl Display, hash: &str) -> String {
        self.avatar_url_with(user_id, hash, None, None)
    }

    pub fn avatar_url_with(
        &self,
        user_id: impl Display,
        hash: &str,
        format: Option<&str>,
        size: Option<u16>,
    ) -> String {
        self.image(&format!("avatars/{user_id}/{hash}"), format, size)
    }

    /// The fallback avatar is picked by `discriminator % 5` and is always png.
    pub fn default_avatar_url(&self, discriminator: &str) -> String {
        let index = discriminator.parse::<u32>().unwrap_or(0) % 5;
        format!("{CDN_URL}/embed/avatars/{index}.png")
    }

    pub fn guild_icon_url(
        &self,
        guild_id: impl Display,
        hash: &str,
        format: Option<&str>,
        size: Option<u16>,
    ) -> String {
        self.image(&format!("icons/{guild_id}/{hash}"), format, size)
    }

    pub fn guild_member_avatar_url(
        &self,
        guild_id: impl Display,
        user_id: impl Display,
        hash: &str,
        format: Option<&str>,
        size: Option<u16>,
    ) -> String {
        self.image(
            &format!("guilds/{guild_id}/users/{user_id}/avatars/{hash}"),
            format,
            size,
        )
    }

    pub fn role_icon_url(
        &self,
        role_id: impl Display,
        hash: &str,
        format: Option<&str>,
        size: Option<u16>,
    ) -> String {
        self.image(&format!("role-icons/{role_id}/{hash}"), format, size)
    }
}
