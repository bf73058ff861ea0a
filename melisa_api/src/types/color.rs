use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MelisaError;

/// A 24-bit RGB color as used by embeds and roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const DEFAULT: Color = Color(0);
    pub const BLURPLE: Color = Color(0x5865F2);

    pub fn r(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn to_rgb(self) -> (u8, u8, u8) {
        (self.r(), self.g(), self.b())
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Parse `#rgb`, `#rrggbb`, `0xrrggbb` or the bare digits.
    pub fn from_hex_code(code: &str) -> Result<Self, MelisaError> {
        let digits = code
            .strip_prefix('#')
            .or_else(|| code.strip_prefix("0x"))
            .or_else(|| code.strip_prefix("0X"))
            .unwrap_or(code);

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MelisaError::InvalidColor(
                "Color code must be hexadecimal".into(),
            ));
        }

        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => {
                return Err(MelisaError::InvalidColor(
                    "Color code has invalid length. Must be 3 or 6 digits".into(),
                ))
            }
        };

        u32::from_str_radix(&expanded, 16)
            .map(Self)
            .map_err(|e| MelisaError::InvalidColor(e.to_string()))
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self(value & 0xFF_FFFF)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hex_expands() {
        assert_eq!(Color::from_hex_code("0xfff").unwrap(), Color(0xFFFFFF));
        assert_eq!(Color::from_hex_code("abc").unwrap().to_string(), "#aabbcc");
    }

    #[test]
    fn bad_codes() {
        let err = Color::from_hex_code("#zzzzzz").unwrap_err();
        assert!(err.to_string().contains("must be hexadecimal"));
        let err = Color::from_hex_code("#1234").unwrap_err();
        assert!(err.to_string().contains("Must be 3 or 6 digits"));
    }
}
