use std::collections::HashMap;
use std::hash::Hash;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MelisaError;

/// Join path segments onto a base url.
pub fn build_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for seg in segments {
        url.push('/');
        url.push_str(seg.trim_start_matches('/'));
    }
    url
}

/// Append a url-encoded query built from `params`. `None` fields are skipped
/// by `serde_urlencoded`, so optional filters can be passed straight through.
pub fn append_query<T: Serialize>(url: &str, params: &T) -> Result<String, MelisaError> {
    let query = serde_urlencoded::to_string(params)
        .map_err(|e| MelisaError::InvalidArgument(format!("Could not encode query: {e}")))?;

    if query.is_empty() {
        Ok(url.to_string())
    } else {
        Ok(format!("{url}?{query}"))
    }
}

/// Encode raw image bytes as the `data:` URI Discord expects for avatars and icons.
pub fn image_data_uri(bytes: &[u8]) -> Result<String, MelisaError> {
    let mime = if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8]) && bytes.ends_with(&[0xFF, 0xD9]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() > 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        return Err(MelisaError::InvalidArgument(
            "Unsupported image type given".into(),
        ));
    };

    Ok(format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes)))
}

/// Models that are stored in id-keyed maps.
pub trait Identifiable {
    type Key: Eq + Hash;

    fn key(&self) -> Option<Self::Key>;
}

/// (De)serialize a `HashMap<K, T>` as the JSON array Discord sends.
/// Entries without a key are dropped.
pub mod id_map {
    use super::*;

    pub fn serialize<S, T>(map: &HashMap<T::Key, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize + Identifiable,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<T::Key, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Identifiable,
    {
        let items = Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(items
            .into_iter()
            .filter_map(|item| item.key().map(|k| (k, item)))
            .collect())
    }
}

/// Declare a Discord integer enum with an `Unknown` fallback so that values
/// added by Discord later never fail a parse.
macro_rules! enum_number {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ty {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
            Unknown($repr),
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                match value {
                    $( $value => Self::$variant, )*
                    other => Self::Unknown(other),
                }
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value, )*
                    $name::Unknown(other) => other,
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                <$repr as serde::Serialize>::serialize(&(*self).into(), serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                <$repr as serde::Deserialize>::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

/// Serde for `bitflags` types: integers on the wire, unknown bits truncated.
macro_rules! bitflags_serde {
    ($name:ident: $repr:ty) => {
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u64(self.bits() as u64)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let bits = <$repr as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from_bits_truncate(bits))
            }
        }
    };
}

pub(crate) use bitflags_serde;
pub(crate) use enum_number;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Params {
        limit: u8,
        before: Option<String>,
        after: Option<String>,
    }

    #[test]
    fn build_url_trims_slashes() {
        assert_eq!(
            build_url("https://discord.com/api/v9/", &["/channels", "1", "messages"]),
            "https://discord.com/api/v9/channels/1/messages"
        );
    }

    #[test]
    fn query_drops_none() {
        let params = Params {
            limit: 50,
            before: Some("10".into()),
            after: None,
        };
        assert_eq!(
            append_query("https://x/y", &params).unwrap(),
            "https://x/y?limit=50&before=10"
        );
    }

    #[test]
    fn png_data_uri() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let uri = image_data_uri(&png).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(image_data_uri(b"plain text").is_err());
    }
}
