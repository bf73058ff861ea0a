//! The JSON codec used for both REST bodies and gateway frames.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::MelisaError;

pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, MelisaError> {
    Ok(serde_json::to_string(value)?)
}

pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T, MelisaError> {
    Ok(serde_json::from_str(text)?)
}

pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, MelisaError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn bad_input_is_serde_error() {
        let err = from_str::<Value>("{not json").unwrap_err();
        assert!(matches!(err, MelisaError::Serde(_)));
    }

    #[test]
    fn slice_and_str_agree() {
        let a: Value = from_str(r#"{"op":11}"#).unwrap();
        let b: Value = from_slice(br#"{"op":11}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(to_string(&a).unwrap(), r#"{"op":11}"#);
    }
}
