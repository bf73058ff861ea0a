use std::path::Path;

use crate::error::MelisaError;

const SPOILER_PREFIX: &str = "SPOILER_";

/// An attachment to upload with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub filename: String,
    pub data: Vec<u8>,
    /// Alt text shown by clients.
    pub description: Option<String>,
    pub spoiler: bool,
}

impl File {
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>, spoiler: bool) -> Self {
        let mut filename = filename.into();
        let spoiler = spoiler || filename.starts_with(SPOILER_PREFIX);
        if spoiler && !filename.starts_with(SPOILER_PREFIX) {
            filename = format!("{SPOILER_PREFIX}{filename}");
        }
        Self {
            filename,
            data: data.into(),
            description: None,
            spoiler,
        }
    }

    /// Read a file from disk. The upload name defaults to the file name.
    pub async fn from_path(
        path: impl AsRef<Path>,
        filename: Option<&str>,
        spoiler: bool,
    ) -> Result<Self, MelisaError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = match filename {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    MelisaError::InvalidArgument(format!("{} has no file name", path.display()))
                })?,
        };
        Ok(Self::from_bytes(name, data, spoiler))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spoiler_prefix() {
        let file = File::from_bytes("cat.png", vec![1, 2, 3], true);
        assert_eq!(file.filename, "SPOILER_cat.png");

        let file = File::from_bytes("SPOILER_dog.png", vec![], false);
        assert!(file.spoiler);
        assert_eq!(file.filename, "SPOILER_dog.png");
    }

    #[tokio::test]
    async fn missing_path_is_io_error() {
        let err = File::from_path("/definitely/not/here.bin", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, MelisaError::Io(_)));
    }
}
