/// Shared data structures for the wizard state
///
/// These structs represent the data model that flows between
/// the dataset layer (import, search, captions) and the UI layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config::WIZARD_VERSION;

/// Status written once a dataset has been fully prepared
pub const STATUS_PREPARED: &str = "dataset_prepared";

/// What kind of LoRA the dataset is meant to train
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoraType {
    #[default]
    Character,
    Style,
    Concept,
}

impl LoraType {
    pub const ALL: [LoraType; 3] = [LoraType::Character, LoraType::Style, LoraType::Concept];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoraType::Character => "Character",
            LoraType::Style => "Style",
            LoraType::Concept => "Concept",
        }
    }

    /// Parse the name stored in a descriptor
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for LoraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of `kohya_lora_wizard_metadata.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetMetadata {
    pub lora_name: String,
    /// Kept as written so descriptors from other wizard versions still list
    pub lora_type: String,
    /// Creation time, `YYYYMMDD-HHMMSS`
    pub timestamp: String,
    pub wizard_version: String,
    pub status: String,
}

impl DatasetMetadata {
    /// Descriptor for a freshly imported dataset
    pub fn prepared(lora_name: &str, lora_type: LoraType, timestamp: &str) -> Self {
        Self {
            lora_name: lora_name.to_string(),
            lora_type: lora_type.as_str().to_string(),
            timestamp: timestamp.to_string(),
            wizard_version: WIZARD_VERSION.to_string(),
            status: STATUS_PREPARED.to_string(),
        }
    }

    /// Label used in the dataset picker
    pub fn display_name(&self) -> String {
        format!("{} ({}) - {}", self.lora_name, self.lora_type, self.timestamp)
    }

    /// The descriptor's type, if this wizard knows it
    pub fn known_type(&self) -> Option<LoraType> {
        LoraType::from_name(&self.lora_type)
    }

    pub fn is_prepared(&self) -> bool {
        self.status == STATUS_PREPARED
    }
}

/// Descriptor as found on disk. Every field is optional so a damaged
/// file can be told apart from an unreadable one.
#[derive(Deserialize, Debug, Default)]
pub struct MetadataFile {
    #[serde(default)]
    pub lora_name: Option<String>,
    #[serde(default)]
    pub lora_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub wizard_version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl MetadataFile {
    /// Returns `None` when a required field is absent or empty
    pub fn complete(self) -> Option<DatasetMetadata> {
        let lora_name = self.lora_name.filter(|s| !s.is_empty())?;
        let lora_type = self.lora_type.filter(|s| !s.is_empty())?;
        let timestamp = self.timestamp.filter(|s| !s.is_empty())?;

        Some(DatasetMetadata {
            lora_name,
            lora_type,
            timestamp,
            wizard_version: self.wizard_version.unwrap_or_default(),
            status: self.status.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// A file handed to the importer: where it sits now and what it was called
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub original_name: String,
}

impl UploadedFile {
    /// Wrap a path picked from disk; its own file name is the original name
    pub fn from_path(path: PathBuf) -> Self {
        let original_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self { path, original_name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A banner message for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_keys() {
        let meta = DatasetMetadata::prepared("CatLora", LoraType::Style, "20240101-120000");
        let value = serde_json::to_value(&meta).unwrap();

        assert_eq!(value["lora_name"], "CatLora");
        assert_eq!(value["lora_type"], "Style");
        assert_eq!(value["timestamp"], "20240101-120000");
        assert_eq!(value["wizard_version"], WIZARD_VERSION);
        assert_eq!(value["status"], STATUS_PREPARED);
    }

    #[test]
    fn test_incomplete_descriptor() {
        let file: MetadataFile =
            serde_json::from_str(r#"{"lora_name": "a", "lora_type": "Concept"}"#).unwrap();
        assert!(file.complete().is_none());

        let file: MetadataFile = serde_json::from_str(
            r#"{"lora_name": "a", "lora_type": "", "timestamp": "20240101-000000"}"#,
        )
        .unwrap();
        assert!(file.complete().is_none());
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let file: MetadataFile = serde_json::from_str(
            r#"{"lora_name": "a", "lora_type": "Pose", "timestamp": "20240101-000000"}"#,
        )
        .unwrap();
        let meta = file.complete().unwrap();
        assert_eq!(meta.known_type(), None);
        assert_eq!(meta.display_name(), "a (Pose) - 20240101-000000");

        let meta = DatasetMetadata::prepared("b", LoraType::Style, "20240101-000000");
        assert_eq!(meta.known_type(), Some(LoraType::Style));
    }

    #[test]
    fn test_missing_status_reads_unknown() {
        let file: MetadataFile = serde_json::from_str(
            r#"{"lora_name": "a", "lora_type": "Concept", "timestamp": "20240101-000000"}"#,
        )
        .unwrap();
        let meta = file.complete().unwrap();
        assert_eq!(meta.status, "unknown");
        assert!(!meta.is_prepared());
        assert_eq!(meta.display_name(), "a (Concept) - 20240101-000000");
    }
}
