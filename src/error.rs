use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while preparing or browsing a dataset.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("No files uploaded!")]
    NoFiles,

    #[error("LoRA training name/type is missing! Please go back.")]
    MissingNameOrType,

    #[error("Invalid LoRA name {0:?}. Please use valid characters.")]
    InvalidName(String),

    #[error("Please select a valid dataset from the list first (or search if empty).")]
    NoSelection,

    #[error("Invalid selection or the dataset list is empty. Please search again.")]
    UnknownSelection,

    #[error("Metadata file not found in {0}. Was this folder created by the wizard?")]
    MetadataMissing(PathBuf),

    #[error("Too many duplicate filenames for {0}")]
    TooManyDuplicates(String),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write metadata file {path}: {source}")]
    MetadataWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read metadata file {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Metadata file {path} is not valid JSON: {source}")]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Metadata file {0} is missing required information (lora_name, lora_type, timestamp).")]
    MetadataIncomplete(PathBuf),

    #[error("The path for the selected dataset is invalid: {0}")]
    InvalidDatasetPath(PathBuf),

    #[error("Could not find image directory structure in {0}")]
    ImageFolderMissing(PathBuf),

    #[error("Failed to save caption {path}: {source}")]
    Caption {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl WizardError {
    /// Validation problems are shown as warnings; the user fixes the input
    /// and tries again. Everything else is an error banner.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WizardError::NoFiles
                | WizardError::MissingNameOrType
                | WizardError::InvalidName(_)
                | WizardError::NoSelection
                | WizardError::UnknownSelection
                | WizardError::MetadataMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WizardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(WizardError::NoFiles.is_validation());
        assert!(WizardError::InvalidName("???".into()).is_validation());
        assert!(!WizardError::TooManyDuplicates("x.png".into()).is_validation());
        assert!(!WizardError::Io(io::Error::new(io::ErrorKind::Other, "boom")).is_validation());
    }
}
