/// Dataset importer
///
/// Turns a batch of uploads (loose images and zip archives) into a fresh
/// dataset folder:
///
/// ```text
/// <base>/<name>_<YYYYMMDD-HHMMSS>/
///     img/10_<name>/   images (and later their captions)
///     model/
///     log/
///     kohya_lora_wizard_metadata.json
/// ```

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

use super::{is_image_name, is_zip_name};
use crate::config::{WizardConfig, METADATA_FILE_NAME};
use crate::error::{Result, WizardError};
use crate::state::data::{DatasetMetadata, LoraType, UploadedFile};

/// Repeat count baked into the image folder name
const IMAGE_REPEATS: u32 = 10;

/// How many `_<n>` suffixes to try before giving up on a file name
const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Characters that are not allowed in a folder name on some platform
const ILLEGAL_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Everything the importer needs from the upload step
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub files: Vec<UploadedFile>,
    pub lora_name: String,
    pub lora_type: Option<LoraType>,
    /// Output folder chosen by the user; falls back to the configured default
    pub output_dir: Option<PathBuf>,
}

/// What happened to one uploaded file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Copied(String),
    Renamed { from: String, to: String },
    Extracted { archive: String, count: usize },
    InvalidArchive(String),
    ArchiveFailed { archive: String, error: String },
    CopyFailed { name: String, error: String },
    Skipped(String),
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Copied(name) => write!(f, "Copied {name}."),
            FileOutcome::Renamed { from, to } => write!(f, "Copied and renamed {from} to {to}."),
            FileOutcome::Extracted { archive, count } => {
                write!(f, "Extracted {count} images from {archive}.")
            }
            FileOutcome::InvalidArchive(name) => write!(f, "Error: {name} is not a valid zip file."),
            FileOutcome::ArchiveFailed { archive, error } => {
                write!(f, "Error processing {archive}: {error}")
            }
            FileOutcome::CopyFailed { name, error } => write!(f, "Error copying {name}: {error}"),
            FileOutcome::Skipped(name) => write!(f, "Skipped unsupported file: {name}."),
        }
    }
}

/// Result of a successful import
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub dataset_dir: PathBuf,
    pub image_dir: PathBuf,
    pub metadata: DatasetMetadata,
    pub image_count: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl ImportReport {
    /// Human readable summary shown after the upload step
    pub fn summary(&self) -> String {
        let details: Vec<String> = self.outcomes.iter().map(ToString::to_string).collect();
        format!(
            "Finished processing uploads. Total images added: {} into folder:\n{}\n\nDataset Base Folder:\n{}\n\nDetails:\n{}",
            self.image_count,
            self.image_dir.display(),
            self.dataset_dir.display(),
            details.join("\n"),
        )
    }
}

/// Strip characters that are illegal in folder names and replace whitespace runs with `_`
pub fn sanitize_name(name: &str) -> String {
    let stripped: String = name.chars().filter(|c| !ILLEGAL_NAME_CHARS.contains(c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

/// First free path for `filename` in `dir`, appending `_1`, `_2`, ... before the extension
pub fn unique_target_path(dir: &Path, filename: &str) -> Result<PathBuf> {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let name = Path::new(filename);
    let stem = name.file_stem().unwrap_or_default().to_string_lossy();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(WizardError::TooManyDuplicates(filename.to_string()))
}

/// Builds datasets from uploads
#[derive(Debug, Clone)]
pub struct Importer<'a> {
    config: &'a WizardConfig,
}

impl<'a> Importer<'a> {
    pub fn new(config: &'a WizardConfig) -> Self {
        Self { config }
    }

    /// Import using the current local time for the folder name
    pub fn import(&self, request: &ImportRequest) -> Result<ImportReport> {
        self.import_at(request, Local::now())
    }

    /// Import with an explicit creation time
    pub fn import_at(&self, request: &ImportRequest, now: DateTime<Local>) -> Result<ImportReport> {
        if request.files.is_empty() {
            tracing::error!("No files uploaded.");
            return Err(WizardError::NoFiles);
        }

        let lora_type = match request.lora_type {
            Some(t) if !request.lora_name.trim().is_empty() => t,
            _ => {
                tracing::error!("LoRA training name or type is missing.");
                return Err(WizardError::MissingNameOrType);
            }
        };

        let base_dir = self.resolve_base_dir(request.output_dir.as_deref())?;

        let name = sanitize_name(&request.lora_name);
        if name.is_empty() {
            tracing::error!("Invalid LoRA name after sanitization: {:?}", request.lora_name);
            return Err(WizardError::InvalidName(request.lora_name.clone()));
        }

        let timestamp = now.format("%Y%m%d-%H%M%S").to_string();
        let dataset_dir = create_dataset_dir(&base_dir, &format!("{name}_{timestamp}"))?;
        tracing::info!("Generated unique folder name: {}", dataset_dir.display());

        let metadata = DatasetMetadata::prepared(&name, lora_type, &timestamp);
        match self.populate(&dataset_dir, metadata, &request.files) {
            Ok(report) => {
                tracing::info!("{}", report.summary());
                Ok(report)
            }
            Err(e) => {
                tracing::error!("An error occurred during dataset preparation: {}", e);
                remove_partial_dataset(&dataset_dir);
                Err(e)
            }
        }
    }

    /// Use the requested output folder if it exists, otherwise the configured fallback
    fn resolve_base_dir(&self, requested: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = requested.filter(|d| d.is_dir()) {
            return Ok(dir.to_path_buf());
        }

        let fallback = self.config.fallback_dir();
        tracing::warn!(
            "Output directory {:?} is invalid or not set. Using default: {}",
            requested,
            fallback.display()
        );
        fs::create_dir_all(&fallback).map_err(|source| WizardError::CreateDir {
            path: fallback.clone(),
            source,
        })?;
        Ok(fallback)
    }

    fn populate(
        &self,
        dataset_dir: &Path,
        metadata: DatasetMetadata,
        files: &[UploadedFile],
    ) -> Result<ImportReport> {
        let image_dir = dataset_dir
            .join("img")
            .join(format!("{}_{}", IMAGE_REPEATS, metadata.lora_name));

        for dir in [image_dir.clone(), dataset_dir.join("model"), dataset_dir.join("log")] {
            fs::create_dir_all(&dir).map_err(|source| WizardError::CreateDir { path: dir, source })?;
        }
        tracing::info!("Created dataset structure in: {}", dataset_dir.display());

        let mut image_count = 0;
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            tracing::info!("Processing uploaded file: {}", file.original_name);

            if is_zip_name(&file.original_name) {
                let outcome = extract_archive(&file.path, &file.original_name, &image_dir);
                if let FileOutcome::Extracted { count, .. } = outcome {
                    image_count += count;
                }
                outcomes.push(outcome);
            } else if is_image_name(&file.original_name) {
                let outcome = copy_image(file, &image_dir)?;
                if matches!(outcome, FileOutcome::Copied(_) | FileOutcome::Renamed { .. }) {
                    image_count += 1;
                }
                outcomes.push(outcome);
            } else {
                tracing::warn!("Skipping unsupported file type: {}", file.original_name);
                outcomes.push(FileOutcome::Skipped(file.original_name.clone()));
            }
        }

        let metadata_path = dataset_dir.join(METADATA_FILE_NAME);
        write_metadata(&metadata_path, &metadata)?;
        tracing::info!("Metadata saved to {}", metadata_path.display());

        Ok(ImportReport {
            dataset_dir: dataset_dir.to_path_buf(),
            image_dir,
            metadata,
            image_count,
            outcomes,
        })
    }
}

/// Create a fresh dataset root, appending `_1`, `_2`, ... while the name is taken.
/// Never reuses an existing folder.
fn create_dataset_dir(base_dir: &Path, folder: &str) -> Result<PathBuf> {
    for n in 0..=MAX_RENAME_ATTEMPTS {
        let candidate = match n {
            0 => base_dir.join(folder),
            n => base_dir.join(format!("{folder}_{n}")),
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(WizardError::CreateDir { path: candidate, source }),
        }
    }

    Err(WizardError::TooManyDuplicates(folder.to_string()))
}

/// Copy a loose image; a copy failure only affects this file, running out of names aborts the import
fn copy_image(file: &UploadedFile, image_dir: &Path) -> Result<FileOutcome> {
    let target = unique_target_path(image_dir, &file.original_name)?;
    let target_name = target
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    if let Err(e) = fs::copy(&file.path, &target) {
        tracing::error!("Error copying image {}: {}", file.original_name, e);
        return Ok(FileOutcome::CopyFailed {
            name: file.original_name.clone(),
            error: e.to_string(),
        });
    }

    if target_name == file.original_name {
        Ok(FileOutcome::Copied(target_name))
    } else {
        Ok(FileOutcome::Renamed {
            from: file.original_name.clone(),
            to: target_name,
        })
    }
}

/// Extract every image entry of an archive into `image_dir`, flattening folders
fn extract_archive(path: &Path, archive_name: &str, image_dir: &Path) -> FileOutcome {
    let opened = File::open(path)
        .map_err(ZipError::from)
        .and_then(ZipArchive::new);

    let mut archive = match opened {
        Ok(archive) => archive,
        Err(ZipError::InvalidArchive(_)) | Err(ZipError::UnsupportedArchive(_)) => {
            tracing::error!("Uploaded file {} is not a valid zip file.", archive_name);
            return FileOutcome::InvalidArchive(archive_name.to_string());
        }
        Err(e) => {
            tracing::error!("Error processing zip file {}: {}", archive_name, e);
            return FileOutcome::ArchiveFailed {
                archive: archive_name.to_string(),
                error: e.to_string(),
            };
        }
    };

    tracing::info!("Extracting zip file: {}", archive_name);
    let mut count = 0;

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!("Error reading entry {} of {}: {}", index, archive_name, e);
                continue;
            }
        };

        let member = entry.name().to_string();
        if entry.is_dir() || member.starts_with('.') || member.starts_with("__MACOSX") {
            continue;
        }

        let basename = member.rsplit(['/', '\\']).next().unwrap_or_default();
        if basename.is_empty() || basename.starts_with('.') {
            continue;
        }
        if !is_image_name(basename) {
            tracing::info!("Skipping non-image file in zip: {}", member);
            continue;
        }

        let extracted = unique_target_path(image_dir, basename).and_then(|target| {
            let written = File::create(&target).and_then(|mut out| io::copy(&mut entry, &mut out));
            match written {
                Ok(_) => Ok(target),
                Err(e) => {
                    // a truncated or corrupt member must not show up in the review grid
                    if let Err(cleanup) = fs::remove_file(&target) {
                        if cleanup.kind() != io::ErrorKind::NotFound {
                            tracing::error!("Could not remove {}: {}", target.display(), cleanup);
                        }
                    }
                    Err(e.into())
                }
            }
        });

        match extracted {
            Ok(target) => {
                tracing::debug!("Extracted {} to {}", member, target.display());
                count += 1;
            }
            Err(e) => tracing::error!("Error processing file {} from zip: {}", member, e),
        }
    }

    FileOutcome::Extracted {
        archive: archive_name.to_string(),
        count,
    }
}

fn write_metadata(path: &Path, metadata: &DatasetMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata).map_err(|e| WizardError::MetadataWrite {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;

    fs::write(path, json).map_err(|source| WizardError::MetadataWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Best-effort removal of a half-built dataset; failures are only logged
fn remove_partial_dataset(dataset_dir: &Path) {
    if !dataset_dir.is_dir() {
        return;
    }

    tracing::warn!(
        "Attempting cleanup of partially created folder due to error: {}",
        dataset_dir.display()
    );
    match fs::remove_dir_all(dataset_dir) {
        Ok(()) => tracing::info!("Successfully removed partially created folder: {}", dataset_dir.display()),
        Err(e) => tracing::error!("Error during cleanup of {}: {}", dataset_dir.display(), e),
    }
}
