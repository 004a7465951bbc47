use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::is_image_name;
use crate::config::METADATA_FILE_NAME;
use crate::error::{Result, WizardError};
use crate::state::data::{DatasetMetadata, MetadataFile};

/// Entry shown in the dataset picker when a search found nothing
pub const NO_MATCHES: &str = "No matching datasets found";

/// Datasets found by a search, keyed by their display string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetIndex {
    /// Display strings, sorted
    pub names: Vec<String>,
    pub paths: BTreeMap<String, PathBuf>,
}

impl DatasetIndex {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn path_of(&self, display: &str) -> Option<&Path> {
        self.paths.get(display).map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(DatasetIndex),
    NoMatches,
    /// Neither the requested nor the fallback directory exists
    MissingBaseDir(PathBuf),
}

/// A dataset opened from the picker
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub dir: PathBuf,
    pub metadata: DatasetMetadata,
}

/// Read and validate the descriptor of a dataset directory
pub fn read_metadata(dataset_dir: &Path) -> Result<DatasetMetadata> {
    let path = dataset_dir.join(METADATA_FILE_NAME);
    let raw = fs::read_to_string(&path).map_err(|source| WizardError::MetadataRead {
        path: path.clone(),
        source,
    })?;
    let file: MetadataFile = serde_json::from_str(&raw).map_err(|source| WizardError::MetadataParse {
        path: path.clone(),
        source,
    })?;
    file.complete().ok_or(WizardError::MetadataIncomplete(path))
}

/// Whether a directory carries a wizard descriptor
pub fn has_metadata(dataset_dir: &Path) -> bool {
    dataset_dir.join(METADATA_FILE_NAME).is_file()
}

/// Look for wizard datasets directly below `base_dir` (falling back to `fallback_dir`)
/// whose name contains `term`, ignoring case
pub fn search(term: &str, base_dir: Option<&Path>, fallback_dir: &Path) -> Result<SearchOutcome> {
    let base_dir = match base_dir.filter(|d| d.is_dir()) {
        Some(dir) => dir,
        None => fallback_dir,
    };
    if !base_dir.is_dir() {
        tracing::error!("Base output directory does not exist: {}", base_dir.display());
        return Ok(SearchOutcome::MissingBaseDir(base_dir.to_path_buf()));
    }

    tracing::info!(
        "Searching for wizard datasets in: {} matching {:?}",
        base_dir.display(),
        term
    );
    let needle = term.to_lowercase();
    let mut index = DatasetIndex::default();

    for entry in WalkDir::new(base_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            tracing::error!("Error scanning directory {}: {}", base_dir.display(), e);
            WizardError::Io(e.into())
        })?;
        if !entry.file_type().is_dir() || !has_metadata(entry.path()) {
            continue;
        }

        let metadata = match read_metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(WizardError::MetadataParse { path, .. }) => {
                tracing::warn!("Skipping invalid metadata file: {}", path.display());
                continue;
            }
            Err(e) => {
                tracing::error!("Skipping dataset {}: {}", entry.path().display(), e);
                continue;
            }
        };

        if needle.is_empty() || metadata.lora_name.to_lowercase().contains(&needle) {
            let display = metadata.display_name();
            index.names.push(display.clone());
            index.paths.insert(display, entry.path().to_path_buf());
        }
    }

    if index.is_empty() {
        tracing::info!("No matching datasets found.");
        return Ok(SearchOutcome::NoMatches);
    }

    index.names.sort();
    tracing::info!("Found {} matching datasets.", index.names.len());
    Ok(SearchOutcome::Found(index))
}

/// Open the dataset chosen in the picker
pub fn load(selection: Option<&str>, index: &DatasetIndex) -> Result<LoadedDataset> {
    let selection = match selection {
        Some(s) if !s.is_empty() && s != NO_MATCHES => s,
        _ => return Err(WizardError::NoSelection),
    };
    let dir = index.path_of(selection).ok_or(WizardError::UnknownSelection)?;

    if !dir.is_dir() {
        return Err(WizardError::InvalidDatasetPath(dir.to_path_buf()));
    }
    if !has_metadata(dir) {
        return Err(WizardError::MetadataMissing(dir.join(METADATA_FILE_NAME)));
    }

    let metadata = read_metadata(dir)?;
    tracing::info!("Successfully loaded metadata from: {}", dir.display());

    Ok(LoadedDataset {
        dir: dir.to_path_buf(),
        metadata,
    })
}

/// `<digits>_<anything>`
fn is_image_folder_name(name: &str) -> bool {
    match name.split_once('_') {
        Some((repeats, _)) => !repeats.is_empty() && repeats.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// The `img/<repeats>_<name>` folder of a dataset. With several candidates
/// the first by name wins.
pub fn find_image_folder(dataset_dir: &Path) -> Option<PathBuf> {
    let img_dir = dataset_dir.join("img");
    if !img_dir.is_dir() {
        return None;
    }

    let candidates: Vec<PathBuf> = WalkDir::new(&img_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| is_image_folder_name(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect();

    if candidates.len() > 1 {
        tracing::warn!(
            "Found {} image folders in {}, using {}",
            candidates.len(),
            img_dir.display(),
            candidates[0].display()
        );
    }
    candidates.into_iter().next()
}

/// Sorted image file names in `dir`
pub fn list_images(dir: &Path) -> Result<Vec<String>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if is_image_name(&name) {
            images.push(name);
        }
    }
    images.sort();
    Ok(images)
}
