use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, WizardError};

/// Caption extension used when none is configured
pub const DEFAULT_CAPTION_EXTENSION: &str = ".txt";

/// Make sure a caption extension is usable: empty means `.txt`,
/// a missing leading dot is added
pub fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim();
    if extension.is_empty() {
        DEFAULT_CAPTION_EXTENSION.to_string()
    } else if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

/// Path of the caption file belonging to `image_filename` inside `dir`
pub fn caption_path(image_filename: &str, dir: &Path, extension: &str) -> PathBuf {
    let stem = Path::new(image_filename)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    dir.join(format!("{}{}", stem, normalize_extension(extension)))
}

/// Split caption text into trimmed, non-empty tags (order kept, no dedup)
pub fn parse_tags(caption: &str) -> Vec<String> {
    caption
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Append a tag unless it is blank or already present.
/// Returns true when the list changed.
pub fn push_tag(tags: &mut Vec<String>, new_tag: &str) -> bool {
    let new_tag = new_tag.trim();
    if new_tag.is_empty() || tags.iter().any(|t| t == new_tag) {
        return false;
    }
    tags.push(new_tag.to_string());
    true
}

/// Reads and writes the caption files of one image folder
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStore {
    dir: PathBuf,
    extension: String,
}

impl CaptionStore {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: normalize_extension(extension),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, image_filename: &str) -> PathBuf {
        caption_path(image_filename, &self.dir, &self.extension)
    }

    /// Tags of an image; a missing or unreadable caption reads as no tags
    pub fn read(&self, image_filename: &str) -> Vec<String> {
        let path = self.path_for(image_filename);
        if !path.exists() {
            return Vec::new();
        }

        match fs::read_to_string(&path) {
            Ok(caption) => parse_tags(&caption),
            Err(e) => {
                tracing::error!("Error reading caption file {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Overwrite the caption of an image with `tags`
    pub fn write(&self, image_filename: &str, tags: &[String]) -> Result<()> {
        if image_filename.is_empty() {
            tracing::warn!("Attempted to save caption with missing image filename");
            return Ok(());
        }

        let path = self.path_for(image_filename);
        fs::write(&path, tags.join(", ")).map_err(|source| WizardError::Caption {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Saved caption for {} to {}", image_filename, path.display());
        Ok(())
    }

    /// Add a tag to an image and persist it if anything changed
    pub fn add_tag(&self, image_filename: &str, tags: &mut Vec<String>, new_tag: &str) -> Result<bool> {
        if !push_tag(tags, new_tag) {
            return Ok(false);
        }
        self.write(image_filename, tags)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_caption_path() {
        let dir = Path::new("/data/img/10_cat");
        assert_eq!(caption_path("a.png", dir, ".txt"), dir.join("a.txt"));
        assert_eq!(caption_path("a.b.jpg", dir, "caption"), dir.join("a.b.caption"));
        assert_eq!(caption_path("a.png", dir, ""), dir.join("a.txt"));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" a, b ,,c ,  "), tags(&["a", "b", "c"]));
        assert_eq!(parse_tags("x, x"), tags(&["x", "x"]));
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_round_trip_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptionStore::new(dir.path(), ".txt");

        store.write("img.png", &tags(&["a", "b", "c"])).unwrap();
        assert_eq!(store.read("img.png"), tags(&["a", "b", "c"]));
        assert_eq!(fs::read_to_string(dir.path().join("img.txt")).unwrap(), "a, b, c");

        store.write("img.png", &tags(&["c", "a", "c"])).unwrap();
        assert_eq!(store.read("img.png"), tags(&["c", "a", "c"]));
    }

    #[test]
    fn test_missing_caption_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptionStore::new(dir.path(), ".txt");
        assert!(store.read("nothing.png").is_empty());
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptionStore::new(dir.path(), ".txt");
        let mut current = tags(&["a"]);

        assert!(store.add_tag("img.png", &mut current, "  b ").unwrap());
        assert!(!store.add_tag("img.png", &mut current, "b").unwrap());
        assert!(!store.add_tag("img.png", &mut current, "   ").unwrap());

        assert_eq!(current, tags(&["a", "b"]));
        assert_eq!(store.read("img.png"), tags(&["a", "b"]));
    }

    #[test]
    fn test_add_tag_is_case_sensitive() {
        let mut current = tags(&["Cat"]);
        assert!(push_tag(&mut current, "cat"));
        assert_eq!(current, tags(&["Cat", "cat"]));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptionStore::new(dir.path().join("missing"), ".txt");
        let err = store.write("img.png", &tags(&["a"])).unwrap_err();
        assert!(matches!(err, WizardError::Caption { .. }));
    }
}
