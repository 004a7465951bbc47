/// Dataset module
///
/// This module handles everything that touches the dataset on disk:
/// - Importing uploads into a fresh dataset layout (importer.rs)
/// - Finding and loading datasets created earlier (locator.rs)
/// - Reading and writing per-image caption files (caption.rs)

pub mod caption;
pub mod importer;
pub mod locator;

use std::path::Path;

/// Image file extensions the wizard accepts (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "bmp"];

/// Check a file name against the recognized image extensions
pub fn is_image_name(name: &str) -> bool {
    has_extension(name, &IMAGE_EXTENSIONS)
}

/// Check whether a file name is a zip archive
pub fn is_zip_name(name: &str) -> bool {
    has_extension(name, &["zip"])
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    match Path::new(name).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            extensions.contains(&ext.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_checks() {
        assert!(is_image_name("cat.png"));
        assert!(is_image_name("CAT.JPEG"));
        assert!(is_image_name("photo.final.webp"));
        assert!(!is_image_name("notes.txt"));
        assert!(!is_image_name("png"));
        assert!(is_zip_name("batch.ZIP"));
        assert!(!is_zip_name("batch.zip.png"));
    }
}
