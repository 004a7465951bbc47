/// Startup configuration
///
/// Parsed once from the command line (with environment fallbacks) and
/// never mutated afterwards. Grid dimensions live here as constants so the
/// UI and the paginator agree on them.

use clap::Parser;
use std::path::PathBuf;

/// Version string written into every metadata descriptor
pub const WIZARD_VERSION: &str = "1.0";

/// Name of the descriptor file that marks a wizard-created dataset
pub const METADATA_FILE_NAME: &str = "kohya_lora_wizard_metadata.json";

/// Number of columns in the review grid
pub const GRID_COLUMNS: usize = 3;

/// Maximum number of rows in the review grid
pub const GRID_MAX_ROWS: usize = 6;

/// Page sizes offered in the "Images per page" picker (multiples of the column count)
pub const PAGE_SIZE_CHOICES: [usize; 6] = [3, 6, 9, 12, 15, 18];

/// Page size used when nothing (or nothing parseable) was chosen
pub const DEFAULT_IMAGES_PER_PAGE: usize = 9;

/// Width of a grid thumbnail in pixels
pub const THUMBNAIL_WIDTH: f32 = 200.0;

#[derive(Parser, Debug, Clone)]
#[command(name = "lora-wizard", about = "Prepare LoRA training datasets")]
pub struct WizardConfig {
    /// Base directory new datasets are created in (prefills the output folder field)
    #[arg(long, env = "LORA_WIZARD_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory used when the output folder field is empty or invalid
    #[arg(long, env = "LORA_WIZARD_FALLBACK_OUTPUT_DIR")]
    pub fallback_output_dir: Option<PathBuf>,

    /// Extension of the caption file written next to each image
    #[arg(long, default_value = ".txt")]
    pub caption_extension: String,

    /// Images shown per page in the review step
    #[arg(long, default_value_t = DEFAULT_IMAGES_PER_PAGE, value_parser = parse_page_size)]
    pub images_per_page: usize,

    /// Log filter (tracing EnvFilter syntax)
    #[arg(long = "log", env = "LORA_WIZARD_LOG", default_value = "info")]
    pub log_filter: String,
}

impl WizardConfig {
    /// Directory datasets go into when the user did not provide a usable one.
    ///
    /// Defaults to the user data directory:
    /// - Linux: ~/.local/share/lora-wizard/outputs
    /// - macOS: ~/Library/Application Support/lora-wizard/outputs
    /// - Windows: %APPDATA%\lora-wizard\outputs
    pub fn fallback_dir(&self) -> PathBuf {
        if let Some(dir) = &self.fallback_output_dir {
            return dir.clone();
        }

        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("lora-wizard");
        path.push("outputs");
        path
    }

    /// Number of grid slots, i.e. the largest page the review step can show
    pub fn grid_capacity(&self) -> usize {
        GRID_COLUMNS * GRID_MAX_ROWS
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            fallback_output_dir: None,
            caption_extension: ".txt".to_string(),
            images_per_page: DEFAULT_IMAGES_PER_PAGE,
            log_filter: "info".to_string(),
        }
    }
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;

    if PAGE_SIZE_CHOICES.contains(&value) {
        Ok(value)
    } else {
        Err(format!("images per page must be one of {:?}", PAGE_SIZE_CHOICES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WizardConfig::try_parse_from(["lora-wizard"]).unwrap();
        assert_eq!(config.images_per_page, DEFAULT_IMAGES_PER_PAGE);
        assert_eq!(config.caption_extension, ".txt");
        assert_eq!(config.grid_capacity(), 18);
    }

    #[test]
    fn test_page_size_must_be_a_choice() {
        assert!(WizardConfig::try_parse_from(["lora-wizard", "--images-per-page", "12"]).is_ok());
        assert!(WizardConfig::try_parse_from(["lora-wizard", "--images-per-page", "7"]).is_err());
        assert!(WizardConfig::try_parse_from(["lora-wizard", "--images-per-page", "many"]).is_err());
    }

    #[test]
    fn test_explicit_fallback_dir_wins() {
        let config = WizardConfig::try_parse_from([
            "lora-wizard",
            "--fallback-output-dir",
            "/tmp/wizard-out",
        ])
        .unwrap();
        assert_eq!(config.fallback_dir(), PathBuf::from("/tmp/wizard-out"));
    }
}
