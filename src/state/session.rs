/// Wizard session state
///
/// One struct holds everything the wizard remembers between interactions.
/// Handlers take it by `&mut` and update named fields.

use std::path::PathBuf;

use super::data::{LoraType, Notice, UploadedFile};
use super::page::PageState;
use crate::config::WizardConfig;
use crate::dataset::caption::normalize_extension;
use crate::dataset::locator::DatasetIndex;

/// Visible step of the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    /// Step 1: name and type, or load an existing dataset
    Basics,
    /// Step 2: pick images / zip archives
    Upload,
    /// Step 3: review images and edit their tags
    Review,
}

/// One cell of the review grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slot {
    pub filename: String,
    pub image_path: PathBuf,
    /// Tags offered as checkboxes
    pub choices: Vec<String>,
    /// Tags currently checked (what the caption file holds)
    pub selected: Vec<String>,
    /// Contents of the "Add tag" box
    pub new_tag: String,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.filename.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    /// `None` while the wizard is closed and the manual view is shown
    pub step: Option<WizardStep>,
    pub lora_type: LoraType,
    pub lora_name: String,
    /// Dataset created or loaded by this session
    pub dataset_dir: Option<PathBuf>,

    pub search_term: String,
    pub found: DatasetIndex,
    /// Entries of the dataset picker (may be the single "no matches" entry)
    pub picker: Vec<String>,
    pub selected_dataset: Option<String>,

    pub uploads: Vec<UploadedFile>,

    pub image_dir: Option<PathBuf>,
    pub image_files: Vec<String>,
    pub page: PageState,
    pub goto_text: String,
    pub caption_extension: String,
    pub slots: Vec<Slot>,

    /// Banner message; a newer one replaces it
    pub notice: Option<Notice>,
}

impl Session {
    pub fn new(config: &WizardConfig) -> Self {
        Self {
            step: None,
            lora_type: LoraType::default(),
            lora_name: String::new(),
            dataset_dir: None,
            search_term: String::new(),
            found: DatasetIndex::default(),
            picker: Vec::new(),
            selected_dataset: None,
            uploads: Vec::new(),
            image_dir: None,
            image_files: Vec::new(),
            page: PageState::new(config.images_per_page),
            goto_text: String::new(),
            caption_extension: normalize_extension(&config.caption_extension),
            slots: vec![Slot::default(); config.grid_capacity()],
            notice: None,
        }
    }

    /// Forget everything except the dataset path, which cancel handles itself
    pub fn reset(&mut self, config: &WizardConfig) {
        let dataset_dir = self.dataset_dir.take();
        *self = Session::new(config);
        self.dataset_dir = dataset_dir;
    }

    /// Drop the review listing (after a failed import or load)
    pub fn clear_review(&mut self) {
        self.image_dir = None;
        self.image_files.clear();
        self.page.reset(0);
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Number of grid slots holding an image on the current page
    pub fn visible_slots(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_notice_is_kept() {
        let config = WizardConfig::default();
        let mut session = Session::new(&config);
        assert!(session.latest_notice().is_none());

        session.notify(Notice::info("first"));
        session.notify(Notice::error("second"));
        assert_eq!(session.latest_notice(), Some(&Notice::error("second")));

        session.reset(&config);
        assert!(session.latest_notice().is_none());
    }
}
