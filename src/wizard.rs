/// Wizard step controller
///
/// Every user interaction maps to exactly one method here. Each method runs
/// to completion, updates the session and leaves a notice for anything the
/// user should see.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::WizardConfig;
use crate::dataset::caption::CaptionStore;
use crate::dataset::importer::{ImportRequest, Importer};
use crate::dataset::locator::{self, SearchOutcome, NO_MATCHES};
use crate::error::WizardError;
use crate::state::data::{LoraType, Notice, UploadedFile};
use crate::state::page::{Navigation, PageRequest};
use crate::state::session::{Session, Slot, WizardStep};

/// Yes/no prompt used before deleting a dataset
pub trait Confirm {
    fn confirm(&self, title: &str, description: &str) -> bool;
}

/// Native dialog through `rfd`
pub struct NativeConfirm;

impl Confirm for NativeConfirm {
    fn confirm(&self, title: &str, description: &str) -> bool {
        let answer = rfd::MessageDialog::new()
            .set_title(title)
            .set_description(description)
            .set_level(rfd::MessageLevel::Warning)
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        matches!(answer, rfd::MessageDialogResult::Yes)
    }
}

/// Per-slot interactions of the review grid
#[derive(Debug, Clone, PartialEq)]
pub enum SlotAction {
    /// A tag checkbox was toggled
    ToggleTag(String, bool),
    /// The "Add tag" box changed
    TagInput(String),
    /// Enter was pressed in the "Add tag" box
    SubmitTag,
}

/// Folders handed to the manual training configuration when the wizard finishes
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFolders {
    /// Parent of the `<repeats>_<name>` image folder
    pub train_data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logging_dir: PathBuf,
    pub output_name: String,
}

pub struct Wizard {
    config: WizardConfig,
    session: Session,
}

impl Wizard {
    pub fn new(config: WizardConfig) -> Self {
        let session = Session::new(&config);
        Self { config, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.session.step.is_some()
    }

    /// Open the wizard on step 1 with a clean session
    pub fn start(&mut self) {
        self.session = Session::new(&self.config);
        self.session.step = Some(WizardStep::Basics);
        tracing::info!("Wizard started.");
    }

    /// Close the wizard. A dataset this session created is only deleted
    /// after the user confirms.
    pub fn cancel(&mut self, confirm: &dyn Confirm) {
        tracing::info!("Wizard cancelled.");
        let mut failure = None;

        if let Some(dir) = self.session.dataset_dir.clone().filter(|d| d.is_dir()) {
            if locator::has_metadata(&dir) {
                let question = format!(
                    "Delete the dataset folder created by the wizard?\n\n{}",
                    dir.display()
                );
                if confirm.confirm("Confirm Deletion", &question) {
                    failure = self.delete_dataset(&dir);
                } else {
                    tracing::info!("Skipping deletion of {} as per user choice.", dir.display());
                }
            } else {
                tracing::info!(
                    "Skipping deletion prompt for {} as it might not be a wizard-managed folder (no metadata file).",
                    dir.display()
                );
                self.session.dataset_dir = None;
            }
        }

        self.session.reset(&self.config);
        if let Some(notice) = failure {
            self.session.notify(notice);
        }
    }

    fn delete_dataset(&mut self, dir: &Path) -> Option<Notice> {
        tracing::warn!("Cleaning up wizard-created dataset folder: {}", dir.display());
        self.session.dataset_dir = None;
        match fs::remove_dir_all(dir) {
            Ok(()) => {
                tracing::info!("Successfully removed {}", dir.display());
                None
            }
            Err(e) => {
                tracing::error!("Error cleaning up folder {}: {}", dir.display(), e);
                Some(Notice::error(format!("Failed to clean up folder: {e}")))
            }
        }
    }

    // ========== Step 1 ==========

    pub fn set_lora_type(&mut self, lora_type: LoraType) {
        self.session.lora_type = lora_type;
    }

    pub fn set_lora_name(&mut self, name: String) {
        self.session.lora_name = name;
    }

    /// Step 1 -> Step 2, only with a name
    pub fn go_to_upload(&mut self) {
        if self.session.lora_name.trim().is_empty() {
            self.session
                .notify(Notice::warning("Please enter a name for your LoRA training."));
            self.session.step = Some(WizardStep::Basics);
            return;
        }
        tracing::info!(
            "Wizard Step 1 Data: Type={}, Name={}",
            self.session.lora_type,
            self.session.lora_name
        );
        self.session.step = Some(WizardStep::Upload);
    }

    pub fn set_search_term(&mut self, term: String) {
        self.session.search_term = term;
    }

    /// Search `output_dir` for datasets created earlier
    pub fn search(&mut self, output_dir: &str) {
        let requested = non_empty_path(output_dir);
        let outcome = locator::search(
            &self.session.search_term,
            requested.as_deref(),
            &self.config.fallback_dir(),
        );

        let session = &mut self.session;
        session.found = Default::default();
        session.selected_dataset = None;

        match outcome {
            Ok(SearchOutcome::Found(index)) => {
                session.picker = index.names.clone();
                session.selected_dataset = index.names.first().cloned();
                session.found = index;
            }
            Ok(SearchOutcome::NoMatches) => {
                session.picker = vec![NO_MATCHES.to_string()];
                session.notify(Notice::info("No matching datasets found."));
            }
            Ok(SearchOutcome::MissingBaseDir(dir)) => {
                session.picker.clear();
                session.notify(Notice::warning(format!(
                    "Could not find the directory to search in: {}",
                    dir.display()
                )));
            }
            Err(e) => {
                session.picker.clear();
                session.notify(Notice::error(format!("Error scanning for datasets: {e}")));
            }
        }
    }

    pub fn select_dataset(&mut self, display: String) {
        self.session.selected_dataset = Some(display);
    }

    /// Open the selected dataset and jump to step 3
    pub fn load_selected(&mut self) {
        let loaded = locator::load(self.session.selected_dataset.as_deref(), &self.session.found);

        match loaded {
            Ok(dataset) => {
                let meta = dataset.metadata;
                if !meta.is_prepared() {
                    self.session.notify(Notice::warning(format!(
                        "Dataset status is '{}'. It might be incomplete. Proceeding anyway.",
                        meta.status
                    )));
                }
                self.session.lora_name = meta.lora_name.clone();
                match meta.known_type() {
                    Some(lora_type) => self.session.lora_type = lora_type,
                    None => tracing::warn!(
                        "Unrecognized LoRA type {:?} in {}; keeping {}",
                        meta.lora_type,
                        dataset.dir.display(),
                        self.session.lora_type
                    ),
                }
                self.session.notify(Notice::info(format!(
                    "Successfully loaded dataset: {} ({})",
                    meta.lora_name, meta.lora_type
                )));
                self.enter_review(&dataset.dir);
            }
            Err(e) => {
                self.report(&e);
                self.session.dataset_dir = None;
                self.session.clear_review();
                self.session.step = Some(WizardStep::Basics);
            }
        }
    }

    // ========== Step 2 ==========

    pub fn add_uploads(&mut self, paths: Vec<PathBuf>) {
        self.session
            .uploads
            .extend(paths.into_iter().map(UploadedFile::from_path));
    }

    pub fn clear_uploads(&mut self) {
        self.session.uploads.clear();
    }

    /// Step 2 / Step 3 -> Step 1
    pub fn back_to_basics(&mut self) {
        self.session.step = Some(WizardStep::Basics);
    }

    /// Build the dataset from the uploads; step 3 on success, stay on step 2 otherwise
    pub fn submit_uploads(&mut self, output_dir: &str) {
        let request = ImportRequest {
            files: self.session.uploads.clone(),
            lora_name: self.session.lora_name.clone(),
            lora_type: Some(self.session.lora_type),
            output_dir: non_empty_path(output_dir),
        };

        match Importer::new(&self.config).import(&request) {
            Ok(report) => {
                self.session.notify(Notice::info(report.summary()));
                self.session.lora_name = report.metadata.lora_name.clone();
                self.session.uploads.clear();
                self.enter_review(&report.dataset_dir);
            }
            Err(e) => {
                self.report(&e);
                self.session.dataset_dir = None;
                self.session.clear_review();
                self.session.step = Some(WizardStep::Upload);
            }
        }
    }

    // ========== Step 3 ==========

    /// Show step 3 for `dataset_dir`
    pub fn enter_review(&mut self, dataset_dir: &Path) {
        tracing::info!("Entering Step 3 for dataset: {}", dataset_dir.display());
        self.session.dataset_dir = Some(dataset_dir.to_path_buf());
        self.session.step = Some(WizardStep::Review);
        self.session.clear_review();

        let Some(image_dir) = locator::find_image_folder(dataset_dir) else {
            let e = WizardError::ImageFolderMissing(dataset_dir.to_path_buf());
            tracing::error!("{}", e);
            self.report(&e);
            return;
        };

        match locator::list_images(&image_dir) {
            Ok(files) => {
                self.session.page.reset(files.len());
                tracing::info!(
                    "Found {} images in {}. Total pages: {}",
                    files.len(),
                    image_dir.display(),
                    self.session.page.total_pages
                );
                self.session.image_files = files;
                self.session.image_dir = Some(image_dir);
            }
            Err(e) => {
                tracing::error!("Error scanning image directory {}: {}", image_dir.display(), e);
                self.session
                    .notify(Notice::error(format!("Error scanning image directory: {e}")));
            }
        }
        self.refresh_display();
    }

    /// Previous / next / goto / stay
    pub fn navigate(&mut self, request: PageRequest<'_>) {
        let count = self.session.image_files.len();
        if let Navigation::InvalidGoto(raw) = self.session.page.navigate(count, request) {
            self.session
                .notify(Notice::warning(format!("Invalid page number entered: {raw}")));
        }
        self.refresh_display();
    }

    pub fn set_goto_text(&mut self, text: String) {
        self.session.goto_text = text;
    }

    /// Jump to the page typed in the goto box
    pub fn goto_page(&mut self) {
        let raw = self.session.goto_text.clone();
        self.navigate(PageRequest::Goto(&raw));
    }

    pub fn set_page_size(&mut self, raw: &str) {
        let count = self.session.image_files.len();
        self.session.page.set_page_size(raw, count);
        self.refresh_display();
    }

    pub fn set_caption_extension(&mut self, extension: String) {
        self.session.caption_extension = extension;
        self.session.page.refresh += 1;
        self.refresh_display();
    }

    fn caption_store(&self) -> Option<CaptionStore> {
        self.session
            .image_dir
            .as_ref()
            .map(|dir| CaptionStore::new(dir, &self.session.caption_extension))
    }

    /// Refill the grid slots for the current page
    pub fn refresh_display(&mut self) {
        let store = self.caption_store();
        let session = &mut self.session;
        tracing::debug!(
            "Updating Step 3 display: page={}, ipp={}",
            session.page.current_page,
            session.page.page_size
        );

        let range = match &store {
            Some(_) => session
                .page
                .page_range(session.image_files.len(), session.slots.len()),
            None => 0..0,
        };

        let page_files = &session.image_files[range];
        for (index, slot) in session.slots.iter_mut().enumerate() {
            *slot = match (page_files.get(index), &store) {
                (Some(filename), Some(store)) => {
                    let tags = store.read(filename);
                    Slot {
                        filename: filename.clone(),
                        image_path: store.dir().join(filename),
                        choices: tags.clone(),
                        selected: tags,
                        new_tag: String::new(),
                    }
                }
                _ => Slot::default(),
            };
        }
    }

    /// Single entry point for every grid cell
    pub fn slot(&mut self, index: usize, action: SlotAction) {
        let store = self.caption_store();
        let Some(slot) = self.session.slots.get_mut(index) else {
            tracing::warn!("Ignoring action for unknown grid slot {}", index);
            return;
        };
        if slot.is_empty() {
            return;
        }

        let failure = match action {
            SlotAction::TagInput(text) => {
                slot.new_tag = text;
                None
            }
            SlotAction::ToggleTag(tag, checked) => {
                slot.selected = slot
                    .choices
                    .iter()
                    .filter(|t| if **t == tag { checked } else { slot.selected.contains(t) })
                    .cloned()
                    .collect();
                store.as_ref().and_then(|s| s.write(&slot.filename, &slot.selected).err())
            }
            SlotAction::SubmitTag => {
                let new_tag = std::mem::take(&mut slot.new_tag);
                let added = match &store {
                    Some(store) => store.add_tag(&slot.filename, &mut slot.selected, &new_tag),
                    None => Ok(false),
                };
                // The tag list changed unless nothing was added
                if !matches!(added, Ok(false)) {
                    slot.choices = slot.selected.clone();
                }
                added.err()
            }
        };

        if let Some(e) = failure {
            tracing::error!("{}", e);
            self.session.notify(Notice::error(e.to_string()));
        }
    }

    /// Close the wizard and return the folders for the training configuration
    pub fn finish(&mut self) -> Option<TrainingFolders> {
        let Some(dataset_dir) = self.session.dataset_dir.clone() else {
            self.session
                .notify(Notice::warning("No dataset prepared yet."));
            return None;
        };

        let folders = TrainingFolders {
            train_data_dir: dataset_dir.join("img"),
            output_dir: dataset_dir.join("model"),
            logging_dir: dataset_dir.join("log"),
            output_name: self.session.lora_name.clone(),
        };
        tracing::info!("Wizard finished with dataset {}", dataset_dir.display());

        self.session = Session::new(&self.config);
        Some(folders)
    }

    fn report(&mut self, e: &WizardError) {
        let notice = if e.is_validation() {
            tracing::warn!("{}", e);
            Notice::warning(e.to_string())
        } else {
            tracing::error!("{}", e);
            Notice::error(e.to_string())
        };
        self.session.notify(notice);
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::METADATA_FILE_NAME;
    use crate::state::data::NoticeLevel;
    use std::cell::Cell;

    struct Answer {
        yes: bool,
        asked: Cell<u32>,
    }

    impl Answer {
        fn new(yes: bool) -> Self {
            Self { yes, asked: Cell::new(0) }
        }
    }

    impl Confirm for Answer {
        fn confirm(&self, _title: &str, _description: &str) -> bool {
            self.asked.set(self.asked.get() + 1);
            self.yes
        }
    }

    fn wizard_in(out: &Path) -> Wizard {
        Wizard::new(WizardConfig {
            fallback_output_dir: Some(out.to_path_buf()),
            ..WizardConfig::default()
        })
    }

    fn write_images(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("img{i:02}.png"));
                fs::write(&path, b"png").unwrap();
                path
            })
            .collect()
    }

    fn imported(out: &Path, uploads: &Path, count: usize) -> Wizard {
        let mut wizard = wizard_in(out);
        wizard.start();
        wizard.set_lora_name("cat".into());
        wizard.go_to_upload();
        wizard.add_uploads(write_images(uploads, count));
        wizard.submit_uploads(&out.to_string_lossy());
        wizard
    }

    #[test]
    fn test_name_required_for_upload_step() {
        let out = tempfile::tempdir().unwrap();
        let mut wizard = wizard_in(out.path());
        wizard.start();

        wizard.set_lora_name("   ".into());
        wizard.go_to_upload();
        assert_eq!(wizard.session().step, Some(WizardStep::Basics));
        assert_eq!(wizard.session().latest_notice().unwrap().level, NoticeLevel::Warning);

        wizard.set_lora_name("cat".into());
        wizard.go_to_upload();
        assert_eq!(wizard.session().step, Some(WizardStep::Upload));

        wizard.back_to_basics();
        assert_eq!(wizard.session().step, Some(WizardStep::Basics));
    }

    #[test]
    fn test_failed_import_stays_on_upload() {
        let out = tempfile::tempdir().unwrap();
        let mut wizard = wizard_in(out.path());
        wizard.start();
        wizard.set_lora_name("cat".into());
        wizard.go_to_upload();

        wizard.submit_uploads(&out.path().to_string_lossy());

        assert_eq!(wizard.session().step, Some(WizardStep::Upload));
        assert_eq!(wizard.session().dataset_dir, None);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_import_enters_review() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let wizard = imported(out.path(), uploads.path(), 11);
        let session = wizard.session();

        assert_eq!(session.step, Some(WizardStep::Review));
        assert_eq!(session.image_files.len(), 11);
        assert_eq!(session.page.total_pages, 2);
        assert_eq!(session.page.current_page, 1);
        assert_eq!(session.visible_slots(), 9);
        assert_eq!(session.slots[0].filename, "img00.png");
        assert!(session.slots[0].image_path.ends_with("img00.png"));
        assert!(session.slots[0].image_path.is_file());
    }

    #[test]
    fn test_pagination_updates_grid() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let mut wizard = imported(out.path(), uploads.path(), 11);

        wizard.navigate(PageRequest::Step(1));
        assert_eq!(wizard.session().page.current_page, 2);
        assert_eq!(wizard.session().visible_slots(), 2);
        assert_eq!(wizard.session().slots[0].filename, "img09.png");

        wizard.set_goto_text("nope".into());
        wizard.goto_page();
        assert_eq!(wizard.session().page.current_page, 2);
        assert_eq!(wizard.session().latest_notice().unwrap().level, NoticeLevel::Warning);

        wizard.set_page_size("18");
        assert_eq!(wizard.session().page.current_page, 1);
        assert_eq!(wizard.session().visible_slots(), 11);
    }

    #[test]
    fn test_tag_editing_persists() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let mut wizard = imported(out.path(), uploads.path(), 1);
        let caption = wizard.session().image_dir.clone().unwrap().join("img00.txt");

        for tag in ["a", "b", "a"] {
            wizard.slot(0, SlotAction::TagInput(tag.into()));
            wizard.slot(0, SlotAction::SubmitTag);
        }
        assert_eq!(fs::read_to_string(&caption).unwrap(), "a, b");
        assert_eq!(wizard.session().slots[0].new_tag, "");

        wizard.slot(0, SlotAction::ToggleTag("a".into(), false));
        assert_eq!(fs::read_to_string(&caption).unwrap(), "b");
        assert_eq!(wizard.session().slots[0].choices, vec!["a", "b"]);

        wizard.slot(0, SlotAction::ToggleTag("a".into(), true));
        assert_eq!(fs::read_to_string(&caption).unwrap(), "a, b");

        // Empty slots ignore input
        wizard.slot(5, SlotAction::SubmitTag);
        wizard.slot(99, SlotAction::SubmitTag);
    }

    #[test]
    fn test_caption_extension_change_rereads_tags() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let mut wizard = imported(out.path(), uploads.path(), 1);
        let image_dir = wizard.session().image_dir.clone().unwrap();
        fs::write(image_dir.join("img00.caption"), "x, y").unwrap();

        assert!(wizard.session().slots[0].selected.is_empty());
        wizard.set_caption_extension(".caption".into());
        assert_eq!(wizard.session().slots[0].selected, vec!["x", "y"]);
    }

    #[test]
    fn test_cancel_deletes_only_after_confirmation() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();

        let mut wizard = imported(out.path(), uploads.path(), 1);
        let dataset = wizard.session().dataset_dir.clone().unwrap();
        let no = Answer::new(false);
        wizard.cancel(&no);
        assert_eq!(no.asked.get(), 1);
        assert!(dataset.is_dir());
        assert!(!wizard.is_open());
        assert_eq!(wizard.session().dataset_dir, Some(dataset.clone()));

        let mut wizard = wizard_in(out.path());
        wizard.start();
        wizard.enter_review(&dataset);
        let yes = Answer::new(true);
        wizard.cancel(&yes);
        assert!(!dataset.exists());
        assert_eq!(wizard.session().dataset_dir, None);
    }

    #[test]
    fn test_cancel_never_deletes_user_folder() {
        let out = tempfile::tempdir().unwrap();
        let user_dir = out.path().join("mine");
        fs::create_dir_all(user_dir.join("img").join("1_mine")).unwrap();

        let mut wizard = wizard_in(out.path());
        wizard.start();
        wizard.enter_review(&user_dir);
        assert!(!user_dir.join(METADATA_FILE_NAME).exists());

        let yes = Answer::new(true);
        wizard.cancel(&yes);
        assert_eq!(yes.asked.get(), 0);
        assert!(user_dir.is_dir());
        assert_eq!(wizard.session().dataset_dir, None);
    }

    #[test]
    fn test_search_and_load() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let first = imported(out.path(), uploads.path(), 2);
        let dataset = first.session().dataset_dir.clone().unwrap();

        let mut wizard = wizard_in(out.path());
        wizard.start();
        wizard.set_search_term("CAT".into());
        wizard.search(&out.path().to_string_lossy());
        assert_eq!(wizard.session().picker.len(), 1);

        wizard.load_selected();
        assert_eq!(wizard.session().step, Some(WizardStep::Review));
        assert_eq!(wizard.session().dataset_dir, Some(dataset));
        assert_eq!(wizard.session().lora_name, "cat");
        assert_eq!(wizard.session().image_files.len(), 2);

        wizard.set_search_term("dog".into());
        wizard.search(&out.path().to_string_lossy());
        assert_eq!(wizard.session().picker, vec![NO_MATCHES.to_string()]);
        wizard.load_selected();
        assert_eq!(wizard.session().step, Some(WizardStep::Basics));
    }

    #[test]
    fn test_finish_hands_over_folders() {
        let out = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let mut wizard = imported(out.path(), uploads.path(), 1);
        let dataset = wizard.session().dataset_dir.clone().unwrap();

        let folders = wizard.finish().unwrap();
        assert_eq!(folders.train_data_dir, dataset.join("img"));
        assert_eq!(folders.output_dir, dataset.join("model"));
        assert_eq!(folders.logging_dir, dataset.join("log"));
        assert_eq!(folders.output_name, "cat");
        assert!(!wizard.is_open());
        assert!(dataset.is_dir());
    }
}
