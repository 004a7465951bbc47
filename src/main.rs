use clap::Parser;
use iced::widget::{button, column, container, row, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod dataset;
mod error;
mod state;
mod ui;
mod wizard;

use config::WizardConfig;
use state::page::PageRequest;
use ui::WizardMessage;
use wizard::{NativeConfirm, TrainingFolders, Wizard};

/// Main application state: the manual training folders view hosting the wizard
struct LoraWizardApp {
    wizard: Wizard,
    /// Output folder field of the manual view; the wizard creates datasets here
    output_dir: String,
    /// Folders handed over by the last finished wizard run
    folders: Option<TrainingFolders>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Start LoRA Wizard"
    StartWizard,
    OutputDirChanged(String),
    BrowseOutputDir,
    Wizard(WizardMessage),
}

impl LoraWizardApp {
    fn new(config: WizardConfig) -> (Self, Task<Message>) {
        let output_dir = config
            .output_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        tracing::info!("LoRA wizard initialized (fallback outputs: {})", config.fallback_dir().display());

        (
            LoraWizardApp {
                wizard: Wizard::new(config),
                output_dir,
                folders: None,
            },
            Task::none(),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::StartWizard => self.wizard.start(),
            Message::OutputDirChanged(value) => self.output_dir = value,
            Message::BrowseOutputDir => {
                if let Some(folder) = FileDialog::new()
                    .set_title("Select Output Folder")
                    .pick_folder()
                {
                    self.output_dir = folder.display().to_string();
                }
            }
            Message::Wizard(message) => self.update_wizard(message),
        }

        Task::none()
    }

    fn update_wizard(&mut self, message: WizardMessage) {
        let wizard = &mut self.wizard;
        match message {
            WizardMessage::LoraTypeSelected(lora_type) => wizard.set_lora_type(lora_type),
            WizardMessage::LoraNameChanged(name) => wizard.set_lora_name(name),
            WizardMessage::NextFromBasics => wizard.go_to_upload(),
            WizardMessage::SearchTermChanged(term) => wizard.set_search_term(term),
            WizardMessage::Search => wizard.search(&self.output_dir),
            WizardMessage::DatasetSelected(display) => wizard.select_dataset(display),
            WizardMessage::LoadSelected => wizard.load_selected(),
            WizardMessage::PickUploads => {
                if let Some(paths) = FileDialog::new()
                    .set_title("Select images or zip files")
                    .add_filter("Images and zip archives", &["png", "jpg", "jpeg", "webp", "bmp", "zip"])
                    .pick_files()
                {
                    wizard.add_uploads(paths);
                }
            }
            WizardMessage::ClearUploads => wizard.clear_uploads(),
            WizardMessage::BackFromUpload | WizardMessage::BackToStart => wizard.back_to_basics(),
            WizardMessage::NextFromUpload => wizard.submit_uploads(&self.output_dir),
            WizardMessage::PageSizeSelected(size) => wizard.set_page_size(&size.to_string()),
            WizardMessage::PrevPage => wizard.navigate(PageRequest::Step(-1)),
            WizardMessage::NextPage => wizard.navigate(PageRequest::Step(1)),
            WizardMessage::GotoTextChanged(value) => wizard.set_goto_text(value),
            WizardMessage::GotoPage => wizard.goto_page(),
            WizardMessage::CaptionExtensionChanged(ext) => wizard.set_caption_extension(ext),
            WizardMessage::Slot(index, action) => wizard.slot(index, action),
            WizardMessage::Finish => {
                if let Some(folders) = wizard.finish() {
                    self.folders = Some(folders);
                }
            }
            WizardMessage::Cancel => wizard.cancel(&NativeConfirm),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        if self.wizard.is_open() {
            return container(ui::view(self.wizard.session()).map(Message::Wizard))
                .width(Length::Fill)
                .height(Length::Fill)
                .into();
        }

        let mut content: Column<Message> = column![
            text("LoRA Training").size(48),
            row![
                text_input("Output folder", &self.output_dir)
                    .on_input(Message::OutputDirChanged)
                    .width(Length::Fixed(480.0)),
                button("Browse...").on_press(Message::BrowseOutputDir),
            ]
            .spacing(10),
            button("Start LoRA Wizard")
                .on_press(Message::StartWizard)
                .padding(10),
        ]
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        if let Some(folders) = &self.folders {
            content = content.push(
                column![
                    text(format!("Image folder: {}", folders.train_data_dir.display())),
                    text(format!("Output folder: {}", folders.output_dir.display())),
                    text(format!("Logging folder: {}", folders.logging_dir.display())),
                    text(format!("Model output name: {}", folders.output_name)),
                ]
                .spacing(6),
            );
        }

        if let Some(notice) = self.wizard.session().latest_notice() {
            content = content.push(text(&notice.message).size(14));
        }

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    let config = WizardConfig::parse();

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    iced::application("LoRA Training Wizard", LoraWizardApp::update, LoraWizardApp::view)
        .theme(LoraWizardApp::theme)
        .centered()
        .run_with(move || LoraWizardApp::new(config))
}
