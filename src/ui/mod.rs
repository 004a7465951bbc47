/// Wizard views
///
/// One view function per step plus the review grid (grid.rs). Views only
/// read the session; every interaction comes back as a `WizardMessage`.

pub mod grid;

use iced::widget::{button, column, container, pick_list, radio, row, text, text_input, Column};
use iced::{Color, Element, Length};

use crate::config::PAGE_SIZE_CHOICES;
use crate::state::data::{LoraType, Notice, NoticeLevel};
use crate::state::page::PageState;
use crate::state::session::{Session, WizardStep};
use crate::wizard::SlotAction;

/// Interactions inside the wizard
#[derive(Debug, Clone)]
pub enum WizardMessage {
    // Step 1
    LoraTypeSelected(LoraType),
    LoraNameChanged(String),
    NextFromBasics,
    SearchTermChanged(String),
    Search,
    DatasetSelected(String),
    LoadSelected,
    // Step 2
    PickUploads,
    ClearUploads,
    BackFromUpload,
    NextFromUpload,
    // Step 3
    PageSizeSelected(usize),
    PrevPage,
    NextPage,
    GotoTextChanged(String),
    GotoPage,
    CaptionExtensionChanged(String),
    Slot(usize, SlotAction),
    BackToStart,
    Finish,
    // Any step
    Cancel,
}

/// The visible step, with the latest notice above it
pub fn view(session: &Session) -> Element<'_, WizardMessage> {
    let body = match session.step {
        Some(WizardStep::Basics) => basics(session),
        Some(WizardStep::Upload) => upload(session),
        Some(WizardStep::Review) => review(session),
        None => column![].into(),
    };

    let mut content = Column::new().spacing(16).padding(24);
    if let Some(notice) = session.latest_notice() {
        content = content.push(notice_banner(notice));
    }
    content.push(body).into()
}

fn notice_banner(notice: &Notice) -> Element<'_, WizardMessage> {
    let color = match notice.level {
        NoticeLevel::Info => Color::from_rgb(0.55, 0.8, 0.55),
        NoticeLevel::Warning => Color::from_rgb(0.95, 0.75, 0.3),
        NoticeLevel::Error => Color::from_rgb(0.95, 0.4, 0.4),
    };
    container(text(&notice.message).size(14).color(color))
        .padding(10)
        .width(Length::Fill)
        .into()
}

fn basics(session: &Session) -> Element<'_, WizardMessage> {
    let types = LoraType::ALL.iter().fold(row![].spacing(20), |r, t| {
        r.push(radio(
            t.as_str(),
            *t,
            Some(session.lora_type),
            WizardMessage::LoraTypeSelected,
        ))
    });

    let create = column![
        text("Create New LoRA Dataset").size(20),
        text("What type of LoRA are you training?"),
        types,
        text_input(
            "e.g., my_character_lora_v1 (folder name will be based on this)",
            &session.lora_name,
        )
        .on_input(WizardMessage::LoraNameChanged)
        .on_submit(WizardMessage::NextFromBasics),
        button("Next (Upload Images)").on_press(WizardMessage::NextFromBasics),
    ]
    .spacing(10);

    let load = column![
        text("Load Existing Wizard Dataset").size(20),
        row![
            text_input("Enter part of the LoRA name to search for...", &session.search_term)
                .on_input(WizardMessage::SearchTermChanged)
                .on_submit(WizardMessage::Search),
            button("Search Datasets").on_press(WizardMessage::Search),
        ]
        .spacing(10),
        pick_list(
            session.picker.clone(),
            session.selected_dataset.clone(),
            WizardMessage::DatasetSelected,
        )
        .placeholder("Found Datasets")
        .width(Length::Fill),
        button("Load Selected Dataset").on_press(WizardMessage::LoadSelected),
    ]
    .spacing(10);

    column![
        text("LoRA Training Wizard - Step 1: Basics").size(28),
        create,
        load,
        button("Cancel Wizard").on_press(WizardMessage::Cancel),
    ]
    .spacing(24)
    .into()
}

fn upload(session: &Session) -> Element<'_, WizardMessage> {
    let files = session.uploads.iter().fold(Column::new().spacing(4), |c, f| {
        c.push(text(&f.original_name).size(14))
    });

    column![
        text("LoRA Training Wizard - Step 2: Upload Images").size(28),
        text(format!("{} file(s) selected (images or zip archives)", session.uploads.len())),
        row![
            button("Add Files...").on_press(WizardMessage::PickUploads),
            button("Clear").on_press(WizardMessage::ClearUploads),
        ]
        .spacing(10),
        files,
        row![
            button("Back").on_press(WizardMessage::BackFromUpload),
            button("Cancel").on_press(WizardMessage::Cancel),
            button("Next (Prepare Dataset)").on_press(WizardMessage::NextFromUpload),
        ]
        .spacing(10),
    ]
    .spacing(16)
    .into()
}

fn pagination(session: &Session) -> Element<'_, WizardMessage> {
    row![
        pick_list(
            &PAGE_SIZE_CHOICES[..],
            Some(session.page.page_size),
            WizardMessage::PageSizeSelected,
        ),
        button("< Prev").on_press(WizardMessage::PrevPage),
        text(session.page.label()),
        text_input("Page #", &session.goto_text)
            .on_input(WizardMessage::GotoTextChanged)
            .on_submit(WizardMessage::GotoPage)
            .width(Length::Fixed(80.0)),
        button("Go >").on_press(WizardMessage::GotoPage),
        button("Next >").on_press(WizardMessage::NextPage),
    ]
    .spacing(10)
    .into()
}

fn review(session: &Session) -> Element<'_, WizardMessage> {
    let has_images = !session.image_files.is_empty() && session.image_dir.is_some();
    let visible = session.visible_slots();

    let mut content = column![text("LoRA Training Wizard - Step 3: Review and Tag Images").size(28)]
        .spacing(16);

    if has_images {
        content = content
            .push(pagination(session))
            .push(grid::view(&session.slots, PageState::rows_needed(visible)))
            .push(pagination(session));
    } else {
        content = content.push(text("No images found in this dataset."));
    }

    content
        .push(
            row![
                text("Caption File Extension"),
                text_input(".txt", &session.caption_extension)
                    .on_input(WizardMessage::CaptionExtensionChanged)
                    .width(Length::Fixed(120.0)),
            ]
            .spacing(10),
        )
        .push(
            row![
                button("Back to Start").on_press(WizardMessage::BackToStart),
                button("Cancel").on_press(WizardMessage::Cancel),
                button("Next (Configure Training)").on_press(WizardMessage::Finish),
            ]
            .spacing(10),
        )
        .into()
}
