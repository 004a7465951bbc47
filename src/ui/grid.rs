use iced::widget::{checkbox, column, image, row, text, text_input, Column, Row};
use iced::{Element, Length};

use super::WizardMessage;
use crate::config::{GRID_COLUMNS, THUMBNAIL_WIDTH};
use crate::state::session::Slot;
use crate::wizard::SlotAction;

/// Review grid: `rows` rows of `GRID_COLUMNS` cells; empty slots are not drawn
pub fn view(slots: &[Slot], rows: usize) -> Element<'_, WizardMessage> {
    let mut grid = Column::new().spacing(20);

    for (row_index, chunk) in slots.chunks(GRID_COLUMNS).take(rows).enumerate() {
        let mut cells = Row::new().spacing(20);
        for (column_index, slot) in chunk.iter().enumerate() {
            if slot.is_empty() {
                continue;
            }
            cells = cells.push(cell(row_index * GRID_COLUMNS + column_index, slot));
        }
        grid = grid.push(cells);
    }

    grid.into()
}

fn cell(index: usize, slot: &Slot) -> Element<'_, WizardMessage> {
    let tags = slot.choices.iter().fold(Column::new().spacing(4), |c, tag| {
        let tag_name = tag.clone();
        c.push(
            checkbox(tag.as_str(), slot.selected.contains(tag)).on_toggle(move |checked| {
                WizardMessage::Slot(index, SlotAction::ToggleTag(tag_name.clone(), checked))
            }),
        )
    });

    column![
        image(image::Handle::from_path(&slot.image_path)).width(Length::Fixed(THUMBNAIL_WIDTH)),
        text(&slot.filename).size(12),
        tags,
        row![text_input("Type tag and press Enter...", &slot.new_tag)
            .on_input(move |value| WizardMessage::Slot(index, SlotAction::TagInput(value)))
            .on_submit(WizardMessage::Slot(index, SlotAction::SubmitTag))
            .width(Length::Fixed(THUMBNAIL_WIDTH))],
    ]
    .spacing(6)
    .width(Length::Fixed(THUMBNAIL_WIDTH))
    .into()
}
