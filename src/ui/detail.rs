use iced::widget::{button, column, container, image, row, text, Row};
use iced::{ContentFit, Element, Length};

use super::gallery::Thumbnail;
use crate::state::data::ImageRecord;
use crate::Message;

/// The record shown in the detail dialog and where it was opened from
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub record: ImageRecord,
    pub from_archive: bool,
}

impl Detail {
    pub fn view<'a>(&'a self, thumbnail: Option<&'a Thumbnail>) -> Element<'a, Message> {
        let record = &self.record;
        let params = &record.parameters;

        let picture: Element<'a, Message> = match thumbnail {
            Some(Thumbnail::Ready(handle)) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .content_fit(ContentFit::Contain)
                .into(),
            Some(Thumbnail::Failed) => text("Image unavailable").into(),
            Some(Thumbnail::Loading) | None => text("Loading…").into(),
        };

        let on_off = |on: bool| if on { "On" } else { "Off" };
        let yes_no = |on: bool| if on { "Yes" } else { "No" };

        let parameters = column![
            text("Parameters").size(18),
            field("Model", params.model.to_string()),
            field("Size", format!("{}x{}", params.width, params.height)),
            field("Safe Mode", on_off(params.safe).to_string()),
            field("Enhanced", yes_no(params.enhance).to_string()),
        ]
        .spacing(4);

        // Archived records can be published; public ones can be archived
        let visibility = if self.from_archive {
            button(text("Make Public")).on_press(Message::MakePublic)
        } else {
            button(text("Archive")).on_press(Message::Archive)
        };

        let actions = row![
            button(text("Remix")).on_press(Message::Remix).style(button::secondary),
            button(text("Download"))
                .on_press(Message::Download(record.clone()))
                .style(button::secondary),
            visibility.style(button::secondary),
            button(text("Delete")).on_press(Message::Delete).style(button::danger),
        ]
        .spacing(8);

        let info = column![
            text("Image Details").size(24),
            text(&record.username).size(16),
            text(&record.prompt).size(14),
            parameters,
            actions,
        ]
        .spacing(12)
        .width(Length::Fixed(380.0));

        container(
            row![
                container(picture)
                    .center_x(Length::Fixed(440.0))
                    .center_y(Length::Fixed(440.0))
                    .style(container::rounded_box),
                info,
            ]
            .spacing(16),
        )
        .padding(20)
        .style(container::bordered_box)
        .into()
    }
}

fn field<'a>(label: &'a str, value: String) -> Row<'a, Message> {
    row![
        text(label).width(Length::Fixed(120.0)),
        text(value),
    ]
}
