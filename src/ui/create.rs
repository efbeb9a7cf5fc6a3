use iced::widget::{button, column, container, image, pick_list, row, text, text_input, Column};
use iced::{Alignment, ContentFit, Element, Length};

use super::{toggle_row, ParamEdit, Toggle};
use crate::event::{EventBus, GalleryEvent, Mailbox};
use crate::remote::generation::{Generation, Phase};
use crate::state::data::{AspectRatio, Model, UserSettings};
use crate::state::draft::Draft;
use crate::Message;

/// The generation dialog.
///
/// Owns the draft and the generation state machine. Listens for remix
/// requests (opens pre-filled) and settings changes (picks up new defaults).
#[derive(Debug)]
pub struct CreateDialog {
    pub open: bool,
    pub draft: Draft,
    pub generation: Generation,
    username: String,
    mailbox: Mailbox,
}

impl CreateDialog {
    pub fn new(bus: &EventBus, settings: Option<&UserSettings>) -> Self {
        Self {
            open: false,
            draft: Draft::from_settings(settings),
            generation: Generation::default(),
            username: settings.map(|s| s.username.clone()).unwrap_or_default(),
            mailbox: Mailbox::subscribe(bus, |event| {
                matches!(
                    event,
                    GalleryEvent::RemixRequested { .. } | GalleryEvent::SettingsUpdated
                )
            }),
        }
    }

    /// Name stamped on new records
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Apply queued bus events; `load_settings` re-reads the settings store
    pub fn sync(&mut self, load_settings: impl Fn() -> Option<UserSettings>) {
        for event in self.mailbox.drain() {
            match event {
                GalleryEvent::RemixRequested { prompt, parameters } => {
                    self.draft.remix(&prompt, &parameters);
                    self.generation.reset();
                    self.open = true;
                }
                GalleryEvent::SettingsUpdated => {
                    if let Some(settings) = load_settings() {
                        self.draft.apply_settings(&settings);
                        self.username = settings.username;
                    }
                }
                GalleryEvent::RecordCreated(_) => {}
            }
        }
    }

    pub fn edit(&mut self, edit: ParamEdit) {
        edit.apply(&mut self.draft.parameters);
    }

    pub fn view(&self) -> Element<'_, Message> {
        let generating = self.generation.is_generating();
        let params = &self.draft.parameters;

        let mut form: Column<Message> = column![
            text("Create Image").size(24),
            text("Prompt"),
            text_input("Describe what you want to see...", &self.draft.prompt)
                .on_input(Message::PromptChanged)
                .on_submit(Message::Generate)
                .padding(8),
            text("Model"),
            pick_list(Model::ALL, Some(params.model), |model| {
                Message::DraftEdited(ParamEdit::Model(model))
            }),
            text("Aspect Ratio"),
            pick_list(AspectRatio::ALL, params.aspect_ratio(), |ratio| {
                Message::DraftEdited(ParamEdit::AspectRatio(ratio))
            }),
        ]
        .spacing(8)
        .width(Length::Fixed(360.0));

        for toggle in Toggle::ALL {
            form = form.push(toggle_row(toggle, params, Message::DraftEdited));
        }

        let action = if generating {
            row![
                button(text("Generating...")).padding(10).width(Length::Fill),
                button(text("Cancel"))
                    .on_press(Message::CancelGeneration)
                    .padding(10)
                    .style(button::secondary),
            ]
            .spacing(8)
        } else {
            row![button(text("Generate"))
                .on_press_maybe(self.draft.is_ready().then_some(Message::Generate))
                .padding(10)
                .width(Length::Fill)]
        };
        form = form.push(action);

        let preview: Element<Message> = match self.generation.phase() {
            Phase::Generating { .. } => centered_note("Generating..."),
            Phase::Succeeded { record, preview } => column![
                image(preview.clone())
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .content_fit(ContentFit::Contain),
                button(text("Download"))
                    .on_press(Message::Download(record.clone()))
                    .padding(8),
            ]
            .spacing(8)
            .align_x(Alignment::End)
            .into(),
            Phase::Failed(reason) => centered_note(format!("Generation failed: {}", reason)),
            Phase::Idle => centered_note("Preview will appear here"),
        };

        container(
            row![
                form,
                container(preview)
                    .width(Length::Fixed(420.0))
                    .height(Length::Fixed(480.0))
                    .style(container::rounded_box),
            ]
            .spacing(16),
        )
        .padding(20)
        .style(container::bordered_box)
        .into()
    }
}

fn centered_note<'a>(note: impl Into<String>) -> Element<'a, Message> {
    container(text(note.into()))
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}
