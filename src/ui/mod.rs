/// User interface module
///
/// - `gallery.rs` - image grid for the public gallery and the archive
/// - `create.rs` - generation dialog
/// - `detail.rs` - per-image actions
/// - `settings.rs` - settings dialog and first-run onboarding

pub mod gallery;
pub mod create;
pub mod detail;
pub mod settings;

use iced::widget::{center, container, mouse_area, opaque, row, stack, text, toggler};
use iced::{Alignment, Color, Element, Length};

use crate::state::data::{AspectRatio, GenerationParameters, Model};
use crate::Message;

/// One of the four independent generation switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Safe,
    Private,
    Enhance,
    NoLogo,
}

impl Toggle {
    pub const ALL: [Toggle; 4] = [Toggle::Safe, Toggle::Private, Toggle::Enhance, Toggle::NoLogo];

    pub fn label(&self) -> &'static str {
        match self {
            Toggle::Safe => "Safe Mode",
            Toggle::Private => "Private",
            Toggle::Enhance => "Enhance Prompt",
            Toggle::NoLogo => "No Logo",
        }
    }

    pub fn get(&self, parameters: &GenerationParameters) -> bool {
        match self {
            Toggle::Safe => parameters.safe,
            Toggle::Private => parameters.private,
            Toggle::Enhance => parameters.enhance,
            Toggle::NoLogo => parameters.nologo,
        }
    }
}

/// An edit to a set of generation parameters, shared by the
/// generation dialog and the settings dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamEdit {
    Model(Model),
    AspectRatio(AspectRatio),
    Toggle(Toggle, bool),
}

impl ParamEdit {
    pub fn apply(self, parameters: &mut GenerationParameters) {
        match self {
            ParamEdit::Model(model) => parameters.model = model,
            ParamEdit::AspectRatio(ratio) => parameters.set_aspect_ratio(ratio),
            ParamEdit::Toggle(Toggle::Safe, on) => parameters.safe = on,
            ParamEdit::Toggle(Toggle::Private, on) => parameters.private = on,
            ParamEdit::Toggle(Toggle::Enhance, on) => parameters.enhance = on,
            ParamEdit::Toggle(Toggle::NoLogo, on) => parameters.nologo = on,
        }
    }
}

/// Labelled switch row
pub fn toggle_row<'a>(
    toggle: Toggle,
    parameters: &GenerationParameters,
    on_edit: impl Fn(ParamEdit) -> Message + 'a,
) -> Element<'a, Message> {
    row![
        text(toggle.label()).width(Length::Fill),
        toggler(toggle.get(parameters)).on_toggle(move |on| on_edit(ParamEdit::Toggle(toggle, on))),
    ]
    .align_y(Alignment::Center)
    .into()
}

/// Show `content` centered over a dimmed `base`.
/// Clicking the backdrop sends `on_blur`, if given.
pub fn modal<'a>(
    base: impl Into<Element<'a, Message>>,
    content: impl Into<Element<'a, Message>>,
    on_blur: Option<Message>,
) -> Element<'a, Message> {
    let backdrop = mouse_area(center(opaque(content)).style(|_theme| container::Style {
        background: Some(
            Color {
                a: 0.8,
                ..Color::BLACK
            }
            .into(),
        ),
        ..container::Style::default()
    }));

    let backdrop = match on_blur {
        Some(message) => backdrop.on_press(message),
        None => backdrop,
    };

    stack![base.into(), opaque(backdrop)].into()
}
