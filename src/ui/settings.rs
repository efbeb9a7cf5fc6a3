use iced::widget::{button, column, container, pick_list, text, text_input, Column};
use iced::{Element, Length};

use super::{toggle_row, ParamEdit, Toggle};
use crate::event::{EventBus, GalleryEvent, Mailbox};
use crate::state::data::{Model, UserSettings};
use crate::Message;

/// Onboarding asks for the username first, then the defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Username,
    Defaults,
}

/// What the "next" button did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextStep,
    Save,
}

/// Editable copy of the user settings.
///
/// Used both by the settings dialog and by the first-run onboarding flow
/// (which walks through the same fields in two steps).
#[derive(Debug)]
pub struct SettingsForm {
    pub values: UserSettings,
    step: Option<OnboardingStep>,
    mailbox: Mailbox,
}

impl SettingsForm {
    /// Settings dialog, seeded from what is stored
    pub fn dialog(bus: &EventBus, stored: Option<UserSettings>) -> Self {
        Self {
            values: stored.unwrap_or_default(),
            step: None,
            mailbox: Self::subscribe(bus),
        }
    }

    /// First-run flow
    pub fn onboarding(bus: &EventBus) -> Self {
        Self {
            values: UserSettings::default(),
            step: Some(OnboardingStep::Username),
            mailbox: Self::subscribe(bus),
        }
    }

    fn subscribe(bus: &EventBus) -> Mailbox {
        Mailbox::subscribe(bus, |event| matches!(event, GalleryEvent::SettingsUpdated))
    }

    pub fn is_onboarding(&self) -> bool {
        self.step.is_some()
    }

    /// Reload the form if settings were saved elsewhere
    pub fn sync(&mut self, load_settings: impl Fn() -> Option<UserSettings>) {
        let updated = self
            .mailbox
            .drain()
            .iter()
            .any(|event| *event == GalleryEvent::SettingsUpdated);
        if updated {
            if let Some(settings) = load_settings() {
                self.values = settings;
            }
        }
    }

    pub fn set_username(&mut self, username: String) {
        self.values.username = username;
    }

    pub fn edit(&mut self, edit: ParamEdit) {
        edit.apply(&mut self.values.defaults);
    }

    /// Move onboarding forward; the settings dialog saves straight away
    pub fn advance(&mut self) -> Advance {
        match self.step {
            Some(OnboardingStep::Username) => {
                self.step = Some(OnboardingStep::Defaults);
                Advance::NextStep
            }
            Some(OnboardingStep::Defaults) | None => Advance::Save,
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let title = if self.is_onboarding() { "Arc Studio" } else { "Settings" };
        let mut form: Column<Message> = column![text(title).size(24)]
            .spacing(10)
            .width(Length::Fixed(340.0));

        let show_username = self.step != Some(OnboardingStep::Defaults);
        let show_defaults = self.step != Some(OnboardingStep::Username);

        if show_username {
            form = form.push(text("Username")).push(
                text_input("@user", &self.values.username)
                    .on_input(Message::SettingsUsername)
                    .padding(8),
            );
        }

        if show_defaults {
            form = form.push(text("Img Model")).push(pick_list(
                Model::ALL,
                Some(self.values.defaults.model),
                |model| Message::SettingsEdited(ParamEdit::Model(model)),
            ));
            for toggle in [Toggle::Private, Toggle::NoLogo, Toggle::Enhance, Toggle::Safe] {
                form = form.push(toggle_row(
                    toggle,
                    &self.values.defaults,
                    Message::SettingsEdited,
                ));
            }
        }

        let label = match self.step {
            Some(OnboardingStep::Username) => "Next",
            Some(OnboardingStep::Defaults) => "Start your journey",
            None => "Save changes",
        };
        form = form.push(
            button(text(label))
                .on_press(Message::SaveSettings)
                .padding(10)
                .width(Length::Fill),
        );

        container(form)
            .padding(20)
            .style(container::bordered_box)
            .into()
    }
}
