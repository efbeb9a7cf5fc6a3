/// Working copy of the generation form
///
/// The draft is what the generation dialog edits: a prompt plus the
/// parameters it will be sent with. It is seeded from the saved settings,
/// refreshed whenever settings change, and replaced wholesale by a remix.
use super::data::{AspectRatio, GenerationParameters, UserSettings};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Draft {
    pub prompt: String,
    pub parameters: GenerationParameters,
}

impl Draft {
    /// Start a blank draft from the user's defaults
    pub fn from_settings(settings: Option<&UserSettings>) -> Self {
        let mut draft = Self::default();
        if let Some(settings) = settings {
            draft.apply_settings(settings);
        }
        draft
    }

    /// Take over the default model and toggles from `settings`.
    ///
    /// Size and prompt stay as they are: the user may be mid-edit when
    /// settings change underneath the dialog.
    pub fn apply_settings(&mut self, settings: &UserSettings) {
        let defaults = &settings.defaults;
        self.parameters.model = defaults.model;
        self.parameters.safe = defaults.safe;
        self.parameters.private = defaults.private;
        self.parameters.enhance = defaults.enhance;
        self.parameters.nologo = defaults.nologo;
    }

    /// Replace the draft with an existing record's prompt and parameters
    pub fn remix(&mut self, prompt: &str, parameters: &GenerationParameters) {
        self.prompt = prompt.to_string();
        self.parameters = parameters.clone();
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.parameters.set_aspect_ratio(ratio);
    }

    /// Submit is only possible with something to generate
    pub fn is_ready(&self) -> bool {
        !self.prompt.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Model;

    fn settings() -> UserSettings {
        UserSettings {
            username: "@ayman".to_string(),
            defaults: GenerationParameters {
                model: Model::Turbo,
                private: true,
                enhance: true,
                nologo: true,
                safe: false,
                ..GenerationParameters::default()
            },
        }
    }

    #[test]
    fn test_default_draft_is_not_ready() {
        let draft = Draft::from_settings(None);
        assert!(!draft.is_ready());
        assert_eq!(draft.parameters, GenerationParameters::default());
    }

    #[test]
    fn test_whitespace_prompt_is_not_ready() {
        let draft = Draft {
            prompt: "   \t".to_string(),
            ..Draft::default()
        };
        assert!(!draft.is_ready());
    }

    #[test]
    fn test_settings_keep_size_and_prompt() {
        let mut draft = Draft::default();
        draft.prompt = "a cat".to_string();
        draft.set_aspect_ratio(AspectRatio::Landscape);

        draft.apply_settings(&settings());

        assert_eq!(draft.prompt, "a cat");
        assert_eq!((draft.parameters.width, draft.parameters.height), (1280, 720));
        assert_eq!(draft.parameters.model, Model::Turbo);
        assert!(draft.parameters.private);
        assert!(!draft.parameters.safe);
    }

    #[test]
    fn test_remix_copies_everything() {
        let mut draft = Draft::from_settings(Some(&settings()));
        let source = GenerationParameters {
            width: 720,
            height: 1280,
            seed: Some(7),
            model: Model::FluxRealism,
            ..GenerationParameters::default()
        };

        draft.remix("a dog", &source);

        assert_eq!(draft.prompt, "a dog");
        assert_eq!(draft.parameters, source);
        assert!(draft.is_ready());
    }
}
