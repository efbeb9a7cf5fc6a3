/// Generation lifecycle
///
/// `Idle → Generating → Succeeded | Failed`. A failed or finished generation
/// accepts a new submit right away. Every request gets a ticket, so a result
/// that arrives after a cancel (or for an older request) is dropped.
use iced::widget::image::Handle;
use reqwest::Url;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::state::data::{GenerationParameters, ImageRecord};
use crate::state::draft::Draft;

/// Build the endpoint URL for a prompt:
/// `{endpoint}/{prompt}?width=..&height=..&model=..&enhance=..&nologo=..&private=..&safe=..`
pub fn build_url(
    endpoint: &str,
    prompt: &str,
    parameters: &GenerationParameters,
) -> Result<String> {
    let mut url = Url::parse(endpoint).map_err(|e| Error::Endpoint(format!("{endpoint}: {e}")))?;

    url.path_segments_mut()
        .map_err(|_| Error::Endpoint(format!("{endpoint}: cannot hold a path")))?
        .pop_if_empty()
        .push(prompt);

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("width", &parameters.width.to_string())
            .append_pair("height", &parameters.height.to_string())
            .append_pair("model", parameters.model.as_str())
            .append_pair("enhance", bool_str(parameters.enhance))
            .append_pair("nologo", bool_str(parameters.nologo))
            .append_pair("private", bool_str(parameters.private))
            .append_pair("safe", bool_str(parameters.safe));
        if let Some(seed) = parameters.seed {
            query.append_pair("seed", &seed.to_string());
        }
    }

    Ok(url.into())
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// A request handed to the fetch task
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub ticket: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    Idle,
    Generating {
        ticket: u64,
        url: String,
        prompt: String,
        parameters: GenerationParameters,
    },
    Succeeded {
        record: ImageRecord,
        preview: Handle,
    },
    Failed(String),
}

#[derive(Debug, Default)]
pub struct Generation {
    phase: Phase,
    last_ticket: u64,
}

impl Generation {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.phase, Phase::Generating { .. })
    }

    /// Move to `Generating` for the current draft
    pub fn begin(&mut self, draft: &Draft, endpoint: &str) -> Result<GenerationRequest> {
        if self.is_generating() {
            return Err(Error::Busy);
        }
        if !draft.is_ready() {
            return Err(Error::EmptyPrompt);
        }

        let url = build_url(endpoint, &draft.prompt, &draft.parameters)?;
        self.last_ticket += 1;
        self.phase = Phase::Generating {
            ticket: self.last_ticket,
            url: url.clone(),
            prompt: draft.prompt.clone(),
            parameters: draft.parameters.clone(),
        };

        info!("🎨 Generating: {}", draft.prompt);
        Ok(GenerationRequest {
            ticket: self.last_ticket,
            url,
        })
    }

    /// The fetch for `ticket` came back OK; returns the record to persist.
    /// Stale tickets yield `None`.
    pub fn succeed(&mut self, ticket: u64, username: &str, preview: Handle) -> Option<ImageRecord> {
        let Phase::Generating { ticket: current, url, prompt, parameters } = &self.phase else {
            warn!("Dropping generation result {} outside of a generation", ticket);
            return None;
        };
        if *current != ticket {
            warn!("Dropping stale generation result {}", ticket);
            return None;
        }

        let record = ImageRecord::new(username, url.clone(), prompt.clone(), parameters.clone());
        self.phase = Phase::Succeeded {
            record: record.clone(),
            preview,
        };
        Some(record)
    }

    /// The fetch for `ticket` failed; nothing gets persisted
    pub fn fail(&mut self, ticket: u64, reason: String) {
        match &self.phase {
            Phase::Generating { ticket: current, .. } if *current == ticket => {
                error!("❌ Failed to generate image: {}", reason);
                self.phase = Phase::Failed(reason);
            }
            _ => warn!("Dropping stale generation failure {}: {}", ticket, reason),
        }
    }

    /// Abandon the in-flight request, if any
    pub fn cancel(&mut self) {
        if self.is_generating() {
            info!("Generation cancelled");
            self.phase = Phase::Idle;
        }
    }

    /// Forget the last result (dialog reopened or draft edited)
    pub fn reset(&mut self) {
        if !self.is_generating() {
            self.phase = Phase::Idle;
        }
    }
}
