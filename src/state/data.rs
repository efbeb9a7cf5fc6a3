/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the store layer and the UI layer. They serialize to the same
/// camelCase JSON layout the collections are persisted in.
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Supported generation models
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Model {
    #[default]
    #[serde(rename = "flux")]
    Flux,
    #[serde(rename = "flux-realism")]
    FluxRealism,
    #[serde(rename = "flux-cablyai")]
    FluxCablyai,
    #[serde(rename = "flux-anime")]
    FluxAnime,
    #[serde(rename = "flux-3d")]
    Flux3d,
    #[serde(rename = "any-dark")]
    AnyDark,
    #[serde(rename = "flux-pro")]
    FluxPro,
    #[serde(rename = "turbo")]
    Turbo,
}

impl Model {
    pub const ALL: [Model; 8] = [
        Model::Flux,
        Model::FluxRealism,
        Model::FluxCablyai,
        Model::FluxAnime,
        Model::Flux3d,
        Model::AnyDark,
        Model::FluxPro,
        Model::Turbo,
    ];

    /// Identifier sent to the endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Flux => "flux",
            Model::FluxRealism => "flux-realism",
            Model::FluxCablyai => "flux-cablyai",
            Model::FluxAnime => "flux-anime",
            Model::Flux3d => "flux-3d",
            Model::AnyDark => "any-dark",
            Model::FluxPro => "flux-pro",
            Model::Turbo => "turbo",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output size presets offered in the generation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
    ];

    /// (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1024, 1024),
            AspectRatio::Landscape => (1280, 720),
            AspectRatio::Portrait => (720, 1280),
        }
    }

    /// Preset matching the given size, if any
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.dimensions() == (width, height))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        })
    }
}

/// Parameters sent along with a prompt
///
/// Frozen into every record at creation time. A remix copies them
/// into a fresh draft; the original record is never touched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationParameters {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub model: Model,
    pub nologo: bool,
    pub private: bool,
    pub enhance: bool,
    pub safe: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            seed: None,
            model: Model::Flux,
            nologo: false,
            private: false,
            enhance: false,
            safe: true,
        }
    }
}

impl GenerationParameters {
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::from_dimensions(self.width, self.height)
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        let (width, height) = ratio.dimensions();
        self.width = width;
        self.height = height;
    }
}

/// Represents a single generated image in the gallery
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Millisecond timestamp, unique across both collections
    pub id: i64,
    pub username: String,
    /// Remote URL; only valid as long as the service keeps serving it
    pub image_url: String,
    pub prompt: String,
    pub parameters: GenerationParameters,
    /// RFC 3339 creation time
    pub created_at: String,
}

impl ImageRecord {
    /// Build a record for a freshly generated image
    pub fn new(
        username: &str,
        image_url: String,
        prompt: String,
        parameters: GenerationParameters,
    ) -> Self {
        let username = if username.trim().is_empty() {
            crate::config::DEFAULT_USERNAME.to_string()
        } else {
            username.to_string()
        };

        Self {
            id: next_record_id(),
            username,
            image_url,
            prompt,
            parameters,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Case-insensitive substring match over prompt and username.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.prompt.to_lowercase().contains(needle)
            || self.username.to_lowercase().contains(needle)
    }
}

static LAST_RECORD_ID: AtomicI64 = AtomicI64::new(0);

/// Wall-clock milliseconds, bumped past the last issued id so two records
/// created in the same millisecond still get distinct ids
fn next_record_id() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_RECORD_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_RECORD_ID.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Persisted user preferences
///
/// Stored flat: `username` sits next to the parameter fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct UserSettings {
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub defaults: GenerationParameters,
}
