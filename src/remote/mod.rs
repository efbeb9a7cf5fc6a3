/// Remote image service module
///
/// This module handles:
/// - Building generation URLs and tracking the generation lifecycle
/// - Fetching image bytes for the gallery
/// - Downloading images to disk as PNG

pub mod generation;
pub mod download;

use iced::widget::image::Handle;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// HTTP client shared by generation, thumbnails and downloads
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(timeout)
        .user_agent(concat!("ArcStudio/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// GET `url` and return the body; any non-2xx status is an error
pub async fn fetch_bytes(client: reqwest::Client, url: String) -> Result<Vec<u8>> {
    debug!("GET {}", url);
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(Error::Status(response.status()));
    }

    Ok(response.bytes().await?.to_vec())
}

/// Fetch an image for display in the gallery
pub async fn load_thumbnail(
    client: reqwest::Client,
    id: i64,
    url: String,
) -> (i64, std::result::Result<Handle, String>) {
    let result = fetch_bytes(client, url)
        .await
        .map(Handle::from_bytes)
        .map_err(|e| e.to_string());
    (id, result)
}
