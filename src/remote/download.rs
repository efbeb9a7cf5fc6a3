use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::info;

use super::fetch_bytes;
use crate::error::Result;

/// Longest prompt prefix used in a suggested file name
const FILE_NAME_PROMPT_CHARS: usize = 30;

/// Suggested file name for a download: first 30 prompt characters + ".png".
/// Characters that are unsafe in file names become underscores.
pub fn suggested_file_name(prompt: &str) -> String {
    let stem: String = prompt
        .chars()
        .take(FILE_NAME_PROMPT_CHARS)
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let stem = stem.trim();
    if stem.is_empty() {
        "image.png".to_string()
    } else {
        format!("{}.png", stem)
    }
}

/// Decode whatever format the service returned and write it out as PNG
pub fn save_png(bytes: &[u8], path: &Path) -> Result<()> {
    let img = image::load_from_memory(bytes)?;
    img.save_with_format(path, ImageFormat::Png)?;
    info!("💾 Saved image: {}", path.display());
    Ok(())
}

/// Fetch `url`, ask the user where to put it, and save it as PNG.
/// Returns `None` if the save dialog was dismissed.
pub async fn download(
    client: reqwest::Client,
    url: String,
    prompt: String,
) -> std::result::Result<Option<PathBuf>, String> {
    let bytes = fetch_bytes(client, url).await.map_err(|e| e.to_string())?;

    let Some(handle) = rfd::AsyncFileDialog::new()
        .set_title("Save Image")
        .set_file_name(suggested_file_name(&prompt))
        .add_filter("PNG image", &["png"])
        .save_file()
        .await
    else {
        return Ok(None);
    };
    let path = handle.path().to_path_buf();

    // Decoding and encoding is CPU-bound work
    let target = path.clone();
    tokio::task::spawn_blocking(move || save_png(&bytes, &target))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
        .map_err(|e| e.to_string())?;

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_file_name_truncates_prompt() {
        let name = suggested_file_name("a very long prompt about a cat sleeping on a windowsill");
        assert_eq!(name, "a very long prompt about a cat.png");
    }

    #[test]
    fn test_file_name_replaces_unsafe_characters() {
        assert_eq!(suggested_file_name("cats/dogs: 50%?"), "cats_dogs_ 50%_.png");
        assert_eq!(suggested_file_name("   "), "image.png");
    }

    #[test]
    fn test_save_png_converts_jpeg() {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([200, 10, 10]));
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_png(&jpeg, &path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_save_png_rejects_garbage() {
        let dir = tempdir().unwrap();
        assert!(save_png(b"definitely not an image", &dir.path().join("x.png")).is_err());
    }
}
