//! Image URL extraction and validation for multimodal prompts.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use base64::Engine;
use regex::Regex;
use tracing::debug;

use crate::error::{Result, ThreadlineError};
use crate::provider::http::shared_client;
use crate::types::ImageSource;

const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Prompt used when the input is only an image URL.
pub const DEFAULT_IMAGE_PROMPT: &str = "What do you see in this image?";

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("valid URL regex"))
}

/// Split input into the first `http(s)` URL and the remaining text.
///
/// Every occurrence of that URL is removed from the text, which is then trimmed.
pub fn extract_url_and_text(input: &str) -> (Option<String>, String) {
    match url_regex().find(input) {
        Some(m) => {
            let url = m.as_str().to_string();
            let text = input.replace(&url, "").trim().to_string();
            (Some(url), text)
        }
        None => (None, input.trim().to_string()),
    }
}

/// Whether a HEAD request reports an `image/*` content type.
///
/// Any network failure counts as "not an image".
pub async fn is_image_url(url: &str) -> bool {
    let resp = match shared_client().head(url).timeout(HEAD_TIMEOUT).send().await {
        Ok(resp) => resp,
        Err(e) => {
            debug!(url, error = %e, "image HEAD request failed");
            return false;
        }
    };
    resp.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("image/"))
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read a local image and encode it for inline transport.
pub fn image_from_file(path: &Path) -> Result<ImageSource> {
    let mime_type = mime_for(path).ok_or_else(|| {
        ThreadlineError::InvalidArgument(format!(
            "unsupported image type: {} (expected png, jpg, gif, or webp)",
            path.display()
        ))
    })?;
    let bytes = std::fs::read(path)?;
    Ok(ImageSource::Base64 {
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
        mime_type: mime_type.to_string(),
    })
}

/// Interpret a CLI `--image` value as a URL or a local path.
pub fn resolve_image(arg: &str) -> Result<ImageSource> {
    if url_regex().is_match(arg) {
        Ok(ImageSource::Url {
            url: arg.to_string(),
        })
    } else {
        image_from_file(Path::new(arg))
    }
}
