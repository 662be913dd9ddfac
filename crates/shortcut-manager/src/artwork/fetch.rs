use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::{Error, Result};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const SERVICE: &str = "image download";

/// Extension used when neither the content type nor the URL names a format.
pub const DEFAULT_EXTENSION: &str = ".png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedImage {
    pub fn extension(&self, source: &str) -> &'static str {
        infer_extension(self.content_type.as_deref(), source)
    }
}

/// Source of image bytes for artwork slots.
pub trait ImageFetcher {
    fn fetch(&self, source: &str) -> Result<FetchedImage>;
}

/// Downloads `http(s)` sources; anything else is read as a local file.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("steam-shortcut-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::external(SERVICE, format!("cannot build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, source: &str) -> Result<FetchedImage> {
        if !is_http(source) {
            let bytes = std::fs::read(source)
                .map_err(|err| Error::external(SERVICE, format!("{source}: {err}")))?;
            return Ok(FetchedImage {
                bytes,
                content_type: None,
            });
        }

        let response = self
            .client
            .get(source)
            .send()
            .map_err(|err| Error::external(SERVICE, format!("{source}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::external(
                SERVICE,
                format!("{source}: HTTP {}", status.as_u16()),
            ));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .map_err(|err| Error::external(SERVICE, format!("{source}: {err}")))?
            .to_vec();
        debug!(
            event = "artwork.download",
            source,
            bytes = bytes.len(),
            content_type = content_type.as_deref().unwrap_or(""),
            "downloaded image"
        );
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

fn is_http(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Content type first, then the URL suffix (query stripped), then `.png`.
pub fn infer_extension(content_type: Option<&str>, url: &str) -> &'static str {
    if let Some(content_type) = content_type.map(str::to_ascii_lowercase) {
        if content_type.contains("png") {
            return ".png";
        }
        if content_type.contains("jpeg") || content_type.contains("jpg") {
            return ".jpg";
        }
        if content_type.contains("webp") {
            return ".webp";
        }
        if content_type.contains("gif") {
            return ".gif";
        }
    }

    let path = url.split('?').next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".webp") {
        ".webp"
    } else if path.ends_with(".png") {
        ".png"
    } else if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        ".jpg"
    } else if path.ends_with(".gif") {
        ".gif"
    } else {
        DEFAULT_EXTENSION
    }
}
