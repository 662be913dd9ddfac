//! Minimal SteamGridDB v2 client: game search and the first image per slot.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::artwork::{ArtworkConfig, AssetSlot};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.steamgriddb.com/api/v2";

const SERVICE: &str = "steamgriddb";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<i64>,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub mime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridOrientation {
    Portrait,
    Landscape,
}

impl GridOrientation {
    pub fn dimensions(self) -> &'static str {
        match self {
            GridOrientation::Portrait => "600x900",
            GridOrientation::Landscape => "920x430,460x215",
        }
    }
}

pub struct GridDbClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    api_key: String,
}

impl GridDbClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base)
            .map_err(|err| Error::external(SERVICE, format!("invalid base url {base}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::external(SERVICE, format!("invalid base url {base}")));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("steam-shortcut-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::external(SERVICE, format!("cannot build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn search(&self, term: &str) -> Result<Vec<GameResult>> {
        self.get(&["search", "autocomplete", term], &[])
    }

    pub fn grids(&self, game_id: u64, orientation: GridOrientation) -> Result<Vec<ImageResult>> {
        self.get(
            &["grids", "game", &game_id.to_string()],
            &[("dimensions", orientation.dimensions())],
        )
    }

    pub fn heroes(&self, game_id: u64) -> Result<Vec<ImageResult>> {
        self.get(&["heroes", "game", &game_id.to_string()], &[])
    }

    pub fn logos(&self, game_id: u64) -> Result<Vec<ImageResult>> {
        self.get(&["logos", "game", &game_id.to_string()], &[])
    }

    pub fn icons(&self, game_id: u64) -> Result<Vec<ImageResult>> {
        self.get(&["icons", "game", &game_id.to_string()], &[])
    }

    /// First match for `name`.
    pub fn search_game(&self, name: &str) -> Result<GameResult> {
        self.search(name)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::external(SERVICE, format!("no games found for '{name}'")))
    }

    /// First image of every kind for `game_id`. A failed lookup leaves that
    /// slot empty.
    pub fn fetch_artwork_config(&self, game_id: u64) -> ArtworkConfig {
        let mut config = ArtworkConfig::default();
        for slot in AssetSlot::ALL {
            let images = match slot {
                AssetSlot::GridPortrait => self.grids(game_id, GridOrientation::Portrait),
                AssetSlot::GridLandscape => self.grids(game_id, GridOrientation::Landscape),
                AssetSlot::Hero => self.heroes(game_id),
                AssetSlot::Logo => self.logos(game_id),
                AssetSlot::Icon => self.icons(game_id),
            };
            match images {
                Ok(images) => config.set(slot, first_url(images)),
                Err(err) => warn!(
                    event = "griddb.lookup_failed",
                    game_id,
                    slot = slot.label(),
                    error = %err,
                    "no artwork for slot"
                ),
            }
        }
        config
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(segments, query)?;
        debug!(event = "griddb.request", url = %url, "steamgriddb request");
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .map_err(|err| Error::external(SERVICE, format!("{url}: {err}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| Error::external(SERVICE, format!("{url}: {err}")))?;
        parse_response(status, &body)
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::external(SERVICE, "base url cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

fn first_url(images: Vec<ImageResult>) -> Option<String> {
    images.into_iter().next().map(|image| image.url)
}

/// Unwraps the `{success, data}` envelope.
fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    let envelope: std::result::Result<Envelope<T>, _> = serde_json::from_str(body);
    if !(200..300).contains(&status) {
        let detail = match envelope {
            Ok(envelope) if !envelope.errors.is_empty() => envelope.errors.join("; "),
            _ => body.chars().take(200).collect(),
        };
        return Err(Error::external(SERVICE, format!("HTTP {status}: {detail}")));
    }
    let envelope =
        envelope.map_err(|err| Error::external(SERVICE, format!("malformed response: {err}")))?;
    if !envelope.success {
        return Err(Error::external(
            SERVICE,
            format!("request unsuccessful: {}", envelope.errors.join("; ")),
        ));
    }
    envelope
        .data
        .ok_or_else(|| Error::external(SERVICE, "response has no data"))
}
