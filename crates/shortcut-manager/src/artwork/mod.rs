//! Applying custom artwork to a shortcut.
//!
//! Each slot is handed to an ordered list of strategies: live injection
//! through the client's debug endpoint first, then plain files in the grid
//! directory. A slot that fails is reported and the rest still run.

use serde::Serialize;
use tracing::{info, warn};

use crate::steam::SteamLocator;
use crate::{Error, Result};

mod debug_protocol;
mod fetch;
mod filesystem;

pub use debug_protocol::DebugProtocolStrategy;
pub use fetch::{infer_extension, FetchedImage, HttpFetcher, ImageFetcher, DEFAULT_EXTENSION};
pub use filesystem::{FilesystemStrategy, GRID_IMAGE_MODE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetSlot {
    GridPortrait,
    GridLandscape,
    Hero,
    Logo,
    Icon,
}

impl AssetSlot {
    /// Processing order.
    pub const ALL: [AssetSlot; 5] = [
        AssetSlot::GridPortrait,
        AssetSlot::GridLandscape,
        AssetSlot::Hero,
        AssetSlot::Logo,
        AssetSlot::Icon,
    ];

    /// Asset type understood by `SteamClient.Apps.SetCustomArtworkForApp`.
    pub fn asset_type(self) -> u8 {
        match self {
            AssetSlot::GridPortrait => 0,
            AssetSlot::Hero => 1,
            AssetSlot::Logo => 2,
            AssetSlot::GridLandscape => 3,
            AssetSlot::Icon => 4,
        }
    }

    /// File name suffix after the app id in the grid directory.
    pub fn suffix(self) -> &'static str {
        match self {
            AssetSlot::GridPortrait => "p",
            AssetSlot::GridLandscape => "",
            AssetSlot::Hero => "_hero",
            AssetSlot::Logo => "_logo",
            AssetSlot::Icon => "_icon",
        }
    }

    pub fn file_stem(self, app_id: u32) -> String {
        format!("{app_id}{}", self.suffix())
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetSlot::GridPortrait => "grid-portrait",
            AssetSlot::GridLandscape => "grid-landscape",
            AssetSlot::Hero => "hero",
            AssetSlot::Logo => "logo",
            AssetSlot::Icon => "icon",
        }
    }
}

/// Image sources (URLs or local paths) for one app id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtworkConfig {
    pub grid_portrait: Option<String>,
    pub grid_landscape: Option<String>,
    pub hero: Option<String>,
    pub logo: Option<String>,
    pub icon: Option<String>,
}

impl ArtworkConfig {
    pub fn url_for(&self, slot: AssetSlot) -> Option<&str> {
        let url = match slot {
            AssetSlot::GridPortrait => &self.grid_portrait,
            AssetSlot::GridLandscape => &self.grid_landscape,
            AssetSlot::Hero => &self.hero,
            AssetSlot::Logo => &self.logo,
            AssetSlot::Icon => &self.icon,
        };
        url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn set(&mut self, slot: AssetSlot, url: Option<String>) {
        let field = match slot {
            AssetSlot::GridPortrait => &mut self.grid_portrait,
            AssetSlot::GridLandscape => &mut self.grid_landscape,
            AssetSlot::Hero => &mut self.hero,
            AssetSlot::Logo => &mut self.logo,
            AssetSlot::Icon => &mut self.icon,
        };
        *field = url;
    }

    pub fn is_empty(&self) -> bool {
        AssetSlot::ALL
            .iter()
            .all(|slot| self.url_for(*slot).is_none())
    }

    /// Fills slots that are empty here from `fallback`.
    pub fn or(mut self, fallback: ArtworkConfig) -> ArtworkConfig {
        for slot in AssetSlot::ALL {
            if self.url_for(slot).is_none() {
                self.set(slot, fallback.url_for(slot).map(str::to_string));
            }
        }
        self
    }
}

/// One way of getting an image into Steam.
pub trait ArtworkStrategy {
    fn name(&self) -> &'static str;

    fn supports(&self, slot: AssetSlot) -> bool;

    /// May probe the host; implementations cache the answer.
    fn is_available(&self) -> bool;

    /// Returns a short description of where the image went.
    fn apply(&self, app_id: u32, slot: AssetSlot, source: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedArtwork {
    pub slot: AssetSlot,
    pub strategy: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedArtwork {
    pub slot: AssetSlot,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtworkReport {
    pub app_id: u32,
    pub applied: Vec<AppliedArtwork>,
    pub failed: Vec<FailedArtwork>,
}

/// Runs `strategies` in order for every slot that has a source.
pub fn apply_with(
    app_id: u32,
    config: &ArtworkConfig,
    strategies: &[&dyn ArtworkStrategy],
) -> ArtworkReport {
    let mut report = ArtworkReport {
        app_id,
        ..ArtworkReport::default()
    };
    for slot in AssetSlot::ALL {
        let Some(source) = config.url_for(slot) else {
            continue;
        };
        let mut last_error = None;
        for strategy in strategies.iter().filter(|strategy| strategy.supports(slot)) {
            if !strategy.is_available() {
                continue;
            }
            match strategy.apply(app_id, slot, source) {
                Ok(detail) => {
                    info!(
                        event = "artwork.applied",
                        app_id,
                        slot = slot.label(),
                        strategy = strategy.name(),
                        detail = %detail,
                        "artwork applied"
                    );
                    report.applied.push(AppliedArtwork {
                        slot,
                        strategy: strategy.name(),
                        detail,
                    });
                    last_error = None;
                    break;
                }
                Err(err) => {
                    warn!(
                        event = "artwork.strategy_failed",
                        app_id,
                        slot = slot.label(),
                        strategy = strategy.name(),
                        error = %err,
                        "artwork strategy failed"
                    );
                    last_error = Some(err.to_string());
                }
            }
        }
        let applied = report.applied.iter().any(|entry| entry.slot == slot);
        if !applied {
            report.failed.push(FailedArtwork {
                slot,
                error: last_error.unwrap_or_else(|| "no strategy available".to_string()),
            });
        }
    }
    report
}

/// Applies `config` for `app_id` in the first Steam user's grid directory.
///
/// Only a missing config or a missing Steam user fails the call; per-slot
/// failures end up in the report.
pub fn set_artwork(
    locator: &SteamLocator<'_>,
    fetcher: &dyn ImageFetcher,
    app_id: u32,
    config: Option<&ArtworkConfig>,
) -> Result<ArtworkReport> {
    let config = config.ok_or(Error::MissingArtwork)?;
    let host = locator.host();
    let user = locator.first_user()?;
    let grid_dir = locator.grid_dir(&user)?;

    let debug_protocol = DebugProtocolStrategy::new(host, fetcher);
    let filesystem = FilesystemStrategy::new(host, fetcher, grid_dir);
    let strategies: [&dyn ArtworkStrategy; 2] = [&debug_protocol, &filesystem];
    let report = apply_with(app_id, config, &strategies);
    info!(
        event = "artwork.done",
        host = %host.describe(),
        app_id,
        user = %user,
        applied = report.applied.len(),
        failed = report.failed.len(),
        "artwork pass finished"
    );
    Ok(report)
}
