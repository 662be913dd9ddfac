use remote_exec::Host;
use tracing::debug;

use super::{ArtworkStrategy, AssetSlot, ImageFetcher};
use crate::Result;

/// Permission bits for images dropped into the grid directory.
pub const GRID_IMAGE_MODE: u32 = 0o644;

/// Writes images into the user's grid directory where Steam picks them up
/// on its next refresh. Handles every slot and never reports unavailable.
pub struct FilesystemStrategy<'a> {
    host: &'a dyn Host,
    fetcher: &'a dyn ImageFetcher,
    grid_dir: String,
}

impl<'a> FilesystemStrategy<'a> {
    pub fn new(host: &'a dyn Host, fetcher: &'a dyn ImageFetcher, grid_dir: String) -> Self {
        Self {
            host,
            fetcher,
            grid_dir,
        }
    }
}

impl ArtworkStrategy for FilesystemStrategy<'_> {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn supports(&self, _slot: AssetSlot) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        true
    }

    fn apply(&self, app_id: u32, slot: AssetSlot, source: &str) -> Result<String> {
        self.host.ensure_dir(&self.grid_dir);
        let image = self.fetcher.fetch(source)?;
        let file_name = format!("{}{}", slot.file_stem(app_id), image.extension(source));
        let target = self.host.join_path(&self.grid_dir, &file_name);
        self.host.write_file(&target, &image.bytes, GRID_IMAGE_MODE)?;
        debug!(
            event = "artwork.grid.write",
            host = %self.host.describe(),
            slot = slot.label(),
            path = %target,
            bytes = image.bytes.len(),
            "wrote grid image"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeFetcher, FakeHost};
    use crate::Error;

    const GRID: &str = "/home/deck/.steam/steam/userdata/1/config/grid";

    #[test]
    fn writes_slot_file_with_inferred_extension() {
        let host = FakeHost::remote("/home/deck");
        let fetcher = FakeFetcher::default().with_image("https://cdn/x", b"img", Some("image/webp"));
        let strategy = FilesystemStrategy::new(&host, &fetcher, GRID.to_string());

        let path = strategy
            .apply(42, AssetSlot::Hero, "https://cdn/x")
            .expect("apply");
        assert_eq!(path, format!("{GRID}/42_hero.webp"));
        assert_eq!(host.file(&path), Some(b"img".to_vec()));
        assert_eq!(host.mode_of(&path), Some(GRID_IMAGE_MODE));
    }

    #[test]
    fn download_failure_writes_nothing() {
        let host = FakeHost::remote("/home/deck");
        let fetcher = FakeFetcher::default();
        let strategy = FilesystemStrategy::new(&host, &fetcher, GRID.to_string());

        let err = strategy
            .apply(42, AssetSlot::Logo, "https://cdn/missing.png")
            .expect_err("missing");
        assert!(matches!(err, Error::ExternalApi { .. }));
        assert!(host.file_paths().is_empty());
    }
}
