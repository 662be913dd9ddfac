use std::cell::OnceCell;

use remote_exec::shell::command_line;
use remote_exec::Host;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ArtworkStrategy, AssetSlot, ImageFetcher};
use crate::{Error, Result};

const SERVICE: &str = "steam debug protocol";
const SCRIPT_TEMPLATE: &str = include_str!("set_artwork.py");
const PROBE_COMMAND: &str = "python3 -c 'import aiohttp' 2>&1";

/// Injects artwork into the running Steam client through its CEF debugging
/// endpoint, which also accepts animated formats.
///
/// The work happens in a python helper run on the active host, so the same
/// path serves local and remote targets. Whether the helper can run is
/// probed at most once per strategy value.
pub struct DebugProtocolStrategy<'a> {
    host: &'a dyn Host,
    fetcher: &'a dyn ImageFetcher,
    available: OnceCell<bool>,
}

impl<'a> DebugProtocolStrategy<'a> {
    pub fn new(host: &'a dyn Host, fetcher: &'a dyn ImageFetcher) -> Self {
        Self {
            host,
            fetcher,
            available: OnceCell::new(),
        }
    }

    fn probe(&self) -> bool {
        let available = match self.host.run_command(PROBE_COMMAND) {
            Ok(output) => {
                output.success()
                    && !output.output.contains("ModuleNotFoundError")
                    && !output.output.contains("No module")
            }
            Err(err) => {
                debug!(event = "artwork.debug.probe_failed", error = %err, "capability probe failed");
                false
            }
        };
        if !available {
            info!(
                event = "artwork.debug.unavailable",
                host = %self.host.describe(),
                "python3 with aiohttp not found, using grid files only (no animated artwork)"
            );
        }
        available
    }

    fn run_helper(
        &self,
        app_id: u32,
        slot: AssetSlot,
        image_path: &str,
        script_path: &str,
        format: &str,
    ) -> Result<()> {
        let script = render_script(image_path, app_id, format, slot.asset_type())?;
        self.host.write_file(script_path, script.as_bytes(), 0o755)?;
        let command = format!("{} 2>&1", command_line("python3", [script_path]));
        let output = self.host.run_command(&command)?;
        let trimmed = output.output.trim();
        if !output.success() {
            return Err(Error::external(
                SERVICE,
                format!("helper exited with {}: {trimmed}", output.exit_code),
            ));
        }
        if trimmed.contains("ERROR") {
            return Err(Error::external(SERVICE, trimmed.to_string()));
        }
        Ok(())
    }
}

impl ArtworkStrategy for DebugProtocolStrategy<'_> {
    fn name(&self) -> &'static str {
        "debug-protocol"
    }

    fn supports(&self, slot: AssetSlot) -> bool {
        slot != AssetSlot::Icon
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn apply(&self, app_id: u32, slot: AssetSlot, source: &str) -> Result<String> {
        let image = self.fetcher.fetch(source)?;
        let extension = image.extension(source);
        let format = extension.trim_start_matches('.');

        let temp_dir = self.host.temp_dir();
        let token = Uuid::new_v4().simple().to_string();
        let image_path = self
            .host
            .join_path(&temp_dir, &format!("steam-artwork-{token}{extension}"));
        let script_path = self
            .host
            .join_path(&temp_dir, &format!("steam-artwork-{token}.py"));

        let result = self
            .host
            .write_file(&image_path, &image.bytes, 0o644)
            .map_err(Error::from)
            .and_then(|()| self.run_helper(app_id, slot, &image_path, &script_path, format));

        self.host
            .remove_file(&script_path)
            .and(self.host.remove_file(&image_path));

        result?;
        debug!(
            event = "artwork.debug.applied",
            host = %self.host.describe(),
            app_id,
            slot = slot.label(),
            format,
            "artwork set through debug protocol"
        );
        Ok(format!("live ({format})"))
    }
}

/// Fills the helper's placeholders with python literals.
fn render_script(image_path: &str, app_id: u32, format: &str, asset_type: u8) -> Result<String> {
    Ok(SCRIPT_TEMPLATE
        .replace("__IMAGE_PATH__", &python_literal(image_path)?)
        .replace("__APP_ID__", &app_id.to_string())
        .replace("__FORMAT__", &python_literal(format)?)
        .replace("__ASSET_TYPE__", &asset_type.to_string()))
}

fn python_literal(value: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|err| Error::external(SERVICE, format!("cannot render helper script: {err}")))
}
