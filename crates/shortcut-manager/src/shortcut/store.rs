use remote_exec::Host;
use tracing::{debug, info};

use super::pivot::{from_pivot, to_pivot};
use super::Shortcuts;
use crate::{Error, Result};

/// Permission bits Steam itself leaves on `shortcuts.vdf`.
pub const SHORTCUTS_FILE_MODE: u32 = 0o666;

/// Binary VDF -> generic tree -> JSON pivot -> typed shortcuts.
///
/// `origin` only labels parse errors.
pub fn decode_shortcuts(bytes: &[u8], origin: &str) -> Result<Shortcuts> {
    let tree = steam_vdf::decode(bytes).map_err(|source| Error::Parse {
        path: origin.to_string(),
        source,
    })?;
    serde_json::from_value(to_pivot(&tree)).map_err(Error::Shape)
}

/// Typed shortcuts -> JSON pivot -> coerced generic tree -> binary VDF.
pub fn encode_shortcuts(shortcuts: &Shortcuts) -> Result<Vec<u8>> {
    let pivot = serde_json::to_value(shortcuts).map_err(Error::Shape)?;
    steam_vdf::encode(&from_pivot(&pivot)).map_err(Error::Encode)
}

pub fn load(host: &dyn Host, path: &str) -> Result<Shortcuts> {
    let bytes = host.read_file(path)?;
    let shortcuts = decode_shortcuts(&bytes, path)?;
    debug!(
        event = "shortcuts.load",
        host = %host.describe(),
        path,
        count = shortcuts.len(),
        "loaded shortcuts"
    );
    Ok(shortcuts)
}

/// Encodes fully before writing, so an encoding failure leaves the file untouched.
/// The write itself is not atomic.
pub fn save(host: &dyn Host, shortcuts: &Shortcuts, path: &str) -> Result<()> {
    let bytes = encode_shortcuts(shortcuts)?;
    host.write_file(path, &bytes, SHORTCUTS_FILE_MODE)?;
    info!(
        event = "shortcuts.save",
        host = %host.describe(),
        path,
        count = shortcuts.len(),
        bytes = bytes.len(),
        "saved shortcuts"
    );
    Ok(())
}
