//! Where Steam keeps per-user data.

mod locator;
mod platform;

pub use locator::{SteamLocator, IMAGE_EXTENSIONS};
