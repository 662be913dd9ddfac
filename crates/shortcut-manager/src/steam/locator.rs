use remote_exec::Host;
use tracing::debug;

use super::platform::{local_base_dir, posix_base_dir};
use crate::artwork::AssetSlot;
use crate::{Error, Result};

/// Extensions probed when looking for existing grid artwork, in order.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Resolves Steam directories on one host.
///
/// Remote hosts always use the POSIX layout; the local host follows the
/// platform convention. A configured base directory overrides both, with a
/// leading `~` taken from the host's own home directory.
pub struct SteamLocator<'h> {
    host: &'h dyn Host,
    base_override: Option<String>,
}

impl<'h> SteamLocator<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self {
            host,
            base_override: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: Option<String>) -> Self {
        self.base_override = base_dir.filter(|dir| !dir.trim().is_empty());
        self
    }

    pub fn host(&self) -> &'h dyn Host {
        self.host
    }

    pub fn base_dir(&self) -> Result<String> {
        if let Some(base) = self.base_override.as_deref() {
            return self.expand_home(base);
        }
        if self.host.is_remote() {
            posix_base_dir(self.host)
        } else {
            local_base_dir(self.host)
        }
    }

    fn expand_home(&self, path: &str) -> Result<String> {
        if path == "~" {
            return Ok(self.host.home_dir()?);
        }
        match path.strip_prefix("~/") {
            Some(rest) => Ok(self.host.join_path(&self.host.home_dir()?, rest)),
            None => Ok(path.to_string()),
        }
    }

    pub fn user_dir(&self) -> Result<String> {
        Ok(self.host.join_path(&self.base_dir()?, "userdata"))
    }

    /// Names of the directories under `userdata`, sorted. Regular files are skipped.
    pub fn list_users(&self) -> Result<Vec<String>> {
        let user_dir = self.user_dir()?;
        let mut users: Vec<String> = self
            .host
            .list_dir(&user_dir)?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name)
            .collect();
        users.sort();
        debug!(
            event = "steam.users",
            host = %self.host.describe(),
            user_dir = %user_dir,
            count = users.len(),
            "listed steam users"
        );
        Ok(users)
    }

    pub fn first_user(&self) -> Result<String> {
        match self.list_users() {
            Ok(users) => users.into_iter().next().ok_or(Error::NoUsersFound),
            Err(err) => {
                debug!(event = "steam.users.failed", error = %err, "cannot list steam users");
                Err(Error::NoUsersFound)
            }
        }
    }

    pub fn user_config_dir(&self, user: &str) -> Result<String> {
        let user_path = self.host.join_path(&self.user_dir()?, user);
        Ok(self.host.join_path(&user_path, "config"))
    }

    pub fn shortcuts_path(&self, user: &str) -> Result<String> {
        Ok(self
            .host
            .join_path(&self.user_config_dir(user)?, "shortcuts.vdf"))
    }

    pub fn has_shortcuts(&self, user: &str) -> bool {
        match self.shortcuts_path(user) {
            Ok(path) => self.host.file_exists(&path),
            Err(_) => false,
        }
    }

    pub fn grid_dir(&self, user: &str) -> Result<String> {
        Ok(self.host.join_path(&self.user_config_dir(user)?, "grid"))
    }

    /// First existing `<grid>/<app_id><suffix>.<ext>` for the slot.
    pub fn find_image(&self, user: &str, app_id: u32, slot: AssetSlot) -> Option<String> {
        let grid = self.grid_dir(user).ok()?;
        let stem = slot.file_stem(app_id);
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| self.host.join_path(&grid, &format!("{stem}.{ext}")))
            .find(|path| self.host.file_exists(path))
    }
}
