//! Typed view of `shortcuts.vdf`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

mod pivot;
mod store;

pub use pivot::{from_pivot, to_pivot};
pub use store::{decode_shortcuts, encode_shortcuts, load, save, SHORTCUTS_FILE_MODE};

/// Marks an app id as belonging to a non-Steam shortcut.
const SHORTCUT_APP_ID_FLAG: u32 = 0x8000_0000;

/// One non-Steam game entry.
///
/// Field names follow the keys Steam writes. Keys this type does not model are
/// kept in `extra` so a load/save cycle does not lose them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcut {
    #[serde(rename = "appid")]
    pub app_id: u32,
    #[serde(rename = "AppName", alias = "appname")]
    pub app_name: String,
    #[serde(rename = "Exe", alias = "exe")]
    pub exe: String,
    #[serde(rename = "StartDir")]
    pub start_dir: String,
    pub icon: String,
    #[serde(rename = "ShortcutPath")]
    pub shortcut_path: String,
    #[serde(rename = "LaunchOptions")]
    pub launch_options: String,
    #[serde(rename = "IsHidden")]
    pub is_hidden: u32,
    #[serde(rename = "AllowDesktopConfig")]
    pub allow_desktop_config: u32,
    #[serde(rename = "AllowOverlay")]
    pub allow_overlay: u32,
    #[serde(rename = "OpenVR")]
    pub open_vr: u32,
    #[serde(rename = "Devkit")]
    pub devkit: u32,
    #[serde(rename = "DevkitGameID")]
    pub devkit_game_id: String,
    #[serde(rename = "DevkitOverrideAppID")]
    pub devkit_override_app_id: u32,
    #[serde(rename = "LastPlayTime")]
    pub last_play_time: u32,
    #[serde(rename = "FlatpakAppID")]
    pub flatpak_app_id: String,
    #[serde(with = "ordinal_list")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
    /// Resolved artwork on disk, filled in for display only.
    #[serde(skip)]
    pub images: Option<Images>,
}

impl Shortcut {
    pub fn new(app_name: impl Into<String>, exe: impl Into<String>) -> Self {
        let app_name = app_name.into();
        let exe = exe.into();
        Self {
            app_id: generate_app_id(&exe, &app_name),
            start_dir: default_start_dir(&exe),
            app_name,
            exe,
            allow_desktop_config: 1,
            allow_overlay: 1,
            ..Self::default()
        }
    }

    pub fn hidden(&self) -> bool {
        self.is_hidden != 0
    }
}

/// Steam's id for a shortcut: CRC-32 of exe followed by name, high bit set.
pub fn generate_app_id(exe: &str, app_name: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(exe.as_bytes());
    hasher.update(app_name.as_bytes());
    hasher.finalize() | SHORTCUT_APP_ID_FLAG
}

fn default_start_dir(exe: &str) -> String {
    let quoted = exe.len() >= 2 && exe.starts_with('"') && exe.ends_with('"');
    let bare = if quoted { &exe[1..exe.len() - 1] } else { exe };
    let parent = match bare.rfind(['/', '\\']) {
        Some(0) => &bare[..1],
        Some(idx) => &bare[..idx],
        None => return String::new(),
    };
    if quoted {
        format!("\"{parent}\"")
    } else {
        parent.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Images {
    pub portrait: Option<String>,
    pub landscape: Option<String>,
    pub hero: Option<String>,
    pub logo: Option<String>,
    pub icon: Option<String>,
}

/// All shortcuts of one Steam user, keyed by ordinal strings (`"0"`, `"1"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shortcuts {
    #[serde(default)]
    pub shortcuts: IndexMap<String, Shortcut>,
}

impl Shortcuts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Shortcut)> {
        self.shortcuts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Shortcut)> {
        self.shortcuts.iter_mut()
    }

    /// Appends under the next unused ordinal key and returns that key.
    pub fn add(&mut self, shortcut: Shortcut) -> String {
        let mut ordinal = self.shortcuts.len();
        while self.shortcuts.contains_key(&ordinal.to_string()) {
            ordinal += 1;
        }
        let key = ordinal.to_string();
        self.shortcuts.insert(key.clone(), shortcut);
        key
    }

    /// Drops every shortcut named `name` and renumbers the rest densely.
    pub fn remove_by_name(&mut self, name: &str) -> usize {
        let before = self.shortcuts.len();
        self.shortcuts.retain(|_, shortcut| shortcut.app_name != name);
        let removed = before - self.shortcuts.len();
        self.rekey();
        removed
    }

    /// Renumbers keys `0..n` in iteration order.
    pub fn rekey(&mut self) {
        let entries = std::mem::take(&mut self.shortcuts);
        self.shortcuts = entries
            .into_values()
            .enumerate()
            .map(|(index, shortcut)| (index.to_string(), shortcut))
            .collect();
    }

    pub fn find_by_app_id(&self, app_id: u32) -> Option<&Shortcut> {
        self.shortcuts.values().find(|shortcut| shortcut.app_id == app_id)
    }

    pub fn find_by_app_id_mut(&mut self, app_id: u32) -> Option<&mut Shortcut> {
        self.shortcuts
            .values_mut()
            .find(|shortcut| shortcut.app_id == app_id)
    }

    /// Keeps only the shortcut with `app_id`, preserving its key.
    pub fn filter_app_id(&self, app_id: u32) -> Shortcuts {
        Shortcuts {
            shortcuts: self
                .shortcuts
                .iter()
                .filter(|(_, shortcut)| shortcut.app_id == app_id)
                .map(|(key, shortcut)| (key.clone(), shortcut.clone()))
                .collect(),
        }
    }
}

/// `tags` are stored as a map of ordinal keys to strings.
mod ordinal_list {
    use indexmap::IndexMap;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(tags.len()))?;
        for (index, tag) in tags.iter().enumerate() {
            map.serialize_entry(&index.to_string(), tag)?;
        }
        map.end()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let map = IndexMap::<String, String>::deserialize(deserializer)?;
        Ok(map.into_values().collect())
    }
}
