//! User settings that are not tied to a single service.

use configparser::ini::Ini;
use std::path::{Path, PathBuf};

use crate::error::{ShellResult, StorageError};
use crate::registry::ServiceId;

const SECTION: &str = "Settings";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    path: PathBuf,
    pub autostart: bool,
    pub autostart_minimized: bool,
    pub hide_menubar: bool,
    /// Service whose tab is activated on startup.
    pub default_view: Option<ServiceId>,
}

impl Settings {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Settings {
            path: path.into(),
            autostart: false,
            autostart_minimized: false,
            hide_menubar: false,
            default_view: None,
        }
    }

    /// Read settings; a missing file means everything is off.
    pub fn load(path: impl Into<PathBuf>) -> ShellResult<Self> {
        let mut settings = Settings::empty(path);
        if !settings.path.exists() {
            return Ok(settings);
        }

        let mut ini = Ini::new_cs();
        ini.load(&settings.path).map_err(|message| StorageError::Settings {
            path: settings.path.clone(),
            message,
        })?;

        settings.autostart = read_flag(&ini, "autostart");
        settings.autostart_minimized = read_flag(&ini, "autostartMinimized");
        settings.hide_menubar = read_flag(&ini, "hideMenubar");
        settings.default_view = ini
            .get(SECTION, "defaultView")
            .filter(|s| !s.is_empty())
            .and_then(|raw| match ServiceId::parse(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring invalid defaultView setting");
                    None
                }
            });

        Ok(settings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> ShellResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }

        let mut ini = Ini::new_cs();
        ini.set(SECTION, "autostart", Some(self.autostart.to_string()));
        ini.set(
            SECTION,
            "autostartMinimized",
            Some(self.autostart_minimized.to_string()),
        );
        ini.set(SECTION, "hideMenubar", Some(self.hide_menubar.to_string()));
        if let Some(view) = &self.default_view {
            ini.set(SECTION, "defaultView", Some(view.to_string()));
        }

        ini.write(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    /// Turning autostart off also turns off the minimized variant.
    pub fn set_autostart(&mut self, enabled: bool) {
        self.autostart = enabled;
        if !enabled {
            self.autostart_minimized = false;
        }
    }

    /// Starting minimized implies starting at all.
    pub fn set_autostart_minimized(&mut self, enabled: bool) {
        self.autostart_minimized = enabled;
        if enabled {
            self.autostart = true;
        }
    }

    pub fn set_hide_menubar(&mut self, hidden: bool) {
        self.hide_menubar = hidden;
    }

    pub fn set_default_view(&mut self, view: Option<ServiceId>) {
        self.default_view = view;
    }

    /// The menubar cannot be hidden on macOS, so the flag is forced off there.
    pub fn apply_platform_rules(&mut self, is_mac: bool) -> bool {
        if is_mac && self.hide_menubar {
            self.hide_menubar = false;
            return true;
        }
        false
    }
}

fn read_flag(ini: &Ini, key: &str) -> bool {
    match ini.getboolcoerce(SECTION, key) {
        Ok(value) => value.unwrap_or(false),
        Err(e) => {
            tracing::warn!(key, "Invalid boolean setting: {}", e);
            false
        }
    }
}
