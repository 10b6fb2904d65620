use crate::error::{AppError, Result};
use crate::launch::DEFAULT_DELAY_SECS;
use crate::roster::Roster;
use crate::storage::PrefsStore;
use adw::prelude::*;
use adw::Application;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_delay_secs: u32,
    pub ringtone: Option<PathBuf>,
    pub fullscreen_call: bool,
    pub minimize_on_schedule: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_delay_secs: DEFAULT_DELAY_SECS,
            ringtone: None,
            fullscreen_call: true,
            minimize_on_schedule: true,
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads `path`, writing defaults there when it does not exist yet. A file
    /// that cannot be read or parsed is logged and left alone.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text).unwrap_or_else(|e| {
                log::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                log::warn!("Cannot read {}: {e}", path.display());
                Self::default()
            }
            Err(_) => {
                let settings = Self::default();
                if let Err(e) = settings.save_to(path) {
                    log::warn!("Could not write default settings: {e}");
                }
                settings
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub settings: PathBuf,
    pub prefs_db: PathBuf,
    pub audio_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let proj = ProjectDirs::from("com", "example", "FakeCallAngel").ok_or(AppError::NoDataDir)?;
        Ok(Self::under(proj.config_dir(), proj.data_dir()))
    }

    pub fn under(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            settings: config_dir.join("settings.toml"),
            prefs_db: data_dir.join("prefs.sqlite"),
            audio_dir: data_dir.join("voices"),
        }
    }
}

/// State shared by the windows of one running application.
pub struct AppContext {
    pub settings: Settings,
    pub paths: AppPaths,
    pub roster: RefCell<Roster>,
}

impl AppContext {
    pub fn load(paths: AppPaths) -> Result<Self> {
        let settings = Settings::load_from(&paths.settings);
        let prefs = match PrefsStore::open(&paths.prefs_db) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::error!("Falling back to a throwaway store, {}: {e}", paths.prefs_db.display());
                PrefsStore::open_in_memory()?
            }
        };
        let roster = Roster::load(prefs, paths.audio_dir.clone());
        Ok(Self {
            settings,
            paths,
            roster: RefCell::new(roster),
        })
    }
}

pub fn build_ui(app: &Application) {
    if let Some(window) = app.active_window() {
        window.present();
        return;
    }
    let ctx = AppPaths::discover().and_then(AppContext::load);
    match ctx {
        Ok(ctx) => crate::ui::main_window::show_main_window(app, Rc::new(ctx)),
        Err(e) => {
            log::error!("Cannot start: {e}");
            app.quit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let s = Settings::from_toml_str("default_delay_secs = 12\n").unwrap();
        assert_eq!(s.default_delay_secs, 12);
        assert!(s.fullscreen_call);
        assert!(s.minimize_on_schedule);
        assert_eq!(s.ringtone, None);
    }

    #[test]
    fn broken_settings_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "default_delay_secs = \"soon\"").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "default_delay_secs = \"soon\"");
    }

    #[test]
    fn unreadable_settings_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let bytes = b"default_delay_secs = 12\n# caf\xe9\n";
        fs::write(&path, bytes).unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("settings.toml");
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded, Settings::default());
        let written = Settings::from_toml_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, loaded);
    }

    #[test]
    fn context_loads_from_fresh_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::under(&dir.path().join("config"), &dir.path().join("data"));
        let ctx = AppContext::load(paths.clone()).unwrap();
        assert!(ctx.roster.borrow().entries().is_empty());
        assert!(paths.prefs_db.exists());
    }
}
