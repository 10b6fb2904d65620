//! GTK-backed call devices: `gtk::MediaFile` players, a widget that shakes in
//! place of a vibration motor, and logged audio routing.

use super::vibration::Segments;
use super::{AudioRouting, CallDevices, Playback, VibrationPattern};
use crate::error::{AppError, Result};
use gtk::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const VIBRATING_CLASS: &str = "vibrating";

const RINGTONE_CANDIDATES: &[&str] = &[
    "sounds/freedesktop/stereo/phone-incoming-call.oga",
    "sounds/freedesktop/stereo/bell.oga",
];

/// The configured ringtone if it exists, else the first sound-theme candidate
/// found under `data_dirs`.
pub fn find_ringtone_in(configured: Option<&Path>, data_dirs: &[PathBuf]) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        log::warn!("Configured ringtone {} does not exist", path.display());
    }
    data_dirs
        .iter()
        .flat_map(|dir| RINGTONE_CANDIDATES.iter().map(move |c| dir.join(c)))
        .find(|p| p.is_file())
}

pub fn find_default_ringtone(configured: Option<&Path>) -> Option<PathBuf> {
    let mut dirs = vec![glib::user_data_dir()];
    dirs.extend(glib::system_data_dirs());
    find_ringtone_in(configured, &dirs)
}

pub struct MediaPlayback {
    media: gtk::MediaFile,
}

impl MediaPlayback {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AppError::Audio(format!("{} not found", path.display())));
        }
        let media = gtk::MediaFile::for_filename(path);
        if let Some(err) = media.error() {
            return Err(err.into());
        }
        let name = path.display().to_string();
        media.connect_error_notify(move |m| {
            if let Some(err) = m.error() {
                log::error!("Playback of {name} failed: {err}");
            }
        });
        Ok(Self { media })
    }
}

impl Playback for MediaPlayback {
    fn start(&mut self, looping: bool) -> Result<()> {
        self.media.set_loop(looping);
        self.media.set_volume(1.0);
        self.media.play();
        match self.media.error() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.media.set_volume(volume);
    }

    fn is_playing(&self) -> bool {
        self.media.is_playing()
    }

    fn release(&mut self) {
        self.media.pause();
        self.media.clear();
    }
}

/// Toggles [`VIBRATING_CLASS`] on a widget following a vibration pattern.
pub struct WidgetVibrator {
    widget: gtk::Widget,
    timer: Rc<RefCell<Option<glib::SourceId>>>,
}

impl WidgetVibrator {
    pub fn new(widget: &impl IsA<gtk::Widget>) -> Self {
        Self {
            widget: widget.clone().upcast(),
            timer: Rc::new(RefCell::new(None)),
        }
    }

    pub fn start(&self, pattern: &VibrationPattern) -> Result<()> {
        if pattern.is_degenerate() {
            return Err(AppError::Audio("vibration pattern never vibrates".into()));
        }
        self.cancel();
        step(self.widget.clone(), pattern.segments(), self.timer.clone());
        Ok(())
    }

    pub fn cancel(&self) {
        if let Some(id) = self.timer.borrow_mut().take() {
            id.remove();
        }
        self.widget.remove_css_class(VIBRATING_CLASS);
    }
}

fn step(widget: gtk::Widget, mut segments: Segments, timer: Rc<RefCell<Option<glib::SourceId>>>) {
    let Some((duration, on)) = segments.next() else {
        widget.remove_css_class(VIBRATING_CLASS);
        return;
    };
    if on {
        widget.add_css_class(VIBRATING_CLASS);
    } else {
        widget.remove_css_class(VIBRATING_CLASS);
    }
    let slot = timer.clone();
    let id = glib::timeout_add_local_once(duration, move || {
        slot.borrow_mut().take();
        step(widget, segments, slot);
    });
    *timer.borrow_mut() = Some(id);
}

pub struct GtkDevices {
    ringtone: Option<PathBuf>,
    vibrator: WidgetVibrator,
    routing: AudioRouting,
}

impl GtkDevices {
    pub fn new(ringtone: Option<PathBuf>, vibrate: &impl IsA<gtk::Widget>) -> Self {
        Self {
            ringtone,
            vibrator: WidgetVibrator::new(vibrate),
            routing: AudioRouting::NORMAL,
        }
    }
}

impl CallDevices for GtkDevices {
    type Player = MediaPlayback;

    fn open_ringtone(&mut self) -> Result<MediaPlayback> {
        let path = self
            .ringtone
            .as_deref()
            .ok_or_else(|| AppError::Audio("no ringtone found".into()))?;
        MediaPlayback::open(path)
    }

    fn open_voice(&mut self, path: &Path) -> Result<MediaPlayback> {
        MediaPlayback::open(path)
    }

    fn start_vibration(&mut self, pattern: &VibrationPattern) -> Result<()> {
        self.vibrator.start(pattern)
    }

    fn cancel_vibration(&mut self) {
        self.vibrator.cancel();
    }

    fn set_routing(&mut self, routing: AudioRouting) {
        if routing != self.routing {
            log::info!(
                "Audio routing {:?} -> {:?} (speakerphone {})",
                self.routing.mode,
                routing.mode,
                routing.speakerphone
            );
        }
        self.routing = routing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn configured_ringtone_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("ring.ogg");
        fs::write(&custom, b"x").unwrap();
        assert_eq!(find_ringtone_in(Some(&custom), &[]), Some(custom));
    }

    #[test]
    fn falls_back_to_sound_theme() {
        let dir = tempfile::tempdir().unwrap();
        let bell = dir.path().join("sounds/freedesktop/stereo/bell.oga");
        fs::create_dir_all(bell.parent().unwrap()).unwrap();
        fs::write(&bell, b"x").unwrap();

        let missing = dir.path().join("nope.ogg");
        let dirs = vec![dir.path().join("empty"), dir.path().to_path_buf()];
        assert_eq!(find_ringtone_in(Some(&missing), &dirs), Some(bell));
    }

    #[test]
    fn no_ringtone_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_ringtone_in(None, &[dir.path().to_path_buf()]), None);
    }
}
