//! Lifecycle of one simulated call: ringing, answered, hung up.
//!
//! The session owns every device handle it opens and gives them back on every
//! exit path (`answer`, `hang_up`, `teardown`, drop).

use super::{CallerInfo, VibrationPattern};
use crate::error::Result;
use crate::roster::resolve_audio;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Ringing,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    Normal,
    InCommunication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioRouting {
    pub mode: AudioMode,
    pub speakerphone: bool,
}

impl AudioRouting {
    pub const NORMAL: Self = Self {
        mode: AudioMode::Normal,
        speakerphone: false,
    };
    pub const EARPIECE: Self = Self {
        mode: AudioMode::InCommunication,
        speakerphone: false,
    };
    pub const SPEAKER: Self = Self {
        mode: AudioMode::Normal,
        speakerphone: true,
    };
}

/// A media stream opened by [`CallDevices`].
pub trait Playback {
    fn start(&mut self, looping: bool) -> Result<()>;
    fn set_volume(&mut self, volume: f64);
    fn is_playing(&self) -> bool;
    fn release(&mut self);
}

/// Everything a call needs from the host: players, the vibrator and audio routing.
pub trait CallDevices {
    type Player: Playback;

    fn open_ringtone(&mut self) -> Result<Self::Player>;
    fn open_voice(&mut self, path: &std::path::Path) -> Result<Self::Player>;
    fn start_vibration(&mut self, pattern: &VibrationPattern) -> Result<()>;
    fn cancel_vibration(&mut self);
    fn set_routing(&mut self, routing: AudioRouting);
}

/// Non-fatal problems reported to the user when the call is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallNotice {
    NoAudioSelected,
    AudioMissing(PathBuf),
    PlaybackFailed,
}

impl fmt::Display for CallNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallNotice::NoAudioSelected => f.write_str("No audio file selected"),
            CallNotice::AudioMissing(_) => f.write_str("Audio file not found"),
            CallNotice::PlaybackFailed => f.write_str("Could not play the voice message"),
        }
    }
}

pub fn format_call_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

pub struct CallSession<D: CallDevices> {
    caller: CallerInfo,
    audio_dir: PathBuf,
    devices: D,
    phase: CallPhase,
    routing: AudioRouting,
    speaker_on: bool,
    muted: bool,
    vibrating: bool,
    ringtone: Option<D::Player>,
    voice: Option<D::Player>,
    answered_at: Option<Instant>,
}

impl<D: CallDevices> CallSession<D> {
    /// Opens the session and starts ringing.
    pub fn open(devices: D, caller: CallerInfo, audio_dir: PathBuf) -> Self {
        let mut session = Self {
            caller,
            audio_dir,
            devices,
            phase: CallPhase::Ringing,
            routing: AudioRouting::NORMAL,
            speaker_on: false,
            muted: false,
            vibrating: false,
            ringtone: None,
            voice: None,
            answered_at: None,
        };
        session.start_ringing();
        session
    }

    fn start_ringing(&mut self) {
        match self.devices.open_ringtone() {
            Ok(mut player) => match player.start(true) {
                Ok(()) => self.ringtone = Some(player),
                Err(e) => {
                    log::error!("Ringtone failed to start: {e}");
                    player.release();
                }
            },
            Err(e) => log::warn!("No ringtone: {e}"),
        }
        match self.devices.start_vibration(&VibrationPattern::ringing()) {
            Ok(()) => self.vibrating = true,
            Err(e) => log::warn!("No vibration: {e}"),
        }
    }

    fn stop_ringing(&mut self) {
        if let Some(mut player) = self.ringtone.take() {
            player.release();
        }
        if self.vibrating {
            self.devices.cancel_vibration();
            self.vibrating = false;
        }
    }

    fn stop_voice(&mut self) {
        if let Some(mut player) = self.voice.take() {
            player.release();
        }
    }

    fn apply_routing(&mut self, routing: AudioRouting) {
        self.routing = routing;
        self.devices.set_routing(routing);
    }

    /// Ringing → Active. Returns a notice when the voice message can't be played;
    /// the call stays up either way.
    pub fn answer(&mut self) -> Option<CallNotice> {
        if self.phase != CallPhase::Ringing {
            return None;
        }
        self.stop_ringing();
        self.phase = CallPhase::Active;
        self.answered_at = Some(Instant::now());
        self.speaker_on = false;
        self.apply_routing(AudioRouting::EARPIECE);
        self.start_voice()
    }

    fn start_voice(&mut self) -> Option<CallNotice> {
        let Some(file) = self.caller.audio_file.as_deref() else {
            return Some(CallNotice::NoAudioSelected);
        };
        let path = match resolve_audio(&self.audio_dir, file) {
            Some(path) if path.is_file() => path,
            Some(path) => return Some(CallNotice::AudioMissing(path)),
            None => return Some(CallNotice::AudioMissing(PathBuf::from(file))),
        };
        let mut player = match self.devices.open_voice(&path) {
            Ok(player) => player,
            Err(e) => {
                log::error!("Voice message {} failed to open: {e}", path.display());
                return Some(CallNotice::PlaybackFailed);
            }
        };
        if let Err(e) = player.start(false) {
            log::error!("Voice message {} failed to start: {e}", path.display());
            player.release();
            return Some(CallNotice::PlaybackFailed);
        }
        self.voice = Some(player);
        None
    }

    /// Flips between earpiece and speakerphone. Returns the new speaker state.
    pub fn toggle_speaker(&mut self) -> Option<bool> {
        if self.phase != CallPhase::Active {
            return None;
        }
        self.speaker_on = !self.speaker_on;
        let routing = if self.speaker_on {
            AudioRouting::SPEAKER
        } else {
            AudioRouting::EARPIECE
        };
        self.apply_routing(routing);
        Some(self.speaker_on)
    }

    /// Silences or restores the voice message. Only meaningful while it plays.
    pub fn toggle_mute(&mut self) -> Option<bool> {
        if self.phase != CallPhase::Active {
            return None;
        }
        let voice = self.voice.as_mut().filter(|v| v.is_playing())?;
        self.muted = !self.muted;
        voice.set_volume(if self.muted { 0.0 } else { 1.0 });
        Some(self.muted)
    }

    /// Active (or Ringing) → Ended.
    pub fn hang_up(&mut self) {
        if self.phase == CallPhase::Ended {
            return;
        }
        self.teardown();
    }

    /// Releases everything the session holds. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.stop_ringing();
        let had_call = self.phase == CallPhase::Active;
        self.stop_voice();
        if had_call || self.routing != AudioRouting::NORMAL {
            self.apply_routing(AudioRouting::NORMAL);
        }
        self.phase = CallPhase::Ended;
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn caller(&self) -> &CallerInfo {
        &self.caller
    }

    #[cfg(test)]
    pub(crate) fn muted(&self) -> bool {
        self.muted
    }

    #[cfg(test)]
    pub(crate) fn routing(&self) -> AudioRouting {
        self.routing
    }

    pub fn is_voice_playing(&self) -> bool {
        self.voice.as_ref().is_some_and(|v| v.is_playing())
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.answered_at.map(|t| t.elapsed())
    }
}

impl<D: CallDevices> Drop for CallSession<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
