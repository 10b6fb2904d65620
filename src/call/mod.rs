pub mod devices;
pub mod session;
pub mod vibration;

pub use session::{
    AudioRouting, CallDevices, CallNotice, CallPhase, CallSession, Playback,
    format_call_duration,
};
pub use vibration::VibrationPattern;

/// What the roster hands to the call window. Either half may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerInfo {
    pub name: Option<String>,
    pub audio_file: Option<String>,
}

impl CallerInfo {
    pub fn new(name: Option<String>, audio_file: Option<String>) -> Self {
        Self { name, audio_file }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown")
    }
}

impl From<&crate::roster::CallerEntry> for CallerInfo {
    fn from(entry: &crate::roster::CallerEntry) -> Self {
        Self::new(Some(entry.name.clone()), Some(entry.audio_file.clone()))
    }
}
