use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("roster encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("could not write settings: {0}")]
    SettingsWrite(#[from] toml::ser::Error),

    #[error("unsupported roster version {0}")]
    RosterVersion(u32),

    #[error("no caller at position {0}")]
    NoSuchCaller(usize),

    #[error("no data directory available")]
    NoDataDir,

    #[error("audio unavailable: {0}")]
    Audio(String),

    #[error(transparent)]
    Glib(#[from] glib::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
