//! The persisted list of fake callers and the audio clips they own.

use crate::error::{AppError, Result};
use crate::storage::PrefsStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ROSTER_KEY: &str = "callersList";
const ROSTER_VERSION: u32 = 1;
const DEFAULT_EXTENSION: &str = "mp3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerEntry {
    pub name: String,
    #[serde(rename = "file")]
    pub audio_file: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RosterRecord {
    version: u32,
    callers: Vec<CallerEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRoster {
    Versioned(RosterRecord),
    // Written by earlier builds: a bare array of entries.
    Bare(Vec<CallerEntry>),
}

pub fn encode_roster(entries: &[CallerEntry]) -> Result<String> {
    let record = RosterRecord {
        version: ROSTER_VERSION,
        callers: entries.to_vec(),
    };
    Ok(serde_json::to_string(&record)?)
}

pub fn decode_roster(text: &str) -> Result<Vec<CallerEntry>> {
    match serde_json::from_str::<StoredRoster>(text)? {
        StoredRoster::Versioned(record) if record.version == ROSTER_VERSION => Ok(record.callers),
        StoredRoster::Versioned(record) => Err(AppError::RosterVersion(record.version)),
        StoredRoster::Bare(callers) => Ok(callers),
    }
}

/// Returns the path of `file_name` inside `dir`, or `None` when the reference is
/// not a bare file name.
pub fn resolve_audio(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let candidate = Path::new(file_name);
    if file_name.is_empty() || candidate.file_name() != Some(candidate.as_os_str()) {
        return None;
    }
    Some(dir.join(candidate))
}

fn unique_file_name(dir: &Path, extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut name = format!("voice_{millis}.{extension}");
    let mut n = 1;
    while dir.join(&name).exists() {
        name = format!("voice_{millis}_{n}.{extension}");
        n += 1;
    }
    name
}

fn sanitize_extension(extension: Option<&str>) -> String {
    extension
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

pub struct Roster {
    entries: Vec<CallerEntry>,
    prefs: PrefsStore,
    audio_dir: PathBuf,
}

impl Roster {
    /// Loads the persisted roster. Anything unreadable is treated as an empty roster.
    pub fn load(prefs: PrefsStore, audio_dir: PathBuf) -> Self {
        let entries = match prefs.get(ROSTER_KEY) {
            Ok(Some(text)) => decode_roster(&text).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable caller list: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("Failed to read caller list: {e}");
                Vec::new()
            }
        };
        log::info!("Loaded {} caller(s)", entries.len());
        Self {
            entries,
            prefs,
            audio_dir,
        }
    }

    pub fn entries(&self) -> &[CallerEntry] {
        &self.entries
    }

    pub fn audio_path(&self, entry: &CallerEntry) -> Option<PathBuf> {
        resolve_audio(&self.audio_dir, &entry.audio_file)
    }

    /// Copies `source` into the audio directory under a fresh name and appends the
    /// caller with `name` exactly as typed. An empty name leaves both storage and
    /// roster untouched.
    pub fn add_caller(
        &mut self,
        name: &str,
        mut source: impl Read,
        extension: Option<&str>,
    ) -> Result<Option<&CallerEntry>> {
        if name.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.audio_dir)?;
        let file_name = unique_file_name(&self.audio_dir, &sanitize_extension(extension));
        let path = self.audio_dir.join(&file_name);
        let copied = fs::File::create(&path).and_then(|mut out| io::copy(&mut source, &mut out));
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
        };
        log::info!("Imported {bytes} bytes of audio as {file_name}");

        self.entries.push(CallerEntry {
            name: name.to_string(),
            audio_file: file_name,
        });
        if let Err(e) = self.persist() {
            self.entries.pop();
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        Ok(self.entries.last())
    }

    /// Removes the caller at `index` together with its audio clip. The clip is
    /// only deleted once the shorter roster has been saved.
    pub fn delete(&mut self, index: usize) -> Result<CallerEntry> {
        if index >= self.entries.len() {
            return Err(AppError::NoSuchCaller(index));
        }
        let removed = self.entries.remove(index);
        if let Err(e) = self.persist() {
            self.entries.insert(index, removed);
            return Err(e);
        }
        if let Some(path) = self.audio_path(&removed) {
            match fs::remove_file(&path) {
                Ok(()) => log::info!("Deleted {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not delete {}: {e}", path.display()),
            }
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        self.prefs.put(ROSTER_KEY, &encode_roster(&self.entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stored(prefs: &PrefsStore) -> Option<Vec<CallerEntry>> {
        prefs
            .get(ROSTER_KEY)
            .unwrap()
            .map(|text| decode_roster(&text).unwrap())
    }

    fn entry(name: &str, file: &str) -> CallerEntry {
        CallerEntry {
            name: name.into(),
            audio_file: file.into(),
        }
    }

    #[test]
    fn empty_store_loads_empty_roster() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::load(PrefsStore::open_in_memory().unwrap(), dir.path().into());
        assert!(roster.entries().is_empty());
    }

    #[test]
    fn malformed_record_loads_empty_roster() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["not json", r#"{"version":7,"callers":[]}"#, r#"[{"name":"x"}]"#] {
            let prefs = PrefsStore::open_in_memory().unwrap();
            prefs.put(ROSTER_KEY, bad).unwrap();
            let roster = Roster::load(prefs, dir.path().into());
            assert!(roster.entries().is_empty(), "{bad}");
        }
    }

    #[test]
    fn bare_array_records_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsStore::open_in_memory().unwrap();
        prefs
            .put(ROSTER_KEY, r#"[{"name":"Mom","file":"voice_1.mp3"}]"#)
            .unwrap();
        let roster = Roster::load(prefs, dir.path().into());
        assert_eq!(roster.entries(), &[entry("Mom", "voice_1.mp3")]);
    }

    #[test]
    fn add_copies_audio_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut roster = Roster::load(PrefsStore::open_in_memory().unwrap(), dir.path().into());

        let added = roster
            .add_caller("Mom", Cursor::new(b"ring ring".to_vec()), Some("ogg"))
            .unwrap()
            .cloned()
            .unwrap();
        assert_eq!(added.name, "Mom");
        assert!(added.audio_file.starts_with("voice_"));
        assert!(added.audio_file.ends_with(".ogg"));

        let path = roster.audio_path(&added).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"ring ring");
        assert_eq!(stored(&roster.prefs).unwrap(), roster.entries());
    }

    #[test]
    fn empty_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let audio_dir = dir.path().join("voices");
        let mut roster = Roster::load(PrefsStore::open_in_memory().unwrap(), audio_dir.clone());

        let added = roster.add_caller("", Cursor::new(b"x".to_vec()), None).unwrap();
        assert!(added.is_none());
        assert!(roster.entries().is_empty());
        assert_eq!(roster.prefs.get(ROSTER_KEY).unwrap(), None);
        assert!(!audio_dir.exists());
    }

    #[test]
    fn names_are_stored_as_typed() {
        let dir = tempfile::tempdir().unwrap();
        let mut roster = Roster::load(PrefsStore::open_in_memory().unwrap(), dir.path().into());

        for name in ["   ", "  Mom "] {
            let added = roster.add_caller(name, Cursor::new(b"x".to_vec()), None).unwrap();
            assert_eq!(added.map(|e| e.name.as_str()), Some(name));
        }
        let names: Vec<_> = stored(&roster.prefs).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["   ", "  Mom "]);
    }

    #[test]
    fn failed_save_keeps_caller_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsStore::open_in_memory().unwrap();
        prefs
            .put(ROSTER_KEY, &encode_roster(&[entry("Boss", "voice_2.mp3")]).unwrap())
            .unwrap();
        fs::write(dir.path().join("voice_2.mp3"), b"boss").unwrap();
        let mut roster = Roster::load(prefs, dir.path().into());
        roster.prefs.reject_writes();

        assert!(roster.delete(0).is_err());
        assert_eq!(roster.entries(), &[entry("Boss", "voice_2.mp3")]);
        assert!(dir.path().join("voice_2.mp3").exists());

        assert!(roster.add_caller("Mom", Cursor::new(b"mom".to_vec()), None).is_err());
        assert_eq!(roster.entries(), &[entry("Boss", "voice_2.mp3")]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_copy_leaves_no_entry_or_file() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("revoked"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut roster = Roster::load(PrefsStore::open_in_memory().unwrap(), dir.path().into());
        assert!(roster.add_caller("Boss", Broken, None).is_err());
        assert!(roster.entries().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let mut roster = Roster::load(PrefsStore::open_in_memory().unwrap(), dir.path().into());
        for _ in 0..3 {
            roster.add_caller("Same", Cursor::new(vec![1]), None).unwrap();
        }
        let files: std::collections::BTreeSet<_> =
            roster.entries().iter().map(|e| e.audio_file.as_str()).collect();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn deleting_boss_keeps_mom() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsStore::open_in_memory().unwrap();
        prefs
            .put(
                ROSTER_KEY,
                &encode_roster(&[entry("Mom", "voice_1.mp3"), entry("Boss", "voice_2.mp3")]).unwrap(),
            )
            .unwrap();
        fs::write(dir.path().join("voice_1.mp3"), b"mom").unwrap();
        fs::write(dir.path().join("voice_2.mp3"), b"boss").unwrap();

        let mut roster = Roster::load(prefs, dir.path().into());
        let removed = roster.delete(1).unwrap();

        assert_eq!(removed, entry("Boss", "voice_2.mp3"));
        assert_eq!(roster.entries(), &[entry("Mom", "voice_1.mp3")]);
        assert!(!dir.path().join("voice_2.mp3").exists());
        assert!(dir.path().join("voice_1.mp3").exists());
        assert_eq!(stored(&roster.prefs).unwrap(), vec![entry("Mom", "voice_1.mp3")]);
    }

    #[test]
    fn delete_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsStore::open_in_memory().unwrap();
        prefs
            .put(ROSTER_KEY, &encode_roster(&[entry("Ghost", "voice_9.mp3")]).unwrap())
            .unwrap();
        let mut roster = Roster::load(prefs, dir.path().into());
        assert!(roster.delete(0).is_ok());
        assert!(roster.entries().is_empty());
        assert!(matches!(roster.delete(0), Err(AppError::NoSuchCaller(0))));
    }

    #[test]
    fn memory_and_store_agree_after_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut roster = Roster::load(PrefsStore::open_in_memory().unwrap(), dir.path().into());
        let steps: &[Option<&str>] = &[Some("A"), Some("B"), None, Some("C"), Some("D"), None, None];
        for step in steps {
            match step {
                Some(name) => {
                    roster.add_caller(name, Cursor::new(vec![0u8; 4]), None).unwrap();
                }
                None => {
                    roster.delete(0).unwrap();
                }
            }
            assert_eq!(stored(&roster.prefs).unwrap(), roster.entries());
        }
        let names: Vec<_> = roster.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["D"]);
    }

    #[test]
    fn audio_references_must_be_bare_names() {
        let dir = Path::new("/data/voices");
        assert_eq!(resolve_audio(dir, "voice_1.mp3"), Some(dir.join("voice_1.mp3")));
        assert_eq!(resolve_audio(dir, "../secret"), None);
        assert_eq!(resolve_audio(dir, "a/b.mp3"), None);
        assert_eq!(resolve_audio(dir, ""), None);
    }
}
