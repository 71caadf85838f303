use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::audio::GuildId;

pub type UserId = u64;

/// Per-guild preferences that outlive the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Role allowed to run moderator commands.
    #[serde(default)]
    pub moderator_role_id: Option<u64>,
    /// Personality mode for chat replies.
    #[serde(default)]
    pub mode: Option<String>,
    /// Playback volume in [0.01, 1.0]; unset means the configured default.
    #[serde(default)]
    pub volume: Option<f32>,
}

/// A private message left for another member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub author_id: UserId,
    pub author_name: String,
    pub message: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

/// The latest notes for one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotesPage {
    /// Newest first.
    pub notes: Vec<Note>,
    /// Every note waiting, shown or not.
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Edit applied to one guild's settings while the store is locked.
pub type SettingsEdit = Box<dyn FnOnce(&mut GuildSettings) + Send>;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings for `guild`, or defaults if none were saved.
    async fn get(&self, guild: GuildId) -> GuildSettings;

    /// Read, edit and save `guild`'s settings as one step, returning the
    /// saved value.
    async fn update(&self, guild: GuildId, edit: SettingsEdit) -> Result<GuildSettings, StoreError>;

    async fn set(&self, guild: GuildId, settings: GuildSettings) -> Result<(), StoreError> {
        self.update(guild, Box::new(move |current: &mut GuildSettings| *current = settings))
            .await
            .map(|_| ())
    }
}

#[async_trait]
pub trait NotesStore: Send + Sync {
    /// Up to `limit` notes left for `recipient`.
    async fn list(&self, recipient: UserId, limit: usize) -> NotesPage;

    /// Store a note. Returns how many notes `recipient` now has.
    async fn append(&self, recipient: UserId, note: Note) -> Result<usize, StoreError>;

    /// Delete every note left for `recipient`. Returns how many there were.
    async fn clear(&self, recipient: UserId) -> Result<usize, StoreError>;
}

fn newest_first(notes: Option<&Vec<Note>>, limit: usize) -> NotesPage {
    notes
        .map(|notes| NotesPage {
            notes: notes.iter().rev().take(limit).cloned().collect(),
            total: notes.len(),
        })
        .unwrap_or_default()
}

/// Settings kept only for the life of the process.
#[derive(Default)]
pub struct MemoryStore {
    settings: RwLock<HashMap<GuildId, GuildSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, guild: GuildId) -> GuildSettings {
        self.settings
            .read()
            .await
            .get(&guild)
            .cloned()
            .unwrap_or_default()
    }

    async fn update(&self, guild: GuildId, edit: SettingsEdit) -> Result<GuildSettings, StoreError> {
        let mut map = self.settings.write().await;
        let entry = map.entry(guild).or_default();
        edit(&mut *entry);
        Ok(entry.clone())
    }
}

/// Notes kept only for the life of the process.
#[derive(Default)]
pub struct MemoryNotes {
    notes: RwLock<HashMap<UserId, Vec<Note>>>,
}

impl MemoryNotes {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotesStore for MemoryNotes {
    async fn list(&self, recipient: UserId, limit: usize) -> NotesPage {
        newest_first(self.notes.read().await.get(&recipient), limit)
    }

    async fn append(&self, recipient: UserId, note: Note) -> Result<usize, StoreError> {
        let mut map = self.notes.write().await;
        let notes = map.entry(recipient).or_default();
        notes.push(note);
        Ok(notes.len())
    }

    async fn clear(&self, recipient: UserId) -> Result<usize, StoreError> {
        Ok(self
            .notes
            .write()
            .await
            .remove(&recipient)
            .map_or(0, |notes| notes.len()))
    }
}

/// An `{id: value}` map mirrored to a pretty-printed JSON file. Reads are
/// served from memory; every change rewrites the file under the write lock
/// so concurrent saves land in order.
struct JsonMapFile<V> {
    path: PathBuf,
    entries: RwLock<HashMap<u64, V>>,
}

impl<V: Serialize + DeserializeOwned> JsonMapFile<V> {
    /// Load `path`. A missing file starts empty; a corrupt one is logged and
    /// replaced with an empty map.
    fn open(path: PathBuf, what: &'static str) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<u64, V>>(&content) {
                Ok(map) => {
                    tracing::info!(path = %path.display(), entries = map.len(), "Loaded {what}");
                    map
                },
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "The {what} file is corrupt, starting empty");
                    if let Err(e) = std::fs::write(&path, "{}") {
                        tracing::error!(path = %path.display(), error = %e, "Could not reset the {what} file");
                    }
                    HashMap::new()
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "The {what} file is not readable");
                HashMap::new()
            },
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    async fn save(&self, entries: &HashMap<u64, V>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// Settings persisted as a `{guild_id: settings}` JSON file.
pub struct JsonFileStore {
    file: JsonMapFile<GuildSettings>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonMapFile::open(path.into(), "guild settings"),
        }
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get(&self, guild: GuildId) -> GuildSettings {
        self.file
            .entries
            .read()
            .await
            .get(&guild)
            .cloned()
            .unwrap_or_default()
    }

    async fn update(&self, guild: GuildId, edit: SettingsEdit) -> Result<GuildSettings, StoreError> {
        let mut map = self.file.entries.write().await;
        let entry = map.entry(guild).or_default();
        edit(&mut *entry);
        let saved = entry.clone();
        self.file.save(&map).await?;
        Ok(saved)
    }
}

/// Notes persisted as a `{recipient_id: [note, ...]}` JSON file, oldest
/// first.
pub struct JsonFileNotes {
    file: JsonMapFile<Vec<Note>>,
}

impl JsonFileNotes {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonMapFile::open(path.into(), "notes"),
        }
    }
}

#[async_trait]
impl NotesStore for JsonFileNotes {
    async fn list(&self, recipient: UserId, limit: usize) -> NotesPage {
        newest_first(self.file.entries.read().await.get(&recipient), limit)
    }

    async fn append(&self, recipient: UserId, note: Note) -> Result<usize, StoreError> {
        let mut map = self.file.entries.write().await;
        let notes = map.entry(recipient).or_default();
        notes.push(note);
        let count = notes.len();
        self.file.save(&map).await?;
        Ok(count)
    }

    async fn clear(&self, recipient: UserId) -> Result<usize, StoreError> {
        let mut map = self.file.entries.write().await;
        let Some(notes) = map.remove(&recipient) else {
            return Ok(0);
        };
        self.file.save(&map).await?;
        Ok(notes.len())
    }
}
