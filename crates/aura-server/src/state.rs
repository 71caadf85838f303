use std::path::Path;
use std::sync::Arc;

use aura_core::words::WordBank;

use crate::audio::AudioManager;
use crate::challenges::ChallengeBook;
use crate::config::ServerConfig;
use crate::game_registry::GameRegistry;
use crate::media::{MediaIndex, TrackResolver, YtDlpIndex};
use crate::sessions::SessionRegistry;
use crate::store::{JsonFileNotes, JsonFileStore, MemoryNotes, MemoryStore, NotesStore, SettingsStore};
use crate::voice::{LoggingVoice, VoiceGateway};

/// External services the engine talks to.
pub struct Collaborators {
    pub media: Arc<dyn MediaIndex>,
    pub voice: Arc<dyn VoiceGateway>,
    pub settings: Arc<dyn SettingsStore>,
    pub notes: Arc<dyn NotesStore>,
    pub words: WordBank,
}

impl Collaborators {
    /// The shipped implementations, configured from `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        let settings: Arc<dyn SettingsStore> = match &config.storage.settings_path {
            Some(path) => Arc::new(JsonFileStore::open(path)),
            None => Arc::new(MemoryStore::new()),
        };
        let notes: Arc<dyn NotesStore> = match &config.storage.notes_path {
            Some(path) => Arc::new(JsonFileNotes::open(path)),
            None => Arc::new(MemoryNotes::new()),
        };
        Self {
            media: Arc::new(YtDlpIndex::new(&config.audio.ytdlp_path)),
            voice: Arc::new(LoggingVoice::new()),
            settings,
            notes,
            words: WordBank::load(Path::new(&config.games.words_path)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub challenges: Arc<ChallengeBook>,
    pub game_registry: Arc<GameRegistry>,
    pub audio: Arc<AudioManager>,
    pub settings: Arc<dyn SettingsStore>,
    pub notes: Arc<dyn NotesStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, collaborators: Collaborators) -> Self {
        let game_registry = Arc::new(GameRegistry::new());
        let sessions = SessionRegistry::new(
            Arc::clone(&game_registry),
            Arc::new(collaborators.words),
            config.games.timeouts.clone(),
        );
        let audio = AudioManager::new(
            TrackResolver::new(collaborators.media),
            collaborators.voice,
            Arc::clone(&collaborators.settings),
            &config.audio,
        );
        Self {
            sessions: Arc::new(sessions),
            challenges: Arc::new(ChallengeBook::new(config.games.challenge_timeout())),
            game_registry,
            audio: Arc::new(audio),
            settings: collaborators.settings,
            notes: collaborators.notes,
            config: Arc::new(config),
        }
    }
}
