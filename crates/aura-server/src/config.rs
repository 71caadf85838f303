use std::time::Duration;

use serde::Deserialize;

use aura_core::game_trait::GameKind;

/// Top-level server configuration, loaded from `aura.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub games: GamesConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            games: GamesConfig::default(),
            audio: AudioConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Game session and challenge lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    /// JSON file with `ladder_words` and `hangman_words`.
    pub words_path: String,
    pub timeouts: GameTimeouts,
    pub challenge_timeout_secs: u64,
    /// How often the sweeper reclaims expired sessions and challenges.
    pub sweep_interval_secs: u64,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            words_path: "words.json".to_string(),
            timeouts: GameTimeouts::default(),
            challenge_timeout_secs: 60,
            sweep_interval_secs: 10,
        }
    }
}

impl GamesConfig {
    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }
}

/// Inactivity timeout per game, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameTimeouts {
    pub connect_four: u64,
    pub tic_tac_toe: u64,
    pub word_ladder: u64,
    pub hangman: u64,
    pub anagram: u64,
    pub guess_number: u64,
}

impl Default for GameTimeouts {
    fn default() -> Self {
        Self {
            connect_four: 300,
            tic_tac_toe: 300,
            word_ladder: 300,
            hangman: 300,
            anagram: 120,
            guess_number: 180,
        }
    }
}

impl GameTimeouts {
    pub fn for_kind(&self, kind: GameKind) -> Duration {
        let secs = match kind {
            GameKind::ConnectFour => self.connect_four,
            GameKind::TicTacToe => self.tic_tac_toe,
            GameKind::WordLadder => self.word_ladder,
            GameKind::Hangman => self.hangman,
            GameKind::Anagram => self.anagram,
            GameKind::GuessNumber => self.guess_number,
        };
        Duration::from_secs(secs)
    }
}

/// Music playback defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Seconds with an empty queue before leaving the voice channel.
    pub idle_disconnect_secs: u64,
    /// Volume for guilds that never set one, in (0, 1].
    pub default_volume: f32,
    pub max_queue_len: usize,
    /// Entries shown by the queue listing.
    pub queue_preview: usize,
    pub ytdlp_path: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            idle_disconnect_secs: 180,
            default_volume: 0.5,
            max_queue_len: 500,
            queue_preview: 10,
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

impl AudioConfig {
    pub fn idle_disconnect(&self) -> Duration {
        Duration::from_secs(self.idle_disconnect_secs)
    }
}

/// Persistence of per-guild settings and private notes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file for guild settings. Without one, settings live in memory.
    pub settings_path: Option<String>,
    /// JSON file for private notes. Without one, notes live in memory.
    pub notes_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: Some("guild_settings.json".to_string()),
            notes_path: Some("secret_notes.json".to_string()),
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.games.sweep_interval_secs == 0 {
            tracing::error!("games.sweep_interval_secs must be > 0");
            std::process::exit(1);
        }
        if self.games.challenge_timeout_secs == 0 {
            tracing::error!("games.challenge_timeout_secs must be > 0");
            std::process::exit(1);
        }
        for kind in GameKind::ALL {
            if self.games.timeouts.for_kind(kind).is_zero() {
                tracing::error!(game = %kind, "games.timeouts entries must be > 0");
                std::process::exit(1);
            }
        }

        if !(0.01..=1.0).contains(&self.audio.default_volume) {
            tracing::error!(
                volume = self.audio.default_volume,
                "audio.default_volume must be within 0.01..=1.0"
            );
            std::process::exit(1);
        }
        if self.audio.max_queue_len == 0 {
            tracing::error!("audio.max_queue_len must be > 0");
            std::process::exit(1);
        }
        if self.audio.queue_preview == 0 {
            tracing::error!("audio.queue_preview must be > 0");
            std::process::exit(1);
        }
        if self.audio.idle_disconnect_secs == 0 {
            tracing::warn!("audio.idle_disconnect_secs is 0, voice leaves as soon as the queue ends");
        }

        if self.storage.settings_path.is_none() {
            tracing::warn!("No storage.settings_path, guild settings will not survive a restart");
        }
        if self.storage.notes_path.is_none() {
            tracing::warn!("No storage.notes_path, notes will not survive a restart");
        }
    }

    /// Load config from `aura.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("aura.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from aura.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse aura.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No aura.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("AURA_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(path) = std::env::var("AURA_WORDS_PATH")
            && !path.is_empty()
        {
            config.games.words_path = path;
        }
        if let Ok(path) = std::env::var("AURA_SETTINGS_PATH")
            && !path.is_empty()
        {
            config.storage.settings_path = Some(path);
        }
        if let Ok(path) = std::env::var("AURA_NOTES_PATH")
            && !path.is_empty()
        {
            config.storage.notes_path = Some(path);
        }
        if let Ok(path) = std::env::var("AURA_YTDLP_PATH")
            && !path.is_empty()
        {
            config.audio.ytdlp_path = path;
        }
        if let Ok(val) = std::env::var("AURA_IDLE_DISCONNECT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.audio.idle_disconnect_secs = n;
        }

        config
    }
}
