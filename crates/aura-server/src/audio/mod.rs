pub mod pipeline;
pub mod queue;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};

use aura_core::track::Track;

use crate::config::AudioConfig;
use crate::media::{ResolveError, TrackResolver};
use crate::store::{GuildSettings, SettingsStore};
use crate::voice::{VoiceError, VoiceGateway};
use pipeline::{AudioCommand, PipelineContext, PipelineEvent, PipelineMap, PlaybackState, PlaybackStatus};
use queue::{Enqueued, QueueSnapshot};

pub type GuildId = u64;
pub type ChannelId = u64;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no results for {0:?}")]
    NothingFound(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("the queue is full")]
    QueueFull,
    #[error("nothing is playing")]
    NothingPlaying,
    #[error("nothing to skip")]
    NothingToSkip,
    #[error("playback is already paused")]
    AlreadyPaused,
    #[error("playback is not paused")]
    NotPaused,
    #[error("need at least two queued tracks to shuffle")]
    NothingToShuffle,
    #[error("volume must be between 1 and 100, got {0}")]
    InvalidVolume(i64),
    #[error("voice connection failed: {0}")]
    Voice(#[from] VoiceError),
    #[error("audio for guild {0} is not running")]
    PipelineGone(GuildId),
}

/// What a play request added to the queue.
#[derive(Debug, Clone, Serialize)]
pub struct PlayResult {
    pub titles: Vec<String>,
    pub enqueued: Enqueued,
}

/// Owns one playback pipeline per guild. Only `play` spawns one; a pipeline
/// leaves the map again once it stops.
pub struct AudioManager {
    pipelines: PipelineMap,
    resolver: TrackResolver,
    ctx: PipelineContext,
    default_volume: f32,
}

impl AudioManager {
    pub fn new(
        resolver: TrackResolver,
        voice: Arc<dyn VoiceGateway>,
        settings: Arc<dyn SettingsStore>,
        config: &AudioConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let pipelines = PipelineMap::default();
        Self {
            pipelines: Arc::clone(&pipelines),
            ctx: PipelineContext {
                index: resolver.index(),
                voice,
                settings,
                events,
                registry: pipelines,
                idle_timeout: config.idle_disconnect(),
                max_queue_len: config.max_queue_len,
                queue_preview: config.queue_preview,
            },
            resolver,
            default_volume: config.default_volume,
        }
    }

    /// Pipeline transitions for every guild.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.ctx.events.subscribe()
    }

    /// Guilds with a running pipeline.
    pub async fn guild_count(&self) -> usize {
        self.pipelines.lock().await.len()
    }

    async fn stored_volume(&self, guild: GuildId) -> f32 {
        self.ctx
            .settings
            .get(guild)
            .await
            .volume
            .unwrap_or(self.default_volume)
    }

    /// Send to the guild's pipeline, spawning one if none is running.
    async fn request_or_spawn<T>(
        &self,
        guild: GuildId,
        make: impl FnOnce(oneshot::Sender<T>) -> AudioCommand,
    ) -> Result<T, AudioError> {
        let volume = self.stored_volume(guild).await;
        let (reply, rx) = oneshot::channel();
        let cmd = make(reply);
        {
            let mut pipelines = self.pipelines.lock().await;
            let unsent = match pipelines.get(&guild) {
                Some(tx) => tx.send(cmd).err().map(|e| e.0),
                None => Some(cmd),
            };
            if let Some(cmd) = unsent {
                let (tx, _task) = pipeline::spawn_pipeline(guild, volume, self.ctx.clone());
                tracing::info!(guild, volume, "Audio pipeline spawned");
                tx.send(cmd).map_err(|_| AudioError::PipelineGone(guild))?;
                pipelines.insert(guild, tx);
            }
        }
        rx.await.map_err(|_| AudioError::PipelineGone(guild))
    }

    /// Send to the guild's pipeline if one is running.
    async fn request_running<T>(
        &self,
        guild: GuildId,
        make: impl FnOnce(oneshot::Sender<T>) -> AudioCommand,
    ) -> Result<Option<T>, AudioError> {
        let (reply, rx) = oneshot::channel();
        {
            let mut pipelines = self.pipelines.lock().await;
            let Some(tx) = pipelines.get(&guild) else {
                return Ok(None);
            };
            if tx.send(make(reply)).is_err() {
                pipelines.remove(&guild);
                return Ok(None);
            }
        }
        rx.await.map(Some).map_err(|_| AudioError::PipelineGone(guild))
    }

    /// Resolve `query` and enqueue every hit in order. Resolution happens
    /// before the guild's pipeline is involved, so a slow lookup never holds
    /// up its other commands.
    pub async fn play(&self, guild: GuildId, channel: ChannelId, query: &str) -> Result<PlayResult, AudioError> {
        let tracks = self.resolver.resolve(query).await?;
        if tracks.is_empty() {
            return Err(AudioError::NothingFound(query.trim().to_string()));
        }
        let titles: Vec<String> = tracks.iter().map(|t| t.title.clone()).collect();
        let enqueued = self
            .request_or_spawn(guild, |reply| AudioCommand::Play {
                channel,
                tracks,
                reply,
            })
            .await??;
        Ok(PlayResult {
            titles: titles.into_iter().take(enqueued.accepted).collect(),
            enqueued,
        })
    }

    pub async fn pause(&self, guild: GuildId) -> Result<(), AudioError> {
        self.request_running(guild, |reply| AudioCommand::Pause { reply })
            .await?
            .unwrap_or(Err(AudioError::NothingPlaying))
    }

    pub async fn resume(&self, guild: GuildId) -> Result<(), AudioError> {
        self.request_running(guild, |reply| AudioCommand::Resume { reply })
            .await?
            .unwrap_or(Err(AudioError::NothingPlaying))
    }

    pub async fn skip(&self, guild: GuildId) -> Result<Option<Track>, AudioError> {
        self.request_running(guild, |reply| AudioCommand::Skip { reply })
            .await?
            .unwrap_or(Err(AudioError::NothingToSkip))
    }

    /// Clear the queue, end the stream and leave the channel.
    pub async fn stop(&self, guild: GuildId) -> Result<(), AudioError> {
        self.request_running(guild, |reply| AudioCommand::Stop { reply })
            .await?;
        Ok(())
    }

    pub async fn shuffle(&self, guild: GuildId) -> Result<usize, AudioError> {
        self.request_running(guild, |reply| AudioCommand::Shuffle { reply })
            .await?
            .unwrap_or(Err(AudioError::NothingToShuffle))
    }

    /// Validate and store the volume. A running pipeline applies it to the
    /// live stream as well.
    pub async fn set_volume(&self, guild: GuildId, percent: i64) -> Result<f32, AudioError> {
        let volume = pipeline::volume_from_percent(percent)?;
        if let Some(result) = self
            .request_running(guild, |reply| AudioCommand::SetVolume { percent, reply })
            .await?
        {
            return result;
        }
        let saved = self
            .ctx
            .settings
            .update(
                guild,
                Box::new(move |settings: &mut GuildSettings| settings.volume = Some(volume)),
            )
            .await;
        if let Err(e) = saved {
            tracing::warn!(guild, error = %e, "Could not save volume");
        }
        Ok(volume)
    }

    /// Hand an already stored volume to the running pipeline, if any.
    pub async fn apply_volume(&self, guild: GuildId, volume: f32) -> Result<bool, AudioError> {
        let applied = self
            .request_running(guild, |reply| AudioCommand::ApplyVolume { volume, reply })
            .await?;
        Ok(applied.is_some())
    }

    pub async fn status(&self, guild: GuildId) -> Result<PlaybackStatus, AudioError> {
        if let Some(status) = self
            .request_running(guild, |reply| AudioCommand::Status { reply })
            .await?
        {
            return Ok(status);
        }
        Ok(PlaybackStatus {
            state: PlaybackState::Idle,
            now_playing: None,
            channel: None,
            volume: self.stored_volume(guild).await,
            queue: QueueSnapshot {
                titles: Vec::new(),
                total: 0,
            },
        })
    }
}
