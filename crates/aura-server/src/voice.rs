use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, oneshot};

use crate::audio::{ChannelId, GuildId};

/// Identifies one stream started on a voice connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StreamHandle(pub u64);

/// Signalled once when a stream ends, whether it ran out or was stopped.
/// Dropping it counts as the end of the stream.
pub type Completion = oneshot::Sender<()>;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error("could not join voice channel {0}")]
    Connect(ChannelId),
    #[error("stream failed: {0}")]
    Stream(String),
    #[error("unknown stream {0:?}")]
    UnknownStream(StreamHandle),
}

/// Voice connection of the chat platform.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Join `channel`, moving there if already connected elsewhere.
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<(), VoiceError>;

    /// Start streaming `stream_url`. `completion` fires exactly once, when
    /// the stream ends or is stopped.
    async fn start_stream(
        &self,
        guild: GuildId,
        stream_url: &str,
        volume: f32,
        completion: Completion,
    ) -> Result<StreamHandle, VoiceError>;

    async fn stop(&self, handle: StreamHandle);

    async fn set_volume(&self, handle: StreamHandle, volume: f32) -> Result<(), VoiceError>;

    async fn pause(&self, handle: StreamHandle) -> Result<(), VoiceError>;

    async fn resume(&self, handle: StreamHandle) -> Result<(), VoiceError>;

    /// Leave the voice channel, ending any stream still running.
    async fn disconnect(&self, guild: GuildId);
}

struct LoggedStream {
    guild: GuildId,
    completion: Completion,
}

/// Voice backend for running without a platform adapter. Every call is
/// logged; streams only end when stopped or disconnected.
#[derive(Default)]
pub struct LoggingVoice {
    next_handle: AtomicU64,
    channels: Mutex<HashMap<GuildId, ChannelId>>,
    streams: Mutex<HashMap<StreamHandle, LoggedStream>>,
}

impl LoggingVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn channel(&self, guild: GuildId) -> Option<ChannelId> {
        self.channels.lock().await.get(&guild).copied()
    }

    pub async fn active_streams(&self) -> usize {
        self.streams.lock().await.len()
    }
}

#[async_trait]
impl VoiceGateway for LoggingVoice {
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<(), VoiceError> {
        let previous = self.channels.lock().await.insert(guild, channel);
        match previous {
            Some(old) if old != channel => {
                tracing::info!(guild, from = old, to = channel, "Moved voice channel");
            },
            Some(_) => {},
            None => tracing::info!(guild, channel, "Joined voice channel"),
        }
        Ok(())
    }

    async fn start_stream(
        &self,
        guild: GuildId,
        stream_url: &str,
        volume: f32,
        completion: Completion,
    ) -> Result<StreamHandle, VoiceError> {
        if !self.channels.lock().await.contains_key(&guild) {
            return Err(VoiceError::NotConnected);
        }
        let handle = StreamHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.streams
            .lock()
            .await
            .insert(handle, LoggedStream { guild, completion });
        tracing::info!(guild, ?handle, url = stream_url, volume, "Stream started");
        Ok(handle)
    }

    async fn stop(&self, handle: StreamHandle) {
        if let Some(stream) = self.streams.lock().await.remove(&handle) {
            tracing::info!(guild = stream.guild, ?handle, "Stream stopped");
            let _ = stream.completion.send(());
        }
    }

    async fn set_volume(&self, handle: StreamHandle, volume: f32) -> Result<(), VoiceError> {
        if !self.streams.lock().await.contains_key(&handle) {
            return Err(VoiceError::UnknownStream(handle));
        }
        tracing::info!(?handle, volume, "Stream volume changed");
        Ok(())
    }

    async fn pause(&self, handle: StreamHandle) -> Result<(), VoiceError> {
        if !self.streams.lock().await.contains_key(&handle) {
            return Err(VoiceError::UnknownStream(handle));
        }
        tracing::info!(?handle, "Stream paused");
        Ok(())
    }

    async fn resume(&self, handle: StreamHandle) -> Result<(), VoiceError> {
        if !self.streams.lock().await.contains_key(&handle) {
            return Err(VoiceError::UnknownStream(handle));
        }
        tracing::info!(?handle, "Stream resumed");
        Ok(())
    }

    async fn disconnect(&self, guild: GuildId) {
        let mut streams = self.streams.lock().await;
        let ended: Vec<StreamHandle> = streams
            .iter()
            .filter(|(_, s)| s.guild == guild)
            .map(|(h, _)| *h)
            .collect();
        for handle in ended {
            if let Some(stream) = streams.remove(&handle) {
                let _ = stream.completion.send(());
            }
        }
        drop(streams);
        if self.channels.lock().await.remove(&guild).is_some() {
            tracing::info!(guild, "Left voice channel");
        }
    }
}
