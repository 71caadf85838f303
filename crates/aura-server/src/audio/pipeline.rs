use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use aura_core::track::{Track, TrackInfo};

use super::queue::{Enqueued, QueueSnapshot, TrackQueue};
use super::{AudioError, ChannelId, GuildId};
use crate::media::{MediaIndex, ResolveError};
use crate::store::{GuildSettings, SettingsStore};
use crate::voice::{StreamHandle, VoiceGateway};

pub const MIN_VOLUME: f32 = 0.01;
pub const MAX_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Resolving,
    Playing,
    Paused,
    /// Disconnected by stop, leave or the idle timer. The pipeline retires
    /// and the next play starts a fresh activation.
    Stopped,
}

/// Published on every pipeline transition the "now playing" surface cares
/// about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    NowPlaying { guild: GuildId, track: Track },
    TrackFailed { guild: GuildId, track: Track, error: String },
    QueueFinished { guild: GuildId },
    Disconnected { guild: GuildId },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub now_playing: Option<Track>,
    pub channel: Option<ChannelId>,
    pub volume: f32,
    pub queue: QueueSnapshot,
}

/// Map a 1-100 percentage onto the stored volume range.
pub fn volume_from_percent(percent: i64) -> Result<f32, AudioError> {
    if !(1..=100).contains(&percent) {
        return Err(AudioError::InvalidVolume(percent));
    }
    Ok((percent as f32 / 100.0).clamp(MIN_VOLUME, MAX_VOLUME))
}

type Reply<T> = oneshot::Sender<Result<T, AudioError>>;

#[derive(Debug)]
pub enum AudioCommand {
    Play {
        channel: ChannelId,
        tracks: Vec<TrackInfo>,
        reply: Reply<Enqueued>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Skip {
        reply: Reply<Option<Track>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Shuffle {
        reply: Reply<usize>,
    },
    SetVolume {
        percent: i64,
        reply: Reply<f32>,
    },
    /// Use an already stored volume for the rest of this activation.
    ApplyVolume {
        volume: f32,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<PlaybackStatus>,
    },
}

/// Command senders of the running pipelines. Commands are only queued while
/// this lock is held, which lets a stopping pipeline retire without losing
/// one.
pub type PipelineMap = Arc<Mutex<HashMap<GuildId, mpsc::UnboundedSender<AudioCommand>>>>;

/// Messages the pipeline sends itself from spawned helper tasks.
enum Internal {
    Resolved {
        generation: u64,
        track: Track,
        result: Result<String, ResolveError>,
    },
    StreamEnded {
        generation: u64,
    },
}

/// Shared collaborators every guild pipeline is built from.
#[derive(Clone)]
pub struct PipelineContext {
    pub index: Arc<dyn MediaIndex>,
    pub voice: Arc<dyn VoiceGateway>,
    pub settings: Arc<dyn SettingsStore>,
    pub events: broadcast::Sender<PipelineEvent>,
    pub registry: PipelineMap,
    pub idle_timeout: Duration,
    pub max_queue_len: usize,
    pub queue_preview: usize,
}

struct GuildPipeline {
    guild: GuildId,
    ctx: PipelineContext,
    queue: TrackQueue,
    state: PlaybackState,
    current: Option<Track>,
    handle: Option<StreamHandle>,
    channel: Option<ChannelId>,
    volume: f32,
    /// Bumped whenever the current track is abandoned. Results tagged with an
    /// older generation are ignored.
    generation: u64,
    /// The one outstanding stream lookup, if any.
    resolving: Option<JoinHandle<()>>,
    idle_deadline: Option<Instant>,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

/// Spawn the playback task for one guild. The caller registers the returned
/// sender in `ctx.registry`.
pub fn spawn_pipeline(
    guild: GuildId,
    volume: f32,
    ctx: PipelineContext,
) -> (mpsc::UnboundedSender<AudioCommand>, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();
    let pipeline = GuildPipeline {
        guild,
        queue: TrackQueue::new(ctx.max_queue_len),
        ctx,
        state: PlaybackState::Idle,
        current: None,
        handle: None,
        channel: None,
        volume: volume.clamp(MIN_VOLUME, MAX_VOLUME),
        generation: 0,
        resolving: None,
        idle_deadline: None,
        internal_tx,
    };
    let handle = tokio::spawn(pipeline.run(cmd_rx, internal_rx));
    (cmd_tx, handle)
}

async fn idle_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl GuildPipeline {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<AudioCommand>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        tracing::debug!(guild = self.guild, "Audio pipeline started");
        loop {
            let mut stop_ack = None;
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => stop_ack = self.handle_command(cmd).await,
                    None => break,
                },
                Some(msg) = internal.recv() => self.handle_internal(msg).await,
                () = idle_elapsed(self.idle_deadline) => self.idle_timeout().await,
            }
            let retired = self.state == PlaybackState::Stopped && self.retire(&mut commands).await;
            // Acknowledged after retiring, so a caller that saw the stop
            // finish also sees the guild gone.
            if let Some(ack) = stop_ack {
                let _ = ack.send(());
            }
            if retired {
                break;
            }
        }
        self.shutdown().await;
        tracing::debug!(guild = self.guild, "Audio pipeline exited");
    }

    /// Drop out of the registry. Fails while commands are still queued.
    async fn retire(&self, commands: &mut mpsc::UnboundedReceiver<AudioCommand>) -> bool {
        let mut registry = self.ctx.registry.lock().await;
        if !commands.is_empty() {
            return false;
        }
        registry.remove(&self.guild);
        commands.close();
        true
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.ctx.events.send(event);
    }

    /// Handle one command. A stop hands its acknowledgement back to the run
    /// loop.
    async fn handle_command(&mut self, cmd: AudioCommand) -> Option<oneshot::Sender<()>> {
        match cmd {
            AudioCommand::Play {
                channel,
                tracks,
                reply,
            } => {
                let _ = reply.send(self.play(channel, tracks).await);
            },
            AudioCommand::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            },
            AudioCommand::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            },
            AudioCommand::Skip { reply } => {
                let _ = reply.send(self.skip().await);
            },
            AudioCommand::Stop { reply } => {
                self.stop().await;
                return Some(reply);
            },
            AudioCommand::Shuffle { reply } => {
                let shuffled = self.queue.shuffle(&mut rand::rng());
                let result = if shuffled {
                    Ok(self.queue.len())
                } else {
                    Err(AudioError::NothingToShuffle)
                };
                let _ = reply.send(result);
            },
            AudioCommand::SetVolume { percent, reply } => {
                let _ = reply.send(self.set_volume(percent).await);
            },
            AudioCommand::ApplyVolume { volume, reply } => {
                self.apply_volume(volume.clamp(MIN_VOLUME, MAX_VOLUME)).await;
                let _ = reply.send(());
            },
            AudioCommand::Status { reply } => {
                let _ = reply.send(self.status());
            },
        }
        None
    }

    async fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::Resolved {
                generation,
                track,
                result,
            } => {
                if generation != self.generation {
                    tracing::debug!(guild = self.guild, title = %track.title, "Dropping stale resolution");
                    return;
                }
                self.resolving = None;
                match result {
                    Ok(url) => self.start_stream(track, &url).await,
                    Err(e) => self.track_failed(track, e.to_string()).await,
                }
            },
            Internal::StreamEnded { generation } => {
                if generation != self.generation {
                    return;
                }
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
                    tracing::debug!(guild = self.guild, "Stream ended");
                    self.advance().await;
                }
            },
        }
    }

    async fn play(&mut self, channel: ChannelId, tracks: Vec<TrackInfo>) -> Result<Enqueued, AudioError> {
        if self.channel != Some(channel) {
            self.ctx.voice.connect(self.guild, channel).await?;
            self.channel = Some(channel);
        }
        let added = self.queue.enqueue_all(tracks);
        if added.rejected > 0 {
            tracing::warn!(guild = self.guild, rejected = added.rejected, "Queue full, tracks dropped");
        }
        if added.accepted == 0 {
            return Err(AudioError::QueueFull);
        }
        tracing::info!(guild = self.guild, added = added.accepted, queued = self.queue.len(), "Tracks enqueued");
        self.idle_deadline = None;
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Stopped) {
            self.advance().await;
        }
        Ok(added)
    }

    /// Abort the outstanding stream lookup and wait until it is gone. A
    /// yt-dlp child is killed when its future drops.
    async fn cancel_resolution(&mut self) {
        if let Some(task) = self.resolving.take() {
            task.abort();
            let _ = task.await;
        }
    }

    /// Abandon the current track and move on to the next queued one, or go
    /// idle with the disconnect timer armed.
    async fn advance(&mut self) {
        self.generation += 1;
        self.handle = None;
        self.cancel_resolution().await;
        match self.queue.dequeue_next() {
            Some(track) => {
                self.state = PlaybackState::Resolving;
                self.current = Some(track.clone());
                self.idle_deadline = None;
                let index = Arc::clone(&self.ctx.index);
                let tx = self.internal_tx.clone();
                let generation = self.generation;
                self.resolving = Some(tokio::spawn(async move {
                    let result = index.stream_source(&track.source).await;
                    let _ = tx.send(Internal::Resolved {
                        generation,
                        track,
                        result,
                    });
                }));
            },
            None => {
                self.state = PlaybackState::Idle;
                self.current = None;
                self.idle_deadline = Some(Instant::now() + self.ctx.idle_timeout);
                tracing::info!(guild = self.guild, "Queue finished");
                self.emit(PipelineEvent::QueueFinished { guild: self.guild });
            },
        }
    }

    async fn start_stream(&mut self, track: Track, url: &str) {
        let (done_tx, done_rx) = oneshot::channel();
        match self
            .ctx
            .voice
            .start_stream(self.guild, url, self.volume, done_tx)
            .await
        {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = PlaybackState::Playing;
                self.current = Some(track.clone());
                tracing::info!(guild = self.guild, title = %track.title, "Now playing");
                self.emit(PipelineEvent::NowPlaying {
                    guild: self.guild,
                    track,
                });
                let tx = self.internal_tx.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    // A dropped sender also means the stream is over.
                    let _ = done_rx.await;
                    let _ = tx.send(Internal::StreamEnded { generation });
                });
            },
            Err(e) => self.track_failed(track, e.to_string()).await,
        }
    }

    async fn track_failed(&mut self, track: Track, error: String) {
        tracing::warn!(guild = self.guild, title = %track.title, error = %error, "Track failed");
        self.emit(PipelineEvent::TrackFailed {
            guild: self.guild,
            track,
            error,
        });
        self.advance().await;
    }

    async fn pause(&mut self) -> Result<(), AudioError> {
        match (self.state, self.handle) {
            (PlaybackState::Playing, Some(handle)) => {
                self.ctx.voice.pause(handle).await?;
                self.state = PlaybackState::Paused;
                Ok(())
            },
            (PlaybackState::Paused, _) => Err(AudioError::AlreadyPaused),
            _ => Err(AudioError::NothingPlaying),
        }
    }

    async fn resume(&mut self) -> Result<(), AudioError> {
        match (self.state, self.handle) {
            (PlaybackState::Paused, Some(handle)) => {
                self.ctx.voice.resume(handle).await?;
                self.state = PlaybackState::Playing;
                Ok(())
            },
            (PlaybackState::Playing, _) => Err(AudioError::NotPaused),
            _ => Err(AudioError::NothingPlaying),
        }
    }

    /// Skipping a playing stream only stops it; the continuation comes from
    /// its completion.
    async fn skip(&mut self) -> Result<Option<Track>, AudioError> {
        match self.state {
            PlaybackState::Resolving => {
                let skipped = self.current.clone();
                self.advance().await;
                Ok(skipped)
            },
            PlaybackState::Playing | PlaybackState::Paused => {
                if let Some(handle) = self.handle.take() {
                    self.ctx.voice.stop(handle).await;
                }
                Ok(self.current.clone())
            },
            PlaybackState::Idle | PlaybackState::Stopped => Err(AudioError::NothingToSkip),
        }
    }

    async fn stop(&mut self) {
        self.generation += 1;
        self.cancel_resolution().await;
        self.queue.clear();
        self.current = None;
        self.idle_deadline = None;
        if let Some(handle) = self.handle.take() {
            self.ctx.voice.stop(handle).await;
        }
        self.state = PlaybackState::Stopped;
        self.disconnect().await;
    }

    async fn idle_timeout(&mut self) {
        self.idle_deadline = None;
        if self.state != PlaybackState::Idle {
            return;
        }
        tracing::info!(guild = self.guild, "Idle timeout reached");
        self.current = None;
        self.state = PlaybackState::Stopped;
        self.disconnect().await;
    }

    async fn disconnect(&mut self) {
        if self.channel.take().is_some() {
            self.ctx.voice.disconnect(self.guild).await;
            tracing::info!(guild = self.guild, "Disconnected from voice");
            self.emit(PipelineEvent::Disconnected { guild: self.guild });
        }
    }

    /// Use `volume` for the current stream and every later one.
    async fn apply_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(handle) = self.handle
            && let Err(e) = self.ctx.voice.set_volume(handle, volume).await
        {
            tracing::warn!(guild = self.guild, error = %e, "Could not change stream volume");
        }
    }

    async fn set_volume(&mut self, percent: i64) -> Result<f32, AudioError> {
        let volume = volume_from_percent(percent)?;
        self.apply_volume(volume).await;
        let saved = self
            .ctx
            .settings
            .update(
                self.guild,
                Box::new(move |settings: &mut GuildSettings| settings.volume = Some(volume)),
            )
            .await;
        if let Err(e) = saved {
            tracing::warn!(guild = self.guild, error = %e, "Could not save volume");
        }
        Ok(volume)
    }

    fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            now_playing: self.current.clone(),
            channel: self.channel,
            volume: self.volume,
            queue: self.queue.snapshot(self.ctx.queue_preview),
        }
    }

    async fn shutdown(&mut self) {
        if self.channel.is_some() || self.resolving.is_some() {
            self.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryStore;
    use crate::voice::{Completion, VoiceError};
    use aura_core::track::SourceRef;

    /// Index where sources starting with "bad" fail and sources starting
    /// with "slow" take ten seconds.
    struct FakeIndex;

    #[async_trait]
    impl MediaIndex for FakeIndex {
        async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
            Ok(vec![TrackInfo::new(query, query)])
        }

        async fn resolve_playlist(&self, url: &str) -> Result<Vec<TrackInfo>, ResolveError> {
            Ok(vec![TrackInfo::new(url, url)])
        }

        async fn stream_source(&self, source: &SourceRef) -> Result<String, ResolveError> {
            if source.0.starts_with("bad") {
                return Err(ResolveError::Failed("unavailable".into()));
            }
            if source.0.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok(format!("stream:{}", source.0))
        }
    }

    /// Slow index that records how many lookups run at once.
    #[derive(Default)]
    struct CountingIndex {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MediaIndex for CountingIndex {
        async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
            Ok(vec![TrackInfo::new(query, query)])
        }

        async fn resolve_playlist(&self, url: &str) -> Result<Vec<TrackInfo>, ResolveError> {
            Ok(vec![TrackInfo::new(url, url)])
        }

        async fn stream_source(&self, source: &SourceRef) -> Result<String, ResolveError> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(format!("stream:{}", source.0))
        }
    }

    #[derive(Default)]
    struct FakeVoice {
        started: StdMutex<Vec<String>>,
        live: StdMutex<Vec<(StreamHandle, Completion)>>,
        volumes: StdMutex<Vec<f32>>,
        disconnects: StdMutex<usize>,
    }

    impl FakeVoice {
        fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }

        /// End the most recent stream as if it ran out.
        fn finish(&self) {
            if let Some((_, done)) = self.live.lock().unwrap().pop() {
                let _ = done.send(());
            }
        }

        fn disconnects(&self) -> usize {
            *self.disconnects.lock().unwrap()
        }
    }

    #[async_trait]
    impl VoiceGateway for FakeVoice {
        async fn connect(&self, _guild: GuildId, _channel: ChannelId) -> Result<(), VoiceError> {
            Ok(())
        }

        async fn start_stream(
            &self,
            _guild: GuildId,
            stream_url: &str,
            volume: f32,
            completion: Completion,
        ) -> Result<StreamHandle, VoiceError> {
            let mut started = self.started.lock().unwrap();
            started.push(stream_url.to_string());
            let handle = StreamHandle(started.len() as u64);
            self.volumes.lock().unwrap().push(volume);
            self.live.lock().unwrap().push((handle, completion));
            Ok(handle)
        }

        async fn stop(&self, handle: StreamHandle) {
            let mut live = self.live.lock().unwrap();
            if let Some(pos) = live.iter().position(|(h, _)| *h == handle) {
                let (_, done) = live.remove(pos);
                let _ = done.send(());
            }
        }

        async fn set_volume(&self, _handle: StreamHandle, volume: f32) -> Result<(), VoiceError> {
            self.volumes.lock().unwrap().push(volume);
            Ok(())
        }

        async fn pause(&self, _handle: StreamHandle) -> Result<(), VoiceError> {
            Ok(())
        }

        async fn resume(&self, _handle: StreamHandle) -> Result<(), VoiceError> {
            Ok(())
        }

        async fn disconnect(&self, _guild: GuildId) {
            *self.disconnects.lock().unwrap() += 1;
        }
    }

    struct Harness {
        voice: Arc<FakeVoice>,
        settings: Arc<MemoryStore>,
        events: broadcast::Receiver<PipelineEvent>,
        commands: mpsc::UnboundedSender<AudioCommand>,
        registry: PipelineMap,
        task: JoinHandle<()>,
    }

    fn harness() -> Harness {
        harness_with(Arc::new(FakeIndex))
    }

    fn harness_with(index: Arc<dyn MediaIndex>) -> Harness {
        let voice = Arc::new(FakeVoice::default());
        let settings = Arc::new(MemoryStore::new());
        let (events_tx, events) = broadcast::channel(64);
        let ctx = PipelineContext {
            index,
            voice: Arc::clone(&voice) as Arc<dyn VoiceGateway>,
            settings: Arc::clone(&settings) as Arc<dyn SettingsStore>,
            events: events_tx,
            registry: PipelineMap::default(),
            idle_timeout: Duration::from_secs(180),
            max_queue_len: 500,
            queue_preview: 10,
        };
        let registry = Arc::clone(&ctx.registry);
        let (commands, task) = spawn_pipeline(1, 0.5, ctx);
        registry.try_lock().unwrap().insert(1, commands.clone());
        Harness {
            voice,
            settings,
            events,
            commands,
            registry,
            task,
        }
    }

    impl Harness {
        async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> AudioCommand) -> T {
            let (tx, rx) = oneshot::channel();
            self.commands.send(make(tx)).unwrap();
            rx.await.unwrap()
        }

        async fn play(&self, sources: &[&str]) -> Result<Enqueued, AudioError> {
            let tracks = sources.iter().map(|s| TrackInfo::new(*s, *s)).collect();
            self.request(|reply| AudioCommand::Play {
                channel: 10,
                tracks,
                reply,
            })
            .await
        }

        async fn next_event(&mut self) -> PipelineEvent {
            self.events.recv().await.unwrap()
        }

        async fn status(&self) -> PlaybackStatus {
            self.request(|reply| AudioCommand::Status { reply }).await
        }

        async fn retired(&self) -> bool {
            self.task.is_finished() && self.registry.lock().await.is_empty() && self.commands.is_closed()
        }
    }

    fn now_playing_source(event: &PipelineEvent) -> Option<&str> {
        match event {
            PipelineEvent::NowPlaying { track, .. } => Some(track.source.0.as_str()),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_track_is_skipped() {
        let mut h = harness();
        h.play(&["one", "bad-two", "three"]).await.unwrap();

        assert_eq!(now_playing_source(&h.next_event().await), Some("one"));
        h.voice.finish();
        assert!(matches!(
            h.next_event().await,
            PipelineEvent::TrackFailed { ref track, .. } if track.source.0 == "bad-two"
        ));
        assert_eq!(now_playing_source(&h.next_event().await), Some("three"));
        h.voice.finish();
        assert!(matches!(h.next_event().await, PipelineEvent::QueueFinished { .. }));

        assert_eq!(h.voice.started(), vec!["stream:one", "stream:three"]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_disconnect_fires_once_after_timeout() {
        let mut h = harness();
        h.play(&["one"]).await.unwrap();
        h.next_event().await;
        h.voice.finish();
        assert!(matches!(h.next_event().await, PipelineEvent::QueueFinished { .. }));
        let finished_at = Instant::now();

        assert!(matches!(h.next_event().await, PipelineEvent::Disconnected { .. }));
        let waited = finished_at.elapsed();
        assert!(waited >= Duration::from_secs(180), "disconnected after {waited:?}");
        assert!(waited < Duration::from_secs(181), "disconnected after {waited:?}");

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.voice.disconnects(), 1);
        assert!(h.retired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_while_idle_cancels_the_timer() {
        let mut h = harness();
        h.play(&["one"]).await.unwrap();
        h.next_event().await;
        h.voice.finish();
        h.next_event().await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        h.play(&["two"]).await.unwrap();
        assert_eq!(now_playing_source(&h.next_event().await), Some("two"));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.voice.disconnects(), 0);
        assert_eq!(h.status().await.state, PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_continues_exactly_once() {
        let mut h = harness();
        h.play(&["one", "two", "three"]).await.unwrap();
        h.next_event().await;

        let skipped = h.request(|reply| AudioCommand::Skip { reply }).await.unwrap();
        assert_eq!(skipped.map(|t| t.title), Some("one".to_string()));
        assert_eq!(now_playing_source(&h.next_event().await), Some("two"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.voice.started(), vec!["stream:one", "stream:two"]);
        let status = h.status().await;
        assert_eq!(status.queue.total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_during_resolution_drops_the_slow_track() {
        let mut h = harness();
        h.play(&["slow-one", "two"]).await.unwrap();
        assert_eq!(h.status().await.state, PlaybackState::Resolving);

        h.request(|reply| AudioCommand::Skip { reply }).await.unwrap();
        assert_eq!(now_playing_source(&h.next_event().await), Some("two"));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.voice.started(), vec!["stream:two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_with_nothing_playing() {
        let h = harness();
        let err = h.request(|reply| AudioCommand::Skip { reply }).await.unwrap_err();
        assert!(matches!(err, AudioError::NothingToSkip));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_and_disconnects_immediately() {
        let mut h = harness();
        h.play(&["one", "two", "three"]).await.unwrap();
        h.next_event().await;

        h.request(|reply| AudioCommand::Stop { reply }).await;
        assert!(h.registry.lock().await.is_empty());
        assert!(matches!(h.next_event().await, PipelineEvent::Disconnected { .. }));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.voice.started(), vec!["stream:one"]);
        assert_eq!(h.voice.disconnects(), 1);
        assert!(h.retired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeps_queued_commands() {
        let h = harness();
        h.play(&["slow-one"]).await.unwrap();

        let (stop_tx, stop_rx) = oneshot::channel();
        let (status_tx, status_rx) = oneshot::channel();
        {
            let _registry = h.registry.lock().await;
            h.commands.send(AudioCommand::Stop { reply: stop_tx }).unwrap();
            h.commands.send(AudioCommand::Status { reply: status_tx }).unwrap();
        }
        stop_rx.await.unwrap();
        let status = status_rx.await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);
        assert_eq!(status.queue.total, 0);
        assert!(status.now_playing.is_none());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.retired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_leave_one_lookup_in_flight() {
        let index = Arc::new(CountingIndex::default());
        let mut h = harness_with(Arc::clone(&index) as Arc<dyn MediaIndex>);
        h.play(&["a", "b", "c"]).await.unwrap();
        assert_eq!(h.status().await.state, PlaybackState::Resolving);

        h.request(|reply| AudioCommand::Skip { reply }).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        h.request(|reply| AudioCommand::Skip { reply }).await.unwrap();

        assert_eq!(now_playing_source(&h.next_event().await), Some("c"));
        assert_eq!(index.peak.load(Ordering::SeqCst), 1);
        assert_eq!(index.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(h.voice.started(), vec!["stream:c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_report_no_ops() {
        let mut h = harness();
        let err = h.request(|reply| AudioCommand::Pause { reply }).await.unwrap_err();
        assert!(matches!(err, AudioError::NothingPlaying));

        h.play(&["one"]).await.unwrap();
        h.next_event().await;
        h.request(|reply| AudioCommand::Pause { reply }).await.unwrap();
        let err = h.request(|reply| AudioCommand::Pause { reply }).await.unwrap_err();
        assert!(matches!(err, AudioError::AlreadyPaused));
        assert_eq!(h.status().await.state, PlaybackState::Paused);

        h.request(|reply| AudioCommand::Resume { reply }).await.unwrap();
        let err = h.request(|reply| AudioCommand::Resume { reply }).await.unwrap_err();
        assert!(matches!(err, AudioError::NotPaused));
    }

    #[tokio::test(start_paused = true)]
    async fn volume_applies_live_and_persists() {
        let mut h = harness();
        h.play(&["one"]).await.unwrap();
        h.next_event().await;

        let volume = h
            .request(|reply| AudioCommand::SetVolume { percent: 30, reply })
            .await
            .unwrap();
        assert!((volume - 0.3).abs() < f32::EPSILON);
        assert_eq!(*h.voice.volumes.lock().unwrap(), vec![0.5, volume]);
        assert_eq!(h.settings.get(1).await.volume, Some(volume));

        for bad in [0, 101, -5] {
            let err = h
                .request(|reply| AudioCommand::SetVolume { percent: bad, reply })
                .await
                .unwrap_err();
            assert!(matches!(err, AudioError::InvalidVolume(p) if p == bad));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shuffle_needs_two_waiting_tracks() {
        let mut h = harness();
        h.play(&["one", "two"]).await.unwrap();
        h.next_event().await;
        let err = h.request(|reply| AudioCommand::Shuffle { reply }).await.unwrap_err();
        assert!(matches!(err, AudioError::NothingToShuffle));

        h.play(&["three"]).await.unwrap();
        assert_eq!(h.request(|reply| AudioCommand::Shuffle { reply }).await.unwrap(), 2);
    }

    #[test]
    fn volume_percent_bounds() {
        assert!((volume_from_percent(1).unwrap() - MIN_VOLUME).abs() < f32::EPSILON);
        assert!((volume_from_percent(100).unwrap() - MAX_VOLUME).abs() < f32::EPSILON);
        assert!(volume_from_percent(0).is_err());
        assert!(volume_from_percent(250).is_err());
    }
}
