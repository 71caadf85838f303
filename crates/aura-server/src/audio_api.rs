use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use aura_core::track::Track;

use crate::audio::pipeline::PlaybackStatus;
use crate::audio::{ChannelId, GuildId, PlayResult};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::GuildSettings;

#[derive(Debug, Deserialize)]
pub struct PlayBody {
    pub query: String,
    /// Voice channel of the requester.
    pub channel: ChannelId,
}

/// POST /api/v1/guilds/{guild}/play: resolve a query and queue the hits.
pub async fn play(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
    Json(body): Json<PlayBody>,
) -> Result<Json<PlayResult>, AppError> {
    let result = state.audio.play(guild, body.channel, &body.query).await?;
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
}

pub async fn pause(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ControlResponse>, AppError> {
    state.audio.pause(guild).await?;
    Ok(Json(ControlResponse { status: "paused" }))
}

pub async fn resume(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ControlResponse>, AppError> {
    state.audio.resume(guild).await?;
    Ok(Json(ControlResponse { status: "playing" }))
}

#[derive(Debug, Serialize)]
pub struct SkipResponse {
    pub skipped: Option<Track>,
}

pub async fn skip(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<SkipResponse>, AppError> {
    let skipped = state.audio.skip(guild).await?;
    Ok(Json(SkipResponse { skipped }))
}

/// POST /api/v1/guilds/{guild}/stop and /leave: clear everything and
/// disconnect right away.
pub async fn stop(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ControlResponse>, AppError> {
    state.audio.stop(guild).await?;
    Ok(Json(ControlResponse { status: "stopped" }))
}

#[derive(Debug, Serialize)]
pub struct ShuffleResponse {
    pub shuffled: usize,
}

pub async fn shuffle(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ShuffleResponse>, AppError> {
    let shuffled = state.audio.shuffle(guild).await?;
    Ok(Json(ShuffleResponse { shuffled }))
}

#[derive(Debug, Deserialize)]
pub struct VolumeBody {
    pub percent: i64,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub percent: i64,
    pub volume: f32,
}

/// PUT /api/v1/guilds/{guild}/volume
pub async fn set_volume(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
    Json(body): Json<VolumeBody>,
) -> Result<Json<VolumeResponse>, AppError> {
    let volume = state.audio.set_volume(guild, body.percent).await?;
    Ok(Json(VolumeResponse {
        percent: body.percent,
        volume,
    }))
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    #[serde(flatten)]
    pub status: PlaybackStatus,
    /// Queued tracks beyond the listed titles.
    pub more: usize,
}

/// GET /api/v1/guilds/{guild}/queue
pub async fn queue(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<QueueResponse>, AppError> {
    let status = state.audio.status(guild).await?;
    let more = status.queue.remaining();
    Ok(Json(QueueResponse { status, more }))
}

/// GET /api/v1/guilds/{guild}/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
) -> Json<GuildSettings> {
    Json(state.settings.get(guild).await)
}

/// PUT /api/v1/guilds/{guild}/settings: replace the stored settings. A new
/// volume takes effect on the running stream right away.
pub async fn put_settings(
    State(state): State<AppState>,
    Path(guild): Path<GuildId>,
    Json(mut settings): Json<GuildSettings>,
) -> Result<Json<GuildSettings>, AppError> {
    if let Some(volume) = settings.volume {
        if !volume.is_finite() {
            return Err(AppError::BadRequest("volume must be a number".to_string()));
        }
        settings.volume = Some(volume.clamp(
            crate::audio::pipeline::MIN_VOLUME,
            crate::audio::pipeline::MAX_VOLUME,
        ));
    }
    let stored = state
        .settings
        .update(guild, Box::new(move |current: &mut GuildSettings| *current = settings))
        .await?;
    if let Some(volume) = stored.volume
        && state.audio.apply_volume(guild, volume).await?
    {
        tracing::debug!(guild, volume, "Stored volume applied to live playback");
    }
    tracing::info!(guild, "Guild settings updated");
    Ok(Json(stored))
}
