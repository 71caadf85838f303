use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use aura_core::game_trait::GameKind;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub games: GameInfo,
    pub audio: AudioInfo,
}

#[derive(Serialize)]
pub struct GameInfo {
    pub available: usize,
    pub active_sessions: usize,
    pub pending_challenges: usize,
    pub by_kind: HashMap<GameKind, usize>,
}

#[derive(Serialize)]
pub struct AudioInfo {
    pub guilds: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        games: GameInfo {
            available: state.game_registry.available_games(),
            active_sessions: state.sessions.len().await,
            pending_challenges: state.challenges.len().await,
            by_kind: state.sessions.stats().await,
        },
        audio: AudioInfo {
            guilds: state.audio.guild_count().await,
        },
    })
}
