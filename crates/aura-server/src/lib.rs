pub mod api;
pub mod audio;
pub mod audio_api;
pub mod challenges;
pub mod config;
pub mod error;
pub mod game_registry;
pub mod health;
pub mod media;
pub mod notes_api;
pub mod sessions;
pub mod state;
pub mod store;
pub mod voice;

use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::{get, post, put};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use audio::pipeline::PipelineEvent;
use config::ServerConfig;
use state::{AppState, Collaborators};

/// Build the Axum router and application state from a config, using the
/// shipped collaborators.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let collaborators = Collaborators::from_config(&config);
    build_app_with(config, collaborators)
}

/// Build the router around caller-supplied collaborators.
pub fn build_app_with(config: ServerConfig, collaborators: Collaborators) -> (Router<()>, AppState) {
    let state = AppState::new(config, collaborators);

    let game_routes = Router::new()
        .route("/games", get(api::list_games))
        .route("/challenges", post(api::create_challenge))
        .route("/challenges/{id}/accept", post(api::accept_challenge))
        .route("/challenges/{id}/decline", post(api::decline_challenge))
        .route("/sessions", post(api::start_session))
        .route("/sessions/{key}", get(api::get_session))
        .route("/sessions/{key}/moves", post(api::submit_move));

    let audio_routes = Router::new()
        .route("/{guild}/play", post(audio_api::play))
        .route("/{guild}/pause", post(audio_api::pause))
        .route("/{guild}/resume", post(audio_api::resume))
        .route("/{guild}/skip", post(audio_api::skip))
        .route("/{guild}/stop", post(audio_api::stop))
        .route("/{guild}/leave", post(audio_api::stop))
        .route("/{guild}/shuffle", post(audio_api::shuffle))
        .route("/{guild}/volume", put(audio_api::set_volume))
        .route("/{guild}/queue", get(audio_api::queue))
        .route(
            "/{guild}/settings",
            get(audio_api::get_settings).put(audio_api::put_settings),
        );

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", game_routes)
        .nest("/api/v1/guilds", audio_routes)
        .route(
            "/api/v1/notes/{recipient}",
            get(notes_api::read_notes)
                .post(notes_api::leave_note)
                .delete(notes_api::clear_notes),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}

/// Background task that reclaims expired sessions and challenges.
pub fn spawn_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.config.games.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let now = Instant::now();
            let sessions = state.sessions.sweep_expired(now).await;
            let challenges = state.challenges.sweep_expired(now).await;
            if sessions + challenges > 0 {
                tracing::debug!(sessions, challenges, "Swept expired entries");
            }
        }
    })
}

/// Background task that reports pipeline transitions. It stands in for the
/// chat platform's "now playing" rendering.
pub fn spawn_event_logger(state: AppState) -> tokio::task::JoinHandle<()> {
    let mut rx = state.audio.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::NowPlaying { guild, track }) => {
                    tracing::info!(guild, title = %track.title, source = %track.source, "Now playing");
                },
                Ok(PipelineEvent::TrackFailed { guild, track, error }) => {
                    tracing::warn!(guild, title = %track.title, error = %error, "Skipped unplayable track");
                },
                Ok(PipelineEvent::QueueFinished { guild }) => {
                    tracing::info!(guild, "Queue finished");
                },
                Ok(PipelineEvent::Disconnected { guild }) => {
                    tracing::info!(guild, "Now-playing surface cleared");
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Event logger lagged by {n} messages");
                },
                Err(RecvError::Closed) => {
                    tracing::info!("Pipeline event channel closed, stopping logger");
                    break;
                },
            }
        }
    })
}
