use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use aura_core::game_trait::InvalidMove;
use aura_core::session::SessionError;

use crate::audio::AudioError;
use crate::challenges::ChallengeError;
use crate::media::ResolveError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::BadGateway(m)
            | Self::Internal(m) => write!(f, "{m}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            Self::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            Self::BadGateway(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            Self::Internal(m) => {
                tracing::error!(error = %m, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
            },
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<InvalidMove> for AppError {
    fn from(e: InvalidMove) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => Self::NotFound(e.to_string()),
            SessionError::AlreadyExists(_) | SessionError::Finished => Self::Conflict(e.to_string()),
            SessionError::PlayerCount { .. }
            | SessionError::Unavailable(_)
            | SessionError::DuplicatePlayer => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<ChallengeError> for AppError {
    fn from(e: ChallengeError) -> Self {
        match e {
            ChallengeError::NotFound(_) => Self::NotFound(e.to_string()),
            ChallengeError::NotInvitee
            | ChallengeError::SelfChallenge
            | ChallengeError::NotChallengeable(_) => Self::BadRequest(e.to_string()),
            ChallengeError::Session(inner) => inner.into(),
        }
    }
}

impl From<AudioError> for AppError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::NothingFound(_) => Self::NotFound(e.to_string()),
            AudioError::Resolve(ResolveError::EmptyQuery) | AudioError::InvalidVolume(_) => {
                Self::BadRequest(e.to_string())
            },
            AudioError::Resolve(_) | AudioError::Voice(_) => Self::BadGateway(e.to_string()),
            AudioError::QueueFull
            | AudioError::NothingPlaying
            | AudioError::NothingToSkip
            | AudioError::AlreadyPaused
            | AudioError::NotPaused
            | AudioError::NothingToShuffle => Self::Conflict(e.to_string()),
            AudioError::PipelineGone(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}
