use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use aura_core::challenge::{ChallengeId, ChallengeStatus};
use aura_core::game_trait::{Difficulty, GameConfig, GameKind, MoveOutcome, PlayerId, TurnPolicy};
use aura_core::session::{SessionKey, SessionView};

use crate::error::AppError;
use crate::game_registry::{MoveAction, dispatch};
use crate::state::AppState;

/// One entry of the game listing.
#[derive(Debug, Serialize)]
pub struct GameInfo {
    pub kind: GameKind,
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub turn_policy: TurnPolicy,
    pub timeout_secs: u64,
    pub challengeable: bool,
}

/// GET /api/v1/games: games this server was built with.
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<GameInfo>> {
    let games = GameKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let meta = state.game_registry.metadata(kind)?;
            Some(GameInfo {
                kind,
                name: meta.name,
                description: meta.description,
                min_players: meta.min_players,
                max_players: meta.max_players,
                turn_policy: meta.turn_policy,
                timeout_secs: state.config.games.timeouts.for_kind(kind).as_secs(),
                challengeable: kind.is_challengeable(),
            })
        })
        .collect();
    Json(games)
}

#[derive(Debug, Deserialize)]
pub struct CreateChallengeBody {
    pub challenger: PlayerId,
    pub invitee: PlayerId,
    pub kind: GameKind,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Serialize)]
pub struct CreateChallengeResponse {
    pub challenge_id: ChallengeId,
    pub challenger: PlayerId,
    pub invitee: PlayerId,
    pub kind: GameKind,
    pub expires_in_secs: u64,
}

fn game_config(difficulty: Option<Difficulty>) -> GameConfig {
    GameConfig {
        difficulty: difficulty.unwrap_or_default(),
    }
}

/// POST /api/v1/challenges: invite another player to a two-player game.
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(body): Json<CreateChallengeBody>,
) -> Result<(StatusCode, Json<CreateChallengeResponse>), AppError> {
    if state.game_registry.metadata(body.kind).is_none() {
        return Err(AppError::BadRequest(format!(
            "{} is not available on this server",
            body.kind
        )));
    }
    let challenge = state
        .challenges
        .issue(
            body.challenger,
            body.invitee,
            body.kind,
            game_config(body.difficulty),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateChallengeResponse {
            challenge_id: challenge.id,
            challenger: challenge.challenger,
            invitee: challenge.invitee,
            kind: challenge.kind,
            expires_in_secs: state.challenges.ttl().as_secs(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AnswerChallengeBody {
    pub actor: PlayerId,
    #[serde(default)]
    pub session_key: Option<String>,
}

/// POST /api/v1/challenges/{id}/accept: start the challenged game.
pub async fn accept_challenge(
    State(state): State<AppState>,
    Path(id): Path<ChallengeId>,
    Json(body): Json<AnswerChallengeBody>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let key = body
        .session_key
        .map(SessionKey::from)
        .unwrap_or_else(SessionKey::generate);
    let view = state
        .challenges
        .accept(id, body.actor, key, &state.sessions)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Serialize)]
pub struct DeclineResponse {
    pub challenge_id: ChallengeId,
    pub status: ChallengeStatus,
}

/// POST /api/v1/challenges/{id}/decline
pub async fn decline_challenge(
    State(state): State<AppState>,
    Path(id): Path<ChallengeId>,
    Json(body): Json<AnswerChallengeBody>,
) -> Result<Json<DeclineResponse>, AppError> {
    let challenge = state.challenges.decline(id, body.actor).await?;
    Ok(Json(DeclineResponse {
        challenge_id: challenge.id,
        status: challenge.status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StartSessionBody {
    pub player: PlayerId,
    pub kind: GameKind,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub session_key: Option<String>,
}

/// POST /api/v1/sessions: start a single-player game.
pub async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<StartSessionBody>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let key = body
        .session_key
        .map(SessionKey::from)
        .unwrap_or_else(SessionKey::generate);
    let view = state
        .sessions
        .create(key, body.kind, vec![body.player], game_config(body.difficulty))
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/{key}
pub async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.get(&SessionKey::from(key)).await?))
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub actor: PlayerId,
    pub action: MoveAction,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub outcome: MoveOutcome,
    pub session: SessionView,
}

/// POST /api/v1/sessions/{key}/moves: submit one interaction.
///
/// Malformed payloads are rejected with 400; moves the game refuses come
/// back as an `invalid` outcome with the unchanged session.
pub async fn submit_move(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<MoveBody>,
) -> Result<Json<MoveResponse>, AppError> {
    let key = SessionKey::from(key);
    let kind = state.sessions.get(&key).await?.kind;
    let mv = dispatch(kind, body.action, &body.value)?;
    let (outcome, session) = state.sessions.apply_move(&key, body.actor, &mv).await?;
    Ok(Json(MoveResponse { outcome, session }))
}
