use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use aura_core::time::unix_now_secs;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::{Note, NotesPage, UserId};

/// Notes shown per read, newest first.
pub const NOTES_SHOWN: usize = 10;
/// Longest note body accepted, in characters.
pub const MAX_NOTE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct NoteBody {
    pub author_id: UserId,
    pub author_name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NoteLeft {
    pub recipient: UserId,
    /// Notes now waiting for the recipient.
    pub count: usize,
}

/// POST /api/v1/notes/{recipient}: leave a private note.
pub async fn leave_note(
    State(state): State<AppState>,
    Path(recipient): Path<UserId>,
    Json(body): Json<NoteBody>,
) -> Result<(StatusCode, Json<NoteLeft>), AppError> {
    if body.author_id == recipient {
        return Err(AppError::BadRequest("notes are for someone else".to_string()));
    }
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("note is empty".to_string()));
    }
    if message.chars().count() > MAX_NOTE_CHARS {
        return Err(AppError::BadRequest(format!(
            "note is longer than {MAX_NOTE_CHARS} characters"
        )));
    }
    let note = Note {
        author_id: body.author_id,
        author_name: body.author_name,
        message: message.to_string(),
        timestamp: unix_now_secs(),
    };
    let count = state.notes.append(recipient, note).await?;
    tracing::info!(recipient, author = body.author_id, count, "Note left");
    Ok((StatusCode::CREATED, Json(NoteLeft { recipient, count })))
}

/// GET /api/v1/notes/{recipient}: the latest notes left for a member.
pub async fn read_notes(
    State(state): State<AppState>,
    Path(recipient): Path<UserId>,
) -> Json<NotesPage> {
    Json(state.notes.list(recipient, NOTES_SHOWN).await)
}

#[derive(Debug, Serialize)]
pub struct NotesCleared {
    pub cleared: usize,
}

/// DELETE /api/v1/notes/{recipient}: drop every note left for a member.
pub async fn clear_notes(
    State(state): State<AppState>,
    Path(recipient): Path<UserId>,
) -> Result<Json<NotesCleared>, AppError> {
    let cleared = state.notes.clear(recipient).await?;
    if cleared > 0 {
        tracing::info!(recipient, cleared, "Notes cleared");
    }
    Ok(Json(NotesCleared { cleared }))
}
