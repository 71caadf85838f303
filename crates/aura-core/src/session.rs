use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::game_trait::{
    Actor, GameKind, InvalidMove, Move, MoveOutcome, PlayerId, TurnGame, TurnPolicy,
};
use crate::time::unix_now_secs;

/// Identity of a session: one per rendered game surface (e.g. a message id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Fresh random key for callers that do not have a surface id yet.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle status of a session. Anything but `Active` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Won { player: PlayerId },
    Drawn { lost: bool },
    Expired,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Errors from creating, looking up, or moving in a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no active game for {0}")]
    NotFound(SessionKey),
    #[error("a game is already running for {0}")]
    AlreadyExists(SessionKey),
    #[error("{kind} needs {min}-{max} players, got {got}")]
    PlayerCount {
        kind: GameKind,
        min: u8,
        max: u8,
        got: usize,
    },
    #[error("{0} is not available on this server")]
    Unavailable(GameKind),
    #[error("players must be distinct")]
    DuplicatePlayer,
    #[error("the game is already over")]
    Finished,
}

/// Snapshot of a session handed back to the caller for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub key: SessionKey,
    pub kind: GameKind,
    pub participants: Vec<PlayerId>,
    /// Player expected to move next, for turn-enforced games.
    pub turn: Option<PlayerId>,
    pub status: SessionStatus,
    pub board: serde_json::Value,
    pub moves: u32,
    pub created_at: u64,
    /// The secret, once the game has ended.
    pub reveal: Option<String>,
}

/// One running game: the variant's board plus turn and lifecycle bookkeeping.
pub struct Session {
    key: SessionKey,
    kind: GameKind,
    participants: Vec<PlayerId>,
    turn_index: usize,
    policy: TurnPolicy,
    game: Box<dyn TurnGame>,
    status: SessionStatus,
    moves: u32,
    timeout: Duration,
    created_at: u64,
    last_activity: Instant,
}

impl Session {
    /// Wrap an initialised game. The participant count must fit the game's
    /// metadata and participants must be distinct.
    pub fn new(
        key: SessionKey,
        participants: Vec<PlayerId>,
        game: Box<dyn TurnGame>,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let meta = game.metadata();
        let count = participants.len();
        if count < meta.min_players as usize || count > meta.max_players as usize {
            return Err(SessionError::PlayerCount {
                kind: game.kind(),
                min: meta.min_players,
                max: meta.max_players,
                got: count,
            });
        }
        if participants
            .iter()
            .enumerate()
            .any(|(i, p)| participants[..i].contains(p))
        {
            return Err(SessionError::DuplicatePlayer);
        }

        Ok(Self {
            key,
            kind: game.kind(),
            participants,
            turn_index: 0,
            policy: meta.turn_policy,
            game,
            status: SessionStatus::Active,
            moves: 0,
            timeout,
            created_at: unix_now_secs(),
            last_activity: Instant::now(),
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn participants(&self) -> &[PlayerId] {
        &self.participants
    }

    /// The player whose turn it is, for turn-enforced games.
    pub fn current_player(&self) -> Option<PlayerId> {
        match self.policy {
            TurnPolicy::Alternating | TurnPolicy::Owner => {
                self.participants.get(self.turn_index).copied()
            },
            TurnPolicy::AnyParticipant | TurnPolicy::Open => None,
        }
    }

    /// Work out the actor's seat, or the reason they may not move now.
    fn seat_for(&self, player: PlayerId) -> Result<Option<usize>, InvalidMove> {
        let seat = self.participants.iter().position(|&p| p == player);
        match self.policy {
            TurnPolicy::Alternating | TurnPolicy::Owner => match seat {
                Some(s) if s == self.turn_index => Ok(Some(s)),
                Some(_) => Err(InvalidMove::NotYourTurn),
                None => Err(InvalidMove::NotAParticipant),
            },
            TurnPolicy::AnyParticipant => seat.map(Some).ok_or(InvalidMove::NotAParticipant),
            TurnPolicy::Open => Ok(seat),
        }
    }

    /// Apply a move from `player`. Players who may not act right now get
    /// `Invalid` without the game ever seeing the move. A terminal outcome
    /// freezes the session.
    pub fn apply_move(&mut self, player: PlayerId, mv: &Move) -> Result<MoveOutcome, SessionError> {
        if !self.status.is_active() {
            return Err(SessionError::Finished);
        }

        let seat = match self.seat_for(player) {
            Ok(seat) => seat,
            Err(reason) => return Ok(MoveOutcome::invalid(reason)),
        };

        let outcome = self.game.apply_move(Actor { id: player, seat }, mv);
        match &outcome {
            MoveOutcome::Invalid { .. } => return Ok(outcome),
            MoveOutcome::Continue { .. } => {
                if self.policy == TurnPolicy::Alternating {
                    self.turn_index = (self.turn_index + 1) % self.participants.len();
                }
            },
            MoveOutcome::Win { player } => {
                self.status = SessionStatus::Won { player: *player };
            },
            MoveOutcome::Draw { lost } => {
                self.status = SessionStatus::Drawn { lost: *lost };
            },
        }
        self.moves += 1;
        self.last_activity = Instant::now();
        Ok(outcome)
    }

    /// Point in time after which the session is reclaimed if nobody moves.
    pub fn deadline(&self) -> Instant {
        self.last_activity + self.timeout
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.status.is_active() && now >= self.deadline()
    }

    /// Mark an active session expired. No-op once the game is over.
    pub fn expire(&mut self) {
        if self.status.is_active() {
            self.status = SessionStatus::Expired;
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            key: self.key.clone(),
            kind: self.kind,
            participants: self.participants.clone(),
            turn: if self.status.is_active() {
                self.current_player()
            } else {
                None
            },
            status: self.status,
            board: self.game.view(),
            moves: self.moves,
            created_at: self.created_at,
            reveal: if self.status.is_active() {
                None
            } else {
                self.game.reveal()
            },
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("participants", &self.participants)
            .field("turn_index", &self.turn_index)
            .field("status", &self.status)
            .field("moves", &self.moves)
            .finish_non_exhaustive()
    }
}
