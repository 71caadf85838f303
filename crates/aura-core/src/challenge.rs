use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game_trait::{GameConfig, GameKind, PlayerId};

/// Unique identifier of a pending challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(pub Uuid);

impl ChallengeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// An invitation from one player to another to start a two-player game.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub id: ChallengeId,
    pub challenger: PlayerId,
    pub invitee: PlayerId,
    pub kind: GameKind,
    pub config: GameConfig,
    pub status: ChallengeStatus,
    pub created_at: Instant,
}

impl Challenge {
    pub fn new(challenger: PlayerId, invitee: PlayerId, kind: GameKind, config: GameConfig) -> Self {
        Self {
            id: ChallengeId::generate(),
            challenger,
            invitee,
            kind,
            config,
            status: ChallengeStatus::Pending,
            created_at: Instant::now(),
        }
    }

    /// Seat order for the session created on acceptance: challenger first.
    pub fn seats(&self) -> Vec<PlayerId> {
        vec![self.challenger, self.invitee]
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now >= self.created_at + ttl
    }
}
