use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use aura_core::challenge::{Challenge, ChallengeId, ChallengeStatus};
use aura_core::game_trait::{GameConfig, GameKind, PlayerId};
use aura_core::session::{SessionError, SessionKey, SessionView};

use crate::sessions::SessionRegistry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("no pending challenge {0}")]
    NotFound(ChallengeId),
    #[error("only the invited player can answer this challenge")]
    NotInvitee,
    #[error("you cannot challenge yourself")]
    SelfChallenge,
    #[error("{0} is not a two-player game")]
    NotChallengeable(GameKind),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Pending two-player invitations.
///
/// Answering takes the challenge out of the pending map under its mutex, so
/// a challenge can be accepted at most once and never after the sweeper has
/// expired it. The mutex is released before the session is registered.
pub struct ChallengeBook {
    pending: Mutex<HashMap<ChallengeId, Challenge>>,
    ttl: Duration,
}

impl ChallengeBook {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn issue(
        &self,
        challenger: PlayerId,
        invitee: PlayerId,
        kind: GameKind,
        config: GameConfig,
    ) -> Result<Challenge, ChallengeError> {
        if challenger == invitee {
            return Err(ChallengeError::SelfChallenge);
        }
        if !kind.is_challengeable() {
            return Err(ChallengeError::NotChallengeable(kind));
        }
        let challenge = Challenge::new(challenger, invitee, kind, config);
        self.pending
            .lock()
            .await
            .insert(challenge.id, challenge.clone());
        tracing::info!(
            challenge = %challenge.id,
            challenger,
            invitee,
            game = %kind,
            "Challenge issued"
        );
        Ok(challenge)
    }

    /// Take a pending, unexpired challenge out of the map if `actor` may
    /// answer it. Expired entries found on the way are dropped.
    fn take_for(
        &self,
        pending: &mut HashMap<ChallengeId, Challenge>,
        id: ChallengeId,
        actor: PlayerId,
    ) -> Result<Challenge, ChallengeError> {
        let Some(challenge) = pending.get(&id) else {
            return Err(ChallengeError::NotFound(id));
        };
        if challenge.is_expired(Instant::now(), self.ttl) {
            pending.remove(&id);
            tracing::debug!(challenge = %id, "Challenge expired on answer");
            return Err(ChallengeError::NotFound(id));
        }
        if challenge.invitee != actor {
            return Err(ChallengeError::NotInvitee);
        }
        pending.remove(&id).ok_or(ChallengeError::NotFound(id))
    }

    /// Accept a challenge and start its session under `key`. If the session
    /// cannot be created the challenge stays pending.
    pub async fn accept(
        &self,
        id: ChallengeId,
        actor: PlayerId,
        key: SessionKey,
        sessions: &SessionRegistry,
    ) -> Result<SessionView, ChallengeError> {
        let mut challenge = {
            let mut pending = self.pending.lock().await;
            self.take_for(&mut pending, id, actor)?
        };

        match sessions
            .create(key, challenge.kind, challenge.seats(), challenge.config)
            .await
        {
            Ok(view) => {
                challenge.status = ChallengeStatus::Accepted;
                tracing::info!(challenge = %id, session = %view.key, "Challenge accepted");
                Ok(view)
            },
            Err(e) => {
                tracing::warn!(challenge = %id, error = %e, "Could not start challenged game");
                self.pending.lock().await.insert(id, challenge);
                Err(e.into())
            },
        }
    }

    pub async fn decline(&self, id: ChallengeId, actor: PlayerId) -> Result<Challenge, ChallengeError> {
        let mut pending = self.pending.lock().await;
        let mut challenge = self.take_for(&mut pending, id, actor)?;
        challenge.status = ChallengeStatus::Declined;
        tracing::info!(challenge = %id, "Challenge declined");
        Ok(challenge)
    }

    /// Drop every challenge pending for longer than the timeout. Returns the
    /// number removed.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|id, challenge| {
            let expired = challenge.is_expired(now, self.ttl);
            if expired {
                tracing::info!(challenge = %id, "Challenge expired");
            }
            !expired
        });
        before - pending.len()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}
