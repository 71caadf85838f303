use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};

use aura_core::game_trait::{GameConfig, GameKind, Move, MoveOutcome, PlayerId};
use aura_core::session::{Session, SessionError, SessionKey, SessionView};
use aura_core::words::WordBank;

use crate::config::GameTimeouts;
use crate::game_registry::GameRegistry;

type SessionSlot = Arc<Mutex<Session>>;

/// Keyed store of running game sessions.
///
/// The outer lock is only held to look up, insert or remove a slot; moves
/// take the slot's own mutex. The sweeper never waits on a slot mutex, so
/// it cannot race an in-flight move on the same key.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionKey, SessionSlot>>,
    games: Arc<GameRegistry>,
    words: Arc<WordBank>,
    timeouts: GameTimeouts,
}

impl SessionRegistry {
    pub fn new(games: Arc<GameRegistry>, words: Arc<WordBank>, timeouts: GameTimeouts) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            games,
            words,
            timeouts,
        }
    }

    /// Build and initialise a session. Sync so the thread RNG never lives
    /// across an await.
    fn build(
        &self,
        key: SessionKey,
        kind: GameKind,
        participants: Vec<PlayerId>,
        config: &GameConfig,
    ) -> Result<Session, SessionError> {
        let mut game = self
            .games
            .create(kind)
            .ok_or(SessionError::Unavailable(kind))?;
        let mut rng = rand::rng();
        game.init(&participants, config, &self.words, &mut rng);
        Session::new(key, participants, game, self.timeouts.for_kind(kind))
    }

    /// Start a session under `key`. Fails with `AlreadyExists` while another
    /// session is active there; a stale one past its deadline is replaced.
    pub async fn create(
        &self,
        key: SessionKey,
        kind: GameKind,
        participants: Vec<PlayerId>,
        config: GameConfig,
    ) -> Result<SessionView, SessionError> {
        let mut sessions = self.sessions.write().await;
        if let Some(slot) = sessions.get(&key) {
            let reclaimable = match slot.try_lock() {
                Ok(mut existing) => {
                    if existing.is_expired(Instant::now()) {
                        existing.expire();
                    }
                    !existing.status().is_active()
                },
                Err(_) => false,
            };
            if !reclaimable {
                return Err(SessionError::AlreadyExists(key));
            }
        }

        let session = self.build(key.clone(), kind, participants, &config)?;
        let view = session.view();
        sessions.insert(key.clone(), Arc::new(Mutex::new(session)));
        tracing::info!(session = %key, game = %kind, players = ?view.participants, "Session started");
        Ok(view)
    }

    /// Block every registry write until the guard drops.
    #[cfg(test)]
    pub(crate) async fn hold_writes(
        &self,
    ) -> tokio::sync::RwLockWriteGuard<'_, HashMap<SessionKey, SessionSlot>> {
        self.sessions.write().await
    }

    async fn slot(&self, key: &SessionKey) -> Result<SessionSlot, SessionError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(key)
            .map(Arc::clone)
            .ok_or_else(|| SessionError::NotFound(key.clone()))
    }

    /// Remove `key` only if it still maps to `slot`.
    async fn remove_slot(&self, key: &SessionKey, slot: &SessionSlot) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            sessions.remove(key);
        }
    }

    pub async fn get(&self, key: &SessionKey) -> Result<SessionView, SessionError> {
        let slot = self.slot(key).await?;
        let mut session = slot.lock().await;
        if session.is_expired(Instant::now()) {
            session.expire();
            drop(session);
            self.remove_slot(key, &slot).await;
            tracing::debug!(session = %key, "Session expired on lookup");
            return Err(SessionError::NotFound(key.clone()));
        }
        if !session.status().is_active() {
            return Err(SessionError::NotFound(key.clone()));
        }
        Ok(session.view())
    }

    /// Apply `mv` from `player`. The returned view reflects the move; a
    /// terminal outcome removes the session from the registry.
    pub async fn apply_move(
        &self,
        key: &SessionKey,
        player: PlayerId,
        mv: &Move,
    ) -> Result<(MoveOutcome, SessionView), SessionError> {
        let slot = self.slot(key).await?;
        let mut session = slot.lock().await;

        // Swept or finished while we waited for the lock.
        if !session.status().is_active() {
            return Err(SessionError::NotFound(key.clone()));
        }
        if session.is_expired(Instant::now()) {
            session.expire();
            drop(session);
            self.remove_slot(key, &slot).await;
            tracing::debug!(session = %key, "Move arrived after the deadline");
            return Err(SessionError::NotFound(key.clone()));
        }

        let outcome = session.apply_move(player, mv)?;
        let view = session.view();
        drop(session);

        match &outcome {
            MoveOutcome::Invalid { error } => {
                tracing::debug!(session = %key, player, reason = %error, "Move rejected");
            },
            MoveOutcome::Win { .. } | MoveOutcome::Draw { .. } => {
                self.remove_slot(key, &slot).await;
                tracing::info!(session = %key, status = ?view.status, moves = view.moves, "Session finished");
            },
            MoveOutcome::Continue { .. } => {},
        }
        Ok((outcome, view))
    }

    /// Expire and remove every session whose inactivity deadline is at or
    /// before `now`. Sessions busy with a move are left for the next sweep.
    /// Returns the number removed.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|key, slot| match slot.try_lock() {
            Ok(mut session) => {
                if session.is_expired(now) {
                    session.expire();
                    tracing::info!(session = %key, game = %session.kind(), "Session expired");
                }
                session.status().is_active()
            },
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Active session count per game, for the health endpoint.
    pub async fn stats(&self) -> HashMap<GameKind, usize> {
        let sessions = self.sessions.read().await;
        let mut counts = HashMap::new();
        for slot in sessions.values() {
            if let Ok(session) = slot.try_lock() {
                *counts.entry(session.kind()).or_insert(0) += 1;
            }
        }
        counts
    }
}
