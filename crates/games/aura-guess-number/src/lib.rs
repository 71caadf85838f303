use std::ops::RangeInclusive;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use aura_core::game_trait::{
    Actor, GameConfig, GameKind, GameMetadata, Hint, InvalidMove, Move, MoveOutcome, PlayerId,
    TurnGame, TurnPolicy,
};
use aura_core::words::WordBank;

pub const RANGE: RangeInclusive<i64> = 1..=100;

/// Public Guess-the-Number state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessNumberState {
    pub min: i64,
    pub max: i64,
    /// In-range guesses made so far.
    pub guesses: u32,
    pub last_hint: Option<Hint>,
}

pub struct GuessNumber {
    secret: i64,
    state: GuessNumberState,
}

impl GuessNumber {
    pub fn new() -> Self {
        Self {
            secret: *RANGE.start(),
            state: GuessNumberState {
                min: *RANGE.start(),
                max: *RANGE.end(),
                guesses: 0,
                last_hint: None,
            },
        }
    }

    pub fn state(&self) -> &GuessNumberState {
        &self.state
    }
}

impl Default for GuessNumber {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGame for GuessNumber {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Guess the Number".to_string(),
            description: "Find the number between 1 and 100.".to_string(),
            min_players: 1,
            max_players: 1,
            turn_policy: TurnPolicy::Owner,
        }
    }

    fn init(
        &mut self,
        _players: &[PlayerId],
        _config: &GameConfig,
        _words: &WordBank,
        rng: &mut dyn RngCore,
    ) {
        *self = Self::new();
        self.secret = rng.random_range(RANGE);
    }

    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome {
        let Move::Number(guess) = *mv else {
            return MoveOutcome::invalid(InvalidMove::WrongMoveKind);
        };
        if !RANGE.contains(&guess) {
            return MoveOutcome::invalid(InvalidMove::OutOfRange {
                guess,
                min: *RANGE.start(),
                max: *RANGE.end(),
            });
        }
        self.state.guesses += 1;
        let hint = match guess.cmp(&self.secret) {
            std::cmp::Ordering::Less => Hint::Higher,
            std::cmp::Ordering::Greater => Hint::Lower,
            std::cmp::Ordering::Equal => {
                tracing::debug!(guesses = self.state.guesses, "Number found");
                self.state.last_hint = None;
                return MoveOutcome::Win { player: actor.id };
            },
        };
        self.state.last_hint = Some(hint);
        MoveOutcome::hint(hint)
    }

    fn reveal(&self) -> Option<String> {
        Some(self.secret.to_string())
    }

    aura_core::turn_game_boilerplate!(kind: GameKind::GuessNumber);
}
