use rand::RngCore;
use serde::{Deserialize, Serialize};

use aura_core::game_trait::{
    Actor, Difficulty, GameConfig, GameKind, GameMetadata, InvalidMove, Move, MoveOutcome,
    PlayerId, TurnGame, TurnPolicy,
};
use aura_core::words::WordBank;

/// Number of positions at which two equal-length words differ.
pub fn letter_diff(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count()
}

/// Whether `diff` changed letters count as one rung at `difficulty`.
/// Hard allows exactly one change; easier settings allow one or two.
pub fn accepts_step(diff: usize, difficulty: Difficulty) -> bool {
    match difficulty {
        Difficulty::Hard => diff == 1,
        Difficulty::Easy | Difficulty::Medium => (1..=2).contains(&diff),
    }
}

/// One racer's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ladder {
    pub player: PlayerId,
    /// Words so far, starting with the shared start word.
    pub words: Vec<String>,
}

impl Ladder {
    pub fn current(&self) -> &str {
        self.words.last().map(String::as_str).unwrap_or_default()
    }

    pub fn score(&self) -> usize {
        self.words.len().saturating_sub(1)
    }
}

/// Public Word Ladder state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordLadderState {
    pub start: String,
    pub end: String,
    pub difficulty: Difficulty,
    /// One ladder per participant, in seat order.
    pub ladders: Vec<Ladder>,
}

/// Race from the start word to the end word, changing letters each rung.
pub struct WordLadder {
    state: WordLadderState,
    words: WordBank,
}

impl WordLadder {
    pub fn new() -> Self {
        Self {
            state: WordLadderState {
                start: String::new(),
                end: String::new(),
                difficulty: Difficulty::default(),
                ladders: Vec::new(),
            },
            words: WordBank::default(),
        }
    }

    pub fn state(&self) -> &WordLadderState {
        &self.state
    }

    fn validate(&self, current: &str, word: &str) -> Result<(), InvalidMove> {
        if word.chars().count() != current.chars().count() {
            return Err(InvalidMove::WrongLength {
                word: word.to_string(),
                expected: current.chars().count(),
            });
        }
        if !self.words.is_ladder_word(word) {
            return Err(InvalidMove::NotInDictionary {
                word: word.to_string(),
            });
        }
        if !accepts_step(letter_diff(current, word), self.state.difficulty) {
            return Err(InvalidMove::NotALadderStep {
                word: word.to_string(),
                from: current.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for WordLadder {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGame for WordLadder {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Word Ladder".to_string(),
            description: "Change letters one rung at a time to reach the target word."
                .to_string(),
            min_players: 1,
            max_players: 2,
            turn_policy: TurnPolicy::AnyParticipant,
        }
    }

    fn init(
        &mut self,
        players: &[PlayerId],
        config: &GameConfig,
        words: &WordBank,
        rng: &mut dyn RngCore,
    ) {
        let (start, end) = words.ladder_pair(rng);
        self.words = words.clone();
        // The fallback pair must stay playable even with an empty dictionary.
        if self.words.ladder_len() < 2 {
            self.words = WordBank::from_lists([start.as_str(), end.as_str()], [""; 0]);
        }
        self.state = WordLadderState {
            ladders: players
                .iter()
                .map(|&player| Ladder {
                    player,
                    words: vec![start.clone()],
                })
                .collect(),
            start,
            end,
            difficulty: config.difficulty,
        };
        tracing::debug!(
            start = %self.state.start,
            end = %self.state.end,
            difficulty = ?self.state.difficulty,
            "Word ladder ready"
        );
    }

    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome {
        let Move::Word(word) = mv else {
            return MoveOutcome::invalid(InvalidMove::WrongMoveKind);
        };
        let Some(seat) = actor.seat.filter(|&s| s < self.state.ladders.len()) else {
            return MoveOutcome::invalid(InvalidMove::NotAParticipant);
        };
        let word = word.trim().to_uppercase();
        let current = self.state.ladders[seat].current().to_string();
        if let Err(reason) = self.validate(&current, &word) {
            return MoveOutcome::invalid(reason);
        }

        let reached = word == self.state.end;
        self.state.ladders[seat].words.push(word);
        if reached {
            tracing::debug!(
                player = actor.id,
                score = self.state.ladders[seat].score(),
                "Ladder complete"
            );
            return MoveOutcome::Win { player: actor.id };
        }
        MoveOutcome::CONTINUE
    }

    aura_core::turn_game_boilerplate!(kind: GameKind::WordLadder);
}
