use rand::RngCore;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use aura_core::game_trait::{
    Actor, Difficulty, GameConfig, GameKind, GameMetadata, Hint, InvalidMove, Move, MoveOutcome,
    PlayerId, TurnGame, TurnPolicy,
};
use aura_core::words::WordBank;

/// Whether the letters of `word` can be rearranged into a different string.
pub fn can_scramble(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => chars.any(|c| c != first),
        None => false,
    }
}

/// Shuffle `word` until the result differs from it. `None` when every
/// letter is the same.
pub fn scramble(word: &str, rng: &mut dyn RngCore) -> Option<String> {
    if !can_scramble(word) {
        return None;
    }
    let mut letters: Vec<char> = word.chars().collect();
    loop {
        letters.shuffle(rng);
        let candidate: String = letters.iter().collect();
        if candidate != word {
            return Some(candidate);
        }
    }
}

/// Public Anagram state. Only the scramble is shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnagramState {
    pub scrambled: String,
    pub difficulty: Difficulty,
}

/// Unscramble the word. Anyone watching may answer.
pub struct Anagram {
    word: String,
    state: AnagramState,
}

impl Anagram {
    pub fn new() -> Self {
        Self {
            word: String::new(),
            state: AnagramState {
                scrambled: String::new(),
                difficulty: Difficulty::default(),
            },
        }
    }

    pub fn state(&self) -> &AnagramState {
        &self.state
    }
}

impl Default for Anagram {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGame for Anagram {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Anagram".to_string(),
            description: "First to unscramble the word wins.".to_string(),
            min_players: 1,
            max_players: 1,
            turn_policy: TurnPolicy::Open,
        }
    }

    fn init(
        &mut self,
        _players: &[PlayerId],
        config: &GameConfig,
        words: &WordBank,
        rng: &mut dyn RngCore,
    ) {
        let word = words.pick_word_where(config.difficulty, rng, can_scramble);
        let scrambled = match scramble(&word, rng) {
            Some(s) => s,
            None => word.chars().rev().collect(),
        };
        tracing::debug!(len = word.len(), difficulty = ?config.difficulty, "Anagram ready");
        self.word = word;
        self.state = AnagramState {
            scrambled,
            difficulty: config.difficulty,
        };
    }

    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome {
        let Move::Word(guess) = mv else {
            return MoveOutcome::invalid(InvalidMove::WrongMoveKind);
        };
        if guess.trim().eq_ignore_ascii_case(&self.word) {
            MoveOutcome::Win { player: actor.id }
        } else {
            MoveOutcome::hint(Hint::Wrong)
        }
    }

    fn reveal(&self) -> Option<String> {
        Some(self.word.clone())
    }

    aura_core::turn_game_boilerplate!(kind: GameKind::Anagram);
}
