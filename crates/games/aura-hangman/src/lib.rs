use rand::RngCore;
use serde::{Deserialize, Serialize};

use aura_core::game_trait::{
    Actor, Difficulty, GameConfig, GameKind, GameMetadata, Hint, InvalidMove, Move, MoveOutcome,
    PlayerId, TurnGame, TurnPolicy,
};
use aura_core::words::WordBank;

/// Wrong guesses allowed before the game is lost.
pub const MAX_WRONG: u8 = 6;

/// Public Hangman state. The word itself is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HangmanState {
    /// One entry per letter of the word; `None` while still hidden.
    pub revealed: Vec<Option<char>>,
    /// Every letter tried so far, in guess order.
    pub guessed: Vec<char>,
    pub wrong: u8,
    pub max_wrong: u8,
    pub difficulty: Difficulty,
}

impl HangmanState {
    /// The word as shown to players, e.g. `A _ _ L E`.
    pub fn masked(&self) -> String {
        self.revealed
            .iter()
            .map(|c| c.map_or("_".to_string(), |c| c.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct Hangman {
    word: String,
    state: HangmanState,
}

impl Hangman {
    pub fn new() -> Self {
        Self {
            word: String::new(),
            state: HangmanState {
                revealed: Vec::new(),
                guessed: Vec::new(),
                wrong: 0,
                max_wrong: MAX_WRONG,
                difficulty: Difficulty::default(),
            },
        }
    }

    pub fn state(&self) -> &HangmanState {
        &self.state
    }

    fn start_with(&mut self, word: String, difficulty: Difficulty) {
        self.state = HangmanState {
            revealed: vec![None; word.chars().count()],
            guessed: Vec::new(),
            wrong: 0,
            max_wrong: MAX_WRONG,
            difficulty,
        };
        self.word = word;
    }
}

impl Default for Hangman {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGame for Hangman {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Hangman".to_string(),
            description: "Guess the hidden word one letter at a time.".to_string(),
            min_players: 1,
            max_players: 1,
            turn_policy: TurnPolicy::Owner,
        }
    }

    fn init(
        &mut self,
        _players: &[PlayerId],
        config: &GameConfig,
        words: &WordBank,
        rng: &mut dyn RngCore,
    ) {
        let word = words.pick_word(config.difficulty, rng);
        tracing::debug!(len = word.len(), difficulty = ?config.difficulty, "Hangman word chosen");
        self.start_with(word, config.difficulty);
    }

    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome {
        let Move::Letter(raw) = *mv else {
            return MoveOutcome::invalid(InvalidMove::WrongMoveKind);
        };
        if !raw.is_ascii_alphabetic() {
            return MoveOutcome::invalid(InvalidMove::NotALetter);
        }
        let letter = raw.to_ascii_uppercase();
        if self.state.guessed.contains(&letter) {
            return MoveOutcome::invalid(InvalidMove::AlreadyGuessed { letter });
        }
        self.state.guessed.push(letter);

        let mut hit = false;
        for (slot, c) in self.state.revealed.iter_mut().zip(self.word.chars()) {
            if c == letter {
                *slot = Some(c);
                hit = true;
            }
        }

        if !hit {
            self.state.wrong += 1;
            if self.state.wrong >= MAX_WRONG {
                return MoveOutcome::Draw { lost: true };
            }
            return MoveOutcome::hint(Hint::Miss);
        }
        if self.state.revealed.iter().all(Option::is_some) {
            return MoveOutcome::Win { player: actor.id };
        }
        MoveOutcome::hint(Hint::Hit)
    }

    fn reveal(&self) -> Option<String> {
        Some(self.word.clone())
    }

    aura_core::turn_game_boilerplate!(kind: GameKind::Hangman);
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_helpers::{
        contract_init_produces_view, contract_invalid_move_changes_nothing,
        contract_rejects_foreign_move_kind, contract_view_hides_secret, init_game, seated,
    };

    fn with_word(word: &str) -> Hangman {
        let mut game = Hangman::new();
        game.start_with(word.to_string(), Difficulty::Medium);
        game
    }

    fn guess(game: &mut Hangman, letter: char) -> MoveOutcome {
        game.apply_move(seated(1, 0), &Move::Letter(letter))
    }

    #[test]
    fn contract_suite() {
        let mut game = Hangman::new();
        contract_init_produces_view(&mut game, 1);
        contract_view_hides_secret(&game);
        contract_rejects_foreign_move_kind(&mut game, seated(1, 0), &Move::Number(3));
        contract_invalid_move_changes_nothing(&mut game, seated(1, 0), &Move::Letter('7'));
    }

    #[test]
    fn word_matches_requested_tier() {
        for (difficulty, ok) in [
            (Difficulty::Easy, 0..=4usize),
            (Difficulty::Medium, 5..=6),
            (Difficulty::Hard, 7..=usize::MAX),
        ] {
            let mut game = Hangman::new();
            init_game(&mut game, 1, GameConfig { difficulty }, 5);
            let len = game.reveal().map(|w| w.len()).unwrap_or_default();
            assert!(ok.contains(&len), "{difficulty:?} picked length {len}");
        }
    }

    #[test]
    fn empty_bank_falls_back_to_puzzle() {
        let mut game = Hangman::new();
        let mut rng = aura_core::test_helpers::seeded_rng(1);
        game.init(&[1], &GameConfig::default(), &WordBank::default(), &mut rng);
        assert_eq!(game.reveal().as_deref(), Some("PUZZLE"));
    }

    #[test]
    fn hits_reveal_every_position_case_insensitively() {
        let mut game = with_word("APPLE");
        assert_eq!(guess(&mut game, 'p'), MoveOutcome::hint(Hint::Hit));
        assert_eq!(game.state().masked(), "_ P P _ _");
        assert_eq!(game.state().wrong, 0);
    }

    #[test]
    fn repeated_letter_is_invalid_and_not_counted() {
        let mut game = with_word("APPLE");
        guess(&mut game, 'Z');
        assert_eq!(
            guess(&mut game, 'z'),
            MoveOutcome::invalid(InvalidMove::AlreadyGuessed { letter: 'Z' })
        );
        assert_eq!(game.state().wrong, 1);
    }

    #[test]
    fn revealing_everything_wins() {
        let mut game = with_word("CAT");
        guess(&mut game, 'C');
        guess(&mut game, 'A');
        assert_eq!(guess(&mut game, 'T'), MoveOutcome::Win { player: 1 });
    }

    #[test]
    fn sixth_miss_loses() {
        let mut game = with_word("CAT");
        for letter in ['B', 'D', 'E', 'F', 'G'] {
            assert_eq!(guess(&mut game, letter), MoveOutcome::hint(Hint::Miss));
        }
        assert_eq!(guess(&mut game, 'H'), MoveOutcome::Draw { lost: true });
        assert_eq!(game.state().wrong, MAX_WRONG);
    }

    #[test]
    fn view_never_contains_the_word() {
        let game = with_word("GIRAFFE");
        let view = game.view();
        assert!(view.get("word").is_none());
        assert_eq!(view["revealed"].as_array().map(Vec::len), Some(7));
    }
}
