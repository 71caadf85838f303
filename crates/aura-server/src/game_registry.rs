use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aura_core::game_trait::{GameKind, GameMetadata, InvalidMove, Move, TurnGame};

/// Factory function type for creating game instances.
type GameFactory = fn() -> Box<dyn TurnGame>;

/// Registry mapping game kinds to factory functions. Which games exist is
/// decided by cargo features.
pub struct GameRegistry {
    factories: HashMap<GameKind, GameFactory>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "connect-four")]
        self.factories.insert(GameKind::ConnectFour, || {
            Box::new(aura_connect_four::ConnectFour::new())
        });
        #[cfg(feature = "tictactoe")]
        self.factories
            .insert(GameKind::TicTacToe, || Box::new(aura_tictactoe::TicTacToe::new()));
        #[cfg(feature = "word-ladder")]
        self.factories.insert(GameKind::WordLadder, || {
            Box::new(aura_word_ladder::WordLadder::new())
        });
        #[cfg(feature = "hangman")]
        self.factories
            .insert(GameKind::Hangman, || Box::new(aura_hangman::Hangman::new()));
        #[cfg(feature = "anagram")]
        self.factories
            .insert(GameKind::Anagram, || Box::new(aura_anagram::Anagram::new()));
        #[cfg(feature = "guess-number")]
        self.factories.insert(GameKind::GuessNumber, || {
            Box::new(aura_guess_number::GuessNumber::new())
        });
    }

    pub fn create(&self, kind: GameKind) -> Option<Box<dyn TurnGame>> {
        self.factories.get(&kind).map(|f| f())
    }

    pub fn metadata(&self, kind: GameKind) -> Option<GameMetadata> {
        self.factories.get(&kind).map(|f| f().metadata())
    }

    /// Return the number of registered game types.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }
}

/// The interaction a move payload arrives through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveAction {
    /// Connect Four column button.
    Drop,
    /// Tic-Tac-Toe cell button.
    Mark,
    /// Free-text word submission.
    Word,
    /// Single-letter submission.
    Letter,
    /// Numeric submission.
    Number,
}

/// Which action each game accepts. Anything else is rejected before the
/// session is touched.
const DISPATCH: [(GameKind, MoveAction); 6] = [
    (GameKind::ConnectFour, MoveAction::Drop),
    (GameKind::TicTacToe, MoveAction::Mark),
    (GameKind::WordLadder, MoveAction::Word),
    (GameKind::Hangman, MoveAction::Letter),
    (GameKind::Anagram, MoveAction::Word),
    (GameKind::GuessNumber, MoveAction::Number),
];

/// Turn a raw interaction payload into a typed move for `kind`.
pub fn dispatch(
    kind: GameKind,
    action: MoveAction,
    value: &serde_json::Value,
) -> Result<Move, InvalidMove> {
    if !DISPATCH.contains(&(kind, action)) {
        return Err(InvalidMove::WrongMoveKind);
    }
    match action {
        MoveAction::Drop => small_index(value, "a column number").map(Move::Column),
        MoveAction::Mark => small_index(value, "a cell number 0-8").map(Move::Cell),
        MoveAction::Word => value
            .as_str()
            .map(|s| Move::Word(s.trim().to_string()))
            .ok_or_else(|| malformed("a word")),
        MoveAction::Letter => match value.as_str().map(str::trim) {
            Some(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Move::Letter(c)),
                    _ => Err(InvalidMove::NotALetter),
                }
            },
            None => Err(InvalidMove::NotALetter),
        },
        MoveAction::Number => integer(value)
            .map(Move::Number)
            .ok_or_else(|| malformed("a whole number")),
    }
}

fn malformed(expected: &str) -> InvalidMove {
    InvalidMove::Malformed {
        expected: expected.to_string(),
    }
}

/// Integers arrive either as JSON numbers or as text typed into a modal.
fn integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn small_index(value: &serde_json::Value, expected: &str) -> Result<u8, InvalidMove> {
    integer(value)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| malformed(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_game_is_registered_by_default() {
        let registry = GameRegistry::new();
        assert_eq!(registry.available_games(), GameKind::ALL.len());
        for kind in GameKind::ALL {
            let game = registry.create(kind).unwrap();
            assert_eq!(game.kind(), kind);
        }
    }

    #[test]
    fn each_kind_has_exactly_one_action() {
        for kind in GameKind::ALL {
            let count = DISPATCH.iter().filter(|(k, _)| *k == kind).count();
            assert_eq!(count, 1, "{kind}");
        }
    }

    #[test]
    fn dispatch_parses_each_pair() {
        assert_eq!(
            dispatch(GameKind::ConnectFour, MoveAction::Drop, &json!(3)),
            Ok(Move::Column(3))
        );
        assert_eq!(
            dispatch(GameKind::TicTacToe, MoveAction::Mark, &json!("8")),
            Ok(Move::Cell(8))
        );
        assert_eq!(
            dispatch(GameKind::WordLadder, MoveAction::Word, &json!(" cord ")),
            Ok(Move::Word("cord".into()))
        );
        assert_eq!(
            dispatch(GameKind::Hangman, MoveAction::Letter, &json!("e")),
            Ok(Move::Letter('e'))
        );
        assert_eq!(
            dispatch(GameKind::GuessNumber, MoveAction::Number, &json!("42")),
            Ok(Move::Number(42))
        );
    }

    #[test]
    fn mismatched_pair_is_wrong_move_kind() {
        assert_eq!(
            dispatch(GameKind::Hangman, MoveAction::Drop, &json!(1)),
            Err(InvalidMove::WrongMoveKind)
        );
        assert_eq!(
            dispatch(GameKind::Anagram, MoveAction::Letter, &json!("a")),
            Err(InvalidMove::WrongMoveKind)
        );
    }

    #[test]
    fn unparsable_payloads_are_rejected() {
        assert!(matches!(
            dispatch(GameKind::GuessNumber, MoveAction::Number, &json!("ten")),
            Err(InvalidMove::Malformed { .. })
        ));
        assert!(matches!(
            dispatch(GameKind::ConnectFour, MoveAction::Drop, &json!(-1)),
            Err(InvalidMove::Malformed { .. })
        ));
        assert_eq!(
            dispatch(GameKind::Hangman, MoveAction::Letter, &json!("ab")),
            Err(InvalidMove::NotALetter)
        );
    }
}
