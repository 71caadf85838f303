use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::words::WordBank;

/// Unique identifier for a chat user taking part in a game.
pub type PlayerId = u64;

/// The six turn-based games the bot can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    ConnectFour,
    TicTacToe,
    WordLadder,
    Hangman,
    Anagram,
    GuessNumber,
}

impl GameKind {
    pub const ALL: [GameKind; 6] = [
        GameKind::ConnectFour,
        GameKind::TicTacToe,
        GameKind::WordLadder,
        GameKind::Hangman,
        GameKind::Anagram,
        GameKind::GuessNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectFour => "connect_four",
            Self::TicTacToe => "tic_tac_toe",
            Self::WordLadder => "word_ladder",
            Self::Hangman => "hangman",
            Self::Anagram => "anagram",
            Self::GuessNumber => "guess_number",
        }
    }

    /// Whether this game is started through a two-player challenge.
    pub fn is_challengeable(&self) -> bool {
        matches!(self, Self::ConnectFour | Self::TicTacToe | Self::WordLadder)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = String;

    /// Accepts both the snake_case names and the slash-command spellings
    /// (`connectfour`, `tictactoe`, `wordladder`, `guessthenumber`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "connectfour" => Ok(Self::ConnectFour),
            "tictactoe" => Ok(Self::TicTacToe),
            "wordladder" => Ok(Self::WordLadder),
            "hangman" => Ok(Self::Hangman),
            "anagram" => Ok(Self::Anagram),
            "guessnumber" | "guessthenumber" => Ok(Self::GuessNumber),
            _ => Err(format!("unknown game: {s}")),
        }
    }
}

/// Difficulty selected when a game is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Word-length tier: easy up to 4 letters, medium 5-6, hard 7 or more.
    pub fn for_word_len(len: usize) -> Self {
        match len {
            0..=4 => Self::Easy,
            5..=6 => Self::Medium,
            _ => Self::Hard,
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("unknown difficulty: {s}")),
        }
    }
}

/// Configuration chosen by whoever starts the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub difficulty: Difficulty,
}

/// Who is allowed to move while a session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPolicy {
    /// Participants take turns in seat order.
    Alternating,
    /// The single participant who started the game.
    Owner,
    /// Any participant, at any time (races).
    AnyParticipant,
    /// Anyone at all; the first correct answer wins.
    Open,
}

/// Game metadata used for session bookkeeping and the help listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub turn_policy: TurnPolicy,
}

/// A move submitted by a player. Each variant accepts exactly one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Move {
    /// Connect Four column, 0-based.
    Column(u8),
    /// Tic-Tac-Toe cell, 0-based row-major.
    Cell(u8),
    /// Word Ladder step or Anagram guess.
    Word(String),
    /// Hangman letter guess.
    Letter(char),
    /// Guess-the-Number guess.
    Number(i64),
}

/// The player making a move, with their seat when they have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: PlayerId,
    pub seat: Option<usize>,
}

/// Extra information attached to a non-terminal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hint {
    /// The secret number is higher than the guess.
    Higher,
    /// The secret number is lower than the guess.
    Lower,
    /// The guessed letter appears in the word.
    Hit,
    /// The guessed letter does not appear in the word.
    Miss,
    /// The guessed word is not the answer.
    Wrong,
}

/// Why a move was rejected. The session is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidMove {
    #[error("it's not your turn")]
    NotYourTurn,
    #[error("this is not your game")]
    NotAParticipant,
    #[error("this game does not accept that kind of move")]
    WrongMoveKind,
    #[error("expected {expected}")]
    Malformed { expected: String },
    #[error("column {column} does not exist")]
    ColumnOutOfRange { column: u8 },
    #[error("column {column} is full")]
    ColumnFull { column: u8 },
    #[error("cell {cell} does not exist")]
    CellOutOfRange { cell: u8 },
    #[error("cell {cell} is already taken")]
    CellOccupied { cell: u8 },
    #[error("'{word}' is not in the dictionary")]
    NotInDictionary { word: String },
    #[error("'{word}' must have {expected} letters")]
    WrongLength { word: String, expected: usize },
    #[error("'{word}' is not a valid move from '{from}'")]
    NotALadderStep { word: String, from: String },
    #[error("guess a single letter A-Z")]
    NotALetter,
    #[error("'{letter}' was already guessed")]
    AlreadyGuessed { letter: char },
    #[error("{guess} is outside {min}-{max}")]
    OutOfRange { guess: i64, min: i64, max: i64 },
}

/// Result of applying a move to a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveOutcome {
    Continue { hint: Option<Hint> },
    Invalid { error: InvalidMove },
    Win { player: PlayerId },
    /// Board exhausted without a winner; `lost` marks a solo loss (Hangman).
    Draw { lost: bool },
}

impl MoveOutcome {
    pub const CONTINUE: MoveOutcome = MoveOutcome::Continue { hint: None };

    pub fn invalid(error: InvalidMove) -> Self {
        Self::Invalid { error }
    }

    pub fn hint(hint: Hint) -> Self {
        Self::Continue { hint: Some(hint) }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Win { .. } | Self::Draw { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// Core trait every turn-based game implements.
///
/// The session owns turn enforcement and lifecycle; the game only validates
/// moves against its board and detects wins. A game is never consulted for a
/// move from a player who is not allowed to act.
pub trait TurnGame: Send + Sync {
    /// Game metadata for bookkeeping and the help listing.
    fn metadata(&self) -> GameMetadata;

    /// Which variant this is.
    fn kind(&self) -> GameKind;

    /// Called once with the seated players before the first move. Draws the
    /// secret word/number or the ladder pair from `words` and `rng`.
    fn init(
        &mut self,
        players: &[PlayerId],
        config: &GameConfig,
        words: &WordBank,
        rng: &mut dyn RngCore,
    );

    /// Validate and apply a move. `Invalid` must leave the state unchanged.
    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome;

    /// Public board state for rendering. Never contains the secret.
    fn view(&self) -> serde_json::Value;

    /// The secret (word or number), shown once the game is over.
    fn reveal(&self) -> Option<String> {
        None
    }
}

/// Generates `kind()` and `view()` for a game struct with a serializable
/// `state` field that holds only public data.
#[macro_export]
macro_rules! turn_game_boilerplate {
    (kind: $kind:expr) => {
        fn kind(&self) -> $crate::game_trait::GameKind {
            $kind
        }

        fn view(&self) -> serde_json::Value {
            serde_json::to_value(&self.state).unwrap_or(serde_json::Value::Null)
        }
    };
}
