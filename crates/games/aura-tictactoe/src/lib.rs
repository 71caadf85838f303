use rand::RngCore;
use serde::{Deserialize, Serialize};

use aura_core::game_trait::{
    Actor, GameConfig, GameKind, GameMetadata, InvalidMove, Move, MoveOutcome, PlayerId,
    TurnGame, TurnPolicy,
};
use aura_core::words::WordBank;

pub const SIZE: usize = 3;
pub const CELLS: usize = SIZE * SIZE;

/// The 8 winning lines as row-major cell indices.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn for_seat(seat: usize) -> Self {
        if seat == 0 { Self::X } else { Self::O }
    }
}

/// Which kind of line produced a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Row,
    Column,
    Diagonal,
}

/// First completed line on the board, if any.
pub fn winning_line(cells: &[Option<Mark>; CELLS]) -> Option<(Mark, LineKind)> {
    LINES.iter().enumerate().find_map(|(i, line)| {
        let first = cells[line[0]]?;
        if line.iter().all(|&c| cells[c] == Some(first)) {
            let kind = match i {
                0..=2 => LineKind::Row,
                3..=5 => LineKind::Column,
                _ => LineKind::Diagonal,
            };
            Some((first, kind))
        } else {
            None
        }
    })
}

/// Public Tic-Tac-Toe state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicTacToeState {
    /// Row-major 3x3 grid.
    pub cells: [Option<Mark>; CELLS],
    pub winning_line: Option<LineKind>,
}

/// Two-player Tic-Tac-Toe. Seat 0 plays X.
pub struct TicTacToe {
    state: TicTacToeState,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            state: TicTacToeState {
                cells: [None; CELLS],
                winning_line: None,
            },
        }
    }

    pub fn state(&self) -> &TicTacToeState {
        &self.state
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGame for TicTacToe {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Tic-Tac-Toe".to_string(),
            description: "Be the first to get three of your marks in a row.".to_string(),
            min_players: 2,
            max_players: 2,
            turn_policy: TurnPolicy::Alternating,
        }
    }

    fn init(
        &mut self,
        _players: &[PlayerId],
        _config: &GameConfig,
        _words: &WordBank,
        _rng: &mut dyn RngCore,
    ) {
        *self = Self::new();
        tracing::debug!("Tic-Tac-Toe board ready");
    }

    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome {
        let Move::Cell(cell) = *mv else {
            return MoveOutcome::invalid(InvalidMove::WrongMoveKind);
        };
        let Some(seat) = actor.seat else {
            return MoveOutcome::invalid(InvalidMove::NotAParticipant);
        };
        let index = cell as usize;
        if index >= CELLS {
            return MoveOutcome::invalid(InvalidMove::CellOutOfRange { cell });
        }
        if self.state.cells[index].is_some() {
            return MoveOutcome::invalid(InvalidMove::CellOccupied { cell });
        }

        self.state.cells[index] = Some(Mark::for_seat(seat));

        if let Some((_, kind)) = winning_line(&self.state.cells) {
            self.state.winning_line = Some(kind);
            return MoveOutcome::Win { player: actor.id };
        }
        if self.state.cells.iter().all(Option::is_some) {
            return MoveOutcome::Draw { lost: false };
        }
        MoveOutcome::CONTINUE
    }

    aura_core::turn_game_boilerplate!(kind: GameKind::TicTacToe);
}
