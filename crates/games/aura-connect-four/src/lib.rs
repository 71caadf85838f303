pub mod board;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use aura_core::game_trait::{
    Actor, GameConfig, GameKind, GameMetadata, InvalidMove, Move, MoveOutcome, PlayerId,
    TurnGame, TurnPolicy,
};
use aura_core::words::WordBank;

use board::{Board, COLS, Disc};

/// Public Connect Four state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectFourState {
    pub board: Board,
    /// Colour of each seat, in seat order.
    pub discs: Vec<Disc>,
    /// Cell filled by the most recent drop, as (row, column).
    pub last_drop: Option<(usize, usize)>,
}

/// Two-player Connect Four on a 6x7 grid.
pub struct ConnectFour {
    state: ConnectFourState,
}

impl ConnectFour {
    pub fn new() -> Self {
        Self {
            state: ConnectFourState {
                board: Board::new(),
                discs: vec![Disc::Red, Disc::Yellow],
                last_drop: None,
            },
        }
    }

    pub fn state(&self) -> &ConnectFourState {
        &self.state
    }
}

impl Default for ConnectFour {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGame for ConnectFour {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Connect Four".to_string(),
            description: "Be the first to get four discs in a row.".to_string(),
            min_players: 2,
            max_players: 2,
            turn_policy: TurnPolicy::Alternating,
        }
    }

    fn init(
        &mut self,
        players: &[PlayerId],
        _config: &GameConfig,
        _words: &WordBank,
        _rng: &mut dyn RngCore,
    ) {
        self.state.board = Board::new();
        self.state.discs = (0..players.len()).map(Disc::for_seat).collect();
        self.state.last_drop = None;
        tracing::debug!(players = players.len(), "Connect Four board ready");
    }

    fn apply_move(&mut self, actor: Actor, mv: &Move) -> MoveOutcome {
        let Move::Column(column) = *mv else {
            return MoveOutcome::invalid(InvalidMove::WrongMoveKind);
        };
        let Some(seat) = actor.seat else {
            return MoveOutcome::invalid(InvalidMove::NotAParticipant);
        };
        let col = column as usize;
        if col >= COLS {
            return MoveOutcome::invalid(InvalidMove::ColumnOutOfRange { column });
        }

        let disc = Disc::for_seat(seat);
        let Some(row) = self.state.board.drop_disc(col, disc) else {
            return MoveOutcome::invalid(InvalidMove::ColumnFull { column });
        };
        self.state.last_drop = Some((row, col));

        if self.state.board.has_four(disc) {
            tracing::debug!(board = ?self.state.board.rows(), ?disc, "Connect Four won");
            return MoveOutcome::Win { player: actor.id };
        }
        if self.state.board.is_full() {
            return MoveOutcome::Draw { lost: false };
        }
        MoveOutcome::CONTINUE
    }

    aura_core::turn_game_boilerplate!(kind: GameKind::ConnectFour);
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_helpers::{
        contract_init_produces_view, contract_invalid_move_changes_nothing,
        contract_rejects_foreign_move_kind, init_game, seated,
    };
    use board::ROWS;

    fn started() -> ConnectFour {
        let mut game = ConnectFour::new();
        init_game(&mut game, 2, GameConfig::default(), 1);
        game
    }

    fn play(game: &mut ConnectFour, seat: usize, column: u8) -> MoveOutcome {
        game.apply_move(seated(seat as PlayerId + 1, seat), &Move::Column(column))
    }

    #[test]
    fn contract_suite() {
        let mut game = ConnectFour::new();
        contract_init_produces_view(&mut game, 2);
        contract_rejects_foreign_move_kind(&mut game, seated(1, 0), &Move::Cell(4));
        contract_invalid_move_changes_nothing(&mut game, seated(1, 0), &Move::Column(7));
    }

    #[test]
    fn vertical_win_for_seat_zero() {
        let mut game = started();
        for _ in 0..3 {
            assert_eq!(play(&mut game, 0, 0), MoveOutcome::CONTINUE);
            assert_eq!(play(&mut game, 1, 1), MoveOutcome::CONTINUE);
        }
        assert_eq!(play(&mut game, 0, 0), MoveOutcome::Win { player: 1 });
    }

    #[test]
    fn full_column_is_invalid_and_board_unchanged() {
        let mut game = started();
        for i in 0..ROWS {
            play(&mut game, i % 2, 2);
        }
        let before = game.state().board.clone();
        assert_eq!(
            play(&mut game, 0, 2),
            MoveOutcome::invalid(InvalidMove::ColumnFull { column: 2 })
        );
        assert_eq!(game.state().board, before);
    }

    #[test]
    fn last_drop_tracks_landing_cell() {
        let mut game = started();
        play(&mut game, 0, 4);
        play(&mut game, 1, 4);
        assert_eq!(game.state().last_drop, Some((4, 4)));
    }

    #[test]
    fn filling_the_board_without_a_line_is_a_draw() {
        // Rows alternate RRYYRRY / YYRRYYR, which contains no line of four.
        const EVEN: [Disc; COLS] = [
            Disc::Red,
            Disc::Red,
            Disc::Yellow,
            Disc::Yellow,
            Disc::Red,
            Disc::Red,
            Disc::Yellow,
        ];
        let mut game = started();
        for row in 0..ROWS {
            for col in 0..COLS {
                let disc = if row % 2 == 0 {
                    EVEN[col]
                } else if EVEN[col] == Disc::Red {
                    Disc::Yellow
                } else {
                    Disc::Red
                };
                game.state.board.set(row, col, Some(disc));
            }
        }
        assert!(!game.state.board.has_four(Disc::Red));
        assert!(!game.state.board.has_four(Disc::Yellow));

        // Leave the top-left cell open; red completes the board.
        game.state.board.set(0, 0, None);
        assert_eq!(play(&mut game, 0, 0), MoveOutcome::Draw { lost: false });
    }

    #[test]
    fn view_exposes_board_and_discs() {
        let game = started();
        let view = game.view();
        assert_eq!(view["discs"], serde_json::json!(["red", "yellow"]));
        assert!(view["board"]["cells"].is_array());
    }
}
