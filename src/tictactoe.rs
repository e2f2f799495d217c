//! Tic-tac-toe, the reference game used by the demo binary, tests and
//! benchmarks.
//!
//! Cells are numbered row by row:
//!
//! ```text
//! 0 | 1 | 2
//! 3 | 4 | 5
//! 6 | 7 | 8
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{Game, Outcome};

/// Number of cells, which is also the size of the action space.
pub const CELLS: usize = 9;

/// Every winning line on the board.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Cross,
    Nought,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Cross => Player::Nought,
            Player::Nought => Player::Cross,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Cross => write!(f, "X"),
            Player::Nought => write!(f, "O"),
        }
    }
}

/// A tic-tac-toe position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicTacToeState {
    pub cells: [Option<Player>; CELLS],
    pub to_move: Player,
}

impl Default for TicTacToeState {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToeState {
    /// The empty board with Cross to move.
    pub fn new() -> Self {
        Self {
            cells: [None; CELLS],
            to_move: Player::Cross,
        }
    }

    /// Replay a sequence of cells from the empty board.
    ///
    /// Returns `None` if any move targets an occupied or out-of-range cell.
    pub fn from_moves(moves: &[usize]) -> Option<Self> {
        moves
            .iter()
            .try_fold(Self::new(), |state, &cell| state.play(cell))
    }

    /// Place the mover's mark on `cell`.
    pub fn play(&self, cell: usize) -> Option<Self> {
        if self.cells.get(cell)?.is_some() {
            return None;
        }
        let mut next = *self;
        next.cells[cell] = Some(self.to_move);
        next.to_move = self.to_move.opponent();
        Some(next)
    }

    fn line_owner(&self, line: &[usize; 3]) -> Option<Player> {
        let first = self.cells[line[0]]?;
        line.iter()
            .all(|&cell| self.cells[cell] == Some(first))
            .then_some(first)
    }

    fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

impl fmt::Display for TicTacToeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(3) {
            let marks: Vec<String> = row
                .iter()
                .map(|cell| cell.map_or(".".to_string(), |p| p.to_string()))
                .collect();
            writeln!(f, "{}", marks.join(" "))?;
        }
        Ok(())
    }
}

/// Tic-tac-toe rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToe;

impl Game for TicTacToe {
    type State = TicTacToeState;
    type Player = Player;

    fn action_count(&self) -> usize {
        CELLS
    }

    fn player_to_move(&self, state: &TicTacToeState) -> Player {
        state.to_move
    }

    fn apply_action(&self, state: &TicTacToeState, action: usize) -> Option<TicTacToeState> {
        state.play(action)
    }

    fn legal_actions(&self, state: &TicTacToeState) -> Vec<bool> {
        if self.winner(state, None).is_terminal() {
            return vec![false; CELLS];
        }
        state.cells.iter().map(Option::is_none).collect()
    }

    fn winner(&self, state: &TicTacToeState, last_action: Option<usize>) -> Outcome<Player> {
        let owner = match last_action {
            // Only lines through the last move can have just been completed.
            Some(cell) => LINES
                .iter()
                .filter(|line| line.contains(&cell))
                .find_map(|line| state.line_owner(line)),
            None => LINES.iter().find_map(|line| state.line_owner(line)),
        };

        match owner {
            Some(player) => Outcome::Winner(player),
            None if state.is_full() => Outcome::Draw,
            None => Outcome::Ongoing,
        }
    }
}
