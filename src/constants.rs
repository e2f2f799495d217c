//! Default engine parameters.
//!
//! These values seed [`SearchConfig::default`](crate::config::SearchConfig)
//! and the command-line defaults of the demo binary.

// =============================================================================
// Search Parameters
// =============================================================================

/// Weight of the prior-driven exploration bonus in the selection formula.
pub const DEFAULT_EXPLORATION_RATE: f64 = std::f64::consts::SQRT_2;

/// Default number of root visits per move when no time limit is given.
pub const DEFAULT_PLAY_LIMIT: u32 = 800;

/// Number of search workers. One means single-threaded search.
pub const DEFAULT_WORKERS: usize = 1;

// =============================================================================
// Value Scale
// =============================================================================

/// Value credited to the winner of a finished game.
pub const WIN_VALUE: f64 = 1.0;

/// Value credited to either side of a drawn game.
pub const DRAW_VALUE: f64 = 0.5;

/// Value credited to the loser of a finished game.
pub const LOSS_VALUE: f64 = 0.0;

// =============================================================================
// Demo Binary
// =============================================================================

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Number of self-play games the demo runs by default.
pub const DEFAULT_SELF_PLAY_GAMES: u32 = 4;
