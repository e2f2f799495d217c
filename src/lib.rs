//! Blackbird: a generic Monte Carlo Tree Search engine.
//!
//! The engine searches any two-player, alternating-move game with a fixed
//! action space. Game rules come in through the [`Game`] trait, priors and
//! leaf values through the [`Evaluator`] trait, and the engine keeps its
//! tree between calls so statistics survive from move to move.
//!
//! ## Modules
//!
//! - [`config`] - Search configuration, TOML loading
//! - [`constants`] - Default engine parameters and outcome values
//! - [`error`] - Error types
//! - [`evaluator`] - Evaluator trait and the per-episode hook
//! - [`game`] - Game rules trait
//! - [`node`] - Tree nodes and ids
//! - [`playout`] - Random playouts for leaf evaluation
//! - [`search`] - The engine: budgets, parallel workers, root lifecycle
//! - [`tictactoe`] - Reference game
//! - [`tree`] - Arena tree, selection statistics, backpropagation, merging
//!
//! ## Example
//!
//! ```
//! use blackbird::{Engine, SearchConfig, UniformEvaluator};
//! use blackbird::tictactoe::{TicTacToe, TicTacToeState};
//!
//! let config = SearchConfig::default().with_play_limit(200).with_seed(1);
//! let mut engine = Engine::new(TicTacToe, UniformEvaluator, config).unwrap();
//!
//! // Search the empty board
//! let start = TicTacToeState::new();
//! let result = engine.find_move(&start, None, None).unwrap();
//! println!("Best cell: {}", result.action);
//!
//! // Keep the subtree below the chosen move for the next search
//! engine.move_root(&[result.state]);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod evaluator;
pub mod game;
pub mod node;
pub mod playout;
pub mod search;
pub mod tictactoe;
pub mod tree;

pub use config::SearchConfig;
pub use error::{ConfigError, SearchError};
pub use evaluator::{Evaluator, UniformEvaluator};
pub use game::{Game, Outcome};
pub use node::{Node, NodeId};
pub use search::{Engine, EngineSnapshot, SearchContext, SearchResult};
pub use tree::{Tree, TreeStats};
