//! Integration tests for blackbird
//!
//! These drive the public engine API end to end on tic-tac-toe.

use std::time::Duration;

use blackbird::tictactoe::{CELLS, TicTacToe, TicTacToeState};
use blackbird::{Engine, EngineSnapshot, Game, SearchConfig, SearchError, UniformEvaluator};

// =============================================================================
// Helper functions
// =============================================================================

fn engine(config: SearchConfig) -> Engine<TicTacToe, UniformEvaluator> {
    Engine::new(TicTacToe, UniformEvaluator, config).unwrap()
}

fn position(moves: &[usize]) -> TicTacToeState {
    TicTacToeState::from_moves(moves).unwrap()
}

fn root_plays(engine: &Engine<TicTacToe, UniformEvaluator>) -> u32 {
    let tree = engine.tree().unwrap();
    tree.get(tree.root()).plays
}

// =============================================================================
// find_move
// =============================================================================

#[test]
fn test_find_move_returns_successor() {
    let mut engine = engine(SearchConfig::for_testing());
    let start = TicTacToeState::new();

    let result = engine.find_move(&start, None, None).unwrap();

    assert!(result.action < CELLS);
    assert_eq!(Some(result.state), TicTacToe.apply_action(&start, result.action));
    assert!((0.0..=1.0).contains(&result.value));
    assert_eq!(root_plays(&engine), 50);
}

#[test]
fn test_more_plays_extend_the_tree() {
    let mut engine = engine(SearchConfig::for_testing());
    let start = TicTacToeState::new();

    engine.find_move(&start, None, Some(40)).unwrap();
    assert_eq!(root_plays(&engine), 40);

    // The limit counts plays already at the root, so 10 more episodes run.
    engine.find_move(&start, None, Some(50)).unwrap();
    assert_eq!(root_plays(&engine), 50);
}

#[test]
fn test_time_limit_alone_is_a_budget() {
    let config = SearchConfig::for_testing().without_play_limit();
    let mut engine = engine(config);

    let result = engine.find_move(&TicTacToeState::new(), Some(Duration::from_millis(20)), None);
    assert!(result.is_ok());
    assert!(root_plays(&engine) > 0);
}

#[test]
fn test_find_move_without_budget() {
    let config = SearchConfig::for_testing().without_play_limit();
    let mut engine = engine(config);

    let result = engine.find_move(&TicTacToeState::new(), None, None);
    assert!(matches!(result, Err(SearchError::NoBudget)));
    assert!(engine.tree().is_none());
}

#[test]
fn test_find_move_root_mismatch() {
    let mut engine = engine(SearchConfig::for_testing());
    engine.find_move(&TicTacToeState::new(), None, None).unwrap();

    let result = engine.find_move(&position(&[4]), None, None);
    assert!(matches!(result, Err(SearchError::RootMismatch)));

    // The existing tree is kept.
    assert_eq!(root_plays(&engine), 50);
}

#[test]
fn test_find_move_on_finished_game() {
    let mut engine = engine(SearchConfig::for_testing());
    // X X X / O O . / . . .
    let finished = position(&[0, 3, 1, 4, 2]);

    let result = engine.find_move(&finished, None, Some(5));
    assert!(matches!(result, Err(SearchError::NotExpanded)));
}

#[test]
fn test_finds_winning_move() {
    let mut engine = engine(SearchConfig::for_testing());
    // X X . / O O . / . . .  with X to move: cell 2 wins.
    let state = position(&[0, 3, 1, 4]);

    let result = engine.find_move(&state, None, Some(500)).unwrap();
    assert_eq!(result.action, 2);
    assert_eq!(
        TicTacToe.winner(&result.state, Some(2)),
        blackbird::Outcome::Winner(blackbird::tictactoe::Player::Cross)
    );
}

#[test]
fn test_probabilities_cover_legal_actions() {
    let mut engine = engine(SearchConfig::for_testing());
    let state = position(&[4]);

    let result = engine.find_move(&state, None, None).unwrap();

    let total: f64 = result.probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(result.probabilities[4].abs() < 1e-12);
    assert!(result.probabilities.iter().all(|&p| p >= 0.0));
}

// =============================================================================
// Parallel search
// =============================================================================

#[test]
fn test_parallel_search_pools_worker_stats() {
    let config = SearchConfig::for_testing().with_play_limit(30).with_workers(3);
    let mut engine = engine(config);

    engine.find_move(&TicTacToeState::new(), None, None).unwrap();

    let tree = engine.tree().unwrap();
    let root = tree.root();
    assert_eq!(tree.get(root).plays, 90);

    // Workers return one ply, so the merged tree is the root and its children.
    assert_eq!(tree.len(), 1 + CELLS);
    let visits: u32 = tree.child_visit_counts(root).iter().sum();
    assert_eq!(visits, 3 * 29);
}

#[test]
fn test_parallel_search_reuses_tree() {
    let config = SearchConfig::for_testing().with_play_limit(20).with_workers(2);
    let mut engine = engine(config);
    let start = TicTacToeState::new();

    engine.find_move(&start, None, None).unwrap();
    engine.find_move(&start, None, None).unwrap();

    let tree = engine.tree().unwrap();
    assert_eq!(tree.get(tree.root()).plays, 80);
    assert_eq!(tree.len(), 1 + CELLS);
}

// =============================================================================
// Root lifecycle
// =============================================================================

#[test]
fn test_move_root_keeps_child_stats() {
    let mut engine = engine(SearchConfig::for_testing().with_play_limit(100));
    let start = TicTacToeState::new();
    let result = engine.find_move(&start, None, None).unwrap();

    let (plays, value) = {
        let tree = engine.tree().unwrap();
        let child = tree.get(tree.root()).child(result.action).unwrap();
        (tree.get(child).plays, tree.get(child).value)
    };

    engine.move_root(std::slice::from_ref(&result.state));

    let tree = engine.tree().unwrap();
    let root = tree.get(tree.root());
    assert_eq!(root.state, result.state);
    assert_eq!(root.plays, plays);
    assert!((root.value - value).abs() < 1e-12);
}

#[test]
fn test_move_root_then_search_continues() {
    let mut engine = engine(SearchConfig::for_testing().with_play_limit(100));
    let result = engine.find_move(&TicTacToeState::new(), None, None).unwrap();

    engine.move_root(std::slice::from_ref(&result.state));
    let reply = engine.find_move(&result.state, None, None).unwrap();

    assert_eq!(root_plays(&engine), 100);
    assert_eq!(
        Some(reply.state),
        TicTacToe.apply_action(&result.state, reply.action)
    );
}

#[test]
fn test_move_root_unknown_state_drops_tree() {
    let mut engine = engine(SearchConfig::for_testing());
    engine.find_move(&TicTacToeState::new(), None, None).unwrap();

    // Two plies deep, so no child of the root holds it.
    engine.move_root(&[position(&[0, 1])]);
    assert!(engine.tree().is_none());
}

#[test]
fn test_move_root_without_tree() {
    let mut engine = engine(SearchConfig::for_testing());
    engine.move_root(&[position(&[0])]);
    assert!(engine.tree().is_none());
}

#[test]
fn test_reset_root_returns_to_top() {
    let mut engine = engine(SearchConfig::for_testing());
    let start = TicTacToeState::new();
    let result = engine.find_move(&start, None, None).unwrap();

    engine.move_root(std::slice::from_ref(&result.state));
    engine.reset_root();

    let tree = engine.tree().unwrap();
    assert_eq!(tree.get(tree.root()).state, start);
    assert!(tree.get(tree.root()).is_root());
    assert_eq!(root_plays(&engine), 50);
}

#[test]
fn test_drop_root_allows_new_position() {
    let mut engine = engine(SearchConfig::for_testing());
    engine.find_move(&TicTacToeState::new(), None, None).unwrap();

    engine.drop_root();
    assert!(engine.tree().is_none());

    let other = position(&[4]);
    engine.find_move(&other, None, None).unwrap();
    let tree = engine.tree().unwrap();
    assert_eq!(tree.get(tree.root()).state, other);
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn test_snapshot_round_trip() {
    let mut engine = engine(SearchConfig::for_testing());
    let start = TicTacToeState::new();
    engine.find_move(&start, None, None).unwrap();

    let json = serde_json::to_string(&engine.snapshot()).unwrap();
    let snapshot: EngineSnapshot<TicTacToeState> = serde_json::from_str(&json).unwrap();
    let mut restored = Engine::from_snapshot(TicTacToe, UniformEvaluator, snapshot).unwrap();

    assert_eq!(restored.config().play_limit, engine.config().play_limit);
    assert_eq!(restored.config().seed, engine.config().seed);
    assert!((restored.config().exploration_rate - engine.config().exploration_rate).abs() < 1e-9);
    assert_eq!(root_plays(&restored), 50);
    assert_eq!(restored.tree().unwrap().len(), engine.tree().unwrap().len());

    restored.find_move(&start, None, Some(60)).unwrap();
    assert_eq!(root_plays(&restored), 60);
}

#[test]
fn test_empty_snapshot() {
    let engine = engine(SearchConfig::for_testing().with_workers(2));
    let snapshot = engine.snapshot();
    assert!(snapshot.tree.is_none());

    let restored = Engine::from_snapshot(TicTacToe, UniformEvaluator, snapshot).unwrap();
    assert_eq!(restored.config().workers, 2);
    assert!(restored.tree().is_none());
}

#[test]
fn test_snapshot_with_empty_arena_is_rejected() {
    let json = r#"{"config":{},"tree":{"nodes":[],"root":0}}"#;
    let snapshot: EngineSnapshot<TicTacToeState> = serde_json::from_str(json).unwrap();

    let result = Engine::from_snapshot(TicTacToe, UniformEvaluator, snapshot);
    assert!(matches!(result, Err(SearchError::InvalidTree(_))));
}

#[test]
fn test_snapshot_with_dangling_child_is_rejected() {
    let mut engine = engine(SearchConfig::for_testing());
    engine.find_move(&TicTacToeState::new(), None, None).unwrap();

    let mut value = serde_json::to_value(engine.snapshot()).unwrap();
    value["tree"]["nodes"][0]["children"][0] = serde_json::json!(100_000);
    let snapshot: EngineSnapshot<TicTacToeState> = serde_json::from_value(value).unwrap();

    let result = Engine::from_snapshot(TicTacToe, UniformEvaluator, snapshot);
    assert!(matches!(result, Err(SearchError::InvalidTree(_))));
}
