//! Blackbird: a generic MCTS engine, driven here on tic-tac-toe.
//!
//! ## Usage
//!
//! - `blackbird` - Show a demo
//! - `blackbird demo` - Search the empty board and print the distribution
//! - `blackbird self-play --games 10` - Let the engine play itself

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use blackbird::constants::{DEFAULT_LOG_LEVEL, DEFAULT_SELF_PLAY_GAMES};
use blackbird::tictactoe::{Player, TicTacToe, TicTacToeState};
use blackbird::{Engine, Game, Outcome, SearchConfig, UniformEvaluator};

/// Blackbird: a generic Monte Carlo Tree Search engine
#[derive(Parser)]
#[command(name = "blackbird")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with search settings
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    /// Root visit budget per move
    #[arg(long)]
    play_limit: Option<u32>,

    /// Wall-clock budget per move, in milliseconds
    #[arg(long)]
    time_ms: Option<u64>,

    /// Number of parallel search workers
    #[arg(long)]
    workers: Option<usize>,

    /// Seed for reproducible searches
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the empty board once and print the result
    Demo,
    /// Play the engine against itself
    SelfPlay {
        /// Number of games to play
        #[arg(long, default_value_t = DEFAULT_SELF_PLAY_GAMES)]
        games: u32,
    },
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

impl Cli {
    /// File settings first, then command-line overrides.
    fn search_config(&self) -> Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::load_from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SearchConfig::default(),
        };

        if let Some(plays) = self.play_limit {
            config = config.with_play_limit(plays);
        }
        if let Some(ms) = self.time_ms {
            config = config.with_time_limit(Duration::from_millis(ms));
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.search_config()?;
    info!(?config, "Starting blackbird");
    let mut engine = Engine::new(TicTacToe, UniformEvaluator, config)?;

    match cli.command {
        Some(Commands::SelfPlay { games }) => run_self_play(&mut engine, games),
        Some(Commands::Demo) | None => run_demo(&mut engine),
    }
}

fn run_demo(engine: &mut Engine<TicTacToe, UniformEvaluator>) -> Result<()> {
    println!("Blackbird: Monte Carlo Tree Search on tic-tac-toe\n");

    let start = TicTacToeState::new();
    let result = engine.find_move(&start, None, None)?;

    println!("=== Selection distribution ===");
    for row in result.probabilities.chunks(3) {
        let cells: Vec<String> = row.iter().map(|p| format!("{:5.1}%", p * 100.0)).collect();
        println!("{}", cells.join(" "));
    }

    if let Some(stats) = engine.tree().map(|tree| tree.stats()) {
        println!(
            "\nNodes: {}, root plays: {}, depth: {}",
            stats.total_nodes, stats.root_plays, stats.max_depth
        );
    }
    println!("Best cell: {}", result.action);
    println!("Root value: {:.1}%", result.value * 100.0);
    println!("\n{}", result.state);
    Ok(())
}

fn run_self_play(engine: &mut Engine<TicTacToe, UniformEvaluator>, games: u32) -> Result<()> {
    let mut crosses = 0;
    let mut noughts = 0;
    let mut draws = 0;

    for game_index in 0..games {
        let mut state = TicTacToeState::new();
        let outcome = loop {
            let result = engine.find_move(&state, None, None)?;
            engine.move_root(std::slice::from_ref(&result.state));
            state = result.state;

            let outcome = engine.game().winner(&state, Some(result.action));
            if outcome.is_terminal() {
                break outcome;
            }
        };
        engine.drop_root();

        match outcome {
            Outcome::Winner(Player::Cross) => crosses += 1,
            Outcome::Winner(Player::Nought) => noughts += 1,
            Outcome::Draw | Outcome::Ongoing => draws += 1,
        }
        info!(game = game_index + 1, ?outcome, "Game finished");
        println!("Game {}: {:?}\n{}", game_index + 1, outcome, state);
    }

    println!("X wins: {crosses}, O wins: {noughts}, draws: {draws}");
    Ok(())
}
