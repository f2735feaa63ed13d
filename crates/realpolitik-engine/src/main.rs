//! Game engine binary for the Realpolitik simulation.
//!
//! Wires the turn scheduler, the scripted decision provider, and the
//! observer API together, then plays the game until it ends.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line arguments
//! 2. Load configuration from `realpolitik-config.yaml`
//! 3. Initialize structured logging (tracing)
//! 4. Build the engine and the starting world
//! 5. Start the Observer API server
//! 6. Run the autoplay loop
//! 7. Log the result

mod observer_callback;
mod scripted;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use realpolitik_core::config::LoggingConfig;
use realpolitik_core::{GameConfig, GameEngine, runner};
use realpolitik_observer::server::ServerConfig;
use realpolitik_observer::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::observer_callback::ObserverCallback;
use crate::scripted::ScriptedProvider;

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn-based civilization simulation with scripted rulers")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "realpolitik-config.yaml")]
    config: PathBuf,

    /// Random seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Last turn to play (overrides config)
    #[arg(long)]
    max_turns: Option<u64>,

    /// Delay between turns in milliseconds (overrides config)
    #[arg(long)]
    turn_delay_ms: Option<u64>,

    /// Observer port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Do not start the Observer API server
    #[arg(long)]
    no_observer: bool,
}

impl Args {
    fn apply(&self, config: &mut GameConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_turns) = self.max_turns {
            config.max_turns = max_turns;
        }
        if let Some(delay) = self.turn_delay_ms {
            config.turn_delay_ms = delay;
        }
        if let Some(port) = self.port {
            config.observer.port = port;
        }
        if self.no_observer {
            config.observer.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1-2. Arguments and configuration. Logging depends on the config, so
    // the load outcome is reported once the subscriber exists.
    let args = Args::parse();
    let (mut config, from_file) = load_config(&args.config)?;
    args.apply(&mut config);

    // 3. Initialize structured logging.
    init_tracing(&config.logging);
    info!("realpolitik-engine starting");
    if from_file {
        info!(path = %args.config.display(), "Configuration loaded");
    } else {
        info!(path = %args.config.display(), "Config file not found, using defaults");
    }
    info!(
        map_width = config.map_width,
        map_height = config.map_height,
        civilizations = config.civilizations,
        max_turns = config.max_turns,
        seed = config.seed,
        observation_mode = %config.observation_mode,
        "Game configuration"
    );

    // 4. Build the engine and the starting world.
    let observer = config.observer.clone();
    let mut engine = GameEngine::new(config, Arc::new(ScriptedProvider::new()))
        .context("invalid game configuration")?;
    engine.initialize().context("failed to set up the starting world")?;
    info!(
        civs = engine.state().civs.len(),
        settlements = engine.state().settlements.len(),
        "Starting world created"
    );

    // 5. Start the Observer API server.
    let app_state = Arc::new(AppState::with_control(engine.control()));
    app_state.publish(&engine).await;
    let _observer_handle = if observer.enabled {
        let server_config = ServerConfig {
            host: observer.host,
            port: observer.port,
        };
        let handle = realpolitik_observer::spawn_observer(&server_config, Arc::clone(&app_state))
            .await
            .context("failed to start the observer server")?;
        info!(
            host = %server_config.host,
            port = server_config.port,
            "Observer API server started"
        );
        Some(handle)
    } else {
        info!("Observer disabled");
        None
    };

    // 6. Run the game.
    let mut callback = ObserverCallback::new(Arc::clone(&app_state));
    let outcome = runner::autoplay(&mut engine, &mut callback).await;
    app_state.publish(&engine).await;
    let result = outcome.context("game halted")?;

    // 7. Log results.
    runner::log_game_end(&result);
    for (rank, standing) in result.standings.iter().enumerate() {
        info!(
            rank = rank.saturating_add(1),
            civ = %standing.name,
            score = standing.score,
            "Final standing"
        );
    }

    info!(
        reason = ?result.reason,
        turns = result.turns,
        "realpolitik-engine shutdown complete"
    );
    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Returns whether the file was read.
fn load_config(path: &Path) -> Result<(GameConfig, bool)> {
    if path.exists() {
        let config = GameConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok((config, true))
    } else {
        let config = GameConfig::parse("").context("invalid environment override")?;
        Ok((config, false))
    }
}
