//! The game engine facade.
//!
//! [`GameEngine`] owns the game state and everything a turn needs. Callers
//! drive it through the lifecycle (`initialize`, `start`, `pause`,
//! `resume`, `stop`), step it with [`GameEngine::run_turn`] or hand it to
//! the autoplay [`runner`](crate::runner), subscribe to notifications with
//! [`GameEngine::on`], and read presentation snapshots through accessors
//! that honor the current observation mode.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use realpolitik_agents::{AgentError, BehaviorObserver, IntentParser, ScoreBreakdown, TechTree};
use realpolitik_types::{CivId, GameStatus, NotificationKind, ObservationMode, StateView};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::analytics::{self, Analytics, AnalyticsExport, Standing};
use crate::config::{ConfigError, GameConfig};
use crate::control::{ControlError, ControlState};
use crate::decision::DecisionProvider;
use crate::events::{Callback, Notification, NotificationBus};
use crate::setup::{self, SetupError};
use crate::snapshot::{self, CivSnapshot, GameSnapshot, MapView, SnapshotSource};
use crate::state::{GameState, Thought};
use crate::turn::{self, TurnContext, TurnError, TurnSummary};
use crate::view;

/// Errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration failed validation.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The world could not be built.
    #[error("setup error: {source}")]
    Setup {
        /// The underlying setup error.
        #[from]
        source: SetupError,
    },

    /// The action adapter could not be compiled.
    #[error("intent parser error: {source}")]
    Parser {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A lifecycle transition was refused.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// A turn failed; the game has stopped.
    #[error("turn error: {source}")]
    Turn {
        /// The underlying turn error.
        #[from]
        source: TurnError,
    },
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The turn counter reached `max_turns`.
    MaxTurns,
    /// `stop` was invoked.
    Stopped,
    /// The decision provider failed.
    ProviderFailure,
}

/// Final report produced once per game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Why the game ended.
    pub reason: EndReason,
    /// Turns played.
    pub turns: u64,
    /// Highest composite score, ties to the earliest civ.
    pub winner: Option<CivId>,
    /// Final scores, best first.
    pub standings: Vec<Standing>,
}

/// A single game.
pub struct GameEngine {
    config: GameConfig,
    tree: TechTree,
    parser: IntentParser,
    provider: Arc<dyn DecisionProvider>,
    state: GameState,
    control: Arc<ControlState>,
    observer: BehaviorObserver,
    analytics: Analytics,
    bus: NotificationBus,
    rng: Box<dyn RngCore + Send + Sync>,
    result: Option<GameResult>,
}

impl GameEngine {
    /// Validate `config` and prepare an engine in the initializing state.
    pub fn new(config: GameConfig, provider: Arc<dyn DecisionProvider>) -> Result<Self, EngineError> {
        let tree = TechTree::new();
        config.validate(&tree)?;
        let parser = IntentParser::new()?;
        let control = Arc::new(ControlState::new(
            config.observation_mode,
            config.turn_delay_ms,
        ));
        Ok(Self {
            observer: BehaviorObserver::new(config.detection.clone()),
            rng: Box::new(StdRng::seed_from_u64(config.seed)),
            config,
            tree,
            parser,
            provider,
            state: GameState::empty(),
            control,
            analytics: Analytics::new(),
            bus: NotificationBus::new(),
            result: None,
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Build the world and move to `ready`.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        let status = self.control.status();
        if status != GameStatus::Initializing {
            return Err(ControlError::InvalidTransition {
                action: "initialize",
                from: status,
            }
            .into());
        }
        self.state = setup::build(&self.config, &self.tree, self.rng.as_mut())?;
        self.control.mark_ready()?;
        info!(
            civilizations = self.state.civs.len(),
            width = self.config.map_width,
            height = self.config.map_height,
            seed = self.config.seed,
            "Game initialized"
        );
        Ok(())
    }

    /// `ready -> running`.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.control.start()?;
        self.bus
            .emit(&Notification::bare(NotificationKind::GameStart, self.state.turn));
        Ok(())
    }

    /// `running -> paused`. A pending autoplay delay is cancelled before
    /// this returns.
    pub fn pause(&self) -> Result<(), EngineError> {
        self.control.pause()?;
        Ok(())
    }

    /// `paused -> running`.
    pub fn resume(&self) -> Result<(), EngineError> {
        self.control.resume()?;
        Ok(())
    }

    /// Stop the game, determine the winner, and report final scores.
    ///
    /// Also completes a stop requested directly on the shared control
    /// state, for instance by the observer API.
    pub fn stop(&mut self) -> Result<&GameResult, EngineError> {
        if self.result.is_some() {
            return Err(ControlError::InvalidTransition {
                action: "stop",
                from: GameStatus::Stopped,
            }
            .into());
        }
        if !self.control.is_stopped() {
            self.control.stop()?;
        }
        Ok(self.finish(EndReason::Stopped))
    }

    fn finish(&mut self, reason: EndReason) -> &GameResult {
        if !self.control.is_stopped() {
            // Only fails when already stopped.
            let _ = self.control.stop();
        }
        let state = &self.state;
        let bus = &self.bus;
        self.result.get_or_insert_with(|| {
            let standings = analytics::standings(state);
            let winner = standings.first().map(|s| s.civ);
            info!(?reason, turns = state.turn, winner = ?winner.map(|w| state.civ_name(w)), "Game over");
            for s in &standings {
                info!(civ = %s.name, score = s.score, "Final score");
            }
            bus.emit(&Notification {
                kind: NotificationKind::GameEnd,
                turn: state.turn,
                event: None,
                winner,
            });
            GameResult {
                reason,
                turns: state.turn,
                winner,
                standings,
            }
        })
    }

    /// Final report, once the game has ended.
    pub const fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Whether the game has ended.
    pub const fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    // -----------------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------------

    /// Run one turn. Only a `running` game advances.
    ///
    /// Reaching `max_turns` ends the game. A provider failure ends it too
    /// and is returned as an error.
    pub async fn run_turn(&mut self) -> Result<TurnSummary, EngineError> {
        let status = self.control.status();
        if status != GameStatus::Running || self.is_finished() {
            return Err(ControlError::InvalidTransition {
                action: "run a turn of",
                from: status,
            }
            .into());
        }
        let next = self.state.turn.saturating_add(1);
        self.bus
            .emit(&Notification::bare(NotificationKind::TurnStart, next));

        let ctx = TurnContext {
            config: &self.config,
            tree: &self.tree,
            parser: &self.parser,
            provider: &self.provider,
        };
        let outcome = turn::run_turn(
            &mut self.state,
            ctx,
            &mut self.observer,
            &mut self.analytics,
            self.rng.as_mut(),
        )
        .await;
        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Turn failed, stopping the game");
                self.finish(EndReason::ProviderFailure);
                return Err(e.into());
            }
        };

        self.bus.emit_events(&summary.events);
        self.bus
            .emit(&Notification::bare(NotificationKind::TurnEnd, summary.turn));
        self.control.set_turn(summary.turn);
        if summary.turn >= self.config.max_turns {
            self.finish(EndReason::MaxTurns);
        }
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Wiring
    // -----------------------------------------------------------------------

    /// Subscribe to a notification kind.
    pub fn on(&mut self, kind: NotificationKind, callback: Callback) {
        self.bus.on(kind, callback);
    }

    /// Replace the random source.
    pub fn set_rng(&mut self, rng: Box<dyn RngCore + Send + Sync>) {
        self.rng = rng;
    }

    /// Shared lifecycle state.
    pub fn control(&self) -> Arc<ControlState> {
        Arc::clone(&self.control)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.control.status()
    }

    /// Configuration in use.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Technology tree in use.
    pub const fn tree(&self) -> &TechTree {
        &self.tree
    }

    /// Game state.
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable game state, for scenario setup.
    pub const fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Behavior observer.
    pub const fn observer(&self) -> &BehaviorObserver {
        &self.observer
    }

    // -----------------------------------------------------------------------
    // Presentation
    // -----------------------------------------------------------------------

    fn source(&self) -> SnapshotSource<'_> {
        SnapshotSource {
            state: &self.state,
            observer: &self.observer,
            tree: &self.tree,
            status: self.control.status(),
        }
    }

    /// Full snapshot in the current observation mode.
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot_as(self.control.observation_mode())
    }

    /// Full snapshot redacted for `mode`. The observer stores the
    /// omniscient one and redacts per request.
    pub fn snapshot_as(&self, mode: ObservationMode) -> GameSnapshot {
        snapshot::game_snapshot(self.source(), mode)
    }

    /// One civ's details in the current observation mode.
    pub fn civ_details(&self, civ: CivId) -> Option<CivSnapshot> {
        snapshot::civ_snapshot(self.source(), civ, self.control.observation_mode())
    }

    /// Tiles `civ` has revealed.
    pub fn visible_map(&self, civ: CivId) -> Option<MapView> {
        snapshot::visible_map(&self.state, civ)
    }

    /// The view a provider would receive for `civ` right now.
    pub fn view_for(&self, civ: CivId) -> Option<StateView> {
        view::build_view(&self.state, civ, &self.tree, &self.config.memory)
    }

    /// Analytics export.
    pub fn analytics_export(&self) -> AnalyticsExport {
        analytics::export(&self.state, &self.observer, &self.analytics)
    }

    /// Machiavellian scores; `None` unless the mode exposes thoughts.
    pub fn machiavellian_scores(&self) -> Option<BTreeMap<CivId, ScoreBreakdown>> {
        self.control
            .observation_mode()
            .exposes_thoughts()
            .then(|| analytics::machiavellian_scores(&self.state, &self.observer, &self.tree))
    }

    /// Private thoughts; `None` unless the mode exposes them.
    pub fn thoughts(&self, civ: CivId) -> Option<&[Thought]> {
        if !self.control.observation_mode().exposes_thoughts() {
            return None;
        }
        Some(self.state.thoughts.get(&civ).map_or(&[], Vec::as_slice))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::decision::IdleProvider;

    fn config(max_turns: u64) -> GameConfig {
        GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            max_turns,
            turn_delay_ms: 0,
            random_events: false,
            ..GameConfig::default()
        }
    }

    fn engine(max_turns: u64) -> GameEngine {
        let mut engine = GameEngine::new(config(max_turns), Arc::new(IdleProvider::new())).unwrap();
        engine.initialize().unwrap();
        engine
    }

    #[test]
    fn bad_config_halts_before_start() {
        let bad = GameConfig {
            civilizations: 0,
            ..config(5)
        };
        assert!(matches!(
            GameEngine::new(bad, Arc::new(IdleProvider::new())),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut engine = engine(5);
        assert_eq!(engine.status(), GameStatus::Ready);
        assert!(matches!(engine.initialize(), Err(EngineError::Control(_))));
        assert_eq!(engine.status(), GameStatus::Ready);
    }

    #[tokio::test]
    async fn reaching_max_turns_ends_the_game() {
        let mut engine = engine(2);
        engine.start().unwrap();
        engine.run_turn().await.unwrap();
        assert!(!engine.is_finished());
        engine.run_turn().await.unwrap();
        let result = engine.result().unwrap();
        assert_eq!(result.reason, EndReason::MaxTurns);
        assert_eq!(result.turns, 2);
        assert_eq!(result.winner, Some(engine.state().civs[0].id));
        assert_eq!(engine.status(), GameStatus::Stopped);
        assert!(engine.run_turn().await.is_err());
    }

    #[tokio::test]
    async fn turns_require_a_running_game() {
        let mut engine = engine(5);
        let err = engine.run_turn().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Control(ControlError::InvalidTransition {
                from: GameStatus::Ready,
                ..
            })
        ));
        assert_eq!(engine.state().turn, 0);

        engine.start().unwrap();
        engine.run_turn().await.unwrap();
        engine.pause().unwrap();
        let err = engine.run_turn().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Control(ControlError::InvalidTransition {
                from: GameStatus::Paused,
                ..
            })
        ));
        assert_eq!(engine.state().turn, 1);
        assert_eq!(engine.status(), GameStatus::Paused);

        engine.resume().unwrap();
        engine.run_turn().await.unwrap();
        assert_eq!(engine.state().turn, 2);
    }

    #[tokio::test]
    async fn stop_reports_once() {
        let mut engine = engine(10);
        engine.start().unwrap();
        engine.run_turn().await.unwrap();
        let result = engine.stop().unwrap().clone();
        assert_eq!(result.reason, EndReason::Stopped);
        assert_eq!(result.standings.len(), 2);
        assert!(engine.stop().is_err());
    }

    #[tokio::test]
    async fn notifications_fire_in_order() {
        let mut engine = engine(1);
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            NotificationKind::GameStart,
            NotificationKind::TurnStart,
            NotificationKind::TurnEnd,
            NotificationKind::GameEnd,
        ] {
            let log = Arc::clone(&log);
            engine.on(kind, Box::new(move |n| log.lock().unwrap().push(n.kind)));
        }
        engine.start().unwrap();
        engine.run_turn().await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                NotificationKind::GameStart,
                NotificationKind::TurnStart,
                NotificationKind::TurnEnd,
                NotificationKind::GameEnd,
            ]
        );
    }

    #[test]
    fn thoughts_are_gated_by_mode() {
        let mut engine = engine(5);
        let civ = engine.state().civs[0].id;
        engine.state_mut().thoughts.entry(civ).or_default().push(Thought {
            turn: 0,
            text: "secret".into(),
        });
        assert_eq!(engine.thoughts(civ).unwrap().len(), 1);
        assert!(engine.machiavellian_scores().is_some());
        engine.control().set_observation_mode(ObservationMode::Public);
        assert!(engine.thoughts(civ).is_none());
        assert!(engine.machiavellian_scores().is_none());
    }
}
