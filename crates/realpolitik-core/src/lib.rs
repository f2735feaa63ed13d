//! Game state, turn scheduler, and orchestration for the Realpolitik
//! simulation.
//!
//! This crate owns the turn cycle: economy, decisions, application in
//! creation order, maintenance, and observation. [`GameEngine`] wraps it
//! with a lifecycle, notifications, and read-only snapshots.
//!
//! # Modules
//!
//! - [`actions`] -- Applying decisions: development, diplomatic, and covert
//!   commands plus free-text lines.
//! - [`analytics`] -- Composite scores, standings, and the analytics export.
//! - [`config`] -- Configuration loading from `realpolitik-config.yaml`.
//! - [`control`] -- Lock-free lifecycle state shared with the observer.
//! - [`decision`] -- [`DecisionProvider`] trait and [`IdleProvider`].
//! - [`economy`] -- Resource generation, research, and production.
//! - [`engine`] -- The [`GameEngine`] facade.
//! - [`events`] -- Notification subscriptions.
//! - [`maintenance`] -- End-of-turn battles, growth, espionage, and decay.
//! - [`runner`] -- Autoplay loop.
//! - [`setup`] -- World and civilization creation.
//! - [`snapshot`] -- Observation-mode-aware projections.
//! - [`state`] -- The authoritative [`GameState`].
//! - [`turn`] -- One turn of the cycle.
//! - [`view`] -- Per-civ [`StateView`](realpolitik_types::StateView)
//!   construction.

pub mod actions;
pub mod analytics;
pub mod config;
pub mod control;
pub mod decision;
pub mod economy;
pub mod engine;
pub mod events;
pub mod maintenance;
pub mod runner;
pub mod setup;
pub mod snapshot;
pub mod state;
pub mod turn;
pub mod view;

pub use config::{ConfigError, DecisionScheduling, GameConfig};
pub use control::{ControlError, ControlReport, ControlState};
pub use decision::{DecisionError, DecisionProvider, IdleProvider};
pub use engine::{EndReason, EngineError, GameEngine, GameResult};
pub use events::{Notification, NotificationBus};
pub use runner::{NoOpCallback, TurnCallback};
pub use snapshot::{CivSnapshot, GameSnapshot, MapView};
pub use state::{GameState, Thought};
pub use turn::TurnSummary;
