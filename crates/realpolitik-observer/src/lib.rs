//! Observer API server for the Realpolitik simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for the game snapshot, civilizations, revealed
//!   maps, events, relationships, analytics, and the final result
//! - **Gated endpoints** for private thoughts and Machiavellian scores,
//!   served only in omniscient observation mode
//! - **Operator endpoints** for pause, resume, stop, turn delay, and
//!   observation mode
//! - **A `WebSocket` stream** (`/ws/turns`) of turn summaries
//! - **A minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The engine publishes an [`ObserverSnapshot`] after every turn. Reads are
//! served from it and redacted per request, so the observer never blocks
//! the turn cycle. Operator commands go straight to the shared
//! [`ControlState`](realpolitik_core::ControlState).

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_observer;
pub use state::{AppState, ObserverSnapshot, TurnBroadcast};
