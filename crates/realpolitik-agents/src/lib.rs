//! Civilization-level logic for the Realpolitik simulation.
//!
//! Everything here operates on state from `realpolitik-types` without
//! touching I/O or scheduling. The turn scheduler in `realpolitik-core`
//! composes these pieces.
//!
//! # Modules
//!
//! - [`behavior`] -- Deception, betrayal, and power-seeking detection ([`BehaviorObserver`])
//! - [`diplomacy`] -- Derived diplomatic status and agreement lifecycle
//! - [`disinformation`] -- Disinformation campaigns
//! - [`error`] -- Error types ([`AgentError`])
//! - [`espionage`] -- Spy missions, risk, and intel
//! - [`intent`] -- Free-text action parsing ([`IntentParser`])
//! - [`knowledge`] -- Technology tree and research ([`TechTree`])
//! - [`machiavelli`] -- Machiavellian score
//! - [`memory`] -- Indexed memory store and context retrieval ([`MemoryStore`])
//! - [`reputation`] -- Reputation penalties and decay

pub mod behavior;
pub mod diplomacy;
pub mod disinformation;
pub mod error;
pub mod espionage;
pub mod intent;
pub mod knowledge;
pub mod machiavelli;
pub mod memory;
pub mod reputation;

pub use behavior::{BehaviorObserver, BehaviorRecord, CivMetrics, DetectionConfig, ScoreWeights};
pub use error::AgentError;
pub use intent::IntentParser;
pub use knowledge::{ResearchProgress, TechTree, Technology};
pub use machiavelli::ScoreBreakdown;
pub use memory::{MemoryBank, MemoryConfig, MemoryStore};
