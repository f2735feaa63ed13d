//! Tech tree and research progression.
//!
//! Ten technologies with science costs and prerequisites. Military
//! technologies are flagged so the behavior observer can measure how much
//! of a civ's research went into war.

use std::collections::{BTreeMap, BTreeSet};

use realpolitik_types::normalize_label;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// One researchable technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    /// Canonical `snake_case` name.
    pub name: String,
    /// Science required.
    pub cost: u32,
    /// Technologies required first.
    pub prerequisites: BTreeSet<String>,
    /// Whether this is a military technology.
    pub military: bool,
}

/// Outcome of feeding science into the current research.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchProgress {
    /// Nothing is being researched.
    Idle,
    /// Still accumulating.
    InProgress {
        /// Technology being researched.
        technology: String,
        /// Progress after this turn.
        progress: u32,
        /// Total required.
        cost: u32,
    },
    /// The technology was completed this turn.
    Completed {
        /// Technology discovered.
        technology: String,
    },
}

/// The prerequisite graph.
#[derive(Debug, Clone)]
pub struct TechTree {
    technologies: BTreeMap<String, Technology>,
}

impl TechTree {
    /// The standard tree.
    pub fn new() -> Self {
        let mut technologies = BTreeMap::new();
        let mut add = |name: &str, cost: u32, prereqs: &[&str], military: bool| {
            technologies.insert(
                String::from(name),
                Technology {
                    name: String::from(name),
                    cost,
                    prerequisites: prereqs.iter().map(|s| String::from(*s)).collect(),
                    military,
                },
            );
        };

        add("agriculture", 20, &[], false);
        add("mining", 20, &[], false);
        add("mysticism", 25, &[], false);
        add("archery", 25, &[], true);
        add("masonry", 25, &["mining"], false);
        add("bronze_working", 30, &["mining"], true);
        add("writing", 30, &["agriculture"], false);
        add("horseback_riding", 35, &["agriculture"], true);
        add("currency", 40, &["bronze_working"], false);
        add("mathematics", 50, &["writing", "currency"], false);

        Self { technologies }
    }

    /// Canonicalize a free-text technology name ("Bronze Working").
    pub fn canonical(&self, raw: &str) -> Option<&str> {
        let key = normalize_label(raw);
        self.technologies.get_key_value(&key).map(|(k, _)| k.as_str())
    }

    /// Look up a technology.
    pub fn get(&self, name: &str) -> Option<&Technology> {
        self.technologies.get(name)
    }

    /// Whether the name is in the tree.
    pub fn contains(&self, name: &str) -> bool {
        self.technologies.contains_key(name)
    }

    /// Every technology name, alphabetical.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.technologies.keys().map(String::as_str)
    }

    /// Whether a technology is military.
    pub fn is_military(&self, name: &str) -> bool {
        self.technologies.get(name).is_some_and(|t| t.military)
    }

    /// Check that `name` can be researched given `known`.
    pub fn check_researchable(&self, name: &str, known: &BTreeSet<String>) -> Result<(), AgentError> {
        let tech = self
            .technologies
            .get(name)
            .ok_or_else(|| AgentError::UnknownTechnology(name.to_owned()))?;
        if known.contains(name) {
            return Err(AgentError::AlreadyKnown(name.to_owned()));
        }
        let missing: Vec<String> = tech
            .prerequisites
            .iter()
            .filter(|p| !known.contains(*p))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AgentError::MissingPrerequisites {
                technology: name.to_owned(),
                missing,
            })
        }
    }

    /// Technologies whose prerequisites are met and that are not yet known.
    pub fn available(&self, known: &BTreeSet<String>) -> Vec<String> {
        self.technologies
            .values()
            .filter(|t| !known.contains(&t.name))
            .filter(|t| t.prerequisites.iter().all(|p| known.contains(p)))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Feed `science` into `current` research.
    ///
    /// Returns the new progress state; on completion the caller adds the
    /// technology and clears its current research.
    pub fn advance(&self, current: Option<&str>, progress: u32, science: u32) -> ResearchProgress {
        let Some(name) = current else {
            return ResearchProgress::Idle;
        };
        let Some(tech) = self.technologies.get(name) else {
            return ResearchProgress::Idle;
        };
        let progress = progress.saturating_add(science);
        if progress >= tech.cost {
            ResearchProgress::Completed {
                technology: tech.name.clone(),
            }
        } else {
            ResearchProgress::InProgress {
                technology: tech.name.clone(),
                progress,
                cost: tech.cost,
            }
        }
    }

    /// Count of military technologies among `known`.
    pub fn military_count(&self, known: &BTreeSet<String>) -> usize {
        known.iter().filter(|t| self.is_military(t)).count()
    }
}

impl Default for TechTree {
    fn default() -> Self {
        Self::new()
    }
}
