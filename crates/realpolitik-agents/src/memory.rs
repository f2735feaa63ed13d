//! Per-agent memory with secondary indices and budgeted retrieval.
//!
//! Each civ owns a [`MemoryStore`]: an append-only list of
//! [`MemoryEntry`] values plus four indices (type, importance bucket, turn,
//! related civ) maintained on insert. [`MemoryStore::relevant_memories`]
//! fills a token budget tier by tier:
//!
//! 1. identity (1)
//! 2. personality (up to 2)
//! 3. reflections (up to 3)
//! 4. recent decisions (up to 5)
//! 5. recent thinking (up to 3)
//! 6. per known civ, relationship memories (up to 3 each)
//! 7. per recent correspondent, communication memories (up to 2 each)
//! 8. any remaining memory with importance >= 0.8
//!
//! Results are deduplicated by id and returned newest first.

use std::collections::{BTreeMap, BTreeSet};

use realpolitik_types::{CivId, ImportanceBucket, MemoryEntry, MemoryId, MemoryType};
use serde::{Deserialize, Serialize};

/// Retrieval limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Approximate token budget (`chars / 4`).
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    /// Personality memories.
    #[serde(default = "default_personality_cap")]
    pub personality_cap: usize,
    /// Reflection memories.
    #[serde(default = "default_reflection_cap")]
    pub reflection_cap: usize,
    /// Recent decision memories.
    #[serde(default = "default_decision_cap")]
    pub decision_cap: usize,
    /// Recent thinking memories.
    #[serde(default = "default_thinking_cap")]
    pub thinking_cap: usize,
    /// Relationship memories per known civ.
    #[serde(default = "default_per_civ_cap")]
    pub per_civ_cap: usize,
    /// Communication memories per recent correspondent.
    #[serde(default = "default_per_correspondent_cap")]
    pub per_correspondent_cap: usize,
    /// Importance threshold for the final top-up tier.
    #[serde(default = "default_top_up_importance")]
    pub top_up_importance: u8,
}

const fn default_token_budget() -> usize {
    1500
}
const fn default_personality_cap() -> usize {
    2
}
const fn default_reflection_cap() -> usize {
    3
}
const fn default_decision_cap() -> usize {
    5
}
const fn default_thinking_cap() -> usize {
    3
}
const fn default_per_civ_cap() -> usize {
    3
}
const fn default_per_correspondent_cap() -> usize {
    2
}
const fn default_top_up_importance() -> u8 {
    80
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            personality_cap: default_personality_cap(),
            reflection_cap: default_reflection_cap(),
            decision_cap: default_decision_cap(),
            thinking_cap: default_thinking_cap(),
            per_civ_cap: default_per_civ_cap(),
            per_correspondent_cap: default_per_correspondent_cap(),
            top_up_importance: default_top_up_importance(),
        }
    }
}

impl MemoryConfig {
    /// Top-up threshold as a fraction.
    pub fn top_up_threshold(&self) -> f64 {
        f64::from(self.top_up_importance) / 100.0
    }
}

/// One civ's memories and their indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    entries: Vec<MemoryEntry>,
    by_type: BTreeMap<MemoryType, Vec<usize>>,
    by_importance: BTreeMap<ImportanceBucket, Vec<usize>>,
    by_turn: BTreeMap<u64, Vec<usize>>,
    by_civ: BTreeMap<CivId, Vec<usize>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and index it.
    pub fn add(&mut self, entry: MemoryEntry) {
        let slot = self.entries.len();
        self.by_type.entry(entry.memory_type).or_default().push(slot);
        self.by_importance
            .entry(ImportanceBucket::of(entry.importance))
            .or_default()
            .push(slot);
        self.by_turn.entry(entry.turn).or_default().push(slot);
        if let Some(civ) = entry.related_civ {
            self.by_civ.entry(civ).or_default().push(slot);
        }
        self.entries.push(entry);
    }

    /// Every entry in insertion order.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve<'a>(&'a self, slots: &'a [usize]) -> impl DoubleEndedIterator<Item = &'a MemoryEntry> {
        slots.iter().filter_map(|&i| self.entries.get(i))
    }

    /// Entries of one type, oldest first.
    pub fn of_type(&self, memory_type: MemoryType) -> Vec<&MemoryEntry> {
        self.by_type
            .get(&memory_type)
            .map(|s| self.resolve(s).collect())
            .unwrap_or_default()
    }

    /// Entries in one importance bucket, oldest first.
    pub fn in_bucket(&self, bucket: ImportanceBucket) -> Vec<&MemoryEntry> {
        self.by_importance
            .get(&bucket)
            .map(|s| self.resolve(s).collect())
            .unwrap_or_default()
    }

    /// Entries created in a turn range (inclusive).
    pub fn in_turns(&self, from: u64, to: u64) -> Vec<&MemoryEntry> {
        if from > to {
            return Vec::new();
        }
        self.by_turn
            .range(from..=to)
            .flat_map(|(_, s)| self.resolve(s))
            .collect()
    }

    /// Entries about one civ, oldest first.
    pub fn about(&self, civ: CivId) -> Vec<&MemoryEntry> {
        self.by_civ
            .get(&civ)
            .map(|s| self.resolve(s).collect())
            .unwrap_or_default()
    }

    /// Select memories for the next decision.
    ///
    /// `known_civs` drives tier 6; `correspondents` (senders of recently
    /// received messages) drives tier 7.
    pub fn relevant_memories(
        &self,
        config: &MemoryConfig,
        known_civs: &[CivId],
        correspondents: &[CivId],
    ) -> Vec<MemoryEntry> {
        let mut picker = Picker::new(config.token_budget);

        let newest_of_type = |t: MemoryType| -> Vec<usize> {
            self.by_type
                .get(&t)
                .map(|s| s.iter().rev().copied().collect())
                .unwrap_or_default()
        };

        picker.take(self, newest_of_type(MemoryType::Identity), 1);
        picker.take(self, newest_of_type(MemoryType::Personality), config.personality_cap);
        picker.take(self, newest_of_type(MemoryType::Reflection), config.reflection_cap);
        picker.take(self, newest_of_type(MemoryType::Decision), config.decision_cap);
        picker.take(self, newest_of_type(MemoryType::Thinking), config.thinking_cap);

        for civ in known_civs {
            let slots: Vec<usize> = self
                .by_civ
                .get(civ)
                .map(|s| s.iter().rev().copied().collect())
                .unwrap_or_default();
            picker.take(self, slots, config.per_civ_cap);
        }

        for civ in correspondents {
            let slots: Vec<usize> = self
                .by_civ
                .get(civ)
                .map(|s| {
                    s.iter()
                        .rev()
                        .copied()
                        .filter(|&i| {
                            self.entries
                                .get(i)
                                .is_some_and(|e| e.memory_type == MemoryType::Communication)
                        })
                        .collect()
                })
                .unwrap_or_default();
            picker.take(self, slots, config.per_correspondent_cap);
        }

        let threshold = config.top_up_threshold();
        let mut important: Vec<usize> = (0..self.entries.len())
            .rev()
            .filter(|&i| self.entries.get(i).is_some_and(|e| e.importance >= threshold))
            .collect();
        important.sort_by(|&a, &b| {
            let ia = self.entries.get(a).map_or(0.0, |e| e.importance);
            let ib = self.entries.get(b).map_or(0.0, |e| e.importance);
            ib.total_cmp(&ia).then(b.cmp(&a))
        });
        picker.take(self, important, usize::MAX);

        let mut chosen = picker.chosen;
        chosen.sort_by(|a, b| b.cmp(a));
        chosen
            .into_iter()
            .filter_map(|i| self.entries.get(i).cloned())
            .collect()
    }
}

/// Budget-aware tier filler.
struct Picker {
    remaining: usize,
    seen: BTreeSet<MemoryId>,
    chosen: Vec<usize>,
}

impl Picker {
    fn new(budget: usize) -> Self {
        Self {
            remaining: budget,
            seen: BTreeSet::new(),
            chosen: Vec::new(),
        }
    }

    /// Take up to `cap` entries from `slots` (already in priority order).
    ///
    /// Entries that do not fit the remaining budget are skipped. Entries
    /// already chosen by an earlier tier do not count toward `cap`.
    fn take(&mut self, store: &MemoryStore, slots: Vec<usize>, cap: usize) {
        let mut taken = 0_usize;
        for slot in slots {
            if taken >= cap {
                break;
            }
            let Some(entry) = store.entries.get(slot) else {
                continue;
            };
            if self.seen.contains(&entry.id) {
                continue;
            }
            let tokens = entry.approximate_tokens();
            if tokens > self.remaining {
                continue;
            }
            self.remaining = self.remaining.saturating_sub(tokens);
            self.seen.insert(entry.id);
            self.chosen.push(slot);
            taken = taken.saturating_add(1);
        }
    }
}

/// Every civ's memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryBank {
    stores: BTreeMap<CivId, MemoryStore>,
}

impl MemoryBank {
    /// Empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a memory to its owner's store.
    pub fn remember(&mut self, entry: MemoryEntry) {
        self.stores.entry(entry.agent).or_default().add(entry);
    }

    /// A civ's store, if it has any memories.
    pub fn store(&self, civ: CivId) -> Option<&MemoryStore> {
        self.stores.get(&civ)
    }

    /// Relevant memories for a civ (empty if it has none).
    pub fn relevant_for(
        &self,
        civ: CivId,
        config: &MemoryConfig,
        known_civs: &[CivId],
        correspondents: &[CivId],
    ) -> Vec<MemoryEntry> {
        self.stores
            .get(&civ)
            .map(|s| s.relevant_memories(config, known_civs, correspondents))
            .unwrap_or_default()
    }

    /// Total entries across every store.
    pub fn total(&self) -> usize {
        self.stores.values().map(MemoryStore::len).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use realpolitik_types::{MemoryPayload, MessageId};

    use super::*;

    fn note(owner: CivId, t: MemoryType, turn: u64, importance: f64, text: &str) -> MemoryEntry {
        MemoryEntry::note(owner, t, turn, importance, text)
    }

    #[test]
    fn indices_track_inserts() {
        let me = CivId::new();
        let other = CivId::new();
        let mut store = MemoryStore::new();
        store.add(note(me, MemoryType::Identity, 0, 1.0, "I am A"));
        store.add(MemoryEntry::new(
            me,
            MemoryType::Observation,
            3,
            0.9,
            "B attacked",
            MemoryPayload::Note,
            Some(other),
        ));
        store.add(note(me, MemoryType::Decision, 4, 0.3, "built walls"));

        assert_eq!(store.of_type(MemoryType::Decision).len(), 1);
        assert_eq!(store.in_bucket(ImportanceBucket::Critical).len(), 2);
        assert_eq!(store.in_turns(3, 4).len(), 2);
        assert_eq!(store.about(other).len(), 1);
    }

    #[test]
    fn tiers_are_capped_and_sorted_newest_first() {
        let me = CivId::new();
        let mut store = MemoryStore::new();
        store.add(note(me, MemoryType::Identity, 0, 1.0, "I am A"));
        for turn in 1..=8 {
            store.add(note(me, MemoryType::Decision, turn, 0.4, "decided"));
        }
        let picked = store.relevant_memories(&MemoryConfig::default(), &[], &[]);
        let decisions = picked
            .iter()
            .filter(|e| e.memory_type == MemoryType::Decision)
            .count();
        assert_eq!(decisions, 5);
        assert_eq!(picked.len(), 6);
        assert_eq!(picked.first().unwrap().turn, 8);
        assert_eq!(picked.last().unwrap().memory_type, MemoryType::Identity);
    }

    #[test]
    fn relationship_and_correspondent_tiers() {
        let me = CivId::new();
        let known = CivId::new();
        let pen_pal = CivId::new();
        let mut store = MemoryStore::new();
        for turn in 0..5 {
            store.add(MemoryEntry::new(
                me,
                MemoryType::Observation,
                turn,
                0.5,
                "border skirmish",
                MemoryPayload::Note,
                Some(known),
            ));
        }
        for turn in 0..4 {
            store.add(MemoryEntry::new(
                me,
                MemoryType::Communication,
                turn,
                0.5,
                "letter",
                MemoryPayload::Communication {
                    message: MessageId::new(),
                    from: pen_pal,
                    to: Some(me),
                },
                None,
            ));
        }
        let picked = store.relevant_memories(&MemoryConfig::default(), &[known], &[pen_pal]);
        assert_eq!(picked.iter().filter(|e| e.related_civ == Some(known)).count(), 3);
        assert_eq!(picked.iter().filter(|e| e.related_civ == Some(pen_pal)).count(), 2);
    }

    #[test]
    fn top_up_adds_important_memories_within_budget() {
        let me = CivId::new();
        let mut store = MemoryStore::new();
        store.add(note(me, MemoryType::Observation, 1, 0.95, "war broke out"));
        store.add(note(me, MemoryType::Observation, 2, 0.2, "nothing happened"));
        let picked = store.relevant_memories(&MemoryConfig::default(), &[], &[]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].content, "war broke out");
    }

    #[test]
    fn budget_is_respected_and_ids_are_unique() {
        let me = CivId::new();
        let mut store = MemoryStore::new();
        let long = "x".repeat(400); // 100 tokens
        for turn in 0..10 {
            store.add(note(me, MemoryType::Decision, turn, 0.9, &long));
        }
        let config = MemoryConfig {
            token_budget: 250,
            ..MemoryConfig::default()
        };
        let picked = store.relevant_memories(&config, &[], &[]);
        assert_eq!(picked.len(), 2);
        let total: usize = picked.iter().map(MemoryEntry::approximate_tokens).sum();
        assert!(total <= 250);
        let ids: BTreeSet<_> = picked.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), picked.len());
    }
}
