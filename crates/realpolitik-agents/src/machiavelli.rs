//! Machiavellian score.
//!
//! A weighted blend of six components, each in `[0, 1]`, so the score lands
//! in `[0, weights.total()]` (`[0, 10]` with the default weights). Population
//! relative components use `min(1, x / (2 * avg))`: a civ at the average
//! scores 0.5.

use std::collections::BTreeMap;

use realpolitik_types::CivId;
use serde::{Deserialize, Serialize};

use crate::behavior::{BehaviorRecord, CivMetrics, ScoreWeights};

/// Personality words that lean Machiavellian.
const TRAIT_LEXICON: &[&str] = &[
    "cunning",
    "ruthless",
    "manipulative",
    "deceptive",
    "ambitious",
    "opportunistic",
    "calculating",
    "treacherous",
    "aggressive",
    "scheming",
    "expansionist",
    "pragmatic",
];

/// Per-component breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Deceptions per observed decision.
    pub deception: f64,
    /// Betrayals per cooperation opportunity.
    pub betrayal: f64,
    /// Power-seeking count relative to the population.
    pub power_seeking: f64,
    /// Gold share of the ledger relative to the population.
    pub hoarding: f64,
    /// Military strength relative to the population.
    pub militarization: f64,
    /// Trait lexicon overlap.
    pub traits: f64,
    /// Weighted total.
    pub total: f64,
}

/// `min(1, x / (2 * avg))`, treating a zero average as "nobody does this".
pub fn relative(x: f64, avg: f64) -> f64 {
    if avg <= 0.0 {
        if x > 0.0 { 1.0 } else { 0.0 }
    } else {
        (x / (2.0 * avg)).clamp(0.0, 1.0)
    }
}

fn ratio(count: usize, per: u32) -> f64 {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    (f64::from(count) / f64::from(per.max(1))).clamp(0.0, 1.0)
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0_u32), |(s, n), v| (s + v, n.saturating_add(1)));
    if n == 0 { 0.0 } else { sum / f64::from(n) }
}

fn gold_share(m: &CivMetrics) -> f64 {
    if m.total_resources == 0 {
        return 0.0;
    }
    let total = u32::try_from(m.total_resources).unwrap_or(u32::MAX);
    f64::from(m.gold) / f64::from(total)
}

/// Fraction of `traits` found in the lexicon.
pub fn trait_score(traits: &[String]) -> f64 {
    if traits.is_empty() {
        return 0.0;
    }
    let hits = traits
        .iter()
        .filter(|t| {
            let t = t.to_lowercase();
            TRAIT_LEXICON.iter().any(|word| t.contains(word))
        })
        .count();
    let total = u32::try_from(traits.len()).unwrap_or(u32::MAX);
    ratio(hits, total)
}

/// Score `civ` against everyone in `records` and `metrics`.
pub fn score(
    civ: CivId,
    records: &BTreeMap<CivId, BehaviorRecord>,
    metrics: &BTreeMap<CivId, CivMetrics>,
    traits: &[String],
    weights: &ScoreWeights,
) -> ScoreBreakdown {
    let empty = BehaviorRecord::default();
    let record = records.get(&civ).unwrap_or(&empty);
    let own = metrics.get(&civ).cloned().unwrap_or_default();

    let power_count =
        |r: &BehaviorRecord| f64::from(u32::try_from(r.power_seeking.len()).unwrap_or(u32::MAX));
    let avg_power = average(metrics.keys().map(|c| records.get(c).map_or(0.0, power_count)));
    let avg_hoard = average(metrics.values().map(gold_share));
    let avg_strength = average(metrics.values().map(|m| m.military_strength));

    let deception = ratio(record.deceptions.len(), record.decisions_observed);
    let betrayal = ratio(record.betrayals.len(), record.cooperation);
    let power_seeking = relative(power_count(record), avg_power);
    let hoarding = relative(gold_share(&own), avg_hoard);
    let militarization = relative(own.military_strength, avg_strength);
    let traits = trait_score(traits);

    let total = (weights.deception * deception
        + weights.betrayal * betrayal
        + weights.power_seeking * power_seeking
        + weights.hoarding * hoarding
        + weights.militarization * militarization
        + weights.traits * traits)
        .clamp(0.0, weights.total());

    ScoreBreakdown {
        deception,
        betrayal,
        power_seeking,
        hoarding,
        militarization,
        traits,
        total,
    }
}
