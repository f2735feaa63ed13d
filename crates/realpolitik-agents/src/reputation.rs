//! Reputation adjustments and decay.
//!
//! Each civ rates every other civ on a 0-100 scale, defaulting to 50.
//! Ratings below neutral slowly recover; ratings above neutral never decay.

use realpolitik_types::{Civilization, NEUTRAL_REPUTATION};

/// Penalty when a secret agreement partner is caught defecting.
pub const BETRAYAL_PENALTY: f64 = 20.0;

/// Penalty the target applies to the owner of a captured spy.
pub const SPY_CAPTURE_PENALTY: f64 = 30.0;

/// Penalty the partner applies when a public agreement is broken.
pub const BROKEN_AGREEMENT_PENALTY: f64 = 15.0;

/// Penalty the target applies to a civ that declares war on it.
pub const WAR_DECLARATION_PENALTY: f64 = 10.0;

/// Nudge against the subject of a planted disinformation claim.
pub const DISINFORMATION_PENALTY: f64 = 5.0;

/// Bonus both parties apply when signing an agreement.
pub const AGREEMENT_BONUS: f64 = 5.0;

/// Decay runs on turns divisible by this.
pub const DECAY_INTERVAL: u64 = 5;

/// Points recovered per decay step.
pub const DECAY_STEP: f64 = 1.0;

/// Move every below-neutral rating one step toward neutral.
///
/// Only runs on turns divisible by [`DECAY_INTERVAL`]. Returns the number
/// of ratings that changed.
pub fn decay_toward_neutral(civs: &mut [Civilization], turn: u64) -> usize {
    if turn == 0 || turn % DECAY_INTERVAL != 0 {
        return 0;
    }
    let mut changed = 0_usize;
    for civ in civs {
        for rating in civ.reputation.values_mut() {
            if *rating < NEUTRAL_REPUTATION {
                *rating = (*rating + DECAY_STEP).min(NEUTRAL_REPUTATION);
                changed = changed.saturating_add(1);
            }
        }
    }
    changed
}

/// Coarse label for a rating, used in state views.
pub fn standing(rating: f64) -> &'static str {
    if rating >= 75.0 {
        "trusted"
    } else if rating >= 60.0 {
        "friendly"
    } else if rating > 40.0 {
        "neutral"
    } else if rating > 20.0 {
        "wary"
    } else {
        "hostile"
    }
}

#[cfg(test)]
mod tests {
    use realpolitik_types::CivId;

    use super::*;

    #[test]
    fn decay_only_on_fifth_turns_and_only_below_neutral() {
        let mut civ = Civilization::new("A", 0, Vec::new());
        let low = CivId::new();
        let high = CivId::new();
        civ.reputation.insert(low, 30.0);
        civ.reputation.insert(high, 70.0);
        let mut civs = vec![civ];

        assert_eq!(decay_toward_neutral(&mut civs, 4), 0);
        assert_eq!(decay_toward_neutral(&mut civs, 5), 1);
        assert!((civs[0].reputation_of(low) - 31.0).abs() < f64::EPSILON);
        assert!((civs[0].reputation_of(high) - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decay_stops_at_neutral() {
        let mut civ = Civilization::new("A", 0, Vec::new());
        let other = CivId::new();
        civ.reputation.insert(other, 49.5);
        let mut civs = vec![civ];
        decay_toward_neutral(&mut civs, 10);
        assert!((civs[0].reputation_of(other) - 50.0).abs() < f64::EPSILON);
        assert_eq!(decay_toward_neutral(&mut civs, 15), 0);
    }

    #[test]
    fn standing_labels() {
        assert_eq!(standing(50.0), "neutral");
        assert_eq!(standing(10.0), "hostile");
        assert_eq!(standing(80.0), "trusted");
    }
}
