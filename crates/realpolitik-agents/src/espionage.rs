//! Covert mission lifecycle.
//!
//! A spy is idle until assigned a mission. Each maintenance pass advances
//! its progress by one; when progress reaches the duration the mission
//! resolves with a single roll `r` in `[0, 1)`, succeeding iff
//! `r >= effective_risk(base, experience)`. Failures roll a coin for
//! capture. A resolved mission stays on a surviving spy, marked succeeded
//! or failed, until the next assignment replaces it.
//!
//! The success handlers that touch more than one civilization live in the
//! scheduler; this module provides the pure pieces they are built from.

use rand::Rng;
use realpolitik_types::{
    CivId, IntelFact, IntelRecord, Mission, MissionKind, MissionStatus, SabotageKind, Unit,
};

use crate::error::AgentError;

/// Risk never drops below this.
pub const MIN_RISK: f64 = 0.1;

/// Risk reduction per point of experience.
pub const RISK_PER_EXPERIENCE: f64 = 0.02;

/// Cap on the experience-based reduction.
pub const MAX_EXPERIENCE_REDUCTION: f64 = 0.25;

/// Chance a failed spy is captured.
pub const CAPTURE_CHANCE: f64 = 0.5;

/// Lowest accuracy of freshly gathered intel.
pub const INTEL_ACCURACY_MIN: f64 = 0.7;

/// Highest accuracy of freshly gathered intel.
pub const INTEL_ACCURACY_MAX: f64 = 0.95;

/// Accuracy lost per turn of age.
pub const INTEL_DECAY_PER_TURN: f64 = 0.02;

/// Aged intel never drops below this.
pub const INTEL_ACCURACY_FLOOR: f64 = 0.3;

/// `max(0.1, base - min(0.25, experience * 0.02))`.
pub fn effective_risk(base: f64, experience: u32) -> f64 {
    let reduction = (f64::from(experience) * RISK_PER_EXPERIENCE).min(MAX_EXPERIENCE_REDUCTION);
    (base - reduction).max(MIN_RISK)
}

/// Whether a roll beats the risk.
pub fn succeeds(roll: f64, risk: f64) -> bool {
    roll >= risk
}

/// Give an idle spy a mission.
pub fn assign_mission(
    spy: &mut Unit,
    kind: MissionKind,
    target: CivId,
    subject: Option<CivId>,
    duration: Option<u32>,
    turn: u64,
) -> Result<(), AgentError> {
    if !spy.covert {
        return Err(AgentError::NotASpy(spy.id));
    }
    if let Some(current) = spy.mission.as_ref().filter(|m| m.is_pending()) {
        return Err(AgentError::SpyBusy {
            unit: spy.id,
            mission: current.kind,
        });
    }
    if target == spy.owner {
        return Err(AgentError::SelfTarget(target));
    }
    if kind == MissionKind::SpreadDisinformation
        && subject.is_none_or(|s| s == spy.owner || s == target)
    {
        return Err(AgentError::MissingSubject(kind));
    }
    spy.mission = Some(Mission {
        kind,
        target,
        subject,
        duration: duration.unwrap_or_else(|| kind.default_duration()).max(1),
        progress: 0,
        risk: kind.base_risk(),
        status: MissionStatus::Pending,
        assigned_turn: turn,
    });
    Ok(())
}

/// Advance a mission by one turn. Returns `true` when it is due.
pub fn advance(mission: &mut Mission) -> bool {
    if mission.status != MissionStatus::Pending {
        return false;
    }
    mission.progress = mission.progress.saturating_add(1);
    mission.progress >= mission.duration
}

/// How a due mission resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The roll beat the risk.
    Success,
    /// The roll failed; the spy escaped.
    Failure,
    /// The roll failed and the spy was caught.
    Captured,
}

/// Record a resolution on the mission.
pub const fn conclude(mission: &mut Mission, resolution: Resolution) {
    mission.status = match resolution {
        Resolution::Success => MissionStatus::Succeeded,
        Resolution::Failure | Resolution::Captured => MissionStatus::Failed,
    };
}

/// Roll a due mission for `spy`.
pub fn resolve<R: Rng + ?Sized>(mission: &Mission, experience: u32, rng: &mut R) -> Resolution {
    let risk = effective_risk(mission.risk, experience);
    let roll: f64 = rng.random();
    if succeeds(roll, risk) {
        Resolution::Success
    } else if rng.random::<f64>() < CAPTURE_CHANCE {
        Resolution::Captured
    } else {
        Resolution::Failure
    }
}

/// Draw an accuracy in `[0.7, 0.95]`.
pub fn intel_accuracy<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let r: f64 = rng.random();
    r.mul_add(INTEL_ACCURACY_MAX - INTEL_ACCURACY_MIN, INTEL_ACCURACY_MIN)
        .clamp(INTEL_ACCURACY_MIN, INTEL_ACCURACY_MAX)
}

/// Snapshot of a target used to produce intel.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProfile {
    /// Summed strength of military units.
    pub military_strength: f64,
    /// Known technologies.
    pub technologies: Vec<String>,
    /// Gold on hand.
    pub gold: u32,
    /// Number of settlements.
    pub settlements: u32,
}

/// Produce one intel record about `target`.
pub fn gather_intel<R: Rng + ?Sized>(target: &TargetProfile, turn: u64, rng: &mut R) -> IntelRecord {
    let fact = match rng.random_range(0..4_u32) {
        0 => IntelFact::MilitaryStrength {
            strength: target.military_strength,
        },
        1 => IntelFact::Technologies {
            technologies: target.technologies.clone(),
        },
        2 => IntelFact::Treasury { gold: target.gold },
        _ => IntelFact::SettlementCount {
            count: target.settlements,
        },
    };
    IntelRecord {
        turn,
        fact,
        accuracy: intel_accuracy(rng),
        planted_by: None,
    }
}

/// Technologies the target has and the actor lacks.
pub fn stealable<'a>(actor: &[String], target: &'a [String]) -> Vec<&'a String> {
    target.iter().filter(|t| !actor.contains(t)).collect()
}

/// Pick a sabotage effect.
pub fn choose_sabotage<R: Rng + ?Sized>(rng: &mut R) -> SabotageKind {
    match rng.random_range(0..3_u32) {
        0 => SabotageKind::ResourceDestruction,
        1 => SabotageKind::ResearchSetback,
        _ => SabotageKind::BuildingDestruction,
    }
}

/// Age real intel by one turn; planted records keep their fake accuracy.
pub fn age_intel(records: &mut [IntelRecord]) {
    for record in records.iter_mut().filter(|r| r.planted_by.is_none()) {
        record.accuracy = (record.accuracy - INTEL_DECAY_PER_TURN).max(INTEL_ACCURACY_FLOOR);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::RngCore;
    use realpolitik_types::{Position, UnitKind, UnitId};

    use super::*;

    /// Always returns the same word, so `random::<f64>()` is constant.
    struct FixedRng(u64);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            (self.0 >> 32) as u32
        }
        fn next_u64(&mut self) -> u64 {
            self.0
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for b in dst {
                *b = 0xff;
            }
        }
    }

    fn spy(owner: CivId) -> Unit {
        Unit {
            id: UnitId::new(),
            owner,
            kind: UnitKind::Spy,
            position: Position::new(0, 0),
            strength: 1.0,
            movement: 2,
            vision: 2,
            attack_range: 0,
            moves_remaining: 2,
            experience: 0,
            covert: true,
            mission: None,
            disguise: None,
        }
    }

    #[test]
    fn risk_formula() {
        assert!((effective_risk(0.3, 0) - 0.3).abs() < 1e-12);
        assert!((effective_risk(0.3, 5) - 0.2).abs() < 1e-12);
        // Reduction caps at 0.25.
        assert!((effective_risk(0.6, 50) - 0.35).abs() < 1e-12);
        // Floor at 0.1.
        assert!((effective_risk(0.3, 20) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn success_is_roll_at_or_above_risk() {
        assert!(succeeds(0.3, 0.3));
        assert!(!succeeds(0.29, 0.3));
    }

    #[test]
    fn assignment_rules() {
        let owner = CivId::new();
        let target = CivId::new();
        let mut unit = spy(owner);
        assert!(matches!(
            assign_mission(&mut unit, MissionKind::GatherIntel, owner, None, None, 1),
            Err(AgentError::SelfTarget(_))
        ));
        assert!(matches!(
            assign_mission(&mut unit, MissionKind::SpreadDisinformation, target, None, None, 1),
            Err(AgentError::MissingSubject(_))
        ));
        assign_mission(&mut unit, MissionKind::GatherIntel, target, None, Some(1), 1).unwrap();
        assert!(matches!(
            assign_mission(&mut unit, MissionKind::Sabotage, target, None, None, 1),
            Err(AgentError::SpyBusy { .. })
        ));
        let mission = unit.mission.as_mut().unwrap();
        assert!(advance(mission));
    }

    #[test]
    fn concluded_mission_frees_the_spy() {
        let owner = CivId::new();
        let target = CivId::new();
        let mut unit = spy(owner);
        assign_mission(&mut unit, MissionKind::GatherIntel, target, None, Some(1), 1).unwrap();
        assert!(!unit.is_idle_spy());

        let mission = unit.mission.as_mut().unwrap();
        assert!(advance(mission));
        conclude(mission, Resolution::Failure);
        assert_eq!(mission.status, MissionStatus::Failed);
        assert!(!advance(mission));
        assert!(unit.is_idle_spy());

        assign_mission(&mut unit, MissionKind::Sabotage, target, None, None, 2).unwrap();
        let mission = unit.mission.as_ref().unwrap();
        assert_eq!(mission.kind, MissionKind::Sabotage);
        assert_eq!(mission.status, MissionStatus::Pending);
    }

    #[test]
    fn forced_high_roll_succeeds() {
        let owner = CivId::new();
        let mut unit = spy(owner);
        assign_mission(&mut unit, MissionKind::GatherIntel, CivId::new(), None, Some(1), 1).unwrap();
        let mission = unit.mission.clone().unwrap();
        let mut rng = FixedRng(u64::MAX);
        assert_eq!(resolve(&mission, 0, &mut rng), Resolution::Success);
    }

    #[test]
    fn forced_low_roll_fails() {
        let owner = CivId::new();
        let mut unit = spy(owner);
        assign_mission(&mut unit, MissionKind::Sabotage, CivId::new(), None, Some(1), 1).unwrap();
        let mission = unit.mission.clone().unwrap();
        let mut rng = FixedRng(0);
        // Roll 0.0 fails, second roll 0.0 < 0.5 captures.
        assert_eq!(resolve(&mission, 0, &mut rng), Resolution::Captured);
    }

    #[test]
    fn accuracy_stays_in_band() {
        for word in [0, u64::MAX / 3, u64::MAX] {
            let acc = intel_accuracy(&mut FixedRng(word));
            assert!((INTEL_ACCURACY_MIN..=INTEL_ACCURACY_MAX).contains(&acc));
        }
    }

    #[test]
    fn aging_respects_floor_and_skips_planted() {
        let mut records = vec![
            IntelRecord {
                turn: 1,
                fact: IntelFact::Treasury { gold: 5 },
                accuracy: 0.31,
                planted_by: None,
            },
            IntelRecord {
                turn: 1,
                fact: IntelFact::Claim { text: "x".into() },
                accuracy: 0.9,
                planted_by: Some(realpolitik_types::CampaignId::new()),
            },
        ];
        age_intel(&mut records);
        assert!((records[0].accuracy - 0.3).abs() < 1e-12);
        assert!((records[1].accuracy - 0.9).abs() < 1e-12);
    }

    #[test]
    fn only_missing_techs_are_stealable() {
        let actor = vec!["writing".to_owned()];
        let target = vec!["writing".to_owned(), "archery".to_owned()];
        assert_eq!(stealable(&actor, &target), vec![&"archery".to_owned()]);
    }
}
