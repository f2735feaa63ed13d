//! Disinformation campaigns.
//!
//! A campaign plants a false intel record in the target's beliefs about a
//! third civ and nudges the target's opinion of that civ down. Campaigns
//! count down once per maintenance pass; when one expires its planted
//! record is withdrawn from the target.

use realpolitik_types::{
    CampaignId, CivId, Civilization, DisinformationCampaign, IntelFact, IntelRecord,
};

use crate::error::AgentError;
use crate::reputation::DISINFORMATION_PENALTY;

/// Default campaign length in turns.
pub const DEFAULT_CAMPAIGN_TURNS: u32 = 5;

/// Accuracy the target attaches to a planted record.
pub const PLANTED_ACCURACY: f64 = 0.8;

/// Start a campaign run by `actor`.
pub fn launch(
    actor: &mut Civilization,
    target: CivId,
    subject: CivId,
    claim: &str,
    turn: u64,
) -> Result<DisinformationCampaign, AgentError> {
    if target == actor.id {
        return Err(AgentError::SelfTarget(target));
    }
    if subject == target {
        return Err(AgentError::SelfTarget(subject));
    }
    let campaign = DisinformationCampaign {
        id: CampaignId::new(),
        target,
        subject,
        claim: claim.to_owned(),
        launched_turn: turn,
        turns_remaining: DEFAULT_CAMPAIGN_TURNS,
    };
    actor.disinformation.push(campaign.clone());
    Ok(campaign)
}

/// Plant the campaign's claim in the target.
pub fn plant(target: &mut Civilization, campaign: &DisinformationCampaign, turn: u64) {
    target
        .intel
        .entry(campaign.subject)
        .or_default()
        .push(IntelRecord {
            turn,
            fact: IntelFact::Claim {
                text: campaign.claim.clone(),
            },
            accuracy: PLANTED_ACCURACY,
            planted_by: Some(campaign.id),
        });
    target.adjust_reputation(campaign.subject, -DISINFORMATION_PENALTY);
}

/// Count every campaign down by one turn and return those that expired.
pub fn tick(actor: &mut Civilization) -> Vec<DisinformationCampaign> {
    for campaign in &mut actor.disinformation {
        campaign.turns_remaining = campaign.turns_remaining.saturating_sub(1);
    }
    let (expired, live): (Vec<_>, Vec<_>) = actor
        .disinformation
        .drain(..)
        .partition(|c| c.turns_remaining == 0);
    actor.disinformation = live;
    expired
}

/// Remove records planted by `campaign` from `target`. Returns how many.
pub fn withdraw(target: &mut Civilization, campaign: CampaignId) -> usize {
    let mut removed = 0_usize;
    for records in target.intel.values_mut() {
        let before = records.len();
        records.retain(|r| r.planted_by != Some(campaign));
        removed = removed.saturating_add(before.saturating_sub(records.len()));
    }
    target.intel.retain(|_, records| !records.is_empty());
    removed
}

/// Default claim when an agent does not supply one.
pub fn default_claim(subject_name: &str) -> String {
    format!("{subject_name} is secretly massing troops for a surprise attack")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn campaign_lifecycle() {
        let mut actor = Civilization::new("A", 0, Vec::new());
        let mut target = Civilization::new("B", 1, Vec::new());
        let subject = CivId::new();

        let campaign = launch(&mut actor, target.id, subject, "they are weak", 2).unwrap();
        plant(&mut target, &campaign, 2);
        assert_eq!(target.intel.get(&subject).unwrap().len(), 1);
        assert!((target.reputation_of(subject) - 45.0).abs() < f64::EPSILON);

        for _ in 0..DEFAULT_CAMPAIGN_TURNS - 1 {
            assert!(tick(&mut actor).is_empty());
        }
        let expired = tick(&mut actor);
        assert_eq!(expired.len(), 1);
        assert!(actor.disinformation.is_empty());

        assert_eq!(withdraw(&mut target, expired[0].id), 1);
        assert!(target.intel.get(&subject).is_none());
    }

    #[test]
    fn cannot_target_self() {
        let mut actor = Civilization::new("A", 0, Vec::new());
        let id = actor.id;
        assert!(launch(&mut actor, id, CivId::new(), "x", 1).is_err());
    }
}
