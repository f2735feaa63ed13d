//! Diplomatic status projection and agreement bookkeeping.
//!
//! Status is never stored. [`status`] folds the event log for an unordered
//! pair of civilizations:
//!
//! | Latest war-track event | Latest alliance-track event | Status |
//! |------------------------|-----------------------------|--------|
//! | declaration of war     | any                         | war    |
//! | peace / none           | alliance formed             | allied |
//! | peace / none           | alliance broken / none      | neutral|
//!
//! A pair without a first-contact event is `unknown` regardless of the
//! other tracks. Later log entries win.

use std::collections::BTreeSet;

use realpolitik_types::{
    Agreement, AgreementId, AgreementKind, CivId, Civilization, DiplomaticStatus, GameEvent,
    GameEventKind,
};
use tracing::debug;

use crate::reputation::{AGREEMENT_BONUS, BETRAYAL_PENALTY, BROKEN_AGREEMENT_PENALTY};

fn same_pair(a: CivId, b: CivId, x: CivId, y: CivId) -> bool {
    (a == x && b == y) || (a == y && b == x)
}

/// Fold the log into the status of the pair `(a, b)`.
pub fn status(log: &[GameEvent], a: CivId, b: CivId) -> DiplomaticStatus {
    if a == b {
        return DiplomaticStatus::Neutral;
    }
    let mut met = false;
    let mut at_war = false;
    let mut allied = false;
    for event in log {
        match &event.kind {
            GameEventKind::FirstContact { a: x, b: y } if same_pair(a, b, *x, *y) => met = true,
            GameEventKind::DeclarationOfWar {
                aggressor, target, ..
            } if same_pair(a, b, *aggressor, *target) => at_war = true,
            GameEventKind::PeaceTreaty { a: x, b: y } if same_pair(a, b, *x, *y) => at_war = false,
            GameEventKind::AllianceFormed { a: x, b: y } if same_pair(a, b, *x, *y) => {
                allied = true;
            }
            GameEventKind::AllianceBroken { breaker, other } if same_pair(a, b, *breaker, *other) => {
                allied = false;
            }
            _ => {}
        }
    }
    if !met {
        DiplomaticStatus::Unknown
    } else if at_war {
        DiplomaticStatus::War
    } else if allied {
        DiplomaticStatus::Allied
    } else {
        DiplomaticStatus::Neutral
    }
}

/// Whether the pair has a first-contact event.
pub fn has_met(log: &[GameEvent], a: CivId, b: CivId) -> bool {
    log.iter().any(|e| {
        matches!(e.kind, GameEventKind::FirstContact { a: x, b: y } if same_pair(a, b, x, y))
    })
}

/// Every civ `civ` has met.
pub fn met_civs(log: &[GameEvent], civ: CivId) -> BTreeSet<CivId> {
    log.iter()
        .filter_map(|e| match e.kind {
            GameEventKind::FirstContact { a, b } if a == civ => Some(b),
            GameEventKind::FirstContact { a, b } if b == civ => Some(a),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Agreements
// ---------------------------------------------------------------------------

/// Sign an agreement: both parties receive a copy keyed by one shared id.
///
/// Returns the events to append. Public alliances and peace agreements also
/// emit the status-changing event so the fold sees them.
pub fn sign_agreement(
    proposer: &mut Civilization,
    partner: &mut Civilization,
    kind: AgreementKind,
    terms: &str,
    secret: bool,
    turn: u64,
) -> (AgreementId, Vec<GameEventKind>) {
    let id = AgreementId::new();
    let copy_for = |other: CivId| Agreement {
        id,
        partner: other,
        kind,
        terms: terms.to_owned(),
        created_turn: turn,
        broken: false,
        secret,
    };
    let proposer_copy = copy_for(partner.id);
    let partner_copy = copy_for(proposer.id);
    if secret {
        proposer.secret_agreements.insert(id, proposer_copy);
        partner.secret_agreements.insert(id, partner_copy);
    } else {
        proposer.public_agreements.insert(id, proposer_copy);
        partner.public_agreements.insert(id, partner_copy);
    }
    proposer.adjust_reputation(partner.id, AGREEMENT_BONUS);
    partner.adjust_reputation(proposer.id, AGREEMENT_BONUS);

    let mut events = vec![GameEventKind::AgreementCreated {
        a: proposer.id,
        b: partner.id,
        agreement: id,
        kind,
        secret,
    }];
    if !secret {
        match kind {
            AgreementKind::Alliance => events.push(GameEventKind::AllianceFormed {
                a: proposer.id,
                b: partner.id,
            }),
            AgreementKind::Peace => events.push(GameEventKind::PeaceTreaty {
                a: proposer.id,
                b: partner.id,
            }),
            AgreementKind::Trade | AgreementKind::NonAggression | AgreementKind::Research => {}
        }
    }
    debug!(proposer = %proposer.id, partner = %partner.id, ?kind, secret, "agreement signed");
    (id, events)
}

/// Break every live agreement `breaker` holds with `partner` in one table.
///
/// Only the breaker's copy is marked broken; the partner's copy survives
/// until the consistency sweep notices the divergence (secret) or forever
/// (public, where the log already records the break). The partner's
/// reputation of the breaker drops.
pub fn break_agreements(
    breaker: &mut Civilization,
    partner: &mut Civilization,
    secret: bool,
) -> Vec<GameEventKind> {
    let table = if secret {
        &mut breaker.secret_agreements
    } else {
        &mut breaker.public_agreements
    };
    let mut events = Vec::new();
    for agreement in table.values_mut() {
        if agreement.partner != partner.id || agreement.broken {
            continue;
        }
        agreement.broken = true;
        events.push(GameEventKind::AgreementBroken {
            breaker: breaker.id,
            other: partner.id,
            agreement: agreement.id,
            secret,
        });
        if !secret && agreement.kind == AgreementKind::Alliance {
            events.push(GameEventKind::AllianceBroken {
                breaker: breaker.id,
                other: partner.id,
            });
        }
    }
    if !events.is_empty() && !secret {
        // Public breaks are seen immediately; the partner's copy is closed too.
        for agreement in partner.public_agreements.values_mut() {
            if agreement.partner == breaker.id {
                agreement.broken = true;
            }
        }
        partner.adjust_reputation(breaker.id, -BROKEN_AGREEMENT_PENALTY);
    }
    events
}

/// Whether `civ` holds a live agreement of `kind` with `other` in either table.
pub fn has_live_agreement(civ: &Civilization, other: CivId, kind: AgreementKind) -> bool {
    civ.public_agreements
        .values()
        .chain(civ.secret_agreements.values())
        .any(|a| a.partner == other && a.kind == kind && !a.broken)
}

/// A divergence found by [`sweep_secret_agreements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretDivergence {
    /// Civ whose copy was still live.
    pub holder: CivId,
    /// Civ whose copy is missing or broken.
    pub partner: CivId,
    /// Shared agreement id.
    pub agreement: AgreementId,
}

/// Secret-agreement consistency sweep.
///
/// For every live secret agreement A holds with B: if B does not hold a live
/// secret agreement with the same id naming A, A's copy is marked broken,
/// A's reputation of B drops by [`BETRAYAL_PENALTY`], and one betrayal event
/// (B betrayed A) is returned. Civs are visited in slice order.
pub fn sweep_secret_agreements(civs: &mut [Civilization]) -> Vec<(SecretDivergence, GameEventKind)> {
    let mut divergences = Vec::new();
    for holder in civs.iter() {
        for agreement in holder.secret_agreements.values() {
            if agreement.broken {
                continue;
            }
            let mirrored = civs
                .iter()
                .find(|c| c.id == agreement.partner)
                .and_then(|p| p.secret_agreements.get(&agreement.id))
                .is_some_and(|copy| !copy.broken && copy.partner == holder.id);
            if !mirrored {
                divergences.push(SecretDivergence {
                    holder: holder.id,
                    partner: agreement.partner,
                    agreement: agreement.id,
                });
            }
        }
    }

    let mut out = Vec::new();
    for d in divergences {
        let Some(holder) = civs.iter_mut().find(|c| c.id == d.holder) else {
            continue;
        };
        if let Some(copy) = holder.secret_agreements.get_mut(&d.agreement) {
            copy.broken = true;
        }
        holder.adjust_reputation(d.partner, -BETRAYAL_PENALTY);
        debug!(holder = %d.holder, partner = %d.partner, agreement = %d.agreement, "secret agreement divergence");
        out.push((
            d,
            GameEventKind::Betrayal {
                betrayer: d.partner,
                victim: d.holder,
                agreement: Some(d.agreement),
                secret: true,
            },
        ));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ev(turn: u64, kind: GameEventKind) -> GameEvent {
        GameEvent::new(turn, kind)
    }

    fn pair() -> (Civilization, Civilization) {
        (
            Civilization::new("A", 0, Vec::new()),
            Civilization::new("B", 1, Vec::new()),
        )
    }

    #[test]
    fn unmet_pair_is_unknown_even_at_war() {
        let (a, b) = (CivId::new(), CivId::new());
        let log = vec![ev(
            1,
            GameEventKind::DeclarationOfWar {
                aggressor: a,
                target: b,
                reason: "x".into(),
            },
        )];
        assert_eq!(status(&log, a, b), DiplomaticStatus::Unknown);
    }

    #[test]
    fn status_follows_latest_events() {
        let (a, b) = (CivId::new(), CivId::new());
        let mut log = vec![ev(1, GameEventKind::FirstContact { a, b })];
        assert_eq!(status(&log, a, b), DiplomaticStatus::Neutral);

        log.push(ev(2, GameEventKind::AllianceFormed { a: b, b: a }));
        assert_eq!(status(&log, a, b), DiplomaticStatus::Allied);

        log.push(ev(
            3,
            GameEventKind::DeclarationOfWar {
                aggressor: a,
                target: b,
                reason: "x".into(),
            },
        ));
        assert_eq!(status(&log, b, a), DiplomaticStatus::War);

        log.push(ev(4, GameEventKind::PeaceTreaty { a, b }));
        // Alliance track never closed, so peace restores it.
        assert_eq!(status(&log, a, b), DiplomaticStatus::Allied);

        log.push(ev(5, GameEventKind::AllianceBroken { breaker: a, other: b }));
        assert_eq!(status(&log, a, b), DiplomaticStatus::Neutral);
    }

    #[test]
    fn status_is_deterministic() {
        let (a, b, c) = (CivId::new(), CivId::new(), CivId::new());
        let log = vec![
            ev(1, GameEventKind::FirstContact { a, b }),
            ev(1, GameEventKind::FirstContact { a: c, b }),
            ev(2, GameEventKind::AllianceFormed { a: c, b }),
        ];
        assert_eq!(status(&log, a, b), status(&log.clone(), a, b));
        assert_eq!(status(&log, a, b), DiplomaticStatus::Neutral);
        assert_eq!(status(&log, b, c), DiplomaticStatus::Allied);
        assert_eq!(met_civs(&log, b), [a, c].into_iter().collect());
    }

    #[test]
    fn signing_gives_both_parties_a_copy() {
        let (mut a, mut b) = pair();
        let (id, events) = sign_agreement(&mut a, &mut b, AgreementKind::Alliance, "mutual", false, 3);
        assert_eq!(a.public_agreements.get(&id).unwrap().partner, b.id);
        assert_eq!(b.public_agreements.get(&id).unwrap().partner, a.id);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], GameEventKind::AllianceFormed { .. }));
    }

    #[test]
    fn secret_agreements_emit_no_status_event() {
        let (mut a, mut b) = pair();
        let (id, events) = sign_agreement(&mut a, &mut b, AgreementKind::Alliance, "", true, 1);
        assert_eq!(events.len(), 1);
        assert!(a.secret_agreements.contains_key(&id));
        assert!(a.public_agreements.is_empty());
    }

    #[test]
    fn divergence_yields_one_betrayal() {
        let (mut a, mut b) = pair();
        let (id, _) = sign_agreement(&mut a, &mut b, AgreementKind::Trade, "", true, 1);
        let a_rep_before = a.reputation_of(b.id);
        // B quietly breaks its copy.
        let _ = break_agreements(&mut b, &mut a, true);
        let mut civs = vec![a, b];

        let found = sweep_secret_agreements(&mut civs);
        assert_eq!(found.len(), 1);
        let (d, event) = &found[0];
        assert_eq!(d.agreement, id);
        assert!(matches!(event, GameEventKind::Betrayal { victim, .. } if *victim == civs[0].id));
        assert!(civs[0].secret_agreements.get(&id).unwrap().broken);
        assert!((a_rep_before - civs[0].reputation_of(civs[1].id) - BETRAYAL_PENALTY).abs() < 1e-9);

        // Already broken copies are not swept twice.
        assert!(sweep_secret_agreements(&mut civs).is_empty());
    }

    #[test]
    fn public_break_closes_both_copies() {
        let (mut a, mut b) = pair();
        let (id, _) = sign_agreement(&mut a, &mut b, AgreementKind::Alliance, "", false, 1);
        let events = break_agreements(&mut a, &mut b, false);
        assert!(events.iter().any(|e| matches!(e, GameEventKind::AllianceBroken { .. })));
        assert!(a.public_agreements.get(&id).unwrap().broken);
        assert!(b.public_agreements.get(&id).unwrap().broken);
        assert!(!has_live_agreement(&a, b.id, AgreementKind::Alliance));
    }
}
