//! Agreements, betrayal, war, and messages.

use realpolitik_agents::diplomacy;
use realpolitik_agents::reputation::{BETRAYAL_PENALTY, WAR_DECLARATION_PENALTY};
use realpolitik_types::{
    AgreementKind, CivId, Communication, DiplomaticStatus, GameEventKind, MemoryEntry,
    MemoryPayload, MemoryType, Message, MessageId, normalize_label,
};
use tracing::warn;

use super::{CommandError, resolve_met};
use crate::state::GameState;

/// Partner reputation of the proposer below which agreements are refused.
pub const MIN_TRUST_FOR_AGREEMENT: f64 = 30.0;

/// Recipients that mean "every civ I have met".
const BROADCAST: &[&str] = &["all", "everyone", "broadcast", "all_civilizations"];

/// Sign an agreement with a met civ.
///
/// At war only peace can be signed. The partner must rate the proposer at
/// least [`MIN_TRUST_FOR_AGREEMENT`], and no live agreement of the same kind
/// may already exist.
pub fn create_agreement(
    state: &mut GameState,
    civ: CivId,
    partner: &str,
    kind: &str,
    secret: bool,
    terms: Option<&str>,
) -> Result<(String, CivId), CommandError> {
    let partner = resolve_met(state, civ, partner)?;
    let kind: AgreementKind = kind.parse()?;
    if state.status(civ, partner) == DiplomaticStatus::War && kind != AgreementKind::Peace {
        return Err(CommandError::AtWar(partner));
    }
    let turn = state.turn;
    let (own, other) = state
        .civ_pair_mut(civ, partner)
        .ok_or_else(|| CommandError::UnknownCiv(partner.to_string()))?;
    let trust = other.reputation_of(civ);
    if trust < MIN_TRUST_FOR_AGREEMENT {
        return Err(CommandError::Untrusted {
            partner,
            reputation: trust,
        });
    }
    if diplomacy::has_live_agreement(own, partner, kind) {
        return Err(CommandError::DuplicateAgreement { partner, kind });
    }
    let terms = terms.unwrap_or_default();
    let (_, events) = diplomacy::sign_agreement(own, other, kind, terms, secret, turn);
    for event in events {
        state.log(event);
    }
    let secrecy = if secret { "secret " } else { "" };
    let name = state.civ_name(partner);
    Ok((format!("signed a {secrecy}{kind} agreement with {name}"), partner))
}

/// Break every live agreement with `partner` in one table.
pub fn break_agreement(
    state: &mut GameState,
    civ: CivId,
    partner: &str,
    secret: bool,
) -> Result<(String, CivId), CommandError> {
    let partner = resolve_met(state, civ, partner)?;
    let (own, other) = state
        .civ_pair_mut(civ, partner)
        .ok_or_else(|| CommandError::UnknownCiv(partner.to_string()))?;
    let events = diplomacy::break_agreements(own, other, secret);
    if events.is_empty() {
        return Err(CommandError::NothingToBreak(partner));
    }
    for event in events {
        state.log(event);
    }
    let name = state.civ_name(partner);
    Ok((format!("broke agreements with {name}"), partner))
}

/// Break every agreement with `target`, public and secret, in one move.
///
/// The victim's secret copies are closed too so the consistency sweep does
/// not count the same betrayal twice. Exactly one betrayal event is logged.
pub fn betray(state: &mut GameState, civ: CivId, target: &str) -> Result<(String, CivId), CommandError> {
    let target = resolve_met(state, civ, target)?;
    let (own, victim) = state
        .civ_pair_mut(civ, target)
        .ok_or_else(|| CommandError::UnknownCiv(target.to_string()))?;
    let mut events = diplomacy::break_agreements(own, victim, false);
    events.extend(diplomacy::break_agreements(own, victim, true));
    if events.is_empty() {
        return Err(CommandError::NothingToBreak(target));
    }
    for copy in victim.secret_agreements.values_mut() {
        if copy.partner == civ {
            copy.broken = true;
        }
    }
    victim.adjust_reputation(civ, -BETRAYAL_PENALTY);
    let agreement = events.iter().find_map(|e| match e {
        GameEventKind::AgreementBroken { agreement, .. } => Some(*agreement),
        _ => None,
    });
    let secret = events
        .iter()
        .all(|e| matches!(e, GameEventKind::AgreementBroken { secret: true, .. }));
    for event in events {
        state.log(event);
    }
    state.log(GameEventKind::Betrayal {
        betrayer: civ,
        victim: target,
        agreement,
        secret,
    });
    let name = state.civ_name(target);
    Ok((format!("betrayed {name}"), target))
}

/// Declare war on a met civ, tearing up public agreements first.
pub fn declare_war(
    state: &mut GameState,
    civ: CivId,
    target: &str,
) -> Result<(String, CivId), CommandError> {
    let target = resolve_met(state, civ, target)?;
    if state.status(civ, target) == DiplomaticStatus::War {
        return Err(CommandError::AlreadyAtWar(target));
    }
    let (own, enemy) = state
        .civ_pair_mut(civ, target)
        .ok_or_else(|| CommandError::UnknownCiv(target.to_string()))?;
    let events = diplomacy::break_agreements(own, enemy, false);
    enemy.adjust_reputation(civ, -WAR_DECLARATION_PENALTY);
    for event in events {
        state.log(event);
    }
    state.declare_war(civ, target, "declared by decision");
    let name = state.civ_name(target);
    Ok((format!("declared war on {name}"), target))
}

/// Deliver messages. Returns the text of every message actually sent.
///
/// A recipient of "all" broadcasts to every met civ; a named recipient must
/// have been met. Each delivery gives the sender and each recipient a
/// communication memory.
pub fn send_communications(
    state: &mut GameState,
    civ: CivId,
    communications: &[Communication],
) -> Vec<String> {
    let turn = state.turn;
    let mut sent = Vec::new();
    for comm in communications {
        let content = comm.message.trim();
        if content.is_empty() {
            continue;
        }
        let to = if BROADCAST.contains(&normalize_label(&comm.to).as_str()) {
            None
        } else {
            match resolve_met(state, civ, &comm.to) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(%civ, to = %comm.to, error = %e, "Message dropped");
                    continue;
                }
            }
        };
        let recipients: Vec<CivId> = match to {
            Some(id) => vec![id],
            None => state.met_civs(civ).into_iter().collect(),
        };

        let message = Message {
            id: MessageId::new(),
            turn,
            from: civ,
            to,
            content: content.to_owned(),
        };
        let sender = state.civ_name(civ);
        let addressee = to.map_or_else(|| "everyone".to_owned(), |id| state.civ_name(id));
        state.memory.remember(MemoryEntry::new(
            civ,
            MemoryType::Communication,
            turn,
            0.5,
            format!("I told {addressee}: {content}"),
            MemoryPayload::Communication {
                message: message.id,
                from: civ,
                to,
            },
            None,
        ));
        for recipient in recipients {
            state.memory.remember(MemoryEntry::new(
                recipient,
                MemoryType::Communication,
                turn,
                0.6,
                format!("{sender} said: {content}"),
                MemoryPayload::Communication {
                    message: message.id,
                    from: civ,
                    to,
                },
                None,
            ));
        }
        sent.push(message.content.clone());
        state.messages.push(message);
    }
    sent
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use realpolitik_agents::TechTree;

    use super::*;
    use crate::config::GameConfig;
    use crate::setup;

    fn met_pair() -> (GameState, CivId, CivId, String, String) {
        let config = GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            ..GameConfig::default()
        };
        let mut state = setup::build(&config, &TechTree::new(), &mut StdRng::seed_from_u64(2)).unwrap();
        let (a, b) = (state.civs[0].id, state.civs[1].id);
        state.ensure_contact(a, b);
        let (na, nb) = (state.civ_name(a), state.civ_name(b));
        (state, a, b, na, nb)
    }

    #[test]
    fn alliance_changes_status() {
        let (mut state, a, b, _, nb) = met_pair();
        create_agreement(&mut state, a, &nb, "alliance", false, None).unwrap();
        assert_eq!(state.status(a, b), DiplomaticStatus::Allied);
        assert!(matches!(
            create_agreement(&mut state, a, &nb, "alliance", false, None).unwrap_err(),
            CommandError::DuplicateAgreement { .. }
        ));
    }

    #[test]
    fn distrust_blocks_agreements() {
        let (mut state, a, b, _, nb) = met_pair();
        state.civ_mut(b).unwrap().adjust_reputation(a, -25.0);
        assert!(matches!(
            create_agreement(&mut state, a, &nb, "trade", false, None).unwrap_err(),
            CommandError::Untrusted { .. }
        ));
    }

    #[test]
    fn only_peace_during_war() {
        let (mut state, a, b, _, nb) = met_pair();
        declare_war(&mut state, a, &nb).unwrap();
        assert!(matches!(
            declare_war(&mut state, a, &nb).unwrap_err(),
            CommandError::AlreadyAtWar(_)
        ));
        assert!(matches!(
            create_agreement(&mut state, a, &nb, "trade", false, None).unwrap_err(),
            CommandError::AtWar(_)
        ));
        create_agreement(&mut state, a, &nb, "peace", false, None).unwrap();
        assert_eq!(state.status(a, b), DiplomaticStatus::Neutral);
    }

    #[test]
    fn betrayal_logs_one_event_and_survives_sweep() {
        let (mut state, a, b, _, nb) = met_pair();
        create_agreement(&mut state, a, &nb, "research", true, None).unwrap();
        betray(&mut state, a, &nb).unwrap();
        let betrayals = |s: &GameState| {
            s.events
                .iter()
                .filter(|e| matches!(e.kind, GameEventKind::Betrayal { .. }))
                .count()
        };
        assert_eq!(betrayals(&state), 1);
        assert!(state.events.iter().any(|e| matches!(
            e.kind,
            GameEventKind::Betrayal { secret: true, .. }
        )));
        // 50 + 5 (agreement) - 20 (betrayal).
        assert!((state.civ(b).unwrap().reputation_of(a) - 35.0).abs() < f64::EPSILON);
        let swept = diplomacy::sweep_secret_agreements(&mut state.civs);
        assert!(swept.is_empty());
        assert!(matches!(
            betray(&mut state, a, &nb).unwrap_err(),
            CommandError::NothingToBreak(_)
        ));
    }

    #[test]
    fn messages_need_contact_and_create_memories() {
        let (mut state, a, b, na, nb) = met_pair();
        let before = state.memory.total();
        let sent = send_communications(
            &mut state,
            a,
            &[
                Communication {
                    to: nb,
                    message: "Greetings".into(),
                },
                Communication {
                    to: "all".into(),
                    message: "Hear ye".into(),
                },
                Communication {
                    to: "Atlantis".into(),
                    message: "Anyone?".into(),
                },
                Communication {
                    to: na,
                    message: "Talking to myself".into(),
                },
            ],
        );
        assert_eq!(sent, vec!["Greetings".to_owned(), "Hear ye".to_owned()]);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.memory.total(), before + 4);
        assert_eq!(
            state
                .memory
                .store(b)
                .unwrap()
                .of_type(MemoryType::Communication)
                .len(),
            2
        );
    }
}
