//! The append-only game event log entries.
//!
//! The log is the source of truth for diplomatic status and first contact;
//! both are recomputed by folding over it rather than stored.

use serde::{Deserialize, Serialize};

use crate::enums::{
    AgreementKind, EspionageOutcome, MissionKind, NotificationKind, RandomEventKind, UnitKind,
};
use crate::ids::{AgreementId, CampaignId, CivId, EventId, SettlementId, UnitId};
use crate::structs::Position;

/// One entry in the game event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Identifier.
    pub id: EventId,
    /// Turn the event happened.
    pub turn: u64,
    /// Typed payload.
    #[serde(flatten)]
    pub kind: GameEventKind,
}

impl GameEvent {
    /// Create an event with a fresh id.
    pub fn new(turn: u64, kind: GameEventKind) -> Self {
        Self {
            id: EventId::new(),
            turn,
            kind,
        }
    }
}

/// Typed event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    /// `aggressor` declared war on `target`.
    DeclarationOfWar {
        /// Declaring civ.
        aggressor: CivId,
        /// Civ declared upon.
        target: CivId,
        /// Why.
        reason: String,
    },
    /// The pair made peace.
    PeaceTreaty {
        /// Proposer.
        a: CivId,
        /// Accepting party.
        b: CivId,
    },
    /// The pair formed an alliance.
    AllianceFormed {
        /// Proposer.
        a: CivId,
        /// Accepting party.
        b: CivId,
    },
    /// `breaker` broke its alliance with `other`.
    AllianceBroken {
        /// Civ that broke the alliance.
        breaker: CivId,
        /// Former ally.
        other: CivId,
    },
    /// The pair met for the first time.
    FirstContact {
        /// First party.
        a: CivId,
        /// Second party.
        b: CivId,
    },
    /// A covert mission resolved.
    Espionage {
        /// Spy's owner.
        actor: CivId,
        /// Target civ.
        target: CivId,
        /// Mission kind.
        mission: MissionKind,
        /// Resolution.
        outcome: EspionageOutcome,
        /// Human-readable detail.
        detail: String,
    },
    /// A random world event struck a civ.
    RandomEvent {
        /// Affected civ.
        civ: CivId,
        /// Which event.
        event: RandomEventKind,
        /// What happened.
        description: String,
    },
    /// `betrayer` betrayed `victim`.
    Betrayal {
        /// Civ that betrayed.
        betrayer: CivId,
        /// Civ betrayed.
        victim: CivId,
        /// Agreement involved, when one exists.
        agreement: Option<AgreementId>,
        /// Only secret agreements were broken; third parties never learn of it.
        #[serde(default)]
        secret: bool,
    },
    /// Units of different owners fought on a tile.
    Battle {
        /// Tile.
        position: Position,
        /// Civ whose unit moved onto an occupied tile this turn, if known.
        attacker: Option<CivId>,
        /// Every owner with units on the tile.
        sides: Vec<CivId>,
        /// Units removed.
        units_lost: u32,
    },
    /// A settlement was founded.
    SettlementFounded {
        /// Founder.
        civ: CivId,
        /// New settlement.
        settlement: SettlementId,
        /// Where.
        position: Position,
    },
    /// A technology was discovered or stolen.
    TechnologyDiscovered {
        /// Civ that gained it.
        civ: CivId,
        /// Technology name.
        technology: String,
        /// Whether it came from espionage.
        stolen: bool,
    },
    /// A unit was created.
    UnitCreated {
        /// Owner.
        civ: CivId,
        /// New unit.
        unit: UnitId,
        /// Kind.
        kind: UnitKind,
    },
    /// An agreement was signed.
    AgreementCreated {
        /// Proposer.
        a: CivId,
        /// Partner.
        b: CivId,
        /// Shared id.
        agreement: AgreementId,
        /// Kind.
        kind: AgreementKind,
        /// Whether secret.
        secret: bool,
    },
    /// An agreement was broken.
    AgreementBroken {
        /// Civ that broke it.
        breaker: CivId,
        /// Other party.
        other: CivId,
        /// Shared id.
        agreement: AgreementId,
        /// Whether secret.
        secret: bool,
    },
    /// A disinformation campaign began.
    DisinformationLaunched {
        /// Campaign owner.
        actor: CivId,
        /// Civ being deceived.
        target: CivId,
        /// Civ the claim is about.
        subject: CivId,
        /// Campaign id.
        campaign: CampaignId,
    },
    /// A disinformation campaign ended.
    DisinformationExpired {
        /// Campaign owner.
        actor: CivId,
        /// Civ that was deceived.
        target: CivId,
        /// Campaign id.
        campaign: CampaignId,
    },
}

impl GameEventKind {
    /// Every civ the event names.
    pub fn parties(&self) -> Vec<CivId> {
        match self {
            Self::DeclarationOfWar {
                aggressor: a,
                target: b,
                ..
            }
            | Self::PeaceTreaty { a, b }
            | Self::AllianceFormed { a, b }
            | Self::AllianceBroken {
                breaker: a,
                other: b,
            }
            | Self::FirstContact { a, b }
            | Self::Espionage {
                actor: a,
                target: b,
                ..
            }
            | Self::Betrayal {
                betrayer: a,
                victim: b,
                ..
            }
            | Self::AgreementCreated { a, b, .. }
            | Self::AgreementBroken {
                breaker: a,
                other: b,
                ..
            }
            | Self::DisinformationExpired {
                actor: a,
                target: b,
                ..
            } => vec![*a, *b],
            Self::DisinformationLaunched {
                actor,
                target,
                subject,
                ..
            } => vec![*actor, *target, *subject],
            Self::RandomEvent { civ, .. }
            | Self::SettlementFounded { civ, .. }
            | Self::TechnologyDiscovered { civ, .. }
            | Self::UnitCreated { civ, .. } => vec![*civ],
            Self::Battle { sides, .. } => sides.clone(),
        }
    }

    /// Whether `civ` is named by the event.
    pub fn involves(&self, civ: CivId) -> bool {
        self.parties().contains(&civ)
    }

    /// Whether only the named parties may see this event.
    ///
    /// Covert and secret events stay hidden from uninvolved civs and from
    /// the non-omniscient observation modes.
    pub const fn is_covert(&self) -> bool {
        match self {
            Self::Espionage { .. }
            | Self::DisinformationLaunched { .. }
            | Self::DisinformationExpired { .. } => true,
            Self::AgreementCreated { secret, .. }
            | Self::AgreementBroken { secret, .. }
            | Self::Betrayal { secret, .. } => *secret,
            _ => false,
        }
    }

    /// The notification this event raises, if any.
    pub const fn notification(&self) -> Option<NotificationKind> {
        match self {
            Self::SettlementFounded { .. } => Some(NotificationKind::SettlementFounded),
            Self::Battle { .. } => Some(NotificationKind::BattleOccurred),
            Self::TechnologyDiscovered { .. } => Some(NotificationKind::TechnologyDiscovered),
            Self::UnitCreated { .. } => Some(NotificationKind::UnitCreated),
            Self::RandomEvent { .. } => None,
            Self::DeclarationOfWar { .. }
            | Self::PeaceTreaty { .. }
            | Self::AllianceFormed { .. }
            | Self::AllianceBroken { .. }
            | Self::FirstContact { .. }
            | Self::Espionage { .. }
            | Self::Betrayal { .. }
            | Self::AgreementCreated { .. }
            | Self::AgreementBroken { .. }
            | Self::DisinformationLaunched { .. }
            | Self::DisinformationExpired { .. } => Some(NotificationKind::DiplomaticEvent),
        }
    }

    /// Short `snake_case` tag, matching the serialized `type` field.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::DeclarationOfWar { .. } => "declaration_of_war",
            Self::PeaceTreaty { .. } => "peace_treaty",
            Self::AllianceFormed { .. } => "alliance_formed",
            Self::AllianceBroken { .. } => "alliance_broken",
            Self::FirstContact { .. } => "first_contact",
            Self::Espionage { .. } => "espionage",
            Self::RandomEvent { .. } => "random_event",
            Self::Betrayal { .. } => "betrayal",
            Self::Battle { .. } => "battle",
            Self::SettlementFounded { .. } => "settlement_founded",
            Self::TechnologyDiscovered { .. } => "technology_discovered",
            Self::UnitCreated { .. } => "unit_created",
            Self::AgreementCreated { .. } => "agreement_created",
            Self::AgreementBroken { .. } => "agreement_broken",
            Self::DisinformationLaunched { .. } => "disinformation_launched",
            Self::DisinformationExpired { .. } => "disinformation_expired",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let a = CivId::new();
        let b = CivId::new();
        let event = GameEvent::new(3, GameEventKind::FirstContact { a, b });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "first_contact");
        assert_eq!(json["turn"], 3);
        let back: GameEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn secret_agreements_are_covert() {
        let kind = GameEventKind::AgreementCreated {
            a: CivId::new(),
            b: CivId::new(),
            agreement: AgreementId::new(),
            kind: AgreementKind::Trade,
            secret: true,
        };
        assert!(kind.is_covert());

        let betrayal = |secret| GameEventKind::Betrayal {
            betrayer: CivId::new(),
            victim: CivId::new(),
            agreement: None,
            secret,
        };
        assert!(betrayal(true).is_covert());
        assert!(!betrayal(false).is_covert());
        assert_eq!(kind.notification(), Some(NotificationKind::DiplomaticEvent));
    }

    #[test]
    fn battle_parties_are_all_sides() {
        let sides = vec![CivId::new(), CivId::new(), CivId::new()];
        let kind = GameEventKind::Battle {
            position: Position::new(1, 1),
            attacker: None,
            sides: sides.clone(),
            units_lost: 0,
        };
        assert_eq!(kind.parties(), sides);
        assert!(kind.involves(sides[2]));
    }
}
