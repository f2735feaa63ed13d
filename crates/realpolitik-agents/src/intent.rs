//! Free-text action adapter.
//!
//! Agents may describe actions in prose ("move warrior to (3, 4)"). Each
//! line is tried against an ordered pattern table; the first match wins and
//! becomes a typed [`Command`]. Lines matching nothing return `None` and the
//! caller drops them with a warning.
//!
//! Pattern order: move, research, build, found, train, improve, create spy,
//! assign mission, launch disinformation, create agreement, break
//! agreement, betray, declare war. "train a spy" is routed to
//! [`Command::CreateSpy`] by the train handler.

use realpolitik_types::{Command, Position, UnitKind};
use regex::{Captures, Regex};

use crate::error::AgentError;

/// Which handler a pattern feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Move,
    Research,
    Build,
    Found,
    Train,
    Improve,
    CreateSpy,
    AssignMission,
    LaunchDisinformation,
    CreateAgreement,
    BreakAgreement,
    Betray,
    DeclareWar,
}

const NAME: &str = r"[\w' -]+?";
const COORDS: &str = r"\(?\s*(?P<x>\d+)\s*,\s*(?P<y>\d+)\s*\)?";

fn pattern_table() -> Vec<(Intent, String)> {
    vec![
        (
            Intent::Move,
            format!(r"^(?:move|send)\s+(?:my\s+|the\s+|a\s+)?(?P<unit>[\w-]+)\s+to\s+{COORDS}$"),
        ),
        (Intent::Research, r"^(?:research|study)\s+(?P<tech>[\w -]+?)$".to_owned()),
        (
            Intent::Build,
            format!(r"^(?:build|construct)\s+(?:an?\s+|the\s+)?(?P<building>[a-z][a-z _-]*?)(?:\s+in\s+(?P<settlement>{NAME}))?$"),
        ),
        (
            Intent::Found,
            format!(r"^(?:found|establish|settle)\s+(?:a\s+)?(?:new\s+)?(?:settlement|city|colony)(?:\s+(?:named|called)\s+(?P<name>[\w' -]+?))?(?:\s+at\s+{COORDS})?$"),
        ),
        (
            Intent::Train,
            format!(r"^(?:train|recruit)\s+(?:an?\s+|one\s+)?(?P<unit>[a-z]+)(?:\s+in\s+(?P<settlement>{NAME}))?$"),
        ),
        (
            Intent::Improve,
            format!(r"^improve\s+(?:the\s+)?(?:tile\s+)?(?:at\s+)?{COORDS}(?:\s+with\s+(?:an?\s+)?(?P<improvement>[a-z][a-z _-]*?))?$"),
        ),
        (
            Intent::Improve,
            format!(r"^(?:build|construct)\s+(?:an?\s+)?(?P<improvement>farm|mine|trading[ _-]post)\s+(?:at|on)\s+{COORDS}$"),
        ),
        (
            Intent::CreateSpy,
            format!(r"^(?:create|deploy|hire)\s+(?:an?\s+)?spy(?:\s+in\s+(?P<settlement>{NAME}))?(?:\s+disguised\s+as\s+(?:an?\s+)?(?P<disguise>.+?))?$"),
        ),
        (
            Intent::AssignMission,
            format!(r"^(?:assign|send|order)\s+(?:a\s+|my\s+|the\s+)?spy(?:\s+(?P<spy>[0-9a-f]{{8}}-[0-9a-f-]{{27}}))?\s+(?:to\s+|on\s+(?:an?\s+)?)?(?P<mission>gather[ _]intel(?:ligence)?|steal[ _]tech(?:nology)?|sabotage|spread[ _]disinformation)(?:\s+mission)?\s+(?:against|on|in|targeting|from)\s+(?P<target>{NAME})(?:\s+about\s+(?P<subject>{NAME}))?(?:\s+for\s+(?P<duration>\d+)\s+turns?)?$"),
        ),
        (
            Intent::LaunchDisinformation,
            format!(r"^(?:launch|spread|start|run)\s+(?:a\s+)?disinformation(?:\s+campaign)?\s+(?:against|to|targeting|among)\s+(?P<target>{NAME})\s+about\s+(?P<subject>{NAME})(?:\s*:\s*(?P<claim>.+))?$"),
        ),
        (
            Intent::CreateAgreement,
            format!(r"^(?:propose|create|sign|form|make|offer)\s+(?:an?\s+)?(?P<secret>secret\s+)?(?P<kind>alliance|peace|trade|non[ _-]aggression|research)(?:\s+(?:agreement|pact|treaty|deal))?\s+with\s+(?P<partner>{NAME})(?:\s*:\s*(?P<terms>.+))?$"),
        ),
        (
            Intent::BreakAgreement,
            format!(r"^(?:break|cancel|end|abandon)\s+(?:the\s+|my\s+|our\s+|all\s+)?(?P<secret>secret\s+)?(?:agreements?|alliances?|treat(?:y|ies)|pacts?|deals?)\s+with\s+(?P<partner>{NAME})$"),
        ),
        (Intent::Betray, format!(r"^betray\s+(?P<target>{NAME})$")),
        (
            Intent::DeclareWar,
            format!(r"^declare\s+war\s+(?:on|against|upon)\s+(?P<target>{NAME})$"),
        ),
    ]
}

/// Compiled pattern table.
#[derive(Debug, Clone)]
pub struct IntentParser {
    patterns: Vec<(Intent, Regex)>,
}

impl IntentParser {
    /// Compile the pattern table.
    pub fn new() -> Result<Self, AgentError> {
        let patterns = pattern_table()
            .into_iter()
            .map(|(intent, src)| Ok((intent, Regex::new(&format!("(?i){src}"))?)))
            .collect::<Result<Vec<_>, AgentError>>()?;
        Ok(Self { patterns })
    }

    /// Parse one action line. `None` if no pattern matches.
    pub fn parse(&self, line: &str) -> Option<Command> {
        let cleaned = clean(line);
        if cleaned.is_empty() {
            return None;
        }
        self.patterns.iter().find_map(|(intent, re)| {
            re.captures(&cleaned)
                .and_then(|caps| build_command(*intent, &caps))
        })
    }
}

/// Strip list markers, surrounding whitespace, and trailing punctuation.
fn clean(line: &str) -> String {
    let mut s = line.trim();
    if let Some(rest) = s.strip_prefix(['-', '*', '•']) {
        s = rest.trim_start();
    }
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = s.get(digits..).and_then(|r| r.strip_prefix(['.', ')'])) {
            s = rest.trim_start();
        }
    }
    s.trim_end_matches(['.', '!', ';']).trim().to_owned()
}

fn text(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn coords(caps: &Captures<'_>) -> Option<Position> {
    Some(Position::new(number(caps, "x")?, number(caps, "y")?))
}

fn mission_label(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.starts_with("gather") {
        "gather_intel".to_owned()
    } else if lower.starts_with("steal") {
        "steal_technology".to_owned()
    } else if lower.starts_with("spread") {
        "spread_disinformation".to_owned()
    } else {
        lower
    }
}

fn build_command(intent: Intent, caps: &Captures<'_>) -> Option<Command> {
    let cmd = match intent {
        Intent::Move => Command::Move {
            unit: text(caps, "unit")?,
            to: coords(caps)?,
        },
        Intent::Research => Command::Research {
            technology: text(caps, "tech")?,
        },
        Intent::Build => Command::Build {
            building: text(caps, "building")?,
            settlement: text(caps, "settlement"),
        },
        Intent::Found => Command::Found {
            name: text(caps, "name"),
            at: coords(caps),
        },
        Intent::Train => {
            let unit = text(caps, "unit")?;
            let settlement = text(caps, "settlement");
            if unit.parse::<UnitKind>().ok() == Some(UnitKind::Spy) {
                Command::CreateSpy {
                    settlement,
                    disguise: None,
                }
            } else {
                Command::Train { unit, settlement }
            }
        }
        Intent::Improve => Command::Improve {
            at: coords(caps)?,
            improvement: text(caps, "improvement"),
        },
        Intent::CreateSpy => Command::CreateSpy {
            settlement: text(caps, "settlement"),
            disguise: text(caps, "disguise"),
        },
        Intent::AssignMission => Command::AssignMission {
            spy: text(caps, "spy").unwrap_or_else(|| "any".to_owned()),
            mission: mission_label(&text(caps, "mission")?),
            target: text(caps, "target")?,
            duration: number(caps, "duration"),
            subject: text(caps, "subject"),
        },
        Intent::LaunchDisinformation => Command::LaunchDisinformation {
            target: text(caps, "target")?,
            subject: text(caps, "subject")?,
            claim: text(caps, "claim"),
        },
        Intent::CreateAgreement => Command::CreateAgreement {
            partner: text(caps, "partner")?,
            kind: text(caps, "kind")?,
            secret: caps.name("secret").is_some(),
            terms: text(caps, "terms"),
        },
        Intent::BreakAgreement => Command::BreakAgreement {
            partner: text(caps, "partner")?,
            secret: caps.name("secret").is_some(),
        },
        Intent::Betray => Command::Betray {
            target: text(caps, "target")?,
        },
        Intent::DeclareWar => Command::DeclareWar {
            target: text(caps, "target")?,
        },
    };
    Some(cmd)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<Command> {
        IntentParser::new().unwrap().parse(line)
    }

    #[test]
    fn move_with_and_without_parens() {
        assert_eq!(
            parse("Move warrior to (3, 4)"),
            Some(Command::Move {
                unit: "warrior".into(),
                to: Position::new(3, 4)
            })
        );
        assert_eq!(
            parse("move the settler to 2,2"),
            Some(Command::Move {
                unit: "settler".into(),
                to: Position::new(2, 2)
            })
        );
    }

    #[test]
    fn research_keeps_multiword_names() {
        assert_eq!(
            parse("Research Bronze Working."),
            Some(Command::Research {
                technology: "Bronze Working".into()
            })
        );
    }

    #[test]
    fn build_with_settlement() {
        assert_eq!(
            parse("build a library in New Haven"),
            Some(Command::Build {
                building: "library".into(),
                settlement: Some("New Haven".into())
            })
        );
    }

    #[test]
    fn build_farm_at_tile_is_an_improvement() {
        assert_eq!(
            parse("build a farm at (4, 5)"),
            Some(Command::Improve {
                at: Position::new(4, 5),
                improvement: Some("farm".into())
            })
        );
    }

    #[test]
    fn found_settlement_variants() {
        assert_eq!(
            parse("found a new city named Port Royal at (3,3)"),
            Some(Command::Found {
                name: Some("Port Royal".into()),
                at: Some(Position::new(3, 3))
            })
        );
        assert_eq!(
            parse("1. Found settlement"),
            Some(Command::Found { name: None, at: None })
        );
    }

    #[test]
    fn train_spy_routes_to_create_spy() {
        assert_eq!(
            parse("train a spy"),
            Some(Command::CreateSpy {
                settlement: None,
                disguise: None
            })
        );
        assert_eq!(
            parse("train an archer in Capital"),
            Some(Command::Train {
                unit: "archer".into(),
                settlement: Some("Capital".into())
            })
        );
    }

    #[test]
    fn improve_tile() {
        assert_eq!(
            parse("improve tile (1, 2) with a mine"),
            Some(Command::Improve {
                at: Position::new(1, 2),
                improvement: Some("mine".into())
            })
        );
    }

    #[test]
    fn create_spy_with_disguise() {
        assert_eq!(
            parse("create a spy disguised as a merchant"),
            Some(Command::CreateSpy {
                settlement: None,
                disguise: Some("merchant".into())
            })
        );
    }

    #[test]
    fn assign_mission_with_duration() {
        assert_eq!(
            parse("assign spy to steal technology from Rome for 3 turns"),
            Some(Command::AssignMission {
                spy: "any".into(),
                mission: "steal_technology".into(),
                target: "Rome".into(),
                duration: Some(3),
                subject: None,
            })
        );
        assert_eq!(
            parse("send spy on a spread disinformation mission against Rome about Carthage"),
            Some(Command::AssignMission {
                spy: "any".into(),
                mission: "spread_disinformation".into(),
                target: "Rome".into(),
                duration: None,
                subject: Some("Carthage".into()),
            })
        );
    }

    #[test]
    fn launch_disinformation_with_claim() {
        assert_eq!(
            parse("launch disinformation campaign against Rome about Carthage: they plan to invade"),
            Some(Command::LaunchDisinformation {
                target: "Rome".into(),
                subject: "Carthage".into(),
                claim: Some("they plan to invade".into()),
            })
        );
    }

    #[test]
    fn agreements() {
        assert_eq!(
            parse("propose a secret alliance with Rome"),
            Some(Command::CreateAgreement {
                partner: "Rome".into(),
                kind: "alliance".into(),
                secret: true,
                terms: None,
            })
        );
        assert_eq!(
            parse("sign non-aggression pact with Carthage: ten turns"),
            Some(Command::CreateAgreement {
                partner: "Carthage".into(),
                kind: "non-aggression".into(),
                secret: false,
                terms: Some("ten turns".into()),
            })
        );
        assert_eq!(
            parse("break alliance with Rome"),
            Some(Command::BreakAgreement {
                partner: "Rome".into(),
                secret: false
            })
        );
    }

    #[test]
    fn betray_and_declare_war() {
        assert_eq!(
            parse("betray Rome"),
            Some(Command::Betray {
                target: "Rome".into()
            })
        );
        assert_eq!(
            parse("Declare war on Carthage!"),
            Some(Command::DeclareWar {
                target: "Carthage".into()
            })
        );
    }

    #[test]
    fn unmatched_text_is_none() {
        assert_eq!(parse("contemplate the stars"), None);
        assert_eq!(parse("   "), None);
    }
}
