//! End-to-end scenarios driven through the engine facade.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use realpolitik_agents::espionage;
use realpolitik_core::setup::make_unit;
use realpolitik_core::{DecisionError, DecisionProvider, GameConfig, GameEngine, IdleProvider};
use realpolitik_types::{
    CivId, Command, Decision, DiplomaticStatus, GameEventKind, MissionKind, Position, StateView,
    Terrain, UnitKind,
};

struct FixedRng(u64);

impl rand::RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        u32::try_from(self.0 >> 32).unwrap()
    }
    fn next_u64(&mut self) -> u64 {
        self.0
    }
    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

/// Founds a settlement at (3,3) on turn 1 for one civ, once it is known.
struct Founder {
    civ: Arc<OnceLock<CivId>>,
}

impl DecisionProvider for Founder {
    fn decide(
        &self,
        civ: CivId,
        _view: StateView,
        turn: u64,
    ) -> BoxFuture<'static, Result<Decision, DecisionError>> {
        let decision = if self.civ.get() == Some(&civ) && turn == 1 {
            Decision {
                commands: vec![Command::Found {
                    name: Some("Ostia".into()),
                    at: Some(Position::new(3, 3)),
                }],
                ..Decision::default()
            }
        } else {
            Decision::default()
        };
        Box::pin(async move { Ok(decision) })
    }
}

fn config(max_turns: u64) -> GameConfig {
    GameConfig {
        map_width: 8,
        map_height: 8,
        civilizations: 2,
        max_turns,
        turn_delay_ms: 0,
        random_events: false,
        ..GameConfig::default()
    }
}

fn idle_engine(max_turns: u64) -> GameEngine {
    let mut engine = GameEngine::new(config(max_turns), Arc::new(IdleProvider::new())).unwrap();
    engine.initialize().unwrap();
    engine.start().unwrap();
    engine
}

#[tokio::test]
async fn quiet_game_stays_unknown() {
    let mut engine = idle_engine(5);
    for _ in 0..5 {
        engine.run_turn().await.unwrap();
    }
    let state = engine.state();
    let (a, b) = (state.civs[0].id, state.civs[1].id);
    assert!(
        !state
            .events
            .iter()
            .any(|e| matches!(e.kind, GameEventKind::Battle { .. }))
    );
    for civ in [a, b] {
        assert_eq!(state.resource_passes.get(&civ).copied(), Some(5));
    }
    assert_eq!(state.status(a, b), DiplomaticStatus::Unknown);
    assert!(engine.is_finished());
}

#[tokio::test]
async fn founding_claims_the_tile() {
    let slot = Arc::new(OnceLock::new());
    let provider = Founder {
        civ: Arc::clone(&slot),
    };
    let mut engine = GameEngine::new(config(3), Arc::new(provider)).unwrap();
    engine.initialize().unwrap();
    let a = engine.state().civs[0].id;
    slot.set(a).unwrap();

    let target = Position::new(3, 3);
    let settler = engine.state().resolve_unit(a, "settler").unwrap();
    let state = engine.state_mut();
    state.map.set_terrain(target, Terrain::Grassland).unwrap();
    state.units.get_mut(&settler).unwrap().position = target;
    assert!(engine.state().settlement_at(target).is_none());
    assert!(!engine.state().fog.is_visible(a, Position::new(5, 5)));

    engine.start().unwrap();
    engine.run_turn().await.unwrap();

    let state = engine.state();
    let settlement = state.settlement_at(target).unwrap();
    assert_eq!(settlement.owner, a);
    assert_eq!(settlement.name, "Ostia");
    assert_eq!(state.map.tile(target).unwrap().settlement, Some(settlement.id));
    assert!(!state.units.contains_key(&settler));
    assert!(state.fog.is_visible(a, Position::new(5, 5)));
    assert!(state.fog.is_visible(a, Position::new(1, 1)));
}

#[tokio::test]
async fn forced_success_intel_mission() {
    let mut engine = idle_engine(5);
    engine.set_rng(Box::new(FixedRng(u64::MAX)));
    let (a, b) = (engine.state().civs[0].id, engine.state().civs[1].id);
    let mut spy = make_unit(a, UnitKind::Spy, Position::new(1, 1), 0);
    espionage::assign_mission(&mut spy, MissionKind::GatherIntel, b, None, Some(1), 0).unwrap();
    assert!((spy.mission.as_ref().unwrap().risk - 0.3).abs() < f64::EPSILON);
    let state = engine.state_mut();
    state.ensure_contact(a, b);
    state.units.insert(spy.id, spy);

    engine.run_turn().await.unwrap();

    let intel = engine.state().civ(a).unwrap().intel.get(&b).unwrap();
    assert_eq!(intel.len(), 1);
    assert!((0.7..=0.95).contains(&intel[0].accuracy));
}
