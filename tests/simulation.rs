use cityforge::{
    components::{EntityKind, MAX_SATISFACTION, MIN_SATISFACTION},
    engine::{EngineBuilder, EngineSettings},
    geometry::TilePos,
    scenario::{Scenario, ScenarioLoader},
    snapshot::SaveState,
    systems::{BookkeepingSystem, DisasterSystem, EconomySystem, ForestSystem, PopulationSystem},
    World,
};
use tempfile::tempdir;

fn load_scenario() -> Scenario {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/new_town.yaml")
        .expect("scenario should load")
}

fn build_engine(seed: u64, snapshot_dir: std::path::PathBuf) -> EngineBuilder {
    let settings = EngineSettings {
        scenario_name: "new_town".into(),
        seed,
        snapshot_interval_ticks: 0,
        snapshot_dir,
    };
    EngineBuilder::new(settings)
        .with_system(EconomySystem::new())
        .with_system(ForestSystem::new())
        .with_system(PopulationSystem::new())
        .with_system(DisasterSystem::new())
        .with_system(BookkeepingSystem::new())
}

fn assert_invariants(world: &World) {
    for zone in world.zones() {
        let state = zone.zone().expect("zone state");
        assert!(state.occupancy() <= state.capacity, "{} over capacity", zone.id);
        for citizen in &state.occupants {
            assert!(world.population().contains(*citizen), "orphan {citizen}");
        }
    }
    for citizen in world.citizens() {
        assert!((MIN_SATISFACTION..=MAX_SATISFACTION).contains(&citizen.satisfaction));
        assert!(citizen.is_valid());
    }
}

#[test]
fn every_crossed_day_is_processed() {
    let scenario = load_scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();

    let mut ticks = Vec::new();
    engine
        .run_with_hook(&mut world, 10, 3.0, |snapshot| ticks.push(snapshot.tick))
        .expect("run succeeds");

    assert_eq!(ticks, (1..=10).collect::<Vec<_>>());
    assert_eq!(world.clock().current_date_str(), "2024-01-31");
}

#[test]
fn a_single_tick_can_cover_many_days() {
    let scenario = load_scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();
    let days = engine.tick(&mut world, 45.0).unwrap();
    assert_eq!(days.len(), 45);
    assert_eq!(days.first().map(|d| d.to_string()), Some("2024-01-02".into()));
}

#[test]
fn paused_clock_runs_no_systems() {
    let scenario = load_scenario();
    let mut world = scenario.build_world().unwrap();
    world.clock_mut().pause();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();
    assert!(engine.tick(&mut world, 100.0).unwrap().is_empty());
    assert_eq!(world.clock().current_date_str(), "2024-01-01");
    world.clock_mut().resume();
    assert_eq!(engine.tick(&mut world, 1.0).unwrap().len(), 1);
}

#[test]
fn town_grows_at_the_first_month_boundary() {
    let scenario = load_scenario();
    let mut world = scenario.build_world().unwrap();
    let seeded = world.population().len();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();
    engine.run(&mut world, 30, 1.0).unwrap();
    assert_eq!(world.population().len(), seeded);
    engine.run(&mut world, 1, 1.0).unwrap();
    assert!(world.population().len() > seeded);
    assert_invariants(&world);
}

#[test]
fn two_years_keep_invariants() {
    let scenario = load_scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();
    engine
        .run_with_hook(&mut world, 730, 1.0, |snapshot| {
            assert!(snapshot.average_satisfaction <= MAX_SATISFACTION);
        })
        .unwrap();
    assert_invariants(&world);
}

#[test]
fn runs_are_deterministic() {
    let scenario = load_scenario();
    let temp = tempdir().expect("tempdir");
    let mut states = Vec::new();
    for _ in 0..2 {
        let mut world = scenario.build_world().unwrap();
        let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();
        engine.run(&mut world, 400, 1.0).unwrap();
        states.push(SaveState::capture(&world));
    }
    assert_eq!(states[0], states[1]);
}

#[test]
fn disaster_cascade_empties_the_neighbourhood() {
    let scenario = load_scenario();
    let mut world = scenario.build_world().unwrap();
    let home = world
        .grid()
        .find_at(TilePos::new(2, 2), EntityKind::ResidentialZone)
        .unwrap();
    assert_eq!(world.population().len(), 12);
    world
        .place_request(TilePos::new(2, 2), EntityKind::Disaster)
        .unwrap();

    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf()).build();
    engine.run(&mut world, 29, 1.0).unwrap();
    assert_eq!(world.population().len(), 12);
    engine.run(&mut world, 1, 1.0).unwrap();

    assert!(!world.grid().contains(home));
    assert!(world.population().is_empty());
    assert!(world.disasters().is_empty());
    for zone in world.zones() {
        assert_eq!(zone.zone().unwrap().occupancy(), 0);
    }
}
