use std::path::PathBuf;

use outbreak::{
    colour::Rgba,
    disease::{Difficulty, DiseaseProfile},
    engine::{Engine, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    simulation::{Simulation, TickScale},
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn load(file: &str) -> Scenario {
    scenario_loader()
        .load(PathBuf::from("scenarios").join(file))
        .expect("scenario parses")
}

fn build_engine(scenario: &Scenario, difficulty: Difficulty, snapshot_dir: PathBuf, interval: u64) -> Engine {
    let registry = scenario.build_registry().expect("valid registry");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        tuning: scenario.spread,
        snapshot_interval_days: interval,
        snapshot_dir,
    };
    Engine::new(
        settings,
        Simulation::new(&registry, scenario.tick_scale()),
        DiseaseProfile::from_preset("Fixture Flu", difficulty),
    )
}

#[test]
fn earth_fixture_loads_and_validates() {
    let scenario = load("earth.yaml");
    assert_eq!(scenario.name, "earth");
    assert_eq!(scenario.regions.len(), 18);
    assert_eq!(scenario.tick_scale(), TickScale::SubDay { ticks_per_day: 20 });
    assert_eq!(scenario.origin.as_deref(), Some("china"));

    let registry = scenario.build_registry().expect("land table is symmetric");
    assert!(registry.land().neighbours("oceania").is_empty());
    assert_eq!(registry.land().neighbours("uk"), ["europe".to_string()]);
    assert_eq!(registry.region_at_colour(Rgba(0, 255, 0, 255)), Some("china"));
    assert_eq!(registry.region_at_colour(Rgba(1, 2, 3, 255)), None);
}

#[test]
fn engine_runs_deterministically() {
    let scenario = load("earth.yaml");
    let mut frames = Vec::new();
    for _ in 0..2 {
        let mut engine = build_engine(&scenario, Difficulty::Easy, PathBuf::from("unused"), 0);
        engine.start_outbreak("china").unwrap();
        engine.run_days(40).unwrap();
        frames.push(serde_json::to_string(&engine.snapshot()).unwrap());
    }
    assert_eq!(frames[0], frames[1]);
}

#[test]
fn outbreak_crosses_land_borders() {
    let scenario = load("earth.yaml");
    let mut engine = build_engine(&scenario, Difficulty::Easy, PathBuf::from("unused"), 0);
    engine.start_outbreak("china").unwrap();
    engine.run_days(60).unwrap();

    let sim = engine.simulation();
    let reached: Vec<&str> = sim
        .regions()
        .filter(|region| region.name() != "china" && region.active_cases() + region.dead() > 0.0)
        .map(|region| region.name())
        .collect();
    assert!(!reached.is_empty(), "no neighbour of china was seeded");
    for name in &reached {
        assert_ne!(*name, "oceania", "oceania has no land border");
    }
    assert!(sim.last_export_day("china").is_some());
}

#[test]
fn engine_emits_snapshots() {
    let scenario = load("testland.yaml");
    let temp_dir = tempfile::tempdir().unwrap();
    let snapshot_dir = temp_dir.path().join("snaps");

    let mut engine = build_engine(&scenario, Difficulty::Medium, snapshot_dir.clone(), 10);
    engine.start_outbreak("testland").unwrap();
    let mut days = Vec::new();
    engine
        .run_with_hook(scenario.days(None), |snapshot| days.push(snapshot.day))
        .unwrap();
    assert_eq!(days.len(), 30);

    let expected = snapshot_dir.join("testland").join("day_000010.json");
    assert!(expected.exists(), "expected snapshot {} to exist", expected.display());
    assert!(snapshot_dir.join("testland").join("day_000030.json").exists());
    assert!(!snapshot_dir.join("testland").join("day_000005.json").exists());

    let data = std::fs::read_to_string(expected).unwrap();
    assert!(data.contains("\"scenario\": \"testland\""));
    assert!(data.contains("\"disease\": \"Fixture Flu\""));
}

#[test]
fn hud_totals_match_region_sums() {
    let scenario = load("earth.yaml");
    let mut engine = build_engine(&scenario, Difficulty::Hard, PathBuf::from("unused"), 0);
    engine.start_outbreak("europe").unwrap();
    engine.run_days(5).unwrap();

    let snapshot = engine.snapshot();
    let population: u64 = snapshot.regions.iter().map(|r| r.population).sum();
    assert_eq!(snapshot.totals.population, population);
    assert_eq!(snapshot.totals.label, "Global");
    assert_eq!(snapshot.day, 5);
    let europe = snapshot.region("europe").expect("europe row");
    assert!(europe.infected > 0.0);
    assert_eq!(europe.colour.3, 255);
}
