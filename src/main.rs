use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cityforge::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    snapshot,
    systems::{BookkeepingSystem, DisasterSystem, EconomySystem, ForestSystem, PopulationSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless city simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/new_town.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Real seconds fed to the clock per tick
    #[arg(long)]
    tick_seconds: Option<f64>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Write the final world state to this file
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cityforge=info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut world = scenario.build_world()?;
    let ticks = scenario.ticks(cli.ticks);
    let tick_seconds = cli.tick_seconds.unwrap_or(scenario.tick_seconds);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(EconomySystem::new())
        .with_system(ForestSystem::new())
        .with_system(PopulationSystem::new())
        .with_system(DisasterSystem::new())
        .with_system(BookkeepingSystem::new())
        .build();

    engine.run(&mut world, ticks, tick_seconds)?;
    if let Some(path) = &cli.save {
        snapshot::write_save(path, &world)?;
    }

    let summary = world.snapshot(&scenario.name);
    println!(
        "Scenario '{}' completed for {} ticks on {}. Citizens: {} (avg satisfaction {:.1}), money: {:.2}",
        scenario.name,
        ticks,
        summary.date,
        summary.citizens,
        summary.average_satisfaction,
        summary.money
    );
    Ok(())
}
