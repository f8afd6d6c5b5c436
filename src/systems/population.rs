use anyhow::Result;
use tracing::{info, warn};

use crate::{
    engine::{System, SystemContext},
    migration::{monthly_migration, MigrationReport},
    rng::SystemRng,
    world::World,
};

/// Month-start population pass: the bankruptcy penalty followed by
/// migration and job placement.
pub fn start_of_month(world: &mut World) -> MigrationReport {
    if world.wallet.is_bankrupt() {
        let penalty = world.catalog.citizens.bankruptcy_penalty;
        world.population.apply_bankruptcy_penalty(penalty);
        warn!(
            money = world.wallet.balance(),
            average_satisfaction = world.population.average_satisfaction(),
            "treasury empty, citizens lose confidence"
        );
    }
    let World {
        grid,
        population,
        catalog,
        ..
    } = world;
    let report = monthly_migration(grid, population, catalog);
    info!(
        arrivals = report.arrivals,
        employed = report.employed,
        citizens = population.len(),
        "monthly migration"
    );
    report
}

pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &str {
        "population"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if ctx.new_month {
            start_of_month(world);
        }
        Ok(())
    }
}
