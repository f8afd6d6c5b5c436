use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info_span};

use crate::{
    clock::{starts_month, starts_year},
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

/// Drives the clock and runs every system once for each calendar day the
/// clock enters.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    /// Advances the world by `delta_real_seconds` of wall time. Returns the
    /// simulated days that were processed.
    pub fn tick(&mut self, world: &mut World, delta_real_seconds: f64) -> Result<Vec<NaiveDate>> {
        world.clock.advance(delta_real_seconds);
        world.advance_tick();
        let days = world.clock.crossed_days();
        for date in &days {
            let _span = info_span!("day", %date).entered();
            let ctx = SystemContext {
                tick: world.tick(),
                date: *date,
                new_month: starts_month(*date),
                new_year: starts_year(*date),
                scenario_name: &self.settings.scenario_name,
            };
            for system in &mut self.systems {
                let mut rng_stream = self.rng.stream(system.name());
                system.run(&ctx, world, &mut rng_stream)?;
            }
        }
        debug!(tick = world.tick(), days = days.len(), date = %world.clock.current_date(), "tick");
        self.snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        Ok(days)
    }

    pub fn run(&mut self, world: &mut World, ticks: u64, tick_seconds: f64) -> Result<()> {
        self.run_with_hook(world, ticks, tick_seconds, |_| {})
    }

    /// Like `run`, handing a snapshot to `hook` after every tick.
    pub fn run_with_hook(
        &mut self,
        world: &mut World,
        ticks: u64,
        tick_seconds: f64,
        mut hook: impl FnMut(&WorldSnapshot),
    ) -> Result<()> {
        for _ in 0..ticks {
            self.tick(world, tick_seconds)?;
            hook(&world.snapshot(&self.settings.scenario_name));
        }
        Ok(())
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    /// The simulated day being processed.
    pub date: NaiveDate,
    pub new_month: bool,
    pub new_year: bool,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
