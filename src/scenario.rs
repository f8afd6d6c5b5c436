use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::{
    clock::{self, Clock},
    components::EntityKind,
    config::Catalog,
    geometry::{Footprint, TilePos},
    grid::{Terrain, WorldGrid},
    migration::assign_workforce,
    world::World,
};

fn default_start_date() -> String {
    "2024-01-01".to_string()
}

fn default_base_rate() -> f64 {
    86_400.0
}

fn default_speed_multiplier() -> f64 {
    1.0
}

fn default_tick_seconds() -> f64 {
    1.0
}

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_money() -> f64 {
    10_000.0
}

fn default_tax_rate() -> f64 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    /// Simulated seconds per real second at speed multiplier 1.
    #[serde(default = "default_base_rate")]
    pub base_rate: f64,
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,
    #[serde(default)]
    pub ticks: Option<u64>,
    /// Real seconds fed to the clock per tick.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default = "default_money")]
    pub money: f64,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    pub map: MapSpec,
    #[serde(default)]
    pub forests: Vec<TilePos>,
    #[serde(default)]
    pub layout: Vec<PlacementSpec>,
    #[serde(default)]
    pub initial_citizens: u32,
    #[serde(default)]
    pub catalog: Catalog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSpec {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub water: Vec<AreaSpec>,
    #[serde(default)]
    pub shore: Vec<AreaSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AreaSpec {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<AreaSpec> for Footprint {
    fn from(area: AreaSpec) -> Self {
        Footprint::new(TilePos::new(area.x, area.y), area.width, area.height)
    }
}

/// A pre-built entity present when the game starts.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementSpec {
    pub kind: EntityKind,
    pub x: i32,
    pub y: i32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self) -> Result<World> {
        let start = clock::parse_date(&self.start_date)
            .with_context(|| format!("Invalid start_date in scenario '{}'", self.name))?;
        let clock = Clock::new(start, self.base_rate, self.speed_multiplier)?;

        let mut grid = WorldGrid::new(self.map.width, self.map.height);
        for area in &self.map.shore {
            grid.set_terrain_area((*area).into(), Terrain::Shore);
        }
        for area in &self.map.water {
            grid.set_terrain_area((*area).into(), Terrain::Water);
        }

        let mut world = World::new(grid, clock, self.money, self.catalog.clone());
        world.set_tax_rate(self.tax_rate)?;

        for tile in &self.forests {
            world
                .place_exempt(*tile, EntityKind::Forest)
                .with_context(|| format!("Failed to plant forest at {tile:?}"))?;
        }
        for placement in &self.layout {
            let tile = TilePos::new(placement.x, placement.y);
            world
                .place_exempt(tile, placement.kind)
                .with_context(|| format!("Failed to place {} at {tile:?}", placement.kind))?;
        }

        if self.initial_citizens > 0 {
            let satisfaction = self.catalog.citizens.initial_satisfaction;
            let World {
                grid, population, ..
            } = &mut world;
            let homed = population.spawn_initial(grid, self.initial_citizens, satisfaction);
            let home = homed
                .first()
                .and_then(|id| population.get(*id))
                .and_then(|citizen| citizen.home);
            if let Some(home) = home {
                let employed = assign_workforce(grid, population, home);
                info!(homed = homed.len(), employed, "seeded initial citizens");
            }
        }
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(365)
    }
}
