//! Save files and periodic JSON checkpoints.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    clock::{self, Clock, ClockError, DATE_TIME_FORMAT},
    components::{
        Citizen, CitizenId, DisasterState, Entity, EntityData, EntityKind, Forest, Influence,
        ObjectId, Wallet, Zone,
    },
    config::Catalog,
    geometry::{Footprint, TilePos},
    grid::{Terrain, WorldGrid},
    population::{simulate_building_addition, Population},
    world::World,
};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error("entity {id} is a {kind} but carries {found} properties")]
    Properties {
        id: u64,
        kind: EntityKind,
        found: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainRecord {
    pub tile: TilePos,
    pub terrain: Terrain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub width: i32,
    pub height: i32,
    pub terrain: Vec<TerrainRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityProperties {
    Plain,
    Influence {
        radius: i32,
        satisfaction: f64,
    },
    Forest {
        radius: i32,
        satisfaction: f64,
        year: u32,
        mature: bool,
    },
    Disaster {
        linked: Vec<u64>,
    },
    Zone {
        level: u8,
        capacity: u32,
        money_per_day: f64,
        accrued_revenue: f64,
    },
}

impl EntityProperties {
    fn label(&self) -> &'static str {
        match self {
            EntityProperties::Plain => "plain",
            EntityProperties::Influence { .. } => "influence",
            EntityProperties::Forest { .. } => "forest",
            EntityProperties::Disaster { .. } => "disaster",
            EntityProperties::Zone { .. } => "zone",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u64,
    pub kind: EntityKind,
    pub tile: TilePos,
    pub width: i32,
    pub height: i32,
    pub created: String,
    pub price: f64,
    pub maintenance_fee: f64,
    pub properties: EntityProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitizenRecord {
    pub id: u64,
    pub home: Option<u64>,
    pub work: Option<u64>,
    pub satisfaction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockRecord {
    pub base_rate: f64,
    pub speed_multiplier: f64,
    pub paused: bool,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub object_count: u64,
    pub next_object_id: u64,
    pub next_citizen_id: u64,
}

/// Everything needed to rebuild a `World`. Zone occupant lists and decorative
/// buildings are derived from the citizen records on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    pub map: MapRecord,
    pub entities: Vec<EntityRecord>,
    pub citizens: Vec<CitizenRecord>,
    pub clock: ClockRecord,
    pub counters: Counters,
    pub money: f64,
    pub tax_rate: f64,
    pub game_start: String,
    pub catalog: Catalog,
}

fn entity_record(entity: &Entity) -> EntityRecord {
    let properties = match &entity.data {
        EntityData::Road => EntityProperties::Plain,
        EntityData::PoliceDepartment(influence) | EntityData::Stadium(influence) => {
            EntityProperties::Influence {
                radius: influence.radius,
                satisfaction: influence.satisfaction,
            }
        }
        EntityData::Forest(forest) => EntityProperties::Forest {
            radius: forest.influence.radius,
            satisfaction: forest.influence.satisfaction,
            year: forest.year,
            mature: forest.mature,
        },
        EntityData::Disaster(state) => EntityProperties::Disaster {
            linked: state.linked.iter().map(|id| id.raw()).collect(),
        },
        EntityData::ResidentialZone(zone)
        | EntityData::IndustrialZone(zone)
        | EntityData::ServiceZone(zone) => EntityProperties::Zone {
            level: zone.level,
            capacity: zone.capacity,
            money_per_day: zone.money_per_day,
            accrued_revenue: zone.accrued_revenue,
        },
    };
    EntityRecord {
        id: entity.id.raw(),
        kind: entity.kind(),
        tile: entity.origin(),
        width: entity.footprint.width,
        height: entity.footprint.height,
        created: clock::format_date(entity.created),
        price: entity.price,
        maintenance_fee: entity.maintenance_fee,
        properties,
    }
}

fn entity_from_record(record: EntityRecord) -> Result<Entity, SaveError> {
    let mismatch = |props: &EntityProperties| SaveError::Properties {
        id: record.id,
        kind: record.kind,
        found: props.label(),
    };
    let zone = |level, capacity, money_per_day, accrued_revenue| Zone {
        level,
        capacity,
        money_per_day,
        accrued_revenue,
        ..Zone::new(capacity, money_per_day)
    };
    let data = match (record.kind, &record.properties) {
        (EntityKind::Road, EntityProperties::Plain) => EntityData::Road,
        (EntityKind::PoliceDepartment, EntityProperties::Influence { radius, satisfaction }) => {
            EntityData::PoliceDepartment(Influence {
                radius: *radius,
                satisfaction: *satisfaction,
            })
        }
        (EntityKind::Stadium, EntityProperties::Influence { radius, satisfaction }) => {
            EntityData::Stadium(Influence {
                radius: *radius,
                satisfaction: *satisfaction,
            })
        }
        (
            EntityKind::Forest,
            EntityProperties::Forest {
                radius,
                satisfaction,
                year,
                mature,
            },
        ) => EntityData::Forest(Forest {
            influence: Influence {
                radius: *radius,
                satisfaction: *satisfaction,
            },
            year: *year,
            mature: *mature,
        }),
        (EntityKind::Disaster, EntityProperties::Disaster { linked }) => {
            EntityData::Disaster(DisasterState {
                linked: linked.iter().map(|id| ObjectId(*id)).collect(),
            })
        }
        (
            kind,
            EntityProperties::Zone {
                level,
                capacity,
                money_per_day,
                accrued_revenue,
            },
        ) if kind.is_zone() => {
            let state = zone(*level, *capacity, *money_per_day, *accrued_revenue);
            match kind {
                EntityKind::ResidentialZone => EntityData::ResidentialZone(state),
                EntityKind::IndustrialZone => EntityData::IndustrialZone(state),
                _ => EntityData::ServiceZone(state),
            }
        }
        (_, props) => return Err(mismatch(props)),
    };
    Ok(Entity {
        id: ObjectId(record.id),
        footprint: Footprint::new(record.tile, record.width, record.height),
        created: clock::parse_date(&record.created)?,
        price: record.price,
        maintenance_fee: record.maintenance_fee,
        data,
    })
}

impl SaveState {
    pub fn capture(world: &World) -> Self {
        let grid = world.grid();
        let clock = world.clock();
        SaveState {
            map: MapRecord {
                width: grid.width(),
                height: grid.height(),
                terrain: grid
                    .terrain_tiles()
                    .into_iter()
                    .map(|(tile, terrain)| TerrainRecord { tile, terrain })
                    .collect(),
            },
            entities: grid.entities().map(entity_record).collect(),
            citizens: world
                .population()
                .iter()
                .map(|citizen| CitizenRecord {
                    id: citizen.id.raw(),
                    home: citizen.home.map(ObjectId::raw),
                    work: citizen.work.map(ObjectId::raw),
                    satisfaction: citizen.satisfaction,
                })
                .collect(),
            clock: ClockRecord {
                base_rate: clock.base_rate(),
                speed_multiplier: clock.speed_multiplier(),
                paused: clock.is_paused(),
                current: clock.current_time().format(DATE_TIME_FORMAT).to_string(),
            },
            counters: Counters {
                object_count: grid.object_count(),
                next_object_id: grid.next_object_id(),
                next_citizen_id: world.population().next_id(),
            },
            money: world.wallet().balance(),
            tax_rate: world.tax_rate(),
            game_start: clock::format_date(world.game_start()),
            catalog: world.catalog().clone(),
        }
    }

    pub fn restore(self) -> Result<World, SaveError> {
        let mut grid = WorldGrid::new(self.map.width, self.map.height);
        for record in self.map.terrain {
            grid.set_terrain(record.tile, record.terrain);
        }
        for record in self.entities {
            grid.restore(entity_from_record(record)?);
        }
        grid.restore_counters(self.counters.object_count, self.counters.next_object_id);

        let mut population = Population::new();
        for record in self.citizens {
            let citizen = Citizen {
                id: CitizenId(record.id),
                satisfaction: record.satisfaction,
                home: record.home.map(ObjectId),
                work: record.work.map(ObjectId),
            };
            for zone in [citizen.home, citizen.work].into_iter().flatten() {
                attach(&mut grid, zone, citizen.id);
            }
            population.restore(citizen);
        }
        population.restore_next_id(self.counters.next_citizen_id);
        for id in grid.ids() {
            if let Some(entity) = grid.get_mut(id) {
                simulate_building_addition(entity);
            }
        }

        let clock = Clock::restore(
            clock::parse_date_time(&self.clock.current)?,
            self.clock.base_rate,
            self.clock.speed_multiplier,
            self.clock.paused,
        )?;
        let game_start = clock::parse_date(&self.game_start)?;
        Ok(World::from_parts(
            grid,
            population,
            Wallet::new(self.money),
            clock,
            self.catalog,
            game_start,
            self.tax_rate,
        ))
    }
}

fn attach(grid: &mut WorldGrid, zone: ObjectId, citizen: CitizenId) {
    match grid.get_mut(zone).and_then(Entity::zone_mut) {
        Some(state) if state.has_room() => state.occupants.push(citizen),
        Some(_) => warn!(%zone, %citizen, "saved zone over capacity, link dropped"),
        None => warn!(%zone, %citizen, "saved link to a missing zone"),
    }
}

pub fn write_save(path: impl AsRef<Path>, world: &World) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&SaveState::capture(world))?;
    fs::write(path, json).with_context(|| format!("Failed to write save {}", path.display()))?;
    Ok(())
}

pub fn load_save(path: impl AsRef<Path>) -> Result<SaveState> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read save {}", path.display()))?;
    let save: SaveState = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(save)
}

/// Writes a `SaveState` every `interval_ticks` ticks to
/// `<dir>/<scenario>/tick_NNNNNN.json`.
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval_ticks: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    pub fn maybe_write(&self, world: &World, scenario_name: &str) -> Result<Option<PathBuf>> {
        let tick = world.tick();
        if self.interval_ticks == 0 || tick % self.interval_ticks != 0 {
            return Ok(None);
        }
        let path = self
            .output_dir
            .join(scenario_name)
            .join(format!("tick_{tick:06}.json"));
        write_save(&path, world)?;
        debug!(path = %path.display(), "snapshot written");
        Ok(Some(path))
    }
}
