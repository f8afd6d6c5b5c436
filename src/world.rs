use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    clock::Clock,
    components::{Citizen, Entity, EntityKind, ObjectId, Wallet, MAX_ZONE_LEVEL},
    config::Catalog,
    geometry::TilePos,
    grid::{PlacementError, WorldGrid},
    population::{simulate_building_addition, Population},
    roads::{severed_links, RoadGraph},
    satisfaction,
    snapshot::{SaveError, SaveState},
    systems::disaster,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemovalError {
    #[error("no {kind} at {tile:?}")]
    NotFound { kind: EntityKind, tile: TilePos },
    #[error("road at {tile:?} is the only link for {severed} home/work pairs")]
    RoadRemovalDenied { tile: TilePos, severed: usize },
    #[error("{zone} still has {occupants} occupants")]
    ZoneOccupied { zone: ObjectId, occupants: u32 },
    #[error("{0} cannot be removed by hand")]
    NotRemovable(EntityKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReclassifyError {
    #[error("no zone at {0:?}")]
    NotFound(TilePos),
    #[error("{0} is not a zone")]
    NotAZone(ObjectId),
    #[error("{zone} still has {occupants} occupants")]
    ZoneOccupied { zone: ObjectId, occupants: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    #[error("no zone at {0:?}")]
    NotFound(TilePos),
    #[error("{0} is already at the top level")]
    MaxLevel(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("tax rate {0} is outside [0, 1]")]
pub struct TaxRateError(pub f64);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneSnapshot {
    pub id: u64,
    pub kind: EntityKind,
    pub origin: TilePos,
    pub level: u8,
    pub capacity: u32,
    pub occupants: u32,
    pub buildings: usize,
    pub reachable_workplaces: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub date: String,
    pub money: f64,
    pub tax_rate: f64,
    pub citizens: usize,
    pub unemployed: usize,
    pub average_satisfaction: f64,
    pub roads: usize,
    pub structures: usize,
    pub disasters: usize,
    pub zones: Vec<ZoneSnapshot>,
}

/// Everything the simulation mutates, owned in one place.
pub struct World {
    pub(crate) grid: WorldGrid,
    pub(crate) population: Population,
    pub(crate) wallet: Wallet,
    pub(crate) clock: Clock,
    pub(crate) catalog: Catalog,
    game_start: NaiveDate,
    tax_rate: f64,
    tick: u64,
}

impl World {
    pub fn new(grid: WorldGrid, clock: Clock, money: f64, catalog: Catalog) -> Self {
        Self {
            game_start: clock.current_date(),
            grid,
            population: Population::new(),
            wallet: Wallet::new(money),
            clock,
            catalog,
            tax_rate: 0.0,
            tick: 0,
        }
    }

    pub(crate) fn from_parts(
        grid: WorldGrid,
        population: Population,
        wallet: Wallet,
        clock: Clock,
        catalog: Catalog,
        game_start: NaiveDate,
        tax_rate: f64,
    ) -> Self {
        Self {
            grid,
            population,
            wallet,
            clock,
            catalog,
            game_start,
            tax_rate,
            tick: 0,
        }
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut WorldGrid {
        &mut self.grid
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn game_start(&self) -> NaiveDate {
        self.game_start
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate
    }

    pub fn set_tax_rate(&mut self, rate: f64) -> Result<(), TaxRateError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(TaxRateError(rate));
        }
        self.tax_rate = rate;
        Ok(())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Builds `kind` with its origin at `tile`, paying the catalog price.
    pub fn place_request(&mut self, tile: TilePos, kind: EntityKind) -> Result<ObjectId, PlacementError> {
        if kind == EntityKind::Disaster {
            return disaster::trigger(self, tile);
        }
        let blueprint = self
            .catalog
            .blueprint(kind, tile, self.clock.current_date());
        let id = self.grid.place(blueprint, &mut self.wallet)?;
        if kind.affects_satisfaction() {
            satisfaction::on_structure_added(&self.grid, &mut self.population, id);
        }
        debug!(%id, %kind, ?tile, money = self.wallet.balance(), "placed");
        Ok(id)
    }

    /// Places `kind` for free, used for scripted map features.
    pub fn place_exempt(&mut self, tile: TilePos, kind: EntityKind) -> Result<ObjectId, PlacementError> {
        let blueprint = self
            .catalog
            .blueprint(kind, tile, self.clock.current_date());
        let id = self.grid.place_exempt(blueprint)?;
        if kind.affects_satisfaction() {
            satisfaction::on_structure_added(&self.grid, &mut self.population, id);
        }
        Ok(id)
    }

    pub fn remove_request(&mut self, tile: TilePos, kind: EntityKind) -> Result<(), RemovalError> {
        let id = self
            .grid
            .find_at(tile, kind)
            .ok_or(RemovalError::NotFound { kind, tile })?;
        match kind {
            EntityKind::Disaster => return Err(RemovalError::NotRemovable(kind)),
            EntityKind::Road => {
                let severed = severed_links(&self.grid, tile);
                if !severed.is_empty() {
                    info!(?tile, severed = severed.len(), "road removal denied");
                    return Err(RemovalError::RoadRemovalDenied {
                        tile,
                        severed: severed.len(),
                    });
                }
            }
            kind if kind.is_zone() => {
                let occupants = self.occupancy_of(id);
                if occupants > 0 {
                    return Err(RemovalError::ZoneOccupied { zone: id, occupants });
                }
            }
            _ => {
                satisfaction::on_structure_removed(&self.grid, &mut self.population, id);
            }
        }
        self.grid.remove(id);
        debug!(%id, %kind, ?tile, "removed");
        Ok(())
    }

    /// Turns the zone covering `tile` back into vacant land.
    pub fn reclassify_zone(&mut self, tile: TilePos) -> Result<(), ReclassifyError> {
        let id = self
            .zone_at(tile)
            .ok_or(ReclassifyError::NotFound(tile))?;
        self.reclassify_zone_id(id)
    }

    pub(crate) fn reclassify_zone_id(&mut self, id: ObjectId) -> Result<(), ReclassifyError> {
        if !self.grid.kind_of(id).is_some_and(EntityKind::is_zone) {
            return Err(ReclassifyError::NotAZone(id));
        }
        let occupants = self.occupancy_of(id);
        if occupants > 0 {
            return Err(ReclassifyError::ZoneOccupied { zone: id, occupants });
        }
        self.grid.remove(id);
        debug!(%id, "zone reclassified to vacant land");
        Ok(())
    }

    /// Raises the zone covering `tile` one level, paying its price again.
    pub fn upgrade_zone(&mut self, tile: TilePos) -> Result<u8, UpgradeError> {
        let id = self.zone_at(tile).ok_or(UpgradeError::NotFound(tile))?;
        let catalog = &self.catalog;
        let Some(entity) = self.grid.get_mut(id) else {
            return Err(UpgradeError::NotFound(tile));
        };
        let price = entity.price;
        let Some(zone) = entity.zone_mut() else {
            return Err(UpgradeError::NotFound(tile));
        };
        if zone.level >= MAX_ZONE_LEVEL {
            return Err(UpgradeError::MaxLevel(id));
        }
        zone.level += 1;
        zone.capacity = catalog.capacity_for_level(zone.level);
        let level = zone.level;
        simulate_building_addition(entity);
        self.wallet.charge(price);
        info!(%id, level, money = self.wallet.balance(), "zone upgraded");
        Ok(level)
    }

    fn zone_at(&self, tile: TilePos) -> Option<ObjectId> {
        self.grid
            .entity_at(tile)
            .filter(|entity| entity.kind().is_zone())
            .map(|entity| entity.id)
    }

    fn occupancy_of(&self, id: ObjectId) -> u32 {
        self.grid
            .get(id)
            .and_then(Entity::zone)
            .map(|zone| zone.occupancy())
            .unwrap_or(0)
    }

    pub fn zones(&self) -> Vec<&Entity> {
        self.grid.zones().collect()
    }

    pub fn roads(&self) -> Vec<&Entity> {
        self.grid.roads().collect()
    }

    pub fn disasters(&self) -> Vec<&Entity> {
        self.grid.disasters().collect()
    }

    /// Placed entities that are neither zones nor roads.
    pub fn structures(&self) -> Vec<&Entity> {
        self.grid
            .entities()
            .filter(|entity| !entity.kind().is_zone() && entity.kind() != EntityKind::Road)
            .collect()
    }

    pub fn citizens(&self) -> Vec<&Citizen> {
        self.population.iter().collect()
    }

    pub fn to_save(&self) -> SaveState {
        SaveState::capture(self)
    }

    pub fn from_save(save: SaveState) -> Result<Self, SaveError> {
        save.restore()
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let graph = RoadGraph::new(&self.grid);
        let zones = self
            .grid
            .zones()
            .filter_map(|entity| {
                let zone = entity.zone()?;
                let reachable_workplaces = if entity.kind() == EntityKind::ResidentialZone {
                    graph.reachable_workplaces(entity.id).len()
                } else {
                    0
                };
                Some(ZoneSnapshot {
                    id: entity.id.raw(),
                    kind: entity.kind(),
                    origin: entity.origin(),
                    level: zone.level,
                    capacity: zone.capacity,
                    occupants: zone.occupancy(),
                    buildings: zone.buildings.len(),
                    reachable_workplaces,
                })
            })
            .collect();
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            date: self.clock.current_date_str(),
            money: self.wallet.balance(),
            tax_rate: self.tax_rate,
            citizens: self.population.len(),
            unemployed: self.population.iter().filter(|c| c.is_unemployed()).count(),
            average_satisfaction: self.population.average_satisfaction(),
            roads: self.grid.roads().count(),
            structures: self.structures().len() - self.grid.disasters().count(),
            disasters: self.grid.disasters().count(),
            zones,
        }
    }
}
