use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use rand::Rng;
use tracing::{info, warn};

use crate::{
    components::{CitizenId, EntityData, EntityKind, ObjectId},
    engine::{System, SystemContext},
    geometry::TilePos,
    grid::PlacementError,
    rng::SystemRng,
    satisfaction,
    world::World,
};

/// Drops a disaster with its origin at `tile` on today's date.
pub fn trigger(world: &mut World, tile: TilePos) -> Result<ObjectId, PlacementError> {
    let today = world.clock.current_date();
    trigger_on(world, tile, today)
}

/// Drops a disaster dated `date`, linking every building it covers. The
/// overlay is trimmed to the map when it would hang over an edge.
pub fn trigger_on(world: &mut World, tile: TilePos, date: NaiveDate) -> Result<ObjectId, PlacementError> {
    let mut blueprint = world.catalog.blueprint(EntityKind::Disaster, tile, date);
    // Near the map edge the overlay covers only the tiles that exist.
    if world.grid.in_bounds(tile) {
        let (width, height) = (world.grid.width(), world.grid.height());
        if let Some(area) = blueprint.footprint.clipped(width, height) {
            blueprint.footprint = area;
        }
    }
    let linked = world.grid.intersecting(&blueprint.footprint);
    if let EntityData::Disaster(state) = &mut blueprint.data {
        state.linked = linked.clone();
    }
    let id = world.grid.place(blueprint, &mut world.wallet)?;
    info!(%id, ?tile, linked = linked.len(), %date, "disaster struck");
    Ok(id)
}

/// Applies a disaster's delayed damage to everything it is linked to, then
/// clears the disaster itself.
pub fn cascade(world: &mut World, disaster: ObjectId) {
    let Some(linked) = world
        .grid
        .get(disaster)
        .and_then(|entity| entity.disaster())
        .map(|state| state.linked.clone())
    else {
        return;
    };
    let mut lost_citizens = 0usize;
    for target in linked {
        let Some(kind) = world.grid.kind_of(target) else {
            continue;
        };
        match kind {
            EntityKind::ResidentialZone => {
                for citizen in occupants(world, target) {
                    world.population.delete(&mut world.grid, citizen);
                    lost_citizens += 1;
                }
                vacate(world, target);
            }
            EntityKind::IndustrialZone | EntityKind::ServiceZone => {
                for citizen in occupants(world, target) {
                    if world.population.unassign_work(&mut world.grid, citizen) {
                        lost_citizens += 1;
                    }
                }
                vacate(world, target);
            }
            EntityKind::PoliceDepartment | EntityKind::Stadium | EntityKind::Forest => {
                satisfaction::on_structure_removed(&world.grid, &mut world.population, target);
                world.grid.remove(target);
            }
            EntityKind::Road | EntityKind::Disaster => {}
        }
    }
    world.grid.remove(disaster);
    info!(%disaster, lost_citizens, "disaster cascade finished");
}

fn occupants(world: &World, zone: ObjectId) -> Vec<CitizenId> {
    world
        .grid
        .get(zone)
        .and_then(|entity| entity.zone())
        .map(|zone| zone.occupants.clone())
        .unwrap_or_default()
}

fn vacate(world: &mut World, zone: ObjectId) {
    if let Some(state) = world.grid.get_mut(zone).and_then(|entity| entity.zone_mut()) {
        state.buildings.clear();
    }
    if let Err(err) = world.reclassify_zone_id(zone) {
        warn!(%zone, error = %err, "zone survived disaster");
    }
}

pub struct DisasterSystem;

impl DisasterSystem {
    pub fn new() -> Self {
        Self
    }

    fn due_cascades(world: &World, date: NaiveDate) -> Vec<ObjectId> {
        let delay = world.catalog.disasters.cascade_delay_days;
        world
            .grid
            .disasters()
            .filter(|entity| (date - entity.created).num_days() >= delay)
            .map(|entity| entity.id)
            .collect()
    }

    fn random_strike(world: &mut World, date: NaiveDate, rng: &mut SystemRng<'_>) {
        let age = (date - world.game_start()).num_days();
        if age == 0 || age % 365 != 0 {
            return;
        }
        let probability = world.catalog.disasters.yearly_probability.clamp(0.0, 1.0);
        if !rng.gen_bool(probability) {
            return;
        }
        let already_linked: BTreeSet<ObjectId> = world
            .grid
            .disasters()
            .filter_map(|entity| entity.disaster())
            .flat_map(|state| state.linked.iter().copied())
            .collect();
        let candidates: Vec<TilePos> = world
            .grid
            .entities()
            .filter(|entity| !matches!(entity.kind(), EntityKind::Road | EntityKind::Disaster))
            .filter(|entity| !already_linked.contains(&entity.id))
            .map(|entity| entity.origin())
            .collect();
        if candidates.is_empty() {
            return;
        }
        let tile = candidates[rng.gen_range(0..candidates.len())];
        if let Err(err) = trigger_on(world, tile, date) {
            warn!(?tile, error = %err, "random disaster could not be placed");
        }
    }
}

impl Default for DisasterSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DisasterSystem {
    fn name(&self) -> &str {
        "disaster"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for disaster in Self::due_cascades(world, ctx.date) {
            cascade(world, disaster);
        }
        Self::random_strike(world, ctx.date, rng);
        Ok(())
    }
}
