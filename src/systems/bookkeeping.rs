use anyhow::Result;
use tracing::warn;

use crate::{
    components::{CitizenId, EntityKind, ObjectId, MAX_SATISFACTION, MIN_SATISFACTION},
    engine::{System, SystemContext},
    grid::WorldGrid,
    rng::SystemRng,
    world::World,
};

/// Repairs counted by one consistency pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repairs {
    pub orphaned_occupants: usize,
    pub dangling_links: usize,
    pub deleted_citizens: usize,
    pub clamped: usize,
}

impl Repairs {
    pub fn is_clean(&self) -> bool {
        *self == Repairs::default()
    }
}

/// Checks the links between zones and citizens and fixes what drifted:
/// occupants that are not registered, citizens pointing at missing zones,
/// citizens with neither home nor work, satisfaction out of range.
pub fn reconcile(world: &mut World) -> Repairs {
    let mut repairs = Repairs::default();

    let zones: Vec<ObjectId> = world.grid.zones().map(|zone| zone.id).collect();
    for id in zones {
        let kind = world.grid.kind_of(id);
        let Some(zone) = world.grid.get_mut(id).and_then(|entity| entity.zone_mut()) else {
            continue;
        };
        let before = zone.occupants.len();
        let population = &world.population;
        zone.occupants.retain(|citizen| {
            population.get(*citizen).is_some_and(|record| match kind {
                Some(EntityKind::ResidentialZone) => record.home == Some(id),
                _ => record.work == Some(id),
            })
        });
        let dropped = before - zone.occupants.len();
        if dropped > 0 {
            warn!(zone = %id, dropped, "dropped orphaned occupants");
            repairs.orphaned_occupants += dropped;
        }
    }

    let mut doomed: Vec<CitizenId> = Vec::new();
    for citizen in world.population.iter_mut() {
        let home_ok = citizen
            .home
            .is_some_and(|home| listed(&world.grid, home, citizen.id));
        if citizen.home.is_some() && !home_ok {
            citizen.home = None;
            repairs.dangling_links += 1;
        }
        let work_ok = citizen
            .work
            .is_some_and(|work| listed(&world.grid, work, citizen.id));
        if citizen.work.is_some() && !work_ok {
            citizen.work = None;
            repairs.dangling_links += 1;
        }
        if !(MIN_SATISFACTION..=MAX_SATISFACTION).contains(&citizen.satisfaction) {
            citizen.satisfaction = citizen.satisfaction.clamp(MIN_SATISFACTION, MAX_SATISFACTION);
            repairs.clamped += 1;
        }
        if !citizen.is_valid() {
            doomed.push(citizen.id);
        }
    }
    for citizen in doomed {
        world.population.delete(&mut world.grid, citizen);
        repairs.deleted_citizens += 1;
    }

    if !repairs.is_clean() {
        warn!(?repairs, "bookkeeping repaired world state");
    }
    repairs
}

fn listed(grid: &WorldGrid, zone: ObjectId, citizen: CitizenId) -> bool {
    grid.get(zone)
        .and_then(|entity| entity.zone())
        .is_some_and(|zone| zone.occupants.contains(&citizen))
}

pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        reconcile(world);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::Clock, components::Entity, config::Catalog, geometry::TilePos};
    use chrono::NaiveDate;

    fn world() -> World {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let clock = Clock::new(start, 86_400.0, 1.0).unwrap();
        World::new(WorldGrid::new(32, 32), clock, 5_000.0, Catalog::default())
    }

    #[test]
    fn consistent_world_needs_no_repair() {
        let mut world = world();
        world.place_request(TilePos::new(0, 0), EntityKind::ResidentialZone).unwrap();
        {
            let World { grid, population, .. } = &mut world;
            population.spawn_initial(grid, 4, 70.0);
        }
        assert!(reconcile(&mut world).is_clean());
    }

    #[test]
    fn unregistered_occupant_is_dropped() {
        let mut world = world();
        let home = world.place_request(TilePos::new(0, 0), EntityKind::ResidentialZone).unwrap();
        world
            .grid_mut()
            .get_mut(home)
            .and_then(Entity::zone_mut)
            .unwrap()
            .occupants
            .push(CitizenId(99));
        let repairs = reconcile(&mut world);
        assert_eq!(repairs.orphaned_occupants, 1);
        assert!(world.grid().get(home).and_then(Entity::zone).unwrap().occupants.is_empty());
    }

    #[test]
    fn homeless_jobless_citizen_is_deleted() {
        let mut world = world();
        world.population_mut().create(50.0);
        let repairs = reconcile(&mut world);
        assert_eq!(repairs.deleted_citizens, 1);
        assert!(world.population().is_empty());
    }

    #[test]
    fn satisfaction_is_clamped() {
        let mut world = world();
        world.place_request(TilePos::new(0, 0), EntityKind::ResidentialZone).unwrap();
        let ids = {
            let World { grid, population, .. } = &mut world;
            population.spawn_initial(grid, 1, 50.0)
        };
        world.population_mut().get_mut(ids[0]).unwrap().satisfaction = 140.0;
        assert_eq!(reconcile(&mut world).clamped, 1);
        assert_eq!(world.population().get(ids[0]).unwrap().satisfaction, 100.0);
    }
}
