use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    components::{EntityKind, ObjectId},
    engine::{System, SystemContext},
    rng::SystemRng,
    satisfaction,
    world::World,
};

/// Ages every forest whose planting anniversary is `date`. Young forests
/// widen their satisfaction boost each year until they mature.
pub fn grow_forests(world: &mut World, date: NaiveDate) -> usize {
    let growth = world.catalog.forest_growth.clone();
    let forests: Vec<ObjectId> = world
        .grid
        .of_kind(EntityKind::Forest)
        .filter(|entity| {
            let age = (date - entity.created).num_days();
            age != 0 && age % 365 == 0
        })
        .map(|entity| entity.id)
        .collect();
    let mut grown = 0;
    for id in forests {
        let Some(forest) = world.grid.get_mut(id).and_then(|entity| entity.forest_mut()) else {
            continue;
        };
        if forest.mature {
            continue;
        }
        forest.year += 1;
        forest.influence.satisfaction += growth.yearly_growth;
        if forest.year >= growth.mature_year {
            forest.mature = true;
            info!(%id, year = forest.year, "forest matured");
        } else {
            debug!(%id, year = forest.year, delta = forest.influence.satisfaction, "forest grew");
        }
        satisfaction::on_structure_grown(
            &world.grid,
            &mut world.population,
            id,
            growth.yearly_growth,
        );
        grown += 1;
    }
    grown
}

pub struct ForestSystem;

impl ForestSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ForestSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ForestSystem {
    fn name(&self) -> &str {
        "forest"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        grow_forests(world, ctx.date);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::Clock, components::Entity, config::Catalog, geometry::TilePos, grid::WorldGrid,
    };
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
    }

    fn world() -> World {
        let clock = Clock::new(start(), 86_400.0, 1.0).unwrap();
        World::new(WorldGrid::new(32, 32), clock, 5_000.0, Catalog::default())
    }

    #[test]
    fn forest_grows_on_anniversaries_until_mature() {
        let mut world = world();
        let id = world.place_request(TilePos::new(3, 3), EntityKind::Forest).unwrap();
        assert_eq!(grow_forests(&mut world, start() + Duration::days(200)), 0);
        for year in 1..=9 {
            assert_eq!(grow_forests(&mut world, start() + Duration::days(365 * year)), 1);
        }
        let forest = world.grid().get(id).and_then(Entity::forest).unwrap().clone();
        assert_eq!(forest.year, 10);
        assert!(forest.mature);
        assert!((forest.influence.satisfaction - (0.10 + 9.0 * 0.03)).abs() < 1e-9);
        assert_eq!(grow_forests(&mut world, start() + Duration::days(3650)), 0);
    }

    #[test]
    fn growth_reaches_residents_in_sight() {
        let mut world = world();
        world.place_request(TilePos::new(0, 0), EntityKind::ResidentialZone).unwrap();
        {
            let World { grid, population, .. } = &mut world;
            population.spawn_initial(grid, 1, 50.0);
        }
        world.place_request(TilePos::new(6, 1), EntityKind::Forest).unwrap();
        let planted = world.citizens()[0].satisfaction;
        grow_forests(&mut world, start() + Duration::days(365));
        let after = world.citizens()[0].satisfaction;
        assert!((after - planted * 1.03).abs() < 1e-9);
    }
}
