//! Radius-bounded satisfaction influence of police departments, stadiums and
//! forests on the residents of nearby residential zones.

use tracing::debug;

use crate::{
    components::{CitizenId, EntityKind, ObjectId, MAX_SATISFACTION, MIN_SATISFACTION},
    grid::WorldGrid,
    population::Population,
};

/// True when `source` reaches `zone`: within radius and, for forests, with a
/// clear line of sight.
pub fn in_range(grid: &WorldGrid, source: ObjectId, zone: ObjectId) -> bool {
    let Some(entity) = grid.get(source) else {
        return false;
    };
    let Some(influence) = entity.influence() else {
        return false;
    };
    let Some(distance) = grid.distance(source, zone) else {
        return false;
    };
    if distance > f64::from(influence.radius) {
        return false;
    }
    entity.kind() != EntityKind::Forest || !grid.line_of_sight_blocked(source, zone)
}

/// Residential zones influenced by `source`, in id order.
pub fn zones_in_range(grid: &WorldGrid, source: ObjectId) -> Vec<ObjectId> {
    grid.residential_zones()
        .map(|zone| zone.id)
        .filter(|zone| in_range(grid, source, *zone))
        .collect()
}

fn residents(grid: &WorldGrid, zone: ObjectId) -> Vec<CitizenId> {
    grid.get(zone)
        .and_then(|entity| entity.zone())
        .map(|zone| zone.occupants.clone())
        .unwrap_or_default()
}

fn boost(population: &mut Population, citizen: CitizenId, delta: f64) {
    if let Some(record) = population.get_mut(citizen) {
        let raised = record.satisfaction + delta * record.satisfaction;
        if raised <= MAX_SATISFACTION {
            record.satisfaction = raised;
        }
    }
}

fn drain(population: &mut Population, citizen: CitizenId, delta: f64) {
    if let Some(record) = population.get_mut(citizen) {
        let lowered = record.satisfaction - delta * record.satisfaction;
        record.satisfaction = lowered.max(MIN_SATISFACTION);
    }
}

fn spread(grid: &WorldGrid, population: &mut Population, source: ObjectId, delta: f64) -> usize {
    let mut touched = 0;
    for zone in zones_in_range(grid, source) {
        for citizen in residents(grid, zone) {
            if delta >= 0.0 {
                boost(population, citizen, delta);
            } else {
                drain(population, citizen, -delta);
            }
            touched += 1;
        }
    }
    touched
}

/// Applies a newly placed structure's influence. Returns the number of
/// residents touched.
pub fn on_structure_added(grid: &WorldGrid, population: &mut Population, source: ObjectId) -> usize {
    let Some(delta) = grid
        .get(source)
        .and_then(|entity| entity.influence())
        .map(|influence| influence.satisfaction)
    else {
        return 0;
    };
    let touched = spread(grid, population, source, delta);
    debug!(%source, touched, delta, "structure influence applied");
    touched
}

/// Applies only the growth `increment` of a structure's influence.
pub fn on_structure_grown(
    grid: &WorldGrid,
    population: &mut Population,
    source: ObjectId,
    increment: f64,
) -> usize {
    spread(grid, population, source, increment)
}

/// Withdraws a structure's influence. Must run while the structure is still
/// on the grid.
pub fn on_structure_removed(grid: &WorldGrid, population: &mut Population, source: ObjectId) -> usize {
    let Some(delta) = grid
        .get(source)
        .and_then(|entity| entity.influence())
        .map(|influence| influence.satisfaction)
    else {
        return 0;
    };
    let touched = spread(grid, population, source, -delta);
    debug!(%source, touched, delta, "structure influence withdrawn");
    touched
}

/// Gives a freshly homed citizen the boost of every structure already in
/// range of its home.
pub fn on_citizen_homed(grid: &WorldGrid, population: &mut Population, citizen: CitizenId) {
    let Some(home) = population.get(citizen).and_then(|c| c.home) else {
        return;
    };
    let sources: Vec<(ObjectId, f64)> = grid
        .satisfaction_sources()
        .filter_map(|entity| entity.influence().map(|i| (entity.id, i.satisfaction)))
        .collect();
    for (source, delta) in sources {
        if in_range(grid, source, home) {
            boost(population, citizen, delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Catalog, geometry::TilePos};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn place(grid: &mut WorldGrid, kind: EntityKind, x: i32, y: i32) -> ObjectId {
        let created = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        grid.place_exempt(Catalog::default().blueprint(kind, TilePos::new(x, y), created))
            .unwrap()
    }

    fn satisfactions(population: &Population) -> Vec<f64> {
        population.iter().map(|c| c.satisfaction).collect()
    }

    #[test]
    fn stadium_boosts_every_resident_in_range() {
        let mut grid = WorldGrid::new(32, 32);
        place(&mut grid, EntityKind::ResidentialZone, 0, 0);
        let mut population = Population::new();
        population.spawn_initial(&mut grid, 19, 50.0);
        let stadium = place(&mut grid, EntityKind::Stadium, 6, 0);
        let touched = on_structure_added(&grid, &mut population, stadium);
        assert_eq!(touched, 19);
        assert!(satisfactions(&population).iter().all(|s| (*s - 60.0).abs() < 1e-9));
    }

    #[test]
    fn boost_is_skipped_near_the_ceiling() {
        let mut grid = WorldGrid::new(32, 32);
        place(&mut grid, EntityKind::ResidentialZone, 0, 0);
        let mut population = Population::new();
        population.spawn_initial(&mut grid, 3, 90.0);
        let stadium = place(&mut grid, EntityKind::Stadium, 6, 0);
        on_structure_added(&grid, &mut population, stadium);
        assert!(satisfactions(&population).iter().all(|s| *s == 90.0));
    }

    #[test]
    fn out_of_range_structure_does_nothing() {
        let mut grid = WorldGrid::new(64, 64);
        place(&mut grid, EntityKind::ResidentialZone, 0, 0);
        let mut population = Population::new();
        population.spawn_initial(&mut grid, 4, 50.0);
        let police = place(&mut grid, EntityKind::PoliceDepartment, 40, 40);
        assert_eq!(on_structure_added(&grid, &mut population, police), 0);
        assert!(satisfactions(&population).iter().all(|s| *s == 50.0));
    }

    #[test]
    fn forest_needs_line_of_sight() {
        let mut grid = WorldGrid::new(32, 32);
        let home = place(&mut grid, EntityKind::ResidentialZone, 0, 0);
        let forest = place(&mut grid, EntityKind::Forest, 6, 1);
        assert!(in_range(&grid, forest, home));
        place(&mut grid, EntityKind::PoliceDepartment, 4, 0);
        assert!(!in_range(&grid, forest, home));
    }

    #[test]
    fn removal_withdraws_influence() {
        let mut grid = WorldGrid::new(32, 32);
        place(&mut grid, EntityKind::ResidentialZone, 0, 0);
        let mut population = Population::new();
        population.spawn_initial(&mut grid, 2, 50.0);
        let police = place(&mut grid, EntityKind::PoliceDepartment, 5, 0);
        on_structure_removed(&grid, &mut population, police);
        assert!(satisfactions(&population).iter().all(|s| (*s - 42.5).abs() < 1e-9));
    }

    #[test]
    fn new_resident_gets_existing_boosts() {
        let mut grid = WorldGrid::new(32, 32);
        place(&mut grid, EntityKind::Stadium, 6, 0);
        place(&mut grid, EntityKind::ResidentialZone, 0, 0);
        let mut population = Population::new();
        population.spawn_initial(&mut grid, 1, 50.0);
        assert_eq!(satisfactions(&population), vec![60.0]);
    }

    proptest! {
        #[test]
        fn satisfaction_stays_in_bounds(initial in 0.0f64..=100.0, adds in 0usize..6, removes in 0usize..6) {
            let mut grid = WorldGrid::new(32, 32);
            place(&mut grid, EntityKind::ResidentialZone, 0, 0);
            let stadium = place(&mut grid, EntityKind::Stadium, 6, 0);
            let mut population = Population::new();
            population.spawn_initial(&mut grid, 3, initial);
            for _ in 0..adds {
                on_structure_added(&grid, &mut population, stadium);
            }
            for _ in 0..removes {
                on_structure_removed(&grid, &mut population, stadium);
            }
            for value in satisfactions(&population) {
                prop_assert!((MIN_SATISFACTION..=MAX_SATISFACTION).contains(&value));
            }
        }
    }
}
