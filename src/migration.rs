//! Monthly arrival of new residents and their placement into jobs.

use tracing::debug;

use crate::{
    components::{CitizenId, EntityKind, ObjectId},
    config::{Catalog, MigrationSpec},
    grid::WorldGrid,
    population::{Assignment, Population},
    roads::RoadGraph,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub zones_scored: usize,
    pub arrivals: u32,
    pub employed: u32,
}

/// Likelihood that people want to move in at all: the mean satisfaction of
/// the current population.
pub fn arrival_chance(population: &Population) -> f64 {
    population.average_satisfaction()
}

/// How well nearby work zones could absorb new workers.
pub fn capacity_score(grid: &WorldGrid, zone: ObjectId, spec: &MigrationSpec) -> f64 {
    let mut open_zones = 0u32;
    let mut spare = 0u32;
    for work in grid.work_zones() {
        let Some(state) = work.zone() else {
            continue;
        };
        let near = grid
            .distance(zone, work.id)
            .is_some_and(|d| d < spec.nearby_distance);
        if near && state.has_room() {
            open_zones += 1;
            spare += state.spare_capacity();
        }
    }
    const WANTED: u32 = 5;
    if open_zones >= WANTED {
        100.0
    } else if open_zones > 0 && spare >= 10 {
        100.0 - 2.0 * f64::from(WANTED - open_zones)
    } else {
        (f64::from(spare) * 10.0).min(100.0)
    }
}

/// 100 with no industry nearby, otherwise the mean of `|limit - d| * 10` over
/// nearby industrial zones.
pub fn industrial_proximity_score(grid: &WorldGrid, zone: ObjectId, spec: &MigrationSpec) -> f64 {
    let distances: Vec<f64> = grid
        .of_kind(EntityKind::IndustrialZone)
        .filter_map(|industry| grid.distance(zone, industry.id))
        .filter(|d| *d < spec.nearby_distance)
        .collect();
    if distances.is_empty() {
        return 100.0;
    }
    let total: f64 = distances
        .iter()
        .map(|d| (spec.nearby_distance - d).abs() * 10.0)
        .sum();
    total / distances.len() as f64
}

pub fn zone_score(grid: &WorldGrid, population: &Population, zone: ObjectId, spec: &MigrationSpec) -> f64 {
    let average = (arrival_chance(population)
        + capacity_score(grid, zone, spec)
        + industrial_proximity_score(grid, zone, spec))
        / 3.0;
    average / 3.0
}

pub fn arrivals_for(score: f64, spec: &MigrationSpec) -> u32 {
    (score * f64::from(spec.max_arrivals_per_period) / 100.0).floor() as u32
}

/// Scores every residential zone with room and admits newcomers, then finds
/// work for the unemployed residents of every residential zone.
pub fn monthly_migration(
    grid: &mut WorldGrid,
    population: &mut Population,
    catalog: &Catalog,
) -> MigrationReport {
    let mut report = MigrationReport::default();
    let zones: Vec<(ObjectId, bool)> = grid
        .residential_zones()
        .map(|zone| (zone.id, zone.zone().is_some_and(|z| z.has_room())))
        .collect();
    for (zone, has_room) in zones {
        if has_room {
            report.zones_scored += 1;
            let score = zone_score(grid, population, zone, &catalog.migration);
            let admitted = arrivals_for(score, &catalog.migration);
            debug!(%zone, score, admitted, "migration scored");
            for _ in 0..admitted {
                let citizen = population.create(catalog.citizens.initial_satisfaction);
                if population
                    .assign(grid, citizen, zone, Assignment::Home)
                    .is_ok()
                {
                    report.arrivals += 1;
                }
            }
        }
        report.employed += assign_workforce(grid, population, zone);
    }
    report
}

#[derive(Debug, Default)]
struct Pool {
    zones: Vec<(ObjectId, u32)>,
}

impl Pool {
    fn deficit(&self) -> u32 {
        self.zones.iter().map(|(_, spare)| spare).sum()
    }

    /// The zone with the most spare room; ties go to the lowest id.
    fn pick(&mut self) -> Option<ObjectId> {
        let (index, _) = self
            .zones
            .iter()
            .enumerate()
            .filter(|(_, (_, spare))| *spare > 0)
            .max_by(|(_, (a_id, a)), (_, (b_id, b))| a.cmp(b).then(b_id.cmp(a_id)))?;
        let slot = &mut self.zones[index];
        slot.1 -= 1;
        Some(slot.0)
    }
}

/// Sends each unemployed resident of `zone` to the reachable pool, industrial
/// or service, with the larger vacancy. Returns the number employed.
pub fn assign_workforce(grid: &mut WorldGrid, population: &mut Population, zone: ObjectId) -> u32 {
    let reachable = RoadGraph::new(grid).reachable_workplaces(zone);
    let mut industry = Pool::default();
    let mut services = Pool::default();
    for id in reachable {
        let Some(entity) = grid.get(id) else {
            continue;
        };
        let Some(state) = entity.zone() else {
            continue;
        };
        let pool = match entity.kind() {
            EntityKind::IndustrialZone => &mut industry,
            _ => &mut services,
        };
        pool.zones.push((id, state.spare_capacity()));
    }

    let unemployed: Vec<CitizenId> = grid
        .get(zone)
        .and_then(|entity| entity.zone())
        .map(|state| state.occupants.clone())
        .unwrap_or_default()
        .into_iter()
        .filter(|id| population.get(*id).is_some_and(|c| c.is_unemployed()))
        .collect();

    let mut employed = 0;
    for citizen in unemployed {
        let pool = if industry.deficit() > services.deficit() {
            &mut industry
        } else {
            &mut services
        };
        let Some(workplace) = pool.pick() else {
            break;
        };
        if population
            .assign(grid, citizen, workplace, Assignment::Work)
            .is_ok()
        {
            employed += 1;
        }
    }
    employed
}
