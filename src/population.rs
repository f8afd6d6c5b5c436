//! Citizen registry and home/work assignment.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    components::{
        Building, BuildingStyle, Citizen, CitizenId, Entity, EntityKind, ObjectId, MAX_SATISFACTION,
        MIN_SATISFACTION,
    },
    geometry::TilePos,
    grid::WorldGrid,
    satisfaction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Home,
    Work,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("{0} is not registered")]
    UnknownCitizen(CitizenId),
    #[error("{0} does not exist")]
    UnknownZone(ObjectId),
    #[error("{zone} ({kind}) cannot take a {assignment:?} assignment")]
    WrongKind {
        zone: ObjectId,
        kind: EntityKind,
        assignment: Assignment,
    },
    #[error("{zone} is at capacity")]
    ZoneFull { zone: ObjectId },
}

/// Id-indexed arena that owns every citizen.
#[derive(Debug, Clone, Default)]
pub struct Population {
    citizens: BTreeMap<CitizenId, Citizen>,
    next_id: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.citizens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citizens.is_empty()
    }

    pub fn get(&self, id: CitizenId) -> Option<&Citizen> {
        self.citizens.get(&id)
    }

    pub fn get_mut(&mut self, id: CitizenId) -> Option<&mut Citizen> {
        self.citizens.get_mut(&id)
    }

    pub fn contains(&self, id: CitizenId) -> bool {
        self.citizens.contains_key(&id)
    }

    /// Citizens in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Citizen> {
        self.citizens.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Citizen> {
        self.citizens.values_mut()
    }

    pub fn ids(&self) -> Vec<CitizenId> {
        self.citizens.keys().copied().collect()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn average_satisfaction(&self) -> f64 {
        if self.citizens.is_empty() {
            return 0.0;
        }
        let total: f64 = self.citizens.values().map(|c| c.satisfaction).sum();
        total / self.citizens.len() as f64
    }

    /// Registers a citizen with no home or work yet. Callers assign a home
    /// straight away; an unassigned citizen is removed by bookkeeping.
    pub fn create(&mut self, satisfaction: f64) -> CitizenId {
        let id = CitizenId(self.next_id);
        self.next_id += 1;
        self.citizens.insert(
            id,
            Citizen {
                id,
                satisfaction: satisfaction.clamp(MIN_SATISFACTION, MAX_SATISFACTION),
                home: None,
                work: None,
            },
        );
        id
    }

    /// Re-registers a saved citizen. Zone occupant lists are rebuilt by the
    /// caller.
    pub fn restore(&mut self, citizen: Citizen) {
        self.next_id = self.next_id.max(citizen.id.0 + 1);
        self.citizens.insert(citizen.id, citizen);
    }

    pub fn restore_next_id(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    /// Creates `count` citizens and homes them in the first residential zone.
    pub fn spawn_initial(&mut self, grid: &mut WorldGrid, count: u32, satisfaction: f64) -> Vec<CitizenId> {
        let Some(zone) = grid.residential_zones().next().map(|e| e.id) else {
            warn!(count, "no residential zone to seed citizens into");
            return Vec::new();
        };
        let mut homed = Vec::new();
        for _ in 0..count {
            let id = self.create(satisfaction);
            if self.assign(grid, id, zone, Assignment::Home).is_ok() {
                homed.push(id);
            }
        }
        homed
    }

    pub fn assign(
        &mut self,
        grid: &mut WorldGrid,
        citizen: CitizenId,
        zone: ObjectId,
        assignment: Assignment,
    ) -> Result<(), AssignmentError> {
        if !self.contains(citizen) {
            return Err(AssignmentError::UnknownCitizen(citizen));
        }
        let outcome = try_occupy(grid, citizen, zone, assignment);
        if let Err(err) = outcome {
            match (assignment, &err) {
                (Assignment::Home, AssignmentError::ZoneFull { .. }) => {
                    warn!(%citizen, %zone, "home assignment failed, citizen removed");
                    self.delete(grid, citizen);
                }
                _ => debug!(%citizen, %zone, error = %err, "assignment rejected"),
            }
            return Err(err);
        }

        let first_home = {
            let Some(record) = self.citizens.get_mut(&citizen) else {
                return Err(AssignmentError::UnknownCitizen(citizen));
            };
            let previous = match assignment {
                Assignment::Home => record.home.replace(zone),
                Assignment::Work => record.work.replace(zone),
            };
            if let Some(previous) = previous.filter(|p| *p != zone) {
                detach(grid, previous, citizen);
            }
            assignment == Assignment::Home && previous.is_none()
        };
        if first_home {
            satisfaction::on_citizen_homed(grid, self, citizen);
        }
        Ok(())
    }

    /// Clears the citizen's workplace. A citizen left with neither home nor
    /// work is deleted; returns true in that case.
    pub fn unassign_work(&mut self, grid: &mut WorldGrid, citizen: CitizenId) -> bool {
        let Some(record) = self.citizens.get_mut(&citizen) else {
            return false;
        };
        if let Some(work) = record.work.take() {
            detach(grid, work, citizen);
        }
        if !record.is_valid() {
            self.delete(grid, citizen);
            return true;
        }
        false
    }

    /// Removes a citizen and detaches it from its home and work zones.
    pub fn delete(&mut self, grid: &mut WorldGrid, citizen: CitizenId) -> Option<Citizen> {
        let record = self.citizens.remove(&citizen)?;
        for zone in [record.work, record.home].into_iter().flatten() {
            detach(grid, zone, citizen);
        }
        Some(record)
    }

    /// Scales every citizen's satisfaction by `1 - penalty`.
    pub fn apply_bankruptcy_penalty(&mut self, penalty: f64) {
        let factor = (1.0 - penalty).clamp(0.0, 1.0);
        for citizen in self.citizens.values_mut() {
            citizen.satisfaction = (citizen.satisfaction * factor).max(MIN_SATISFACTION);
        }
    }
}

fn try_occupy(
    grid: &mut WorldGrid,
    citizen: CitizenId,
    zone: ObjectId,
    assignment: Assignment,
) -> Result<(), AssignmentError> {
    let entity = grid
        .get_mut(zone)
        .ok_or(AssignmentError::UnknownZone(zone))?;
    let kind = entity.kind();
    let allowed = match assignment {
        Assignment::Home => kind == EntityKind::ResidentialZone,
        Assignment::Work => kind.is_work_zone(),
    };
    if !allowed {
        return Err(AssignmentError::WrongKind {
            zone,
            kind,
            assignment,
        });
    }
    let Some(state) = entity.zone_mut() else {
        return Err(AssignmentError::UnknownZone(zone));
    };
    if state.occupants.contains(&citizen) {
        return Ok(());
    }
    if !state.has_room() {
        return Err(AssignmentError::ZoneFull { zone });
    }
    state.occupants.push(citizen);
    simulate_building_addition(entity);
    Ok(())
}

fn detach(grid: &mut WorldGrid, zone: ObjectId, citizen: CitizenId) {
    if let Some(state) = grid.get_mut(zone).and_then(Entity::zone_mut) {
        state.occupants.retain(|id| *id != citizen);
    }
}

const HOUSE_SLOTS: [(i32, i32); 4] = [(0, 0), (2, 0), (0, 2), (2, 2)];

/// Grows the decorative buildings of a zone to match its occupancy: one house
/// per filled quarter of a residential zone, one level-tagged building on an
/// occupied work zone.
pub fn simulate_building_addition(entity: &mut Entity) {
    let id = entity.id.raw();
    let origin = entity.origin();
    let kind = entity.kind();
    let Some(zone) = entity.zone_mut() else {
        return;
    };
    if zone.occupants.is_empty() || zone.capacity == 0 {
        return;
    }
    if kind == EntityKind::ResidentialZone {
        let filled = zone.occupancy() as usize * HOUSE_SLOTS.len();
        let target = filled.div_ceil(zone.capacity as usize).min(HOUSE_SLOTS.len());
        while zone.buildings.len() < target {
            let slot = zone.buildings.len();
            let (dx, dy) = HOUSE_SLOTS[slot];
            zone.buildings.push(Building {
                tile: origin.offset(dx, dy),
                style: BuildingStyle::House(((id + slot as u64) % 4 + 1) as u8),
            });
        }
    } else {
        let style = BuildingStyle::Workplace { level: zone.level };
        match zone.buildings.first_mut() {
            Some(building) => building.style = style,
            None => zone.buildings.push(Building {
                tile: TilePos::new(origin.x, origin.y),
                style,
            }),
        }
    }
}
