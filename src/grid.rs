//! Authoritative store of placed entities with tile-indexed lookup and
//! placement rules.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    components::{Entity, EntityData, EntityKind, ObjectId, Wallet},
    geometry::{self, FacingWalls, Footprint, TilePos},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Ground,
    /// Water edge. Roads may cross it, nothing else may be built on it.
    Shore,
    Water,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("{kind} at {tile:?} lies outside the map")]
    OutOfBounds { kind: EntityKind, tile: TilePos },
    #[error("{kind} at {tile:?} overlaps {blocking}")]
    Collision {
        kind: EntityKind,
        tile: TilePos,
        blocking: ObjectId,
    },
    #[error("{kind} cannot be built on water at {tile:?}")]
    Water { kind: EntityKind, tile: TilePos },
}

/// An entity that has not been placed yet and therefore has no id.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub footprint: Footprint,
    pub created: NaiveDate,
    pub price: f64,
    pub maintenance_fee: f64,
    pub data: EntityData,
}

impl Blueprint {
    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }
}

#[derive(Debug, Clone)]
pub struct WorldGrid {
    width: i32,
    height: i32,
    terrain: HashMap<TilePos, Terrain>,
    entities: BTreeMap<ObjectId, Entity>,
    occupancy: HashMap<TilePos, ObjectId>,
    next_object_id: u64,
    object_count: u64,
}

impl WorldGrid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            terrain: HashMap::new(),
            entities: BTreeMap::new(),
            occupancy: HashMap::new(),
            next_object_id: 1,
            object_count: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_terrain(&mut self, tile: TilePos, terrain: Terrain) {
        match terrain {
            Terrain::Ground => {
                self.terrain.remove(&tile);
            }
            other => {
                self.terrain.insert(tile, other);
            }
        }
    }

    pub fn set_terrain_area(&mut self, area: Footprint, terrain: Terrain) {
        for tile in area.tiles() {
            self.set_terrain(tile, terrain);
        }
    }

    pub fn terrain(&self, tile: TilePos) -> Terrain {
        self.terrain.get(&tile).copied().unwrap_or_default()
    }

    /// Non-ground tiles, sorted.
    pub fn terrain_tiles(&self) -> Vec<(TilePos, Terrain)> {
        let mut tiles: Vec<_> = self.terrain.iter().map(|(t, k)| (*t, *k)).collect();
        tiles.sort_by_key(|(tile, _)| *tile);
        tiles
    }

    pub fn in_bounds(&self, tile: TilePos) -> bool {
        (0..self.width).contains(&tile.x) && (0..self.height).contains(&tile.y)
    }

    pub fn validate(&self, blueprint: &Blueprint) -> Result<(), PlacementError> {
        let kind = blueprint.kind();
        for tile in blueprint.footprint.tiles() {
            if !self.in_bounds(tile) {
                return Err(PlacementError::OutOfBounds { kind, tile });
            }
        }
        // Disasters are overlays on top of whatever they hit.
        if kind == EntityKind::Disaster {
            return Ok(());
        }
        for tile in blueprint.footprint.tiles() {
            if let Some(blocking) = self.occupancy.get(&tile) {
                return Err(PlacementError::Collision {
                    kind,
                    tile,
                    blocking: *blocking,
                });
            }
            let wet = match self.terrain(tile) {
                Terrain::Ground => false,
                Terrain::Shore => kind != EntityKind::Road,
                Terrain::Water => true,
            };
            if wet {
                return Err(PlacementError::Water { kind, tile });
            }
        }
        Ok(())
    }

    /// Places `blueprint` and charges its price to `budget`.
    pub fn place(
        &mut self,
        blueprint: Blueprint,
        budget: &mut Wallet,
    ) -> Result<ObjectId, PlacementError> {
        self.validate(&blueprint)?;
        budget.charge(blueprint.price);
        Ok(self.insert(blueprint))
    }

    /// Places `blueprint` without charging for it (scripted map features).
    pub fn place_exempt(&mut self, blueprint: Blueprint) -> Result<ObjectId, PlacementError> {
        self.validate(&blueprint)?;
        Ok(self.insert(blueprint))
    }

    fn insert(&mut self, blueprint: Blueprint) -> ObjectId {
        let id = ObjectId(self.next_object_id);
        self.next_object_id += 1;
        self.object_count += 1;
        self.index(id, &blueprint.footprint, blueprint.kind());
        self.entities.insert(
            id,
            Entity {
                id,
                footprint: blueprint.footprint,
                created: blueprint.created,
                price: blueprint.price,
                maintenance_fee: blueprint.maintenance_fee,
                data: blueprint.data,
            },
        );
        id
    }

    /// Re-inserts a previously saved entity under its original id.
    pub fn restore(&mut self, entity: Entity) {
        self.next_object_id = self.next_object_id.max(entity.id.0 + 1);
        self.index(entity.id, &entity.footprint, entity.kind());
        self.entities.insert(entity.id, entity);
    }

    pub fn restore_counters(&mut self, object_count: u64, next_object_id: u64) {
        self.object_count = object_count;
        self.next_object_id = self.next_object_id.max(next_object_id);
    }

    fn index(&mut self, id: ObjectId, footprint: &Footprint, kind: EntityKind) {
        if kind == EntityKind::Disaster {
            return;
        }
        for tile in footprint.tiles() {
            self.occupancy.insert(tile, id);
        }
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if entity.kind() != EntityKind::Disaster {
            for tile in entity.footprint.tiles() {
                if self.occupancy.get(&tile) == Some(&id) {
                    self.occupancy.remove(&tile);
                }
            }
        }
        Some(entity)
    }

    /// Finds the entity of `kind` covering `tile`.
    pub fn find_at(&self, tile: TilePos, kind: EntityKind) -> Option<ObjectId> {
        if kind == EntityKind::Disaster {
            return self
                .disasters()
                .find(|entity| entity.footprint.contains(tile))
                .map(|entity| entity.id);
        }
        self.occupancy
            .get(&tile)
            .copied()
            .filter(|id| self.kind_of(*id) == Some(kind))
    }

    pub fn remove_at(&mut self, tile: TilePos, kind: EntityKind) -> Option<Entity> {
        let id = self.find_at(tile, kind)?;
        self.remove(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn kind_of(&self, id: ObjectId) -> Option<EntityKind> {
        self.entities.get(&id).map(Entity::kind)
    }

    /// The non-disaster entity covering `tile`.
    pub fn entity_at(&self, tile: TilePos) -> Option<&Entity> {
        self.occupancy.get(&tile).and_then(|id| self.entities.get(id))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn object_count(&self) -> u64 {
        self.object_count
    }

    pub fn next_object_id(&self) -> u64 {
        self.next_object_id
    }

    /// All entities in placement order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.entities.keys().copied().collect()
    }

    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities().filter(move |entity| entity.kind() == kind)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Entity> {
        self.entities().filter(|entity| entity.kind().is_zone())
    }

    pub fn residential_zones(&self) -> impl Iterator<Item = &Entity> {
        self.of_kind(EntityKind::ResidentialZone)
    }

    pub fn work_zones(&self) -> impl Iterator<Item = &Entity> {
        self.entities().filter(|entity| entity.kind().is_work_zone())
    }

    pub fn roads(&self) -> impl Iterator<Item = &Entity> {
        self.of_kind(EntityKind::Road)
    }

    pub fn road_tiles(&self) -> HashSet<TilePos> {
        self.roads().map(Entity::origin).collect()
    }

    pub fn satisfaction_sources(&self) -> impl Iterator<Item = &Entity> {
        self.entities()
            .filter(|entity| entity.kind().affects_satisfaction())
    }

    pub fn disasters(&self) -> impl Iterator<Item = &Entity> {
        self.of_kind(EntityKind::Disaster)
    }

    /// Non-road, non-disaster entities whose footprint intersects `area`.
    pub fn intersecting(&self, area: &Footprint) -> Vec<ObjectId> {
        self.entities()
            .filter(|entity| !matches!(entity.kind(), EntityKind::Road | EntityKind::Disaster))
            .filter(|entity| entity.footprint.overlaps(area))
            .map(|entity| entity.id)
            .collect()
    }

    pub fn distance(&self, a: ObjectId, b: ObjectId) -> Option<f64> {
        let a = self.get(a)?;
        let b = self.get(b)?;
        Some(geometry::distance(&a.footprint, &b.footprint))
    }

    /// True when some other non-road entity stands on a sight path between
    /// the facing walls of `a` and `b`.
    pub fn line_of_sight_blocked(&self, a: ObjectId, b: ObjectId) -> bool {
        let (Some(first), Some(second)) = (self.get(a), self.get(b)) else {
            return false;
        };
        let walls = FacingWalls::between(&first.footprint, &second.footprint);
        walls.pairs.iter().any(|(from, to)| {
            geometry::rectilinear_path(*from, *to).into_iter().any(|tile| {
                self.entity_at(tile).is_some_and(|blocker| {
                    blocker.id != a && blocker.id != b && blocker.kind() != EntityKind::Road
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Catalog;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 5, 20).unwrap()
    }

    fn blueprint(kind: EntityKind, x: i32, y: i32) -> Blueprint {
        Catalog::default().blueprint(kind, TilePos::new(x, y), date())
    }

    #[test]
    fn placement_charges_price_and_assigns_increasing_ids() {
        let mut grid = WorldGrid::new(32, 32);
        let mut wallet = Wallet::new(10_000.0);
        let first = grid.place(blueprint(EntityKind::Road, 0, 0), &mut wallet).unwrap();
        let second = grid
            .place(blueprint(EntityKind::ResidentialZone, 2, 0), &mut wallet)
            .unwrap();
        assert!(second > first);
        assert_eq!(wallet.balance(), 10_000.0 - 75.0 - 100.0);
        assert_eq!(grid.object_count(), 2);
    }

    #[test]
    fn overlapping_footprints_collide() {
        let mut grid = WorldGrid::new(32, 32);
        let mut wallet = Wallet::new(10_000.0);
        let zone = grid
            .place(blueprint(EntityKind::ResidentialZone, 4, 4), &mut wallet)
            .unwrap();
        let err = grid
            .place(blueprint(EntityKind::Stadium, 6, 6), &mut wallet)
            .unwrap_err();
        assert!(matches!(err, PlacementError::Collision { blocking, .. } if blocking == zone));
        assert_eq!(wallet.balance(), 10_000.0 - 100.0);
    }

    #[test]
    fn water_rejects_everything_and_shore_only_non_roads() {
        let mut grid = WorldGrid::new(16, 16);
        grid.set_terrain(TilePos::new(3, 3), Terrain::Water);
        grid.set_terrain(TilePos::new(8, 8), Terrain::Shore);
        let mut wallet = Wallet::new(1_000.0);

        let err = grid.place(blueprint(EntityKind::Road, 3, 3), &mut wallet).unwrap_err();
        assert!(matches!(err, PlacementError::Water { .. }));
        assert_eq!(wallet.balance(), 1_000.0);

        assert!(grid.place(blueprint(EntityKind::Road, 8, 8), &mut wallet).is_ok());
        assert!(grid.place(blueprint(EntityKind::Forest, 8, 9), &mut wallet).is_ok());
        grid.set_terrain(TilePos::new(10, 10), Terrain::Shore);
        let err = grid.place(blueprint(EntityKind::Forest, 10, 10), &mut wallet).unwrap_err();
        assert!(matches!(err, PlacementError::Water { .. }));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut grid = WorldGrid::new(8, 8);
        let err = grid
            .place_exempt(blueprint(EntityKind::ResidentialZone, 6, 6))
            .unwrap_err();
        assert!(matches!(err, PlacementError::OutOfBounds { .. }));
    }

    #[test]
    fn exempt_placement_is_free() {
        let mut grid = WorldGrid::new(8, 8);
        grid.place_exempt(blueprint(EntityKind::Forest, 1, 1)).unwrap();
        assert_eq!(grid.of_kind(EntityKind::Forest).count(), 1);
    }

    #[test]
    fn remove_at_frees_tiles() {
        let mut grid = WorldGrid::new(8, 8);
        let mut wallet = Wallet::new(0.0);
        grid.place(blueprint(EntityKind::Road, 1, 1), &mut wallet).unwrap();
        assert!(grid.remove_at(TilePos::new(1, 1), EntityKind::Stadium).is_none());
        assert!(grid.remove_at(TilePos::new(1, 1), EntityKind::Road).is_some());
        assert!(grid.entity_at(TilePos::new(1, 1)).is_none());
        assert!(grid.place(blueprint(EntityKind::Road, 1, 1), &mut wallet).is_ok());
    }

    #[test]
    fn disasters_overlay_other_entities() {
        let mut grid = WorldGrid::new(16, 16);
        let zone = grid
            .place_exempt(blueprint(EntityKind::ResidentialZone, 2, 2))
            .unwrap();
        let disaster = grid.place_exempt(blueprint(EntityKind::Disaster, 3, 3)).unwrap();
        let area = grid.get(disaster).unwrap().footprint;
        assert_eq!(grid.intersecting(&area), vec![zone]);
        assert_eq!(grid.entity_at(TilePos::new(3, 3)).map(|e| e.id), Some(zone));
        assert_eq!(grid.find_at(TilePos::new(6, 6), EntityKind::Disaster), Some(disaster));
    }

    #[test]
    fn structures_between_walls_block_sight() {
        let mut grid = WorldGrid::new(32, 32);
        let forest = grid.place_exempt(blueprint(EntityKind::Forest, 0, 1)).unwrap();
        let zone = grid
            .place_exempt(blueprint(EntityKind::ResidentialZone, 4, 0))
            .unwrap();
        assert!(!grid.line_of_sight_blocked(forest, zone));

        grid.place_exempt(blueprint(EntityKind::Road, 1, 1)).unwrap();
        assert!(!grid.line_of_sight_blocked(forest, zone));

        let mut grid_blocked = grid.clone();
        grid_blocked
            .place_exempt(blueprint(EntityKind::PoliceDepartment, 2, 1))
            .unwrap();
        assert!(grid_blocked.line_of_sight_blocked(forest, zone));
    }
}
