//! Road connectivity and zone-to-workplace reachability.

use std::collections::{BTreeSet, HashSet};

use crate::{components::ObjectId, geometry::TilePos, grid::WorldGrid};

pub struct RoadGraph<'a> {
    grid: &'a WorldGrid,
    roads: HashSet<TilePos>,
}

impl<'a> RoadGraph<'a> {
    pub fn new(grid: &'a WorldGrid) -> Self {
        Self {
            grid,
            roads: grid.road_tiles(),
        }
    }

    /// The graph as it would look with the road at `excluded` demolished.
    pub fn without(grid: &'a WorldGrid, excluded: TilePos) -> Self {
        let mut graph = Self::new(grid);
        graph.roads.remove(&excluded);
        graph
    }

    pub fn is_road(&self, tile: TilePos) -> bool {
        self.roads.contains(&tile)
    }

    /// Depth-first walk over contiguous road tiles starting at `root`,
    /// expanding Left, Right, Up, Down. Tiles are returned in visit order.
    pub fn connected_roads(&self, root: TilePos) -> Vec<TilePos> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.walk(root, &mut visited, &mut order);
        order
    }

    fn walk(&self, root: TilePos, visited: &mut HashSet<TilePos>, order: &mut Vec<TilePos>) {
        if !self.is_road(root) || !visited.insert(root) {
            return;
        }
        let mut stack = vec![root];
        while let Some(tile) = stack.pop() {
            order.push(tile);
            // reversed so Left is expanded first
            for next in tile.neighbors4().into_iter().rev() {
                if self.is_road(next) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
    }

    /// Road tiles touching the outside edge of the zone.
    pub fn adjacent_roads(&self, zone: ObjectId) -> Vec<TilePos> {
        let Some(entity) = self.grid.get(zone) else {
            return Vec::new();
        };
        entity
            .footprint
            .outer_ring()
            .into_iter()
            .filter(|tile| self.is_road(*tile))
            .collect()
    }

    /// Every road tile connected to the roads around `zone`.
    pub fn network_around(&self, zone: ObjectId) -> Vec<TilePos> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for road in self.adjacent_roads(zone) {
            self.walk(road, &mut visited, &mut order);
        }
        order
    }

    /// Industrial and service zones reachable over roads from `zone`.
    pub fn reachable_workplaces(&self, zone: ObjectId) -> BTreeSet<ObjectId> {
        let mut workplaces = BTreeSet::new();
        for road in self.network_around(zone) {
            for tile in road.neighbors4() {
                if let Some(entity) = self.grid.entity_at(tile) {
                    if entity.id != zone && entity.kind().is_work_zone() {
                        workplaces.insert(entity.id);
                    }
                }
            }
        }
        workplaces
    }
}

/// A residential zone and a workplace it would no longer reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeveredLink {
    pub residential: ObjectId,
    pub workplace: ObjectId,
}

/// Links between residential zones and workplaces that demolishing the road
/// at `road` would cut.
pub fn severed_links(grid: &WorldGrid, road: TilePos) -> Vec<SeveredLink> {
    let before = RoadGraph::new(grid);
    if !before.is_road(road) {
        return Vec::new();
    }
    let component: HashSet<TilePos> = before.connected_roads(road).into_iter().collect();
    let after = RoadGraph::without(grid, road);
    let mut severed = Vec::new();
    for zone in grid.residential_zones() {
        let touches = zone
            .footprint
            .outer_ring()
            .iter()
            .any(|tile| component.contains(tile));
        if !touches {
            continue;
        }
        let reachable_after = after.reachable_workplaces(zone.id);
        for workplace in before.reachable_workplaces(zone.id) {
            if !reachable_after.contains(&workplace) {
                severed.push(SeveredLink {
                    residential: zone.id,
                    workplace,
                });
            }
        }
    }
    severed
}
