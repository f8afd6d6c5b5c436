//! Tile geometry: footprints, circumference sets, the gap-distance metric and
//! rectilinear sight paths.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Cardinal neighbours in traversal order: Left, Right, Up, Down.
    pub fn neighbors4(self) -> [TilePos; 4] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }

    pub fn manhattan(self, other: TilePos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Number of free tiles between two tiles along a taxicab path.
pub fn gap(a: TilePos, b: TilePos) -> i32 {
    a.manhattan(b) - 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub origin: TilePos,
    pub width: i32,
    pub height: i32,
}

impl Footprint {
    pub fn new(origin: TilePos, width: i32, height: i32) -> Self {
        Self {
            origin,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn single(tile: TilePos) -> Self {
        Self::new(tile, 1, 1)
    }

    pub fn min_x(&self) -> i32 {
        self.origin.x
    }

    pub fn max_x(&self) -> i32 {
        self.origin.x + self.width - 1
    }

    pub fn min_y(&self) -> i32 {
        self.origin.y
    }

    pub fn max_y(&self) -> i32 {
        self.origin.y + self.height - 1
    }

    pub fn contains(&self, tile: TilePos) -> bool {
        (self.min_x()..=self.max_x()).contains(&tile.x)
            && (self.min_y()..=self.max_y()).contains(&tile.y)
    }

    pub fn overlaps(&self, other: &Footprint) -> bool {
        self.min_x() <= other.max_x()
            && other.min_x() <= self.max_x()
            && self.min_y() <= other.max_y()
            && other.min_y() <= self.max_y()
    }

    /// True when the two footprints share a column band or a row band.
    pub fn shares_band(&self, other: &Footprint) -> bool {
        let x_band = self.min_x() <= other.max_x() && other.min_x() <= self.max_x();
        let y_band = self.min_y() <= other.max_y() && other.min_y() <= self.max_y();
        x_band || y_band
    }

    /// The part of the footprint that lies on a `width` x `height` map.
    pub fn clipped(&self, width: i32, height: i32) -> Option<Footprint> {
        let (min_x, min_y) = (self.min_x().max(0), self.min_y().max(0));
        let (max_x, max_y) = (self.max_x().min(width - 1), self.max_y().min(height - 1));
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some(Footprint::new(
            TilePos::new(min_x, min_y),
            max_x - min_x + 1,
            max_y - min_y + 1,
        ))
    }

    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        (self.min_y()..=self.max_y())
            .flat_map(move |y| (self.min_x()..=self.max_x()).map(move |x| TilePos::new(x, y)))
    }

    /// Perimeter tiles of the footprint, row-major.
    pub fn circumference(&self) -> Vec<TilePos> {
        self.tiles()
            .filter(|tile| {
                tile.x == self.min_x()
                    || tile.x == self.max_x()
                    || tile.y == self.min_y()
                    || tile.y == self.max_y()
            })
            .collect()
    }

    /// Tiles edge-adjacent to the footprint from the outside. Corners are
    /// excluded since they do not touch any edge.
    pub fn outer_ring(&self) -> Vec<TilePos> {
        let mut ring = Vec::with_capacity(2 * (self.width + self.height) as usize);
        for x in self.min_x()..=self.max_x() {
            ring.push(TilePos::new(x, self.min_y() - 1));
        }
        for y in self.min_y()..=self.max_y() {
            ring.push(TilePos::new(self.min_x() - 1, y));
            ring.push(TilePos::new(self.max_x() + 1, y));
        }
        for x in self.min_x()..=self.max_x() {
            ring.push(TilePos::new(x, self.max_y() + 1));
        }
        ring
    }
}

/// Gap distance between two footprints.
///
/// The minimum gap over every circumference pair is used directly when the
/// footprints share a row or column band. Diagonally separated footprints use
/// half of that gap plus one.
pub fn distance(a: &Footprint, b: &Footprint) -> f64 {
    let raw = closest_gap(a, b) as f64;
    if a.shares_band(b) {
        raw
    } else {
        raw / 2.0 + 1.0
    }
}

fn closest_gap(a: &Footprint, b: &Footprint) -> i32 {
    let far = b.circumference();
    a.circumference()
        .into_iter()
        .flat_map(|p| far.iter().map(move |q| gap(p, *q)))
        .min()
        .unwrap_or(0)
}

/// The closest circumference point pairs of two footprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacingWalls {
    pub pairs: Vec<(TilePos, TilePos)>,
}

impl FacingWalls {
    pub fn between(a: &Footprint, b: &Footprint) -> Self {
        let near = a.circumference();
        let far = b.circumference();
        let mut best = i32::MAX;
        let mut pairs = Vec::new();
        for p in &near {
            for q in &far {
                let d = p.manhattan(*q);
                if d < best {
                    best = d;
                    pairs.clear();
                }
                if d == best {
                    pairs.push((*p, *q));
                }
            }
        }
        Self { pairs }
    }

    /// Facing points on the first footprint.
    pub fn near_wall(&self) -> BTreeSet<TilePos> {
        self.pairs.iter().map(|(p, _)| *p).collect()
    }

    /// Facing points on the second footprint.
    pub fn far_wall(&self) -> BTreeSet<TilePos> {
        self.pairs.iter().map(|(_, q)| *q).collect()
    }
}

/// Intermediate tiles on the path from `from` to `to`, walking along x first
/// and then along y. Endpoints are not included.
pub fn rectilinear_path(from: TilePos, to: TilePos) -> Vec<TilePos> {
    let mut path = Vec::new();
    let mut cursor = from;
    let step_x = (to.x - from.x).signum();
    let step_y = (to.y - from.y).signum();
    while cursor.x != to.x {
        cursor = cursor.offset(step_x, 0);
        path.push(cursor);
    }
    while cursor.y != to.y {
        cursor = cursor.offset(0, step_y);
        path.push(cursor);
    }
    path.retain(|tile| *tile != to);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clipping_keeps_on_map_tiles() {
        let area = Footprint::new(TilePos::new(30, 29), 4, 4);
        assert_eq!(
            area.clipped(32, 32),
            Some(Footprint::new(TilePos::new(30, 29), 2, 3))
        );
        assert_eq!(area.clipped(64, 64), Some(area));
        assert_eq!(area.clipped(30, 30), None);
    }

    fn fp(x: i32, y: i32, w: i32, h: i32) -> Footprint {
        Footprint::new(TilePos::new(x, y), w, h)
    }

    #[test]
    fn gap_matches_taxicab_minus_one() {
        assert_eq!(gap(TilePos::new(1, 1), TilePos::new(1, 2)), 0);
        assert_eq!(gap(TilePos::new(1, 1), TilePos::new(2, 2)), 1);
        assert_eq!(gap(TilePos::new(2, 2), TilePos::new(2, 2)), -1);
    }

    #[test]
    fn circumference_of_square_has_perimeter_tiles() {
        assert_eq!(fp(0, 0, 4, 4).circumference().len(), 12);
        assert_eq!(fp(3, 3, 1, 1).circumference(), vec![TilePos::new(3, 3)]);
        assert_eq!(fp(0, 0, 2, 2).circumference().len(), 4);
    }

    #[test]
    fn outer_ring_skips_corners() {
        let ring = fp(0, 0, 2, 2).outer_ring();
        assert_eq!(ring.len(), 8);
        assert!(!ring.contains(&TilePos::new(-1, -1)));
        assert!(ring.contains(&TilePos::new(2, 1)));
    }

    #[test]
    fn distance_in_shared_band_is_raw_gap() {
        let a = fp(0, 0, 4, 4);
        let b = fp(6, 1, 4, 4);
        assert_eq!(distance(&a, &b), 2.0);
    }

    #[test]
    fn distance_on_diagonal_halves_gap() {
        let a = fp(0, 0, 4, 4);
        let b = fp(5, 5, 4, 4);
        // closest corners (3,3) and (5,5): gap 3
        assert_eq!(distance(&a, &b), 2.5);
    }

    #[test]
    fn facing_walls_pick_closest_edges() {
        let a = fp(0, 0, 2, 2);
        let b = fp(4, 0, 2, 2);
        let walls = FacingWalls::between(&a, &b);
        assert_eq!(walls.pairs.len(), 2);
        assert_eq!(
            walls.near_wall().into_iter().collect::<Vec<_>>(),
            vec![TilePos::new(1, 0), TilePos::new(1, 1)]
        );
        assert!(walls.far_wall().contains(&TilePos::new(4, 1)));
    }

    #[test]
    fn rectilinear_path_excludes_endpoints() {
        let path = rectilinear_path(TilePos::new(0, 0), TilePos::new(2, 2));
        assert_eq!(
            path,
            vec![TilePos::new(1, 0), TilePos::new(2, 0), TilePos::new(2, 1)]
        );
        assert!(rectilinear_path(TilePos::new(0, 0), TilePos::new(1, 0)).is_empty());
    }

    proptest! {
        #[test]
        fn distance_is_symmetric(
            ax in -20i32..20, ay in -20i32..20, aw in 1i32..5, ah in 1i32..5,
            bx in -20i32..20, by in -20i32..20, bw in 1i32..5, bh in 1i32..5,
        ) {
            let a = fp(ax, ay, aw, ah);
            let b = fp(bx, by, bw, bh);
            prop_assert_eq!(distance(&a, &b), distance(&b, &a));
        }
    }
}
