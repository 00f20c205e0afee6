//! Point-in-footprint classification.
//!
//! A vertical ray through the query point is cast both ways and the
//! distinct crossing heights on each side are counted. Axis-aligned
//! vertical runs contribute both of their endpoints as crossings, which
//! overcounts; the per-edge [`PenaltyMap`] takes that back out.

use crate::coord::CellPoint;
use crate::shape::{BuildingShape, Edge, Tile};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enclosure {
    Inside,
    OnEdge,
    Outside,
}

/// Crossing correction per vertical edge. Edges absent from the map have
/// no correction.
pub type PenaltyMap = HashMap<Edge, u32>;

/// Penalties for every vertical edge of `shape`, judged by how its ring
/// neighbours approach it.
///
/// When the neighbours leave the run on the same side the run is a bump
/// the ray only touches, so both endpoint crossings are removed (2).
/// When they leave on opposite sides the run is a real crossing counted
/// twice, so one is removed (1).
pub fn edge_to_penalty_map(shape: &BuildingShape) -> PenaltyMap {
    let edges = &shape.edges;
    let n = edges.len();
    let mut penalties = PenaltyMap::new();
    if n < 3 {
        return penalties;
    }

    for (i, edge) in edges.iter().enumerate() {
        if !edge.is_vertical() {
            continue;
        }
        let before = edges[(i + n - 1) % n].from;
        let after = edges[(i + 1) % n].to;

        let before_left = before.x < edge.from.x;
        let after_left = after.x < edge.to.x;
        let penalty = if before_left == after_left { 2 } else { 1 };
        penalties.insert(*edge, penalty);
    }
    penalties
}

/// One penalty map per shape, index-aligned with `tile.shapes`.
pub fn penalty_maps(tile: &Tile) -> Vec<PenaltyMap> {
    tile.shapes.iter().map(edge_to_penalty_map).collect()
}

#[inline]
fn is_odd(n: i64) -> bool {
    n.rem_euclid(2) == 1
}

/// Classify `point` against `shape`. Invalid shapes enclose nothing.
pub fn classify(point: CellPoint, shape: &BuildingShape, penalties: &PenaltyMap) -> Enclosure {
    if !shape.is_valid() {
        return Enclosure::Outside;
    }

    let mut above = HashSet::new();
    let mut below = HashSet::new();
    let mut above_penalty = 0u32;
    let mut below_penalty = 0u32;

    for edge in &shape.edges {
        if point.x < edge.min_x() || point.x > edge.max_x() {
            continue;
        }

        if !edge.is_vertical() {
            let crossing = edge.y_at(point.x);
            if point.y < crossing {
                above.insert(crossing);
            } else if point.y > crossing {
                below.insert(crossing);
            }
            continue;
        }

        if (edge.min_y()..=edge.max_y()).contains(&point.y) {
            return Enclosure::OnEdge;
        }
        let penalty = penalties.get(edge).copied().unwrap_or(0);
        if edge.min_y() > point.y {
            above.insert(edge.from.y);
            above.insert(edge.to.y);
            above_penalty += penalty;
        } else {
            below.insert(edge.from.y);
            below.insert(edge.to.y);
            below_penalty += penalty;
        }
    }

    let n_above = above.len() as i64 - above_penalty as i64;
    let n_below = below.len() as i64 - below_penalty as i64;

    match (is_odd(n_above), is_odd(n_below)) {
        (a, b) if a != b => Enclosure::OnEdge,
        (true, _) => Enclosure::Inside,
        _ => Enclosure::Outside,
    }
}
