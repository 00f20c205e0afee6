//! Reassembly of buildings split across tile boundaries.

use crate::enclosure::{classify, edge_to_penalty_map, Enclosure, PenaltyMap};
use crate::shape::{BuildingShape, Edge};
use std::collections::HashMap;
use tracing::trace;

/// Merge fragments of one building into its outer boundary.
///
/// An edge is interior, and dropped, when its midpoint lies inside any
/// fragment or when another fragment carries the same segment (the seam
/// along a tile border). All other edges are kept in fragment order. A
/// single fragment comes back unchanged.
pub fn merge(fragments: &[BuildingShape]) -> BuildingShape {
    match fragments {
        [] => return BuildingShape::default(),
        [only] => return only.clone(),
        _ => {}
    }

    let penalties: Vec<PenaltyMap> = fragments.iter().map(edge_to_penalty_map).collect();

    // Segment -> index of the first fragment that carries it, or usize::MAX
    // once a second fragment has it too.
    let mut owners: HashMap<_, usize> = HashMap::new();
    for (i, fragment) in fragments.iter().enumerate() {
        for edge in &fragment.edges {
            owners
                .entry(edge.undirected())
                .and_modify(|owner| {
                    if *owner != i {
                        *owner = usize::MAX;
                    }
                })
                .or_insert(i);
        }
    }

    let is_inside_any = |edge: &Edge| {
        let mid = edge.midpoint();
        fragments
            .iter()
            .zip(&penalties)
            .any(|(fragment, pm)| classify(mid, fragment, pm) == Enclosure::Inside)
    };

    let edges: Vec<Edge> = fragments
        .iter()
        .flat_map(|fragment| fragment.edges.iter().copied())
        .filter(|edge| {
            let seam = owners.get(&edge.undirected()) == Some(&usize::MAX);
            let keep = !seam && !is_inside_any(edge);
            if !keep {
                trace!(from = %edge.from, to = %edge.to, seam, "Dropping interior edge");
            }
            keep
        })
        .collect();

    BuildingShape::new(fragments[0].id.clone(), edges)
}
