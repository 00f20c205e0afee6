//! Snapping survey points to building centres.
//!
//! ```text
//!   points ──► CoordConverter ──► covering tiles ──► TileCache ◄── TileSource
//!                                                        │          (fill gaps)
//!                                                        ▼
//!                              shift into centre tile's cell space
//!                                                        │
//!                                       group by osid, merge fragments
//!                                                        │
//!   snapped ◄── to_survey ◄── first enclosing shape ◄────┘
//! ```

use crate::cache::TileCache;
use crate::config::GridConfig;
use crate::coord::{CellPoint, CoordConverter, SurveyPoint, TilePosition};
use crate::decode::parse_tile;
use crate::enclosure::{classify, penalty_maps, Enclosure, PenaltyMap};
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::reconcile::merge;
use crate::shape::{BuildingShape, Tile};
use crate::source::TileSource;
use crate::store::TileStore;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub struct Pipeline<S, F> {
    grid: GridConfig,
    layer: String,
    cache: TileCache<S>,
    source: F,
    metrics: PipelineMetrics,
}

impl<S: TileStore, F: TileSource> Pipeline<S, F> {
    pub fn new(
        grid: GridConfig,
        layer: impl Into<String>,
        cache: TileCache<S>,
        source: F,
    ) -> Result<Self> {
        grid.validate()?;
        Ok(Self {
            grid,
            layer: layer.into(),
            cache,
            source,
            metrics: PipelineMetrics::new()?,
        })
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &TileCache<S> {
        &self.cache
    }

    /// Fetch, decode and cache every position not cached yet. A failed
    /// position is logged and left uncached.
    fn fill(&mut self, positions: &[TilePosition]) {
        let missing = self.cache.missing(positions);
        self.metrics.tiles_missing_total.inc_by(missing.len() as u64);

        for position in missing {
            let timer = self.metrics.fetch_latency.start_timer();
            let fetched = self.source.fetch(position);
            timer.observe_duration();

            let raw = match fetched {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(row = position.row, col = position.col, error = %e, "Tile fetch failed");
                    self.metrics.tile_fetch_failures_total.inc();
                    continue;
                }
            };
            let tile = match parse_tile(&raw, &self.layer) {
                Ok(tile) => tile,
                Err(e) => {
                    warn!(row = position.row, col = position.col, error = %e, "Fetched tile is not a vector tile");
                    self.metrics.tile_fetch_failures_total.inc();
                    continue;
                }
            };
            debug!(row = position.row, col = position.col, shapes = tile.len(), "Fetched tile");
            self.cache.put(position, &tile);
            self.metrics.tiles_fetched_total.inc();
        }
    }

    /// All buildings over `positions` in the cell space of `centre`, with
    /// fragments of the same building merged into one shape.
    ///
    /// Shapes keep tile order, then feature order; a merged building takes
    /// the place of its first fragment.
    pub fn combined_tile(&mut self, positions: &[TilePosition], centre: TilePosition) -> Tile {
        let mut seen = HashSet::new();
        let positions: Vec<TilePosition> =
            positions.iter().copied().filter(|p| seen.insert(*p)).collect();
        self.metrics.tiles_requested_total.inc_by(positions.len() as u64);

        self.fill(&positions);

        let mut groups: Vec<Vec<BuildingShape>> = Vec::new();
        let mut group_of: HashMap<String, usize> = HashMap::new();
        for &position in &positions {
            let Some((dx, dy)) = position.cell_offset_from(centre) else {
                warn!(row = position.row, col = position.col, "Tile too far from centre; skipped");
                continue;
            };
            for shape in self.cache.get(position).shapes {
                let Some(shifted) = shape.translated(dx, dy) else {
                    warn!(osid = %shape.id, row = position.row, col = position.col, "Shape out of cell range; skipped");
                    continue;
                };
                match group_of.get(&shifted.id) {
                    Some(&g) => groups[g].push(shifted),
                    None => {
                        group_of.insert(shifted.id.clone(), groups.len());
                        groups.push(vec![shifted]);
                    }
                }
            }
        }

        let shapes: Vec<BuildingShape> = groups
            .into_iter()
            .map(|mut group| {
                if group.len() == 1 {
                    return group.swap_remove(0);
                }
                debug!(osid = %group[0].id, fragments = group.len(), "Merging building fragments");
                self.metrics.shapes_merged_total.inc();
                merge(&group)
            })
            .collect();

        Tile::new(shapes)
    }

    /// Move each point to the centre of the first building enclosing it.
    /// Points outside every building come back unchanged.
    ///
    /// Fails only if the grid configuration is unusable.
    pub fn snap_points(
        &mut self,
        points: &[SurveyPoint],
        centre: SurveyPoint,
    ) -> Result<Vec<SurveyPoint>> {
        let converter = CoordConverter::new(&self.grid, centre)?;
        let cells: Vec<_> = points.iter().map(|&p| converter.to_cell(p)).collect();
        let positions = converter.covering_tiles(&cells);

        let tile = self.combined_tile(&positions, converter.centre_tile());
        let penalties = penalty_maps(&tile);

        let snapped: Vec<SurveyPoint> = points
            .iter()
            .zip(&cells)
            .map(|(&point, &cell)| {
                match first_enclosing(&tile, &penalties, cell) {
                    Some(c) => {
                        self.metrics.points_snapped_total.inc();
                        converter.to_survey(c)
                    }
                    None => {
                        self.metrics.points_unmatched_total.inc();
                        point
                    }
                }
            })
            .collect();

        info!(
            points = points.len(),
            tiles = positions.len(),
            shapes = tile.len(),
            "Snapped points"
        );
        Ok(snapped)
    }
}

/// Centre of the first shape, in tile order, that does not leave `cell`
/// outside. Invalid shapes never match.
fn first_enclosing(tile: &Tile, penalties: &[PenaltyMap], cell: CellPoint) -> Option<CellPoint> {
    tile.shapes
        .iter()
        .zip(penalties)
        .find(|(shape, pm)| classify(cell, shape, pm) != Enclosure::Outside)
        .and_then(|(shape, _)| shape.approx_centre)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BUILDING_LAYER;
    use crate::decode::tests::{building_layer, encode_tile, ring_geometry};
    use crate::error::FetchError;
    use crate::store::MemoryStore;
    use bytes::Bytes;
    use std::cell::Cell;

    /// Serves canned tiles and counts requests.
    #[derive(Default)]
    struct CannedSource {
        tiles: HashMap<TilePosition, Bytes>,
        calls: Cell<usize>,
    }

    impl CannedSource {
        fn with(mut self, position: TilePosition, features: Vec<(&str, Vec<u32>)>) -> Self {
            let raw = encode_tile(vec![building_layer(features)]);
            self.tiles.insert(position, Bytes::from(raw));
            self
        }
    }

    impl TileSource for CannedSource {
        fn fetch(&self, position: TilePosition) -> std::result::Result<Bytes, FetchError> {
            self.calls.set(self.calls.get() + 1);
            self.tiles
                .get(&position)
                .cloned()
                .ok_or(FetchError::Unavailable(position))
        }
    }

    fn unit_grid() -> GridConfig {
        GridConfig {
            origin: SurveyPoint::new(0.0, 0.0),
            cell_size: 1.0,
        }
    }

    fn pipeline(source: CannedSource) -> Pipeline<MemoryStore, CannedSource> {
        Pipeline::new(
            unit_grid(),
            DEFAULT_BUILDING_LAYER,
            TileCache::new(MemoryStore::new()),
            source,
        )
        .unwrap()
    }

    #[test]
    fn test_snap_moves_enclosed_points_only() {
        let source = CannedSource::default().with(
            TilePosition::new(0, 0),
            vec![(
                "b1",
                ring_geometry(&[(90, 90), (90, 110), (110, 110), (110, 90)]),
            )],
        );
        let mut pipeline = pipeline(source);

        let points = [
            SurveyPoint::new(95.5, -95.5),
            SurveyPoint::new(300.25, -300.75),
            SurveyPoint::new(90.0, -100.0),
        ];
        let snapped = pipeline
            .snap_points(&points, SurveyPoint::new(100.0, -100.0))
            .unwrap();

        assert_eq!(snapped[0], SurveyPoint::new(100.0, -100.0));
        assert_eq!(snapped[1], points[1]);
        // On the boundary counts as a hit.
        assert_eq!(snapped[2], SurveyPoint::new(100.0, -100.0));
        assert_eq!(pipeline.metrics().points_snapped_total.get(), 2);
        assert_eq!(pipeline.metrics().points_unmatched_total.get(), 1);
    }

    #[test]
    fn test_cached_tiles_are_not_refetched() {
        let source = CannedSource::default().with(
            TilePosition::new(0, 0),
            vec![("b1", ring_geometry(&[(0, 0), (0, 4), (4, 4), (4, 0)]))],
        );
        let mut pipeline = pipeline(source);
        let centre = TilePosition::new(0, 0);

        let first = pipeline.combined_tile(&[centre], centre);
        let second = pipeline.combined_tile(&[centre, centre], centre);

        assert_eq!(first, second);
        assert_eq!(pipeline.source.calls.get(), 1);
        assert_eq!(pipeline.metrics().tiles_fetched_total.get(), 1);
    }

    #[test]
    fn test_failed_fetch_yields_empty_position() {
        let mut pipeline = pipeline(CannedSource::default());
        let centre = TilePosition::new(4, 4);

        let tile = pipeline.combined_tile(&[centre], centre);
        assert!(tile.is_empty());
        assert_eq!(pipeline.metrics().tile_fetch_failures_total.get(), 1);
        // Nothing was stored, so the next call tries again.
        assert_eq!(pipeline.cache().missing(&[centre]), vec![centre]);
    }

    #[test]
    fn test_shapes_shift_into_centre_space() {
        let source = CannedSource::default()
            .with(
                TilePosition::new(7, 7),
                vec![("a", ring_geometry(&[(10, 10), (10, 20), (20, 20)]))],
            )
            .with(
                TilePosition::new(6, 8),
                vec![("b", ring_geometry(&[(10, 10), (10, 20), (20, 20)]))],
            );
        let mut pipeline = pipeline(source);

        let tile = pipeline.combined_tile(
            &[TilePosition::new(7, 7), TilePosition::new(6, 8)],
            TilePosition::new(7, 7),
        );
        assert_eq!(tile.len(), 2);
        assert_eq!(tile.shapes[0].approx_centre, Some(CellPoint::new(15, 15)));
        assert_eq!(
            tile.shapes[1].approx_centre,
            Some(CellPoint::new(15 + 512, 15 - 512))
        );
    }

    #[test]
    fn test_first_enclosing_shape_wins() {
        let p = CellPoint::new;
        let mut hollow = BuildingShape::from_ring("hollow", &[p(0, 0), p(0, 40), p(40, 40), p(40, 0)]);
        hollow.approx_centre = None;
        let tile = Tile::new(vec![
            hollow,
            BuildingShape::from_ring("big", &[p(0, 0), p(0, 40), p(40, 40), p(40, 0)]),
            BuildingShape::from_ring("small", &[p(10, 10), p(10, 20), p(20, 20), p(20, 10)]),
        ]);
        let penalties = penalty_maps(&tile);

        assert_eq!(first_enclosing(&tile, &penalties, p(15, 15)), Some(p(20, 20)));
        assert_eq!(first_enclosing(&tile, &penalties, p(50, 50)), None);

        let reversed = Tile::new(vec![tile.shapes[2].clone(), tile.shapes[1].clone()]);
        let penalties = penalty_maps(&reversed);
        assert_eq!(first_enclosing(&reversed, &penalties, p(15, 15)), Some(p(15, 15)));
    }

    #[test]
    fn test_snap_overlapping_buildings_uses_first_in_tile_order() {
        let source = CannedSource::default().with(
            TilePosition::new(0, 0),
            vec![
                ("outer", ring_geometry(&[(100, 100), (100, 200), (200, 200), (200, 100)])),
                ("inner", ring_geometry(&[(120, 120), (120, 140), (140, 140), (140, 120)])),
            ],
        );
        let mut pipeline = pipeline(source);

        let snapped = pipeline
            .snap_points(&[SurveyPoint::new(130.5, -130.5)], SurveyPoint::new(150.0, -150.0))
            .unwrap();
        assert_eq!(snapped, vec![SurveyPoint::new(150.0, -150.0)]);
    }

    #[test]
    fn test_far_tiles_are_skipped() {
        let source = CannedSource::default().with(
            TilePosition::new(0, 5_000_000),
            vec![("far", ring_geometry(&[(0, 0), (0, 4), (4, 4), (4, 0)]))],
        );
        let mut pipeline = pipeline(source);

        let tile = pipeline.combined_tile(&[TilePosition::new(0, 5_000_000)], TilePosition::new(0, 0));
        assert!(tile.is_empty());
    }
}
