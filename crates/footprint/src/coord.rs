//! Survey grid, tile grid and cell space.
//!
//! Survey coordinates are continuous and grow east (x) and north (y).
//! Cell coordinates are integers local to one search centre: one unit is
//! `cell_size` survey units, and y grows south. The tile grid partitions
//! cell space into `TILE_CELLS` x `TILE_CELLS` tiles addressed by
//! `(row, col)`, row 0 at the top of the grid.

use crate::config::GridConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of one tile, in cells.
pub const TILE_CELLS: i32 = 512;

/// Integer position in cell space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellPoint {
    pub x: i32,
    pub y: i32,
}

impl CellPoint {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Continuous position in the external survey grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurveyPoint {
    pub x: f64,
    pub y: f64,
}

impl SurveyPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for SurveyPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2},{:.2})", self.x, self.y)
    }
}

/// One tile of the global tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePosition {
    pub row: i32,
    pub col: i32,
}

impl TilePosition {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Cell-space offset of this tile's origin relative to `centre`'s origin,
    /// as `(dx, dy)`. `None` when the tiles are too far apart for cell space.
    #[inline]
    pub fn cell_offset_from(&self, centre: TilePosition) -> Option<(i32, i32)> {
        let offset = |tile: i32, centre: i32| {
            let cells = (tile as i64 - centre as i64) * TILE_CELLS as i64;
            i32::try_from(cells).ok()
        };
        Some((offset(self.col, centre.col)?, offset(self.row, centre.row)?))
    }
}

impl fmt::Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row, self.col)
    }
}

/// Converts between survey coordinates and the cell space anchored at the
/// tile containing a search centre.
///
/// Every conversion is relative to that one tile's origin, so cell
/// coordinates of points outside the centre tile are negative or exceed
/// `TILE_CELLS`; [`CoordConverter::tile_position_for`] recovers their tile.
#[derive(Debug, Clone, Copy)]
pub struct CoordConverter {
    grid_origin: SurveyPoint,
    cell_size: f64,
    centre_tile: TilePosition,
    /// Offset of the centre tile's origin from the grid origin, survey units,
    /// x east and y south.
    tile_origin: SurveyPoint,
}

impl CoordConverter {
    pub fn new(grid: &GridConfig, centre: SurveyPoint) -> Result<Self> {
        grid.validate()?;

        let tile_span = TILE_CELLS as f64 * grid.cell_size;
        let col = ((centre.x - grid.origin.x) / tile_span).floor() as i32;
        let row = ((grid.origin.y - centre.y) / tile_span).floor() as i32;

        Ok(Self::with_centre_tile(grid, TilePosition::new(row, col)))
    }

    /// Anchor cell space at an explicit tile. `grid` is assumed valid.
    pub fn with_centre_tile(grid: &GridConfig, centre_tile: TilePosition) -> Self {
        let tile_span = TILE_CELLS as f64 * grid.cell_size;
        Self {
            grid_origin: grid.origin,
            cell_size: grid.cell_size,
            centre_tile,
            tile_origin: SurveyPoint::new(
                centre_tile.col as f64 * tile_span,
                centre_tile.row as f64 * tile_span,
            ),
        }
    }

    #[inline]
    pub fn centre_tile(&self) -> TilePosition {
        self.centre_tile
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn to_cell(&self, survey: SurveyPoint) -> CellPoint {
        let tile_x = survey.x - self.grid_origin.x - self.tile_origin.x;
        let tile_y = self.grid_origin.y - survey.y - self.tile_origin.y;
        CellPoint::new(
            (tile_x / self.cell_size).floor() as i32,
            (tile_y / self.cell_size).floor() as i32,
        )
    }

    pub fn to_survey(&self, cell: CellPoint) -> SurveyPoint {
        let grid_x = cell.x as f64 * self.cell_size + self.tile_origin.x;
        let grid_y = cell.y as f64 * self.cell_size + self.tile_origin.y;
        SurveyPoint::new(self.grid_origin.x + grid_x, self.grid_origin.y - grid_y)
    }

    /// Tile containing `cell`. Floor division, so negative cells land in
    /// the tiles above and to the left of the centre.
    pub fn tile_position_for(&self, cell: CellPoint) -> TilePosition {
        TilePosition::new(
            self.centre_tile.row.saturating_add(cell.y.div_euclid(TILE_CELLS)),
            self.centre_tile.col.saturating_add(cell.x.div_euclid(TILE_CELLS)),
        )
    }

    /// Distinct tiles covering `cells`, in first-seen order.
    pub fn covering_tiles(&self, cells: &[CellPoint]) -> Vec<TilePosition> {
        let mut seen = std::collections::HashSet::new();
        cells
            .iter()
            .map(|&cell| self.tile_position_for(cell))
            .filter(|pos| seen.insert(*pos))
            .collect()
    }
}
