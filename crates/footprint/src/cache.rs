//! Cache-aside access to decoded tiles over a [`TileStore`].
//!
//! Store failures never escape: they are logged and read as "nothing
//! there", so one bad position degrades a query instead of failing it.

use crate::coord::TilePosition;
use crate::shape::Tile;
use crate::store::TileStore;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct TileCache<S> {
    store: S,
}

impl<S: TileStore> TileCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Positions not yet cached, in input order.
    pub fn missing(&self, positions: &[TilePosition]) -> Vec<TilePosition> {
        match self.store.missing(positions) {
            Ok(missing) => missing,
            Err(e) => {
                warn!(error = %e, "Tile store lookup failed; treating positions as unavailable");
                Vec::new()
            }
        }
    }

    /// Store `tile` at `position`. Returns whether a new entry was written;
    /// an existing entry is kept as is.
    pub fn put(&mut self, position: TilePosition, tile: &Tile) -> bool {
        match self.store.insert(position, &tile.encode()) {
            Ok(true) => {
                debug!(row = position.row, col = position.col, shapes = tile.len(), "Cached tile");
                true
            }
            Ok(false) => {
                debug!(row = position.row, col = position.col, "Tile already cached");
                false
            }
            Err(e) => {
                warn!(row = position.row, col = position.col, error = %e, "Failed to cache tile");
                false
            }
        }
    }

    /// The cached tile, or an empty one if absent or unreadable.
    pub fn get(&self, position: TilePosition) -> Tile {
        let blob = match self.store.select(position) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                warn!(row = position.row, col = position.col, "Tile not in cache");
                return Tile::default();
            }
            Err(e) => {
                warn!(row = position.row, col = position.col, error = %e, "Tile cache read failed");
                return Tile::default();
            }
        };

        Tile::decode(&blob).unwrap_or_else(|e| {
            warn!(row = position.row, col = position.col, error = %e, "Cached tile is corrupt");
            Tile::default()
        })
    }
}
