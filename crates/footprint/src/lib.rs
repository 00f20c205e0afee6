//! Building footprint lookup over survey-grid vector tiles.
//!
//! Given survey points near one search centre, finds the building each
//! point falls in and returns that building's approximate centre.
//!
//! - Survey coordinates are mapped into a per-query integer cell space
//!   anchored at the tile holding the search centre ([`coord`]).
//! - Vector tiles are fetched once per position ([`source`]), decoded into
//!   edge-list footprints ([`decode`]) and kept in an append-only store
//!   ([`store`], [`cache`]).
//! - Buildings cut by tile borders are stitched back together
//!   ([`reconcile`]) and points are tested against the result with a
//!   ray-cast that corrects for vertical runs ([`enclosure`]).
//!
//! Stored tile blob (`footprint.v1.BuildingTile`, protobuf):
//!   1 : repeated BuildingShape
//!         1 : string osid
//!         2 : repeated int32 edges          x1 y1 x2 y2, per directed segment
//!         3 : repeated int32 approx_centre  [x, y] when valid
//!
//! Everything is synchronous and single-threaded; one [`Pipeline`] owns its
//! cache and tile source for the duration of a call.

pub mod cache;
pub mod config;
pub mod coord;
pub mod decode;
pub mod enclosure;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod reconcile;
pub mod shape;
pub mod source;
pub mod store;

pub use cache::TileCache;
pub use config::{GridConfig, Settings, SourceConfig, DEFAULT_BUILDING_LAYER};
pub use coord::{CellPoint, CoordConverter, SurveyPoint, TilePosition, TILE_CELLS};
pub use decode::{decode_command, decode_feature, decode_param, parse_tile, Command};
pub use enclosure::{classify, edge_to_penalty_map, Enclosure, PenaltyMap};
pub use error::{DecodeError, Error, FetchError, Result, StoreError};
pub use metrics::PipelineMetrics;
pub use pipeline::Pipeline;
pub use reconcile::merge;
pub use shape::{BuildingShape, Edge, Tile};
#[cfg(feature = "http")]
pub use source::HttpTileSource;
pub use source::TileSource;
pub use store::{DiskStore, MemoryStore, TileStore};
