use crate::coord::TilePosition;
use std::io;
use std::path::PathBuf;

/// Why a single vector tile feature could not become a building shape.
///
/// Always local to one feature: the decoder logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown geometry command {0:#x}")]
    UnknownCommand(u32),
    #[error("geometry stream ends inside command parameters")]
    TruncatedParameters,
    #[error("feature has no osid tag")]
    MissingOsid,
    #[error("tag index {0} out of range for layer")]
    BadTagIndex(u32),
    #[error("feature geometry produced no edges")]
    EmptyGeometry,
    #[error("feature is not a polygon")]
    NotPolygon,
    #[error("ClosePath repeated {0} times")]
    BadClosePathCount(u32),
    #[error("geometry cursor overflowed")]
    CoordinateOverflow,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tile store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot open tile store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for tile {position} failed: {message}")]
    Transport { position: TilePosition, message: String },
    #[error("HTTP {status} for tile {position}")]
    Status { position: TilePosition, status: u16 },
    #[error("no tile data for {0}")]
    Unavailable(TilePosition),
}

/// Errors that abort an operation. Routine data problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed protobuf payload: {0}")]
    Wire(#[from] prost::DecodeError),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("cannot read settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
