//! Vector tile geometry decoding into building footprints.
//!
//! A feature's geometry is a flat `u32` stream of command words, each
//! followed by `repeat * 2` zigzag-encoded parameters (MVT 2.1, 4.3):
//!
//! ```text
//!   word   = (repeat << 3) | command      command: 1 MoveTo, 2 LineTo, 7 ClosePath
//!   param  = (n << 1) ^ (n >> 31)         deltas relative to the running cursor
//! ```
//!
//! Only single-ring polygons are meaningful here. Each `LineTo` step becomes
//! one directed edge and `ClosePath` adds the edge back to the ring start.

use crate::coord::CellPoint;
use crate::error::{DecodeError, Result};
use crate::shape::{Bounds, BuildingShape, Edge, Tile};
use api::gen::vector_tile as mvt;
use tracing::{debug, warn};

/// Tag key carrying the stable building identifier.
pub const OSID_KEY: &str = "osid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveTo,
    LineTo,
    ClosePath,
}

/// Split a command word into its command and repeat count.
#[inline]
pub fn decode_command(word: u32) -> std::result::Result<(Command, u32), DecodeError> {
    let command = match word & 0x7 {
        1 => Command::MoveTo,
        2 => Command::LineTo,
        7 => Command::ClosePath,
        _ => return Err(DecodeError::UnknownCommand(word)),
    };
    Ok((command, word >> 3))
}

/// Zigzag decode of one geometry parameter.
#[inline]
pub fn decode_param(raw: u32) -> i32 {
    ((raw >> 1) as i32) ^ -((raw & 1) as i32)
}

#[inline(always)]
fn take_word(stream: &mut &[u32]) -> Option<u32> {
    let (&head, tail) = stream.split_first()?;
    *stream = tail;
    Some(head)
}

#[inline(always)]
fn take_delta(stream: &mut &[u32]) -> std::result::Result<(i32, i32), DecodeError> {
    if stream.len() < 2 {
        return Err(DecodeError::TruncatedParameters);
    }
    let (pair, tail) = stream.split_at(2);
    *stream = tail;
    Ok((decode_param(pair[0]), decode_param(pair[1])))
}

#[inline(always)]
fn advance(
    cursor: CellPoint,
    (dx, dy): (i32, i32),
) -> std::result::Result<CellPoint, DecodeError> {
    match (cursor.x.checked_add(dx), cursor.y.checked_add(dy)) {
        (Some(x), Some(y)) => Ok(CellPoint::new(x, y)),
        _ => Err(DecodeError::CoordinateOverflow),
    }
}

/// Render a tag value as text, whichever scalar variant it carries.
pub fn value_to_string(value: &mvt::Value) -> String {
    if let Some(s) = &value.string_value {
        s.clone()
    } else if let Some(v) = value.float_value {
        v.to_string()
    } else if let Some(v) = value.double_value {
        v.to_string()
    } else if let Some(v) = value.int_value {
        v.to_string()
    } else if let Some(v) = value.uint_value {
        v.to_string()
    } else if let Some(v) = value.sint_value {
        v.to_string()
    } else {
        value.bool_value.unwrap_or_default().to_string()
    }
}

/// Look up the `osid` tag of a feature.
fn feature_osid(
    feature: &mvt::Feature,
    layer: &mvt::Layer,
) -> std::result::Result<String, DecodeError> {
    for pair in feature.tags.chunks_exact(2) {
        let (key_idx, value_idx) = (pair[0], pair[1]);
        let key = layer
            .keys
            .get(key_idx as usize)
            .ok_or(DecodeError::BadTagIndex(key_idx))?;
        if key != OSID_KEY {
            continue;
        }
        let value = layer
            .values
            .get(value_idx as usize)
            .ok_or(DecodeError::BadTagIndex(value_idx))?;
        return Ok(value_to_string(value));
    }
    Err(DecodeError::MissingOsid)
}

/// Decode one feature as a single polygon ring.
///
/// Any error discards the whole feature; callers skip it.
pub fn decode_feature(
    feature: &mvt::Feature,
    layer: &mvt::Layer,
) -> std::result::Result<BuildingShape, DecodeError> {
    if feature.r#type.is_some() && feature.r#type() != mvt::GeomType::Polygon {
        return Err(DecodeError::NotPolygon);
    }
    let id = feature_osid(feature, layer)?;

    let mut stream = feature.geometry.as_slice();
    let mut cursor = CellPoint::default();
    let mut ring_start: Option<CellPoint> = None;
    let mut edges = Vec::new();
    let mut bounds = Bounds::empty();

    while let Some(word) = take_word(&mut stream) {
        let (command, repeat) = decode_command(word)?;
        if command == Command::ClosePath && repeat != 1 {
            return Err(DecodeError::BadClosePathCount(repeat));
        }

        for _ in 0..repeat {
            match command {
                Command::MoveTo => {
                    cursor = advance(cursor, take_delta(&mut stream)?)?;
                    ring_start = None;
                }
                Command::LineTo => {
                    if ring_start.is_none() {
                        ring_start = Some(cursor);
                        bounds.include(cursor);
                    }
                    let from = cursor;
                    cursor = advance(cursor, take_delta(&mut stream)?)?;
                    edges.push(Edge::new(from, cursor));
                    bounds.include(cursor);
                }
                Command::ClosePath => {
                    if let Some(start) = ring_start {
                        edges.push(Edge::new(cursor, start));
                    }
                }
            }
        }
    }

    if edges.is_empty() {
        return Err(DecodeError::EmptyGeometry);
    }

    Ok(BuildingShape {
        id,
        edges,
        approx_centre: bounds.centre(),
    })
}

/// Decode every building in a raw vector tile, keeping feature order.
///
/// A tile without the building layer decodes to an empty tile. Only a
/// payload that is not a vector tile at all is an error.
pub fn parse_tile(raw: &[u8], layer_name: &str) -> Result<Tile> {
    let full: mvt::Tile = prost::Message::decode(raw)?;

    let Some(layer) = full.layers.iter().find(|l| l.name == layer_name) else {
        debug!(layer = layer_name, "Tile has no building layer");
        return Ok(Tile::default());
    };

    let shapes = layer
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| match decode_feature(feature, layer) {
            Ok(shape) => Some(shape),
            Err(e) => {
                warn!(index, error = %e, "Dropping undecodable feature");
                None
            }
        })
        .collect();

    Ok(Tile::new(shapes))
}
