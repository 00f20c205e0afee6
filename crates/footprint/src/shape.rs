//! Building footprints as directed edge lists, and their stored form.

use crate::coord::CellPoint;
use api::gen::footprint::v1 as pb;
use std::fmt;

/// One directed segment of a footprint boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: CellPoint,
    pub to: CellPoint,
}

impl Edge {
    #[inline]
    pub const fn new(from: CellPoint, to: CellPoint) -> Self {
        Self { from, to }
    }

    #[inline]
    pub fn is_vertical(&self) -> bool {
        self.from.x == self.to.x
    }

    #[inline]
    pub fn min_x(&self) -> i32 {
        self.from.x.min(self.to.x)
    }

    #[inline]
    pub fn max_x(&self) -> i32 {
        self.from.x.max(self.to.x)
    }

    #[inline]
    pub fn min_y(&self) -> i32 {
        self.from.y.min(self.to.y)
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.from.y.max(self.to.y)
    }

    /// The edge's y at `x`, truncated toward zero. Undefined for vertical
    /// edges; callers handle those separately.
    ///
    /// Differences are taken in `f64`, since a ring's closing edge may span
    /// more than `i32` allows.
    #[inline]
    pub fn y_at(&self, x: i32) -> i32 {
        let (x1, y1) = (self.from.x as f64, self.from.y as f64);
        let (x2, y2) = (self.to.x as f64, self.to.y as f64);
        let gradient = (y2 - y1) / (x2 - x1);
        ((x as f64 - x1) * gradient + y1) as i32
    }

    /// Integer midpoint: truncating average of the x endpoints, then the
    /// edge's own y at that x (plain y average for vertical edges).
    pub fn midpoint(&self) -> CellPoint {
        let mid_x = average(self.from.x, self.to.x);
        let mid_y = if self.is_vertical() {
            average(self.from.y, self.to.y)
        } else {
            self.y_at(mid_x)
        };
        CellPoint::new(mid_x, mid_y)
    }

    /// Same segment regardless of direction.
    #[inline]
    pub fn undirected(&self) -> (CellPoint, CellPoint) {
        if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }

    /// Copy shifted by `(dx, dy)`, or `None` if it leaves `i32` range.
    #[inline]
    pub fn translated(&self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(
            shift(self.from, dx, dy)?,
            shift(self.to, dx, dy)?,
        ))
    }
}

/// Truncating average, without intermediate overflow.
#[inline]
fn average(a: i32, b: i32) -> i32 {
    ((a as i64 + b as i64) / 2) as i32
}

#[inline]
fn shift(p: CellPoint, dx: i32, dy: i32) -> Option<CellPoint> {
    Some(CellPoint::new(p.x.checked_add(dx)?, p.y.checked_add(dy)?))
}

/// Running axis-aligned bounds over cell points.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    min: CellPoint,
    max: CellPoint,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min: CellPoint::new(i32::MAX, i32::MAX),
            max: CellPoint::new(i32::MIN, i32::MIN),
        }
    }

    #[inline]
    pub fn include(&mut self, p: CellPoint) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Midpoint of the box, or `None` if nothing was included.
    pub fn centre(&self) -> Option<CellPoint> {
        if self.is_empty() {
            return None;
        }
        Some(CellPoint::new(
            average(self.min.x, self.max.x),
            average(self.min.y, self.max.y),
        ))
    }
}

/// A building footprint.
///
/// `approx_centre` is the bounding-box midpoint, not a centroid. A shape
/// without it is invalid and takes no part in enclosure tests or storage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildingShape {
    pub id: String,
    pub edges: Vec<Edge>,
    pub approx_centre: Option<CellPoint>,
}

impl BuildingShape {
    pub fn new(id: impl Into<String>, edges: Vec<Edge>) -> Self {
        let mut shape = Self {
            id: id.into(),
            edges,
            approx_centre: None,
        };
        shape.approx_centre = shape.edge_bounds().centre();
        shape
    }

    /// Build a closed ring from its vertices, in order.
    pub fn from_ring(id: impl Into<String>, vertices: &[CellPoint]) -> Self {
        let edges = vertices
            .iter()
            .zip(vertices.iter().cycle().skip(1))
            .map(|(&from, &to)| Edge::new(from, to))
            .collect();
        Self::new(id, edges)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.approx_centre.is_some()
    }

    pub fn edge_bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        for edge in &self.edges {
            bounds.include(edge.from);
            bounds.include(edge.to);
        }
        bounds
    }

    /// Copy shifted by `(dx, dy)` cells, or `None` if any point would leave
    /// `i32` range.
    pub fn translated(&self, dx: i32, dy: i32) -> Option<Self> {
        let edges = self
            .edges
            .iter()
            .map(|e| e.translated(dx, dy))
            .collect::<Option<Vec<_>>>()?;
        let approx_centre = match self.approx_centre {
            Some(c) => Some(shift(c, dx, dy)?),
            None => None,
        };
        Some(Self {
            id: self.id.clone(),
            edges,
            approx_centre,
        })
    }

    pub fn to_wire(&self) -> pb::BuildingShape {
        let mut edges = Vec::with_capacity(self.edges.len() * 4);
        for edge in &self.edges {
            edges.extend_from_slice(&[edge.from.x, edge.from.y, edge.to.x, edge.to.y]);
        }
        pb::BuildingShape {
            osid: self.id.clone(),
            edges,
            approx_centre: self
                .approx_centre
                .map(|c| vec![c.x, c.y])
                .unwrap_or_default(),
        }
    }

    pub fn from_wire(wire: &pb::BuildingShape) -> Self {
        let edges = wire
            .edges
            .chunks_exact(4)
            .map(|c| Edge::new(CellPoint::new(c[0], c[1]), CellPoint::new(c[2], c[3])))
            .collect();
        let approx_centre = match wire.approx_centre.as_slice() {
            &[x, y] => Some(CellPoint::new(x, y)),
            _ => None,
        };
        Self {
            id: wire.osid.clone(),
            edges,
            approx_centre,
        }
    }
}

impl fmt::Display for BuildingShape {
    /// Edge listing, `(x1,y1) -> (x2,y2), ...`; empty for invalid shapes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return Ok(());
        }
        for (i, edge) in self.edges.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} -> {}", edge.from, edge.to)?;
        }
        Ok(())
    }
}

/// All building shapes decoded from one tile position, in feature order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tile {
    pub shapes: Vec<BuildingShape>,
}

impl Tile {
    pub fn new(shapes: Vec<BuildingShape>) -> Self {
        Self { shapes }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Stored form. Invalid shapes are left out.
    pub fn to_wire(&self) -> pb::BuildingTile {
        pb::BuildingTile {
            shapes: self
                .shapes
                .iter()
                .filter(|s| s.is_valid())
                .map(BuildingShape::to_wire)
                .collect(),
        }
    }

    pub fn from_wire(wire: &pb::BuildingTile) -> Self {
        Self {
            shapes: wire.shapes.iter().map(BuildingShape::from_wire).collect(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        prost::Message::encode_to_vec(&self.to_wire())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let wire: pb::BuildingTile = prost::Message::decode(bytes)?;
        Ok(Self::from_wire(&wire))
    }
}
