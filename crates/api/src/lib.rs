//! Protobuf wire schema shared by the footprint crates.
//!
//! Two message families live here:
//!
//! - [`gen::vector_tile`]: the Mapbox Vector Tile 2.1 schema, as served by
//!   the tile provider. Only the parts the building decoder reads are
//!   modelled, but every field keeps its upstream tag so foreign tiles
//!   decode without loss of the fields we care about.
//! - [`gen::footprint::v1`]: the compact building tile written to the
//!   persistent tile store (`osid`, flat edge list, approximate centre).
//!
//! The messages are declared with `prost` derives directly, so building
//! the workspace does not need `protoc`.

pub use bytes::Bytes;
pub use prost::Message;

pub mod gen {
    pub mod vector_tile {
        /// Geometry type of a feature (MVT 2.1 section 4.3.4).
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum GeomType {
            Unknown = 0,
            Point = 1,
            Linestring = 2,
            Polygon = 3,
        }

        /// A tagged scalar; exactly one field is expected to be set.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Value {
            #[prost(string, optional, tag = "1")]
            pub string_value: Option<String>,
            #[prost(float, optional, tag = "2")]
            pub float_value: Option<f32>,
            #[prost(double, optional, tag = "3")]
            pub double_value: Option<f64>,
            #[prost(int64, optional, tag = "4")]
            pub int_value: Option<i64>,
            #[prost(uint64, optional, tag = "5")]
            pub uint_value: Option<u64>,
            #[prost(sint64, optional, tag = "6")]
            pub sint_value: Option<i64>,
            #[prost(bool, optional, tag = "7")]
            pub bool_value: Option<bool>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Feature {
            #[prost(uint64, optional, tag = "1")]
            pub id: Option<u64>,
            /// Alternating indices into the layer's `keys` and `values`.
            #[prost(uint32, repeated, tag = "2")]
            pub tags: Vec<u32>,
            #[prost(enumeration = "GeomType", optional, tag = "3")]
            pub r#type: Option<i32>,
            /// Command/parameter integer stream.
            #[prost(uint32, repeated, tag = "4")]
            pub geometry: Vec<u32>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Layer {
            #[prost(uint32, optional, tag = "15")]
            pub version: Option<u32>,
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(message, repeated, tag = "2")]
            pub features: Vec<Feature>,
            #[prost(string, repeated, tag = "3")]
            pub keys: Vec<String>,
            #[prost(message, repeated, tag = "4")]
            pub values: Vec<Value>,
            #[prost(uint32, optional, tag = "5")]
            pub extent: Option<u32>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Tile {
            #[prost(message, repeated, tag = "3")]
            pub layers: Vec<Layer>,
        }
    }

    pub mod footprint {
        pub mod v1 {
            /// One building footprint, coordinates in tile-local cell space.
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct BuildingShape {
                #[prost(string, tag = "1")]
                pub osid: String,
                /// Groups of four: `x1, y1, x2, y2` per directed segment.
                #[prost(int32, repeated, tag = "2")]
                pub edges: Vec<i32>,
                /// `[x, y]` when the shape is valid.
                #[prost(int32, repeated, tag = "3")]
                pub approx_centre: Vec<i32>,
            }

            impl BuildingShape {
                #[inline]
                pub fn is_valid(&self) -> bool {
                    self.approx_centre.len() == 2 && self.edges.len() % 4 == 0
                }
            }

            /// The blob stored per tile position.
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct BuildingTile {
                #[prost(message, repeated, tag = "1")]
                pub shapes: Vec<BuildingShape>,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::gen::footprint::v1::{BuildingShape, BuildingTile};
    use super::gen::vector_tile::{Feature, GeomType, Layer, Tile};
    use super::Message;

    #[test]
    fn test_building_tile_survives_encoding() {
        let tile = BuildingTile {
            shapes: vec![BuildingShape {
                osid: "abc".into(),
                edges: vec![0, 0, 0, -2, 0, -2, 3, -2],
                approx_centre: vec![1, -1],
            }],
        };

        let decoded = BuildingTile::decode(tile.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, tile);
        assert!(decoded.shapes[0].is_valid());
    }

    #[test]
    fn test_shape_without_centre_is_invalid() {
        let shape = BuildingShape {
            osid: "abc".into(),
            edges: vec![0, 0, 1, 1],
            approx_centre: vec![],
        };
        assert!(!shape.is_valid());
    }

    #[test]
    fn test_feature_type_accessor() {
        let tile = Tile {
            layers: vec![Layer {
                name: "bld".into(),
                features: vec![Feature {
                    r#type: Some(GeomType::Polygon as i32),
                    geometry: vec![9, 0, 0],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };

        let decoded = Tile::decode(tile.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.layers[0].features[0].r#type(), GeomType::Polygon);
        assert_eq!(decoded.layers[0].features[0].geometry, vec![9, 0, 0]);
    }
}
