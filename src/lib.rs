// Copyright 2015 The GeoRust Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//!
//! # Introduction
//!
//! This crate helps you read and write [Geobuf](https://github.com/mapbox/geobuf) —
//! a compact binary encoding of [GeoJSON](https://geojson.org) built on the
//! protocol-buffer wire format. A Geobuf byte string is structurally
//! equivalent to its GeoJSON source and losslessly recoverable up to a
//! configurable coordinate precision.
//!
//! # Types and crate structure
//!
//! The GeoJSON side of the codec follows the GeoJSON spec
//! ([IETF RFC 7946](https://tools.ietf.org/html/rfc7946)): a document is
//! one of [`Geometry`], [`Feature`], or [`FeatureCollection`], together the
//! [`GeoJson`] enum. Non-standard members of any of the three are kept in
//! `foreign_members` and round-trip through the binary form as custom
//! properties.
//!
//! The binary side is driven by [`Encoder`] and [`Decoder`]. The encoder
//! analyzes the document (property keys, dimensionality), then writes a
//! header followed by delta-compressed, quantized coordinates and interned
//! property tables. The decoder reverses the process; precision and
//! dimensionality are read from the stream.
//!
//! # Examples
//!
//! ## Encoding and decoding
//!
//! ```
//! use geobuf::{Decoder, Encoder, GeoJson};
//!
//! let geojson: GeoJson = r#"
//! {
//!   "type": "Feature",
//!   "properties": { "food": "donuts" },
//!   "geometry": {
//!     "type": "Point",
//!     "coordinates": [ -118.2836, 34.0956 ]
//!   }
//! }
//! "#
//! .parse()
//! .unwrap();
//!
//! let bytes = Encoder::default().encode(&geojson);
//! let decoded = Decoder::new().decode(&bytes).unwrap();
//!
//! match decoded {
//!     GeoJson::Feature(feature) => {
//!         assert_eq!("donuts", feature.property("food").unwrap());
//!     }
//!     _ => unreachable!("should be a feature"),
//! }
//! ```
//!
//! ## Working with text
//!
//! ```
//! use geobuf::{Decoder, Encoder, TextOptions};
//!
//! let bytes = Encoder::default()
//!     .encode_text(r#"{"type": "Point", "coordinates": [102.0, 0.5]}"#)
//!     .unwrap();
//!
//! let text = Decoder::new()
//!     .decode_to_text(&bytes, &TextOptions::default())
//!     .unwrap();
//! assert_eq!(text, r#"{"type":"Point","coordinates":[102.0,0.5]}"#);
//! ```
//!
//! Byte strings can be inspected without interpreting them as GeoJSON:
//!
//! ```
//! use geobuf::{encode, to_printable, GeoJson};
//!
//! let geojson: GeoJson = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#.parse().unwrap();
//! let dump = to_printable(&encode(&geojson), "  ");
//! assert!(dump.contains("[varint]"));
//! ```

/// Positions
///
/// [GeoJSON Format Specification § 3.1.1](https://tools.ietf.org/html/rfc7946#section-3.1.1)
pub type Position = Vec<f64>;

pub type PointType = Position;
pub type LineStringType = Vec<Position>;
pub type PolygonType = Vec<Vec<Position>>;

mod util;

mod geojson;
pub use crate::geojson::GeoJson;

mod geometry;
pub use crate::geometry::{Geometry, Value};

mod feature;
pub use crate::feature::Feature;

mod feature_collection;
pub use crate::feature_collection::FeatureCollection;

pub mod errors;
pub use crate::errors::{Error, Result};

mod pbf;

mod encode;
pub use crate::encode::{Encoder, DEFAULT_PRECISION, MAX_PRECISION};

mod decode;
pub use crate::decode::{Decoder, TextOptions};

mod printable;
pub use crate::printable::to_printable;

pub type JsonValue = serde_json::Value;
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Encodes a GeoJSON document with the default precision.
pub fn encode(geojson: &GeoJson) -> Vec<u8> {
    Encoder::default().encode(geojson)
}

/// Decodes a Geobuf byte string into a GeoJSON document.
pub fn decode(data: &[u8]) -> Result<GeoJson> {
    Decoder::new().decode(data)
}
