//! Geobuf to GeoJSON decoder.
//!
//! A single pass over the wire data: header fields (key table, dimension,
//! precision) accumulate into the decoder state, then the first of the
//! feature-collection/feature/geometry fields is read recursively into a
//! fresh GeoJSON tree. Any decode error aborts the whole call; there are
//! no partial results.

use log::debug;

use crate::errors::{Error, Result};
use crate::pbf::PbfReader;
use crate::util::sort_keys_inplace;
use crate::{
    Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Position, Value,
    DEFAULT_PRECISION,
};

/// Rendering options for [`Decoder::decode_to_text`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TextOptions {
    /// Pretty-print with indentation.
    pub indent: bool,
    /// Emit object keys in lexicographic order instead of insertion order.
    pub sort_keys: bool,
}

/// Geobuf to GeoJSON decoder.
///
/// Holds the per-document header state (key table, dimension, precision
/// multiplier); every [`decode`](Decoder::decode) call starts fresh.
pub struct Decoder {
    keys: Vec<String>,
    dim: u32,
    e: f64,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            keys: Vec::new(),
            dim: 2,
            e: 10f64.powi(DEFAULT_PRECISION as i32),
        }
    }

    /// Decodes a Geobuf byte string into a GeoJSON document.
    pub fn decode(&mut self, data: &[u8]) -> Result<GeoJson> {
        self.keys.clear();
        self.dim = 2;
        self.e = 10f64.powi(DEFAULT_PRECISION as i32);

        let mut pbf = PbfReader::new(data);
        while pbf.next()? {
            match pbf.tag() {
                // the key's index is its position in the stream
                1 => self.keys.push(pbf.get_string()?),
                2 => {
                    let dim = pbf.get_uint32()?;
                    if dim != 2 && dim != 3 {
                        return Err(Error::InvalidDimensions(dim));
                    }
                    self.dim = dim;
                }
                3 => self.e = 10f64.powi(pbf.get_uint32()? as i32),
                4 => {
                    let mut sub = pbf.get_message()?;
                    return Ok(GeoJson::FeatureCollection(
                        self.read_feature_collection(&mut sub)?,
                    ));
                }
                5 => {
                    let mut sub = pbf.get_message()?;
                    return Ok(GeoJson::Feature(self.read_feature(&mut sub)?));
                }
                6 => {
                    let mut sub = pbf.get_message()?;
                    let geometry = self
                        .read_geometry(&mut sub)?
                        .ok_or(Error::MissingDataField)?;
                    return Ok(GeoJson::Geometry(geometry));
                }
                tag => {
                    debug!("skipping unknown top-level field {}", tag);
                    pbf.skip()?;
                }
            }
        }
        Err(Error::MissingDataField)
    }

    /// Decodes and renders the document as GeoJSON text.
    pub fn decode_to_text(&mut self, data: &[u8], options: &TextOptions) -> Result<String> {
        let geojson = self.decode(data)?;
        let mut json = geojson.to_json_value();
        if options.sort_keys {
            sort_keys_inplace(&mut json);
        }
        let text = if options.indent {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(text)
    }

    fn read_feature_collection(&self, pbf: &mut PbfReader) -> Result<FeatureCollection> {
        let mut fc = FeatureCollection::default();
        let mut values = Vec::new();
        while pbf.next()? {
            match pbf.tag() {
                1 => {
                    let mut sub = pbf.get_message()?;
                    fc.features.push(self.read_feature(&mut sub)?);
                }
                13 => {
                    let mut sub = pbf.get_message()?;
                    values.push(read_value(&mut sub)?);
                }
                15 => {
                    let members = fc.foreign_members.get_or_insert_with(JsonObject::new);
                    self.read_props(pbf, &mut values, members)?;
                }
                tag => {
                    debug!("skipping unknown feature collection field {}", tag);
                    pbf.skip()?;
                }
            }
        }
        Ok(fc)
    }

    fn read_feature(&self, pbf: &mut PbfReader) -> Result<Feature> {
        let mut feature = Feature::default();
        let mut values = Vec::new();
        while pbf.next()? {
            match pbf.tag() {
                1 => {
                    let mut sub = pbf.get_message()?;
                    feature.geometry = self.read_geometry(&mut sub)?;
                }
                11 => feature.id = Some(JsonValue::String(pbf.get_string()?)),
                12 => feature.id = Some(JsonValue::from(pbf.get_sint64()?)),
                13 => {
                    let mut sub = pbf.get_message()?;
                    values.push(read_value(&mut sub)?);
                }
                14 => {
                    let props = feature.properties.get_or_insert_with(JsonObject::new);
                    self.read_props(pbf, &mut values, props)?;
                }
                15 => {
                    let members = feature.foreign_members.get_or_insert_with(JsonObject::new);
                    self.read_props(pbf, &mut values, members)?;
                }
                tag => {
                    debug!("skipping unknown feature field {}", tag);
                    pbf.skip()?;
                }
            }
        }
        if feature.properties.is_none() {
            feature.properties = Some(JsonObject::new());
        }
        Ok(feature)
    }

    /// Reads one geometry submessage. The type enum must be the first
    /// field; a submessage without it is the empty geometry (`None`).
    fn read_geometry(&self, pbf: &mut PbfReader) -> Result<Option<Geometry>> {
        if !pbf.next()? {
            return Ok(None);
        }
        if pbf.tag() != 1 {
            return Ok(None);
        }
        let geometry_type = pbf.get_enum()?;
        if geometry_type > 6 {
            return Err(Error::UnknownGeometryCode(geometry_type));
        }

        let mut lengths: Vec<u32> = Vec::new();
        let mut value: Option<Value> = None;
        let mut geometries: Vec<Geometry> = Vec::new();
        let mut values = Vec::new();
        let mut foreign_members: Option<JsonObject> = None;

        while pbf.next()? {
            match pbf.tag() {
                2 => lengths = pbf.get_packed_uint32()?,
                3 => {
                    let coords = pbf.get_packed_sint64()?;
                    if geometry_type == 6 {
                        // collections carry no coordinates of their own
                        continue;
                    }
                    value = Some(match geometry_type {
                        0 => Value::Point(self.populate_point(&coords)?),
                        1 => Value::MultiPoint(self.populate_points(&coords)?),
                        2 => Value::LineString(self.populate_points(&coords)?),
                        3 => Value::MultiLineString(self.populate_multi_line(
                            &lengths, &coords, false,
                        )?),
                        4 => Value::Polygon(self.populate_multi_line(&lengths, &coords, true)?),
                        _ => Value::MultiPolygon(self.populate_multi_polygon(&lengths, &coords)?),
                    });
                }
                4 => {
                    let mut sub = pbf.get_message()?;
                    if let Some(child) = self.read_geometry(&mut sub)? {
                        geometries.push(child);
                    }
                }
                13 => {
                    let mut sub = pbf.get_message()?;
                    values.push(read_value(&mut sub)?);
                }
                15 => {
                    let members = foreign_members.get_or_insert_with(JsonObject::new);
                    self.read_props(pbf, &mut values, members)?;
                }
                tag => {
                    debug!("skipping unknown geometry field {}", tag);
                    pbf.skip()?;
                }
            }
        }

        let value = match geometry_type {
            6 => Value::GeometryCollection(geometries),
            _ => value.unwrap_or_else(|| empty_value(geometry_type)),
        };
        Ok(Some(Geometry {
            value,
            foreign_members,
        }))
    }

    /// Resolves one packed `[key_index, value_index, …]` field against the
    /// key table and the tag-13 values read since the previous index
    /// field, then clears those values for the next property map.
    fn read_props(
        &self,
        pbf: &mut PbfReader,
        values: &mut Vec<JsonValue>,
        target: &mut JsonObject,
    ) -> Result<()> {
        let indexes = pbf.get_packed_uint32()?;
        if indexes.len() % 2 != 0 {
            return Err(Error::UnpairedPropertyIndexes(indexes.len()));
        }
        for pair in indexes.chunks(2) {
            let key = self
                .keys
                .get(pair[0] as usize)
                .ok_or(Error::PropertyIndexOutOfRange {
                    index: pair[0],
                    len: self.keys.len(),
                })?;
            let value = values
                .get(pair[1] as usize)
                .ok_or(Error::PropertyIndexOutOfRange {
                    index: pair[1],
                    len: values.len(),
                })?;
            target.insert(key.clone(), value.clone());
        }
        values.clear();
        Ok(())
    }

    fn populate_point(&self, coords: &[i64]) -> Result<Position> {
        let dim = self.dim as usize;
        if coords.len() < dim {
            return Err(Error::MismatchedLengths);
        }
        Ok(coords[..dim].iter().map(|&c| c as f64 / self.e).collect())
    }

    fn populate_points(&self, coords: &[i64]) -> Result<Vec<Position>> {
        let mut sum = [0i64; 3];
        let mut cursor = 0;
        self.populate_line(
            coords,
            &mut cursor,
            coords.len() / self.dim as usize,
            false,
            &mut sum,
        )
    }

    fn populate_multi_line(
        &self,
        lengths: &[u32],
        coords: &[i64],
        closed: bool,
    ) -> Result<Vec<Vec<Position>>> {
        let mut sum = [0i64; 3];
        let mut cursor = 0;
        if lengths.is_empty() {
            let n_points = coords.len() / self.dim as usize;
            return Ok(vec![self.populate_line(
                coords,
                &mut cursor,
                n_points,
                closed,
                &mut sum,
            )?]);
        }
        lengths
            .iter()
            .map(|&len| self.populate_line(coords, &mut cursor, len as usize, closed, &mut sum))
            .collect()
    }

    fn populate_multi_polygon(
        &self,
        lengths: &[u32],
        coords: &[i64],
    ) -> Result<Vec<Vec<Vec<Position>>>> {
        let mut sum = [0i64; 3];
        let mut cursor = 0;
        if lengths.is_empty() {
            let n_points = coords.len() / self.dim as usize;
            let ring = self.populate_line(coords, &mut cursor, n_points, true, &mut sum)?;
            return Ok(vec![vec![ring]]);
        }

        // flattened descriptor: #polygons, then per polygon #rings and
        // per ring its point count (closing point elided)
        let mut descriptor = lengths.iter().copied();
        let n_polygons = descriptor.next().ok_or(Error::MismatchedLengths)?;
        let mut polygons = Vec::new();
        for _ in 0..n_polygons {
            let n_rings = descriptor.next().ok_or(Error::MismatchedLengths)?;
            let mut rings = Vec::new();
            for _ in 0..n_rings {
                let n_points = descriptor.next().ok_or(Error::MismatchedLengths)?;
                rings.push(self.populate_line(
                    coords,
                    &mut cursor,
                    n_points as usize,
                    true,
                    &mut sum,
                )?);
            }
            polygons.push(rings);
        }
        Ok(polygons)
    }

    /// Rebuilds `n_points` positions from the delta stream starting at
    /// `cursor`. The accumulator spans the whole stream, mirroring the
    /// encoder; closed rings get a copy of their first position appended.
    fn populate_line(
        &self,
        coords: &[i64],
        cursor: &mut usize,
        n_points: usize,
        closed: bool,
        sum: &mut [i64; 3],
    ) -> Result<Vec<Position>> {
        let dim = self.dim as usize;
        let end = n_points
            .checked_mul(dim)
            .and_then(|n| n.checked_add(*cursor))
            .ok_or(Error::MismatchedLengths)?;
        if end > coords.len() {
            return Err(Error::MismatchedLengths);
        }
        let mut line = Vec::with_capacity(n_points + closed as usize);
        for i in 0..n_points {
            let mut point = Vec::with_capacity(dim);
            for (j, acc) in sum.iter_mut().enumerate().take(dim) {
                *acc += coords[*cursor + i * dim + j];
                point.push(*acc as f64 / self.e);
            }
            line.push(point);
        }
        *cursor = end;
        if closed {
            if let Some(first) = line.first().cloned() {
                line.push(first);
            }
        }
        Ok(line)
    }
}

fn empty_value(geometry_type: u32) -> Value {
    match geometry_type {
        0 => Value::Point(Position::new()),
        1 => Value::MultiPoint(Vec::new()),
        2 => Value::LineString(Vec::new()),
        3 => Value::MultiLineString(Vec::new()),
        4 => Value::Polygon(Vec::new()),
        _ => Value::MultiPolygon(Vec::new()),
    }
}

/// Reads the one-of value submessage. An empty submessage is JSON null;
/// field 6 holds embedded JSON text and is re-parsed.
fn read_value(pbf: &mut PbfReader) -> Result<JsonValue> {
    if !pbf.next()? {
        return Ok(JsonValue::Null);
    }
    match pbf.tag() {
        1 => Ok(JsonValue::String(pbf.get_string()?)),
        2 => Ok(JsonValue::from(pbf.get_double()?)),
        3 => Ok(JsonValue::from(pbf.get_uint64()?)),
        4 => Ok(JsonValue::from((pbf.get_uint64()? as i64).wrapping_neg())),
        5 => Ok(JsonValue::Bool(pbf.get_bool()?)),
        6 => {
            let text = pbf.get_string()?;
            Ok(serde_json::from_str(&text)?)
        }
        tag => {
            debug!("skipping unknown value field {}", tag);
            pbf.skip()?;
            Ok(JsonValue::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbf::PbfWriter;
    use crate::{encode, Encoder};

    fn parse(json: &str) -> GeoJson {
        json.parse().unwrap()
    }

    fn roundtrip(json: &str) -> GeoJson {
        Decoder::new().decode(&encode(&parse(json))).unwrap()
    }

    #[test]
    fn point_decodes_to_quantized_coordinates() {
        let decoded = roundtrip(r#"{"type":"Point","coordinates":[119.88281249999999,30]}"#);
        match decoded {
            GeoJson::Geometry(g) => {
                assert_eq!(g.value, Value::Point(vec![119.882812, 30.0]));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn polygon_rings_are_reclosed_bit_identically() {
        let decoded = roundtrip(
            r#"{"type":"Polygon","coordinates":[
                [[0.5,0.5],[1.5,0.5],[1.5,1.5],[0.5,1.5],[0.5,0.5]],
                [[0.7,0.7],[0.9,0.7],[0.9,0.9],[0.7,0.9],[0.7,0.7]]
            ]}"#,
        );
        let rings = match decoded {
            GeoJson::Geometry(Geometry {
                value: Value::Polygon(rings),
                ..
            }) => rings,
            _ => unreachable!(),
        };
        assert_eq!(rings.len(), 2);
        for ring in &rings {
            assert_eq!(ring.len(), 5);
            assert_eq!(ring.first(), ring.last());
        }
    }

    #[test]
    fn negative_integer_id_round_trips_through_field_12() {
        let decoded = roundtrip(
            r#"{"type":"Feature","id":-7,"geometry":null,"properties":{}}"#,
        );
        match decoded {
            GeoJson::Feature(f) => assert_eq!(f.id, Some(serde_json::json!(-7))),
            _ => unreachable!(),
        }
    }

    #[test]
    fn string_id_round_trips_through_field_11() {
        let decoded = roundtrip(
            r#"{"type":"Feature","id":"abc","geometry":null,"properties":{}}"#,
        );
        match decoded {
            GeoJson::Feature(f) => assert_eq!(f.id, Some(serde_json::json!("abc"))),
            _ => unreachable!(),
        }
    }

    #[test]
    fn extreme_negative_property_value_survives() {
        let json = format!(
            r#"{{"type":"Feature","geometry":null,"properties":{{"v":{}}}}}"#,
            i64::MIN
        );
        let decoded = Decoder::new().decode(&encode(&parse(&json))).unwrap();
        match decoded {
            GeoJson::Feature(f) => {
                assert_eq!(f.property("v"), Some(&serde_json::json!(i64::MIN)));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn composite_property_values_are_reparsed() {
        let decoded = roundtrip(
            r#"{"type":"Feature","geometry":null,
                "properties":{"nested":{"a":[1,2,{"b":null}]}}}"#,
        );
        match decoded {
            GeoJson::Feature(f) => {
                assert_eq!(
                    f.property("nested"),
                    Some(&serde_json::json!({"a": [1, 2, {"b": null}]}))
                );
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn custom_properties_come_back_on_every_level() {
        let decoded = roundtrip(
            r#"{"type":"FeatureCollection","generator":"survey","features":[
                {"type":"Feature","source":"gps",
                 "geometry":{"type":"Point","coordinates":[1,2],"mark":3},
                 "properties":{}}
            ]}"#,
        );
        let fc = match decoded {
            GeoJson::FeatureCollection(fc) => fc,
            _ => unreachable!(),
        };
        assert_eq!(
            fc.foreign_members.as_ref().unwrap()["generator"],
            serde_json::json!("survey")
        );
        let feature = &fc.features[0];
        assert_eq!(
            feature.foreign_members.as_ref().unwrap()["source"],
            serde_json::json!("gps")
        );
        let geometry = feature.geometry.as_ref().unwrap();
        assert_eq!(
            geometry.foreign_members.as_ref().unwrap()["mark"],
            serde_json::json!(3)
        );
    }

    #[test]
    fn odd_property_index_array_is_a_structural_error() {
        let mut pbf = PbfWriter::new();
        pbf.add_string(1, "key");
        pbf.add_message(5, |feature| {
            feature.add_message(13, |value| value.add_string(1, "v"));
            feature.add_packed_uint32(14, &[0, 0, 1]);
        });
        let result = Decoder::new().decode(&pbf.into_bytes());
        assert!(matches!(result, Err(Error::UnpairedPropertyIndexes(3))));
    }

    #[test]
    fn out_of_range_property_index_is_a_structural_error() {
        let mut pbf = PbfWriter::new();
        pbf.add_message(5, |feature| {
            feature.add_message(13, |value| value.add_string(1, "v"));
            feature.add_packed_uint32(14, &[9, 0]);
        });
        let result = Decoder::new().decode(&pbf.into_bytes());
        assert!(matches!(
            result,
            Err(Error::PropertyIndexOutOfRange { index: 9, len: 0 })
        ));
    }

    #[test]
    fn unknown_fields_are_ignored_at_every_level() {
        let geojson = parse(r#"{"type":"Point","coordinates":[1.5,2.5]}"#);
        let plain = Decoder::new().decode(&encode(&geojson)).unwrap();

        // same document with unknown fields spliced in at the top level
        // and inside the geometry
        let mut pbf = PbfWriter::new();
        pbf.add_uint64(9, 42);
        pbf.add_message(6, |geom| {
            geom.add_enum(1, 0);
            geom.add_string(8, "future");
            geom.add_double(7, 1.25);
            geom.add_packed_sint64(3, &[1500000, 2500000]);
        });
        let patched = Decoder::new().decode(&pbf.into_bytes()).unwrap();
        assert_eq!(patched, plain);
    }

    #[test]
    fn truncated_data_is_an_error() {
        let data = encode(&parse(r#"{"type":"Point","coordinates":[1.5,2.5]}"#));
        let result = Decoder::new().decode(&data[..data.len() - 1]);
        assert!(matches!(result, Err(Error::UnexpectedEof)));
    }

    #[test]
    fn empty_input_has_no_data_field() {
        assert!(matches!(
            Decoder::new().decode(&[]),
            Err(Error::MissingDataField)
        ));
    }

    #[test]
    fn geometry_enum_out_of_range_is_an_error() {
        let mut pbf = PbfWriter::new();
        pbf.add_message(6, |geom| geom.add_enum(1, 7));
        assert!(matches!(
            Decoder::new().decode(&pbf.into_bytes()),
            Err(Error::UnknownGeometryCode(7))
        ));
    }

    #[test]
    fn bad_dimension_header_is_an_error() {
        let mut pbf = PbfWriter::new();
        pbf.add_uint32(2, 4);
        pbf.add_message(6, |geom| geom.add_enum(1, 0));
        assert!(matches!(
            Decoder::new().decode(&pbf.into_bytes()),
            Err(Error::InvalidDimensions(4))
        ));
    }

    #[test]
    fn lengths_exceeding_coordinates_are_an_error() {
        let mut pbf = PbfWriter::new();
        pbf.add_message(6, |geom| {
            geom.add_enum(1, 3);
            geom.add_packed_uint32(2, &[5]);
            geom.add_packed_sint64(3, &[0, 0]);
        });
        assert!(matches!(
            Decoder::new().decode(&pbf.into_bytes()),
            Err(Error::MismatchedLengths)
        ));
    }

    #[test]
    fn feature_without_properties_decodes_with_an_empty_map() {
        let mut pbf = PbfWriter::new();
        pbf.add_message(5, |feature| {
            feature.add_message(1, |geom| {
                geom.add_enum(1, 0);
                geom.add_packed_sint64(3, &[0, 0]);
            });
        });
        let decoded = Decoder::new().decode(&pbf.into_bytes()).unwrap();
        match decoded {
            GeoJson::Feature(f) => assert_eq!(f.properties, Some(JsonObject::new())),
            _ => unreachable!(),
        }
    }

    #[test]
    fn geometry_collection_nests() {
        let decoded = roundtrip(
            r#"{"type":"GeometryCollection","geometries":[
                {"type":"Point","coordinates":[0,1]},
                {"type":"GeometryCollection","geometries":[
                    {"type":"LineString","coordinates":[[-1,-1],[1,-1]]}
                ]}
            ]}"#,
        );
        let geometries = match decoded {
            GeoJson::Geometry(Geometry {
                value: Value::GeometryCollection(geometries),
                ..
            }) => geometries,
            _ => unreachable!(),
        };
        assert_eq!(geometries.len(), 2);
        match &geometries[1].value {
            Value::GeometryCollection(inner) => {
                assert_eq!(inner[0].value, Value::LineString(vec![
                    vec![-1.0, -1.0],
                    vec![1.0, -1.0],
                ]));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn lower_precision_header_is_honored() {
        let geojson = parse(r#"{"type":"Point","coordinates":[1.25,2.5]}"#);
        let data = Encoder::new(100).encode(&geojson);
        let decoded = Decoder::new().decode(&data).unwrap();
        match decoded {
            // 1.25 quantizes to 125 at precision 2
            GeoJson::Geometry(g) => assert_eq!(g.value, Value::Point(vec![1.25, 2.5])),
            _ => unreachable!(),
        }
    }

    #[test]
    fn sorted_text_output() {
        let bytes = Encoder::default()
            .encode_text(r#"{"type":"Feature","geometry":null,"properties":{"b":1,"a":2}}"#)
            .unwrap();
        let text = Decoder::new()
            .decode_to_text(
                &bytes,
                &TextOptions {
                    indent: false,
                    sort_keys: true,
                },
            )
            .unwrap();
        assert_eq!(
            text,
            r#"{"geometry":null,"properties":{"a":2,"b":1},"type":"Feature"}"#
        );
    }
}
