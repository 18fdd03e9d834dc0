//! GeoJSON to Geobuf encoder.
//!
//! Encoding is two passes over the document tree. The analyze pass interns
//! every property key in first-seen order and decides whether the document
//! is 2-D or 3-D. The write pass then emits the header (key table,
//! dimension, precision) followed by exactly one feature collection,
//! feature, or geometry submessage, with coordinates quantized by the
//! precision multiplier and delta-compressed per axis.

use indexmap::IndexSet;

use crate::errors::Result;
use crate::pbf::PbfWriter;
use crate::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Position, Value};

/// The largest supported precision multiplier: six decimal digits.
pub const MAX_PRECISION: u32 = 1_000_000;

/// Precision assumed by the wire format when the header omits field 3.
pub const DEFAULT_PRECISION: u32 = 6;

/// GeoJSON to Geobuf encoder.
///
/// Holds per-document scratch state (the key table and the detected
/// dimension); every [`encode`](Encoder::encode) call starts fresh. One
/// encoder must not be shared across threads mid-call; callers that
/// encode in parallel create one encoder per task.
pub struct Encoder {
    keys: IndexSet<String>,
    dim: u32,
    e: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(MAX_PRECISION)
    }
}

impl Encoder {
    /// Creates an encoder quantizing coordinates by `max_precision`,
    /// a power of ten no greater than [`MAX_PRECISION`].
    pub fn new(max_precision: u32) -> Self {
        debug_assert!(max_precision >= 1 && max_precision <= MAX_PRECISION);
        debug_assert!(MAX_PRECISION % max_precision == 0);
        Encoder {
            keys: IndexSet::new(),
            dim: 2,
            e: max_precision,
        }
    }

    /// Encodes a GeoJSON document into a Geobuf byte string.
    pub fn encode(&mut self, geojson: &GeoJson) -> Vec<u8> {
        self.keys.clear();
        self.dim = 2;
        self.analyze(geojson);

        let mut pbf = PbfWriter::new();
        for key in &self.keys {
            pbf.add_string(1, key);
        }
        if self.dim != 2 {
            pbf.add_uint32(2, self.dim);
        }
        let precision = self.e.ilog10();
        if precision != DEFAULT_PRECISION {
            pbf.add_uint32(3, precision);
        }

        match geojson {
            GeoJson::FeatureCollection(fc) => {
                pbf.add_message(4, |w| self.write_feature_collection(fc, w));
            }
            GeoJson::Feature(feature) => {
                pbf.add_message(5, |w| self.write_feature(feature, w));
            }
            GeoJson::Geometry(geometry) => {
                pbf.add_message(6, |w| self.write_geometry(geometry, w));
            }
        }
        pbf.into_bytes()
    }

    /// Parses GeoJSON text and encodes it.
    pub fn encode_text(&mut self, geojson: &str) -> Result<Vec<u8>> {
        Ok(self.encode(&geojson.parse()?))
    }

    fn analyze(&mut self, geojson: &GeoJson) {
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in &fc.features {
                    self.analyze_feature(feature);
                }
                self.save_keys(&fc.foreign_members);
            }
            GeoJson::Feature(feature) => self.analyze_feature(feature),
            GeoJson::Geometry(geometry) => self.analyze_geometry(geometry),
        }
    }

    fn analyze_feature(&mut self, feature: &Feature) {
        self.save_keys(&feature.properties);
        self.save_keys(&feature.foreign_members);
        if let Some(geometry) = &feature.geometry {
            self.analyze_geometry(geometry);
        }
    }

    fn analyze_geometry(&mut self, geometry: &Geometry) {
        match &geometry.value {
            Value::Point(point) => self.analyze_point(point),
            Value::MultiPoint(points) | Value::LineString(points) => self.analyze_points(points),
            Value::MultiLineString(lines) | Value::Polygon(lines) => self.analyze_multi_line(lines),
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.analyze_multi_line(rings);
                }
            }
            Value::GeometryCollection(geometries) => {
                for geometry in geometries {
                    self.analyze_geometry(geometry);
                }
            }
        }
        self.save_keys(&geometry.foreign_members);
    }

    fn analyze_multi_line(&mut self, lines: &[Vec<Position>]) {
        for line in lines {
            self.analyze_points(line);
        }
    }

    fn analyze_points(&mut self, points: &[Position]) {
        for point in points {
            self.analyze_point(point);
        }
    }

    fn analyze_point(&mut self, point: &Position) {
        if point.len() > 2 && point[2] != 0.0 {
            self.dim = 3;
        }
    }

    fn save_keys(&mut self, props: &Option<JsonObject>) {
        if let Some(props) = props {
            for key in props.keys() {
                self.save_key(key);
            }
        }
    }

    fn save_key(&mut self, key: &str) {
        if !self.keys.contains(key) {
            self.keys.insert(key.to_owned());
        }
    }

    fn write_feature_collection(&self, fc: &FeatureCollection, pbf: &mut PbfWriter) {
        for feature in &fc.features {
            pbf.add_message(1, |w| self.write_feature(feature, w));
        }
        if let Some(members) = &fc.foreign_members {
            self.write_props(members, 15, pbf);
        }
    }

    fn write_feature(&self, feature: &Feature, pbf: &mut PbfWriter) {
        if let Some(geometry) = &feature.geometry {
            pbf.add_message(1, |w| self.write_geometry(geometry, w));
        }
        match &feature.id {
            None => {}
            Some(JsonValue::String(id)) => pbf.add_string(11, id),
            Some(JsonValue::Number(id)) if id.as_i64().is_some() => {
                pbf.add_sint64(12, id.as_i64().unwrap());
            }
            // doubles, oversize unsigned integers and composites all
            // travel as JSON text
            Some(id) => pbf.add_string(11, &serde_json::to_string(id).unwrap()),
        }
        if let Some(props) = &feature.properties {
            self.write_props(props, 14, pbf);
        }
        if let Some(members) = &feature.foreign_members {
            self.write_props(members, 15, pbf);
        }
    }

    fn write_geometry(&self, geometry: &Geometry, pbf: &mut PbfWriter) {
        match &geometry.value {
            Value::Point(point) => {
                pbf.add_enum(1, 0);
                self.write_point(point, pbf);
            }
            Value::MultiPoint(points) => {
                pbf.add_enum(1, 1);
                self.write_line(points, pbf);
            }
            Value::LineString(points) => {
                pbf.add_enum(1, 2);
                self.write_line(points, pbf);
            }
            Value::MultiLineString(lines) => {
                pbf.add_enum(1, 3);
                self.write_multi_line(lines, pbf, false);
            }
            Value::Polygon(rings) => {
                pbf.add_enum(1, 4);
                self.write_multi_line(rings, pbf, true);
            }
            Value::MultiPolygon(polygons) => {
                pbf.add_enum(1, 5);
                self.write_multi_polygon(polygons, pbf);
            }
            Value::GeometryCollection(geometries) => {
                pbf.add_enum(1, 6);
                for geometry in geometries {
                    pbf.add_message(4, |w| self.write_geometry(geometry, w));
                }
            }
        }
        if let Some(members) = &geometry.foreign_members {
            self.write_props(members, 15, pbf);
        }
    }

    /// Writes one property map: a tag-13 value submessage per entry,
    /// then the packed `[key_index, value_index, …]` pairs at `tag`.
    /// Value indices restart at zero for every map.
    fn write_props(&self, props: &JsonObject, tag: u32, pbf: &mut PbfWriter) {
        let mut indexes = Vec::with_capacity(props.len() * 2);
        let mut value_index = 0;
        for (key, value) in props {
            pbf.add_message(13, |w| write_value(value, w));
            let key_index = self.keys.get_index_of(key.as_str()).unwrap();
            indexes.push(key_index as u32);
            indexes.push(value_index);
            value_index += 1;
        }
        pbf.add_packed_uint32(tag, &indexes);
    }

    fn write_point(&self, point: &Position, pbf: &mut PbfWriter) {
        let mut coords = Vec::with_capacity(self.dim as usize);
        for j in 0..self.dim as usize {
            coords.push(self.quantize(axis(point, j)));
        }
        pbf.add_packed_sint64(3, &coords);
    }

    fn write_line(&self, line: &[Position], pbf: &mut PbfWriter) {
        let mut coords = Vec::new();
        let mut sum = [0i64; 3];
        self.populate_line(&mut coords, line, false, &mut sum);
        pbf.add_packed_sint64(3, &coords);
    }

    fn write_multi_line(&self, lines: &[Vec<Position>], pbf: &mut PbfWriter, closed: bool) {
        if lines.len() != 1 {
            let lengths: Vec<u32> = lines
                .iter()
                .map(|line| line.len().saturating_sub(closed as usize) as u32)
                .collect();
            pbf.add_packed_uint32(2, &lengths);
        }
        let mut coords = Vec::new();
        let mut sum = [0i64; 3];
        for line in lines {
            self.populate_line(&mut coords, line, closed, &mut sum);
        }
        pbf.add_packed_sint64(3, &coords);
    }

    fn write_multi_polygon(&self, polygons: &[Vec<Vec<Position>>], pbf: &mut PbfWriter) {
        if polygons.len() != 1 || polygons[0].len() != 1 {
            let mut lengths = vec![polygons.len() as u32];
            for rings in polygons {
                lengths.push(rings.len() as u32);
                for ring in rings {
                    lengths.push(ring.len().saturating_sub(1) as u32);
                }
            }
            pbf.add_packed_uint32(2, &lengths);
        }
        let mut coords = Vec::new();
        let mut sum = [0i64; 3];
        for rings in polygons {
            for ring in rings {
                self.populate_line(&mut coords, ring, true, &mut sum);
            }
        }
        pbf.add_packed_sint64(3, &coords);
    }

    /// Appends a run of per-axis deltas for `line`. The accumulator is
    /// owned by the caller and spans the geometry's whole coordinate
    /// stream: deltas do not restart between rings of a polygon or
    /// polygons of a multipolygon. Closed rings elide their final
    /// (duplicate) position.
    fn populate_line(
        &self,
        coords: &mut Vec<i64>,
        line: &[Position],
        closed: bool,
        sum: &mut [i64; 3],
    ) {
        let len = line.len().saturating_sub(closed as usize);
        coords.reserve(len * self.dim as usize);
        for point in &line[..len] {
            for (j, acc) in sum.iter_mut().enumerate().take(self.dim as usize) {
                let delta = self.quantize(axis(point, j)) - *acc;
                coords.push(delta);
                *acc += delta;
            }
        }
    }

    fn quantize(&self, coord: f64) -> i64 {
        (coord * f64::from(self.e)).round() as i64
    }
}

fn axis(point: &Position, j: usize) -> f64 {
    point.get(j).copied().unwrap_or(0.0)
}

/// Writes the one-of value submessage. Null writes nothing (an empty
/// submessage); composites are embedded as compact JSON text.
fn write_value(value: &JsonValue, pbf: &mut PbfWriter) {
    match value {
        JsonValue::Null => {}
        JsonValue::String(v) => pbf.add_string(1, v),
        JsonValue::Number(n) => {
            if let Some(v) = n.as_u64() {
                pbf.add_uint64(3, v);
            } else if let Some(v) = n.as_i64() {
                pbf.add_uint64(4, v.unsigned_abs());
            } else {
                pbf.add_double(2, n.as_f64().unwrap());
            }
        }
        JsonValue::Bool(v) => pbf.add_bool(5, *v),
        composite => pbf.add_string(6, &serde_json::to_string(composite).unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbf::PbfReader;

    fn parse(json: &str) -> GeoJson {
        json.parse().unwrap()
    }

    /// Splits a top-level document into (header fields, data tag, data bytes).
    fn split_document(data: &[u8]) -> (Vec<String>, Option<u32>, Option<u32>, u32, Vec<u8>) {
        let mut pbf = PbfReader::new(data);
        let mut keys = Vec::new();
        let mut dim = None;
        let mut precision = None;
        while pbf.next().unwrap() {
            match pbf.tag() {
                1 => keys.push(pbf.get_string().unwrap()),
                2 => dim = Some(pbf.get_uint32().unwrap()),
                3 => precision = Some(pbf.get_uint32().unwrap()),
                tag @ (4 | 5 | 6) => {
                    return (keys, dim, precision, tag, pbf.get_bytes().unwrap().to_vec());
                }
                _ => unreachable!("unexpected top-level field"),
            }
        }
        unreachable!("document has no data field");
    }

    fn geometry_coords(data: &[u8]) -> Vec<i64> {
        let mut pbf = PbfReader::new(data);
        while pbf.next().unwrap() {
            if pbf.tag() == 3 {
                return pbf.get_packed_sint64().unwrap();
            }
            pbf.skip().unwrap();
        }
        Vec::new()
    }

    fn geometry_lengths(data: &[u8]) -> Option<Vec<u32>> {
        let mut pbf = PbfReader::new(data);
        while pbf.next().unwrap() {
            if pbf.tag() == 2 {
                return Some(pbf.get_packed_uint32().unwrap());
            }
            pbf.skip().unwrap();
        }
        None
    }

    #[test]
    fn point_quantizes_at_default_precision() {
        let geojson = parse(r#"{"type":"Point","coordinates":[119.88281249999999,30]}"#);
        let data = Encoder::default().encode(&geojson);

        let (keys, dim, precision, tag, body) = split_document(&data);
        assert!(keys.is_empty());
        assert_eq!(dim, None);
        assert_eq!(precision, None);
        assert_eq!(tag, 6);
        assert_eq!(geometry_coords(&body), vec![119882812, 30000000]);
    }

    #[test]
    fn single_ring_polygon_elides_lengths_and_closing_point() {
        let geojson = parse(
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#,
        );
        let data = Encoder::default().encode(&geojson);

        let (_, _, _, tag, body) = split_document(&data);
        assert_eq!(tag, 6);
        assert_eq!(geometry_lengths(&body), None);
        assert_eq!(
            geometry_coords(&body),
            vec![0, 0, 1000000, 0, 0, 1000000, -1000000, 0]
        );
    }

    #[test]
    fn polygon_with_hole_writes_ring_lengths_and_keeps_accumulating() {
        let geojson = parse(
            r#"{"type":"Polygon","coordinates":[
                [[0,0],[4,0],[4,4],[0,4],[0,0]],
                [[1,1],[2,1],[2,2],[1,2],[1,1]]
            ]}"#,
        );
        let data = Encoder::new(1).encode(&geojson);

        let (_, _, _, _, body) = split_document(&data);
        assert_eq!(geometry_lengths(&body), Some(vec![4, 4]));
        // the hole's first delta continues from the shell's last emitted
        // point (0, 4)
        assert_eq!(
            geometry_coords(&body),
            vec![0, 0, 4, 0, 0, 4, -4, 0, 1, -3, 1, 0, 0, 1, -1, 0]
        );
    }

    #[test]
    fn multi_polygon_descriptor_counts_polygons_rings_and_points() {
        let geojson = parse(
            r#"{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,0]]],
                [[[5,5],[6,5],[6,6],[5,5]]]
            ]}"#,
        );
        let data = Encoder::new(1).encode(&geojson);

        let (_, _, _, _, body) = split_document(&data);
        assert_eq!(geometry_lengths(&body), Some(vec![2, 1, 3, 1, 3]));
        assert_eq!(geometry_coords(&body).len(), 12);
    }

    #[test]
    fn single_ring_multi_polygon_elides_lengths() {
        let geojson = parse(
            r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]}"#,
        );
        let data = Encoder::new(1).encode(&geojson);
        let (_, _, _, _, body) = split_document(&data);
        assert_eq!(geometry_lengths(&body), None);
    }

    #[test]
    fn shared_keys_are_interned_once() {
        let geojson = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"a"},"geometry":{"type":"Point","coordinates":[0,0]}},
                {"type":"Feature","properties":{"name":"b"},"geometry":{"type":"Point","coordinates":[1,1]}}
            ]}"#,
        );
        let data = Encoder::default().encode(&geojson);

        let (keys, _, _, tag, body) = split_document(&data);
        assert_eq!(keys, vec!["name"]);
        assert_eq!(tag, 4);

        // both features reference key 0 and a per-feature value index 0
        let mut pbf = PbfReader::new(&body);
        let mut pair_arrays = Vec::new();
        while pbf.next().unwrap() {
            assert_eq!(pbf.tag(), 1);
            let mut feature = pbf.get_message().unwrap();
            while feature.next().unwrap() {
                if feature.tag() == 14 {
                    pair_arrays.push(feature.get_packed_uint32().unwrap());
                } else {
                    feature.skip().unwrap();
                }
            }
        }
        assert_eq!(pair_arrays, vec![vec![0, 0], vec![0, 0]]);
    }

    #[test]
    fn z_coordinate_anywhere_makes_the_document_3d() {
        let geojson = parse(
            r#"{"type":"LineString","coordinates":[[1,2],[3,4,2],[5,6,0]]}"#,
        );
        let data = Encoder::new(1).encode(&geojson);

        let (_, dim, _, _, body) = split_document(&data);
        assert_eq!(dim, Some(3));
        // points without z emit 0 for the third axis
        assert_eq!(geometry_coords(&body), vec![1, 2, 0, 2, 2, 2, 2, 2, -2]);
    }

    #[test]
    fn precision_header_present_only_when_not_default() {
        let point = parse(r#"{"type":"Point","coordinates":[1.5,2.5]}"#);

        let (_, _, precision, _, _) = split_document(&Encoder::default().encode(&point));
        assert_eq!(precision, None);

        let (_, _, precision, _, _) = split_document(&Encoder::new(100).encode(&point));
        assert_eq!(precision, Some(2));
    }

    #[test]
    fn integer_string_and_negative_values_pick_their_wire_fields() {
        let geojson = parse(
            r#"{"type":"Feature","geometry":null,"properties":
                {"a":"text","b":2.5,"c":7,"d":-7,"e":true,"f":[1,2],"g":null}}"#,
        );
        let data = Encoder::default().encode(&geojson);
        let (keys, _, _, tag, body) = split_document(&data);
        assert_eq!(tag, 5);
        assert_eq!(keys, vec!["a", "b", "c", "d", "e", "f", "g"]);

        let mut pbf = PbfReader::new(&body);
        let mut value_tags = Vec::new();
        while pbf.next().unwrap() {
            if pbf.tag() == 13 {
                let mut value = pbf.get_message().unwrap();
                if value.next().unwrap() {
                    value_tags.push(value.tag());
                } else {
                    value_tags.push(0); // empty submessage: null
                }
            } else {
                pbf.skip().unwrap();
            }
        }
        assert_eq!(value_tags, vec![1, 2, 3, 4, 5, 6, 0]);
    }

    #[test]
    fn analyze_is_idempotent() {
        let geojson = parse(
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1,2,3]},
                "properties":{"k1":1,"k2":2}}"#,
        );
        let mut encoder = Encoder::default();
        let first = encoder.encode(&geojson);
        let second = encoder.encode(&geojson);
        assert_eq!(first, second);
        assert_eq!(encoder.dim, 3);
        assert_eq!(
            encoder.keys.iter().cloned().collect::<Vec<_>>(),
            vec!["k1", "k2"]
        );
    }
}
