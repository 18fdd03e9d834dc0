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

use crate::errors::{Error, Result};
use crate::{Feature, Geometry, JsonObject, JsonValue, Position};

pub fn expect_type(value: &mut JsonObject) -> Result<String> {
    let prop = expect_property(value, "type")?;
    expect_string(prop)
}

pub fn expect_string(value: JsonValue) -> Result<String> {
    match value {
        JsonValue::String(s) => Ok(s),
        _ => Err(Error::ExpectedStringValue(value)),
    }
}

pub fn expect_f64(value: &JsonValue) -> Result<f64> {
    match value.as_f64() {
        Some(v) => Ok(v),
        None => Err(Error::ExpectedF64Value(value.clone())),
    }
}

fn expect_property(obj: &mut JsonObject, name: &'static str) -> Result<JsonValue> {
    match obj.remove(name) {
        Some(v) => Ok(v),
        None => Err(Error::ExpectedProperty(name.to_string())),
    }
}

fn expect_owned_array(value: JsonValue) -> Result<Vec<JsonValue>> {
    match value {
        JsonValue::Array(v) => Ok(v),
        _ => Err(Error::ExpectedArrayValue(value)),
    }
}

pub fn expect_owned_object(value: JsonValue) -> Result<JsonObject> {
    match value {
        JsonValue::Object(o) => Ok(o),
        _ => Err(Error::ExpectedObjectValue(value)),
    }
}

pub fn get_coords_value(object: &mut JsonObject) -> Result<JsonValue> {
    expect_property(object, "coordinates")
}

/// Used by FeatureCollection, Feature, Geometry: everything left in the
/// object once the standard members are consumed is kept verbatim.
pub fn get_foreign_members(object: JsonObject) -> Option<JsonObject> {
    if object.is_empty() {
        None
    } else {
        Some(object)
    }
}

/// Used by Feature
pub fn get_properties(object: &mut JsonObject) -> Result<Option<JsonObject>> {
    match object.remove("properties") {
        Some(JsonValue::Object(x)) => Ok(Some(x)),
        Some(JsonValue::Null) | None => Ok(None),
        Some(other) => Err(Error::PropertiesExpectedObjectOrNull(other)),
    }
}

/// Retrieve a single Position from the value of the "coordinates" key
///
/// Used by Value::Point
pub fn get_coords_one_pos(object: &mut JsonObject) -> Result<Position> {
    let coords_json = get_coords_value(object)?;
    json_to_position(&coords_json)
}

/// Retrieve a one dimensional Vec of Positions from the value of the
/// "coordinates" key
///
/// Used by Value::MultiPoint and Value::LineString
pub fn get_coords_1d_pos(object: &mut JsonObject) -> Result<Vec<Position>> {
    let coords_json = get_coords_value(object)?;
    json_to_1d_positions(&coords_json)
}

/// Retrieve a two dimensional Vec of Positions from the value of the
/// "coordinates" key
///
/// Used by Value::MultiLineString and Value::Polygon
pub fn get_coords_2d_pos(object: &mut JsonObject) -> Result<Vec<Vec<Position>>> {
    let coords_json = get_coords_value(object)?;
    json_to_2d_positions(&coords_json)
}

/// Retrieve a three dimensional Vec of Positions from the value of the
/// "coordinates" key
///
/// Used by Value::MultiPolygon
pub fn get_coords_3d_pos(object: &mut JsonObject) -> Result<Vec<Vec<Vec<Position>>>> {
    let coords_json = get_coords_value(object)?;
    json_to_3d_positions(&coords_json)
}

/// Used by Value::GeometryCollection
pub fn get_geometries(object: &mut JsonObject) -> Result<Vec<Geometry>> {
    let geometries_json = expect_property(object, "geometries")?;
    let geometries_array = expect_owned_array(geometries_json)?;
    let mut geometries = Vec::with_capacity(geometries_array.len());
    for json in geometries_array {
        let obj = expect_owned_object(json)?;
        geometries.push(Geometry::from_object(obj)?);
    }
    Ok(geometries)
}

/// Used by Feature. A JSON `null` id is treated the same as a missing one.
pub fn get_id(object: &mut JsonObject) -> Result<Option<JsonValue>> {
    match object.remove("id") {
        Some(JsonValue::Null) | None => Ok(None),
        Some(id) => Ok(Some(id)),
    }
}

/// Used by Feature
pub fn get_geometry(object: &mut JsonObject) -> Result<Option<Geometry>> {
    match object.remove("geometry") {
        Some(JsonValue::Object(x)) => Ok(Some(Geometry::from_object(x)?)),
        Some(JsonValue::Null) | None => Ok(None),
        Some(other) => Err(Error::FeatureInvalidGeometryValue(other)),
    }
}

/// Used by FeatureCollection
pub fn get_features(object: &mut JsonObject) -> Result<Vec<Feature>> {
    let prop = expect_property(object, "features")?;
    let features_json = expect_owned_array(prop)?;
    let mut features = Vec::with_capacity(features_json.len());
    for feature in features_json {
        let feature = expect_owned_object(feature)?;
        features.push(Feature::from_object(feature)?);
    }
    Ok(features)
}

/// Rebuilds every object in `json` in lexicographic key order. Arrays keep
/// their element order; only mappings are reordered.
pub fn sort_keys_inplace(json: &mut JsonValue) {
    match json {
        JsonValue::Array(items) => {
            for item in items {
                sort_keys_inplace(item);
            }
        }
        JsonValue::Object(object) => {
            let mut entries: Vec<(String, JsonValue)> =
                std::mem::take(object).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, mut value) in entries {
                sort_keys_inplace(&mut value);
                object.insert(key, value);
            }
        }
        _ => {}
    }
}

fn json_to_position(json: &JsonValue) -> Result<Position> {
    let coords_array = match json.as_array() {
        Some(v) => v,
        None => return Err(Error::ExpectedArrayValue(json.clone())),
    };
    if coords_array.len() < 2 {
        return Err(Error::PositionTooShort(coords_array.len()));
    }
    let mut coords = Vec::with_capacity(coords_array.len());
    for position in coords_array {
        coords.push(expect_f64(position)?);
    }
    Ok(coords)
}

fn json_to_1d_positions(json: &JsonValue) -> Result<Vec<Position>> {
    let coords_array = match json.as_array() {
        Some(v) => v,
        None => return Err(Error::ExpectedArrayValue(json.clone())),
    };
    let mut coords = Vec::with_capacity(coords_array.len());
    for item in coords_array {
        coords.push(json_to_position(item)?);
    }
    Ok(coords)
}

fn json_to_2d_positions(json: &JsonValue) -> Result<Vec<Vec<Position>>> {
    let coords_array = match json.as_array() {
        Some(v) => v,
        None => return Err(Error::ExpectedArrayValue(json.clone())),
    };
    let mut coords = Vec::with_capacity(coords_array.len());
    for item in coords_array {
        coords.push(json_to_1d_positions(item)?);
    }
    Ok(coords)
}

fn json_to_3d_positions(json: &JsonValue) -> Result<Vec<Vec<Vec<Position>>>> {
    let coords_array = match json.as_array() {
        Some(v) => v,
        None => return Err(Error::ExpectedArrayValue(json.clone())),
    };
    let mut coords = Vec::with_capacity(coords_array.len());
    for item in coords_array {
        coords.push(json_to_2d_positions(item)?);
    }
    Ok(coords)
}
