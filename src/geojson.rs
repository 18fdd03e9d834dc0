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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};
use crate::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

/// GeoJSON Objects
///
/// [GeoJSON Format Specification § 3](https://tools.ietf.org/html/rfc7946#section-3)
#[derive(Clone, Debug, PartialEq)]
pub enum GeoJson {
    Geometry(Geometry),
    Feature(Feature),
    FeatureCollection(FeatureCollection),
}

impl<'a> From<&'a GeoJson> for JsonObject {
    fn from(geojson: &'a GeoJson) -> JsonObject {
        match *geojson {
            GeoJson::Geometry(ref geometry) => geometry.into(),
            GeoJson::Feature(ref feature) => feature.into(),
            GeoJson::FeatureCollection(ref fc) => fc.into(),
        }
    }
}

impl From<Geometry> for GeoJson {
    fn from(geometry: Geometry) -> Self {
        GeoJson::Geometry(geometry)
    }
}

impl From<Feature> for GeoJson {
    fn from(feature: Feature) -> Self {
        GeoJson::Feature(feature)
    }
}

impl From<FeatureCollection> for GeoJson {
    fn from(feature_collection: FeatureCollection) -> GeoJson {
        GeoJson::FeatureCollection(feature_collection)
    }
}

impl GeoJson {
    pub(crate) fn from_object(object: JsonObject) -> Result<Self> {
        let object_type = match object.get("type").and_then(JsonValue::as_str) {
            Some(t) => t.to_owned(),
            None => return Err(Error::ExpectedProperty("type".to_string())),
        };
        match object_type.as_str() {
            "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon"
            | "MultiPolygon" | "GeometryCollection" => {
                Geometry::from_object(object).map(GeoJson::Geometry)
            }
            "Feature" => Feature::from_object(object).map(GeoJson::Feature),
            "FeatureCollection" => {
                FeatureCollection::from_object(object).map(GeoJson::FeatureCollection)
            }
            _ => Err(Error::GeoJsonUnknownType(object_type.to_string())),
        }
    }

    /// The document rendered as a JSON value tree.
    pub fn to_json_value(&self) -> JsonValue {
        JsonValue::Object(JsonObject::from(self))
    }
}

impl Serialize for GeoJson {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        JsonObject::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GeoJson {
    fn deserialize<D>(deserializer: D) -> std::result::Result<GeoJson, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as SerdeError;

        let val = JsonObject::deserialize(deserializer)?;

        GeoJson::from_object(val).map_err(|e| D::Error::custom(e.to_string()))
    }
}

impl FromStr for GeoJson {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let decoded_json: JsonValue = ::serde_json::from_str(s)?;
        match decoded_json {
            JsonValue::Object(object) => GeoJson::from_object(object),
            other => Err(Error::GeoJsonExpectedObject(other)),
        }
    }
}

impl fmt::Display for GeoJson {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ::serde_json::to_string(self)
            .map_err(|_| fmt::Error)
            .and_then(|s| f.write_str(&s))
    }
}

#[cfg(test)]
mod tests {
    use crate::{GeoJson, Geometry, Value};

    #[test]
    fn geojson_display_is_compact_json() {
        let geojson = GeoJson::Geometry(Geometry::new(Value::Point(vec![1.0, 2.0])));
        assert_eq!(
            geojson.to_string(),
            "{\"type\":\"Point\",\"coordinates\":[1.0,2.0]}"
        );
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            "[1,2,3]".parse::<GeoJson>(),
            Err(crate::Error::GeoJsonExpectedObject(_))
        ));
    }

    #[test]
    fn unknown_top_level_type_is_rejected() {
        assert!(matches!(
            "{\"type\":\"Route\"}".parse::<GeoJson>(),
            Err(crate::Error::GeoJsonUnknownType(t)) if t == "Route"
        ));
    }
}
