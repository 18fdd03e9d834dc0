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

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::Result;
use crate::{util, Geometry, JsonObject, JsonValue};

/// Feature Objects
///
/// [GeoJSON Format Specification § 3.2](https://tools.ietf.org/html/rfc7946#section-3.2)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    /// Identifier; a JSON string or number in well-formed GeoJSON, but any
    /// non-null JSON value is accepted and carried through.
    pub id: Option<JsonValue>,
    /// Properties
    ///
    /// NOTE: This crate will permissively parse a Feature whose json is
    /// missing a `properties` key. Because the spec implies that the
    /// `properties` key must be present, we will always include the
    /// `properties` key when serializing.
    pub properties: Option<JsonObject>,
    /// Foreign Members
    ///
    /// [GeoJSON Format Specification § 6](https://tools.ietf.org/html/rfc7946#section-6)
    pub foreign_members: Option<JsonObject>,
}

impl Feature {
    pub(crate) fn from_object(mut object: JsonObject) -> Result<Self> {
        object.remove("type");
        Ok(Feature {
            geometry: util::get_geometry(&mut object)?,
            properties: util::get_properties(&mut object)?,
            id: util::get_id(&mut object)?,
            foreign_members: util::get_foreign_members(object),
        })
    }

    /// Shorthand to access a property value by key, if present.
    pub fn property(&self, key: impl AsRef<str>) -> Option<&JsonValue> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(key.as_ref()))
    }
}

impl<'a> From<&'a Feature> for JsonObject {
    fn from(feature: &'a Feature) -> JsonObject {
        let mut map = JsonObject::new();
        map.insert(String::from("type"), JsonValue::from("Feature"));
        map.insert(
            String::from("geometry"),
            ::serde_json::to_value(&feature.geometry).unwrap(),
        );
        map.insert(
            String::from("properties"),
            ::serde_json::to_value(&feature.properties).unwrap(),
        );
        if let Some(ref id) = feature.id {
            map.insert(String::from("id"), id.clone());
        }
        if let Some(ref foreign_members) = feature.foreign_members {
            for (key, value) in foreign_members {
                map.insert(key.to_owned(), value.to_owned());
            }
        }
        map
    }
}

impl Serialize for Feature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        JsonObject::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Feature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Feature, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as SerdeError;

        let val = JsonObject::deserialize(deserializer)?;

        Feature::from_object(val).map_err(|e| D::Error::custom(e.to_string()))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ::serde_json::to_string(self)
            .map_err(|_| fmt::Error)
            .and_then(|s| f.write_str(&s))
    }
}
