//! Module for all Geobuf-related errors
use serde_json::value::Value;
use thiserror::Error;

/// Errors which can occur when decoding Geobuf data or converting GeoJSON
#[derive(Error, Debug)]
pub enum Error {
    // wire-level failures
    #[error("Unexpected end of Geobuf data")]
    UnexpectedEof,
    #[error("Varint does not fit the declared integer width")]
    VarintOverflow,
    #[error("Encountered reserved wire type `{0}`")]
    InvalidWireType(u8),
    #[error("Encountered invalid field number `{0}`")]
    InvalidFieldNumber(u64),
    #[error("Field {tag} has wire type `{actual}`, expected `{expected}`")]
    UnexpectedWireType {
        tag: u32,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("String field contains invalid UTF-8")]
    InvalidUtf8,

    // structural failures
    #[error("Document contains no feature collection, feature, or geometry")]
    MissingDataField,
    #[error("Encountered an unknown geometry type code `{0}`")]
    UnknownGeometryCode(u32),
    #[error("Encountered unsupported dimension count `{0}`")]
    InvalidDimensions(u32),
    #[error("Property index array has odd length `{0}`")]
    UnpairedPropertyIndexes(usize),
    #[error("Property index `{index}` is out of range (table holds {len} entries)")]
    PropertyIndexOutOfRange { index: u32, len: usize },
    #[error("Geometry lengths do not match the coordinate stream")]
    MismatchedLengths,

    // JSON adapter failures
    #[error("Encountered a non-object type for GeoJSON: `{0}`")]
    GeoJsonExpectedObject(Value),
    #[error("Encountered an unknown GeoJSON object type: `{0}`")]
    GeoJsonUnknownType(String),
    #[error("Encountered an unknown 'geometry' object type: `{0}`")]
    GeometryUnknownType(String),
    #[error("Error while deserializing JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("Encountered neither object type nor null type for 'properties' object: `{0}`")]
    PropertiesExpectedObjectOrNull(Value),
    #[error("Encountered neither object type nor null type for 'geometry' field on 'feature' object: `{0}`")]
    FeatureInvalidGeometryValue(Value),
    #[error("Expected a GeoJSON property for `{0}`, but got None")]
    ExpectedProperty(String),
    #[error("Expected a String value, but got a `{0}`")]
    ExpectedStringValue(Value),
    #[error("Expected a floating-point value, but got a `{0}`")]
    ExpectedF64Value(Value),
    #[error("Expected an Array value, but got a `{0}`")]
    ExpectedArrayValue(Value),
    #[error("Expected an Object value, but got a `{0}`")]
    ExpectedObjectValue(Value),
    #[error("A position must contain two or more elements, but got `{0}`")]
    PositionTooShort(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
