//! Human-readable dumps of raw Geobuf bytes.
//!
//! The formatter walks the wire format without interpreting it as GeoJSON:
//! every line names a field number and wire type, scalar payloads print
//! their value, and length-delimited payloads are tried as embedded
//! messages (indented one level deeper), then as text, then as hex.

use std::fmt::Write;

use crate::errors::Result;
use crate::pbf::{PbfReader, WireType};

/// Renders a Geobuf byte string as an indented field-by-field dump.
///
/// `indent_unit` is repeated once per nesting level (pass `""` for a flat
/// dump). Malformed input never fails the call: whatever decodes before
/// the bad region is kept, followed by an `<unreadable: …>` line.
pub fn to_printable(data: &[u8], indent_unit: &str) -> String {
    let mut out = String::new();
    if let Err(error) = render_message(data, indent_unit, 0, &mut out) {
        let _ = writeln!(out, "<unreadable: {}>", error);
    }
    out
}

fn render_message(data: &[u8], unit: &str, depth: usize, out: &mut String) -> Result<()> {
    let mut pbf = PbfReader::new(data);
    let indent = unit.repeat(depth);
    while pbf.next()? {
        let tag = pbf.tag();
        match pbf.wire_type() {
            WireType::Varint => {
                let value = pbf.get_uint64()?;
                let _ = writeln!(out, "{}{} [varint]: {}", indent, tag, value);
            }
            WireType::Fixed64 => {
                let value = pbf.get_double()?;
                let _ = writeln!(out, "{}{} [fixed64]: {}", indent, tag, value);
            }
            WireType::Fixed32 => {
                // only reachable via skip in the codec; dump the raw bits
                pbf.skip()?;
                let _ = writeln!(out, "{}{} [fixed32]", indent, tag);
            }
            WireType::Len => {
                let bytes = pbf.get_bytes()?;
                render_len_payload(tag, bytes, unit, depth, &indent, out);
            }
        }
    }
    Ok(())
}

fn render_len_payload(
    tag: u32,
    bytes: &[u8],
    unit: &str,
    depth: usize,
    indent: &str,
    out: &mut String,
) {
    if bytes.is_empty() {
        let _ = writeln!(out, "{}{} [len]: \"\"", indent, tag);
        return;
    }

    // embedded messages first: most length-delimited fields in a Geobuf
    // document are submessages or packed scalars
    let mut nested = String::new();
    if render_message(bytes, unit, depth + 1, &mut nested).is_ok() {
        let _ = writeln!(out, "{}{} [len]: message {{", indent, tag);
        out.push_str(&nested);
        let _ = writeln!(out, "{}}}", indent);
        return;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) if text.chars().all(|c| !c.is_control()) => {
            let _ = writeln!(out, "{}{} [len]: {:?}", indent, tag, text);
        }
        _ => {
            let mut hex = String::with_capacity(bytes.len() * 2);
            for byte in bytes {
                let _ = write!(hex, "{:02x}", byte);
            }
            let _ = writeln!(out, "{}{} [len]: {} bytes 0x{}", indent, tag, bytes.len(), hex);
        }
    }
}
