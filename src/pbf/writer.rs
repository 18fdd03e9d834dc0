use crate::pbf::{zigzag_encode, WireType};

/// Builds one protobuf message in an owned buffer.
///
/// Scalar `add_*` calls append a complete field. Embedded messages go
/// through [`add_message`](PbfWriter::add_message), which reserves a
/// one-byte length prefix, runs the closure against the same buffer, and
/// rewrites the prefix once the payload size is known.
#[derive(Default)]
pub struct PbfWriter {
    data: Vec<u8>,
}

impl PbfWriter {
    pub fn new() -> Self {
        PbfWriter::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn add_uint64(&mut self, tag: u32, value: u64) {
        self.write_key(tag, WireType::Varint);
        self.write_varint(value);
    }

    pub fn add_uint32(&mut self, tag: u32, value: u32) {
        self.add_uint64(tag, u64::from(value));
    }

    pub fn add_sint64(&mut self, tag: u32, value: i64) {
        self.add_uint64(tag, zigzag_encode(value));
    }

    pub fn add_bool(&mut self, tag: u32, value: bool) {
        self.add_uint64(tag, u64::from(value));
    }

    pub fn add_enum(&mut self, tag: u32, value: u32) {
        self.add_uint32(tag, value);
    }

    pub fn add_double(&mut self, tag: u32, value: f64) {
        self.write_key(tag, WireType::Fixed64);
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn add_string(&mut self, tag: u32, value: &str) {
        self.add_bytes(tag, value.as_bytes());
    }

    pub fn add_bytes(&mut self, tag: u32, value: &[u8]) {
        self.write_key(tag, WireType::Len);
        self.write_varint(value.len() as u64);
        self.data.extend_from_slice(value);
    }

    /// Packed repeated uint32. Nothing is written for an empty slice.
    pub fn add_packed_uint32(&mut self, tag: u32, values: &[u32]) {
        if values.is_empty() {
            return;
        }
        let mut body = Vec::new();
        for &value in values {
            write_varint_into(&mut body, u64::from(value));
        }
        self.add_bytes(tag, &body);
    }

    /// Packed repeated sint64 (zigzag). Nothing is written for an empty
    /// slice.
    pub fn add_packed_sint64(&mut self, tag: u32, values: &[i64]) {
        if values.is_empty() {
            return;
        }
        let mut body = Vec::new();
        for &value in values {
            write_varint_into(&mut body, zigzag_encode(value));
        }
        self.add_bytes(tag, &body);
    }

    /// Writes an embedded message. The closure fills the submessage using
    /// this same writer; the enclosing length prefix is fixed up when the
    /// closure returns.
    pub fn add_message<F>(&mut self, tag: u32, build: F)
    where
        F: FnOnce(&mut PbfWriter),
    {
        self.write_key(tag, WireType::Len);
        let start = self.data.len();
        self.data.push(0);
        build(self);
        let len = (self.data.len() - start - 1) as u64;
        let prefix_len = varint_len(len);
        if prefix_len > 1 {
            // make room for the longer prefix, shifting the payload right
            self.data
                .splice(start..start, std::iter::repeat(0).take(prefix_len - 1));
        }
        let mut value = len;
        for i in 0..prefix_len {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if i + 1 < prefix_len {
                byte |= 0x80;
            }
            self.data[start + i] = byte;
        }
    }

    fn write_key(&mut self, tag: u32, wire_type: WireType) {
        self.write_varint(u64::from(tag) << 3 | wire_type as u64);
    }

    fn write_varint(&mut self, value: u64) {
        write_varint_into(&mut self.data, value);
    }
}

fn write_varint_into(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push(value as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    std::cmp::max((bits + 6) / 7, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_encoding_matches_known_bytes() {
        let mut writer = PbfWriter::new();
        writer.add_uint64(1, 150);
        assert_eq!(writer.into_bytes(), vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn varint_len_covers_boundaries() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(16383), 2);
        assert_eq!(varint_len(16384), 3);
        assert_eq!(varint_len(u64::MAX), 10);
    }

    #[test]
    fn empty_packed_fields_are_suppressed() {
        let mut writer = PbfWriter::new();
        writer.add_packed_uint32(2, &[]);
        writer.add_packed_sint64(3, &[]);
        assert!(writer.into_bytes().is_empty());
    }

    #[test]
    fn long_submessages_get_a_wider_length_prefix() {
        let mut writer = PbfWriter::new();
        writer.add_message(1, |inner| {
            for _ in 0..40 {
                inner.add_string(2, "0123456789");
            }
        });
        let data = writer.into_bytes();

        // 40 * (1 key + 1 len + 10 bytes) = 480 > 127, so the prefix is
        // two bytes
        assert_eq!(data[0], 0x0a);
        assert_eq!(data[1], 0xe0);
        assert_eq!(data[2], 0x03);
        assert_eq!(data.len(), 3 + 480);
    }

    #[test]
    fn nested_submessages_fix_up_inner_prefixes_first() {
        let mut writer = PbfWriter::new();
        writer.add_message(1, |outer| {
            outer.add_message(2, |inner| {
                for _ in 0..20 {
                    inner.add_string(3, "0123456789");
                }
            });
            outer.add_uint64(4, 5);
        });
        let data = writer.into_bytes();

        // inner payload: 20 * 12 = 240 (two-byte prefix);
        // outer payload: key(1) + prefix(2) + 240 + key(1) + varint(1)
        assert_eq!(data[0], 0x0a);
        assert_eq!(data[1], 0xf5);
        assert_eq!(data[2], 0x01);
        assert_eq!(data.len() as u64, 3 + 245);
    }
}
