use crate::errors::{Error, Result};
use crate::pbf::{zigzag_decode, WireType};

/// Reads one protobuf message from a byte slice, field by field.
///
/// `next` advances to the next field key; the `get_*` accessors consume
/// exactly that field's payload. Fields the caller does not recognize must
/// be dropped with [`skip`](PbfReader::skip) so the read position stays on
/// a key boundary. Submessages are handed out as sub-readers borrowing the
/// same buffer.
pub struct PbfReader<'a> {
    data: &'a [u8],
    pos: usize,
    tag: u32,
    wire_type: WireType,
}

impl<'a> PbfReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        PbfReader {
            data,
            pos: 0,
            tag: 0,
            wire_type: WireType::Varint,
        }
    }

    /// Advances to the next field. Returns `false` at the end of the
    /// message; after `true`, `tag` and `wire_type` describe the field.
    pub fn next(&mut self) -> Result<bool> {
        if self.pos == self.data.len() {
            return Ok(false);
        }
        let key = self.read_varint()?;
        let tag = key >> 3;
        if tag == 0 || tag > u64::from(u32::MAX >> 3) {
            return Err(Error::InvalidFieldNumber(tag));
        }
        self.wire_type = WireType::from_raw((key & 0x07) as u8)
            .ok_or(Error::InvalidWireType((key & 0x07) as u8))?;
        self.tag = tag as u32;
        Ok(true)
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn get_uint64(&mut self) -> Result<u64> {
        self.expect_wire_type(WireType::Varint)?;
        self.read_varint()
    }

    pub fn get_uint32(&mut self) -> Result<u32> {
        let value = self.get_uint64()?;
        u32::try_from(value).map_err(|_| Error::VarintOverflow)
    }

    pub fn get_sint64(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.get_uint64()?))
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_uint64()? != 0)
    }

    pub fn get_enum(&mut self) -> Result<u32> {
        self.get_uint32()
    }

    pub fn get_double(&mut self) -> Result<f64> {
        self.expect_wire_type(WireType::Fixed64)?;
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// The raw payload of a length-delimited field.
    pub fn get_bytes(&mut self) -> Result<&'a [u8]> {
        self.expect_wire_type(WireType::Len)?;
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| Error::UnexpectedEof)?;
        self.take(len)
    }

    pub fn get_string(&mut self) -> Result<String> {
        let bytes = self.get_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
    }

    /// A sub-reader over the current field's embedded message.
    pub fn get_message(&mut self) -> Result<PbfReader<'a>> {
        Ok(PbfReader::new(self.get_bytes()?))
    }

    pub fn get_packed_uint32(&mut self) -> Result<Vec<u32>> {
        let mut body = PbfReader::new(self.get_bytes()?);
        let mut values = Vec::new();
        while body.pos < body.data.len() {
            let value = body.read_varint()?;
            values.push(u32::try_from(value).map_err(|_| Error::VarintOverflow)?);
        }
        Ok(values)
    }

    pub fn get_packed_sint64(&mut self) -> Result<Vec<i64>> {
        let mut body = PbfReader::new(self.get_bytes()?);
        let mut values = Vec::new();
        while body.pos < body.data.len() {
            values.push(zigzag_decode(body.read_varint()?));
        }
        Ok(values)
    }

    /// Drops the current field's payload, whatever its wire type.
    pub fn skip(&mut self) -> Result<()> {
        match self.wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::Len => {
                let len = self.read_varint()?;
                let len = usize::try_from(len).map_err(|_| Error::UnexpectedEof)?;
                self.take(len)?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(())
    }

    fn expect_wire_type(&self, expected: WireType) -> Result<()> {
        if self.wire_type != expected {
            return Err(Error::UnexpectedWireType {
                tag: self.tag,
                expected: expected.name(),
                actual: self.wire_type.name(),
            });
        }
        Ok(())
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let byte = *self.data.get(self.pos).ok_or(Error::UnexpectedEof)?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::VarintOverflow);
            }
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
