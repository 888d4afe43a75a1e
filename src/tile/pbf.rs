//! Minimal protocol-buffer wire reader and writer.
//!
//! Only the four wire types used by vector tiles are understood. Anything else aborts decoding,
//! which is how compressed bytes fed to the decoder surface: the gzip magic `0x1f` reads as
//! field 3 with wire type 7.

/// Decode failure. The display strings are part of the diagnostic text contract.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PbfError {
    /// Wire type outside `{0, 1, 2, 5}`.
    #[error("pbf unknown field type exception")]
    UnknownWireType(u8),
    /// A read ran past the end of the buffer.
    #[error("pbf end of buffer exception")]
    EndOfBuffer,
    /// Varint longer than ten bytes.
    #[error("pbf varint too long exception")]
    VarintTooLong,
    /// Field number zero.
    #[error("pbf invalid tag exception")]
    InvalidTag,
    /// A known field arrived with an unexpected wire type.
    #[error("pbf field {field} has wire type {found:?}, expected {expected:?}")]
    WireTypeMismatch {
        /// Field number.
        field: u32,
        /// Wire type the schema declares.
        expected: WireType,
        /// Wire type found in the message.
        found: WireType,
    },
    /// A string field is not UTF-8.
    #[error("pbf invalid utf-8 in field {0}")]
    InvalidUtf8(u32),
}

/// Protobuf wire type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireType {
    /// 0: base-128 varint.
    Varint,
    /// 1: little-endian 64-bit.
    Fixed64,
    /// 2: length-delimited bytes.
    Bytes,
    /// 5: little-endian 32-bit.
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u8) -> Result<Self, PbfError> {
        match bits {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::Bytes),
            5 => Ok(Self::Fixed32),
            other => Err(PbfError::UnknownWireType(other)),
        }
    }

    fn bits(self) -> u64 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::Bytes => 2,
            Self::Fixed32 => 5,
        }
    }
}

/// Cursor over one protobuf message.
#[derive(Clone, Debug)]
pub struct PbfReader<'a> {
    data: &'a [u8],
    pos: usize,
    field: u32,
    wire: WireType,
}

impl<'a> PbfReader<'a> {
    /// Read the message in `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            field: 0,
            wire: WireType::Varint,
        }
    }

    /// Advance to the next field key. Returns `Ok(None)` at the end of the message.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireType)>, PbfError> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let wire = WireType::from_bits((key & 0x7) as u8)?;
        let field = u32::try_from(key >> 3).map_err(|_| PbfError::InvalidTag)?;
        if field == 0 {
            return Err(PbfError::InvalidTag);
        }
        self.field = field;
        self.wire = wire;
        Ok(Some((field, wire)))
    }

    /// Fail unless the current field has wire type `expected`.
    pub fn expect(&self, expected: WireType) -> Result<(), PbfError> {
        if self.wire == expected {
            Ok(())
        } else {
            Err(PbfError::WireTypeMismatch {
                field: self.field,
                expected,
                found: self.wire,
            })
        }
    }

    /// Read a raw varint.
    pub fn read_varint(&mut self) -> Result<u64, PbfError> {
        let mut result: u64 = 0;
        for i in 0..10 {
            let b = *self.data.get(self.pos).ok_or(PbfError::EndOfBuffer)?;
            self.pos += 1;
            result |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(PbfError::VarintTooLong)
    }

    /// Read the current varint field as `u32`, truncating like protobuf does.
    pub fn read_u32(&mut self) -> Result<u32, PbfError> {
        self.expect(WireType::Varint)?;
        Ok(self.read_varint()? as u32)
    }

    /// Read the current varint field as `u64`.
    pub fn read_u64(&mut self) -> Result<u64, PbfError> {
        self.expect(WireType::Varint)?;
        self.read_varint()
    }

    /// Read the current length-delimited field.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], PbfError> {
        self.expect(WireType::Bytes)?;
        self.take_len_delimited()
    }

    /// Read the current length-delimited field as UTF-8.
    pub fn read_string(&mut self) -> Result<&'a str, PbfError> {
        let field = self.field;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| PbfError::InvalidUtf8(field))
    }

    /// Read the current length-delimited field as an embedded message.
    pub fn read_message(&mut self) -> Result<PbfReader<'a>, PbfError> {
        Ok(PbfReader::new(self.read_bytes()?))
    }

    /// Read the current field as packed `uint32` values.
    pub fn read_packed_u32(&mut self) -> Result<Vec<u32>, PbfError> {
        let mut inner = PbfReader::new(self.read_bytes()?);
        let mut out = Vec::new();
        while inner.pos < inner.data.len() {
            out.push(inner.read_varint()? as u32);
        }
        Ok(out)
    }

    /// Skip the current field's value.
    pub fn skip(&mut self) -> Result<(), PbfError> {
        match self.wire {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => self.advance(8)?,
            WireType::Fixed32 => self.advance(4)?,
            WireType::Bytes => {
                self.take_len_delimited()?;
            }
        }
        Ok(())
    }

    fn take_len_delimited(&mut self) -> Result<&'a [u8], PbfError> {
        let len = usize::try_from(self.read_varint()?).map_err(|_| PbfError::EndOfBuffer)?;
        let start = self.pos;
        self.advance(len)?;
        Ok(&self.data[start..self.pos])
    }

    fn advance(&mut self, n: usize) -> Result<(), PbfError> {
        let end = self.pos.checked_add(n).ok_or(PbfError::EndOfBuffer)?;
        if end > self.data.len() {
            return Err(PbfError::EndOfBuffer);
        }
        self.pos = end;
        Ok(())
    }
}

/// Append-only protobuf message writer.
#[derive(Clone, Debug, Default)]
pub struct PbfWriter {
    buf: Vec<u8>,
}

impl PbfWriter {
    /// Empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn key(&mut self, field: u32, wire: WireType) {
        write_varint(&mut self.buf, (u64::from(field) << 3) | wire.bits());
    }

    /// Write a varint field.
    pub fn varint(&mut self, field: u32, value: u64) -> &mut Self {
        self.key(field, WireType::Varint);
        write_varint(&mut self.buf, value);
        self
    }

    /// Write a length-delimited field.
    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        self.key(field, WireType::Bytes);
        write_varint(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(value);
        self
    }

    /// Write a packed `uint32` field.
    pub fn packed_u32(&mut self, field: u32, values: &[u32]) -> &mut Self {
        let mut inner = Vec::with_capacity(values.len() * 2);
        for v in values {
            write_varint(&mut inner, u64::from(*v));
        }
        self.bytes(field, &inner)
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Zig-zag encode a signed coordinate delta.
pub fn zigzag_encode(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// Zig-zag decode a parameter integer.
pub fn zigzag_decode(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

#[cfg(test)]
#[path = "../../tests/unit/tile/pbf.rs"]
mod tests;
