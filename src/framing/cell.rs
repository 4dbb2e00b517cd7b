//! Cell framing and serialization.
//!
//! Defines the wire format for obfuscation cells.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::framing::CELL_HEADER_LEN;

/// Cell types in the obfuscation protocol.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// Application data fragment
    Data = 0x01,
    /// Transport handshake material
    Handshake = 0x02,
    /// Control signalling
    Control = 0x03,
    /// Cover traffic carrying no payload
    Dummy = 0x04,
}

impl TryFrom<u8> for CellType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(CellType::Data),
            0x02 => Ok(CellType::Handshake),
            0x03 => Ok(CellType::Control),
            0x04 => Ok(CellType::Dummy),
            other => Err(Error::UnknownCellType(other)),
        }
    }
}

/// Cell flags
pub mod flags {
    /// This cell completes its message stream
    pub const END_OF_STREAM: u8 = 0x01;
}

/// One framed unit of the wire protocol.
///
/// Wire format (all integers big-endian):
/// ```text
/// ┌───────────────────────────────────────────────────────────────┐
/// │ Cell ID (2) │ Type (1) │ Flags (1) │ Seq (4) │ Timestamp (8)  │
/// ├───────────────────────────────────────────────────────────────┤
/// │ Payload Len (2)    │ Padding Len (2)    │ Rand Offset (2)     │
/// ├───────────────────────────────────────────────────────────────┤
/// │ Content region: payload at [rand_offset, rand_offset + len),  │
/// │ padding filling the bytes before and after that window        │
/// └───────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Groups the fragments of one logical message; 0 is reserved for cover cells
    pub cell_id: u16,
    /// Cell type
    pub cell_type: CellType,
    /// Flags (bit 0 = end-of-stream)
    pub flags: u8,
    /// Sequence number, monotonically increasing per framer
    pub seq: u32,
    /// Milliseconds since the Unix epoch at creation; diagnostic only
    pub timestamp: i64,
    /// Offset of the payload window within the content region
    pub rand_offset: u16,
    /// Application payload
    pub payload: Bytes,
    /// Padding bytes surrounding the payload window
    pub padding: Bytes,
}

impl Cell {
    /// Create a data cell.
    pub fn data(
        cell_id: u16,
        seq: u32,
        payload: impl Into<Bytes>,
        padding: impl Into<Bytes>,
        rand_offset: u16,
    ) -> Self {
        Self {
            cell_id,
            cell_type: CellType::Data,
            flags: 0,
            seq,
            timestamp: unix_millis(),
            rand_offset,
            payload: payload.into(),
            padding: padding.into(),
        }
    }

    /// Create a dummy cell for cover traffic.
    pub fn dummy(padding: impl Into<Bytes>, rand_offset: u16) -> Self {
        Self {
            cell_id: 0,
            cell_type: CellType::Dummy,
            flags: 0,
            seq: 0,
            timestamp: unix_millis(),
            rand_offset,
            payload: Bytes::new(),
            padding: padding.into(),
        }
    }

    /// Set a flag on the cell.
    pub fn with_flag(mut self, flag: u8) -> Self {
        self.flags |= flag;
        self
    }

    /// Check if a flag is set.
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Length of the content region (payload + padding).
    pub fn content_len(&self) -> usize {
        self.payload.len() + self.padding.len()
    }

    /// Total wire size of this cell.
    pub fn wire_size(&self) -> usize {
        CELL_HEADER_LEN + self.content_len()
    }

    /// Serialize the cell to bytes.
    ///
    /// The payload occupies `[rand_offset, rand_offset + payload_len)` of
    /// the content region; the padding's first `rand_offset` bytes precede
    /// the window and the remainder follows it.
    pub fn encode(&self) -> Result<Bytes> {
        let content_len = self.content_len();
        if self.payload.len() > u16::MAX as usize || self.padding.len() > u16::MAX as usize {
            return Err(Error::ContentOverflow(content_len));
        }

        let offset = self.rand_offset as usize;
        if offset + self.payload.len() > content_len {
            return Err(Error::PayloadOutOfBounds {
                offset,
                len: self.payload.len(),
                content: content_len,
            });
        }

        let mut buf = BytesMut::with_capacity(CELL_HEADER_LEN + content_len);
        buf.put_u16(self.cell_id);
        buf.put_u8(self.cell_type as u8);
        buf.put_u8(self.flags);
        buf.put_u32(self.seq);
        buf.put_i64(self.timestamp);
        buf.put_u16(self.payload.len() as u16);
        buf.put_u16(self.padding.len() as u16);
        buf.put_u16(self.rand_offset);

        // The window check above guarantees offset <= padding length.
        buf.put_slice(&self.padding[..offset]);
        buf.put_slice(&self.payload);
        buf.put_slice(&self.padding[offset..]);

        Ok(buf.freeze())
    }

    /// Deserialize a cell from bytes.
    pub fn decode(mut data: Bytes) -> Result<Self> {
        if data.len() < CELL_HEADER_LEN {
            return Err(Error::HeaderTooShort {
                expected: CELL_HEADER_LEN,
                actual: data.len(),
            });
        }

        let cell_id = data.get_u16();
        let cell_type = CellType::try_from(data.get_u8())?;
        let flags = data.get_u8();
        let seq = data.get_u32();
        let timestamp = data.get_i64();
        let payload_len = data.get_u16() as usize;
        let padding_len = data.get_u16() as usize;
        let rand_offset = data.get_u16();

        let declared = payload_len + padding_len;
        if data.len() != declared {
            return Err(Error::ContentLengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let offset = rand_offset as usize;
        if offset + payload_len > declared {
            return Err(Error::PayloadOutOfBounds {
                offset,
                len: payload_len,
                content: declared,
            });
        }

        let before = data.split_to(offset);
        let payload = data.split_to(payload_len);
        let after = data;

        let mut padding = BytesMut::with_capacity(padding_len);
        padding.put_slice(&before);
        padding.put_slice(&after);

        Ok(Self {
            cell_id,
            cell_type,
            flags,
            seq,
            timestamp,
            rand_offset,
            payload,
            padding: padding.freeze(),
        })
    }
}

/// Milliseconds since the Unix epoch, zero on a pre-epoch clock.
fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let original = Cell::data(
            0x1234,
            42,
            Bytes::from_static(b"hello world"),
            Bytes::from_static(b"PADDINGPADDING"),
            7,
        )
        .with_flag(flags::END_OF_STREAM);

        let encoded = original.encode().unwrap();
        assert_eq!(encoded.len(), original.wire_size());

        let decoded = Cell::decode(encoded).unwrap();
        assert_eq!(decoded, original);
        assert!(decoded.has_flag(flags::END_OF_STREAM));
    }

    #[test]
    fn test_round_trip_every_offset() {
        // Single-byte payload admits every offset in [0, content_len - 1].
        let padding = Bytes::from(vec![0xabu8; 9]);
        for offset in 0..=9u16 {
            let cell = Cell::data(1, 0, Bytes::from_static(b"x"), padding.clone(), offset);
            let decoded = Cell::decode(cell.encode().unwrap()).unwrap();
            assert_eq!(decoded, cell, "offset {}", offset);
        }
    }

    #[test]
    fn test_round_trip_offset_extremes() {
        let payload = Bytes::from(vec![1u8; 5]);
        let padding = Bytes::from(vec![2u8; 8]);

        let at_zero = Cell::data(9, 3, payload.clone(), padding.clone(), 0);
        assert_eq!(Cell::decode(at_zero.encode().unwrap()).unwrap(), at_zero);

        // Largest offset that still fits the payload window.
        let at_max = Cell::data(9, 3, payload, padding, 8);
        assert_eq!(Cell::decode(at_max.encode().unwrap()).unwrap(), at_max);
    }

    #[test]
    fn test_dummy_round_trip() {
        let cell = Cell::dummy(Bytes::from(vec![0x61u8; 100]), 57);
        assert_eq!(cell.cell_id, 0);
        assert_eq!(cell.cell_type, CellType::Dummy);
        assert!(cell.payload.is_empty());

        let decoded = Cell::decode(cell.encode().unwrap()).unwrap();
        assert_eq!(decoded, cell);
    }

    #[test]
    fn test_encode_rejects_escaping_window() {
        let cell = Cell::data(
            1,
            0,
            Bytes::from_static(b"abcdef"),
            Bytes::from_static(b"pp"),
            5,
        );
        assert!(matches!(
            cell.encode(),
            Err(Error::PayloadOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_decode_header_too_short() {
        let result = Cell::decode(Bytes::from_static(&[0u8; 10]));
        assert!(matches!(result, Err(Error::HeaderTooShort { .. })));
    }

    #[test]
    fn test_decode_content_length_mismatch() {
        let cell = Cell::data(3, 1, Bytes::from_static(b"data"), Bytes::new(), 0);
        let mut encoded = BytesMut::from(&cell.encode().unwrap()[..]);
        encoded.put_u8(0xff); // trailing garbage

        let result = Cell::decode(encoded.freeze());
        assert!(matches!(result, Err(Error::ContentLengthMismatch { .. })));
    }

    #[test]
    fn test_decode_unknown_type() {
        let cell = Cell::data(3, 1, Bytes::from_static(b"data"), Bytes::new(), 0);
        let mut encoded = BytesMut::from(&cell.encode().unwrap()[..]);
        encoded[2] = 0x7f;

        let result = Cell::decode(encoded.freeze());
        assert!(matches!(result, Err(Error::UnknownCellType(0x7f))));
    }

    #[test]
    fn test_decode_rejects_escaping_window() {
        let cell = Cell::data(3, 1, Bytes::from_static(b"data"), Bytes::from_static(b"pad!"), 0);
        let mut encoded = BytesMut::from(&cell.encode().unwrap()[..]);
        // Corrupt rand_offset so the declared window escapes the region.
        encoded[20] = 0x00;
        encoded[21] = 0x07;

        let result = Cell::decode(encoded.freeze());
        assert!(matches!(result, Err(Error::PayloadOutOfBounds { .. })));
    }

    #[test]
    fn test_empty_content_round_trip() {
        let cell = Cell::data(5, 2, Bytes::new(), Bytes::new(), 0).with_flag(flags::END_OF_STREAM);
        let encoded = cell.encode().unwrap();
        assert_eq!(encoded.len(), CELL_HEADER_LEN);
        assert_eq!(Cell::decode(encoded).unwrap(), cell);
    }
}
