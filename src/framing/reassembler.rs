//! Reassembly of fragmented cells into application messages.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::framing::cell::{flags, Cell};

/// Accumulation state for one in-flight message stream.
#[derive(Debug)]
struct StreamState {
    buffer: BytesMut,
    last_seq: u32,
}

/// Reconstructs original byte streams from decoded cells.
///
/// Streams are keyed by cell ID and independent: fragments of different
/// messages may interleave arbitrarily, but within one stream cells must
/// arrive in strict sequence order.
#[derive(Debug, Default)]
pub struct Reassembler {
    streams: HashMap<u16, StreamState>,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams currently awaiting completion.
    pub fn pending_streams(&self) -> usize {
        self.streams.len()
    }

    /// Feed one decoded cell into the reassembler.
    ///
    /// Returns the complete message when the cell carries the
    /// end-of-stream flag and `None` while the stream is still
    /// accumulating. The first cell of an unknown stream is accepted at
    /// whatever sequence number it carries (the framer's counter is
    /// global, not per-stream); after that only the immediate successor is
    /// accepted and anything else is rejected with the stream untouched,
    /// so a resend of the expected cell still goes through.
    pub fn process_cell(&mut self, cell: &Cell) -> Result<Option<Bytes>> {
        let finished = cell.has_flag(flags::END_OF_STREAM);

        match self.streams.entry(cell.cell_id) {
            Entry::Occupied(mut occupied) => {
                let stream = occupied.get_mut();
                let expected = stream.last_seq.wrapping_add(1);
                if cell.seq != expected {
                    return Err(Error::OutOfOrder {
                        cell_id: cell.cell_id,
                        expected,
                        got: cell.seq,
                    });
                }

                stream.buffer.put_slice(&cell.payload);
                stream.last_seq = cell.seq;

                if finished {
                    let state = occupied.remove();
                    return Ok(Some(state.buffer.freeze()));
                }
                Ok(None)
            }
            Entry::Vacant(vacant) => {
                if finished {
                    // Single-cell message; no stream state to retain.
                    return Ok(Some(Bytes::copy_from_slice(&cell.payload)));
                }

                let mut buffer = BytesMut::with_capacity(cell.payload.len());
                buffer.put_slice(&cell.payload);
                vacant.insert(StreamState {
                    buffer,
                    last_seq: cell.seq,
                });
                Ok(None)
            }
        }
    }
}
