//! Fragmentation of application data into cells.

use bytes::Bytes;
use rand::Rng;

use crate::framing::cell::{flags, Cell};
use crate::framing::padding::shaped_padding;
use crate::framing::CELL_HEADER_LEN;
use crate::profile::Profile;
use crate::random::SecureRandom;

/// Fragments application data into cells and builds cover cells.
///
/// The sequence counter is global to the framer: it keeps increasing
/// across messages instead of resetting per stream, so fragments of
/// consecutive messages carry strictly increasing sequence numbers.
#[derive(Debug)]
pub struct Framer {
    profile: Profile,
    seq: u32,
}

impl Framer {
    /// Create a framer using the given traffic profile.
    pub fn new(profile: Profile) -> Self {
        Self { profile, seq: 0 }
    }

    /// Replace the active traffic profile.
    ///
    /// Affects subsequently produced cells only.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = profile;
    }

    /// The active traffic profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Fragment application data into an ordered run of data cells.
    ///
    /// All fragments share one freshly drawn cell ID and the final cell
    /// carries the end-of-stream flag. Empty input produces no cells.
    pub fn fragment(&mut self, data: &[u8]) -> Vec<Cell> {
        let cell_id = self.generate_cell_id();
        let shaping_class = self.profile.primary_class();

        let mut cells = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let remaining = data.len() - offset;
            let payload_len = self.profile.next_payload_length().min(remaining);

            let total_size = self.profile.next_cell_size();
            let padding_len = total_size.saturating_sub(CELL_HEADER_LEN + payload_len);
            let padding = shaped_padding(padding_len, shaping_class);
            let rand_offset = random_offset(payload_len, padding_len);

            let seq = self.seq;
            self.seq = self.seq.wrapping_add(1);

            let payload = Bytes::copy_from_slice(&data[offset..offset + payload_len]);
            let mut cell = Cell::data(cell_id, seq, payload, padding, rand_offset);
            if payload_len == remaining {
                cell = cell.with_flag(flags::END_OF_STREAM);
            }
            cells.push(cell);

            offset += payload_len;
        }

        cells
    }

    /// Build one dummy cell of cover traffic.
    pub fn dummy_cell(&self) -> Cell {
        let total_size = self.profile.next_cell_size();
        let padding_len = total_size.saturating_sub(CELL_HEADER_LEN);
        let padding = shaped_padding(padding_len, self.profile.primary_class());
        let rand_offset = random_offset(0, padding_len);
        Cell::dummy(padding, rand_offset)
    }

    /// Draw a random nonzero cell ID; zero is reserved for cover cells.
    fn generate_cell_id(&self) -> u16 {
        loop {
            let id = SecureRandom::u16();
            if id != 0 {
                return id;
            }
        }
    }
}

/// Draw a payload offset that keeps the payload window inside the content
/// region and the offset itself strictly below the region's length.
fn random_offset(payload_len: usize, padding_len: usize) -> u16 {
    let content_len = payload_len + padding_len;
    if content_len == 0 {
        return 0;
    }
    let upper = content_len - payload_len.max(1);
    rand::thread_rng().gen_range(0..=upper) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::CellType;

    #[test]
    fn test_fragment_covers_input() {
        let mut framer = Framer::new(Profile::web_browsing());
        let data: Vec<u8> = (0..10_000).map(|value| (value % 251) as u8).collect();

        let cells = framer.fragment(&data);
        assert!(!cells.is_empty());

        let rebuilt: Vec<u8> = cells
            .iter()
            .flat_map(|cell| cell.payload.iter().copied())
            .collect();
        assert_eq!(rebuilt, data);

        // One shared nonzero cell ID, increasing seq, flag only on the last.
        let cell_id = cells[0].cell_id;
        assert_ne!(cell_id, 0);
        for (index, cell) in cells.iter().enumerate() {
            assert_eq!(cell.cell_id, cell_id);
            assert_eq!(cell.cell_type, CellType::Data);
            assert_eq!(cell.seq, index as u32);
            let is_last = index == cells.len() - 1;
            assert_eq!(cell.has_flag(flags::END_OF_STREAM), is_last);
        }
    }

    #[test]
    fn test_fragment_respects_cell_invariants() {
        let mut framer = Framer::new(Profile::dynamic());
        let data = vec![0x42u8; 50_000];

        for cell in framer.fragment(&data) {
            let content_len = cell.content_len();
            let offset = cell.rand_offset as usize;
            assert!(offset + cell.payload.len() <= content_len);
            if content_len > 0 {
                assert!(offset < content_len);
            } else {
                assert_eq!(offset, 0);
            }
            assert!(cell.wire_size() <= framer.profile().max_cell_size);
        }
    }

    #[test]
    fn test_seq_continues_across_messages() {
        let mut framer = Framer::new(Profile::web_browsing());
        let first = framer.fragment(&[1u8; 3000]);
        let second = framer.fragment(&[2u8; 3000]);

        let last_seq = first.last().unwrap().seq;
        assert_eq!(second[0].seq, last_seq + 1);
        // A fresh message draws a fresh cell ID.
        assert_ne!(first[0].cell_id, 0);
        assert_ne!(second[0].cell_id, 0);
    }

    #[test]
    fn test_fragment_empty_input() {
        let mut framer = Framer::new(Profile::web_browsing());
        assert!(framer.fragment(&[]).is_empty());
    }

    #[test]
    fn test_dummy_cell() {
        let framer = Framer::new(Profile::video_streaming());
        let cell = framer.dummy_cell();

        assert_eq!(cell.cell_id, 0);
        assert_eq!(cell.cell_type, CellType::Dummy);
        assert_eq!(cell.seq, 0);
        assert!(cell.payload.is_empty());
        assert!(cell.wire_size() <= framer.profile().max_cell_size);
        if cell.content_len() > 0 {
            assert!((cell.rand_offset as usize) < cell.content_len());
        }
    }

    #[test]
    fn test_random_offset_bounds() {
        assert_eq!(random_offset(0, 0), 0);
        // No padding: the window starts at zero.
        assert_eq!(random_offset(10, 0), 0);

        for _ in 0..1000 {
            let offset = random_offset(5, 20) as usize;
            assert!(offset + 5 <= 25);

            let offset = random_offset(0, 30) as usize;
            assert!(offset < 30);
        }
    }
}
