//! Cell framing: wire codec, padding, fragmentation, reassembly.
//!
//! This module owns the byte-exact wire format of the obfuscation layer:
//!
//! 1. **Cell codec**: fixed big-endian header plus a content region in
//!    which the payload sits at a randomized offset surrounded by padding
//! 2. **Framer**: fragments application data into profile-shaped cells and
//!    builds dummy cells for cover traffic
//! 3. **Padding**: content-aware padding that scans as encoded text or
//!    structured header noise instead of uniform randomness
//! 4. **Reassembler**: per-stream reconstruction of the original byte
//!    sequence, rejecting out-of-order and duplicate cells

mod cell;
mod framer;
mod padding;
mod reassembler;

pub use cell::{flags, Cell, CellType};
pub use framer::Framer;
pub use padding::shaped_padding;
pub use reassembler::Reassembler;

/// Fixed cell header length in bytes.
pub const CELL_HEADER_LEN: usize = 22;
