//! # Disguise
//!
//! A covert transport-obfuscation engine that sits between an encrypted
//! carrying transport and an application byte stream. Outbound bytes are
//! re-encoded as fixed-looking but content-variable cells whose sizes,
//! padding, and send timing statistically mimic ordinary web traffic; the
//! inbound side reverses the process deterministically.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Application Layer                     │
//! ├─────────────────────────────────────────────────────────┤
//! │  Manager (orchestration, cover traffic, adaptation)     │
//! ├────────────────┬───────────────┬────────────────────────┤
//! │  Framer /      │  Scheduler    │  Classifier (HMM)      │
//! │  Reassembler   │  (send times) │  (profile switching)   │
//! ├────────────────┴───────────────┴────────────────────────┤
//! │  Profile (size/timing distributions, load estimate)     │
//! ├─────────────────────────────────────────────────────────┤
//! │  Carrying transport (framing + encryption, external)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Goals
//!
//! 1. **Indistinguishability**: cell sizes, padding content, and send
//!    timing follow the statistical shape of the mimicked traffic class
//! 2. **Deterministic receive path**: decoding and reassembly are exact
//!    inverses of the send path, tolerant of interleaved streams
//! 3. **Adaptivity**: a hidden Markov model over observed cell sizes
//!    drives runtime profile switching
//!
//! The engine neither performs nor is responsible for cryptographic
//! confidentiality: cells are handed to the carrying transport as opaque
//! bytes for it to encrypt, and arrive here already decrypted.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod classifier;
pub mod error;
pub mod framing;
pub mod manager;
pub mod profile;
pub mod random;
pub mod scheduler;

pub use classifier::HmmClassifier;
pub use error::{Error, Result};
pub use framing::{Cell, CellType, Framer, Reassembler, CELL_HEADER_LEN};
pub use manager::{Manager, ManagerConfig};
pub use profile::{Profile, TrafficClass};
pub use scheduler::Scheduler;
