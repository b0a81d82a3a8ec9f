//! Bit packing primitives and the typed input buffer for inputsync.
//!
//! This crate provides [`BitWriter`] and [`BitReader`] for bit-level encoding
//! and decoding, and [`InputBuffer`], the per-tick payload container that
//! input capture code writes and simulation code reads back.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads are bounds-checked, writes grow on demand.
//! - **No domain knowledge** - This crate knows nothing about ticks, packets, or peers.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{CompressionLevel, InputBuffer};
//!
//! let mut input = InputBuffer::new();
//! input.begin_write();
//! input.add_bool(true).unwrap();
//! input.add_int(-3, CompressionLevel::Level3).unwrap();
//!
//! input.begin_read();
//! assert!(input.read_bool().unwrap());
//! assert_eq!(input.read_int(CompressionLevel::Level3).unwrap(), -3);
//! assert_eq!(input.size_in_bytes(), 2);
//! ```

mod error;
mod input_buffer;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use input_buffer::{bits_taken, CompressionLevel, DataType, InputBuffer};
pub use reader::BitReader;
pub use writer::BitWriter;
