//! Serialization of fields.
//!
//! [`Input`] and [`Output`] are in-memory token streams with a text and a
//! binary mode. Reading and writing whole fields, including their ignored
//! marker and connection clause, lives on [`FieldGraph`](crate::FieldGraph)
//! (see `field_io`).

mod field_io;
mod input;
mod output;

use bitflags::bitflags;

pub use input::Input;
pub use output::Output;

bitflags! {
    /// Flags word following a field value in binary form.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FileFlags: u32 {
        const IGNORED   = 0x1;
        const CONNECTED = 0x2;
        const DEFAULT   = 0x4;
    }
}
