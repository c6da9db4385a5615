//! Types, conversion functions, parsing, and encoding for the LISP control plane.

pub mod address;
pub mod control;
pub mod locator;
pub mod mapping;
pub mod mapsock;
pub mod record;
pub(crate) mod utils;
pub mod wire_encoding;
