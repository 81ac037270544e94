//! JSON serialization for files written by the client.
//!
//! Output is pretty-printed with 2-space indentation and ends with a
//! newline, so stored files stay readable and diff cleanly.

mod json;

pub use json::*;
