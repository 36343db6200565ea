//! Small helpers: URL extraction, text truncation, cheap randomness.

pub mod random;
pub mod text;
pub mod url;
