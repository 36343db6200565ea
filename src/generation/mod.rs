//! Text and streaming generation.

pub mod convenience;
pub mod stream;
pub mod text;

pub use convenience::complete;
pub use stream::{collect_stream, stream_text};
pub use text::generate_text;
