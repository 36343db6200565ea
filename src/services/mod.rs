//! Clients for the hosted services tools depend on, plus local sentiment scoring.

pub mod search;
pub mod sentiment;
pub mod translate;

pub use search::{DuckDuckGoSearch, SearchEngine};
pub use sentiment::{SentimentAnalyzer, SentimentLabel, SentimentScore};
pub use translate::{GoogleTranslator, Translator};
