//! Sentiment scoring for English text with the VADER lexicon and rules.
//!
//! The compound score is VADER's normalized sum in `[-1, 1]`; labels use the
//! usual `±0.05` cut-offs.

use serde::Serialize;
use vader_sentiment::SentimentIntensityAnalyzer;

const LABEL_THRESHOLD: f64 = 0.05;

/// Polarity bucket for a compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_compound(compound: f64) -> Self {
        if compound > LABEL_THRESHOLD {
            Self::Positive
        } else if compound < -LABEL_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentScore {
    /// Normalized score in `[-1, 1]`.
    pub compound: f64,
    pub label: SentimentLabel,
}

/// Stateless scorer over the bundled VADER lexicon.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, text: &str) -> SentimentScore {
        let analyzer = SentimentIntensityAnalyzer::new();
        let scores = analyzer.polarity_scores(text);
        let compound = scores.get("compound").copied().unwrap_or_default();
        SentimentScore {
            compound,
            label: SentimentLabel::from_compound(compound),
        }
    }
}
