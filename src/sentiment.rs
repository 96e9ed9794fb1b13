use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ClassificationError, ScoringError};
use crate::models::Sentiment;

pub const POSITIVE_THRESHOLD: f64 = 0.1;
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Anything that can turn text into a polarity in `[-1, 1]`.
pub trait PolarityScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<f64, ScoringError>;
}

/// Lexicon-based scorer tuned for short study feedback.
pub struct LexiconScorer {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        let words = [
            ("good", 0.7),
            ("great", 0.8),
            ("excellent", 1.0),
            ("amazing", 0.6),
            ("awesome", 1.0),
            ("love", 0.5),
            ("loved", 0.7),
            ("like", 0.3),
            ("liked", 0.4),
            ("enjoy", 0.4),
            ("enjoyed", 0.5),
            ("fun", 0.3),
            ("interesting", 0.5),
            ("helpful", 0.5),
            ("clear", 0.4),
            ("easy", 0.4),
            ("nice", 0.6),
            ("happy", 0.8),
            ("useful", 0.3),
            ("understand", 0.2),
            ("understood", 0.3),
            ("best", 1.0),
            ("perfect", 1.0),
            ("bad", -0.7),
            ("poor", -0.4),
            ("terrible", -1.0),
            ("awful", -1.0),
            ("hate", -0.8),
            ("hated", -0.9),
            ("boring", -1.0),
            ("hard", -0.3),
            ("difficult", -0.5),
            ("confusing", -0.6),
            ("confused", -0.5),
            ("frustrating", -0.7),
            ("stuck", -0.4),
            ("lost", -0.3),
            ("complicated", -0.5),
            ("worst", -1.0),
            ("sad", -0.5),
            ("slow", -0.3),
            ("unclear", -0.5),
            ("useless", -0.5),
        ]
        .into_iter()
        .collect();

        let negations = vec![
            "not", "no", "never", "hardly", "barely", "don't", "dont", "doesn't", "doesnt",
            "didn't", "didnt", "isn't", "isnt", "wasn't", "wasnt", "can't", "cant", "cannot",
            "won't", "wont",
        ];

        let intensifiers = [
            ("very", 1.3),
            ("really", 1.3),
            ("extremely", 1.5),
            ("so", 1.2),
            ("super", 1.4),
            ("quite", 1.1),
            ("slightly", 0.5),
            ("somewhat", 0.7),
        ]
        .into_iter()
        .collect();

        Self {
            words,
            negations,
            intensifiers,
        }
    }

    fn tokens(text: &str) -> Vec<String> {
        text.replace('\u{2019}', "'")
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|token| !token.is_empty())
            .map(|token| token.to_lowercase())
            .collect()
    }
}

impl PolarityScorer for LexiconScorer {
    /// Mean polarity of matched words. A preceding negation flips and halves
    /// a word, a preceding intensifier scales it.
    fn score(&self, text: &str) -> Result<f64, ScoringError> {
        if text.trim().is_empty() {
            return Err(ScoringError("cannot score empty text".to_string()));
        }

        let mut scores = Vec::new();
        let mut negate_next = false;
        let mut intensity = 1.0;

        for token in Self::tokens(text) {
            if self.negations.iter().any(|negation| *negation == token) {
                negate_next = true;
                continue;
            }
            if let Some(multiplier) = self.intensifiers.get(token.as_str()) {
                intensity = *multiplier;
                continue;
            }
            match self.words.get(token.as_str()) {
                Some(polarity) => {
                    let mut value = polarity * intensity;
                    if negate_next {
                        value *= -0.5;
                    }
                    scores.push(value);
                    negate_next = false;
                    intensity = 1.0;
                }
                None => {
                    negate_next = false;
                    intensity = 1.0;
                }
            }
        }

        if scores.is_empty() {
            return Ok(0.0);
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Ok(mean.clamp(-1.0, 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub polarity: f64,
    pub message: &'static str,
}

/// Maps a polarity score onto a label. Both thresholds are exclusive.
pub fn label_for(polarity: f64) -> Sentiment {
    if polarity > POSITIVE_THRESHOLD {
        Sentiment::Positive
    } else if polarity < NEGATIVE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub fn message_for(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "Great! Keep it up!",
        Sentiment::Negative => "We understand this topic is difficult. Keep trying!",
        Sentiment::Neutral => "Thanks for your feedback!",
    }
}

#[derive(Clone)]
pub struct SentimentClassifier {
    scorer: Arc<dyn PolarityScorer>,
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        Self::new(Arc::new(LexiconScorer::new()))
    }
}

impl SentimentClassifier {
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self { scorer }
    }

    pub fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let polarity = self.scorer.score(text)?;
        let sentiment = label_for(polarity);
        Ok(Classification {
            sentiment,
            polarity,
            message: message_for(sentiment),
        })
    }
}
