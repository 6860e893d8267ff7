//! Review sentiment
//!
//! Scores free-text review comments against a VADER-format valence lexicon.
//! When no lexicon is loaded the star rating stands in for the text.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interaction::{ProductId, UserId};
use crate::probe::{DependencyManager, Library, VADER_LEXICON};

/// Normalization constant of the compound score
const COMPOUND_ALPHA: f64 = 15.0;

/// Valence multiplier applied to the token following a negation
const NEGATION_SCALAR: f64 = -0.74;

/// Compound scores within this distance of zero are neutral
const NEUTRAL_BAND: f64 = 0.05;

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "cannot",
    "can't", "cant", "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt",
    "wasn't", "wasnt", "won't", "wont", "aren't", "arent", "shouldn't", "wouldn't", "couldn't",
    "hasn't", "haven't", "hadn't", "without",
];

/// Token valences
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    valences: HashMap<String, f64>,
}

impl Lexicon {
    /// Parse `token<TAB>mean[<TAB>...]` lines; malformed lines are skipped
    pub fn parse(text: &str) -> Self {
        let mut valences = HashMap::new();
        let mut skipped = 0usize;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let mut fields = line.split('\t');
            let token = fields.next().map(str::trim).filter(|t| !t.is_empty());
            let valence = fields.next().and_then(|v| v.trim().parse::<f64>().ok());
            match (token, valence) {
                (Some(token), Some(valence)) if valence.is_finite() => {
                    valences.insert(token.to_lowercase(), valence);
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!("Skipped {} malformed lexicon lines", skipped);
        }
        Self { valences }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let lexicon = Self::parse(&text);
        tracing::info!(
            "Loaded sentiment lexicon with {} entries from {:?}",
            lexicon.len(),
            path.as_ref()
        );
        Ok(lexicon)
    }

    pub fn valence(&self, token: &str) -> Option<f64> {
        self.valences.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }
}

impl FromIterator<(String, f64)> for Lexicon {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            valences: iter
                .into_iter()
                .map(|(token, valence)| (token.to_lowercase(), valence))
                .collect(),
        }
    }
}

/// A product review with a 1-5 star rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
}

impl Review {
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        rating: f64,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            product_id,
            rating,
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if score < -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Label from stars alone: above 3 is positive, below 3 negative
    pub fn from_rating(rating: f64) -> Self {
        if rating > 3.0 {
            SentimentLabel::Positive
        } else if rating < 3.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        })
    }
}

/// Sentiment of one review
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// Compound score in [-1, 1]
    pub score: f64,
    pub label: SentimentLabel,
    /// Agreement between the text and the star rating, in [0, 1]
    pub consistency: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer {
    lexicon: Option<Lexicon>,
}

impl SentimentAnalyzer {
    pub fn new(lexicon: Option<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Rating-only analyzer
    pub fn without_lexicon() -> Self {
        Self { lexicon: None }
    }

    /// Load the lexicon from the probe's data directory when the lexicon
    /// capability is available. Any failure degrades to rating-only scoring.
    pub fn from_probe(probe: &DependencyManager) -> Self {
        if !probe.library_available(Library::Lexicon) {
            tracing::info!("Lexicon support unavailable, scoring reviews from ratings");
            return Self::without_lexicon();
        }
        let path = probe.resource_path(&VADER_LEXICON);
        match Lexicon::load(&path) {
            Ok(lexicon) if !lexicon.is_empty() => Self::new(Some(lexicon)),
            Ok(_) => {
                tracing::warn!("Sentiment lexicon at {:?} is empty", path);
                Self::without_lexicon()
            }
            Err(e) => {
                tracing::warn!("Failed to load sentiment lexicon {:?}: {}", path, e);
                Self::without_lexicon()
            }
        }
    }

    pub fn has_lexicon(&self) -> bool {
        self.lexicon.is_some()
    }

    pub fn analyze(&self, review: &Review) -> SentimentScore {
        let Some(lexicon) = &self.lexicon else {
            return SentimentScore {
                score: ((review.rating - 3.0) / 2.0).clamp(-1.0, 1.0),
                label: SentimentLabel::from_rating(review.rating),
                consistency: 1.0,
            };
        };

        let comment = review.comment.trim();
        let score = if comment.is_empty() {
            0.0
        } else {
            compound(lexicon, comment)
        };
        let consistency = 1.0 - ((review.rating - 1.0) / 4.0 - (score + 1.0) / 2.0).abs();
        SentimentScore {
            score,
            label: SentimentLabel::from_score(score),
            consistency: consistency.clamp(0.0, 1.0),
        }
    }

    pub fn analyze_all(&self, reviews: &[Review]) -> Vec<SentimentScore> {
        reviews.iter().map(|r| self.analyze(r)).collect()
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
}

/// Summed valence normalized into [-1, 1]
fn compound(lexicon: &Lexicon, text: &str) -> f64 {
    let mut sum = 0.0;
    let mut negate = false;
    for token in tokens(text) {
        let valence = lexicon.valence(&token).unwrap_or(0.0);
        sum += if negate { valence * NEGATION_SCALAR } else { valence };
        negate = NEGATORS.contains(&token.as_str());
    }
    if sum == 0.0 {
        return 0.0;
    }
    (sum / (sum * sum + COMPOUND_ALPHA).sqrt()).clamp(-1.0, 1.0)
}
