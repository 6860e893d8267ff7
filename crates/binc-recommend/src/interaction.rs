//! Interaction inputs and recommendation outputs

use serde::{Deserialize, Serialize};

use crate::error::{RecommendError, Result};

/// External user identifier
pub type UserId = i64;

/// External product identifier
pub type ProductId = i64;

/// An observed (user, product, score) triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub score: f64,
}

impl Interaction {
    pub fn new(user_id: UserId, product_id: ProductId, score: f64) -> Self {
        Self {
            user_id,
            product_id,
            score,
        }
    }
}

impl From<(UserId, ProductId, f64)> for Interaction {
    fn from((user_id, product_id, score): (UserId, ProductId, f64)) -> Self {
        Self::new(user_id, product_id, score)
    }
}

/// Loosely typed interaction as read from CSV or JSON
///
/// Every field is optional so that incomplete rows survive parsing and are
/// rejected at training time with the offending field named.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: Option<UserId>,
    pub product_id: Option<ProductId>,
    pub score: Option<f64>,
}

impl InteractionRecord {
    /// Validate the record at position `index` of its batch
    pub fn validate(&self, index: usize) -> Result<Interaction> {
        let user_id = self.user_id.ok_or(RecommendError::MissingField {
            index,
            field: "user_id",
        })?;
        let product_id = self.product_id.ok_or(RecommendError::MissingField {
            index,
            field: "product_id",
        })?;
        let score = self.score.ok_or(RecommendError::MissingField {
            index,
            field: "score",
        })?;
        if !score.is_finite() {
            return Err(RecommendError::InvalidScore { index });
        }
        Ok(Interaction::new(user_id, product_id, score))
    }
}

impl From<Interaction> for InteractionRecord {
    fn from(interaction: Interaction) -> Self {
        Self {
            user_id: Some(interaction.user_id),
            product_id: Some(interaction.product_id),
            score: Some(interaction.score),
        }
    }
}

/// Validate a whole batch of records, failing on the first bad one
pub fn validate_records(records: &[InteractionRecord]) -> Result<Vec<Interaction>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| record.validate(index))
        .collect()
}

/// Where a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Collaborative filtering backend
    Collaborative,
    /// Popularity padding
    Popular,
}

/// A scored product recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub score: f64,
    pub source: RecommendationSource,
}

impl Recommendation {
    pub fn collaborative(product_id: ProductId, score: f64) -> Self {
        Self {
            product_id,
            score,
            source: RecommendationSource::Collaborative,
        }
    }

    pub fn popular(product_id: ProductId, score: f64) -> Self {
        Self {
            product_id,
            score,
            source: RecommendationSource::Popular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_complete_record() {
        let record = InteractionRecord {
            user_id: Some(1),
            product_id: Some(2),
            score: Some(3.5),
        };
        let interaction = record.validate(0).unwrap();
        assert_eq!(interaction, Interaction::new(1, 2, 3.5));
    }

    #[test]
    fn test_validate_missing_field() {
        let record = InteractionRecord {
            user_id: Some(1),
            product_id: None,
            score: Some(1.0),
        };
        match record.validate(4) {
            Err(RecommendError::MissingField { index, field }) => {
                assert_eq!(index, 4);
                assert_eq!(field, "product_id");
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_non_finite_score() {
        let record = InteractionRecord {
            user_id: Some(1),
            product_id: Some(1),
            score: Some(f64::NAN),
        };
        assert!(matches!(
            record.validate(0),
            Err(RecommendError::InvalidScore { index: 0 })
        ));
    }

    #[test]
    fn test_validate_records_stops_at_first_error() {
        let records = vec![
            InteractionRecord::from(Interaction::new(1, 1, 1.0)),
            InteractionRecord::default(),
        ];
        assert!(matches!(
            validate_records(&records),
            Err(RecommendError::MissingField { index: 1, field: "user_id" })
        ));
    }
}
