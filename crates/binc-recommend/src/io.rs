//! CSV loaders

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::interaction::InteractionRecord;
#[cfg(feature = "sentiment")]
use crate::sentiment::Review;

/// Read `user_id,product_id,score` rows; empty cells become `None`
pub fn read_interactions<R: Read>(reader: R) -> Result<Vec<InteractionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let records = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<InteractionRecord>, _>>()?;
    tracing::debug!("Read {} interaction records", records.len());
    Ok(records)
}

pub fn read_interactions_path(path: impl AsRef<Path>) -> Result<Vec<InteractionRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_interactions(file)
}

/// Read `user_id,product_id,rating,comment` rows
#[cfg(feature = "sentiment")]
pub fn read_reviews<R: Read>(reader: R) -> Result<Vec<Review>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Fields)
        .from_reader(reader);
    let reviews = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<Review>, _>>()?;
    tracing::debug!("Read {} reviews", reviews.len());
    Ok(reviews)
}

#[cfg(feature = "sentiment")]
pub fn read_reviews_path(path: impl AsRef<Path>) -> Result<Vec<Review>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_reviews(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecommendError;
    use std::io::Write;

    #[test]
    fn test_read_interactions_with_gaps() {
        let data = "user_id,product_id,score\n1,10,5.0\n2,,3\n 3 , 30 , \n";
        let records = read_interactions(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].validate(0).unwrap().score, 5.0);
        assert_eq!(records[1].product_id, None);
        assert_eq!(records[2].user_id, Some(3));
        assert_eq!(records[2].score, None);
    }

    #[test]
    fn test_read_interactions_rejects_garbage() {
        let data = "user_id,product_id,score\nabc,1,1\n";
        assert!(matches!(
            read_interactions(data.as_bytes()),
            Err(RecommendError::Csv(_))
        ));
    }

    #[test]
    fn test_read_interactions_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "user_id,product_id,score").unwrap();
        writeln!(file, "7,70,1.5").unwrap();
        let records = read_interactions_path(file.path()).unwrap();
        assert_eq!(records[0].user_id, Some(7));
    }

    #[cfg(feature = "sentiment")]
    #[test]
    fn test_read_reviews() {
        let data = "user_id,product_id,rating,comment\n1,2,5,\"Great, would buy again\"\n3,4,1,\n";
        let reviews = read_reviews(data.as_bytes()).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].comment, "Great, would buy again");
        assert_eq!(reviews[1].rating, 1.0);
        assert_eq!(reviews[1].comment, "");
    }
}
