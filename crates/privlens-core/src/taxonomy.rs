//! Risk ratings and the enriched-label entry attached to classifier output.

use serde::{Deserialize, Serialize};

/// Risk rating attached to a taxonomy label.
///
/// `Blocker` is the most severe; `Neutral` carries no known risk signal
/// and is the fallback whenever neither taxonomy source says otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Bad,
    Blocker,
    #[default]
    Neutral,
}

impl Rating {
    /// Parse a rating cell after trimming and lowercasing.
    ///
    /// Only the four known values are accepted; anything else returns
    /// `None` so the caller can fall back to the numeric score, if any.
    pub fn parse(s: &str) -> Option<Rating> {
        match s.trim().to_lowercase().as_str() {
            "good" => Some(Rating::Good),
            "bad" => Some(Rating::Bad),
            "blocker" => Some(Rating::Blocker),
            "neutral" => Some(Rating::Neutral),
            _ => None,
        }
    }

    /// Bucket a numeric severity score into a rating. Higher is worse.
    ///
    /// `>= 0.75` blocker, `>= 0.40` bad, `>= 0.15` good, below that neutral.
    pub fn from_score(score: f64) -> Rating {
        if score >= 0.75 {
            Rating::Blocker
        } else if score >= 0.40 {
            Rating::Bad
        } else if score >= 0.15 {
            Rating::Good
        } else {
            Rating::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::Bad => "bad",
            Rating::Blocker => "blocker",
            Rating::Neutral => "neutral",
        }
    }
}

/// Enriched metadata for one classifier label.
///
/// Built by merging the category source (shape: category, sub-category,
/// fine-grained, optional action) with the rating source (rating, optional
/// action). Labels unknown to both sources resolve to [`TaxonomyEntry::unmapped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub category: String,
    pub sub_category: String,
    pub fine_grained: String,
    pub rating: Rating,
    pub action: Option<String>,
}

impl TaxonomyEntry {
    /// The entry every unmapped label resolves to.
    pub fn unmapped() -> TaxonomyEntry {
        TaxonomyEntry {
            category: "Other".to_string(),
            sub_category: "Unmapped".to_string(),
            fine_grained: "Unmapped".to_string(),
            rating: Rating::Neutral,
            action: Some("Review this clause manually.".to_string()),
        }
    }
}

impl Default for TaxonomyEntry {
    fn default() -> Self {
        TaxonomyEntry::unmapped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_only_known_ratings() {
        assert_eq!(Rating::parse("good"), Some(Rating::Good));
        assert_eq!(Rating::parse(" BLOCKER "), Some(Rating::Blocker));
        assert_eq!(Rating::parse("Bad"), Some(Rating::Bad));
        assert_eq!(Rating::parse("neutral"), Some(Rating::Neutral));
        assert_eq!(Rating::parse("severe"), None);
        assert_eq!(Rating::parse(""), None);
    }

    #[test]
    fn score_buckets_at_fixed_thresholds() {
        assert_eq!(Rating::from_score(0.9), Rating::Blocker);
        assert_eq!(Rating::from_score(0.5), Rating::Bad);
        assert_eq!(Rating::from_score(0.2), Rating::Good);
        assert_eq!(Rating::from_score(0.1), Rating::Neutral);
        assert_eq!(Rating::from_score(0.0), Rating::Neutral);
    }

    #[test]
    fn score_boundaries_are_inclusive() {
        assert_eq!(Rating::from_score(0.75), Rating::Blocker);
        assert_eq!(Rating::from_score(0.7499), Rating::Bad);
        assert_eq!(Rating::from_score(0.40), Rating::Bad);
        assert_eq!(Rating::from_score(0.3999), Rating::Good);
        assert_eq!(Rating::from_score(0.15), Rating::Good);
        assert_eq!(Rating::from_score(0.1499), Rating::Neutral);
    }

    #[test]
    fn rating_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Blocker).unwrap(), "\"blocker\"");
        let parsed: Rating = serde_json::from_str("\"good\"").unwrap();
        assert_eq!(parsed, Rating::Good);
    }

    #[test]
    fn unmapped_entry_shape() {
        let entry = TaxonomyEntry::unmapped();
        assert_eq!(entry.category, "Other");
        assert_eq!(entry.sub_category, "Unmapped");
        assert_eq!(entry.fine_grained, "Unmapped");
        assert_eq!(entry.rating, Rating::Neutral);
        assert_eq!(entry.action.as_deref(), Some("Review this clause manually."));
    }
}
