// ABOUTME: Record type for the aggregation utility and a random generator.
// ABOUTME: Generated data uses a fixed roster of categories and small values.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Categories used by `generate_records`.
pub const CATEGORIES: [&str; 4] = ["Ivanov I.I.", "Petrov P.P.", "Sidorov S.S.", "Kuznetsov A.A."];

/// One immutable input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Who or what the row belongs to.
    pub category: String,

    /// Secondary key the sum filters on.
    pub group_key: i64,

    /// The summed field.
    pub value: i64,
}

impl Record {
    /// Create a record.
    pub fn new(category: impl Into<String>, group_key: i64, value: i64) -> Self {
        Self {
            category: category.into(),
            group_key,
            value,
        }
    }

    /// Whether this record belongs to `(category, group_key)`.
    pub fn matches(&self, category: &str, group_key: i64) -> bool {
        self.group_key == group_key && self.category == category
    }
}

/// Generate `count` records drawn from `CATEGORIES`, group keys 1-4, and
/// values 1-3.
pub fn generate_records<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Record> {
    (0..count)
        .map(|_| {
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            Record::new(category, rng.gen_range(1..=4), rng.gen_range(1..=3))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_records_stay_in_domain() {
        let mut rng = StdRng::seed_from_u64(5);
        let records = generate_records(500, &mut rng);
        assert_eq!(records.len(), 500);
        for record in &records {
            assert!(CATEGORIES.contains(&record.category.as_str()));
            assert!((1..=4).contains(&record.group_key));
            assert!((1..=3).contains(&record.value));
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let a = generate_records(50, &mut StdRng::seed_from_u64(11));
        let b = generate_records(50, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn test_matches_needs_both_keys() {
        let record = Record::new("Petrov P.P.", 2, 3);
        assert!(record.matches("Petrov P.P.", 2));
        assert!(!record.matches("Petrov P.P.", 1));
        assert!(!record.matches("Ivanov I.I.", 2));
    }
}
