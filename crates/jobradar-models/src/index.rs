//! Reverse vacancy index.
//!
//! Maps a composite `{source}_{vacancy_id}` key back to the fingerprint
//! of the search that produced the vacancy. The edge is a string lookup
//! into an independent cache and must tolerate the target's
//! disappearance: a hit whose search entry is gone is stale and gets
//! deleted by the reader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value stored in the reverse-index cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyIndexEntry {
    /// Fingerprint of the parent search
    pub search_key: String,
    /// Source tag the vacancy came from
    pub source: String,
    /// Position inside that source's vacancy list as returned
    pub position: usize,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl VacancyIndexEntry {
    pub fn new(search_key: impl Into<String>, source: impl Into<String>, position: usize) -> Self {
        Self {
            search_key: search_key.into(),
            source: source.into(),
            position,
            created_at: Utc::now(),
        }
    }
}

/// Key under which a vacancy is reverse-indexed.
pub fn composite_key(source: &str, vacancy_id: &str) -> String {
    format!("{source}_{vacancy_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_shape() {
        assert_eq!(composite_key("hh", "42"), "hh_42");
    }
}
