//! Normalized vacancies and per-source search results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A vacancy normalized to the common shape shared by all sources.
///
/// Created by adapter conversion, owned by the search cache entry and
/// never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancy {
    /// Source-scoped vacancy id
    pub id: String,
    /// Job title
    pub title: String,
    /// Employer name
    pub company: String,
    /// Human-readable salary, absent when the source did not publish one
    pub salary: Option<String>,
    /// ISO-ish currency code as reported by the source
    pub currency: String,
    /// Location name
    pub location: String,
    /// Link to the posting
    pub url: String,
    /// Tag of the producing source adapter ("hh", "superjob", ...)
    pub source: String,
    /// Raw description, may contain markup
    pub description: String,
}

/// Outcome of one search against a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    /// Source tag
    pub source: String,
    /// Vacancies returned by the source, empty on failure
    pub vacancies: Vec<Vacancy>,
    /// Fingerprint of the parent search
    pub search_key: String,
    /// Error message when the call failed
    pub error: Option<String>,
    /// Time the source took to answer
    pub duration: Duration,
}

impl SourceResult {
    /// A result counts as successful only when the call did not error
    /// and returned at least one vacancy. Only successful results may
    /// be cached.
    pub fn is_successful(&self) -> bool {
        self.error.is_none() && !self.vacancies.is_empty()
    }

    /// Build a failed result carrying only the error message.
    pub fn failed(source: impl Into<String>, search_key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            vacancies: Vec::new(),
            search_key: search_key.into(),
            error: Some(error.into()),
            duration: Duration::ZERO,
        }
    }
}
