//! The uniform interface every job-board source implements.

use async_trait::async_trait;

use jobradar_models::{SearchParams, Vacancy, VacancyDetails};

use crate::error::SourceError;

/// One external job board, wrapped in the shared execution template.
///
/// Concrete sources own a [`crate::SourceClient`] and contribute the
/// source-specific pieces: URL building, payload decoding and conversion
/// to the normalized models.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable tag identifying the source ("hh", "superjob").
    fn name(&self) -> &str;

    /// Endpoint probed by the health supervisor.
    fn health_endpoint(&self) -> &str;

    /// Run a vacancy search with the normalized parameters.
    async fn search_vacancies(&self, params: &SearchParams) -> Result<Vec<Vacancy>, SourceError>;

    /// Fetch the detailed payload for a single vacancy.
    async fn fetch_details(&self, vacancy_id: &str) -> Result<VacancyDetails, SourceError>;

    /// Stop background tasks owned by the adapter (the rate limiter).
    fn stop(&self);
}
