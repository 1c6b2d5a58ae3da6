//! Search façade over the parser manager.

use std::sync::Arc;

use tracing::info;

use jobradar_manager::{ManagerError, ParserManager, SearchOutcome};
use jobradar_models::{composite_key, SearchParams, Vacancy, VacancyDetails};

/// Why a brief lookup could not be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No reverse-index entry for the composite key.
    NotFound,
    /// The index pointed at a search entry that has expired; the stale
    /// index key has been deleted and the caller should re-run the
    /// search.
    Stale,
}

/// Thin API the HTTP handlers talk to.
#[derive(Clone)]
pub struct SearchService {
    manager: Arc<ParserManager>,
}

impl SearchService {
    pub fn new(manager: Arc<ParserManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ParserManager> {
        &self.manager
    }

    /// Passthrough to the manager's queued search path.
    pub async fn search_vacancies(
        &self,
        params: SearchParams,
    ) -> Result<SearchOutcome, ManagerError> {
        self.manager.search_vacancies(params).await
    }

    /// Resolve one already-found vacancy through the reverse index.
    ///
    /// A reverse-index hit whose search entry is gone is stale: the
    /// index key is deleted before reporting, so the next search
    /// rebuilds it.
    pub fn brief_vacancy_details(
        &self,
        source: &str,
        vacancy_id: &str,
    ) -> Result<Vacancy, LookupError> {
        let key = composite_key(source, vacancy_id);

        let Some(entry) = self.manager.index_cache().get(&key) else {
            return Err(LookupError::NotFound);
        };

        let Some(results) = self.manager.search_cache().get(&entry.search_key) else {
            self.manager.index_cache().remove(&key);
            info!(key = %key, "deleted stale reverse-index entry");
            return Err(LookupError::Stale);
        };

        results
            .iter()
            .find(|result| result.source == source)
            .and_then(|result| result.vacancies.iter().find(|v| v.id == vacancy_id))
            .cloned()
            .ok_or(LookupError::NotFound)
    }

    /// Full details for one vacancy; may trigger an external fetch.
    pub async fn vacancy_details(
        &self,
        source: &str,
        vacancy_id: &str,
    ) -> Result<VacancyDetails, ManagerError> {
        self.manager.execute_fetch_details(source, vacancy_id).await
    }

    /// Forward shutdown to the manager.
    pub async fn stop_services(&self) {
        self.manager.shutdown().await;
    }
}
