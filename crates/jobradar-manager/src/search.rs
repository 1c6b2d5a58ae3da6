//! Search execution: cache probe, source selection, fan-out, caching
//! and the result policy. The details-fetch path lives here too.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use jobradar_models::{composite_key, SearchParams, SourceResult, VacancyDetails, VacancyIndexEntry};
use jobradar_sources::{BreakerError, SourceAdapter};

use crate::error::ManagerError;
use crate::jobs::{DetailsReply, SearchOutcome, SearchReply, SearchWarning};
use crate::manager::ParserManager;

impl ParserManager {
    /// Gate one search through the global semaphore and circuit breaker,
    /// then apply the result policy.
    pub(crate) async fn search_with_gate(&self, params: &SearchParams) -> SearchReply {
        let _slot = self.acquire_slot().await?;

        let attempt = self.breaker.execute(|| self.execute_search(params)).await;

        let (results, error) = match attempt {
            Ok(results) => (results, None),
            Err(BreakerError::Open) => (Vec::new(), Some(ManagerError::CircuitOpen)),
            Err(BreakerError::Throttled) => (Vec::new(), Some(ManagerError::Throttled)),
            Err(BreakerError::Service(err)) => (Vec::new(), Some(err)),
        };

        self.apply_result_policy(results, error, params)
    }

    /// Gate one details fetch through the global semaphore and breaker.
    pub(crate) async fn details_with_gate(&self, source: &str, vacancy_id: &str) -> DetailsReply {
        let _slot = self.acquire_slot().await?;

        let attempt = self
            .breaker
            .execute(|| self.fetch_details_inner(source, vacancy_id))
            .await;

        match attempt {
            Ok(details) => Ok(details),
            Err(BreakerError::Open) => Err(ManagerError::CircuitOpen),
            Err(BreakerError::Throttled) => Err(ManagerError::Throttled),
            Err(BreakerError::Service(err)) => Err(err),
        }
    }

    /// The fan-out proper. A cache hit short-circuits before any source
    /// or health state is touched. Successful per-source results are
    /// cached and reverse-indexed; a fan-out with zero successes is
    /// never cached so the next call retries.
    async fn execute_search(&self, params: &SearchParams) -> Result<Vec<SourceResult>, ManagerError> {
        let search_key = params.fingerprint();

        if let Some(cached) = self.search_cache.get(&search_key) {
            debug!(search_key = %search_key, "search cache hit");
            return Ok(cached);
        }

        let selected = self.select_sources();
        if selected.is_empty() {
            return Err(ManagerError::NoSources);
        }

        let branches = self.fan_out(params, &search_key, &selected).await;
        let results: Vec<SourceResult> = branches.iter().map(|b| b.result.clone()).collect();

        let successful: Vec<SourceResult> = results
            .iter()
            .filter(|r| r.is_successful())
            .cloned()
            .collect();

        if successful.is_empty() {
            if results.iter().all(|r| r.error.is_some()) {
                // Total fan-out failure. Surfacing it as an error (rather
                // than a list of failed results) lets the global breaker
                // count it and the result policy try the cache fallback.
                return Err(aggregate_failure(&branches));
            }
            // Clean but empty answers: nothing worth caching, so the
            // next call retries the sources.
            return Ok(results);
        }

        self.search_cache
            .insert(search_key.clone(), successful.clone(), self.config.search_ttl);
        self.build_reverse_index(&search_key, &successful);
        info!(
            search_key = %search_key,
            sources = successful.len(),
            "search results cached"
        );

        Ok(results)
    }

    /// Healthy sources per the supervisor; when none qualify, fall back
    /// to every configured source rather than failing outright.
    fn select_sources(&self) -> Vec<Arc<dyn SourceAdapter>> {
        let healthy = self.health.healthy_sources();
        if healthy.is_empty() {
            warn!("no healthy sources reported, falling back to all configured sources");
            return self.sources.clone();
        }

        self.sources
            .iter()
            .filter(|s| healthy.iter().any(|name| name == s.name()))
            .map(Arc::clone)
            .collect()
    }

    /// One task per source; each branch runs under the fan-out timeout,
    /// reports its outcome to the health supervisor and pushes its
    /// result into the aggregation channel. The channel closes once
    /// every branch sender is dropped.
    async fn fan_out(
        &self,
        params: &SearchParams,
        search_key: &str,
        selected: &[Arc<dyn SourceAdapter>],
    ) -> Vec<BranchOutcome> {
        let (tx, mut rx) = mpsc::channel(selected.len());
        let timeout = self.config.fanout_timeout;

        for adapter in selected {
            let adapter = Arc::clone(adapter);
            let health = Arc::clone(&self.health);
            let params = params.clone();
            let search_key = search_key.to_string();
            let tx = tx.clone();

            tokio::spawn(async move {
                let name = adapter.name().to_string();
                let start = Instant::now();

                let outcome = match tokio::time::timeout(timeout, adapter.search_vacancies(&params)).await {
                    Ok(Ok(vacancies)) => {
                        health.update_status(&name, true, None);
                        BranchOutcome {
                            result: SourceResult {
                                source: name.clone(),
                                vacancies,
                                search_key,
                                error: None,
                                duration: start.elapsed(),
                            },
                            breaker_rejected: false,
                        }
                    }
                    Ok(Err(err)) => {
                        health.update_status(&name, false, Some(err.to_string()));
                        BranchOutcome {
                            breaker_rejected: err.is_breaker_rejection(),
                            result: SourceResult {
                                source: name.clone(),
                                vacancies: Vec::new(),
                                search_key,
                                error: Some(err.to_string()),
                                duration: start.elapsed(),
                            },
                        }
                    }
                    Err(_) => {
                        health.update_status(&name, false, Some("timeout exceeded".to_string()));
                        BranchOutcome {
                            result: SourceResult {
                                source: name.clone(),
                                vacancies: Vec::new(),
                                search_key,
                                error: Some("timeout exceeded".to_string()),
                                duration: start.elapsed(),
                            },
                            breaker_rejected: false,
                        }
                    }
                };

                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(selected.len());
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn build_reverse_index(&self, search_key: &str, successful: &[SourceResult]) {
        for result in successful {
            for (position, vacancy) in result.vacancies.iter().enumerate() {
                let key = composite_key(&vacancy.source, &vacancy.id);
                let entry = VacancyIndexEntry::new(search_key, &result.source, position);
                self.index_cache.insert(key, entry, self.config.index_ttl);
            }
        }
    }

    /// Spec'd result policy: clean results pass through; an error next
    /// to usable results degrades to a warning; a total failure falls
    /// back to the cached results for the same fingerprint when
    /// available, else propagates.
    fn apply_result_policy(
        &self,
        results: Vec<SourceResult>,
        error: Option<ManagerError>,
        params: &SearchParams,
    ) -> SearchReply {
        let Some(error) = error else {
            return Ok(SearchOutcome::clean(results));
        };

        if !results.is_empty() {
            let warning = if error.is_breaker_origin() {
                SearchWarning::PartialBreaker(error.to_string())
            } else {
                SearchWarning::PartialFailure(error.to_string())
            };
            return Ok(SearchOutcome {
                results,
                warning: Some(warning),
            });
        }

        if let Some(cached) = self.search_cache.get(&params.fingerprint()) {
            info!(error = %error, "serving stale cached results after fan-out failure");
            return Ok(SearchOutcome {
                results: cached,
                warning: Some(SearchWarning::StaleCache(error.to_string())),
            });
        }

        Err(error)
    }

    /// Details-fetch inner path: cache probe, health refusal, adapter
    /// call, cache on success.
    async fn fetch_details_inner(
        &self,
        source: &str,
        vacancy_id: &str,
    ) -> Result<VacancyDetails, ManagerError> {
        if let Some(cached) = self.details_cache.get(vacancy_id) {
            debug!(vacancy_id, "details cache hit");
            return Ok(cached);
        }

        if !self.health.is_healthy(source) {
            return Err(ManagerError::SourceUnhealthy {
                name: source.to_string(),
            });
        }

        let adapter = self.adapter(source).ok_or_else(|| ManagerError::UnknownSource {
            name: source.to_string(),
        })?;

        let details = adapter.fetch_details(vacancy_id).await?;

        self.details_cache
            .insert(vacancy_id.to_string(), details.clone(), self.config.details_ttl);

        Ok(details)
    }
}

/// A per-branch result plus the typed breaker-rejection flag that the
/// stringly SourceResult cannot carry.
struct BranchOutcome {
    result: SourceResult,
    breaker_rejected: bool,
}

fn aggregate_failure(branches: &[BranchOutcome]) -> ManagerError {
    let summary = branches
        .iter()
        .map(|b| {
            format!(
                "{}: {}",
                b.result.source,
                b.result.error.as_deref().unwrap_or("no vacancies returned")
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    // The fan-out is considered breaker-broken when every failure is a
    // breaker rejection, not a genuine upstream answer.
    let breaker_origin = !branches.is_empty() && branches.iter().all(|b| b.breaker_rejected);

    ManagerError::AllSourcesFailed {
        summary,
        breaker_origin,
    }
}
