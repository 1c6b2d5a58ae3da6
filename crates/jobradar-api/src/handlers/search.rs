//! Search endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::json;
use tracing::warn;

use jobradar_manager::SearchWarning;

use crate::converters::{details_to_response, search_results_to_response, vacancy_to_response};
use crate::dto::{MultiSearchResponse, SearchRequest, VacancyDetailsResponse, VacancyQueryRequest, VacancyResponse};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::service::LookupError;
use crate::state::AppState;

/// Liveness echo.
pub async fn hello() -> Json<serde_json::Value> {
    Json(json!({"message": "Hello from the vacancy search server!"}))
}

/// `POST /multisearch` — fan a query out to every live source.
pub async fn multisearch(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<MultiSearchResponse>> {
    let params = request
        .validate_and_normalize()
        .map_err(ApiError::Validation)?;

    let outcome = match state.service.search_vacancies(params).await {
        Ok(outcome) => outcome,
        Err(err) => {
            metrics::record_search(false);
            return Err(err.into());
        }
    };
    metrics::record_search(true);

    if let Some(warning) = &outcome.warning {
        let kind = match warning {
            SearchWarning::PartialBreaker(_) => "partial_breaker",
            SearchWarning::PartialFailure(_) => "partial_failure",
            SearchWarning::StaleCache(_) => "stale_cache",
        };
        metrics::record_search_degraded(kind);
        warn!(warning = %warning.message(), "search answered degraded");
    }

    if outcome.results.is_empty() {
        return Err(ApiError::not_found("failed to find vacancies"));
    }

    Ok(Json(search_results_to_response(&outcome.results)))
}

/// `POST /quickoverview` — one already-found vacancy via the reverse
/// index.
pub async fn quick_overview(
    State(state): State<AppState>,
    Json(request): Json<VacancyQueryRequest>,
) -> ApiResult<Json<VacancyResponse>> {
    request.validate().map_err(ApiError::Validation)?;

    let vacancy = state
        .service
        .brief_vacancy_details(request.source.trim(), request.vacancy_id.trim())
        .map_err(|err| match err {
            LookupError::NotFound => ApiError::CacheMiss(format!(
                "no vacancy {} from {} in cache",
                request.vacancy_id, request.source
            )),
            LookupError::Stale => {
                ApiError::Stale("search data expired, repeat the search".to_string())
            }
        })?;

    Ok(Json(vacancy_to_response(&vacancy)))
}

/// `POST /vac_details` — full vacancy payload, possibly fetched from
/// the source on demand.
pub async fn vacancy_details(
    State(state): State<AppState>,
    Json(request): Json<VacancyQueryRequest>,
) -> ApiResult<Json<VacancyDetailsResponse>> {
    request.validate().map_err(ApiError::Validation)?;

    let source = request.source.trim();
    let details = match state
        .service
        .vacancy_details(source, request.vacancy_id.trim())
        .await
    {
        Ok(details) => {
            metrics::record_details_fetch(source, true);
            details
        }
        Err(err) => {
            metrics::record_details_fetch(source, false);
            return Err(err.into());
        }
    };

    Ok(Json(details_to_response(&details)))
}
