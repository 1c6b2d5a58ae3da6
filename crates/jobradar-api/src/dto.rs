//! Request and response DTOs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use jobradar_models::{SearchParams, MAX_PER_PAGE};

/// Default page size at the HTTP boundary (the sources default lower).
const HTTP_DEFAULT_PER_PAGE: u32 = 50;
const MIN_QUERY_LEN: usize = 2;
const MAX_QUERY_LEN: usize = 100;

/// Body of `POST /multisearch`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub page: u32,
}

impl SearchRequest {
    /// Validate and normalize into domain search parameters.
    pub fn validate_and_normalize(self) -> Result<SearchParams, String> {
        let query = self.query.trim().to_string();
        if query.len() < MIN_QUERY_LEN {
            return Err(format!("query must be at least {MIN_QUERY_LEN} characters"));
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(format!("query must be at most {MAX_QUERY_LEN} characters"));
        }

        let per_page = match self.per_page {
            0 => HTTP_DEFAULT_PER_PAGE,
            n if n > MAX_PER_PAGE => MAX_PER_PAGE,
            n => n,
        };
        let page = self.page.max(1);

        Ok(SearchParams {
            text: query,
            location: self.location.trim().to_string(),
            per_page,
            page,
        })
    }
}

/// Body of `POST /quickoverview` and `POST /vac_details`.
#[derive(Debug, Clone, Deserialize)]
pub struct VacancyQueryRequest {
    pub vacancy_id: String,
    pub source: String,
}

impl VacancyQueryRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.vacancy_id.trim().is_empty() {
            return Err("vacancy_id must not be empty".to_string());
        }
        if self.source.trim().is_empty() {
            return Err("source must not be empty".to_string());
        }
        Ok(())
    }
}

/// One vacancy in a response payload.
#[derive(Debug, Clone, Serialize)]
pub struct VacancyResponse {
    pub id: String,
    pub job: String,
    pub company: String,
    pub salary: String,
    pub currency: String,
    pub location: String,
    pub source: SourceInfo,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub icon: String,
}

/// Per-source block of the multisearch response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceVacanciesResponse {
    pub name: String,
    pub icon: String,
    pub vacancies: Vec<VacancyResponse>,
    pub count: usize,
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Body of the multisearch response.
#[derive(Debug, Clone, Serialize)]
pub struct MultiSearchResponse {
    pub results: HashMap<String, SourceVacanciesResponse>,
    pub total: usize,
}

/// Body of the vacancy-details response.
#[derive(Debug, Clone, Serialize)]
pub struct VacancyDetailsResponse {
    pub id: String,
    pub title: String,
    pub employer: String,
    pub location: String,
    pub salary: SalaryResponse,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalaryResponse {
    pub from: u64,
    pub to: u64,
    pub currency: String,
    pub gross: bool,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            location: String::new(),
            per_page: 0,
            page: 0,
        }
    }

    #[test]
    fn query_length_is_enforced() {
        assert!(request("a").validate_and_normalize().is_err());
        assert!(request("go").validate_and_normalize().is_ok());
        assert!(request(&"x".repeat(101)).validate_and_normalize().is_err());
    }

    #[test]
    fn paging_defaults_and_clamps() {
        let params = request("rust").validate_and_normalize().unwrap();
        assert_eq!(params.per_page, 50);
        assert_eq!(params.page, 1);

        let mut big = request("rust");
        big.per_page = 500;
        big.page = 3;
        let params = big.validate_and_normalize().unwrap();
        assert_eq!(params.per_page, 100);
        assert_eq!(params.page, 3);
    }

    #[test]
    fn vacancy_query_requires_both_fields() {
        let req = VacancyQueryRequest {
            vacancy_id: "42".to_string(),
            source: String::new(),
        };
        assert!(req.validate().is_err());

        let req = VacancyQueryRequest {
            vacancy_id: "42".to_string(),
            source: "hh".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
