//! SuperJob source adapter.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use jobradar_models::{
    format_salary_amount, Area, Employer, SalaryRange, SearchParams, Vacancy, VacancyDetails,
};

use crate::adapter::SourceAdapter;
use crate::client::SourceClient;
use crate::config::SourceConfig;
use crate::error::SourceError;

/// Source tag used in results, the reverse index and the health map.
pub const SOURCE_NAME: &str = "superjob";

/// Adapter for the SuperJob vacancies API.
pub struct SuperJobSource {
    client: SourceClient,
}

impl SuperJobSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: SourceClient::new(SOURCE_NAME, config)?,
        })
    }

    /// Defaults pointing at the public API.
    pub fn default_config() -> SourceConfig {
        SourceConfig::for_endpoints(
            "https://api.superjob.ru/2.0/vacancies",
            "https://api.superjob.ru/2.0/vacancies",
        )
    }

    pub fn client(&self) -> &SourceClient {
        &self.client
    }

    fn build_search_url(&self, params: &SearchParams) -> Result<Url, SourceError> {
        let mut url = self.client.parse_base_url()?;
        {
            let mut query = url.query_pairs_mut();
            if !params.text.is_empty() {
                query.append_pair("keyword", &params.text);
            }
            if let Some(town) = convert_location(&params.location) {
                query.append_pair("town", town);
            }
            if params.per_page > 0 {
                query.append_pair("count", &params.per_page.to_string());
            }
            if params.page > 0 {
                // SuperJob pages are 0-based.
                query.append_pair("page", &(params.page - 1).to_string());
            }
        }
        Ok(url)
    }
}

// SuperJob keys towns by name, not by the numeric area codes the rest of
// the system uses.
fn convert_location(code: &str) -> Option<&'static str> {
    match code {
        "1" => Some("Москва"),
        "2" => Some("Санкт-Петербург"),
        _ => None,
    }
}

#[async_trait]
impl SourceAdapter for SuperJobSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn health_endpoint(&self) -> &str {
        self.client.health_endpoint()
    }

    async fn search_vacancies(&self, params: &SearchParams) -> Result<Vec<Vacancy>, SourceError> {
        let url = self.build_search_url(params)?;
        let response: SjSearchResponse = self.client.get_json(url).await?;
        Ok(response.objects.into_iter().map(Vacancy::from).collect())
    }

    async fn fetch_details(&self, vacancy_id: &str) -> Result<VacancyDetails, SourceError> {
        let url = self.client.detail_url(vacancy_id)?;
        let details: SjVacancy = self.client.get_json(url).await?;
        Ok(details.into())
    }

    fn stop(&self) {
        self.client.stop();
    }
}

// --- wire payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SjSearchResponse {
    #[serde(default)]
    objects: Vec<SjVacancy>,
    #[serde(default)]
    #[allow(dead_code)]
    total: u64,
}

#[derive(Debug, Default, Deserialize)]
struct SjVacancy {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    profession: String,
    #[serde(default)]
    firm_name: String,
    #[serde(default)]
    payment_from: u64,
    #[serde(default)]
    payment_to: u64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    town: SjTown,
    #[serde(default)]
    link: String,
    #[serde(default, rename = "vacancyRichText")]
    vacancy_rich_text: String,
}

#[derive(Debug, Default, Deserialize)]
struct SjTown {
    #[serde(default)]
    title: String,
}

impl SjVacancy {
    fn salary_string(&self) -> Option<String> {
        if self.payment_from == 0 && self.payment_to == 0 {
            return None;
        }
        Some(format_salary_amount(self.payment_from, self.payment_to))
    }
}

impl From<SjVacancy> for Vacancy {
    fn from(raw: SjVacancy) -> Self {
        let salary = raw.salary_string();
        Vacancy {
            id: raw.id.to_string(),
            title: raw.profession,
            company: raw.firm_name,
            salary,
            currency: raw.currency,
            location: raw.town.title,
            url: raw.link,
            source: SOURCE_NAME.to_string(),
            description: raw.vacancy_rich_text,
        }
    }
}

impl From<SjVacancy> for VacancyDetails {
    fn from(raw: SjVacancy) -> Self {
        VacancyDetails {
            id: raw.id.to_string(),
            title: raw.profession.clone(),
            employer: Employer {
                id: String::new(),
                name: raw.firm_name.clone(),
            },
            area: Area {
                id: String::new(),
                name: raw.town.title.clone(),
            },
            salary: SalaryRange {
                from: raw.payment_from,
                to: raw.payment_to,
                currency: raw.currency.clone(),
                gross: false,
            },
            description: raw.vacancy_rich_text.clone(),
            url: raw.link,
        }
    }
}
