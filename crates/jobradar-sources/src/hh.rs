//! HeadHunter source adapter.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use jobradar_models::{
    format_salary_amount, Area, Employer, SalaryRange, SearchParams, Vacancy, VacancyDetails,
    DEFAULT_PER_PAGE, MAX_PER_PAGE,
};

use crate::adapter::SourceAdapter;
use crate::client::SourceClient;
use crate::config::SourceConfig;
use crate::error::SourceError;

/// Source tag used in results, the reverse index and the health map.
pub const SOURCE_NAME: &str = "hh";

/// Adapter for the HeadHunter vacancies API.
pub struct HhSource {
    client: SourceClient,
}

impl HhSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: SourceClient::new(SOURCE_NAME, config)?,
        })
    }

    /// Defaults pointing at the public API.
    pub fn default_config() -> SourceConfig {
        SourceConfig::for_endpoints("https://api.hh.ru/vacancies", "https://api.hh.ru/vacancies")
    }

    pub fn client(&self) -> &SourceClient {
        &self.client
    }

    fn build_search_url(&self, params: &SearchParams) -> Result<Url, SourceError> {
        let mut url = self.client.parse_base_url()?;
        {
            let mut query = url.query_pairs_mut();
            if !params.text.is_empty() {
                query.append_pair("text", &params.text);
            }
            if !params.location.is_empty() {
                query.append_pair("area", &params.location);
            }

            let mut per_page = params.per_page;
            if per_page == 0 || per_page > MAX_PER_PAGE {
                per_page = DEFAULT_PER_PAGE;
            }
            query.append_pair("per_page", &per_page.to_string());

            if params.page > 0 {
                query.append_pair("page", &params.page.to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl SourceAdapter for HhSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn health_endpoint(&self) -> &str {
        self.client.health_endpoint()
    }

    async fn search_vacancies(&self, params: &SearchParams) -> Result<Vec<Vacancy>, SourceError> {
        let url = self.build_search_url(params)?;
        let response: HhSearchResponse = self.client.get_json(url).await?;
        convert_search_response(response)
    }

    async fn fetch_details(&self, vacancy_id: &str) -> Result<VacancyDetails, SourceError> {
        let url = self.client.detail_url(vacancy_id)?;
        let details: HhDetails = self.client.get_json(url).await?;
        Ok(details.into())
    }

    fn stop(&self) {
        self.client.stop();
    }
}

// --- wire payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HhSearchResponse {
    #[serde(default)]
    items: Vec<HhVacancy>,
    #[serde(default)]
    found: u64,
}

#[derive(Debug, Deserialize)]
struct HhVacancy {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    salary: Option<HhSalary>,
    #[serde(default)]
    employer: HhEmployer,
    #[serde(default)]
    area: HhArea,
    #[serde(default, alias = "alternate_url")]
    url: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct HhSalary {
    #[serde(default)]
    from: Option<u64>,
    #[serde(default)]
    to: Option<u64>,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    gross: bool,
}

#[derive(Debug, Default, Deserialize)]
struct HhEmployer {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct HhArea {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct HhDetails {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    employer: HhEmployer,
    #[serde(default)]
    area: HhArea,
    #[serde(default)]
    salary: Option<HhSalary>,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "alternate_url")]
    url: String,
}

fn convert_search_response(response: HhSearchResponse) -> Result<Vec<Vacancy>, SourceError> {
    // The ranking matched vacancies but committed to none of them; the
    // caller should refine the query rather than retry as-is.
    if response.items.is_empty() && response.found > 0 {
        return Err(SourceError::RefineQuery);
    }

    Ok(response.items.into_iter().map(Vacancy::from).collect())
}

impl HhSalary {
    // The currency code stays in its own field; display layers attach
    // the symbol.
    fn render(&self) -> String {
        format_salary_amount(self.from.unwrap_or(0), self.to.unwrap_or(0))
    }
}

impl From<HhVacancy> for Vacancy {
    fn from(raw: HhVacancy) -> Self {
        let (salary, currency) = match &raw.salary {
            Some(s) if s.from.is_some() || s.to.is_some() => {
                (Some(s.render()), s.currency.clone())
            }
            Some(s) => (None, s.currency.clone()),
            None => (None, String::new()),
        };
        Vacancy {
            id: raw.id,
            title: raw.name,
            company: raw.employer.name,
            salary,
            currency,
            location: raw.area.name,
            url: raw.url,
            source: SOURCE_NAME.to_string(),
            description: raw.description,
        }
    }
}

impl From<HhDetails> for VacancyDetails {
    fn from(raw: HhDetails) -> Self {
        let salary = raw.salary.unwrap_or_default();
        VacancyDetails {
            id: raw.id,
            title: raw.name,
            employer: Employer {
                id: raw.employer.id,
                name: raw.employer.name,
            },
            area: Area {
                id: raw.area.id,
                name: raw.area.name,
            },
            salary: SalaryRange {
                from: salary.from.unwrap_or(0),
                to: salary.to.unwrap_or(0),
                currency: salary.currency,
                gross: salary.gross,
            },
            description: raw.description,
            url: raw.url,
        }
    }
}
