//! Domain to DTO conversion.

use std::collections::HashMap;
use std::time::Duration;

use jobradar_models::{SourceResult, Vacancy, VacancyDetails};

use crate::dto::{
    MultiSearchResponse, SalaryResponse, SourceInfo, SourceVacanciesResponse, VacancyDetailsResponse,
    VacancyResponse,
};

/// Group per-source results into the multisearch response shape.
pub fn search_results_to_response(results: &[SourceResult]) -> MultiSearchResponse {
    let mut grouped: HashMap<String, SourceVacanciesResponse> = HashMap::new();
    let mut total = 0;

    for result in results {
        let entry = grouped
            .entry(result.source.clone())
            .or_insert_with(|| SourceVacanciesResponse {
                name: display_name(&result.source),
                icon: source_icon(&result.source),
                ..Default::default()
            });

        match &result.error {
            Some(error) => {
                entry.has_error = true;
                entry.error = Some(error.clone());
            }
            None => {
                entry
                    .vacancies
                    .extend(result.vacancies.iter().map(vacancy_to_response));
                entry.count = entry.vacancies.len();
            }
        }

        if result.duration > Duration::ZERO {
            entry.duration = Some(format_duration(result.duration));
        }

        total += entry.count;
    }

    MultiSearchResponse {
        results: grouped,
        total,
    }
}

pub fn vacancy_to_response(vacancy: &Vacancy) -> VacancyResponse {
    VacancyResponse {
        id: vacancy.id.clone(),
        job: vacancy.title.clone(),
        company: vacancy.company.clone(),
        salary: format_salary_text(vacancy.salary.as_deref(), &vacancy.currency),
        currency: vacancy.currency.clone(),
        location: vacancy.location.clone(),
        source: SourceInfo {
            name: display_name(&vacancy.source),
            icon: source_icon(&vacancy.source),
        },
        url: vacancy.url.clone(),
        description: vacancy.description.clone(),
    }
}

pub fn details_to_response(details: &VacancyDetails) -> VacancyDetailsResponse {
    let salary_text = jobradar_models::format_salary(
        details.salary.from,
        details.salary.to,
        &details.salary.currency,
    );
    VacancyDetailsResponse {
        id: details.id.clone(),
        title: details.title.clone(),
        employer: details.employer.name.clone(),
        location: details.area.name.clone(),
        salary: SalaryResponse {
            from: details.salary.from,
            to: details.salary.to,
            currency: details.salary.currency.clone(),
            gross: details.salary.gross,
            text: salary_text,
        },
        description: details.description.clone(),
        url: details.url.clone(),
    }
}

fn display_name(source: &str) -> String {
    match source {
        "hh" => "hh.ru".to_string(),
        "superjob" => "SuperJob".to_string(),
        other => other.to_string(),
    }
}

fn source_icon(source: &str) -> String {
    match source {
        "hh" => "https://hh.ru/favicon.ico".to_string(),
        "superjob" => "https://www.superjob.ru/favicon.ico".to_string(),
        _ => String::new(),
    }
}

fn format_salary_text(salary: Option<&str>, currency: &str) -> String {
    match salary {
        None | Some("") => "not specified".to_string(),
        Some(text) => format!("{text} {}", currency_symbol(currency)),
    }
}

fn currency_symbol(currency: &str) -> String {
    match currency.to_uppercase().as_str() {
        "RUB" | "RUR" => "₽".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        other => other.to_string(),
    }
}

fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_millis(1) {
        format!("{}µs", duration.as_micros())
    } else if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
