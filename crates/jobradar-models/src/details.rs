//! On-demand vacancy details fetched from a single source.

use serde::{Deserialize, Serialize};

/// Employer block of a detailed vacancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Location block of a detailed vacancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Salary range as published by the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub to: u64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub gross: bool,
}

/// Rich per-vacancy payload fetched on demand via the details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyDetails {
    pub id: String,
    pub title: String,
    pub employer: Employer,
    pub area: Area,
    pub salary: SalaryRange,
    pub description: String,
    pub url: String,
}
