//! Shared data models for the JobRadar vacancy aggregator.
//!
//! This crate provides Serde-serializable types for:
//! - Search parameters and their canonical fingerprint
//! - Normalized vacancies and per-source search results
//! - The reverse vacancy index
//! - On-demand vacancy details
//! - Salary formatting helpers

pub mod details;
pub mod index;
pub mod salary;
pub mod search;
pub mod vacancy;

pub use details::{Area, Employer, SalaryRange, VacancyDetails};
pub use index::{composite_key, VacancyIndexEntry};
pub use salary::{format_salary, format_salary_amount};
pub use search::{SearchParams, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use vacancy::{SourceResult, Vacancy};
