//! Search parameters and their canonical cache fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default page size when the caller does not specify one.
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Hard ceiling on the page size.
pub const MAX_PER_PAGE: u32 = 100;

/// Immutable description of one vacancy search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text query
    pub text: String,
    /// Location code understood by the sources
    pub location: String,
    /// Results per source page (1..=100)
    pub per_page: u32,
    /// 1-based page number
    pub page: u32,
}

impl SearchParams {
    /// Create params with defaults for paging.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: String::new(),
            per_page: DEFAULT_PER_PAGE,
            page: 1,
        }
    }

    /// Set the location code.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the page size.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Set the 1-based page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Clamp paging fields into their valid ranges.
    ///
    /// per_page 0 becomes the default, values above the ceiling are clamped;
    /// page 0 becomes 1. Equal normalized params produce equal fingerprints.
    pub fn normalize(mut self) -> Self {
        if self.per_page == 0 {
            self.per_page = DEFAULT_PER_PAGE;
        } else if self.per_page > MAX_PER_PAGE {
            self.per_page = MAX_PER_PAGE;
        }
        if self.page == 0 {
            self.page = 1;
        }
        self
    }

    /// Canonical cache key: the first 16 bytes of a SHA-256 over the
    /// JSON of every field that affects the result set, rendered as hex.
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct KeyData<'a> {
            text: &'a str,
            location: &'a str,
            per_page: u32,
            page: u32,
        }

        let key = KeyData {
            text: &self.text,
            location: &self.location,
            per_page: self.per_page,
            page: self.page,
        };

        // Field order is fixed by the struct, so the JSON is canonical.
        let data = serde_json::to_vec(&key).expect("fingerprint key serializes");
        let hash = Sha256::digest(&data);
        hex_lower(&hash[..16])
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String cannot fail");
    }
    out
}
