use serde::{Deserialize, Deserializer, Serialize};

use crate::config::PaginationConfig;
use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 6)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 8)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// `?page=&limit=` query parameters shared by paginated endpoints.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, 1-based.
    pub page: Option<u64>,
    /// Page size override.
    pub limit: Option<u64>,
}

/// A resolved page: 1-based number, size, and row offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl PageWindow {
    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination::new(self.page, self.per_page, total)
    }
}

impl PageQuery {
    /// Resolve against the configured default and cap.
    ///
    /// The row offset must fit a Postgres `BIGINT`.
    pub fn resolve(&self, cfg: &PaginationConfig) -> Result<PageWindow, AppError> {
        let page = Ord::max(self.page.unwrap_or(1), 1);
        let per_page = self
            .limit
            .unwrap_or(cfg.default_page_size)
            .clamp(1, cfg.max_page_size);
        let offset = (page - 1)
            .checked_mul(per_page)
            .filter(|&o| o <= i64::MAX as u64)
            .ok_or_else(|| AppError::Validation(format!("Page {page} is out of range")))?;
        Ok(PageWindow {
            page,
            per_page,
            offset,
        })
    }
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Lenient boolean for filter parameters: accepts `1`/`0`/`true`/`false`.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") | Some("True") => Ok(Some(true)),
        Some("0") | Some("false") | Some("False") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected 0, 1, true or false, got '{other}'"
        ))),
    }
}

/// Validate a trimmed, non-empty string field with a character cap.
pub fn validate_text_field(value: &str, field: &str, max_chars: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max_chars} characters"
        )));
    }
    Ok(())
}
