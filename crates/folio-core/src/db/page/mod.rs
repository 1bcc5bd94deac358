//! Module: page
//! Responsibility: offset/limit bounds and page metadata.
//! Does not own: fetching; adapters receive the resolved `PageWindow`.
//! Boundary: the orchestrator resolves one window per query before any fetch.


use crate::{config::PaginationConfig, value::Document};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use thiserror::Error as ThisError;

///
/// PageError
///
/// Pagination bounds out of range after defaults are applied.
/// Oversized requests are clamped, never rejected.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PageError {
    #[error("page must be at least 1, got {0}")]
    Page(u32),

    #[error("page size must be at least 1")]
    PageSize,

    #[error("limit must be at least 1")]
    Limit,

    #[error("configured max page size must be at least 1")]
    MaxPageSize,
}

///
/// PageRequest
///
/// Unset members fall back to configured defaults.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageRequest {
    Page {
        page: Option<u32>,
        page_size: Option<u32>,
    },
    Offset {
        start: Option<u32>,
        limit: Option<u32>,
    },
}

impl PageRequest {
    #[must_use]
    pub const fn page(page: u32, page_size: u32) -> Self {
        Self::Page {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    #[must_use]
    pub const fn offset(start: u32, limit: u32) -> Self {
        Self::Offset {
            start: Some(start),
            limit: Some(limit),
        }
    }

    /// Resolve the request into fetch bounds.
    pub fn window(&self, config: &PaginationConfig) -> Result<PageWindow, PageError> {
        let max = config.max_page_size;
        if max < 1 {
            return Err(PageError::MaxPageSize);
        }
        let default = config.default_page_size.min(max);

        match *self {
            Self::Page { page, page_size } => {
                let page = page.unwrap_or(1);
                let page_size = page_size.unwrap_or(default).min(max);
                if page < 1 {
                    return Err(PageError::Page(page));
                }
                if page_size < 1 {
                    return Err(PageError::PageSize);
                }

                Ok(PageWindow {
                    start: u64::from(page - 1) * u64::from(page_size),
                    limit: page_size,
                    page,
                    page_size,
                })
            }
            Self::Offset { start, limit } => {
                let start = start.unwrap_or(0);
                let limit = limit.unwrap_or(default).min(max);
                if limit < 1 {
                    return Err(PageError::Limit);
                }

                Ok(PageWindow {
                    start: u64::from(start),
                    limit,
                    page: (start / limit).saturating_add(1),
                    page_size: limit,
                })
            }
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Page {
            page: None,
            page_size: None,
        }
    }
}

///
/// PageWindow
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageWindow {
    pub start: u64,
    pub limit: u32,
    pub page: u32,
    pub page_size: u32,
}

impl PageWindow {
    /// Build the metadata block for `total` matching documents.
    #[must_use]
    pub fn meta(&self, total: u64) -> PageMeta {
        let page_count = if total == 0 {
            0
        } else {
            total.div_ceil(u64::from(self.page_size))
        };

        PageMeta {
            page: self.page,
            page_size: self.page_size,
            page_count,
            total,
        }
    }
}

/// Resolve `request` and build metadata for `total` in one step.
pub fn paginate(
    request: &PageRequest,
    config: &PaginationConfig,
    total: u64,
) -> Result<PageMeta, PageError> {
    Ok(request.window(config)?.meta(total))
}

///
/// PageMeta
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u64,
    pub total: u64,
}

///
/// PageResult
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PageResult<T> {
    #[must_use]
    pub const fn new(data: Vec<T>, meta: PageMeta) -> Self {
        Self { data, meta }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PageResult<Document> {
    /// Response shape: `{ "data": [...], "meta": { "pagination": {...} } }`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        json!({
            "data": self.data.iter().map(Document::to_json).collect::<Vec<_>>(),
            "meta": { "pagination": self.meta },
        })
    }
}
