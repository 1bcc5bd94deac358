//! Module: query
//! Responsibility: the declarative request handed to `Engine::query`.
//! Does not own: schema validation of sort/fields; the engine checks those
//! against the target type.
//! Boundary: transport layers build a `QueryRequest` directly or from JSON.


use crate::{
    db::{
        page::PageRequest,
        populate::{PopulateError, PopulateSpec},
        predicate::{FilterError, FilterNode},
        store::SortSpec,
    },
    error::ErrorKind,
    value::Status,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Request shape problems found while reading a JSON query.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("malformed query: {0}")]
    Malformed(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Populate(#[from] PopulateError),
}

impl QueryError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) => ErrorKind::Schema,
            Self::Filter(err) => err.kind(),
            Self::Populate(err) => err.kind(),
        }
    }
}

fn malformed(message: impl Into<String>) -> QueryError {
    QueryError::Malformed(message.into())
}

///
/// QueryRequest
///
/// Filters, population, sort, root projection, pagination, and status.
/// Every member is optional; the defaults select all published documents
/// on the first page.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRequest {
    pub filters: Option<FilterNode>,
    pub populate: PopulateSpec,
    pub sort: Vec<SortSpec>,
    pub fields: Option<BTreeSet<String>>,
    pub page: PageRequest,
    pub status: Option<Status>,
}

impl QueryRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filters = Some(match self.filters.take() {
            Some(existing) => FilterNode::and([existing, filter]),
            None => filter,
        });
        self
    }

    #[must_use]
    pub fn populate(mut self, populate: PopulateSpec) -> Self {
        self.populate = populate;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Read a query object:
    ///
    /// ```json
    /// {
    ///   "filters": { "title": { "$containsi": "strapi" } },
    ///   "populate": ["author"],
    ///   "sort": ["views:desc", "title"],
    ///   "fields": ["title", "views"],
    ///   "pagination": { "page": 1, "pageSize": 10 },
    ///   "status": "published"
    /// }
    /// ```
    pub fn from_json(json: &JsonValue) -> Result<Self, QueryError> {
        let JsonValue::Object(map) = json else {
            return Err(malformed("query must be an object"));
        };

        let mut request = Self::new();
        for (key, value) in map {
            match key.as_str() {
                "filters" => request.filters = FilterNode::from_json(value)?,
                "populate" => request.populate = PopulateSpec::from_json(value)?,
                "sort" => request.sort = parse_sort(value)?,
                "fields" => request.fields = Some(parse_fields(value)?),
                "pagination" => request.page = parse_pagination(value)?,
                "status" => request.status = Some(parse_status(value)?),
                other => return Err(malformed(format!("unknown query key '{other}'"))),
            }
        }

        Ok(request)
    }
}

// `"a:desc,b"`, `["a:desc", "b"]`, or `{ "a": "desc" }` / `[{ "a": "desc" }]`.
fn parse_sort(json: &JsonValue) -> Result<Vec<SortSpec>, QueryError> {
    let parse = |input: &str| {
        SortSpec::parse(input.trim()).ok_or_else(|| malformed(format!("invalid sort '{input}'")))
    };

    match json {
        JsonValue::String(list) => list.split(',').map(parse).collect(),
        JsonValue::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(parse_sort(item)?);
            }
            Ok(out)
        }
        JsonValue::Object(map) => map
            .iter()
            .map(|(field, dir)| match dir.as_str() {
                Some(dir) => parse(&format!("{field}:{dir}")),
                None => Err(malformed(format!("sort direction for '{field}' must be a string"))),
            })
            .collect(),
        _ => Err(malformed("sort must be a string, array, or object")),
    }
}

fn parse_fields(json: &JsonValue) -> Result<BTreeSet<String>, QueryError> {
    match json {
        JsonValue::String(list) => Ok(list
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("fields must be strings"))
            })
            .collect(),
        _ => Err(malformed("fields must be a string or an array")),
    }
}

fn parse_pagination(json: &JsonValue) -> Result<PageRequest, QueryError> {
    let JsonValue::Object(map) = json else {
        return Err(malformed("pagination must be an object"));
    };
    for key in map.keys() {
        if !matches!(key.as_str(), "page" | "pageSize" | "start" | "limit") {
            return Err(malformed(format!("unknown pagination key '{key}'")));
        }
    }

    let page_style = map.contains_key("page") || map.contains_key("pageSize");
    let offset_style = map.contains_key("start") || map.contains_key("limit");

    match (page_style, offset_style) {
        (true, true) => Err(malformed(
            "pagination mixes page/pageSize with start/limit",
        )),
        (false, true) => Ok(PageRequest::Offset {
            start: bound(map, "start")?,
            limit: bound(map, "limit")?,
        }),
        _ => Ok(PageRequest::Page {
            page: bound(map, "page")?,
            page_size: bound(map, "pageSize")?,
        }),
    }
}

// Non-negative integers, also accepted as numeric strings (query-string input).
fn bound(map: &Map<String, JsonValue>, key: &str) -> Result<Option<u32>, QueryError> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    let parsed = match value {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    parsed
        .map(Some)
        .ok_or_else(|| malformed(format!("pagination '{key}' must be a non-negative integer")))
}

fn parse_status(json: &JsonValue) -> Result<Status, QueryError> {
    match json.as_str() {
        Some("draft") => Ok(Status::Draft),
        Some("published") => Ok(Status::Published),
        _ => Err(malformed("status must be 'draft' or 'published'")),
    }
}
