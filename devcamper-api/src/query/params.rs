//! Reserved list parameters: `select`, `sort`, `page` and `limit`

use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::{parse_filter, Filter, FilterParseError};

/// Query keys that never act as filters
pub const RESERVED_PARAMS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Page used when `page` is absent or not a positive integer
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or not a positive integer
pub const DEFAULT_LIMIT: u64 = 25;

/// Field results are ordered by when no `sort` is given
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending (oldest first)
    #[default]
    Asc,
    /// Descending (newest first)
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// One `(field, direction)` sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Dotted field path
    pub field: String,
    /// Direction
    pub order: SortOrder,
}

/// Ordered list of sort keys, applied lexicographically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    /// Parse `name,-averageCost` style input. A leading `-` means descending.
    ///
    /// ```rust
    /// use devcamper_api::query::{SortOrder, SortSpec};
    ///
    /// let sort = SortSpec::parse("-averageCost,name");
    /// assert_eq!(sort.keys()[0].field, "averageCost");
    /// assert_eq!(sort.keys()[0].order, SortOrder::Desc);
    /// assert_eq!(sort.keys()[1].order, SortOrder::Asc);
    /// ```
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty() && *part != "-")
                .map(|part| match part.strip_prefix('-') {
                    Some(field) => SortKey {
                        field: field.to_string(),
                        order: SortOrder::Desc,
                    },
                    None => SortKey {
                        field: part.trim_start_matches('+').to_string(),
                        order: SortOrder::Asc,
                    },
                })
                .collect(),
        )
    }

    /// Sort by a single field
    pub fn by(field: impl Into<String>, order: SortOrder) -> Self {
        Self(vec![SortKey {
            field: field.into(),
            order,
        }])
    }

    /// Keys in priority order
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::by(DEFAULT_SORT_FIELD, SortOrder::Asc)
    }
}

/// Ordered set of fields to return. `_id` is always included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection(Vec<String>);

impl Projection {
    /// Parse a comma separated field list
    pub fn parse(raw: &str) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if !fields.iter().any(|existing| existing == field) {
                fields.push(field.to_string());
            }
        }
        Self(fields)
    }

    /// Build from a static field list
    pub fn of(fields: &[&str]) -> Self {
        Self(fields.iter().map(|f| (*f).to_string()).collect())
    }

    /// Requested fields in order
    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Whether `path` or one of its sub-paths was requested
    pub fn includes(&self, path: &str) -> bool {
        self.0.iter().any(|field| {
            field == path
                || field
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Parsed list query: filter plus the reserved parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    /// Filter built from non-reserved keys
    pub filter: Filter,
    /// `select`
    pub projection: Option<Projection>,
    /// `sort`, or `createdAt` ascending
    pub sort: SortSpec,
    /// 1-based page
    pub page: u64,
    /// Page size
    pub limit: u64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            filter: Filter::new(),
            projection: None,
            sort: SortSpec::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListParams {
    /// Split raw query pairs into reserved parameters and a typed filter
    ///
    /// ```rust
    /// use devcamper_api::query::ListParams;
    ///
    /// let pairs = vec![
    ///     ("select".to_string(), "name,description".to_string()),
    ///     ("page".to_string(), "2".to_string()),
    ///     ("housing".to_string(), "true".to_string()),
    /// ];
    /// let params = ListParams::from_pairs(&pairs).unwrap();
    /// assert_eq!(params.page, 2);
    /// assert_eq!(params.limit, 25);
    /// assert_eq!(params.filter.predicates().len(), 1);
    /// ```
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, FilterParseError> {
        let last = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let filter = parse_filter(
            pairs
                .iter()
                .filter(|(key, _)| !is_reserved(key))
                .map(|(key, value)| (key.as_str(), value.as_str())),
        )?;

        let projection = last("select")
            .map(Projection::parse)
            .filter(|p| !p.fields().is_empty());
        let sort = last("sort")
            .map(SortSpec::parse)
            .filter(|s| !s.keys().is_empty())
            .unwrap_or_default();

        Ok(Self {
            filter,
            projection,
            sort,
            page: positive_or(last("page"), DEFAULT_PAGE),
            limit: positive_or(last("limit"), DEFAULT_LIMIT),
        })
    }
}

/// `page`, `page[gte]` and the like are all list controls, never filters
fn is_reserved(key: &str) -> bool {
    let base = key.split('[').next().unwrap_or(key).trim();
    RESERVED_PARAMS.contains(&base)
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
