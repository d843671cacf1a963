//! Typed filter language
//!
//! Query-string pairs such as `averageCost[lte]=10000` or `careers[in]=Business`
//! are parsed straight into [`Comparison`] values. Field names are restricted to
//! `[A-Za-z0-9_.]`, so no operator syntax from the client ever reaches the store.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::geo::GeoPoint;

/// `field` or `field[op]`, nothing else
static FILTER_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_.]+)(?:\[([^\[\]]*)\])?$").expect("static regex is valid")
});

/// Error produced for a query parameter that is not a valid filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    /// Key is not `field` or `field[op]`
    #[error("Invalid filter parameter '{0}'")]
    InvalidKey(String),

    /// Operator is not one of gt, gte, lt, lte, in
    #[error("Unsupported operator '{operator}' on field '{field}'")]
    UnsupportedOperator {
        /// Field the operator was applied to
        field: String,
        /// Operator as written by the client
        operator: String,
    },
}

/// Comparison operator recognised inside brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equality (no brackets)
    Eq,
    /// `[gt]`
    Gt,
    /// `[gte]`
    Gte,
    /// `[lt]`
    Lt,
    /// `[lte]`
    Lte,
    /// `[in]`
    In,
}

impl Operator {
    /// Parse an operator token. Only the exact lowercase tokens are accepted.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

/// A typed comparison against a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Field equals the value
    Eq(Value),
    /// Field is greater than the value
    Gt(Value),
    /// Field is greater than or equal to the value
    Gte(Value),
    /// Field is less than the value
    Lt(Value),
    /// Field is less than or equal to the value
    Lte(Value),
    /// Field equals any of the values
    In(Vec<Value>),
}

impl Comparison {
    fn from_raw(operator: Operator, mut raw: Vec<String>) -> Self {
        match operator {
            Operator::In => Comparison::In(raw.into_iter().map(Value::String).collect()),
            single => {
                let value = Value::String(raw.pop().unwrap_or_default());
                match single {
                    Operator::Gt => Comparison::Gt(value),
                    Operator::Gte => Comparison::Gte(value),
                    Operator::Lt => Comparison::Lt(value),
                    Operator::Lte => Comparison::Lte(value),
                    _ => Comparison::Eq(value),
                }
            }
        }
    }
}

/// A single condition; a [`Filter`] is the conjunction of its predicates
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compare the value at a (dotted) path
    Compare {
        /// Dotted field path
        field: String,
        /// Comparison to apply
        comparison: Comparison,
    },
    /// GeoJSON point at `field` lies within `radius` radians of `center`
    WithinSphere {
        /// Field holding a GeoJSON point
        field: String,
        /// Centre of the sphere cap
        center: GeoPoint,
        /// Angular radius in radians
        radius: f64,
    },
}

/// Conjunction of predicates. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate
    ///
    /// ```rust
    /// use devcamper_api::query::Filter;
    ///
    /// let filter = Filter::new().eq("bootcamp", "5d725a037b292f5f8ceff787");
    /// assert_eq!(filter.predicates().len(), 1);
    /// ```
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::Compare {
            field: field.into(),
            comparison: Comparison::Eq(value.into()),
        })
    }

    /// Add an `In` predicate
    #[must_use]
    pub fn any_of(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.and(Predicate::Compare {
            field: field.into(),
            comparison: Comparison::In(values),
        })
    }

    /// Add a spherical containment predicate
    #[must_use]
    pub fn within_sphere(self, field: impl Into<String>, center: GeoPoint, radius: f64) -> Self {
        self.and(Predicate::WithinSphere {
            field: field.into(),
            center,
            radius,
        })
    }

    /// Add an arbitrary predicate
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Predicates in insertion order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether the filter has no predicates
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Parse non-reserved query pairs into a [`Filter`].
///
/// Repeated `in` keys accumulate and their values are split on commas; for every
/// other key the last occurrence wins.
pub fn parse_filter<'a, I>(pairs: I) -> Result<Filter, FilterParseError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut collated: Vec<((String, Operator), Vec<String>)> = Vec::new();

    for (key, value) in pairs {
        let captures = FILTER_KEY
            .captures(key)
            .ok_or_else(|| FilterParseError::InvalidKey(key.to_string()))?;
        let field = captures[1].to_string();
        if field.split('.').any(str::is_empty) {
            return Err(FilterParseError::InvalidKey(key.to_string()));
        }
        let operator = match captures.get(2) {
            None => Operator::Eq,
            Some(token) => Operator::parse(token.as_str()).ok_or_else(|| {
                FilterParseError::UnsupportedOperator {
                    field: field.clone(),
                    operator: token.as_str().to_string(),
                }
            })?,
        };

        let slot = match collated
            .iter()
            .position(|((f, op), _)| *f == field && *op == operator)
        {
            Some(index) => &mut collated[index].1,
            None => {
                collated.push(((field, operator), Vec::new()));
                let last = collated.len() - 1;
                &mut collated[last].1
            }
        };

        if operator == Operator::In {
            slot.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            );
        } else {
            slot.clear();
            slot.push(value.to_string());
        }
    }

    Ok(collated
        .into_iter()
        .fold(Filter::new(), |filter, ((field, operator), raw)| {
            filter.and(Predicate::Compare {
                field,
                comparison: Comparison::from_raw(operator, raw),
            })
        }))
}
