//! Query translation for list endpoints
//!
//! Raw query-string pairs become a typed [`ListParams`]: a [`Filter`] built from
//! `field[op]=value` keys plus the reserved `select`, `sort`, `page` and `limit`.
//! [`AdvancedResults`] runs those parameters against a collection and produces a
//! [`PagedResult`].

mod filter;
mod pagination;
mod params;
mod results;

pub use filter::{parse_filter, Comparison, Filter, FilterParseError, Operator, Predicate};
pub use pagination::{PageCursor, PageWindow, Pagination};
pub use params::{
    ListParams, Projection, SortKey, SortOrder, SortSpec, DEFAULT_LIMIT, DEFAULT_PAGE,
    DEFAULT_SORT_FIELD, RESERVED_PARAMS,
};
pub use results::{AdvancedResults, PagedResult, Populate, Relation};
