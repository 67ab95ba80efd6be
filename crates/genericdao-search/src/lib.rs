//! Criteria search for Generic DAO Rust.
//!
//! A [`Search`] describes *which* records of one entity to return: filters
//! (optionally OR-ed), sorts, field projections with aggregates, distinct and
//! paging. The [`SearchProcessor`] evaluates a search against the records a session
//! hands it.
//!
//! # Example
//!
//! ```ignore
//! let search = Search::for_entity("hero")
//!     .filter(Filter::greater_or_equal("age", 18))
//!     .filter(Filter::ilike("name", "spider%"))
//!     .sort(Sort::asc("name"))
//!     .max_results(10);
//!
//! let result = processor.search_and_count(session.records(&cx, "hero").await?, &search)?;
//! ```

pub mod example;
pub mod field;
pub mod filter;
pub mod like;
pub mod processor;
pub mod result;
pub mod search;
pub mod sort;

pub use example::{ExampleOptions, LikeMode, filter_from_example};
pub use field::{Field, FieldOp};
pub use filter::Filter;
pub use processor::{SearchConfig, SearchProcessor};
pub use result::SearchResult;
pub use search::Search;
pub use sort::Sort;
