//! Expression Resolver
//!
//! Resolves `${...}` variable paths and template strings against the
//! execution context. A string that is exactly one reference yields the
//! referenced value with its native type; a string mixing references with
//! literal text yields a string with each reference substituted. Missing
//! data never raises: resolution stops and yields not-found, and the mode
//! decides how that renders (empty string in templates, null for a pure
//! reference).

pub mod errors;
pub mod methods;
pub mod path;
pub mod resolve;

pub use errors::ExprError;
pub use path::{parse_path, IndexKey, Path, Segment};
pub use resolve::{resolve, resolve_reference, Resolved};
