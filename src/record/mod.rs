//! Record model for harvested directory entries
//!
//! # Components
//!
//! - `Group`: a named listing source whose pages are walked via pagination
//! - `Record`: one listed school, with its base fields and any detail fields merged in
//! - `EnrichmentPredicate`: decides whether a record already carries its detail fields

mod fields;
mod types;

pub use fields::{normalize_field_name, EnrichmentPredicate, DEFAULT_REQUIRED_FIELDS};
pub use types::{Group, Record, RESERVED_KEYS};
