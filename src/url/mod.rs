//! URL handling module
//!
//! This module resolves hrefs found on listing pages into absolute URLs and
//! produces the normalized keys the pagination walker uses to detect cycles.

mod normalize;
mod resolve;

// Re-export main functions
pub use normalize::{normalize_url, visit_key};
pub use resolve::{parse_page_url, resolve_href};
