//! Field naming and the enrichment predicate

use crate::record::Record;

/// Required fields used when the configuration doesn't name any
pub const DEFAULT_REQUIRED_FIELDS: &[&str] = &["affiliate_id", "affiliation_id"];

/// Normalizes a detail-page label into a field name
///
/// The label is trimmed and lower-cased, then every space and every `/` is
/// replaced with `_`. Nothing else is touched, so `"Affiliation ID"` becomes
/// `affiliation_id` and `"Phone / Fax"` becomes `phone___fax`.
///
/// # Examples
///
/// ```
/// use school_harvest::normalize_field_name;
///
/// assert_eq!(normalize_field_name("Affiliation ID"), "affiliation_id");
/// assert_eq!(normalize_field_name("Std/Code"), "std_code");
/// ```
pub fn normalize_field_name(label: &str) -> String {
    label.trim().to_lowercase().replace([' ', '/'], "_")
}

/// Decides whether a record has already been enriched
///
/// A record counts as enriched iff its detail fields contain at least one of
/// the required field names. This is the resume check: enriched records are
/// skipped without a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentPredicate {
    required_fields: Vec<String>,
}

impl EnrichmentPredicate {
    pub fn new<I, S>(required_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_fields: required_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    pub fn is_enriched(&self, record: &Record) -> bool {
        self.required_fields
            .iter()
            .any(|field| record.fields.contains_key(field))
    }
}

impl Default for EnrichmentPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_FIELDS.iter().copied())
    }
}
