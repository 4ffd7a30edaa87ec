use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Serialized keys of the base fields. Detail fields may never shadow these.
pub const RESERVED_KEYS: &[&str] = &[
    "school_name",
    "school_link",
    "school_description",
    "school_district",
];

/// Reads a string field that may be `null` in files written by older tools
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named listing source (a district) and the first page of its listing chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Display name, stamped onto every record found under this group
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    /// URL of the first listing page
    #[serde(
        rename = "url",
        alias = "source_url",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub source_url: String,
}

impl Group {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
        }
    }
}

/// A single harvested school
///
/// The base fields come from the listing page. Everything merged in from the
/// detail page lives in `fields`, which is flattened into the same JSON object
/// when serialized, so the on-disk shape is one flat map per school.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "school_name", default, deserialize_with = "null_as_empty")]
    pub name: String,

    /// Join key for the detail fetch; may be empty if the listing had no link
    #[serde(rename = "school_link", default, deserialize_with = "null_as_empty")]
    pub detail_url: String,

    #[serde(rename = "school_description", default, deserialize_with = "null_as_empty")]
    pub description: String,

    /// Name of the owning group
    #[serde(rename = "school_district", default, deserialize_with = "null_as_empty")]
    pub group: String,

    /// Open-ended detail fields keyed by normalized label
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// Creates a base record with no detail fields
    pub fn new(
        name: impl Into<String>,
        detail_url: impl Into<String>,
        description: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            detail_url: detail_url.into(),
            description: description.into(),
            group: group.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Merges detail fields into this record
    ///
    /// Base fields are never modified and keys that would collide with a base
    /// field's serialized name are dropped. Existing detail fields are
    /// overwritten (last write wins).
    ///
    /// Returns the number of fields actually merged.
    pub fn merge_fields<I>(&mut self, fields: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = 0;
        for (key, value) in fields {
            if key.is_empty() || RESERVED_KEYS.contains(&key.as_str()) {
                tracing::trace!("Dropping reserved or empty detail key '{}'", key);
                continue;
            }
            self.fields.insert(key, value);
            merged += 1;
        }
        merged
    }

    /// Looks up a detail field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn has_detail_url(&self) -> bool {
        !self.detail_url.trim().is_empty()
    }
}
