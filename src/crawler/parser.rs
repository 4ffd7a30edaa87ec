//! HTML extraction for listing and detail pages
//!
//! This module turns raw HTML into data:
//! - Listing pages yield one entry per school plus the "next page" link
//! - Detail pages yield a map of normalized label -> value
//! - The group index page yields the list of groups
//!
//! Extraction never fails. Missing elements produce omitted fields or skipped
//! entries, and a detail page without the expected table produces `None`.

use crate::config::{parse_selector, SelectorConfig};
use crate::record::{normalize_field_name, Group};
use crate::url::resolve_href;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// One school as listed on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    /// Absolute detail URL; empty if the entry had no usable link
    pub detail_url: String,
    pub description: String,
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    /// Absolute URL of the next page in the chain, if any
    pub next_page: Option<String>,
}

/// Extracts records from pages
pub trait Extractor: Send + Sync {
    /// Extracts the listed entries and the next-page pointer
    fn extract_list(&self, html: &str, page_url: &Url) -> ListingPage;

    /// Extracts detail fields, or `None` if the page lacks the detail block
    fn extract_detail(&self, html: &str) -> Option<BTreeMap<String, String>>;

    /// Extracts the group list from a group index page
    fn extract_groups(&self, html: &str, page_url: &Url) -> Vec<Group>;
}

/// Selector-driven extractor for the school directory's page layout
#[derive(Debug, Clone)]
pub struct DirectoryExtractor {
    entry: Selector,
    entry_link: Selector,
    description: Selector,
    next_page: Selector,
    detail_table: Selector,
    group_link: Selector,
    row: Selector,
    cell: Selector,
}

impl DirectoryExtractor {
    /// Builds an extractor from configured selectors
    ///
    /// # Returns
    ///
    /// * `Ok(DirectoryExtractor)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector is not valid CSS
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            entry: parse_selector("entry", &selectors.entry)?,
            entry_link: parse_selector("entry-link", &selectors.entry_link)?,
            description: parse_selector("description", &selectors.description)?,
            next_page: parse_selector("next-page", &selectors.next_page)?,
            detail_table: parse_selector("detail-table", &selectors.detail_table)?,
            group_link: parse_selector("group-link", &selectors.group_link)?,
            row: parse_selector("row", "tr")?,
            cell: parse_selector("cell", "td")?,
        })
    }

    fn extract_entry(&self, entry: &ElementRef<'_>, page_url: &Url) -> Option<ListingEntry> {
        let link = entry.select(&self.entry_link).next()?;
        let name = element_text(&link);

        let detail_url = link
            .value()
            .attr("href")
            .and_then(|href| resolve_href(href, page_url))
            .unwrap_or_default();

        let description = entry
            .select(&self.description)
            .next()
            .map(|p| element_text(&p))
            .unwrap_or_default();

        Some(ListingEntry {
            name,
            detail_url,
            description,
        })
    }
}

#[cfg(test)]
impl Default for DirectoryExtractor {
    fn default() -> Self {
        Self::new(&SelectorConfig::default()).unwrap()
    }
}

impl Extractor for DirectoryExtractor {
    fn extract_list(&self, html: &str, page_url: &Url) -> ListingPage {
        let document = Html::parse_document(html);

        let entries = document
            .select(&self.entry)
            .filter_map(|entry| {
                let extracted = self.extract_entry(&entry, page_url);
                if extracted.is_none() {
                    tracing::trace!("Skipping listing entry without a link on {}", page_url);
                }
                extracted
            })
            .collect();

        let next_page = document
            .select(&self.next_page)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| resolve_href(href, page_url));

        ListingPage { entries, next_page }
    }

    fn extract_detail(&self, html: &str) -> Option<BTreeMap<String, String>> {
        let document = Html::parse_document(html);
        let table = document.select(&self.detail_table).next()?;

        let mut fields = BTreeMap::new();
        for row in table.select(&self.row) {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
            if cells.len() != 2 {
                continue;
            }

            let key = normalize_field_name(&element_text(&cells[0]));
            if key.is_empty() {
                continue;
            }
            fields.insert(key, element_text(&cells[1]));
        }

        Some(fields)
    }

    /// The group index is a tag cloud of links.
    ///
    /// Links without text are skipped. A link whose href can't be resolved is
    /// kept with an empty URL, and the walker skips it later.
    fn extract_groups(&self, html: &str, page_url: &Url) -> Vec<Group> {
        let document = Html::parse_document(html);

        document
            .select(&self.group_link)
            .filter_map(|link| {
                let name = element_text(&link);
                if name.is_empty() {
                    return None;
                }
                let url = link
                    .value()
                    .attr("href")
                    .and_then(|href| resolve_href(href, page_url))
                    .unwrap_or_default();
                Some(Group::new(name, url))
            })
            .collect()
    }
}

/// Text content of an element: each text node trimmed, then concatenated
///
/// No separator is inserted, so `Affiliation <b>ID</b>` reads as `AffiliationID`.
/// Field keys stay identical to those in previously harvested data.
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}
