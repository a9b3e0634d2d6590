//! Saved style overrides and their persisted / transfer format.
//!
//! The stored value and the Export/Import text share one versioned JSON
//! envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "pages": {
//!     "example.com/": [{ "selector": "#x", "css": "background: yellow;" }]
//!   }
//! }
//! ```
//!
//! The unversioned form (the bare `pages` map) is still read and migrated.

use crate::error::LiveStyleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

pub const FORMAT_VERSION: u32 = 1;

/// One saved override: which element, and its inline style at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledElementRecord {
    pub selector: String,
    pub css: String,
}

/// Records for one page, at most one per selector.
pub type PageStyleSet = Vec<StyledElementRecord>;

/// Every page's saved overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleStore {
    pages: BTreeMap<String, PageStyleSet>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    pages: &'a BTreeMap<String, PageStyleSet>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFormat {
    Versioned {
        version: u32,
        pages: BTreeMap<String, PageStyleSet>,
    },
    Legacy(BTreeMap<String, PageStyleSet>),
}

impl StyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the envelope or the legacy bare mapping.
    pub fn from_json(text: &str) -> Result<Self, LiveStyleError> {
        let pages = match serde_json::from_str::<StoredFormat>(text)? {
            StoredFormat::Versioned { version, pages } => {
                if version > FORMAT_VERSION {
                    return Err(LiveStyleError::UnsupportedVersion {
                        found: version,
                        supported: FORMAT_VERSION,
                    });
                }
                pages
            }
            StoredFormat::Legacy(pages) => pages,
        };
        Ok(StyleStore { pages })
    }

    /// Pretty-printed envelope at the current version.
    pub fn to_json(&self) -> Result<String, LiveStyleError> {
        let envelope = EnvelopeRef {
            version: FORMAT_VERSION,
            pages: &self.pages,
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    pub fn page(&self, page_key: &str) -> Option<&PageStyleSet> {
        self.pages.get(page_key)
    }

    /// Replaces the record with the same selector, or appends.
    pub fn upsert(&mut self, page_key: &str, record: StyledElementRecord) {
        let records = self.pages.entry(page_key.to_string()).or_default();
        match records
            .iter_mut()
            .find(|existing| existing.selector == record.selector)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn page_keys(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Grouping key for a page: host plus path, query and fragment dropped.
pub fn page_key(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}
