//! Saving, loading and transferring style overrides through storage.
//!
//! Every operation does at most one read and one write of the stored value;
//! nothing is held between calls, so two pages writing at once race and the
//! last write wins.

use crate::error::{LiveStyleError, StorageError};
use crate::page::{set_style_attribute, Page};
use crate::storage::KeyValueStorage;
use crate::store::{StyleStore, StyledElementRecord};
use log::{debug, info, warn};
use std::rc::Rc;

/// Outcome of applying a page's records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: usize,
    /// Selectors that matched nothing, in record order.
    pub unresolved: Vec<String>,
}

pub struct StyleVault {
    storage: Rc<dyn KeyValueStorage>,
    storage_key: String,
}

impl StyleVault {
    pub fn new(storage: Rc<dyn KeyValueStorage>, storage_key: impl Into<String>) -> Self {
        StyleVault {
            storage,
            storage_key: storage_key.into(),
        }
    }

    /// The stored store, empty when nothing was ever saved.
    pub async fn read(&self) -> Result<StyleStore, LiveStyleError> {
        match self.storage.get(&self.storage_key).await? {
            Some(text) => StyleStore::from_json(&text).map_err(|err| match err {
                LiveStyleError::MalformedImport(json) => StorageError::Corrupt(json).into(),
                LiveStyleError::UnsupportedVersion { found, supported } => {
                    StorageError::UnsupportedVersion { found, supported }.into()
                }
                other => other,
            }),
            None => Ok(StyleStore::new()),
        }
    }

    async fn write(&self, store: &StyleStore) -> Result<(), LiveStyleError> {
        let text = store.to_json()?;
        self.storage.set(&self.storage_key, &text).await?;
        Ok(())
    }

    /// Upserts `record` under `page_key`.
    pub async fn save(&self, page_key: &str, record: StyledElementRecord) -> Result<(), LiveStyleError> {
        let mut store = self.read().await?;
        debug!("saving {:?} for {page_key}", record.selector);
        store.upsert(page_key, record);
        self.write(&store).await
    }

    /// Applies every saved record for the page to its first match.
    pub async fn load(&self, page: &Page) -> Result<ReconcileReport, LiveStyleError> {
        let page_key = page.page_key();
        let store = self.read().await?;
        let records = store
            .page(&page_key)
            .ok_or(LiveStyleError::NothingSaved { page_key: page_key.clone() })?;
        let report = reconcile(page, records);
        debug!(
            "reconciled {page_key}: {} applied, {} unresolved",
            report.applied,
            report.unresolved.len()
        );
        Ok(report)
    }

    /// Like [`load`](Self::load), but best effort: a page with nothing saved
    /// or a stored value that cannot be read applies nothing. Storage
    /// failures still propagate.
    pub async fn auto_reconcile(&self, page: &Page) -> Result<ReconcileReport, LiveStyleError> {
        match self.load(page).await {
            Err(LiveStyleError::NothingSaved { .. }) => Ok(ReconcileReport::default()),
            Err(LiveStyleError::Storage(err)) if err.is_unreadable_value() => {
                warn!("skipping saved styles: {err}");
                Ok(ReconcileReport::default())
            }
            result => result,
        }
    }

    /// The whole store as transfer text.
    pub async fn export(&self) -> Result<String, LiveStyleError> {
        self.read().await?.to_json()
    }

    /// Replaces the whole store with `text`. Storage is not touched unless
    /// `text` parses.
    pub async fn import(&self, text: &str) -> Result<StyleStore, LiveStyleError> {
        let store = StyleStore::from_json(text)?;
        self.write(&store).await?;
        info!("imported styles for {} page(s)", store.len());
        Ok(store)
    }
}

/// Overwrites the inline style of each record's first match.
pub fn reconcile(page: &Page, records: &[StyledElementRecord]) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for record in records {
        match page.query_selector(&record.selector) {
            Some(element) => {
                set_style_attribute(&element, &record.css);
                report.applied += 1;
            }
            None => report.unresolved.push(record.selector.clone()),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_taffy::Viewport;
    use crate::page::style_attribute;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use url::Url;

    const KEY: &str = "__lse_styles";

    fn vault() -> (MemoryStorage, StyleVault) {
        let storage = MemoryStorage::new();
        let vault = StyleVault::new(Rc::new(storage.clone()), KEY);
        (storage, vault)
    }

    fn page(markup: &str) -> Page {
        Page::from_html(Url::parse("https://example.com/").unwrap(), markup, Viewport::default())
    }

    fn record(selector: &str, css: &str) -> StyledElementRecord {
        StyledElementRecord {
            selector: selector.into(),
            css: css.into(),
        }
    }

    #[test]
    fn test_read_empty_storage() {
        let (_storage, vault) = vault();
        assert!(block_on(vault.read()).unwrap().is_empty());
    }

    #[test]
    fn test_load_applies_and_reports() {
        let (_storage, vault) = vault();
        block_on(vault.save("example.com/", record("#x", "color: red;"))).unwrap();
        block_on(vault.save("example.com/", record("#gone", "color: blue;"))).unwrap();

        let page = page(r#"<div id="x" style="margin: 1px;">x</div>"#);
        let report = block_on(vault.load(&page)).unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                applied: 1,
                unresolved: vec!["#gone".to_string()],
            }
        );
        assert_eq!(style_attribute(&page.query_selector("#x").unwrap()), "color: red;");
    }

    #[test]
    fn test_load_nothing_saved() {
        let (_storage, vault) = vault();
        block_on(vault.save("other.org/", record("#x", "color: red;"))).unwrap();
        let page = page(r#"<div id="x">x</div>"#);
        let err = block_on(vault.load(&page)).unwrap_err();
        assert!(matches!(err, LiveStyleError::NothingSaved { ref page_key } if page_key == "example.com/"));
        assert_eq!(block_on(vault.auto_reconcile(&page)).unwrap(), ReconcileReport::default());
        assert_eq!(style_attribute(&page.query_selector("#x").unwrap()), "");
    }

    #[test]
    fn test_corrupt_stored_value_is_a_storage_error() {
        let (storage, vault) = vault();
        block_on(storage.set(KEY, "{ nope")).unwrap();
        let err = block_on(vault.export()).unwrap_err();
        assert!(matches!(err, LiveStyleError::Storage(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_newer_stored_version_is_a_storage_error() {
        let (storage, vault) = vault();
        block_on(storage.set(KEY, r#"{"version": 2, "pages": {}}"#)).unwrap();
        let err = block_on(vault.export()).unwrap_err();
        assert!(matches!(
            err,
            LiveStyleError::Storage(StorageError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn test_auto_reconcile_skips_unreadable_store() {
        let (storage, vault) = vault();
        let page = page(r#"<div id="x">x</div>"#);
        for stored in [r#"{"example.com/":[{"selector":"x"}]}"#, r#"{"version": 2, "pages": {}}"#] {
            block_on(storage.set(KEY, stored)).unwrap();
            assert_eq!(block_on(vault.auto_reconcile(&page)).unwrap(), ReconcileReport::default());
        }
        assert!(block_on(vault.load(&page)).is_err());
    }

    #[test]
    fn test_auto_reconcile_propagates_backend_failure() {
        struct Unreachable;

        #[async_trait::async_trait(?Send)]
        impl KeyValueStorage for Unreachable {
            async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
                Err(StorageError::Backend("offline".into()))
            }

            async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
                Err(StorageError::Backend("offline".into()))
            }
        }

        let vault = StyleVault::new(Rc::new(Unreachable), KEY);
        let err = block_on(vault.auto_reconcile(&page("<p>x</p>"))).unwrap_err();
        assert!(matches!(err, LiveStyleError::Storage(StorageError::Backend(_))));
    }

    #[test]
    fn test_invalid_import_leaves_storage_alone() {
        let (storage, vault) = vault();
        block_on(vault.save("example.com/", record("#x", "color: red;"))).unwrap();
        let before = storage.value(KEY);
        for text in ["not json", r#"{"version": 9, "pages": {}}"#, "[1, 2]"] {
            let err = block_on(vault.import(text)).unwrap_err();
            assert!(err.is_malformed_data(), "{text}");
        }
        assert_eq!(storage.value(KEY), before);
    }

    #[test]
    fn test_import_replaces_everything() {
        let (_storage, vault) = vault();
        block_on(vault.save("example.com/", record("#x", "color: red;"))).unwrap();
        block_on(vault.import(r#"{ "other.org/": [ { "selector": "p", "css": "" } ] }"#)).unwrap();
        let store = block_on(vault.read()).unwrap();
        assert_eq!(store.page_keys().collect::<Vec<_>>(), vec!["other.org/"]);
    }

    #[test]
    fn test_failed_write_propagates() {
        let (storage, vault) = vault();
        storage.set_fail_writes(true);
        let err = block_on(vault.save("example.com/", record("#x", ""))).unwrap_err();
        assert!(matches!(err, LiveStyleError::Storage(StorageError::Backend(_))));
    }
}
