//! The editor itself and the host that keeps one of it per page.

use crate::error::LiveStyleError;
use crate::events::{EventOutcome, PageEvent};
use crate::host::{Clipboard, Notifier};
use crate::layout_taffy::Viewport;
use crate::overlay::Overlay;
use crate::page::{self, Page};
use crate::persistence::{ReconcileReport, StyleVault};
use crate::picker::{PickedElement, Picker, Transition};
use crate::selector::derive_selector;
use crate::storage::KeyValueStorage;
use crate::store::{StyleStore, StyledElementRecord};
use log::{debug, info, warn};
use std::rc::Rc;

pub const DEFAULT_STORAGE_KEY: &str = "__lse_styles";

pub const MSG_NO_ELEMENT: &str = "No element selected";
pub const MSG_SELECT_FIRST: &str = "Select an element first";
pub const MSG_SAVED: &str = "Styles saved for this page.";
pub const MSG_NOTHING_SAVED: &str = "No saved styles for this page.";
pub const MSG_APPLIED: &str = "Styles applied from saved data.";
pub const MSG_EXPORTED: &str = "All saved styles copied to clipboard. Share or backup this JSON.";
pub const MSG_IMPORTED: &str = "Imported styles saved.";
pub const MSG_INVALID_JSON: &str = "Invalid JSON";
pub const IMPORT_PROMPT: &str = "Paste previously exported JSON:";

#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfig {
    /// Storage key the whole style store lives under.
    pub storage_key: String,
    pub viewport: Viewport,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            viewport: Viewport::default(),
        }
    }
}

/// External services the tool needs.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Rc<dyn KeyValueStorage>,
    pub clipboard: Rc<dyn Clipboard>,
    pub notifier: Rc<dyn Notifier>,
}

pub struct LiveStyleTool {
    page: Rc<Page>,
    overlay: Overlay,
    picker: Picker,
    vault: StyleVault,
    clipboard: Rc<dyn Clipboard>,
    notifier: Rc<dyn Notifier>,
    css_field: String,
    markup_field: String,
}

impl LiveStyleTool {
    fn new(page: Rc<Page>, config: &ToolConfig, collaborators: Collaborators) -> Self {
        let overlay = Overlay::inject(&page);
        LiveStyleTool {
            page,
            overlay,
            picker: Picker::new(),
            vault: StyleVault::new(collaborators.storage, config.storage_key.clone()),
            clipboard: collaborators.clipboard,
            notifier: collaborators.notifier,
            css_field: String::new(),
            markup_field: String::new(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn start_selection(&mut self) {
        self.picker.start(&self.page);
    }

    pub fn is_selecting(&self) -> bool {
        self.picker.is_selecting()
    }

    pub fn selected(&self) -> Option<&PickedElement> {
        self.picker.selected()
    }

    pub fn handle_event(&mut self, event: &PageEvent) -> EventOutcome {
        let transition = self.picker.handle_event(&self.page, &self.overlay, event);
        if transition == Transition::Picked {
            if let Some(picked) = self.picker.selected() {
                self.css_field = picked.original_style.clone();
                self.markup_field = picked.original_markup.clone();
                self.overlay.set_info(&format!("Selected: {}", picked.selector));
            }
        }
        transition.outcome()
    }

    pub fn css_field(&self) -> &str {
        &self.css_field
    }

    pub fn markup_field(&self) -> &str {
        &self.markup_field
    }

    pub fn set_css_field(&mut self, css: impl Into<String>) {
        self.css_field = css.into();
    }

    pub fn set_markup_field(&mut self, markup: impl Into<String>) {
        self.markup_field = markup.into();
    }

    /// Text of the panel's status line.
    pub fn status(&self) -> String {
        self.page
            .query_selector(&format!("#{}", crate::overlay::INFO_ID))
            .map(|info| page::inner_html(&info))
            .unwrap_or_default()
    }

    fn fail<T>(&self, message: &str, err: LiveStyleError) -> Result<T, LiveStyleError> {
        self.notifier.alert(message);
        Err(err)
    }

    /// Writes the edit fields into the picked element verbatim.
    pub fn apply(&mut self) -> Result<(), LiveStyleError> {
        let Some(picked) = self.picker.selected() else {
            return self.fail(MSG_NO_ELEMENT, LiveStyleError::NoElementSelected);
        };
        page::set_style_attribute(&picked.element, &self.css_field);
        page::set_inner_html(&picked.element, &self.markup_field);
        debug!("applied edits to {}", picked.selector);
        Ok(())
    }

    /// Restores the picked element and the fields to the pick-time snapshot.
    pub fn reset(&mut self) {
        let Some(picked) = self.picker.selected() else {
            return;
        };
        page::set_style_attribute(&picked.element, &picked.original_style);
        page::set_inner_html(&picked.element, &picked.original_markup);
        self.css_field = picked.original_style.clone();
        self.markup_field = picked.original_markup.clone();
    }

    /// Saves the picked element's current inline style for this page.
    pub async fn save(&self) -> Result<StyledElementRecord, LiveStyleError> {
        let Some(picked) = self.picker.selected() else {
            return self.fail(MSG_SELECT_FIRST, LiveStyleError::NoElementSelected);
        };
        let record = StyledElementRecord {
            selector: derive_selector(&picked.element),
            css: page::style_attribute(&picked.element),
        };
        self.vault
            .save(&self.page.page_key(), record.clone())
            .await?;
        self.notifier.alert(MSG_SAVED);
        Ok(record)
    }

    pub async fn load(&self) -> Result<ReconcileReport, LiveStyleError> {
        match self.vault.load(&self.page).await {
            Ok(report) => {
                self.notifier.alert(MSG_APPLIED);
                Ok(report)
            }
            Err(err @ LiveStyleError::NothingSaved { .. }) => self.fail(MSG_NOTHING_SAVED, err),
            Err(err) => Err(err),
        }
    }

    async fn auto_reconcile(&self) -> Result<ReconcileReport, LiveStyleError> {
        let report = self.vault.auto_reconcile(&self.page).await?;
        if !report.unresolved.is_empty() {
            warn!(
                "{} saved selector(s) matched nothing: {:?}",
                report.unresolved.len(),
                report.unresolved
            );
        }
        Ok(report)
    }

    /// Copies the whole store to the clipboard and returns the copied text.
    pub async fn export(&self) -> Result<String, LiveStyleError> {
        let text = self.vault.export().await?;
        self.clipboard.write_text(&text).await?;
        self.notifier.alert(MSG_EXPORTED);
        Ok(text)
    }

    /// Prompts for transfer text and replaces the store with it.
    /// `Ok(None)` when the prompt was cancelled or left empty.
    pub async fn import(&self) -> Result<Option<StyleStore>, LiveStyleError> {
        let text = match self.notifier.prompt(IMPORT_PROMPT) {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(None),
        };
        match self.vault.import(&text).await {
            Ok(store) => {
                self.notifier.alert(MSG_IMPORTED);
                Ok(Some(store))
            }
            Err(err) if err.is_malformed_data() => self.fail(MSG_INVALID_JSON, err),
            Err(err) => Err(err),
        }
    }

    fn close(mut self) {
        self.picker.stop(&self.overlay);
        self.overlay.remove();
    }
}

/// Owns the page and at most one live tool on it.
pub struct ToolHost {
    page: Rc<Page>,
    tool: Option<LiveStyleTool>,
}

impl ToolHost {
    pub fn new(page: Page) -> Self {
        ToolHost {
            page: Rc::new(page),
            tool: None,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_active(&self) -> bool {
        self.tool.is_some()
    }

    /// Injects the tool and reapplies this page's saved styles.
    pub async fn init(
        &mut self,
        config: &ToolConfig,
        collaborators: Collaborators,
    ) -> Result<&mut LiveStyleTool, LiveStyleError> {
        if self.tool.is_some() {
            return Err(LiveStyleError::AlreadyActive);
        }
        let tool = LiveStyleTool::new(Rc::clone(&self.page), config, collaborators);
        let report = match tool.auto_reconcile().await {
            Ok(report) => report,
            Err(err) => {
                tool.close();
                return Err(err);
            }
        };
        info!(
            "live style editor active on {} ({} saved style(s) applied)",
            self.page.page_key(),
            report.applied
        );
        Ok(self.tool.insert(tool))
    }

    pub fn tool(&mut self) -> Result<&mut LiveStyleTool, LiveStyleError> {
        self.tool.as_mut().ok_or(LiveStyleError::NotActive)
    }

    /// Routes `event` to the tool if it is capturing that kind of event.
    pub fn dispatch(&mut self, event: &PageEvent) -> EventOutcome {
        if !self.page.has_capture_listener(event.kind()) {
            return EventOutcome::default();
        }
        match self.tool.as_mut() {
            Some(tool) => tool.handle_event(event),
            None => EventOutcome::default(),
        }
    }

    /// Removes the tool and everything it injected.
    pub fn teardown(&mut self) -> Result<(), LiveStyleError> {
        let tool = self.tool.take().ok_or(LiveStyleError::NotActive)?;
        tool.close();
        debug!("live style editor closed");
        Ok(())
    }
}
