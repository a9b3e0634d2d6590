//! The host page: a parsed document plus the browser-ish services the tool
//! relies on (selector lookup, geometry, hit testing, event listeners).

use crate::dom::dom_tree::{self, Document, NodeRef};
use crate::events::{EventKind, Phase, SharedRegistry};
use crate::layout_taffy::{BoundingBox, PageLayout, Viewport};
use crate::parser::{html, serialize};
use crate::store::page_key;
use crate::style::css_matcher;
use std::rc::Rc;
use url::Url;

#[derive(Debug)]
pub struct Page {
    url: Url,
    document: Document,
    viewport: Viewport,
    listeners: SharedRegistry,
}

impl Page {
    pub fn new(url: Url, document: Document, viewport: Viewport) -> Self {
        Page {
            url,
            document,
            viewport,
            listeners: Rc::default(),
        }
    }

    pub fn from_html(url: Url, html_content: &str, viewport: Viewport) -> Self {
        Self::new(url, html::create_dom_tree(html_content), viewport)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Storage grouping key for this page: host plus path.
    pub fn page_key(&self) -> String {
        page_key(&self.url)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn listeners(&self) -> &SharedRegistry {
        &self.listeners
    }

    pub fn has_capture_listener(&self, kind: EventKind) -> bool {
        self.listeners.borrow().has(kind, Phase::Capture)
    }

    /// First element matching `selector` in document order.
    pub fn query_selector(&self, selector: &str) -> Option<NodeRef> {
        css_matcher::query_selector(&self.document.root, selector)
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout::compute(&self.document, self.viewport)
    }

    pub fn bounding_box(&self, element: &NodeRef) -> Option<BoundingBox> {
        self.layout().bounding_box(element)
    }

    /// Topmost element under the point, ignoring elements `skip` rejects.
    pub fn element_from_point(
        &self,
        x: f32,
        y: f32,
        skip: impl Fn(&NodeRef) -> bool,
    ) -> Option<NodeRef> {
        self.layout().hit_test(x, y, skip)
    }

    pub fn to_html(&self) -> String {
        serialize::document_html(&self.document)
    }
}

pub fn get_attribute(element: &NodeRef, name: &str) -> Option<String> {
    element
        .borrow()
        .as_element()
        .and_then(|elem| elem.get_attribute(name).map(str::to_string))
}

pub fn set_attribute(element: &NodeRef, name: &str, value: &str) {
    if let Some(elem) = element.borrow_mut().as_element_mut() {
        elem.set_attribute(name, value);
    }
}

/// The raw `style` attribute, `""` when absent.
pub fn style_attribute(element: &NodeRef) -> String {
    get_attribute(element, "style").unwrap_or_default()
}

pub fn set_style_attribute(element: &NodeRef, css: &str) {
    set_attribute(element, "style", css);
}

pub fn inner_html(element: &NodeRef) -> String {
    serialize::inner_html(element)
}

/// Replaces the element's children with `markup` parsed in its context.
/// The markup is not sanitized.
pub fn set_inner_html(element: &NodeRef, markup: &str) {
    let Some(context) = element
        .borrow()
        .as_element()
        .map(|elem| elem.qual_name.clone())
    else {
        return;
    };
    let nodes = html::parse_fragment(markup, &context);
    dom_tree::remove_children(element);
    for node in nodes {
        dom_tree::append_child(element, node);
    }
}
