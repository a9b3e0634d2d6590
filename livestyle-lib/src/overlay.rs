//! Nodes the tool injects into the page: its stylesheet, the panel and the
//! hover highlight. Every injected id starts with [`ID_PREFIX`].

use crate::dom::dom_tree::{self, ElementNode, Node, NodeData, NodeRef};
use crate::layout_taffy::BoundingBox;
use crate::page::{set_style_attribute, Page};
use log::debug;
use std::rc::Rc;

pub const ID_PREFIX: &str = "__lse_";
pub const STYLE_ID: &str = "__lse_style";
pub const PANEL_ID: &str = "__lse_panel";
pub const INFO_ID: &str = "__lse_info";
pub const HIGHLIGHT_ID: &str = "__lse_highlight";

const HIDDEN: &str = "display: none;";

const STYLESHEET: &str = "\
#__lse_panel { position: fixed; z-index: 2147483647; background: #fff; \
border: 1px solid #888; font: 12px sans-serif; }
#__lse_panel textarea { width: 100%; box-sizing: border-box; }
#__lse_highlight { position: absolute; z-index: 2147483646; \
pointer-events: none; outline: 2px solid #e91e63; background: rgba(233, 30, 99, 0.1); }
";

const PANEL_STYLE: &str = "position: absolute; right: 12px; top: 12px; width: 360px; padding: 8px;";

#[derive(Debug)]
pub struct Overlay {
    style_node: NodeRef,
    panel: NodeRef,
    info: NodeRef,
    highlight: NodeRef,
}

fn element(tag: &str, id: &str) -> NodeRef {
    let mut elem = ElementNode::html(tag);
    elem.set_attribute("id", id);
    Node::new(NodeData::Element(elem))
}

impl Overlay {
    /// Appends the stylesheet to `<head>` and the panel and highlight to
    /// `<body>`. Documents without those elements get the nodes under the
    /// document element instead.
    pub fn inject(page: &Page) -> Self {
        let document = page.document();
        let fallback = || {
            document
                .document_element()
                .unwrap_or_else(|| Rc::clone(&document.root))
        };
        let head = document.head().unwrap_or_else(fallback);
        let body = document.body().unwrap_or_else(fallback);

        let style_node = element("style", STYLE_ID);
        dom_tree::append_child(
            &style_node,
            Node::new(NodeData::Text(STYLESHEET.to_string())),
        );
        dom_tree::append_child(&head, Rc::clone(&style_node));

        let panel = element("div", PANEL_ID);
        set_style_attribute(&panel, PANEL_STYLE);
        let info = element("div", INFO_ID);
        dom_tree::append_child(&panel, Rc::clone(&info));
        dom_tree::append_child(&body, Rc::clone(&panel));

        let highlight = element("div", HIGHLIGHT_ID);
        set_style_attribute(&highlight, HIDDEN);
        dom_tree::append_child(&body, Rc::clone(&highlight));

        debug!("overlay injected into {}", page.url());
        Overlay {
            style_node,
            panel,
            info,
            highlight,
        }
    }

    /// True for any injected node or anything inside one.
    pub fn contains(&self, node: &NodeRef) -> bool {
        [&self.style_node, &self.panel, &self.highlight]
            .into_iter()
            .any(|root| dom_tree::is_inclusive_descendant(node, root))
    }

    /// The highlight never takes pointer hits.
    pub fn is_highlight(&self, node: &NodeRef) -> bool {
        Rc::ptr_eq(node, &self.highlight)
    }

    pub fn highlight(&self) -> &NodeRef {
        &self.highlight
    }

    pub fn panel(&self) -> &NodeRef {
        &self.panel
    }

    /// Moves the highlight over `rect`, or hides it.
    pub fn show_highlight(&self, rect: Option<BoundingBox>) {
        let style = match rect {
            Some(rect) => format!(
                "position: absolute; display: block; left: {}px; top: {}px; width: {}px; height: {}px;",
                rect.left, rect.top, rect.width, rect.height
            ),
            None => HIDDEN.to_string(),
        };
        set_style_attribute(&self.highlight, &style);
    }

    pub fn is_highlight_visible(&self) -> bool {
        crate::page::style_attribute(&self.highlight) != HIDDEN
    }

    /// Replaces the panel's status line.
    pub fn set_info(&self, text: &str) {
        dom_tree::remove_children(&self.info);
        if !text.is_empty() {
            dom_tree::append_child(&self.info, Node::new(NodeData::Text(text.to_string())));
        }
    }

    /// Takes every injected node back out of the page.
    pub fn remove(self) {
        for node in [&self.style_node, &self.panel, &self.highlight] {
            dom_tree::detach(node);
        }
        debug!("overlay removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_taffy::Viewport;
    use crate::page::{inner_html, style_attribute};
    use pretty_assertions::assert_eq;
    use url::Url;

    fn page(markup: &str) -> Page {
        Page::from_html(
            Url::parse("https://example.com/").unwrap(),
            markup,
            Viewport::default(),
        )
    }

    #[test]
    fn test_inject_places_nodes() {
        let page = page("<p>hi</p>");
        let overlay = Overlay::inject(&page);
        assert!(page.query_selector("head > #__lse_style").is_some());
        assert!(page.query_selector("body > #__lse_panel > #__lse_info").is_some());
        assert!(page.query_selector("body > #__lse_highlight").is_some());
        assert!(!overlay.is_highlight_visible());

        let info = page.query_selector("#__lse_info").unwrap();
        assert!(overlay.contains(&info));
        assert!(!overlay.contains(&page.query_selector("p").unwrap()));
    }

    #[test]
    fn test_highlight_follows_rect() {
        let page = page("<p>hi</p>");
        let overlay = Overlay::inject(&page);
        overlay.show_highlight(Some(BoundingBox {
            left: 8.0,
            top: 16.0,
            width: 100.0,
            height: 18.0,
        }));
        assert_eq!(
            style_attribute(overlay.highlight()),
            "position: absolute; display: block; left: 8px; top: 16px; width: 100px; height: 18px;"
        );
        assert!(overlay.is_highlight_visible());
        overlay.show_highlight(None);
        assert_eq!(style_attribute(overlay.highlight()), "display: none;");
    }

    #[test]
    fn test_set_info_replaces_text() {
        let page = page("");
        let overlay = Overlay::inject(&page);
        overlay.set_info("Selected: #x");
        overlay.set_info("Selected: p");
        let info = page.query_selector("#__lse_info").unwrap();
        assert_eq!(inner_html(&info), "Selected: p");
    }

    #[test]
    fn test_remove_detaches_everything() {
        let page = page("<p>hi</p>");
        let before = page.to_html();
        Overlay::inject(&page).remove();
        assert!(page.query_selector(&format!("[id^={ID_PREFIX}]")).is_none());
        assert_eq!(page.to_html(), before);
    }
}
