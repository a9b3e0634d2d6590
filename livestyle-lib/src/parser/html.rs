//! Parses HTML into the `crate::dom::dom_tree` node tree.
//!
//! html5ever drives a custom `TreeSink`; the same sink serves full documents
//! and fragments (the latter back `set_inner_html`).

use crate::dom::dom_tree::{self, ElementNode, Node, NodeData, NodeRef};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, NodeOrText, QuirksMode, TreeSink},
    namespace_url, ns, Attribute, LocalName, Namespace, QualName,
};
use log::debug;
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

/// Creates a DOM tree from the provided HTML content.
///
/// # Arguments
///
/// * `html_content` - A string slice containing the HTML to parse.
///
/// # Returns
///
/// A `dom_tree::Document`. html5ever never fails: malformed input is repaired
/// the way browsers repair it.
pub fn create_dom_tree(html_content: &str) -> dom_tree::Document {
    let tree_sink = LiveStyleTreeSink::new();
    html5ever::parse_document(tree_sink, Default::default()).one(html_content)
}

/// Parses `markup` as the children of an element with the given context name.
///
/// # Returns
///
/// The parsed top-level nodes, detached and ready to be appended elsewhere.
pub fn parse_fragment(markup: &str, context: &QualName) -> Vec<NodeRef> {
    let tree_sink = LiveStyleTreeSink::new();
    let document = html5ever::parse_fragment(
        tree_sink,
        Default::default(),
        context.clone(),
        Vec::new(),
    )
    .one(markup);

    // Fragment parsing wraps the result in a synthetic <html> element.
    let Some(wrapper) = document.document_element() else {
        return Vec::new();
    };
    let children = std::mem::take(&mut wrapper.borrow_mut().children);
    for child in &children {
        child.borrow_mut().parent = None;
    }
    children
}

/// A custom TreeSink for building the DOM tree used by the parser.
///
/// It holds the Document being built and the current quirks mode.
pub struct LiveStyleTreeSink {
    document: dom_tree::Document,
    quirks_mode: RefCell<QuirksMode>,
}

impl Default for LiveStyleTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveStyleTreeSink {
    pub fn new() -> Self {
        Self {
            document: dom_tree::new_document(),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }

    fn materialize(child: NodeOrText<NodeRef>) -> NodeRef {
        match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => Node::new(NodeData::Text(text.to_string())),
        }
    }

    /// Merges adjacent text the way a browser DOM would.
    fn try_merge_text(last: Option<&NodeRef>, text: &str) -> bool {
        if let Some(last) = last {
            if let NodeData::Text(existing) = &mut last.borrow_mut().data {
                existing.push_str(text);
                return true;
            }
        }
        false
    }
}

/// A simple implementation of the `ElemName` trait for our elements.
#[derive(Debug)]
pub struct LiveStyleElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for LiveStyleElemName {
    fn ns(&self) -> &Namespace {
        &self.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.local
    }
}

impl TreeSink for LiveStyleTreeSink {
    type Handle = NodeRef;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = LiveStyleElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        debug!("html parse error: {msg}");
    }

    fn get_document(&self) -> Self::Handle {
        Rc::clone(&self.document.root)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        match target.borrow().as_element() {
            Some(elem) => LiveStyleElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            },
            // html5ever only asks for names of nodes it created as elements.
            None => LiveStyleElemName {
                ns: ns!(),
                local: LocalName::from(""),
            },
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: html5ever::interface::ElementFlags,
    ) -> Self::Handle {
        let mut element = ElementNode::new(name);
        element.attributes = attrs
            .into_iter()
            .map(|attr| (attr.name, attr.value.to_string()))
            .collect();
        Node::new(NodeData::Element(element))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        Node::new(NodeData::Comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        Node::new(NodeData::Comment(format!("?{target} {data}")))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        if let NodeOrText::AppendText(text) = &child {
            if Self::try_merge_text(parent.borrow().children.last(), text) {
                return;
            }
        }
        dom_tree::append_child(parent, Self::materialize(child));
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if element.borrow().parent.is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        *self.document.doctype.borrow_mut() = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        Rc::clone(target)
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>) {
        dom_tree::insert_before(sibling, Self::materialize(child));
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut target_node = target.borrow_mut();
        if let Some(elem) = target_node.as_element_mut() {
            for attr in attrs {
                if elem.get_attribute(&attr.name.local).is_none() {
                    elem.attributes.push((attr.name, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        dom_tree::detach(target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        dom_tree::reparent_children(node, new_parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tags(nodes: &[NodeRef]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|node| node.borrow().as_element().map(|elem| elem.tag.clone()))
            .collect()
    }

    #[test]
    fn test_document_has_head_and_body() {
        let document = create_dom_tree("<p>Hello</p>");
        let html = document.document_element().unwrap();
        assert_eq!(tags(&html.borrow().children), vec!["head", "body"]);
        assert!(document.body().is_some());
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let document =
            create_dom_tree(r#"<a href="https://example.com" target="_blank" data-test="123">x</a>"#);
        let anchor = document.find_by_tag("a").unwrap();
        let anchor = anchor.borrow();
        let names: Vec<_> = anchor
            .as_element()
            .unwrap()
            .attributes
            .iter()
            .map(|(name, _)| name.local.to_string())
            .collect();
        assert_eq!(names, vec!["href", "target", "data-test"]);
    }

    #[test]
    fn test_parent_links_are_set() {
        let document = create_dom_tree("<div><span>x</span></div>");
        let span = document.find_by_tag("span").unwrap();
        let parent = span.borrow().parent().unwrap();
        assert_eq!(parent.borrow().as_element().unwrap().tag, "div");
    }

    #[test]
    fn test_doctype() {
        let document = create_dom_tree("<!DOCTYPE html><html><head></head></html>");
        assert_eq!(document.doctype.borrow().as_ref().unwrap().name, "html");
    }

    #[test]
    fn test_table_autocorrection() {
        let document = create_dom_tree("<table><td>Cell</td></table>");
        assert!(document.find_by_tag("tbody").is_some());
        assert!(document.find_by_tag("tr").is_some());
    }

    #[test]
    fn test_fragment_in_div_context() {
        let context = QualName::new(None, ns!(html), LocalName::from("div"));
        let nodes = parse_fragment("<b>x</b> tail", &context);
        assert_eq!(nodes.len(), 2);
        assert_eq!(tags(&nodes), vec!["b"]);
        assert!(nodes.iter().all(|node| node.borrow().parent.is_none()));
    }
}
