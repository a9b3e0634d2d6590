use html5ever::{namespace_url, ns, LocalName, QualName};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub mod dom_tree {
    use super::*;

    /// Shared handle to a node of the live document.
    pub type NodeRef = Rc<RefCell<Node>>;

    #[derive(Debug)]
    pub struct Node {
        pub data: NodeData,
        pub parent: Option<Weak<RefCell<Node>>>,
        pub children: Vec<NodeRef>,
    }

    #[derive(Debug, Clone)]
    pub enum NodeData {
        DocumentRoot,
        Element(ElementNode),
        Text(String),
        Comment(String),
    }

    #[derive(Debug, Clone)]
    pub struct ElementNode {
        pub tag: String,
        pub qual_name: QualName,
        /// Attributes in source order.
        pub attributes: Vec<(QualName, String)>,
    }

    #[derive(Debug)]
    pub struct Document {
        pub root: NodeRef,
        pub doctype: RefCell<Option<Doctype>>,
    }

    #[derive(Debug, Clone)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    impl Node {
        pub fn new(data: NodeData) -> NodeRef {
            Rc::new(RefCell::new(Node {
                data,
                parent: None,
                children: Vec::new(),
            }))
        }

        pub fn as_element(&self) -> Option<&ElementNode> {
            match &self.data {
                NodeData::Element(elem) => Some(elem),
                _ => None,
            }
        }

        pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
            match &mut self.data {
                NodeData::Element(elem) => Some(elem),
                _ => None,
            }
        }

        pub fn is_element(&self) -> bool {
            matches!(self.data, NodeData::Element(_))
        }

        pub fn parent(&self) -> Option<NodeRef> {
            self.parent.as_ref().and_then(Weak::upgrade)
        }
    }

    impl ElementNode {
        pub fn new(qual_name: QualName) -> Self {
            ElementNode {
                tag: qual_name.local.to_string(),
                qual_name,
                attributes: Vec::new(),
            }
        }

        /// Creates an HTML-namespaced element, e.g. for overlay nodes.
        pub fn html(tag: &str) -> Self {
            Self::new(QualName::new(None, ns!(html), LocalName::from(tag)))
        }

        pub fn get_attribute(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }

        /// Overwrites the attribute in place or appends it.
        pub fn set_attribute(&mut self, name: &str, value: &str) {
            if let Some(slot) = self
                .attributes
                .iter_mut()
                .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
            {
                slot.1 = value.to_string();
                return;
            }
            self.attributes.push((
                QualName::new(None, ns!(), LocalName::from(name)),
                value.to_string(),
            ));
        }

        pub fn id(&self) -> Option<&str> {
            self.get_attribute("id")
        }

        /// Whitespace-separated class tokens in attribute order.
        pub fn classes(&self) -> impl Iterator<Item = &str> {
            self.get_attribute("class")
                .unwrap_or_default()
                .split_whitespace()
        }
    }

    pub fn new_document() -> Document {
        Document {
            root: Node::new(NodeData::DocumentRoot),
            doctype: RefCell::new(None),
        }
    }

    /// Appends `child` to `parent`, detaching it from any previous parent first.
    pub fn append_child(parent: &NodeRef, child: NodeRef) {
        detach(&child);
        child.borrow_mut().parent = Some(Rc::downgrade(parent));
        parent.borrow_mut().children.push(child);
    }

    /// Inserts `child` right before `sibling` under the sibling's parent.
    pub fn insert_before(sibling: &NodeRef, child: NodeRef) {
        let Some(parent) = sibling.borrow().parent() else {
            return;
        };
        detach(&child);
        child.borrow_mut().parent = Some(Rc::downgrade(&parent));
        let mut parent_mut = parent.borrow_mut();
        let index = parent_mut
            .children
            .iter()
            .position(|candidate| Rc::ptr_eq(candidate, sibling))
            .unwrap_or(parent_mut.children.len());
        parent_mut.children.insert(index, child);
    }

    pub fn detach(node: &NodeRef) {
        let parent = node.borrow_mut().parent.take().and_then(|weak| weak.upgrade());
        if let Some(parent) = parent {
            parent
                .borrow_mut()
                .children
                .retain(|candidate| !Rc::ptr_eq(candidate, node));
        }
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn reparent_children(from: &NodeRef, to: &NodeRef) {
        let children = std::mem::take(&mut from.borrow_mut().children);
        for child in children {
            child.borrow_mut().parent = Some(Rc::downgrade(to));
            to.borrow_mut().children.push(child);
        }
    }

    pub fn remove_children(node: &NodeRef) {
        let children = std::mem::take(&mut node.borrow_mut().children);
        for child in children {
            child.borrow_mut().parent = None;
        }
    }

    /// True if `node` is `ancestor` or lies somewhere beneath it.
    pub fn is_inclusive_descendant(node: &NodeRef, ancestor: &NodeRef) -> bool {
        let mut current = Some(Rc::clone(node));
        while let Some(candidate) = current {
            if Rc::ptr_eq(&candidate, ancestor) {
                return true;
            }
            current = candidate.borrow().parent();
        }
        false
    }

    /// Every element of the subtree under `node` in document (pre-order) order,
    /// `node` itself excluded.
    pub fn descendant_elements(node: &NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        collect_elements(node, &mut out);
        out
    }

    fn collect_elements(node: &NodeRef, out: &mut Vec<NodeRef>) {
        for child in &node.borrow().children {
            if child.borrow().is_element() {
                out.push(Rc::clone(child));
            }
            collect_elements(child, out);
        }
    }

    impl Document {
        /// The `<html>` element, if the document has one.
        pub fn document_element(&self) -> Option<NodeRef> {
            self.root
                .borrow()
                .children
                .iter()
                .find(|child| child.borrow().is_element())
                .cloned()
        }

        /// First element in document order whose tag equals `tag`.
        pub fn find_by_tag(&self, tag: &str) -> Option<NodeRef> {
            descendant_elements(&self.root).into_iter().find(|node| {
                node.borrow()
                    .as_element()
                    .is_some_and(|elem| elem.tag.eq_ignore_ascii_case(tag))
            })
        }

        pub fn head(&self) -> Option<NodeRef> {
            self.find_by_tag("head")
        }

        pub fn body(&self) -> Option<NodeRef> {
            self.find_by_tag("body")
        }
    }
}
