//! Turns node trees back into HTML text (inner markup snapshots, CLI output).

use crate::dom::dom_tree::{Document, NodeData, NodeRef};
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use log::warn;
use std::io;
use std::rc::Rc;

struct SerializableNode(NodeRef);

impl Serialize for SerializableNode {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let node = self.0.borrow();
        if let TraversalScope::ChildrenOnly(_) = traversal_scope {
            return serialize_children(&node.children, serializer);
        }
        match &node.data {
            NodeData::DocumentRoot => serialize_children(&node.children, serializer),
            NodeData::Element(elem) => {
                serializer.start_elem(
                    elem.qual_name.clone(),
                    elem.attributes
                        .iter()
                        .map(|(name, value)| (name, value.as_str())),
                )?;
                serialize_children(&node.children, serializer)?;
                serializer.end_elem(elem.qual_name.clone())
            }
            NodeData::Text(text) => serializer.write_text(text),
            NodeData::Comment(text) => serializer.write_comment(text),
        }
    }
}

fn serialize_children<S: Serializer>(children: &[NodeRef], serializer: &mut S) -> io::Result<()> {
    for child in children {
        SerializableNode(Rc::clone(child)).serialize(serializer, TraversalScope::IncludeNode)?;
    }
    Ok(())
}

fn render(node: &NodeRef, traversal_scope: TraversalScope) -> String {
    let mut buffer = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    if let Err(err) = serialize(&mut buffer, &SerializableNode(Rc::clone(node)), opts) {
        warn!("html serialization stopped early: {err}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Markup of the node's children, like `Element.innerHTML`.
pub fn inner_html(node: &NodeRef) -> String {
    render(node, TraversalScope::ChildrenOnly(None))
}

/// Whole document, doctype first.
pub fn document_html(document: &Document) -> String {
    let mut out = String::new();
    if let Some(doctype) = &*document.doctype.borrow() {
        out.push_str(&format!("<!DOCTYPE {}>", doctype.name));
    }
    out.push_str(&inner_html(&document.root));
    out
}
