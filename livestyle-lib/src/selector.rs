//! Short, best-effort selectors used to find an element again later.
//!
//! The derived string is a heuristic, not a unique path: two elements with
//! the same tag and classes derive the same selector, and lookup resolves to
//! the first of them in document order. Ids are not escaped, so ids with
//! selector metacharacters do not resolve.

use crate::dom::dom_tree::NodeRef;

/// Derives `#id`, else `tag.class1.class2`, else `tag`.
///
/// Class tokens keep attribute order. A `class` attribute that is empty or
/// only whitespace counts as absent. Non-elements derive the empty string.
pub fn derive_selector(element: &NodeRef) -> String {
    let node = element.borrow();
    let Some(elem) = node.as_element() else {
        return String::new();
    };

    if let Some(id) = elem.id().filter(|id| !id.is_empty()) {
        return format!("#{id}");
    }

    let tag = elem.tag.to_ascii_lowercase();
    let classes: Vec<&str> = elem.classes().collect();
    if classes.is_empty() {
        tag
    } else {
        format!("{tag}.{}", classes.join("."))
    }
}
