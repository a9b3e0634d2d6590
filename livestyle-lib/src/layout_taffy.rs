use log::{trace, warn};
use std::rc::Rc;
use taffy::prelude::*; // Imports TaffyTree, NodeId, Layout, Size, Dimension, AvailableSpace, etc.
use taffy::TaffyError;

use crate::dom::dom_tree::{Document, NodeData, NodeRef};
use crate::style::inline_css::{declared_value, parse_box_edges, parse_inline_style, parse_px};

/// Approximate glyph metrics used to size text runs.
const CHAR_WIDTH: f32 = 8.0;
const LINE_HEIGHT: f32 = 18.0;

/// Elements that never produce a box.
const NON_RENDERED: &[&str] = &[
    "head", "style", "script", "title", "meta", "link", "base", "template", "noscript",
];

/// Visible area of the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl Viewport {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width && y < self.height
    }
}

/// Border box of an element in page coordinates, like a `DOMRect`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Element boxes of one layout pass, in document order.
#[derive(Debug, Default)]
pub struct PageLayout {
    boxes: Vec<(NodeRef, BoundingBox)>,
    viewport: Viewport,
}

struct Entry {
    id: NodeId,
    element: Option<NodeRef>,
    parent: Option<usize>,
}

impl PageLayout {
    /// Lays the document out against `viewport`. Layout failures are logged
    /// and leave the page without boxes, so hit testing finds nothing.
    pub fn compute(document: &Document, viewport: Viewport) -> Self {
        match build_taffy_tree(document, viewport) {
            Ok(boxes) => PageLayout { boxes, viewport },
            Err(err) => {
                warn!("layout failed: {err}");
                PageLayout {
                    boxes: Vec::new(),
                    viewport,
                }
            }
        }
    }

    pub fn bounding_box(&self, node: &NodeRef) -> Option<BoundingBox> {
        self.boxes
            .iter()
            .find(|(candidate, _)| Rc::ptr_eq(candidate, node))
            .map(|(_, rect)| *rect)
    }

    /// Topmost element under the point, like `document.elementFromPoint`.
    ///
    /// Elements for which `skip` returns true are treated as transparent.
    /// Points outside the viewport resolve to nothing; points inside it that
    /// hit no box resolve to the document element.
    pub fn hit_test(&self, x: f32, y: f32, skip: impl Fn(&NodeRef) -> bool) -> Option<NodeRef> {
        if !self.viewport.contains(x, y) {
            trace!("hit test at ({x}, {y}) is outside the viewport");
            return None;
        }
        let hit = self
            .boxes
            .iter()
            .filter(|(node, rect)| rect.contains(x, y) && !skip(node))
            .last()
            .map(|(node, _)| Rc::clone(node));
        hit.or_else(|| {
            self.boxes
                .first()
                .map(|(node, _)| Rc::clone(node))
                .filter(|node| !skip(node))
        })
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Builds a Taffy layout tree from the DOM, computes it and returns every
/// element's absolute border box in document order.
fn build_taffy_tree(
    document: &Document,
    viewport: Viewport,
) -> Result<Vec<(NodeRef, BoundingBox)>, TaffyError> {
    let mut tree: TaffyTree<String> = TaffyTree::new();
    let mut entries = Vec::new();

    // A flex column root keeps the document element's margins from
    // collapsing out of the page.
    let root_style = Style {
        display: Display::Flex,
        flex_direction: FlexDirection::Column,
        size: Size {
            width: Dimension::Length(viewport.width),
            height: Dimension::Auto,
        },
        min_size: Size {
            width: Dimension::Auto,
            height: Dimension::Length(viewport.height),
        },
        ..Default::default()
    };
    let root_id = tree.new_leaf(root_style)?;
    entries.push(Entry {
        id: root_id,
        element: None,
        parent: None,
    });
    for child in &document.root.borrow().children {
        if let Some(child_id) = convert_dom_to_taffy(&mut tree, child, 0, &mut entries)? {
            tree.add_child(root_id, child_id)?;
        }
    }

    tree.compute_layout_with_measure(
        root_id,
        Size {
            width: AvailableSpace::Definite(viewport.width),
            height: AvailableSpace::MaxContent,
        },
        |known: Size<Option<f32>>,
         avail: Size<AvailableSpace>,
         _node_id,
         ctx: Option<&mut String>,
         _style: &Style|
         -> Size<f32> {
            let Some(text) = ctx else {
                return Size {
                    width: 0.0,
                    height: 0.0,
                };
            };
            let avail_width = known.width.unwrap_or(match avail.width {
                AvailableSpace::Definite(w) => w,
                _ => viewport.width,
            });
            measure_text_wrapped(text, avail_width)
        },
    )?;

    // Entries are in pre-order, so a parent's origin is known before its children.
    let mut origins: Vec<(f32, f32)> = Vec::with_capacity(entries.len());
    let mut boxes = Vec::new();
    for entry in &entries {
        let layout = tree.layout(entry.id)?;
        let (parent_x, parent_y) = entry
            .parent
            .map(|index| origins[index])
            .unwrap_or((0.0, 0.0));
        let origin = (parent_x + layout.location.x, parent_y + layout.location.y);
        origins.push(origin);
        if let Some(element) = &entry.element {
            boxes.push((
                Rc::clone(element),
                BoundingBox {
                    left: origin.0,
                    top: origin.1,
                    width: layout.size.width,
                    height: layout.size.height,
                },
            ));
        }
    }
    Ok(boxes)
}

/// Recursively converts a DOM node into a Taffy node. Non-rendered elements,
/// comments and whitespace-only text produce nothing.
fn convert_dom_to_taffy(
    tree: &mut TaffyTree<String>,
    dom_node: &NodeRef,
    parent: usize,
    entries: &mut Vec<Entry>,
) -> Result<Option<NodeId>, TaffyError> {
    let node = dom_node.borrow();
    match &node.data {
        NodeData::Element(elem) => {
            if NON_RENDERED.contains(&elem.tag.to_ascii_lowercase().as_str()) {
                return Ok(None);
            }
            let Some(style) = extract_style(elem.get_attribute("style").unwrap_or_default())
            else {
                return Ok(None);
            };
            let id = tree.new_leaf(style)?;
            let index = entries.len();
            entries.push(Entry {
                id,
                element: Some(Rc::clone(dom_node)),
                parent: Some(parent),
            });
            for child in &node.children {
                if let Some(child_id) = convert_dom_to_taffy(tree, child, index, entries)? {
                    tree.add_child(id, child_id)?;
                }
            }
            Ok(Some(id))
        }
        NodeData::Text(text) if !text.trim().is_empty() => {
            let id = tree.new_leaf_with_context(Style::default(), text.trim().to_string())?;
            entries.push(Entry {
                id,
                element: None,
                parent: Some(parent),
            });
            Ok(Some(id))
        }
        _ => Ok(None),
    }
}

/// Extracts a Taffy Style from an element's inline style text.
/// Returns `None` for `display: none`.
fn extract_style(style_text: &str) -> Option<Style> {
    let decls = parse_inline_style(style_text);
    let mut style = Style {
        display: Display::Block,
        ..Default::default()
    };

    match declared_value(&decls, "display") {
        Some("none") => return None,
        Some("flex") => style.display = Display::Flex,
        _ => {}
    }
    // No viewport scrolling here, so fixed behaves like absolute.
    if matches!(declared_value(&decls, "position"), Some("absolute" | "fixed")) {
        style.position = Position::Absolute;
    }

    let length = |property: &str| declared_value(&decls, property).and_then(parse_px);
    if let Some(width) = length("width") {
        style.size.width = Dimension::Length(width);
    }
    if let Some(height) = length("height") {
        style.size.height = Dimension::Length(height);
    }
    if let Some(min_height) = length("min-height") {
        style.min_size.height = Dimension::Length(min_height);
    }
    if let Some(left) = length("left") {
        style.inset.left = LengthPercentageAuto::Length(left);
    }
    if let Some(top) = length("top") {
        style.inset.top = LengthPercentageAuto::Length(top);
    }
    if let Some(right) = length("right") {
        style.inset.right = LengthPercentageAuto::Length(right);
    }
    if let Some(bottom) = length("bottom") {
        style.inset.bottom = LengthPercentageAuto::Length(bottom);
    }

    let edges = |shorthand: &str| {
        let mut values: [Option<f32>; 4] = declared_value(&decls, shorthand)
            .and_then(parse_box_edges)
            .map(|all| all.map(Some))
            .unwrap_or_default();
        for (slot, side) in values.iter_mut().zip(["top", "right", "bottom", "left"]) {
            if let Some(value) = length(&format!("{shorthand}-{side}")) {
                *slot = Some(value);
            }
        }
        values
    };
    let [top, right, bottom, left] = edges("margin");
    let margin = |value: Option<f32>| value.map_or(LengthPercentageAuto::Length(0.0), LengthPercentageAuto::Length);
    style.margin = Rect {
        top: margin(top),
        right: margin(right),
        bottom: margin(bottom),
        left: margin(left),
    };
    let [top, right, bottom, left] = edges("padding");
    let padding = |value: Option<f32>| LengthPercentage::Length(value.unwrap_or(0.0));
    style.padding = Rect {
        top: padding(top),
        right: padding(right),
        bottom: padding(bottom),
        left: padding(left),
    };

    Some(style)
}

/// Measures text with basic word-wrapping based on the available width.
/// Words accumulate onto a line until the next one would overflow; a single
/// overlong word still gets a line of its own.
fn measure_text_wrapped(text: &str, available_width: f32) -> Size<f32> {
    let mut lines = 0usize;
    let mut widest = 0.0f32;
    let mut current = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let candidate = if current == 0 { word_len } else { current + 1 + word_len };
        if current == 0 || candidate as f32 * CHAR_WIDTH <= available_width {
            current = candidate;
        } else {
            widest = widest.max(current as f32 * CHAR_WIDTH);
            lines += 1;
            current = word_len;
        }
    }
    if current > 0 {
        widest = widest.max(current as f32 * CHAR_WIDTH);
        lines += 1;
    }

    Size {
        width: widest,
        height: lines as f32 * LINE_HEIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::create_dom_tree;
    use pretty_assertions::assert_eq;

    fn by_id(document: &Document, id: &str) -> NodeRef {
        crate::style::css_matcher::query_selector(&document.root, &format!("#{id}")).unwrap()
    }

    #[test]
    fn test_blocks_stack_vertically() {
        let document = create_dom_tree(
            r#"<body style="margin: 0"><div id="a" style="height: 50px"></div><div id="b" style="height: 30px; width: 200px"></div></body>"#,
        );
        let layout = PageLayout::compute(&document, Viewport::default());
        let a = layout.bounding_box(&by_id(&document, "a")).unwrap();
        let b = layout.bounding_box(&by_id(&document, "b")).unwrap();
        assert_eq!(a, BoundingBox { left: 0.0, top: 0.0, width: 1280.0, height: 50.0 });
        assert_eq!(b, BoundingBox { left: 0.0, top: 50.0, width: 200.0, height: 30.0 });
    }

    #[test]
    fn test_margin_and_padding_offset_children() {
        let document = create_dom_tree(
            r#"<body style="margin: 10px"><div id="outer" style="padding: 5px"><p id="inner" style="height: 20px; margin: 0"></p></div></body>"#,
        );
        let layout = PageLayout::compute(&document, Viewport::default());
        let inner = layout.bounding_box(&by_id(&document, "inner")).unwrap();
        assert_eq!((inner.left, inner.top), (15.0, 15.0));
        assert_eq!(inner.height, 20.0);
    }

    #[test]
    fn test_hidden_elements_have_no_box() {
        let document = create_dom_tree(r#"<div id="gone" style="display: none">x</div>"#);
        let layout = PageLayout::compute(&document, Viewport::default());
        assert!(layout.bounding_box(&by_id(&document, "gone")).is_none());
        assert!(layout.bounding_box(&document.head().unwrap()).is_none());
    }

    #[test]
    fn test_hit_test_finds_deepest() {
        let document = create_dom_tree(
            r#"<body style="margin: 0"><div id="outer" style="height: 100px"><span id="inner" style="height: 20px"></span></div></body>"#,
        );
        let layout = PageLayout::compute(&document, Viewport::default());
        let hit = layout.hit_test(5.0, 5.0, |_| false).unwrap();
        assert!(Rc::ptr_eq(&hit, &by_id(&document, "inner")));
        let hit = layout.hit_test(5.0, 50.0, |_| false).unwrap();
        assert!(Rc::ptr_eq(&hit, &by_id(&document, "outer")));
    }

    #[test]
    fn test_hit_test_skip_and_fallback() {
        let document = create_dom_tree(
            r#"<body style="margin: 0"><div id="cover" style="height: 100px"></div></body>"#,
        );
        let layout = PageLayout::compute(&document, Viewport::default());
        let cover = by_id(&document, "cover");
        let hit = layout.hit_test(5.0, 5.0, |node| Rc::ptr_eq(node, &cover)).unwrap();
        assert_eq!(hit.borrow().as_element().unwrap().tag, "body");
        // Below all content: the document element answers.
        let hit = layout.hit_test(5.0, 700.0, |_| false).unwrap();
        assert_eq!(hit.borrow().as_element().unwrap().tag, "html");
        assert!(layout.hit_test(-1.0, 5.0, |_| false).is_none());
        assert!(layout.hit_test(5.0, 5000.0, |_| false).is_none());
    }

    #[test]
    fn test_text_wraps() {
        let size = measure_text_wrapped("aaaa bbbb cccc", 80.0);
        assert_eq!(size.height, 2.0 * LINE_HEIGHT);
        assert_eq!(size.width, 72.0);
        assert_eq!(measure_text_wrapped("   ", 80.0).height, 0.0);
    }
}
