use crate::dom::dom_tree::{descendant_elements, ElementNode, NodeRef};
use std::collections::HashSet;
use std::rc::Rc;

/// ------------------------------
/// 1. Selector Parsing
/// ------------------------------

/// Supported attribute selector operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr="value"]
    Exact,
    /// [attr~="value"]
    Includes,
    /// [attr^="value"]
    Prefix,
    /// [attr$="value"]
    Suffix,
    /// [attr*="value"]
    Substring,
}

/// Represents one attribute condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: Option<AttributeOperator>, // None means only existence check
    pub value: Option<String>,
}

/// A compound selector: optional tag, id, classes, and attribute conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: HashSet<String>,
    pub attributes: Vec<AttributeSelector>,
    /// Set for `*`, so an otherwise empty compound still matches.
    pub universal: bool,
}

impl CompoundSelector {
    pub fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }
}

/// A complex selector composed of a key compound selector and a list of ancestor parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub key: CompoundSelector,
    /// Ancestors with their combinators, in right-to-left order.
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
}

/// Supported combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (a space).
    Descendant,
    /// Child combinator (`>`).
    Child,
    /// Adjacent sibling combinator (`+`).
    AdjacentSibling,
    /// General sibling combinator (`~`).
    GeneralSibling,
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
}

/// Parse a compound selector string, e.g. "div.red#header[disabled][data-type~=\"main\"]"
pub fn parse_compound_selector(selector: &str) -> CompoundSelector {
    let mut compound = CompoundSelector::default();
    let mut chars = selector.chars().peekable();
    let mut buffer = String::new();

    // If first char is alphabetic or '*' assume tag.
    if let Some(&ch) = chars.peek() {
        if ch.is_alphabetic() || ch == '*' {
            while let Some(ch) = chars.next_if(|ch| !matches!(*ch, '#' | '.' | '[')) {
                buffer.push(ch);
            }
            if buffer == "*" {
                compound.universal = true;
            } else if !buffer.is_empty() {
                compound.tag = Some(buffer.clone());
            }
            buffer.clear();
        }
    }

    while let Some(ch) = chars.next() {
        match ch {
            '#' | '.' => {
                while let Some(next) = chars.next_if(|ch| !matches!(*ch, '#' | '.' | '[')) {
                    buffer.push(next);
                }
                if !buffer.is_empty() {
                    if ch == '#' {
                        compound.id = Some(buffer.clone());
                    } else {
                        compound.classes.insert(buffer.clone());
                    }
                }
                buffer.clear();
            }
            '[' => {
                if let Some(attribute) = parse_attribute_selector(&mut chars) {
                    compound.attributes.push(attribute);
                }
            }
            _ => {}
        }
    }

    compound
}

/// Parses the inside of `[...]`, consuming the closing bracket.
fn parse_attribute_selector(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<AttributeSelector> {
    let mut attr_name = String::new();
    let mut operator = None;
    let mut attr_value = None;

    skip_whitespace(chars);
    while let Some(ch) = chars.next_if(|ch| !matches!(*ch, '=' | ']' | '~' | '^' | '$' | '*' | '|')) {
        if ch.is_whitespace() {
            break;
        }
        attr_name.push(ch);
    }
    skip_whitespace(chars);

    if let Some(&ch) = chars.peek() {
        if matches!(ch, '=' | '~' | '^' | '$' | '*') {
            let mut op_str = String::from(ch);
            chars.next();
            if let Some(next_ch) = chars.next_if_eq(&'=') {
                op_str.push(next_ch);
            }
            operator = match op_str.as_str() {
                "=" => Some(AttributeOperator::Exact),
                "~=" => Some(AttributeOperator::Includes),
                "^=" => Some(AttributeOperator::Prefix),
                "$=" => Some(AttributeOperator::Suffix),
                "*=" => Some(AttributeOperator::Substring),
                _ => None,
            };
            skip_whitespace(chars);

            let mut value_buf = String::new();
            if let Some(quote) = chars.next_if(|ch| *ch == '"' || *ch == '\'') {
                for ch in chars.by_ref() {
                    if ch == quote {
                        break;
                    }
                    value_buf.push(ch);
                }
            } else {
                while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace() && *ch != ']') {
                    value_buf.push(ch);
                }
            }
            attr_value = Some(value_buf);
        }
    }

    // Skip until ']'
    for ch in chars.by_ref() {
        if ch == ']' {
            break;
        }
    }

    (!attr_name.is_empty()).then_some(AttributeSelector {
        name: attr_name,
        operator,
        value: attr_value,
    })
}

fn combinator_for(token: &str) -> Option<Combinator> {
    match token {
        ">" => Some(Combinator::Child),
        "+" => Some(Combinator::AdjacentSibling),
        "~" => Some(Combinator::GeneralSibling),
        _ => None,
    }
}

/// Splits a selector into compound and combinator tokens. Whitespace and
/// combinators inside `[...]` or quotes belong to the compound.
fn tokenize_selector(selector: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(open) = quote {
            current.push(ch);
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if in_brackets => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                in_brackets = true;
                current.push(ch);
            }
            ']' => {
                in_brackets = false;
                current.push(ch);
            }
            _ if in_brackets => current.push(ch),
            '>' | '+' | '~' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            _ if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_compound_token(token: &str) -> Option<CompoundSelector> {
    match combinator_for(token) {
        Some(_) => None,
        None => Some(parse_compound_selector(token)),
    }
}

/// Parse a complex selector string (e.g. "div.red > p#header + span.foo") into a ComplexSelector.
/// Combinators need no surrounding whitespace (`div>p`).
pub fn parse_complex_selector(selector: &str) -> Option<ComplexSelector> {
    let tokens = tokenize_selector(selector);
    let mut iter = tokens.iter().map(String::as_str);
    let mut key = parse_compound_token(iter.next()?)?;
    let mut ancestors = Vec::new();

    while let Some(token) = iter.next() {
        // A dangling or doubled combinator makes the whole selector invalid.
        let (combinator, compound_token) = match combinator_for(token) {
            Some(combinator) => (combinator, iter.next()?),
            None => (Combinator::Descendant, token),
        };
        ancestors.push((combinator, key));
        key = parse_compound_token(compound_token)?;
    }
    ancestors.reverse();

    let valid = !key.is_empty() && ancestors.iter().all(|(_, part)| !part.is_empty());
    valid.then_some(ComplexSelector { key, ancestors })
}

/// ------------------------------
/// 2. Selector Matching
/// ------------------------------

/// Returns true if the given ElementNode matches the CompoundSelector.
/// Checks tag, id, classes, and attribute conditions.
pub fn matches_compound(elem: &ElementNode, compound: &CompoundSelector) -> bool {
    if let Some(ref tag) = compound.tag {
        if !elem.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(ref id_val) = compound.id {
        if elem.id() != Some(id_val.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let elem_classes: HashSet<&str> = elem.classes().collect();
        if !compound
            .classes
            .iter()
            .all(|class| elem_classes.contains(class.as_str()))
        {
            return false;
        }
    }
    compound
        .attributes
        .iter()
        .all(|attr_sel| matches_attribute(elem, attr_sel))
}

fn matches_attribute(elem: &ElementNode, attr_sel: &AttributeSelector) -> bool {
    let Some(actual_val) = elem.get_attribute(&attr_sel.name) else {
        return false;
    };
    let Some(expected) = &attr_sel.value else {
        // If no expected value provided, existence is enough.
        return true;
    };
    match attr_sel.operator {
        Some(AttributeOperator::Exact) => actual_val == expected,
        Some(AttributeOperator::Includes) => {
            actual_val.split_whitespace().any(|word| word == expected)
        }
        Some(AttributeOperator::Prefix) => actual_val.starts_with(expected.as_str()),
        Some(AttributeOperator::Suffix) => actual_val.ends_with(expected.as_str()),
        Some(AttributeOperator::Substring) => actual_val.contains(expected.as_str()),
        None => true,
    }
}

fn node_matches(node: &NodeRef, compound: &CompoundSelector) -> bool {
    node.borrow()
        .as_element()
        .is_some_and(|elem| matches_compound(elem, compound))
}

/// Matches a ComplexSelector against a candidate element.
/// The matching proceeds right-to-left, backtracking over descendant and
/// general-sibling choices.
pub fn matches_complex_selector(candidate: &NodeRef, complex: &ComplexSelector) -> bool {
    node_matches(candidate, &complex.key) && matches_ancestors(candidate, &complex.ancestors)
}

fn matches_ancestors(current: &NodeRef, rest: &[(Combinator, CompoundSelector)]) -> bool {
    let Some(((combinator, compound), remaining)) = rest.split_first() else {
        return true;
    };
    let candidates: Vec<NodeRef> = match combinator {
        Combinator::Child => get_parent_element(current).into_iter().collect(),
        Combinator::Descendant => get_ancestor_elements(current),
        Combinator::AdjacentSibling => get_prev_sibling(current).into_iter().collect(),
        Combinator::GeneralSibling => get_all_prev_siblings(current),
    };
    candidates
        .iter()
        .any(|node| node_matches(node, compound) && matches_ancestors(node, remaining))
}

/// Helper: the parent, when it is an element.
fn get_parent_element(node: &NodeRef) -> Option<NodeRef> {
    node.borrow()
        .parent()
        .filter(|parent| parent.borrow().is_element())
}

fn get_ancestor_elements(node: &NodeRef) -> Vec<NodeRef> {
    let mut ancestors = Vec::new();
    let mut current = get_parent_element(node);
    while let Some(ancestor) = current {
        current = get_parent_element(&ancestor);
        ancestors.push(ancestor);
    }
    ancestors
}

/// Helper: element siblings before `node`, nearest first.
fn get_all_prev_siblings(node: &NodeRef) -> Vec<NodeRef> {
    let Some(parent) = node.borrow().parent() else {
        return Vec::new();
    };
    let parent = parent.borrow();
    let mut siblings: Vec<NodeRef> = parent
        .children
        .iter()
        .take_while(|child| !Rc::ptr_eq(child, node))
        .filter(|child| child.borrow().is_element())
        .cloned()
        .collect();
    siblings.reverse();
    siblings
}

/// Helper: get immediate previous element sibling from a node.
fn get_prev_sibling(node: &NodeRef) -> Option<NodeRef> {
    get_all_prev_siblings(node).into_iter().next()
}

/// ------------------------------
/// 3. Lookup
/// ------------------------------

/// First element under `root` in document order that matches `selector`,
/// like `document.querySelector`. Unparsable selectors match nothing.
pub fn query_selector(root: &NodeRef, selector: &str) -> Option<NodeRef> {
    let complex = parse_complex_selector(selector)?;
    descendant_elements(root)
        .into_iter()
        .find(|candidate| matches_complex_selector(candidate, &complex))
}

/// Every match under `root`, in document order.
pub fn query_selector_all(root: &NodeRef, selector: &str) -> Vec<NodeRef> {
    let Some(complex) = parse_complex_selector(selector) else {
        return Vec::new();
    };
    descendant_elements(root)
        .into_iter()
        .filter(|candidate| matches_complex_selector(candidate, &complex))
        .collect()
}
