//! Reads the declarations of an inline `style` attribute.
//!
//! The editor writes style text verbatim; this module only *reads* it, for
//! layout. LightningCSS does the parsing so shorthands and odd spacing come
//! back normalized.

use lightningcss::declaration::DeclarationBlock;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleAttribute};
use log::warn;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDeclaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl fmt::Display for OwnedDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.value)?;
        if self.important {
            write!(f, " !important")?;
        }
        Ok(())
    }
}

/// Parses `style_text` into owned declarations in source order, normal
/// declarations first. Unparsable text yields no declarations.
pub fn parse_inline_style(style_text: &str) -> Vec<OwnedDeclaration> {
    if style_text.trim().is_empty() {
        return Vec::new();
    }
    match StyleAttribute::parse(style_text, ParserOptions::default()) {
        Ok(attribute) => own_declarations(&attribute.declarations),
        Err(err) => {
            warn!("ignoring unparsable inline style {style_text:?}: {}", err.kind);
            Vec::new()
        }
    }
}

fn own_declarations(block: &DeclarationBlock<'_>) -> Vec<OwnedDeclaration> {
    let normal = block.declarations.iter().map(|property| (property, false));
    let important = block
        .important_declarations
        .iter()
        .map(|property| (property, true));

    normal
        .chain(important)
        .filter_map(|(property, important)| {
            let value = property
                .value_to_css_string(PrinterOptions::default())
                .ok()?;
            Some(OwnedDeclaration {
                property: property.property_id().name().to_string(),
                value,
                important,
            })
        })
        .collect()
}

/// Last value declared for `property`; `!important` wins over normal.
pub fn declared_value<'a>(declarations: &'a [OwnedDeclaration], property: &str) -> Option<&'a str> {
    let pick = |important: bool| {
        declarations
            .iter()
            .rev()
            .find(|decl| decl.important == important && decl.property == property)
    };
    pick(true)
        .or_else(|| pick(false))
        .map(|decl| decl.value.as_str())
}

/// Parses a pixel length such as `12px`, `12.5px` or a bare `0`.
pub fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if value == "0" {
        return Some(0.0);
    }
    value.strip_suffix("px")?.trim().parse::<f32>().ok()
}

/// Expands a 1–4 value box shorthand (`margin`, `padding`) into
/// top/right/bottom/left pixel values.
pub fn parse_box_edges(value: &str) -> Option<[f32; 4]> {
    let parts = value
        .split_whitespace()
        .map(parse_px)
        .collect::<Option<Vec<f32>>>()?;
    match parts.as_slice() {
        [all] => Some([*all; 4]),
        [vertical, horizontal] => Some([*vertical, *horizontal, *vertical, *horizontal]),
        [top, horizontal, bottom] => Some([*top, *horizontal, *bottom, *horizontal]),
        [top, right, bottom, left] => Some([*top, *right, *bottom, *left]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_declarations() {
        let decls = parse_inline_style("width: 120px; height:40px");
        assert_eq!(declared_value(&decls, "width"), Some("120px"));
        assert_eq!(declared_value(&decls, "height"), Some("40px"));
    }

    #[test]
    fn test_empty_style_has_no_declarations() {
        assert!(parse_inline_style("").is_empty());
        assert!(parse_inline_style("   ").is_empty());
    }

    #[test]
    fn test_important_wins() {
        let decls = parse_inline_style("width: 10px !important; width: 20px");
        assert_eq!(declared_value(&decls, "width"), Some("10px"));
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("12px"), Some(12.0));
        assert_eq!(parse_px(" 12.5px "), Some(12.5));
        assert_eq!(parse_px("0"), Some(0.0));
        assert_eq!(parse_px("50%"), None);
        assert_eq!(parse_px("auto"), None);
    }

    #[test]
    fn test_box_edges() {
        assert_eq!(parse_box_edges("4px"), Some([4.0; 4]));
        assert_eq!(parse_box_edges("1px 2px"), Some([1.0, 2.0, 1.0, 2.0]));
        assert_eq!(parse_box_edges("1px 2px 3px"), Some([1.0, 2.0, 3.0, 2.0]));
        assert_eq!(
            parse_box_edges("1px 2px 3px 4px"),
            Some([1.0, 2.0, 3.0, 4.0])
        );
        assert_eq!(parse_box_edges("1px auto"), None);
    }

    #[test]
    fn test_display_format() {
        let decl = OwnedDeclaration {
            property: "color".into(),
            value: "red".into(),
            important: true,
        };
        assert_eq!(decl.to_string(), "color: red !important");
    }
}
