pub mod css_matcher;
pub mod inline_css;
