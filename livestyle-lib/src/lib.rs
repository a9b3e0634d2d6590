//! A live style editor for HTML pages: pick an element, edit its inline
//! style and markup, and keep the edits per page so they come back on the
//! next visit.

pub mod dom;
pub mod error;
pub mod events;
pub mod host;
pub mod layout_taffy;
pub mod overlay;
pub mod page;
pub mod parser;
pub mod persistence;
pub mod picker;
pub mod selector;
pub mod storage;
pub mod store;
pub mod style;
pub mod tool;

pub use error::{LiveStyleError, StorageError};
pub use page::Page;
pub use tool::{Collaborators, LiveStyleTool, ToolConfig, ToolHost};
