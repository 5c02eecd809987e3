//! # Folio DOM
//!
//! In-memory document tree used by the editor core.
//!
//! - [`Node`] / [`Element`]: owned tree with ordered attributes
//! - [`Document`]: head nodes plus the `body` root container
//! - [`parse_fragment`] / [`parse_document`]: lenient HTML parsing
//! - [`Selector`]: CSS-like queries that answer with [`NodePath`]s
//!
//! ## Example
//!
//! ```rust
//! use folio_dom::{parse_document, Selector};
//!
//! let doc = parse_document(r#"<div class="page"><p>Hello</p></div>"#);
//! let pages = Selector::parse(".page").unwrap().query_all(&doc.body);
//! assert_eq!(pages, vec![vec![0]]);
//! assert_eq!(doc.body.inner_html(), r#"<div class="page"><p>Hello</p></div>"#);
//! ```

pub mod document;
pub mod html;
pub mod node;
pub mod selector;
pub mod style;

pub use document::{Document, ScrollPosition};
pub use html::{nodes_to_html, parse_document, parse_fragment};
pub use node::{Element, Node, NodePath, IDENTITY_ATTR};
pub use selector::{is_identifier, nth_of_type, Selector, SelectorError};
pub use style::Style;
