//! An xml element tree: parse a document, query it by tag, read attributes and text,
//! add and remove elements, and write it back.
//!
//! Elements are stored in their [`Document`]. An [`Element`] is a `Copy` handle,
//! so most methods take the document as their first argument. The stored data
//! itself is private and only reachable through `Element` methods:
//!
//! ```compile_fail
//! use xml_etree::ElementData;
//! ```
//!
//! ```
//! use xml_etree::{Document, Element};
//!
//! let mut doc = Document::parse_str(
//!     r#"<root><person id="1"><name>John</name></person><person id="2"><name>Jane</name></person></root>"#,
//! ).unwrap();
//!
//! let names: Vec<_> = doc
//!     .find_all("name")
//!     .filter_map(|name| name.text(&doc))
//!     .collect();
//! assert_eq!(names, vec!["John", "Jane"]);
//!
//! doc.add_child("root", Element::build("person").attribute("id", "3").text("New"))
//!     .unwrap();
//! assert_eq!(doc.find_all("person").count(), 3);
//!
//! let removed = doc.remove_elements("person", &[("id", "2")]).unwrap();
//! assert_eq!(removed, 1);
//!
//! let xml = doc.write_str().unwrap();
//! ```
//!
//! Not a validating parser. Comments, processing instructions and doctypes are skipped,
//! whitespace-only text is dropped and namespace prefixes are part of the tag name.

mod document;
mod element;
mod error;
mod file;
mod parser;
mod writer;

pub use crate::document::Document;
pub use crate::element::{Descendants, Element, ElementBuilder, FindAll, Texts};
pub use crate::error::{Error, Result};
pub use crate::file::XmlFile;
pub use crate::parser::ReadOptions;
pub use crate::writer::WriteOptions;
