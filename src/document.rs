use crate::element::{is_valid_name, Element, ElementBuilder, ElementData, FindAll, Texts};
use crate::error::{Error, Result};
use crate::parser::{DocumentParser, ReadOptions};
use crate::writer::{DocumentWriter, WriteOptions};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Represents a XML document.
///
/// Use [`Document::parse_str()`], [`Document::parse_reader()`], [`Document::parse_file()`]
/// or [`Document::from_str()`] to parse xml.
///
/// # Examples
/// ```
/// use xml_etree::{Document, Element};
/// use std::str::FromStr;
///
/// let mut doc = Document::from_str(r#"<?xml version="1.0" encoding="UTF-8"?>
/// <package>
///     <metadata>
///         <author>Lewis Carol</author>
///     </metadata>
/// </package>
/// "#).unwrap();
/// let author = doc.find_all("author").next().unwrap();
/// author.set_text(&mut doc, "Lewis Carroll");
/// doc.add_child("metadata", Element::build("title").text("Alice")).unwrap();
/// let xml = doc.write_str().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) store: Vec<ElementData>,
    pub(crate) free: Vec<usize>, // slots of destroyed elements
    root: Element,

    pub(crate) version: String,
    pub(crate) standalone: bool,
}

impl Document {
    /// Create a new xml document with a root element of `root_name`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: `root_name` is not a valid XML name.
    pub fn new<S: Into<String>>(root_name: S) -> Result<Document> {
        let root_name = root_name.into();
        if !is_valid_name(&root_name) {
            return Err(Error::InvalidName);
        }
        Ok(Self::with_root_data(ElementData::new(
            root_name,
            IndexMap::new(),
            None,
        )))
    }

    pub(crate) fn with_root_data(root_data: ElementData) -> Document {
        Document {
            store: vec![root_data],
            free: Vec::new(),
            root: Element::root(),
            version: "1.0".to_string(),
            standalone: false,
        }
    }

    pub fn root(&self) -> Element {
        self.root
    }

    /// Number of elements reachable from the root, root included.
    pub fn element_count(&self) -> usize {
        self.root.iter(self).count()
    }

    /// Version of the XML declaration. `"1.0"` if the document had none.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn standalone(&self) -> bool {
        self.standalone
    }
}

// Query
impl Document {
    /// Copy of the attributes of `element`, or an empty map when there is no element.
    ///
    /// ```
    /// use xml_etree::Document;
    /// use std::str::FromStr;
    ///
    /// let doc = Document::from_str(r#"<data><person id="1" /></data>"#).unwrap();
    /// let first = doc.root().first_child(&doc);
    /// assert_eq!(doc.attributes_of(first)["id"], "1");
    /// let none = first.unwrap().first_child(&doc);
    /// assert!(doc.attributes_of(none).is_empty());
    /// ```
    pub fn attributes_of(&self, element: Option<Element>) -> IndexMap<String, String> {
        element
            .map(|elem| elem.attributes(self).clone())
            .unwrap_or_default()
    }

    /// Elements under the root with tag name `name`, in document order.
    /// The root itself is not included.
    pub fn find_all<'a, 'n>(&'a self, name: &'n str) -> FindAll<'a, 'n> {
        self.root.find_all(self, name)
    }

    /// `(name, text)` of every element with non blank text, in document order.
    pub fn texts(&self) -> Texts<'_> {
        self.root.texts(self)
    }
}

// Mutation
impl Document {
    /// Appends a new element as the last child of the first element named `parent_name`.
    ///
    /// The search is in document order and starts with the root itself.
    /// Returns `false` without touching the document when no such element exists.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: the new element has an invalid tag or attribute name.
    /// The document is unchanged.
    pub fn add_child(&mut self, parent_name: &str, element: ElementBuilder) -> Result<bool> {
        let doc = &*self;
        let parent = match doc.root.iter(doc).find(|e| e.name(doc) == parent_name) {
            Some(parent) => parent,
            None => {
                debug!(parent = parent_name, "no parent element to add to");
                return Ok(false);
            }
        };
        let child = element.push_to(self, parent)?;
        debug!(
            parent = parent_name,
            child = child.name(self),
            "added element"
        );
        Ok(true)
    }

    /// Removes every element under the root named `name` whose attributes contain
    /// all `(key, value)` pairs of `filter`. An empty filter matches every element named `name`.
    ///
    /// The root is never removed. Returns the number of removed elements.
    ///
    /// Removed elements and their descendants are destroyed, and their storage is
    /// reused by elements created later. Handles to them must not be used afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::DetachedElement`]: a matched element has no parent. Nothing is removed.
    pub fn remove_elements(&mut self, name: &str, filter: &[(&str, &str)]) -> Result<usize> {
        let doc = &*self;
        let matched: Vec<Element> = doc
            .find_all(name)
            .filter(|elem| {
                filter
                    .iter()
                    .all(|(key, value)| elem.attribute(doc, key) == Some(*value))
            })
            .collect();
        if matched.iter().any(|elem| !elem.has_parent(doc)) {
            return Err(Error::DetachedElement);
        }
        for elem in &matched {
            elem.detach(self)?;
        }
        for elem in &matched {
            elem.destroy(self);
        }
        debug!(name, removed = matched.len(), "removed elements");
        Ok(matched.len())
    }
}

// Read and write
impl Document {
    /// Parses xml string.
    ///
    /// # Errors
    ///
    /// Returns Errors from [`Document::parse_reader()`].
    pub fn parse_str(str: &str) -> Result<Document> {
        Self::parse_reader(str.as_bytes())
    }

    pub fn parse_str_with_opts(str: &str, opts: ReadOptions) -> Result<Document> {
        Self::parse_reader_with_opts(str.as_bytes(), opts)
    }

    /// Parses xml from reader.
    ///
    /// # Errors
    ///
    /// - [`Error::CannotDecode`]: Could not decode XML.
    /// - [`Error::MalformedDocument`]: The XML is not well-formed.
    /// - [`Error::Io`]: IO Error
    pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
        Self::parse_reader_with_opts(reader, ReadOptions::default())
    }

    pub fn parse_reader_with_opts<R: Read>(reader: R, opts: ReadOptions) -> Result<Document> {
        DocumentParser::parse_reader(reader, opts)
    }

    /// Parses xml file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::parse_file_with_opts(path, ReadOptions::default())
    }

    #[instrument(skip(path, opts), fields(path = %path.as_ref().display()))]
    pub fn parse_file_with_opts<P: AsRef<Path>>(path: P, opts: ReadOptions) -> Result<Document> {
        let file = File::open(path.as_ref())?;
        let document = Self::parse_reader_with_opts(file, opts)?;
        info!(elements = document.element_count(), "loaded xml file");
        Ok(document)
    }

    /// Writes document as xml string.
    pub fn write_str(&self) -> Result<String> {
        self.write_str_with_opts(WriteOptions::default())
    }

    pub fn write_str_with_opts(&self, opts: WriteOptions) -> Result<String> {
        let mut buf: Vec<u8> = Vec::with_capacity(200);
        self.write_with_opts(&mut buf, opts)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Write document to writer. Will be written in UTF-8.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        self.write_with_opts(writer, WriteOptions::default())
    }

    pub fn write_with_opts(&self, writer: &mut impl Write, opts: WriteOptions) -> Result<()> {
        DocumentWriter::new(self, opts).write(writer)
    }

    /// Write document to a file, replacing its content.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_file_with_opts(path, WriteOptions::default())
    }

    #[instrument(skip(self, path, opts), fields(path = %path.as_ref().display()))]
    pub fn write_file_with_opts<P: AsRef<Path>>(&self, path: P, opts: WriteOptions) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_with_opts(&mut writer, opts)?;
        writer.flush()?;
        info!(elements = self.element_count(), "wrote xml file");
        Ok(())
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Document> {
        Document::parse_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = r#"<root><person id="1"><name>John</name></person><person id="2"><name>Jane</name></person></root>"#;

    #[test]
    fn test_add_element() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <basic>
            Text
            <c />
        </basic>
        "#;
        let mut document = Document::from_str(xml).unwrap();
        let basic = document.root();
        let p = Element::new(&mut document, "p").unwrap();
        basic.push_child(&mut document, p).unwrap();
        assert_eq!(p.parent(&document).unwrap(), basic);
        assert_eq!(p, *basic.children(&document).last().unwrap());
        assert_eq!(document.element_count(), 3);
    }

    #[test]
    fn test_add_child_to_root() {
        let mut doc = Document::from_str(PEOPLE).unwrap();
        let added = doc
            .add_child(
                "root",
                Element::build("person").attribute("id", "3").text("New"),
            )
            .unwrap();
        assert!(added);
        let last = *doc.root().children(&doc).last().unwrap();
        assert_eq!(last.attribute(&doc, "id"), Some("3"));
        assert_eq!(last.text(&doc), Some("New"));
        assert_eq!(doc.find_all("person").count(), 3);
    }

    #[test]
    fn test_add_child_first_match() {
        let mut doc = Document::from_str(PEOPLE).unwrap();
        assert!(doc.add_child("person", Element::build("age")).unwrap());
        let persons: Vec<_> = doc.find_all("person").collect();
        assert_eq!(persons[0].children(&doc).len(), 2);
        assert_eq!(persons[1].children(&doc).len(), 1);
    }

    #[test]
    fn test_add_child_missing_parent() {
        let mut doc = Document::from_str(PEOPLE).unwrap();
        let before = doc.write_str().unwrap();
        assert!(!doc.add_child("nobody", Element::build("x")).unwrap());
        assert!(matches!(
            doc.add_child("root", Element::build("")),
            Err(Error::InvalidName)
        ));
        assert_eq!(doc.element_count(), 5);
        assert_eq!(doc.write_str().unwrap(), before);
    }

    #[test]
    fn test_remove_elements() {
        let mut doc = Document::from_str(PEOPLE).unwrap();
        assert_eq!(doc.remove_elements("person", &[("id", "2")]).unwrap(), 1);
        let persons: Vec<_> = doc.find_all("person").collect();
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].attribute(&doc, "id"), Some("1"));
        assert_eq!(doc.remove_elements("person", &[("id", "2")]).unwrap(), 0);
        assert_eq!(doc.element_count(), 3);
    }

    #[test]
    fn test_add_child_invalid_name() {
        let mut doc = Document::from_str(PEOPLE).unwrap();
        let before = doc.write_str().unwrap();
        for builder in vec![
            Element::build("a b"),
            Element::build("1a"),
            Element::build("a").attribute("", "x"),
            Element::build("a").attribute("x y", "1"),
        ] {
            assert!(matches!(
                doc.add_child("root", builder),
                Err(Error::InvalidName)
            ));
        }
        assert_eq!(doc.write_str().unwrap(), before);
        assert_eq!(doc.store.len(), 5);
        assert!(matches!(Document::new("<root>"), Err(Error::InvalidName)));
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let mut doc = Document::new("root").unwrap();
        for _ in 0..10_000 {
            assert!(doc.add_child("root", Element::build("item")).unwrap());
            assert!(doc.add_child("item", Element::build("leaf")).unwrap());
            assert_eq!(doc.remove_elements("item", &[]).unwrap(), 1);
        }
        assert_eq!(doc.element_count(), 1);
        assert!(doc.store.len() <= 3);

        doc.add_child("root", Element::build("person").attribute("id", "1"))
            .unwrap();
        let person = doc.find_all("person").next().unwrap();
        assert_eq!(person.attribute(&doc, "id"), Some("1"));
        assert!(!person.has_children(&doc));
        let opts = WriteOptions {
            indent: None,
            declaration: false,
        };
        assert_eq!(
            doc.write_str_with_opts(opts).unwrap(),
            r#"<root><person id="1"/></root>"#
        );
    }

    #[test]
    fn test_remove_elements_filter() {
        let xml = r#"<r><p a="1" b="2"/><p a="1" b="3"/><p a="1"/><q a="1" b="2"/></r>"#;
        let mut doc = Document::from_str(xml).unwrap();
        assert_eq!(
            doc.remove_elements("p", &[("a", "1"), ("b", "2")]).unwrap(),
            1
        );
        assert_eq!(doc.find_all("p").count(), 2);
        assert_eq!(doc.remove_elements("p", &[]).unwrap(), 2);
        assert_eq!(doc.find_all("p").count(), 0);
        assert_eq!(doc.find_all("q").count(), 1);
    }

    #[test]
    fn test_remove_root_is_noop() {
        let mut doc = Document::from_str(PEOPLE).unwrap();
        assert_eq!(doc.remove_elements("root", &[]).unwrap(), 0);
        assert_eq!(doc.element_count(), 5);
    }

    #[test]
    fn test_attributes_of() {
        let doc = Document::from_str(PEOPLE).unwrap();
        let first = doc.root().first_child(&doc);
        let attrs = doc.attributes_of(first);
        assert_eq!(attrs.get("id").map(String::as_str), Some("1"));
        assert!(doc.attributes_of(None).is_empty());
    }

    #[test]
    fn test_new_document() {
        assert!(matches!(Document::new(""), Err(Error::InvalidName)));
        let doc = Document::new("root").unwrap();
        assert_eq!(doc.root().name(&doc), "root");
        assert_eq!(doc.version(), "1.0");
        assert!(!doc.standalone());
        assert_eq!(doc.element_count(), 1);
    }
}
