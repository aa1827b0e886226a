use crate::document::Document;
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Data of an element, stored in [`Document`].
#[derive(Debug, Clone, Default)]
pub(crate) struct ElementData {
    name: String,                         // may include a namespace prefix
    attributes: IndexMap<String, String>, // keeps the order they were read or set in
    text: Option<String>,
    parent: Option<Element>,
    children: Vec<Element>,
}

impl ElementData {
    pub(crate) fn new(
        name: String,
        attributes: IndexMap<String, String>,
        text: Option<String>,
    ) -> ElementData {
        ElementData {
            name,
            attributes,
            text,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Loose check of the XML `Name` production. Rejects empty names, whitespace,
/// markup characters and a leading digit, `-` or `.`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    match name.chars().next() {
        None => return false,
        Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => return false,
        _ => {}
    }
    !name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "<>&\"'=/".contains(c))
}

/// Represents an Xml Element.
///
/// This struct only contains a unique usize id and implements trait `Copy`.
/// So you do not need to bother with having a reference.
///
/// Because the actual data of the element is stored in [`Document`],
/// most methods takes `&Document` or `&mut Document` as its first argument.
/// Using an `Element` with a document it wasn't created in, or after
/// [`Document::remove_elements`] removed it, is a logic error and may panic
/// or refer to another element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    id: usize,
}

impl Element {
    /// Create a new detached element with name.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: `name` is not a valid XML name.
    pub fn new<S: Into<String>>(document: &mut Document, name: S) -> Result<Element> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName);
        }
        Ok(Self::with_data(
            document,
            ElementData::new(name, IndexMap::new(), None),
        ))
    }

    /// Start building an element. See [`ElementBuilder`].
    pub fn build<S: Into<String>>(name: S) -> ElementBuilder {
        ElementBuilder::new(name)
    }

    // Reuses the slot of a destroyed element if there is one.
    pub(crate) fn with_data(document: &mut Document, data: ElementData) -> Element {
        match document.free.pop() {
            Some(id) => {
                document.store[id] = data;
                Element { id }
            }
            None => {
                let elem = Element {
                    id: document.store.len(),
                };
                document.store.push(data);
                elem
            }
        }
    }

    // Frees the slots of a detached subtree.
    pub(crate) fn destroy(&self, document: &mut Document) {
        debug_assert!(!self.is_root() && !self.has_parent(document));
        let subtree: Vec<Element> = self.iter(document).collect();
        for elem in subtree {
            *elem.mut_data(document) = ElementData::default();
            document.free.push(elem.id);
        }
    }

    pub(crate) fn root() -> Element {
        Element { id: 0 }
    }

    /// Whether this is the root element of its document.
    pub fn is_root(&self) -> bool {
        self.id == 0
    }

    /// `"prefix:name"` -> `("prefix", "name")`, `"name"` -> `("", "name")`
    pub fn separate_prefix_name(full_name: &str) -> (&str, &str) {
        match full_name.split_once(':') {
            Some((prefix, name)) => (prefix, name),
            None => ("", full_name),
        }
    }
}

impl Element {
    fn data<'a>(&self, document: &'a Document) -> &'a ElementData {
        &document.store[self.id]
    }

    fn mut_data<'a>(&self, document: &'a mut Document) -> &'a mut ElementData {
        &mut document.store[self.id]
    }

    /// Get tag name of element, including its namespace prefix.
    ///
    /// Tag matching in this crate always compares this full name.
    pub fn name<'a>(&self, document: &'a Document) -> &'a str {
        &self.data(document).name
    }

    /// `<prefix:name>` -> `("prefix", "name")`
    pub fn prefix_name<'a>(&self, document: &'a Document) -> (&'a str, &'a str) {
        Self::separate_prefix_name(self.name(document))
    }

    pub fn prefix<'a>(&self, document: &'a Document) -> &'a str {
        self.prefix_name(document).0
    }

    pub fn local_name<'a>(&self, document: &'a Document) -> &'a str {
        self.prefix_name(document).1
    }

    /// Get attributes of element, in document order.
    pub fn attributes<'a>(&self, document: &'a Document) -> &'a IndexMap<String, String> {
        &self.data(document).attributes
    }

    pub fn mut_attributes<'a>(
        &self,
        document: &'a mut Document,
    ) -> &'a mut IndexMap<String, String> {
        &mut self.mut_data(document).attributes
    }

    pub fn attribute<'a>(&self, document: &'a Document, name: &str) -> Option<&'a str> {
        self.attributes(document).get(name).map(String::as_str)
    }

    /// Sets an attribute. Overwriting an existing attribute keeps its position.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: `name` is not a valid XML name. Nothing is changed.
    pub fn set_attribute<K, V>(&self, document: &mut Document, name: K, value: V) -> Result<()>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName);
        }
        self.mut_attributes(document).insert(name, value.into());
        Ok(())
    }

    /// Removes an attribute, keeping the order of the remaining ones.
    pub fn remove_attribute(&self, document: &mut Document, name: &str) -> Option<String> {
        self.mut_attributes(document).shift_remove(name)
    }

    /// Trimmed direct text of the element. `None` if there is no text or it is blank.
    pub fn text<'a>(&self, document: &'a Document) -> Option<&'a str> {
        self.data(document)
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn set_text<S: Into<String>>(&self, document: &mut Document, text: S) {
        let text = text.into();
        self.mut_data(document).text = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
    }

    pub fn clear_text(&self, document: &mut Document) {
        self.mut_data(document).text = None;
    }

    // Only text before the first child is kept. Segments of it are joined with a space.
    pub(crate) fn append_text(&self, document: &mut Document, segment: &str) {
        let data = self.mut_data(document);
        if !data.children.is_empty() {
            return;
        }
        match &mut data.text {
            Some(text) => {
                text.push(' ');
                text.push_str(segment);
            }
            None => data.text = Some(segment.to_string()),
        }
    }

    /// Concatenated text of this element and all its descendants, in document order.
    ///
    /// Text that followed a child element in the source is not kept by the parser.
    pub fn text_content(&self, document: &Document) -> String {
        let mut buf = String::new();
        for elem in self.iter(document) {
            if let Some(text) = elem.text(document) {
                buf.push_str(text);
            }
        }
        buf
    }

    pub fn parent(&self, document: &Document) -> Option<Element> {
        self.data(document).parent
    }

    /// ```ignore
    /// self.parent(document).is_some()
    /// ```
    pub fn has_parent(&self, document: &Document) -> bool {
        self.parent(document).is_some()
    }

    pub fn children<'a>(&self, document: &'a Document) -> &'a [Element] {
        &self.data(document).children
    }

    /// ```ignore
    /// !self.children(document).is_empty()
    /// ```
    pub fn has_children(&self, document: &Document) -> bool {
        !self.children(document).is_empty()
    }

    pub fn first_child(&self, document: &Document) -> Option<Element> {
        self.children(document).first().copied()
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants<'a>(&self, document: &'a Document) -> Descendants<'a> {
        Descendants {
            document,
            stack: self.children(document).iter().rev().copied().collect(),
        }
    }

    /// `self` followed by all its descendants, in document order.
    pub fn iter<'a>(&self, document: &'a Document) -> Descendants<'a> {
        Descendants {
            document,
            stack: vec![*self],
        }
    }

    /// Descendants with tag name `name`, in document order. `self` is never included.
    ///
    /// Names are compared exactly, including the namespace prefix.
    pub fn find_all<'a, 'n>(&self, document: &'a Document, name: &'n str) -> FindAll<'a, 'n> {
        FindAll {
            inner: self.descendants(document),
            name,
        }
    }

    /// First descendant with tag name `name`.
    pub fn find(&self, document: &Document, name: &str) -> Option<Element> {
        self.find_all(document, name).next()
    }

    /// `(name, text)` of `self` and every descendant that has non blank text.
    pub fn texts<'a>(&self, document: &'a Document) -> Texts<'a> {
        Texts {
            inner: self.iter(document),
        }
    }

    fn check_attachable(&self, document: &Document, elem: Element) -> Result<()> {
        if elem.is_root() {
            return Err(Error::RootCannotMove);
        }
        if elem.has_parent(document) {
            return Err(Error::HasAParent);
        }
        let mut ancestor = Some(*self);
        while let Some(current) = ancestor {
            if current == elem {
                return Err(Error::CyclicInsert);
            }
            ancestor = current.parent(document);
        }
        Ok(())
    }

    /// Equivalent to `vec.push()`.
    ///
    /// # Errors
    ///
    /// - [`Error::RootCannotMove`]: `elem` is the root element.
    /// - [`Error::HasAParent`]: `elem` must not have a parent.
    /// Call `elem.detach()` before.
    /// - [`Error::CyclicInsert`]: `self` is `elem` or one of its descendants.
    pub fn push_child(&self, document: &mut Document, elem: Element) -> Result<()> {
        self.check_attachable(document, elem)?;
        elem.mut_data(document).parent = Some(*self);
        self.mut_data(document).children.push(elem);
        Ok(())
    }

    /// Equivalent to `vec.insert()`.
    ///
    /// # Errors
    ///
    /// Same as [`Element::push_child`].
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_child(&self, document: &mut Document, index: usize, elem: Element) -> Result<()> {
        self.check_attachable(document, elem)?;
        self.mut_data(document).children.insert(index, elem);
        elem.mut_data(document).parent = Some(*self);
        Ok(())
    }

    /// Remove child element by value.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`]: Element was not found among its children.
    pub fn remove_child(&self, document: &mut Document, elem: Element) -> Result<()> {
        let children = &mut self.mut_data(document).children;
        let pos = children
            .iter()
            .position(|e| *e == elem)
            .ok_or(Error::NotFound)?;
        children.remove(pos);
        elem.mut_data(document).parent = None;
        Ok(())
    }

    /// Remove the element from its parent. It keeps its own children.
    ///
    /// # Errors
    ///
    /// - [`Error::DetachedElement`]: Element has no parent. This is always the case for the root.
    pub fn detach(&self, document: &mut Document) -> Result<()> {
        let parent = self.parent(document).ok_or(Error::DetachedElement)?;
        parent.remove_child(document, *self)
    }
}

/// Pre-order iterator over elements. Returned by [`Element::descendants`] and [`Element::iter`].
///
/// Clone it, or call the method again, to restart the traversal.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let elem = self.stack.pop()?;
        self.stack
            .extend(elem.children(self.document).iter().rev().copied());
        Some(elem)
    }
}

/// Returned by [`Element::find_all`] and [`Document::find_all`].
#[derive(Debug, Clone)]
pub struct FindAll<'a, 'n> {
    inner: Descendants<'a>,
    name: &'n str,
}

impl<'a, 'n> Iterator for FindAll<'a, 'n> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        let document = self.inner.document;
        let name = self.name;
        self.inner.find(|elem| elem.name(document) == name)
    }
}

/// Returned by [`Element::texts`] and [`Document::texts`].
#[derive(Debug, Clone)]
pub struct Texts<'a> {
    inner: Descendants<'a>,
}

impl<'a> Iterator for Texts<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<(&'a str, &'a str)> {
        let document = self.inner.document;
        self.inner
            .find_map(|elem| Some((elem.name(document), elem.text(document)?)))
    }
}

/// Describes a new element. Defaults: no attributes, no text.
///
/// ```
/// use xml_etree::{Document, Element};
///
/// let mut doc = Document::new("root").unwrap();
/// let root = doc.root();
/// let person = Element::build("person")
///     .attribute("id", "3")
///     .text("New")
///     .push_to(&mut doc, root)
///     .unwrap();
/// assert_eq!(person.attribute(&doc, "id"), Some("3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBuilder {
    name: String,
    attributes: IndexMap<String, String>,
    text: Option<String>,
}

impl ElementBuilder {
    pub fn new<S: Into<String>>(name: S) -> ElementBuilder {
        ElementBuilder {
            name: name.into(),
            attributes: IndexMap::new(),
            text: None,
        }
    }

    pub fn attribute<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.extend(
            attributes
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    /// Blank text is the same as no text.
    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the element in `document` without a parent.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: the tag or an attribute name is not a valid XML name.
    pub fn finish(self, document: &mut Document) -> Result<Element> {
        if !is_valid_name(&self.name) || !self.attributes.keys().all(|key| is_valid_name(key)) {
            return Err(Error::InvalidName);
        }
        let data = ElementData::new(self.name, self.attributes, self.text);
        Ok(Element::with_data(document, data))
    }

    /// Create the element and push it as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`]: see [`ElementBuilder::finish`].
    pub fn push_to(self, document: &mut Document, parent: Element) -> Result<Element> {
        let elem = self.finish(document)?;
        parent.push_child(document, elem)?;
        Ok(elem)
    }
}
