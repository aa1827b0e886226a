use crate::document::Document;
use crate::element::Element;
use crate::error::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use tracing::debug;

/// Options when writing xml.
///
/// - `indent`: number of spaces per nesting level. `None` writes everything on one line.
/// Defaults to `Some(4)`.
/// - `declaration`: write `<?xml version="..." encoding="UTF-8"?>` first. Defaults to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent: Option<usize>,
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> WriteOptions {
        WriteOptions {
            indent: Some(4),
            declaration: true,
        }
    }
}

pub(crate) struct DocumentWriter<'a> {
    document: &'a Document,
    opts: WriteOptions,
}

impl<'a> DocumentWriter<'a> {
    pub(crate) fn new(document: &'a Document, opts: WriteOptions) -> DocumentWriter<'a> {
        DocumentWriter { document, opts }
    }

    pub(crate) fn write(&self, writer: &mut impl Write) -> Result<()> {
        let mut writer = match self.opts.indent {
            Some(size) => Writer::new_with_indent(writer, b' ', size),
            None => Writer::new(writer),
        };
        if self.opts.declaration {
            self.write_decl(&mut writer)?;
        }
        self.write_element(&mut writer, self.document.root())?;
        writer.write_event(Event::Eof)?;
        debug!(
            elements = self.document.element_count(),
            "wrote xml document"
        );
        Ok(())
    }

    fn write_decl(&self, writer: &mut Writer<impl Write>) -> Result<()> {
        let standalone = match self.document.standalone {
            true => Some("yes".as_bytes()),
            false => None,
        };
        writer.write_event(Event::Decl(BytesDecl::new(
            self.document.version.as_bytes(),
            Some("UTF-8".as_bytes()),
            standalone,
        )))?;
        Ok(())
    }

    // Text is written before the children. Elements without both are written as `<tag/>`.
    fn write_element(&self, writer: &mut Writer<impl Write>, element: Element) -> Result<()> {
        let doc = self.document;
        let name_bytes = element.name(doc).as_bytes();
        let mut start = BytesStart::borrowed_name(name_bytes);
        for (key, val) in element.attributes(doc) {
            start.push_attribute((key.as_str(), val.as_str()));
        }
        let text = element.text(doc);
        if text.is_none() && !element.has_children(doc) {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if let Some(text) = text {
            writer.write_event(Event::Text(BytesText::from_plain_str(text)))?;
        }
        for child in element.children(doc) {
            self.write_element(writer, *child)?;
        }
        writer.write_event(Event::End(BytesEnd::borrowed(name_bytes)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn compact() -> WriteOptions {
        WriteOptions {
            indent: None,
            declaration: false,
        }
    }

    #[test]
    fn test_write_compact() {
        let mut doc = Document::new("root").unwrap();
        let root = doc.root();
        let person = Element::build("person")
            .attribute("id", "1")
            .push_to(&mut doc, root)
            .unwrap();
        Element::build("name")
            .text("John")
            .push_to(&mut doc, person)
            .unwrap();
        Element::build("empty").push_to(&mut doc, root).unwrap();
        let xml = doc.write_str_with_opts(compact()).unwrap();
        assert_eq!(
            xml,
            r#"<root><person id="1"><name>John</name></person><empty/></root>"#
        );
    }

    #[test]
    fn test_write_decl() {
        let doc = Document::new("root").unwrap();
        let opts = WriteOptions {
            indent: None,
            declaration: true,
        };
        assert_eq!(
            doc.write_str_with_opts(opts).unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8"?><root/>"#
        );
    }

    #[test]
    fn test_write_keeps_attribute_order() {
        let mut doc = Document::new("root").unwrap();
        let root = doc.root();
        root.set_attribute(&mut doc, "z", "1").unwrap();
        root.set_attribute(&mut doc, "a", "2").unwrap();
        root.set_attribute(&mut doc, "m", "3").unwrap();
        assert_eq!(
            doc.write_str_with_opts(compact()).unwrap(),
            r#"<root z="1" a="2" m="3"/>"#
        );
    }
}
