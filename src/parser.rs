use crate::document::Document;
use crate::element::{is_valid_name, Element, ElementData};
use crate::error::{Error, Result};
use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, Read};
use tracing::{debug, trace};

pub(crate) struct DecodeReader<R: Read> {
    decoder: Option<Decoder>,
    inner: R,
    undecoded: [u8; 4096],
    undecoded_pos: usize,
    undecoded_cap: usize,
    decoded: [u8; 12288],
    decoded_pos: usize,
    decoded_cap: usize,
    done: bool,     // inner reader reached eof
    finished: bool, // decoder flushed everything after eof
}

impl<R: Read> DecodeReader<R> {
    // If Decoder is not set, don't decode.
    pub(crate) fn new(reader: R, decoder: Option<Decoder>) -> DecodeReader<R> {
        DecodeReader {
            decoder,
            inner: reader,
            undecoded: [0; 4096],
            undecoded_pos: 0,
            undecoded_cap: 0,
            decoded: [0; 12288],
            decoded_pos: 0,
            decoded_cap: 0,
            done: false,
            finished: false,
        }
    }

    pub(crate) fn set_decoder(&mut self, dec: Option<Decoder>) {
        self.decoder = dec;
        self.done = false;
        self.finished = false;
    }

    fn fill_buf_decode(&mut self) -> std::io::Result<&[u8]> {
        while self.decoded_pos >= self.decoded_cap {
            if self.finished {
                return Ok(&[]);
            }
            let remaining = self.undecoded_cap - self.undecoded_pos;
            if remaining <= 32 && !self.done {
                // Move remaining undecoded bytes at the end to start
                self.undecoded
                    .copy_within(self.undecoded_pos..self.undecoded_cap, 0);
                let read = self.inner.read(&mut self.undecoded[remaining..])?;
                self.done = read == 0;
                self.undecoded_pos = 0;
                self.undecoded_cap = remaining + read;
            }

            let decoder = match self.decoder.as_mut() {
                Some(decoder) => decoder,
                None => return Ok(&[]),
            };
            let (res, read, written, _replaced) = decoder.decode_to_utf8(
                &self.undecoded[self.undecoded_pos..self.undecoded_cap],
                &mut self.decoded,
                self.done,
            );
            self.undecoded_pos += read;
            self.decoded_cap = written;
            self.decoded_pos = 0;
            self.finished = self.done && res == CoderResult::InputEmpty;
        }
        Ok(&self.decoded[self.decoded_pos..self.decoded_cap])
    }

    fn fill_buf_without_decode(&mut self) -> std::io::Result<&[u8]> {
        if self.undecoded_pos >= self.undecoded_cap {
            debug_assert!(self.undecoded_pos == self.undecoded_cap);
            self.undecoded_cap = self.inner.read(&mut self.undecoded)?;
            self.undecoded_pos = 0;
        }
        Ok(&self.undecoded[self.undecoded_pos..self.undecoded_cap])
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let amt = {
            let available = self.fill_buf()?;
            let amt = std::cmp::min(available.len(), buf.len());
            buf[..amt].copy_from_slice(&available[..amt]);
            amt
        };
        self.consume(amt);
        Ok(amt)
    }
}

impl<R: Read> BufRead for DecodeReader<R> {
    // Decoder may change from None to Some.
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        if self.decoder.is_some() {
            self.fill_buf_decode()
        } else {
            self.fill_buf_without_decode()
        }
    }

    fn consume(&mut self, amt: usize) {
        match &self.decoder {
            Some(_) => {
                self.decoded_pos = std::cmp::min(self.decoded_pos + amt, self.decoded_cap);
            }
            None => {
                self.undecoded_pos = std::cmp::min(self.undecoded_pos + amt, self.undecoded_cap);
            }
        }
    }
}

/// Options when parsing xml.
///
/// `require_decl`: the document must start with an XML declaration `<?xml ... ?>`.
/// Defaults to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub require_decl: bool,
}

pub(crate) struct DocumentParser {
    document: Option<Document>, // created at the root start tag
    read_opts: ReadOptions,
    element_stack: Vec<Element>,
    encoding: Option<String>,
    version: Option<String>,
    standalone: bool,
}

impl DocumentParser {
    fn new(opts: ReadOptions) -> DocumentParser {
        DocumentParser {
            document: None,
            read_opts: opts,
            element_stack: Vec::new(),
            encoding: None,
            version: None,
            standalone: false,
        }
    }

    pub(crate) fn parse_reader<R: Read>(reader: R, opts: ReadOptions) -> Result<Document> {
        let mut parser = DocumentParser::new(opts);
        parser.parse_start(reader)?;
        parser.finish()
    }

    fn finish(self) -> Result<Document> {
        let mut document = self
            .document
            .ok_or_else(|| malformed("Document has no root element"))?;
        if let Some(version) = self.version {
            document.version = version;
        }
        document.standalone = self.standalone;
        debug!(
            elements = document.element_count(),
            encoding = self.encoding.as_deref().unwrap_or("UTF-8"),
            "parsed xml document"
        );
        Ok(document)
    }

    fn handle_decl(&mut self, ev: &BytesDecl) -> Result<()> {
        self.version = Some(String::from_utf8(ev.version()?.to_vec())?);
        self.encoding = match ev.encoding() {
            Some(res) => Some(String::from_utf8(res?.to_vec())?),
            None => None,
        };
        self.standalone = match ev.standalone() {
            Some(res) => {
                let val = std::str::from_utf8(&*res?)?.to_lowercase();
                if val == "yes" {
                    true
                } else if val == "no" {
                    false
                } else {
                    return Err(malformed(
                        "Standalone Document Declaration has non boolean value",
                    ));
                }
            }
            None => false,
        };
        Ok(())
    }

    fn handle_bytes_start(&mut self, ev: &BytesStart) -> Result<Element> {
        let name = String::from_utf8(ev.name().to_vec())?;
        if !is_valid_name(&name) {
            return Err(malformed(&format!("Invalid element name {:?}", name)));
        }
        let mut attributes = IndexMap::new();
        for attr in ev.attributes() {
            let attr = attr?;
            let key = String::from_utf8(attr.key.to_vec())?;
            if !is_valid_name(&key) {
                return Err(malformed(&format!("Invalid attribute name {:?}", key)));
            }
            let value = String::from_utf8(attr.unescaped_value()?.to_vec())?;
            if attributes.contains_key(&key) {
                return Err(malformed(&format!("Duplicated attribute {}", key)));
            }
            attributes.insert(key, value);
        }
        let data = ElementData::new(name, attributes, None);

        if let Some(document) = self.document.as_mut() {
            let parent = *self
                .element_stack
                .last()
                .ok_or_else(|| malformed("Document has more than one root element"))?;
            let element = Element::with_data(document, data);
            parent.push_child(document, element)?;
            return Ok(element);
        }
        let document = Document::with_root_data(data);
        let root = document.root();
        self.document = Some(document);
        Ok(root)
    }

    fn handle_text(&mut self, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }
        match (&mut self.document, self.element_stack.last()) {
            (Some(document), Some(&element)) => {
                element.append_text(document, content);
                Ok(())
            }
            _ => Err(malformed("Text outside of the root element")),
        }
    }

    // Look at the document decl and figure out the document encoding
    fn parse_start<B: Read>(&mut self, reader: B) -> Result<()> {
        let mut bufreader = DecodeReader::new(reader, None);

        let bytes = bufreader.fill_buf()?;
        let init_encoding = match bytes {
            [0xfe, 0xff, ..] => {
                // UTF-16 BE BOM
                bufreader.consume(2);
                Some(UTF_16BE)
            }
            [0xff, 0xfe, ..] => {
                // UTF-16 LE BOM
                bufreader.consume(2);
                Some(UTF_16LE)
            }
            [0xef, 0xbb, 0xbf, ..] => {
                // UTF-8 BOM
                bufreader.consume(3);
                None
            }
            [0x00, 0x3c, 0x00, 0x3f, ..] => Some(UTF_16BE),
            [0x3c, 0x00, 0x3f, 0x00, ..] => Some(UTF_16LE),
            _ => None,
        };
        bufreader.set_decoder(init_encoding.map(|e| e.new_decoder_without_bom_handling()));
        let mut xmlreader = Reader::from_reader(bufreader);
        xmlreader.trim_text(true);
        let mut buf = Vec::with_capacity(150);
        let event = xmlreader.read_event(&mut buf)?;
        trace!(event = ?event);
        match event {
            Event::Decl(ev) => {
                self.handle_decl(&ev)?;
                if let Some(encoding_str) = &self.encoding {
                    let encoding =
                        Encoding::for_label(encoding_str.as_bytes()).ok_or(Error::CannotDecode)?;
                    let encoding = if encoding == UTF_8 {
                        None
                    } else {
                        Some(encoding)
                    };
                    // Encoding::for_label("UTF-16") defaults to UTF-16 LE, even though it could be UTF-16 BE
                    if encoding != init_encoding
                        && !(encoding == Some(UTF_16LE) && init_encoding == Some(UTF_16BE))
                    {
                        let mut decode_reader = xmlreader.into_underlying_reader();
                        decode_reader
                            .set_decoder(encoding.map(|e| e.new_decoder_without_bom_handling()));
                        xmlreader = Reader::from_reader(decode_reader);
                        xmlreader.trim_text(true);
                    }
                }
            }
            _ if self.read_opts.require_decl => {
                return Err(malformed("Didn't find XML Declaration at the start of file"));
            }
            event => {
                if self.handle_event(event)? {
                    return Ok(());
                }
            }
        }
        self.parse_content(xmlreader)
    }

    // Returns if document parsing is finished.
    fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Start(ref ev) => {
                let element = self.handle_bytes_start(ev)?;
                self.element_stack.push(element);
                Ok(false)
            }
            Event::End(_) => {
                // quick-xml checks if tag names match for us
                self.element_stack
                    .pop()
                    .ok_or_else(|| malformed("Closing tag without opening tag"))?;
                Ok(false)
            }
            Event::Empty(ref ev) => {
                self.handle_bytes_start(ev)?;
                Ok(false)
            }
            Event::Text(ev) => {
                let content = String::from_utf8(ev.unescaped()?.to_vec())?;
                self.handle_text(&content)?;
                Ok(false)
            }
            // CData content is not escaped.
            Event::CData(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                self.handle_text(&content)?;
                Ok(false)
            }
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) => Ok(false),
            // Only allowed as the first event, which parse_start handles.
            Event::Decl(_) => Err(malformed(
                "XML Declaration is only allowed at the start of the document",
            )),
            Event::Eof => {
                if let (Some(document), Some(elem)) = (&self.document, self.element_stack.last()) {
                    return Err(malformed(&format!(
                        "Element {} is not closed",
                        elem.name(document)
                    )));
                }
                Ok(true)
            }
        }
    }

    fn parse_content<B: BufRead>(&mut self, mut reader: Reader<B>) -> Result<()> {
        let mut buf = Vec::with_capacity(200); // reduce time increasing capacity at start.
        loop {
            let ev = reader.read_event(&mut buf)?;
            trace!(event = ?ev);
            if self.handle_event(ev)? {
                return Ok(());
            }
            buf.clear();
        }
    }
}

fn malformed(msg: &str) -> Error {
    Error::MalformedDocument(msg.to_string())
}
