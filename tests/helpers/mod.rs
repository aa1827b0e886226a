#![allow(dead_code)]

use std::fmt;
use std::fmt::Write;
use std::path::Path;
use xml_etree::{Document, Element};

#[derive(Clone)]
pub struct TStr(pub String);

impl PartialEq<Self> for TStr {
    fn eq(&self, other: &Self) -> bool {
        self.0.trim() == other.0.trim()
    }
}

impl fmt::Debug for TStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\n{}\n", self.0.trim())
    }
}

/// Renders the element tree, so two documents can be compared structurally.
pub fn to_yaml(doc: &Document) -> String {
    let mut buf = String::new();
    write_line("Root:", 0, &mut buf);
    render_element(doc, doc.root(), 1, &mut buf);
    buf
}

fn render_element(doc: &Document, elem: Element, mut depth: usize, buf: &mut String) {
    write_line("- Element:", depth, buf);
    depth += 2;

    write_line(&format!("name: {}", elem.name(doc)), depth, buf);

    let attrs = elem.attributes(doc);
    if !attrs.is_empty() {
        write_line("attributes:", depth, buf);
        for (key, val) in attrs {
            write_line(&format!("{}: \"{}\"", key, escape(val)), depth + 1, buf);
        }
    }

    if let Some(text) = elem.text(doc) {
        write_line(&format!("text: \"{}\"", escape(text)), depth, buf);
    }

    let children = elem.children(doc);
    if !children.is_empty() {
        write_line("children:", depth, buf);
        for child in children {
            render_element(doc, *child, depth + 1, buf);
        }
    }
}

fn escape(text: &str) -> String {
    text.replace("\n", r"\n").replace("\r", r"\r")
}

fn write_line(text: &str, depth: usize, buf: &mut String) {
    let indent = " ".repeat(depth * 2);
    writeln!(buf, "{}{}", indent, text).unwrap();
}

pub fn get_expected(file_name: &str) -> TStr {
    let yaml_file = Path::new("tests/documents").join(file_name);

    TStr(
        std::fs::read_to_string(&yaml_file)
            .unwrap()
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<&str>>()
            .join("\n"),
    )
}
