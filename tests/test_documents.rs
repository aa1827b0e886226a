mod helpers;

use helpers::{get_expected, to_yaml, TStr};
use itertools::Itertools;
use std::fs::File;
use std::path::Path;
use xml_etree::{Document, ReadOptions, WriteOptions};

// Documents and xml files are supposed to have a 1:1 relationship.
// Then write is ok if read function is ok, and read(write(D)) == D
fn test_write(document: &Document) -> TStr {
    let expected = TStr(to_yaml(document));
    let write_options = [
        WriteOptions::default(),
        WriteOptions {
            indent: None,
            declaration: false,
        },
        WriteOptions {
            indent: Some(1),
            declaration: true,
        },
    ];
    for opts in write_options.iter() {
        let written_xml = document.write_str_with_opts(opts.clone()).unwrap();
        let new_doc = Document::parse_str(&written_xml).unwrap();
        let result = TStr(to_yaml(&new_doc));
        assert!(
            expected == result,
            "\noptions: {:?}\n===expected==={:?}\n===result==={:?}\nWRITING\n{}",
            opts,
            expected,
            result,
            written_xml,
        );
    }
    expected
}

fn test<F, S>(xml_file: &str, expected: F)
where
    F: Fn(&ReadOptions) -> S,
    S: Into<String>,
{
    let xml_file = Path::new("tests/documents").join(xml_file);

    // Options
    let require_decl_opts = [true, false];
    let opts = [require_decl_opts];

    for k in opts.iter().multi_cartesian_product() {
        let read_options = ReadOptions {
            require_decl: *k[0],
        };
        let expected_name: String = expected(&read_options).into();
        let expected = get_expected(&expected_name);
        let file = File::open(&xml_file).unwrap();
        let result = match Document::parse_reader_with_opts(file, read_options.clone()) {
            Ok(document) => test_write(&document),
            Err(error) => {
                let debug_str = format!("{:?}", error);
                let variant_name = debug_str.splitn(2, '(').next().unwrap();
                TStr(format!("error: {}", variant_name))
            }
        };

        assert!(
            expected == result,
            "\noptions: {:?}\n===expected==={:?}===result==={:?}\nREADING\n",
            read_options,
            expected,
            result,
        );
    }
}

#[test]
fn basic() {
    test("basic.xml", |_| "basic.yaml")
}

#[test]
fn nodecl() {
    test("nodecl.xml", |opts| {
        if opts.require_decl {
            "nodecl_err.yaml"
        } else {
            "nodecl.yaml"
        }
    })
}

#[test]
fn emptytag() {
    test("emptytag.xml", |_| "emptytag.yaml")
}

#[test]
fn mixed() {
    test("mixed.xml", |_| "mixed.yaml")
}

#[test]
fn nodes() {
    test("nodes.xml", |_| "nodes.yaml")
}

#[test]
fn namespace() {
    test("namespace.xml", |_| "namespace.yaml")
}

#[test]
fn encoding1() {
    test("encoding1.xml", |_| "encoding1.yaml")
}

#[test]
fn encoding2() {
    test("encoding2.xml", |_| "encoding2.yaml")
}

#[test]
fn error1() {
    test("error1.xml", |_| "error1.yaml")
}

#[test]
fn error2() {
    test("error2.xml", |_| "error2.yaml")
}

#[test]
fn error3() {
    test("error3.xml", |_| "error3.yaml")
}

#[test]
fn error4() {
    test("error4.xml", |_| "error4.yaml")
}

#[test]
fn error5() {
    test("error5.xml", |_| "error5.yaml")
}

#[test]
fn declaration_values() {
    let doc = Document::parse_file("tests/documents/nodes.xml").unwrap();
    assert!(doc.standalone());
    assert_eq!(doc.version(), "1.0");
    let xml = doc.write_str().unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
}
