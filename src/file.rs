use crate::document::Document;
use crate::element::ElementBuilder;
use crate::error::Result;
use crate::parser::ReadOptions;
use crate::writer::WriteOptions;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// A [`Document`] backed by a file.
///
/// [`XmlFile::add_child`] and [`XmlFile::remove_elements`] write the whole document
/// back to the file after changing it. Other changes made through
/// [`XmlFile::document_mut`] are written by [`XmlFile::save`].
///
/// ```no_run
/// use xml_etree::{Element, ReadOptions, XmlFile};
///
/// let mut file = XmlFile::open("library.xml", ReadOptions::default()).unwrap();
/// file.add_child("members", Element::build("member").attribute("id", "MEM003"))
///     .unwrap();
/// let removed = file.remove_elements("member", &[("status", "inactive")]).unwrap();
/// ```
#[derive(Debug)]
pub struct XmlFile {
    path: PathBuf,
    document: Document,
    write_opts: WriteOptions,
}

impl XmlFile {
    /// Parse the file at `path`.
    pub fn open<P: Into<PathBuf>>(path: P, opts: ReadOptions) -> Result<XmlFile> {
        let path = path.into();
        let document = Document::parse_file_with_opts(&path, opts)?;
        Ok(XmlFile {
            path,
            document,
            write_opts: WriteOptions::default(),
        })
    }

    /// Write `document` to `path` and keep it as the backing file.
    pub fn create<P: Into<PathBuf>>(path: P, document: Document) -> Result<XmlFile> {
        let file = XmlFile {
            path: path.into(),
            document,
            write_opts: WriteOptions::default(),
        };
        file.save()?;
        Ok(file)
    }

    pub fn with_write_opts(mut self, opts: WriteOptions) -> XmlFile {
        self.write_opts = opts;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// [`Document::add_child`], then save if an element was added.
    pub fn add_child(&mut self, parent_name: &str, element: ElementBuilder) -> Result<bool> {
        let added = self.document.add_child(parent_name, element)?;
        if added {
            self.save()?;
        }
        Ok(added)
    }

    /// [`Document::remove_elements`], then save.
    pub fn remove_elements(&mut self, name: &str, filter: &[(&str, &str)]) -> Result<usize> {
        let removed = self.document.remove_elements(name, filter)?;
        self.save()?;
        Ok(removed)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn save(&self) -> Result<()> {
        self.document
            .write_file_with_opts(&self.path, self.write_opts.clone())
    }

    /// Write to `path`, which becomes the backing file from now on.
    pub fn save_as<P: Into<PathBuf>>(&mut self, path: P) -> Result<()> {
        let path = path.into();
        self.document
            .write_file_with_opts(&path, self.write_opts.clone())?;
        info!(from = %self.path.display(), to = %path.display(), "moved backing file");
        self.path = path;
        Ok(())
    }
}
