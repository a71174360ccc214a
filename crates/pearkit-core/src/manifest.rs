//! `package.xml` as a small owned element tree.
//!
//! Only what the upgrade steps need: parse a file into nodes, find and edit
//! elements by name, and write the tree back out. Whitespace text between
//! elements is kept, so untouched parts of the file keep their layout.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when reading or writing a package manifest.
#[derive(Error, Debug)]
pub enum ManifestXmlError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("package manifest has no root element")]
    NoRootElement,

    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),

    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// A node in the manifest tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
    Declaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
}

/// An element with its attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl XmlElement {
    /// An element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, ManifestXmlError> {
        let mut element = Self::new(lossy(start.name().as_ref()));
        for attribute in start.attributes() {
            let attribute = attribute?;
            let value = attribute.unescape_value()?.into_owned();
            element
                .attributes
                .push((lossy(attribute.key.as_ref()), value));
        }
        Ok(element)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Child elements, skipping text and other nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element called `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// Follow a chain of child names, e.g. `["dependencies", "required"]`.
    #[must_use]
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names
            .iter()
            .try_fold(self, |element, name| element.child(name))
    }

    pub fn path_mut(&mut self, names: &[&str]) -> Option<&mut XmlElement> {
        let mut element = self;
        for name in names {
            element = element.child_mut(name)?;
        }
        Some(element)
    }

    /// Concatenated text and CDATA content of the direct children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) | XmlNode::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    /// Set the text of the element at `names`, appending any element
    /// missing along the way.
    pub fn set_text_at(&mut self, names: &[&str], text: impl Into<String>) {
        let Some((first, rest)) = names.split_first() else {
            self.set_text(text);
            return;
        };
        if self.child(first).is_none() {
            self.children.push(XmlNode::Element(XmlElement::new(*first)));
        }
        if let Some(child) = self.child_mut(first) {
            child.set_text_at(rest, text);
        }
    }
}

/// A parsed `package.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    nodes: Vec<XmlNode>,
}

impl PackageManifest {
    /// A manifest holding an XML declaration and `root`.
    #[must_use]
    pub fn new(root: XmlElement) -> Self {
        Self {
            nodes: vec![
                XmlNode::Declaration {
                    version: "1.0".to_string(),
                    encoding: Some("UTF-8".to_string()),
                    standalone: None,
                },
                XmlNode::Text("\n".to_string()),
                XmlNode::Element(root),
            ],
        }
    }

    /// Read a manifest from disk; `Ok(None)` if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ManifestXmlError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ManifestXmlError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text).map(Some)
    }

    /// Parse manifest text.
    pub fn parse(text: &str) -> Result<Self, ManifestXmlError> {
        let mut reader = Reader::from_str(text);
        let mut open: Vec<XmlElement> = Vec::new();
        let mut nodes = Vec::new();

        loop {
            let node = match reader.read_event()? {
                Event::Start(start) => {
                    open.push(XmlElement::from_start(&start)?);
                    continue;
                }
                Event::End(end) => match open.pop() {
                    Some(element) => XmlNode::Element(element),
                    None => {
                        return Err(ManifestXmlError::UnexpectedClose(lossy(
                            end.name().as_ref(),
                        )))
                    }
                },
                Event::Empty(start) => XmlNode::Element(XmlElement::from_start(&start)?),
                Event::Text(text) => XmlNode::Text(text.unescape()?.into_owned()),
                Event::CData(data) => XmlNode::CData(lossy(&data.into_inner())),
                Event::Comment(comment) => XmlNode::Comment(lossy(&comment)),
                Event::PI(pi) => XmlNode::ProcessingInstruction(lossy(&pi)),
                Event::DocType(doctype) => XmlNode::DocType(lossy(&doctype)),
                Event::Decl(decl) => declaration(&decl)?,
                Event::Eof => break,
            };

            match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => nodes.push(node),
            }
        }

        if let Some(element) = open.pop() {
            return Err(ManifestXmlError::Unclosed(element.name));
        }
        if !nodes.iter().any(|node| matches!(node, XmlNode::Element(_))) {
            return Err(ManifestXmlError::NoRootElement);
        }

        Ok(Self { nodes })
    }

    /// Top-level nodes, including the declaration and comments.
    #[must_use]
    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    /// The document element.
    #[must_use]
    pub fn root(&self) -> Option<&XmlElement> {
        self.nodes.iter().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut XmlElement> {
        self.nodes.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Serialize the tree.
    pub fn to_xml_string(&self) -> Result<String, ManifestXmlError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        Ok(lossy(&writer.into_inner()))
    }

    /// Serialize the tree to `path`, replacing the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ManifestXmlError> {
        let path = path.as_ref();
        let xml = self.to_xml_string()?;
        fs::write(path, xml).map_err(|source| ManifestXmlError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn declaration(decl: &BytesDecl<'_>) -> Result<XmlNode, ManifestXmlError> {
    let version = lossy(&decl.version()?);
    let encoding = decl.encoding().transpose()?.map(|e| lossy(&e));
    let standalone = decl.standalone().transpose()?.map(|s| lossy(&s));
    Ok(XmlNode::Declaration {
        version,
        encoding,
        standalone,
    })
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), ManifestXmlError> {
    match node {
        XmlNode::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for (key, value) in &element.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in &element.children {
                    write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        XmlNode::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
        }
        XmlNode::ProcessingInstruction(text) => {
            writer.write_event(Event::PI(BytesText::from_escaped(text.as_str())))?;
        }
        XmlNode::DocType(text) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(text.as_str())))?;
        }
        XmlNode::Declaration {
            version,
            encoding,
            standalone,
        } => writer.write_event(Event::Decl(BytesDecl::new(
            version,
            encoding.as_deref(),
            standalone.as_deref(),
        )))?,
    }
    Ok(())
}
