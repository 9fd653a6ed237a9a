//! Owned element tree for KML documents.
//!
//! The tools only touch `<coordinates>` (and occasionally create a `<Point>`),
//! so the document is kept as a generic tree built from `quick-xml` events and
//! serialized back with everything else left as read. Element lookups match on
//! the local name, so `kml:Placemark` and a default-namespace `Placemark` are
//! treated alike.

use crate::domain::model::Placemark;
use crate::utils::error::{EtlError, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    /// Same prefix as `self`, so created children stay in the document's namespace.
    fn qualified(&self, local: &str) -> String {
        match self.name.split_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    /// First matching element below `self`, depth first.
    pub fn descendant(&self, local: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.local_name() == local {
                return Some(el);
            }
            if let Some(found) = el.descendant(local) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendants<'a>(&'a self, local: &str, out: &mut Vec<&'a XmlElement>) {
        for el in self.elements() {
            if el.local_name() == local {
                out.push(el);
            }
            el.descendants(local, out);
        }
    }

    fn descendant_path(&self, local: &str) -> Option<Vec<usize>> {
        for (i, node) in self.children.iter().enumerate() {
            if let XmlNode::Element(el) = node {
                if el.local_name() == local {
                    return Some(vec![i]);
                }
                if let Some(mut path) = el.descendant_path(local) {
                    path.insert(0, i);
                    return Some(path);
                }
            }
        }
        None
    }

    fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self;
        for &i in path {
            current = match current.children.get_mut(i) {
                Some(XmlNode::Element(el)) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Concatenated text and CDATA of the direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) | XmlNode::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text(&mut self, text: &str) {
        self.children
            .retain(|node| !matches!(node, XmlNode::Text(_) | XmlNode::CData(_)));
        self.children.insert(0, XmlNode::Text(text.to_string()));
    }

    pub fn push_child(&mut self, child: XmlElement) -> usize {
        self.children.push(XmlNode::Element(child));
        self.children.len() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlStyle {
    /// Nodes written exactly as read.
    Compact,
    /// Whitespace-only text dropped, one element per line, 2-space indent.
    Pretty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KmlDocument {
    // 虛擬根節點，children 為文件最上層節點
    root: XmlElement,
}

impl KmlDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack = vec![XmlElement::default()];

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let el = element_from_start(&e)?;
                    push_node(&mut stack, XmlNode::Element(el));
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(format_error(format!(
                            "unexpected closing tag at byte {}",
                            reader.buffer_position()
                        )));
                    }
                    if let Some(el) = stack.pop() {
                        push_node(&mut stack, XmlNode::Element(el));
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?.into_owned();
                    push_node(&mut stack, XmlNode::Text(text));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_node(&mut stack, XmlNode::CData(text));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_node(&mut stack, XmlNode::Comment(text));
                }
                Event::Eof => break,
                // 宣告會在輸出時重寫，PI 與 DOCTYPE 不保留
                _ => {}
            }
        }

        if stack.len() != 1 {
            let open = stack.last().map(|el| el.name.clone()).unwrap_or_default();
            return Err(format_error(format!("unclosed element <{}>", open)));
        }

        let root = stack.pop().unwrap_or_default();
        if root.elements().next().is_none() {
            return Err(format_error("document has no root element".to_string()));
        }

        Ok(Self { root })
    }

    fn placemark_paths(&self) -> Vec<Vec<usize>> {
        fn walk(el: &XmlElement, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            for (i, node) in el.children.iter().enumerate() {
                if let XmlNode::Element(child) = node {
                    prefix.push(i);
                    if child.local_name() == "Placemark" {
                        out.push(prefix.clone());
                    }
                    walk(child, prefix, out);
                    prefix.pop();
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// All placemarks at any depth, in document order.
    pub fn placemarks(&self) -> Vec<Placemark> {
        let mut elements = Vec::new();
        self.root.descendants("Placemark", &mut elements);
        elements
            .into_iter()
            .enumerate()
            .map(|(index, el)| placemark_view(index, el))
            .collect()
    }

    fn placemark_mut(&mut self, index: usize) -> Result<&mut XmlElement> {
        let path = self
            .placemark_paths()
            .into_iter()
            .nth(index)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("placemark #{} does not exist", index),
            })?;
        self.root
            .at_path_mut(&path)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("placemark #{} moved while editing", index),
            })
    }

    /// Overwrite the placemark's coordinate text, creating `<Point>` and
    /// `<coordinates>` when they are missing.
    pub fn set_coordinates(&mut self, index: usize, text: &str) -> Result<()> {
        let placemark = self.placemark_mut(index)?;

        if let Some(path) = placemark.descendant_path("coordinates") {
            if let Some(coordinates) = placemark.at_path_mut(&path) {
                coordinates.set_text(text);
                return Ok(());
            }
        }

        let point_index = match placemark
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.local_name() == "Point"))
        {
            Some(i) => i,
            None => {
                let point = XmlElement::new(placemark.qualified("Point"));
                placemark.push_child(point)
            }
        };

        if let Some(XmlNode::Element(point)) = placemark.children.get_mut(point_index) {
            let mut coordinates = XmlElement::new(point.qualified("coordinates"));
            coordinates.set_text(text);
            point.push_child(coordinates);
        }

        Ok(())
    }

    pub fn to_xml(&self, style: XmlStyle) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        match style {
            XmlStyle::Compact => {
                let starts_with_newline = matches!(
                    self.root.children.first(),
                    Some(XmlNode::Text(text)) if text.starts_with('\n') || text.starts_with("\r\n")
                );
                if !starts_with_newline {
                    write_raw(&mut writer, "\n")?;
                }
                for node in &self.root.children {
                    write_node(&mut writer, node, None)?;
                }
            }
            XmlStyle::Pretty => {
                for node in &self.root.children {
                    if is_blank(node) {
                        continue;
                    }
                    write_raw(&mut writer, "\n")?;
                    write_node(&mut writer, node, Some(0))?;
                }
                write_raw(&mut writer, "\n")?;
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| format_error(e.to_string()))
    }
}

fn format_error(message: String) -> EtlError {
    EtlError::FormatError {
        format: "KML".to_string(),
        message,
    }
}

fn push_node(stack: &mut [XmlElement], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn placemark_view(index: usize, el: &XmlElement) -> Placemark {
    let trimmed = |el: &XmlElement| el.text().trim().to_string();

    let mut data_elements = Vec::new();
    el.descendants("Data", &mut data_elements);
    let data = data_elements
        .into_iter()
        .filter_map(|data| {
            let key = data.attribute("name")?;
            let value = data.child("value").map(|v| v.text()).unwrap_or_default();
            Some((key.to_string(), value))
        })
        .collect();

    Placemark {
        index,
        name: el
            .child("name")
            .map(trimmed)
            .filter(|name| !name.is_empty()),
        has_point: el.child("Point").is_some(),
        coordinates: el.descendant("coordinates").map(|c| c.text()),
        address: el
            .child("address")
            .map(trimmed)
            .filter(|address| !address.is_empty()),
        data,
    }
}

fn is_blank(node: &XmlNode) -> bool {
    matches!(node, XmlNode::Text(text) if text.trim().is_empty())
}

fn write_raw<W: std::io::Write>(writer: &mut Writer<W>, raw: &str) -> Result<()> {
    writer.write_event(Event::Text(BytesText::from_escaped(raw)))?;
    Ok(())
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode, depth: Option<usize>) -> Result<()> {
    match node {
        XmlNode::Element(el) => write_element(writer, el, depth)?,
        XmlNode::Text(text) => {
            let text = if depth.is_some() { text.trim() } else { text.as_str() };
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        XmlNode::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
        }
    }
    Ok(())
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    el: &XmlElement,
    depth: Option<usize>,
) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let children: Vec<&XmlNode> = match depth {
        Some(_) => el.children.iter().filter(|node| !is_blank(node)).collect(),
        None => el.children.iter().collect(),
    };

    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    let inline = children
        .iter()
        .all(|node| matches!(node, XmlNode::Text(_) | XmlNode::CData(_)));

    match depth {
        Some(level) if !inline => {
            for child in &children {
                write_raw(writer, &indent(level + 1))?;
                write_node(writer, child, Some(level + 1))?;
            }
            write_raw(writer, &indent(level))?;
        }
        _ => {
            for child in &children {
                write_node(writer, child, depth)?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

fn indent(level: usize) -> String {
    format!("\n{}", "  ".repeat(level))
}
