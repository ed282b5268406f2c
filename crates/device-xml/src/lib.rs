//! Load device inventory XML using quick-xml and flatten each device element
//! into a [`DeviceRecord`].

pub mod fields;
mod record;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, trace};

pub use record::DeviceRecord;

#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    /// A device element lacks an attribute the inventory requires.
    #[error("device #{ordinal} <{element}> has no {attribute} attribute")]
    MissingAttribute {
        ordinal: usize,
        element: String,
        attribute: &'static str,
    },
}

impl XmlError {
    /// True when the document itself could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, XmlError::MalformedDocument(_))
    }
}

/// Content of an element in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    Element(RawElement),
    Text(String),
}

/// Read-only element tree produced by [`parse_document`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub nodes: Vec<RawNode>,
}

impl RawElement {
    fn from_start(event: &BytesStart<'_>, position: usize) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(event.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in event.attributes() {
            let attr = attr.map_err(|err| malformed(position, err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| malformed(position, err))?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            nodes: Vec::new(),
        })
    }

    /// Value of the attribute called `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements in document order. Text between them is skipped.
    pub fn children(&self) -> impl Iterator<Item = &RawElement> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            RawNode::Element(element) => Some(element),
            RawNode::Text(_) => None,
        })
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                RawNode::Text(text) => out.push_str(text),
                RawNode::Element(element) => element.collect_text(out),
            }
        }
    }
}

fn malformed(position: usize, err: impl std::fmt::Display) -> XmlError {
    XmlError::MalformedDocument(format!("{err} (at byte {position})"))
}

/// Parse an XML document into its root element.
///
/// Anything that is not well-formed fails with
/// [`XmlError::MalformedDocument`]; no partial tree is returned.
pub fn parse_document(xml: &str) -> Result<RawElement, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<RawElement> = Vec::new();
    let mut root: Option<RawElement> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                ensure_single_root(&root, position)?;
                stack.push(RawElement::from_start(&e, position)?);
            }
            Ok(Event::Empty(e)) => {
                ensure_single_root(&root, position)?;
                let element = RawElement::from_start(&e, position)?;
                attach(element, &mut stack, &mut root);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let element = match stack.pop() {
                    Some(open) if open.name == name => open,
                    Some(open) => {
                        return Err(malformed(
                            position,
                            format!("expected </{}>, found </{name}>", open.name),
                        ))
                    }
                    None => return Err(malformed(position, format!("unexpected </{name}>"))),
                };
                attach(element, &mut stack, &mut root);
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| malformed(position, err))?;
                // Whitespace-only runs are layout between elements.
                if !text.trim().is_empty() {
                    push_text(text.into_owned(), &mut stack, position)?;
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8(e.into_inner().into_owned())
                    .map_err(|err| malformed(position, format!("invalid UTF-8: {err}")))?;
                push_text(text, &mut stack, position)?;
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(malformed(position, err)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            reader.buffer_position(),
            format!("unclosed element <{}>", open.name),
        ));
    }
    let root = root.ok_or_else(|| XmlError::MalformedDocument("no root element".into()))?;
    debug!(root = %root.name, devices = root.children().count(), "parsed device document");
    Ok(root)
}

fn ensure_single_root(root: &Option<RawElement>, position: usize) -> Result<(), XmlError> {
    match root {
        Some(existing) => Err(malformed(
            position,
            format!("content after root element <{}>", existing.name),
        )),
        None => Ok(()),
    }
}

fn attach(element: RawElement, stack: &mut [RawElement], root: &mut Option<RawElement>) {
    match stack.last_mut() {
        Some(parent) => parent.nodes.push(RawNode::Element(element)),
        None => *root = Some(element),
    }
}

fn push_text(text: String, stack: &mut [RawElement], position: usize) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            if !text.is_empty() {
                parent.nodes.push(RawNode::Text(text));
            }
            Ok(())
        }
        None => Err(malformed(position, "text outside of the root element")),
    }
}

/// One device element flattened into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltDevice {
    /// 1-based position of the device element under the root.
    pub ordinal: usize,
    /// Value of the `SrNo` attribute.
    pub serial: String,
    pub record: DeviceRecord,
}

/// Flatten the children of a device element.
///
/// Children of a `CommSetting` container become `CommSetting_<tag>` keys,
/// every other child is stored under its own tag. Values are the child's
/// text content; a repeated tag overwrites the earlier value.
pub fn build_record(device: &RawElement) -> DeviceRecord {
    let mut record = DeviceRecord::new();
    for child in device.children() {
        if child.name == fields::COMM_SETTING {
            for setting in child.children() {
                record.insert(fields::flattened(&child.name, &setting.name), setting.text());
            }
        } else {
            record.insert(child.name.clone(), child.text());
        }
    }
    record
}

/// Lazily walk the device elements under `root` in document order.
pub fn devices(root: &RawElement) -> Devices<'_> {
    Devices {
        nodes: root.nodes.iter(),
        ordinal: 0,
    }
}

/// Iterator returned by [`devices`].
///
/// A device is only built when it is pulled, so a missing `SrNo` on an
/// element the consumer never reaches is never reported.
#[derive(Debug, Clone)]
pub struct Devices<'a> {
    nodes: std::slice::Iter<'a, RawNode>,
    ordinal: usize,
}

impl<'a> Iterator for Devices<'a> {
    type Item = Result<BuiltDevice, XmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.nodes.find_map(|node| match node {
            RawNode::Element(element) => Some(element),
            RawNode::Text(_) => None,
        })?;
        self.ordinal += 1;
        let Some(serial) = element.attribute(fields::SERIAL_ATTR) else {
            return Some(Err(XmlError::MissingAttribute {
                ordinal: self.ordinal,
                element: element.name.clone(),
                attribute: fields::SERIAL_ATTR,
            }));
        };
        let record = build_record(element);
        trace!(ordinal = self.ordinal, serial, fields = record.len(), "built device record");
        Some(Ok(BuiltDevice {
            ordinal: self.ordinal,
            serial: serial.to_string(),
            record,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <Devices>
            <!-- lab inventory -->
            <Device SrNo="A1">
                <Address>10.0.0.1</Address>
                <DevName>Entrance</DevName>
                <ModelName>CX-200</ModelName>
                <Type>Camera</Type>
                <CommSetting>
                    <PortNo>8080</PortNo>
                    <UseSSL>true</UseSSL>
                    <Password>s3cr&amp;t</Password>
                </CommSetting>
                <Firmware>2.1</Firmware>
            </Device>
            <Device SrNo="B2">
                <Address>fe80::1</Address>
                <DevName><![CDATA[Dock <east>]]></DevName>
            </Device>
        </Devices>
    "#;

    fn build_all(xml: &str) -> Result<Vec<BuiltDevice>, XmlError> {
        let root = parse_document(xml)?;
        devices(&root).collect()
    }

    #[test]
    fn flattens_comm_settings() {
        let devices = build_all(FIXTURE).expect("build devices");
        assert_eq!(devices.len(), 2);

        let first = &devices[0];
        assert_eq!(first.ordinal, 1);
        assert_eq!(first.serial, "A1");
        assert_eq!(first.record.get(fields::ADDRESS), Some("10.0.0.1"));
        assert_eq!(first.record.get(fields::COMM_PORT_NO), Some("8080"));
        assert_eq!(first.record.get(fields::COMM_USE_SSL), Some("true"));
        assert_eq!(first.record.get(fields::COMM_PASSWORD), Some("s3cr&t"));
        assert_eq!(first.record.get(fields::COMM_SETTING), None);
        assert_eq!(first.record.get("Firmware"), Some("2.1"));
        assert!(first.record.missing_required().is_empty());

        let second = &devices[1];
        assert_eq!(second.ordinal, 2);
        assert_eq!(second.record.get(fields::DEV_NAME), Some("Dock <east>"));
        assert_eq!(second.record.len(), 2);
    }

    #[test]
    fn repeated_tag_overwrites() {
        let xml = r#"<Devices><D SrNo="1"><Type>a</Type><Type>b</Type></D></Devices>"#;
        let devices = build_all(xml).expect("build devices");
        assert_eq!(devices[0].record.get("Type"), Some("b"));
        assert_eq!(devices[0].record.len(), 1);
    }

    #[test]
    fn inner_text_spans_descendants() {
        let xml = r#"<Devices><D SrNo="1"><Note>a<b>b</b>c</Note></D></Devices>"#;
        let devices = build_all(xml).expect("build devices");
        assert_eq!(devices[0].record.get("Note"), Some("abc"));
    }

    #[test]
    fn inner_text_keeps_spacing() {
        let xml = "<Devices><D SrNo=\"1\">\n  <Note>a <b>b</b> c</Note>\n  <Pad>  x  y </Pad>\n</D></Devices>";
        let devices = build_all(xml).expect("build devices");
        assert_eq!(devices[0].record.get("Note"), Some("a b c"));
        assert_eq!(devices[0].record.get("Pad"), Some("  x  y "));
        assert_eq!(devices[0].record.len(), 2);
    }

    #[test]
    fn whitespace_only_content_is_empty() {
        let xml = "<Devices><D SrNo=\"1\"><Type>   </Type><CommSetting>\n\t</CommSetting></D></Devices>";
        let devices = build_all(xml).expect("build devices");
        assert_eq!(devices[0].record.get("Type"), Some(""));
        assert_eq!(devices[0].record.len(), 1);
    }

    #[test]
    fn missing_serial_is_an_error() {
        let xml = r#"<Devices><D SrNo="1"/><D><Address>1.2.3.4</Address></D></Devices>"#;
        let root = parse_document(xml).expect("parse");
        let mut iter = devices(&root);
        assert!(iter.next().expect("first").is_ok());
        match iter.next().expect("second") {
            Err(XmlError::MissingAttribute {
                ordinal, attribute, ..
            }) => {
                assert_eq!(ordinal, 2);
                assert_eq!(attribute, "SrNo");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(iter.next().is_none());
    }

    #[test]
    fn rejects_malformed_documents() {
        let cases = [
            "<Devices><Device SrNo=\"A1\"><Address>10.0.0.1</Address></Devices>",
            "<Devices><Device SrNo=\"A1\">",
            "",
            "<a/><b/>",
            "stray<a/>",
        ];
        for xml in cases {
            let err = parse_document(xml).unwrap_err();
            assert!(err.is_malformed(), "{xml:?} gave {err}");
        }
    }

    #[test]
    fn empty_root_has_no_devices() {
        let root = parse_document("<Devices/>").expect("parse");
        assert_eq!(devices(&root).count(), 0);
    }
}
