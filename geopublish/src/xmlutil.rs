//! XML to JSON-value conversion and back.
//!
//! The tile-cache endpoints speak XML while the rest of the engine (and
//! every envelope result) is JSON, so tile-cache layer descriptors are
//! converted both ways: `xml_to_value` when merging a descriptor into a
//! layer result, `value_to_xml` when a caller hands back an updated
//! `tile_caching` block.
//!
//! Mapping rules:
//! - element attributes merge into the element's object as plain keys;
//! - repeated child tags become an array;
//! - an element with no attributes and no children becomes its text
//!   (possibly the empty string);
//! - mixed content keeps its text under a `"_text"` key;
//! - building XML inverts the same rules (`"_text"` writes text, arrays
//!   write sibling elements).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from XML conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(String),

    #[error("XML document has no root element")]
    NoRoot,

    #[error("expected a single-key object for the document root")]
    InvalidRoot,
}

/// One element being assembled during parsing.
struct Frame {
    tag: String,
    map: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(tag: String, map: Map<String, Value>) -> Self {
        Frame {
            tag,
            map,
            text: String::new(),
        }
    }

    /// Collapse the finished element into a value.
    fn into_value(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        if self.map.is_empty() {
            (self.tag, Value::String(text))
        } else {
            let mut map = self.map;
            if !text.is_empty() {
                map.insert("_text".to_string(), Value::String(text));
            }
            (self.tag, Value::Object(map))
        }
    }
}

/// Insert a child value, promoting duplicate tags to an array.
fn insert_child(map: &mut Map<String, Value>, tag: String, value: Value) {
    match map.get_mut(&tag) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(tag, value);
        }
    }
}

fn start_frame(element: &BytesStart<'_>) -> Result<Frame, XmlError> {
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut map = Map::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        map.insert(key, Value::String(value));
    }
    Ok(Frame::new(tag, map))
}

/// Parse an XML document into `{root_tag: value}`.
pub fn xml_to_value(xml: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => stack.push(start_frame(&element)?),
            Ok(Event::Empty(element)) => {
                let frame = start_frame(&element)?;
                let (tag, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.map, tag, value),
                    None => root = Some((tag, value)),
                }
            }
            Ok(Event::End(_)) => {
                let frame = stack.pop().ok_or_else(|| {
                    XmlError::Parse("closing tag without matching open".to_string())
                })?;
                let (tag, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.map, tag, value),
                    None => root = Some((tag, value)),
                }
            }
            Ok(Event::Text(text)) => {
                if let Some(frame) = stack.last_mut() {
                    let chunk = text
                        .unescape()
                        .map_err(|e| XmlError::Parse(e.to_string()))?;
                    frame.text.push_str(&chunk);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(frame) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(data.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlError::Parse(e.to_string())),
        }
    }

    let (tag, value) = root.ok_or(XmlError::NoRoot)?;
    let mut document = Map::new();
    document.insert(tag, value);
    Ok(Value::Object(document))
}

/// Render `{root_tag: value}` as an XML document string.
pub fn value_to_xml(document: &Value) -> Result<String, XmlError> {
    let root = document
        .as_object()
        .filter(|map| map.len() == 1)
        .ok_or(XmlError::InvalidRoot)?;
    let (tag, content) = root.iter().next().expect("single-key object");

    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, tag, content)?;
    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Parse(e.to_string()))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    value: &Value,
) -> Result<(), XmlError> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, tag, item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(|e| XmlError::Parse(e.to_string()))?;
            for (key, child) in map {
                if key == "_text" {
                    write_text(writer, child)?;
                } else {
                    write_element(writer, key, child)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(|e| XmlError::Parse(e.to_string()))
        }
        scalar => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(|e| XmlError::Parse(e.to_string()))?;
            write_text(writer, scalar)?;
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(|e| XmlError::Parse(e.to_string()))
        }
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, value: &Value) -> Result<(), XmlError> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .map_err(|e| XmlError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_only_element_becomes_string() {
        let value = xml_to_value("<name>roads</name>").unwrap();
        assert_eq!(value, json!({"name": "roads"}));
    }

    #[test]
    fn test_nested_elements_become_objects() {
        let value = xml_to_value("<layer><name>roads</name><enabled>true</enabled></layer>")
            .unwrap();
        assert_eq!(
            value,
            json!({"layer": {"name": "roads", "enabled": "true"}})
        );
    }

    #[test]
    fn test_repeated_tags_become_array() {
        let value = xml_to_value(
            "<mimeFormats><string>image/png</string><string>image/jpeg</string></mimeFormats>",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"mimeFormats": {"string": ["image/png", "image/jpeg"]}})
        );
    }

    #[test]
    fn test_three_repeated_tags_extend_array() {
        let value = xml_to_value("<l><s>a</s><s>b</s><s>c</s></l>").unwrap();
        assert_eq!(value, json!({"l": {"s": ["a", "b", "c"]}}));
    }

    #[test]
    fn test_attributes_merge_into_object() {
        let value = xml_to_value(r#"<entry key="host">localhost</entry>"#).unwrap();
        assert_eq!(
            value,
            json!({"entry": {"key": "host", "_text": "localhost"}})
        );
    }

    #[test]
    fn test_empty_element_becomes_empty_string() {
        assert_eq!(xml_to_value("<metadata/>").unwrap(), json!({"metadata": ""}));
        assert_eq!(
            xml_to_value("<metadata></metadata>").unwrap(),
            json!({"metadata": ""})
        );
    }

    #[test]
    fn test_escaped_entities_unescape() {
        let value = xml_to_value("<sql>SELECT a FROM t WHERE a &lt; 5 &amp;&amp; b &gt; 1</sql>")
            .unwrap();
        assert_eq!(value, json!({"sql": "SELECT a FROM t WHERE a < 5 && b > 1"}));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(xml_to_value("<a><b></a>").is_err());
        assert_eq!(xml_to_value(""), Err(XmlError::NoRoot));
    }

    #[test]
    fn test_value_to_xml_simple_document() {
        let xml = value_to_xml(&json!({"layerName": "ws:roads"})).unwrap();
        assert_eq!(xml, "<layerName>ws:roads</layerName>");
    }

    #[test]
    fn test_value_to_xml_escapes_text() {
        let xml = value_to_xml(&json!({"sql": "a < b & c"})).unwrap();
        assert_eq!(xml, "<sql>a &lt; b &amp; c</sql>");
    }

    #[test]
    fn test_value_to_xml_arrays_repeat_tags() {
        let xml = value_to_xml(&json!({"formats": {"string": ["png", "jpeg"]}})).unwrap();
        assert_eq!(
            xml,
            "<formats><string>png</string><string>jpeg</string></formats>"
        );
    }

    #[test]
    fn test_value_to_xml_rejects_multi_key_root() {
        let result = value_to_xml(&json!({"a": 1, "b": 2}));
        assert_eq!(result, Err(XmlError::InvalidRoot));
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let original = json!({
            "GeoServerLayer": {
                "enabled": "true",
                "name": "ws:roads",
                "mimeFormats": {"string": ["image/png", "image/jpeg"]},
                "metaWidthHeight": {"int": ["4", "4"]}
            }
        });
        let xml = value_to_xml(&original).unwrap();
        let parsed = xml_to_value(&xml).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_numbers_render_as_text() {
        let xml = value_to_xml(&json!({"zoomStart": 10})).unwrap();
        assert_eq!(xml, "<zoomStart>10</zoomStart>");
    }
}
