//! Content decoders and media-type unmarshalers
//!
//! A schema node may declare `contentEncoding` (e.g. `base64`) and
//! `contentMediaType` (e.g. `application/json`) for string instances. The
//! registered [`Decoder`] turns the encoded text back into bytes, and the
//! registered [`MediaType`] turns those bytes into a generic value tree.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// Reverses a content encoding
pub trait Decoder: Send + Sync {
    fn decode(&self, encoded: &str) -> Result<Vec<u8>>;
}

impl<F> Decoder for F
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        self(encoded)
    }
}

/// Unmarshals raw bytes of one media type into a generic value
pub trait MediaType: Send + Sync {
    fn unmarshal(&self, data: &[u8]) -> Result<Value>;
}

impl<F> MediaType for F
where
    F: Fn(&[u8]) -> Result<Value> + Send + Sync,
{
    fn unmarshal(&self, data: &[u8]) -> Result<Value> {
        self(data)
    }
}

/// Outcome of decoding embedded content
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedContent {
    /// Decoded and unmarshaled into a value tree
    Value(Value),
    /// Decoded bytes; no media type was declared
    Bytes(Vec<u8>),
    /// No handler is registered for the declared encoding or media type
    Unsupported(String),
}

/// Standard-alphabet, padded base64
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Decoder;

impl Decoder for Base64Decoder {
    fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        STANDARD.decode(encoded).map_err(|e| SchemaError::Decode {
            encoding: "base64".to_string(),
            message: e.to_string(),
        })
    }
}

/// `application/json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMediaType;

impl MediaType for JsonMediaType {
    fn unmarshal(&self, data: &[u8]) -> Result<Value> {
        serde_json::from_slice(data).map_err(|e| unmarshal_error("json", e))
    }
}

/// `application/yaml`
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMediaType;

impl MediaType for YamlMediaType {
    fn unmarshal(&self, data: &[u8]) -> Result<Value> {
        serde_yaml::from_slice(data).map_err(|e| unmarshal_error("yaml", e))
    }
}

/// `application/xml`
///
/// Elements become objects keyed by child element name. Attributes are keyed
/// `@name`, and text mixed with children is keyed `#text`. Leaf elements
/// collapse to their text, and repeated siblings collapse to an array.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlMediaType;

impl MediaType for XmlMediaType {
    fn unmarshal(&self, data: &[u8]) -> Result<Value> {
        xml_to_value(data).map_err(|e| unmarshal_error("xml", e))
    }
}

fn unmarshal_error(format: &str, err: impl ToString) -> SchemaError {
    SchemaError::Unmarshal {
        format: format.to_string(),
        message: err.to_string(),
    }
}

struct OpenElement {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn root() -> Self {
        Self {
            name: String::new(),
            fields: Map::new(),
            text: String::new(),
        }
    }

    fn start(tag: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn finish(self) -> (String, Value) {
        let OpenElement {
            name,
            mut fields,
            text,
        } = self;
        if fields.is_empty() {
            return (name, Value::String(text));
        }
        if !text.is_empty() {
            fields.insert("#text".to_string(), Value::String(text));
        }
        (name, Value::Object(fields))
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

fn xml_to_value(data: &[u8]) -> std::result::Result<Value, String> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut stack = vec![OpenElement::root()];
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Start(tag) => stack.push(OpenElement::start(&tag)?),
            Event::Empty(tag) => {
                let (name, value) = OpenElement::start(&tag)?.finish();
                if let Some(parent) = stack.last_mut() {
                    parent.add_child(name, value);
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err("unexpected closing tag".to_string());
                }
                if let Some(element) = stack.pop() {
                    let (name, value) = element.finish();
                    if let Some(parent) = stack.last_mut() {
                        parent.add_child(name, value);
                    }
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text);
                }
            }
            Event::CData(cdata) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err("unexpected end of document".to_string());
    }
    let root = stack.pop().map(|r| r.fields).unwrap_or_default();
    if root.is_empty() {
        return Err("document has no root element".to_string());
    }
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base64_decoding() {
        let bytes = Base64Decoder.decode("eyJhIjogMX0=").unwrap();
        assert_eq!(bytes, br#"{"a": 1}"#);
    }

    #[test]
    fn test_base64_error_names_encoding() {
        let err = Base64Decoder.decode("not base64!").unwrap_err();
        assert!(err.to_string().starts_with("base64 decode error"));
    }

    #[test]
    fn test_json_unmarshal() {
        let value = JsonMediaType.unmarshal(br#"{"a": [1, 2]}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_json_error_names_format() {
        let err = JsonMediaType.unmarshal(b"{").unwrap_err();
        assert!(err.to_string().starts_with("json unmarshal error"));
    }

    #[test]
    fn test_yaml_unmarshal() {
        let value = YamlMediaType.unmarshal(b"name: test\ntags:\n  - a\n  - b\n").unwrap();
        assert_eq!(value, json!({"name": "test", "tags": ["a", "b"]}));
    }

    #[test]
    fn test_yaml_error_names_format() {
        let err = YamlMediaType.unmarshal(b"a: [1, 2").unwrap_err();
        assert!(err.to_string().starts_with("yaml unmarshal error"));
    }

    #[test]
    fn test_xml_unmarshal() {
        let xml = br#"<order id="7"><item>a</item><item>b</item><note/></order>"#;
        let value = XmlMediaType.unmarshal(xml).unwrap();
        assert_eq!(
            value,
            json!({"order": {"@id": "7", "item": ["a", "b"], "note": ""}})
        );
    }

    #[test]
    fn test_xml_error_names_format() {
        let err = XmlMediaType.unmarshal(b"<a><b></a>").unwrap_err();
        assert!(err.to_string().starts_with("xml unmarshal error"));
    }

    #[test]
    fn test_closure_as_decoder() {
        let upper = |s: &str| -> Result<Vec<u8>> { Ok(s.to_uppercase().into_bytes()) };
        assert_eq!(upper.decode("abc").unwrap(), b"ABC");
    }
}
