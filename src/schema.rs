//! Compiled schema documents
//!
//! A [`Schema`] is a parsed document plus the location it was reached at.
//! Sub-schemas returned by [`Schema::resolve_anchor`] share the parsed
//! document and anchor table with their root, so fragment lookups on them
//! stay document-relative.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::checksum::Checksum;
use crate::compiler::Compiler;
use crate::content::DecodedContent;
use crate::error::{Result, SchemaError};
use crate::reference::{is_valid_uri, join_ref, resolve_against, split_ref};

static NULL: Value = Value::Null;

/// Keywords whose values are instance data, not sub-schemas
const DATA_KEYWORDS: [&str; 4] = ["const", "enum", "examples", "default"];

/// A compiled schema document or a location inside one
#[derive(Debug, Clone)]
pub struct Schema {
    /// Self-declared `$id` of the document root
    id: Option<String>,
    /// Canonical URI the document is cached under
    uri: Option<String>,
    document: Arc<Value>,
    /// JSON pointer of this schema within `document`
    pointer: String,
    /// Anchor name to JSON pointer
    anchors: Arc<HashMap<String, String>>,
    /// References found in the document, resolved against its base URI
    refs: Arc<Vec<String>>,
    checksum: Checksum,
}

impl Schema {
    /// Parse a JSON schema document.
    ///
    /// The root must be an object or a boolean.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(data)
            .map_err(|e| SchemaError::compile(format!("invalid JSON: {}", e)))?;

        if !(document.is_object() || document.is_boolean()) {
            return Err(SchemaError::compile(
                "schema root must be an object or a boolean",
            ));
        }

        let id = document
            .get("$id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from);

        Ok(Self {
            id,
            uri: None,
            document: Arc::new(document),
            pointer: String::new(),
            anchors: Arc::default(),
            refs: Arc::default(),
            checksum: Checksum::from_bytes(data),
        })
    }

    /// Self-declared identifier of the document
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Canonical document URI; `None` for anonymous schemas
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub(crate) fn set_uri(&mut self, uri: String) {
        self.uri = Some(uri);
    }

    /// JSON pointer of this schema within its document (empty for the root)
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Full reference to this location, e.g. `https://ex/s.json#/defs/x`
    pub fn location(&self) -> Option<String> {
        self.uri().map(|uri| join_ref(uri, &self.pointer))
    }

    /// The schema value at this location
    pub fn value(&self) -> &Value {
        self.document.pointer(&self.pointer).unwrap_or(&NULL)
    }

    /// The whole parsed document
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Checksum of the bytes the document was compiled from
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// References declared anywhere in the document
    pub fn refs(&self) -> &[String] {
        &self.refs
    }

    /// Named anchors declared anywhere in the document, sorted
    pub fn anchor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.anchors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Initialize the document: index anchors, resolve references against
    /// the base URI, and make sure every other document they point to is
    /// compiled and cached on `compiler`.
    ///
    /// The base URI is this schema's own URI, else the parent's, else the
    /// compiler's default base URI.
    pub fn initialize(&mut self, compiler: &Compiler, parent: Option<&Schema>) -> Result<()> {
        let base = self
            .uri
            .clone()
            .or_else(|| parent.and_then(|p| p.uri.clone()))
            .or_else(|| compiler.default_base_uri());

        let mut anchors = HashMap::new();
        let mut raw_refs = Vec::new();
        let mut pointer = String::new();
        collect(&self.document, &mut pointer, &mut anchors, &mut raw_refs);

        let refs: Vec<String> = raw_refs
            .iter()
            .map(|r| resolve_against(base.as_deref(), r))
            .collect();

        for reference in &refs {
            let (doc, _) = split_ref(reference);
            if doc.is_empty() || Some(doc) == self.uri.as_deref() || Some(doc) == base.as_deref() {
                continue;
            }
            if !is_valid_uri(doc) {
                return Err(SchemaError::InvalidUri(reference.clone()));
            }
            trace!(reference = %reference, "prefetching referenced document");
            compiler.prefetch(reference)?;
        }

        self.anchors = Arc::new(anchors);
        self.refs = Arc::new(refs);
        Ok(())
    }

    /// Resolve a fragment against this schema's document.
    ///
    /// An empty anchor is the document root, an anchor starting with `/` is a
    /// JSON pointer, and anything else is a `$anchor` name.
    pub fn resolve_anchor(&self, anchor: &str) -> Result<Arc<Schema>> {
        let pointer = if anchor.is_empty() || anchor.starts_with('/') {
            anchor
        } else {
            self.anchors
                .get(anchor)
                .map(String::as_str)
                .ok_or_else(|| self.anchor_not_found(anchor))?
        };

        if self.document.pointer(pointer).is_none() {
            return Err(self.anchor_not_found(anchor));
        }

        Ok(Arc::new(Schema {
            id: self.id.clone(),
            uri: self.uri.clone(),
            document: Arc::clone(&self.document),
            pointer: pointer.to_string(),
            anchors: Arc::clone(&self.anchors),
            refs: Arc::clone(&self.refs),
            checksum: self.checksum.clone(),
        }))
    }

    /// `contentEncoding` declared at this location
    pub fn content_encoding(&self) -> Option<&str> {
        self.value().get("contentEncoding").and_then(Value::as_str)
    }

    /// `contentMediaType` declared at this location
    pub fn content_media_type(&self) -> Option<&str> {
        self.value().get("contentMediaType").and_then(Value::as_str)
    }

    /// Decode a string instance according to this location's content keywords
    pub fn decode_content(&self, compiler: &Compiler, text: &str) -> Result<DecodedContent> {
        compiler.decode_content(self.content_encoding(), self.content_media_type(), text)
    }

    fn anchor_not_found(&self, anchor: &str) -> SchemaError {
        SchemaError::AnchorNotFound {
            uri: self.uri.clone().unwrap_or_else(|| "<anonymous>".to_string()),
            anchor: anchor.to_string(),
        }
    }
}

fn collect(
    value: &Value,
    pointer: &mut String,
    anchors: &mut HashMap<String, String>,
    refs: &mut Vec<String>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$anchor" | "$dynamicAnchor", Value::String(name)) => {
                        anchors
                            .entry(name.clone())
                            .or_insert_with(|| pointer.clone());
                    }
                    ("$ref" | "$dynamicRef", Value::String(reference)) => {
                        refs.push(reference.clone());
                    }
                    (key, _) if DATA_KEYWORDS.contains(&key) => {}
                    (key, child) => {
                        let len = pointer.len();
                        pointer.push('/');
                        pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
                        collect(child, pointer, anchors, refs);
                        pointer.truncate(len);
                    }
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&index.to_string());
                collect(item, pointer, anchors, refs);
                pointer.truncate(len);
            }
        }
        _ => {}
    }
}
