//! Schema Compiler
//!
//! Compiles schema documents, caches them by canonical URI, and resolves
//! `$ref`-style references by fetching documents through scheme loaders.
//!
//! ## Concurrency
//!
//! `Compiler` is `Send + Sync` and every method takes `&self`. The schema
//! cache and each registry are guarded by their own read-write lock, and no
//! lock is held while a loader, decoder or unmarshaler runs. A URI is
//! published with insert-if-absent, so when two threads compile the same
//! URI at once both get the first published instance back.
//!
//! ## Cache contents
//!
//! Only fully initialized schemas with a valid absolute URI are cached.
//! Anonymous schemas are compiled and returned but never cached. A failed
//! compilation or fetch leaves the cache untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::ResolverConfig;
use crate::content::{
    Base64Decoder, DecodedContent, Decoder, JsonMediaType, MediaType, XmlMediaType, YamlMediaType,
};
use crate::error::{Result, SchemaError};
use crate::loader::{FileLoader, HttpLoader, Loader};
use crate::reference::{canonical_uri, is_valid_uri, resolve_against, split_ref, url_scheme};
use crate::registry::Registry;
use crate::schema::Schema;

/// Compiles and caches schemas, and resolves references between them
pub struct Compiler {
    /// Compiled schemas by canonical URI
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
    /// Content decoders by encoding name
    decoders: Registry<dyn Decoder>,
    /// Unmarshalers by media type
    media_types: Registry<dyn MediaType>,
    /// Document loaders by URI scheme
    loaders: Registry<dyn Loader>,
    /// URIs currently being fetched or initialized
    in_progress: Mutex<HashSet<String>>,
    default_base_uri: RwLock<Option<String>>,
    assert_format: AtomicBool,
}

impl Compiler {
    /// Create a compiler with the default decoders, media types and loaders
    ///
    /// Registers `base64`; `application/json`, `application/xml` and
    /// `application/yaml`; and `http`/`https` sharing one client with a
    /// 10 second timeout.
    pub fn new() -> Result<Self> {
        Self::from_config(&ResolverConfig::default())
    }

    /// Create a compiler with empty registries
    pub fn empty() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            decoders: Registry::new(),
            media_types: Registry::new(),
            loaders: Registry::new(),
            in_progress: Mutex::new(HashSet::new()),
            default_base_uri: RwLock::new(None),
            assert_format: AtomicBool::new(false),
        }
    }

    /// Create a compiler configured from `config`
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let compiler = Self::empty();
        compiler
            .register_decoder("base64", Base64Decoder)
            .register_media_type("application/json", JsonMediaType)
            .register_media_type("application/xml", XmlMediaType)
            .register_media_type("application/yaml", YamlMediaType);

        if config.loaders.http {
            let http: Arc<dyn Loader> = Arc::new(HttpLoader::with_options(
                config.http.timeout(),
                config.http.user_agent.as_deref(),
            )?);
            compiler.loaders.insert("http", Arc::clone(&http));
            compiler.loaders.insert("https", http);
        }
        if config.loaders.file {
            compiler.register_loader("file", FileLoader);
        }

        if let Some(base) = &config.compiler.default_base_uri {
            compiler.set_default_base_uri(base.clone());
        }
        compiler.set_assert_format(config.compiler.assert_format);

        Ok(compiler)
    }

    /// Compile a schema document.
    ///
    /// The document's `$id` names it; `uri_hint` is used when it has none.
    /// A relative `$id` is resolved against the hint, else the default base
    /// URI. If the resulting URI is already cached the cached schema is
    /// returned and the new bytes are ignored: the first compilation for a
    /// URI wins.
    pub fn compile(&self, data: &[u8], uri_hint: Option<&str>) -> Result<Arc<Schema>> {
        let mut schema = Schema::parse(data)?;

        let hint = uri_hint
            .map(|hint| self.absolutize(hint))
            .filter(|hint| is_valid_uri(hint));
        let base = hint.clone().or_else(|| self.default_base_uri());
        let uri = match schema.id() {
            Some(id) => Some(resolve_against(base.as_deref(), id)),
            None => hint,
        }
        .map(|uri| split_ref(&uri).0.to_string())
        .filter(|uri| is_valid_uri(uri));

        let Some(uri) = uri else {
            debug!("compiling anonymous schema");
            schema.initialize(self, None)?;
            return Ok(Arc::new(schema));
        };

        if let Some(existing) = self.cached(&uri) {
            if !existing.checksum().verify(data) {
                warn!(
                    uri = %uri,
                    cached = existing.checksum().as_str(),
                    "ignoring different content for an already compiled schema"
                );
            }
            debug!(uri = %uri, "schema cache hit");
            return Ok(existing);
        }

        schema.set_uri(uri.clone());
        {
            let _guard = InProgress::enter(&self.in_progress, &uri);
            schema.initialize(self, None)?;
        }

        Ok(self.publish(uri, Arc::new(schema)))
    }

    /// Resolve a reference to a schema.
    ///
    /// A cached document is answered without fetching, delegating any anchor
    /// to the cached schema. Otherwise the document is fetched through the
    /// loader for its scheme.
    pub fn get_schema(&self, reference: &str) -> Result<Arc<Schema>> {
        let reference = self.absolutize(reference);
        let (base, anchor) = split_ref(&reference);

        if let Some(schema) = self.cached(base) {
            debug!(reference = %reference, "schema cache hit");
            if base == reference || anchor.is_empty() {
                return Ok(schema);
            }
            return schema.resolve_anchor(anchor);
        }

        self.resolve_schema_url(&reference)
    }

    /// Fetch, compile and cache the document `url` points to, then resolve
    /// its anchor.
    fn resolve_schema_url(&self, url: &str) -> Result<Arc<Schema>> {
        let (base, anchor) = split_ref(url);
        if let Some(schema) = self.cached(base) {
            return with_anchor(schema, anchor);
        }

        let scheme = url_scheme(base).ok_or_else(|| SchemaError::InvalidUri(url.to_string()))?;
        let loader = self
            .loaders
            .get(&scheme)
            .ok_or_else(|| SchemaError::NoLoader {
                scheme: scheme.clone(),
            })?;

        debug!(url = %base, scheme = %scheme, "fetching schema document");
        let _guard = InProgress::enter(&self.in_progress, base);
        let data = {
            let mut body = loader.load(base)?;
            let mut data = Vec::new();
            body.read_to_end(&mut data).map_err(|source| SchemaError::Read {
                url: base.to_string(),
                source,
            })?;
            data
        };

        let schema = self.compile(&data, Some(base))?;
        if schema.uri().is_some_and(|uri| uri != base) {
            // Document declared a different $id; remember where it came from too.
            self.publish(base.to_string(), Arc::clone(&schema));
        }

        with_anchor(schema, anchor)
    }

    /// Make sure the document `reference` points to is compiled.
    ///
    /// Documents currently being initialized are skipped, which is what
    /// terminates reference cycles.
    pub(crate) fn prefetch(&self, reference: &str) -> Result<()> {
        let (base, _) = split_ref(reference);
        if self.in_progress.lock().contains(base) {
            trace!(uri = %base, "skipping prefetch of document in progress");
            return Ok(());
        }
        self.get_schema(reference).map(|_| ())
    }

    /// Associate `schema` with `uri`, replacing any cached entry
    pub fn set_schema(&self, uri: &str, schema: Arc<Schema>) -> &Self {
        let key = canonical_uri(split_ref(uri).0);
        trace!(uri = %key, "setting schema");
        self.schemas.write().insert(key, schema);
        self
    }

    /// Register the decoder for a content encoding
    pub fn register_decoder(&self, encoding: &str, decoder: impl Decoder + 'static) -> &Self {
        trace!(encoding, "registering decoder");
        self.decoders.insert(encoding, Arc::new(decoder));
        self
    }

    /// Register the unmarshaler for a media type
    pub fn register_media_type(&self, media_type: &str, unmarshaler: impl MediaType + 'static) -> &Self {
        trace!(media_type, "registering media type");
        self.media_types.insert(media_type, Arc::new(unmarshaler));
        self
    }

    /// Remove the loader for a URI scheme, returning whether one was registered
    pub fn unregister_loader(&self, scheme: &str) -> bool {
        self.loaders.remove(&scheme.to_ascii_lowercase()).is_some()
    }

    /// Whether a loader is registered for a URI scheme
    pub fn has_loader(&self, scheme: &str) -> bool {
        self.loaders.contains(&scheme.to_ascii_lowercase())
    }

    /// Register the loader for a URI scheme. Schemes are case-insensitive.
    pub fn register_loader(&self, scheme: &str, loader: impl Loader + 'static) -> &Self {
        let scheme = scheme.to_ascii_lowercase();
        trace!(scheme = %scheme, "registering loader");
        self.loaders.insert(scheme, Arc::new(loader));
        self
    }

    /// Set the base URI relative references are resolved against
    pub fn set_default_base_uri(&self, base_uri: impl Into<String>) -> &Self {
        *self.default_base_uri.write() = Some(base_uri.into());
        self
    }

    /// Base URI relative references are resolved against
    pub fn default_base_uri(&self) -> Option<String> {
        self.default_base_uri.read().clone()
    }

    /// Enable or disable `format` assertion
    pub fn set_assert_format(&self, assert: bool) -> &Self {
        self.assert_format.store(assert, Ordering::Relaxed);
        self
    }

    /// Whether `format` is asserted
    pub fn assert_format(&self) -> bool {
        self.assert_format.load(Ordering::Relaxed)
    }

    /// Decode embedded content with the registered decoder and unmarshaler.
    ///
    /// Media type parameters (`; charset=...`) are ignored. An encoding or
    /// media type with no registered handler yields
    /// [`DecodedContent::Unsupported`] instead of an error.
    pub fn decode_content(
        &self,
        encoding: Option<&str>,
        media_type: Option<&str>,
        text: &str,
    ) -> Result<DecodedContent> {
        let bytes = match encoding {
            Some(encoding) => match self.decoders.get(encoding) {
                Some(decoder) => decoder.decode(text)?,
                None => {
                    return Ok(DecodedContent::Unsupported(format!(
                        "content encoding {}",
                        encoding
                    )))
                }
            },
            None => text.as_bytes().to_vec(),
        };

        let Some(media_type) = media_type else {
            return Ok(DecodedContent::Bytes(bytes));
        };
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        match self.media_types.get(essence) {
            Some(unmarshaler) => Ok(DecodedContent::Value(unmarshaler.unmarshal(&bytes)?)),
            None => Ok(DecodedContent::Unsupported(format!("media type {}", essence))),
        }
    }

    /// Whether a schema is cached under `uri`
    pub fn has_schema(&self, uri: &str) -> bool {
        self.cached(&canonical_uri(uri)).is_some()
    }

    /// All cached URIs, sorted
    pub fn cached_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.schemas.read().keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Registered content encodings
    pub fn decoder_names(&self) -> Vec<String> {
        self.decoders.keys()
    }

    /// Registered media types
    pub fn media_type_names(&self) -> Vec<String> {
        self.media_types.keys()
    }

    /// Registered loader schemes
    pub fn loader_schemes(&self) -> Vec<String> {
        self.loaders.keys()
    }

    fn cached(&self, uri: &str) -> Option<Arc<Schema>> {
        self.schemas.read().get(uri).cloned()
    }

    /// Publish a compiled schema, keeping whichever instance got there first
    fn publish(&self, uri: String, schema: Arc<Schema>) -> Arc<Schema> {
        debug!(uri = %uri, "publishing compiled schema");
        Arc::clone(self.schemas.write().entry(uri).or_insert(schema))
    }

    fn absolutize(&self, reference: &str) -> String {
        resolve_against(self.default_base_uri.read().as_deref(), reference)
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("schemas", &self.cached_uris())
            .field("decoders", &self.decoder_names())
            .field("media_types", &self.media_type_names())
            .field("loaders", &self.loader_schemes())
            .field("default_base_uri", &self.default_base_uri())
            .field("assert_format", &self.assert_format())
            .finish()
    }
}

fn with_anchor(schema: Arc<Schema>, anchor: &str) -> Result<Arc<Schema>> {
    if anchor.is_empty() {
        Ok(schema)
    } else {
        schema.resolve_anchor(anchor)
    }
}

/// Marks a URI as being fetched or initialized until dropped.
///
/// Only the outermost guard for a URI removes the mark.
struct InProgress<'a> {
    set: &'a Mutex<HashSet<String>>,
    uri: Option<String>,
}

impl<'a> InProgress<'a> {
    fn enter(set: &'a Mutex<HashSet<String>>, uri: &str) -> Self {
        let inserted = set.lock().insert(uri.to_string());
        Self {
            set,
            uri: inserted.then(|| uri.to_string()),
        }
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        if let Some(uri) = self.uri.take() {
            self.set.lock().remove(&uri);
        }
    }
}
