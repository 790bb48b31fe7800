//! Schema Resolver
//!
//! A reference resolver and compilation cache for schema documents. Given
//! raw schema text or a URI it produces a compiled, addressable [`Schema`],
//! deduplicated by canonical URI, and resolves `$ref`-style references by
//! fetching, decoding and caching documents on demand.
//!
//! ## Features
//!
//! - **Identity Caching**: The first compilation of a URI wins; later lookups
//!   return the same `Arc<Schema>`
//! - **Anchor Resolution**: `uri#/json/pointer` and `uri#name` are answered from
//!   the cached document without refetching
//! - **Pluggable Loaders**: Documents are fetched by URI scheme (`http`, `https`
//!   by default, `file` or anything custom on request)
//! - **Content Decoding**: `contentEncoding` decoders and `contentMediaType`
//!   unmarshalers are registered per compiler
//!
//! ## Architecture
//!
//! ```text
//! Compiler
//! ├── schema cache     canonical URI -> Arc<Schema>
//! ├── decoders         "base64" -> Decoder
//! ├── media types      "application/json" | "application/xml" | "application/yaml" -> MediaType
//! └── loaders          "http" | "https" -> Loader
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use schema_resolver::Compiler;
//!
//! let compiler = Compiler::new()?;
//! let root = compiler.compile(br#"{"$id": "https://ex/root.json", "type": "object"}"#, None)?;
//! let same = compiler.get_schema("https://ex/root.json")?;
//! assert!(std::sync::Arc::ptr_eq(&root, &same));
//! # Ok::<(), schema_resolver::SchemaError>(())
//! ```

pub mod checksum;
pub mod compiler;
pub mod config;
pub mod content;
pub mod error;
pub mod loader;
pub mod reference;
pub mod registry;
pub mod schema;

pub use checksum::Checksum;
pub use compiler::Compiler;
pub use config::ResolverConfig;
pub use content::{DecodedContent, Decoder, MediaType};
pub use error::{ErrorKind, Result, SchemaError};
pub use loader::{DocumentStream, Loader};
pub use schema::Schema;
