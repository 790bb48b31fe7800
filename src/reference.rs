//! URI reference handling
//!
//! A reference is a URI optionally followed by `#` and an anchor. The part
//! before the first `#` identifies the document, the rest addresses a
//! location inside it (a JSON pointer such as `/defs/x` or a named anchor).

use url::Url;

/// Fragment delimiter between a document URI and its anchor
pub const FRAGMENT_DELIMITER: char = '#';

/// Split a reference into its document URI and anchor.
///
/// Splits on the first `#` only, so anchors may themselves contain `#`.
/// A reference without a fragment yields an empty anchor.
pub fn split_ref(reference: &str) -> (&str, &str) {
    match reference.split_once(FRAGMENT_DELIMITER) {
        Some((base, anchor)) => (base, anchor),
        None => (reference, ""),
    }
}

/// Rejoin a document URI and anchor produced by [`split_ref`].
///
/// An empty anchor addresses the document root, so it is dropped.
pub fn join_ref(base: &str, anchor: &str) -> String {
    if anchor.is_empty() {
        base.to_string()
    } else {
        format!("{}{}{}", base, FRAGMENT_DELIMITER, anchor)
    }
}

/// Scheme of an absolute URI, lowercased
pub fn url_scheme(uri: &str) -> Option<String> {
    Url::parse(uri).ok().map(|u| u.scheme().to_string())
}

/// Whether `uri` is an absolute URI usable as a cache key
pub fn is_valid_uri(uri: &str) -> bool {
    Url::parse(uri).is_ok()
}

/// Normalized form of a document URI.
///
/// Absolute URIs are parsed and re-serialized (lowercased scheme and host,
/// empty fragment dropped). Anything unparseable is returned untouched.
pub fn canonical_uri(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut parsed) => {
            if parsed.fragment() == Some("") {
                parsed.set_fragment(None);
            }
            parsed.to_string()
        }
        Err(_) => uri.to_string(),
    }
}

/// Resolve `reference` against an optional base URI.
///
/// Absolute references are canonicalized and returned; relative ones are
/// joined onto `base` when it parses. Without a usable base the reference
/// is returned as given.
pub fn resolve_against(base: Option<&str>, reference: &str) -> String {
    let (doc, anchor) = split_ref(reference);
    if is_valid_uri(doc) {
        return join_ref(&canonical_uri(doc), anchor);
    }

    match base.map(Url::parse) {
        Some(Ok(base)) => match base.join(reference) {
            Ok(joined) => {
                let joined = joined.to_string();
                let (doc, anchor) = split_ref(&joined);
                join_ref(doc, anchor)
            }
            Err(_) => reference.to_string(),
        },
        _ => reference.to_string(),
    }
}
