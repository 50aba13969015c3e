//! Cache key codec
//!
//! Cache keys are flat strings of the form `{prefix}{token}_{id}`, where the
//! prefix scopes the whole cache inside the shared substrate, the token names
//! the namespace, and everything after the first separator is the entry id.
//! Ids may themselves contain separators (derived report ids do), so parsing
//! splits at the first one only. Namespace tokens never contain a separator,
//! which keeps the encoding injective.

use sitrep_core::Namespace;

const SEPARATOR: char = '_';

/// Key builder and parser bound to one global prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        KeySpace {
            prefix: prefix.into(),
        }
    }

    /// The global prefix every key of this cache starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full substrate key for an entry.
    pub fn entry_key(&self, namespace: Namespace, id: &str) -> String {
        format!("{}{}{}{}", self.prefix, namespace.token(), SEPARATOR, id)
    }

    /// Prefix shared by every entry of one namespace, for scans.
    pub fn namespace_prefix(&self, namespace: Namespace) -> String {
        format!("{}{}{}", self.prefix, namespace.token(), SEPARATOR)
    }

    /// Split a substrate key into its namespace token and id. Returns None
    /// for keys outside this cache's prefix. Keys without a separator after
    /// the prefix (possible after a raw import) parse as a bare token with
    /// an empty id.
    pub fn parse<'a>(&self, key: &'a str) -> Option<ParsedKey<'a>> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        match rest.split_once(SEPARATOR) {
            Some((token, id)) => Some(ParsedKey { token, id }),
            None => Some(ParsedKey {
                token: rest,
                id: "",
            }),
        }
    }
}

/// Borrowed view of a parsed cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    pub token: &'a str,
    pub id: &'a str,
}

impl ParsedKey<'_> {
    /// The typed namespace, when the token is a known one.
    pub fn namespace(&self) -> Option<Namespace> {
        Namespace::from_token(self.token)
    }
}

// ============================================================================
// TESTS
// ============================================================================
