//! Identifiers shared by every layer of the shell.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line number of a snippet. Allocated by the session, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnippetId(pub u64);

impl SnippetId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of snippets one side (compiler or executor) has durably recorded.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Generation(pub u64);

impl Generation {
    pub fn from_len(len: usize) -> Self {
        Generation(len as u64)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Dotted namespace a snippet's declarations live in (`repl`, `geometry.shapes`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Namespace(name.into())
    }

    /// The unnamed root namespace.
    pub fn root() -> Self {
        Namespace(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive the namespace from a runtime type name: everything before the
    /// last `.`, or the root namespace for an unqualified name.
    ///
    /// ```
    /// use tern_core::Namespace;
    /// assert_eq!(Namespace::of_type_name("repl.Line_3").as_str(), "repl");
    /// assert!(Namespace::of_type_name("Line_3").is_root());
    /// ```
    pub fn of_type_name(type_name: &str) -> Self {
        match type_name.rfind('.') {
            Some(idx) => Namespace(type_name[..idx].to_string()),
            None => Namespace::root(),
        }
    }

    /// Qualify a simple name with this namespace.
    pub fn qualify(&self, name: &str) -> String {
        if self.is_root() {
            name.to_string()
        } else {
            format!("{}.{}", self.0, name)
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::new("repl")
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_of_nested_type_name() {
        let ns = Namespace::of_type_name("geometry.shapes.Line_12");
        assert_eq!(ns.as_str(), "geometry.shapes");
        assert_eq!(ns.qualify("Point"), "geometry.shapes.Point");
    }

    #[test]
    fn root_namespace_qualifies_to_bare_name() {
        let ns = Namespace::root();
        assert_eq!(ns.qualify("x"), "x");
        assert_eq!(ns.to_string(), "<root>");
    }

    #[test]
    fn snippet_ids_order_by_line() {
        assert!(SnippetId(3) < SnippetId(10));
        assert_eq!(Generation::from_len(4), Generation(4));
    }
}
