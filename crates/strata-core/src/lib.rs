//! Core shared types for the Strata type engine.
//!
//! This crate is intentionally small: names, spans, diagnostics, declaration
//! modifiers and the numeric limits every recursive walk in the engine honours.

use std::borrow::Borrow;
use std::fmt;

use smol_str::SmolStr;

/// An interned-ish identifier (simple or dotted name).
///
/// Backed by [`SmolStr`], so short identifiers never allocate and clones are cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(SmolStr);

impl Name {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(SmolStr::new(text.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The last segment of a dotted name (`java.util.List` -> `List`).
    pub fn simple(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((_, simple)) => simple,
            None => self.0.as_str(),
        }
    }

    /// The package prefix of a dotted name, or `""` for the default package.
    pub fn package(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((package, _)) => package,
            None => "",
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}

impl From<&String> for Name {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }
}

/// Identifies a source layer. Layers are totally ordered: a higher id is loaded later
/// and may modify declarations from lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

impl LayerId {
    pub const BASE: LayerId = LayerId(0);

    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Whether a declaration living in `self` can be seen from code in `from`.
    #[inline]
    pub fn is_visible_from(self, from: LayerId) -> bool {
        self <= from
    }
}

bitflags::bitflags! {
    /// Declaration modifiers shared by types, fields and methods.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        /// Interface method with a body.
        const DEFAULT = 1 << 6;
        /// Marked with a bindable annotation: the declaration is the preferred target of
        /// data-binding lookups.
        const BINDABLE = 1 << 7;
        const SYNTHETIC = 1 << 8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessLevel {
    Private,
    Package,
    Protected,
    Public,
}

impl Modifiers {
    pub fn access_level(self) -> AccessLevel {
        if self.contains(Modifiers::PUBLIC) {
            AccessLevel::Public
        } else if self.contains(Modifiers::PROTECTED) {
            AccessLevel::Protected
        } else if self.contains(Modifiers::PRIVATE) {
            AccessLevel::Private
        } else {
            AccessLevel::Package
        }
    }

    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    #[inline]
    pub fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }

    #[inline]
    pub fn is_bindable(self) -> bool {
        self.contains(Modifiers::BINDABLE)
    }
}

/// Bounds for the engine's recursive walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// Maximum number of `replaced_by` hops before a redirect chain is reported as a cycle.
    pub max_redirects: u32,
    /// Maximum nesting of type-variable substitution before it is reported as a cycle.
    pub max_type_param_depth: u32,
    /// Maximum number of supertype edges followed by a single hierarchy walk.
    pub max_supertype_depth: u32,
}

impl EngineLimits {
    pub const DEFAULT_MAX_REDIRECTS: u32 = 64;
    pub const DEFAULT_MAX_TYPE_PARAM_DEPTH: u32 = 16;
    pub const DEFAULT_MAX_SUPERTYPE_DEPTH: u32 = 256;
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_redirects: Self::DEFAULT_MAX_REDIRECTS,
            max_type_param_depth: Self::DEFAULT_MAX_TYPE_PARAM_DEPTH,
            max_supertype_depth: Self::DEFAULT_MAX_SUPERTYPE_DEPTH,
        }
    }
}

/// Policy switches for member lookup and overload resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupPolicy {
    /// In binding mode, a bindable accessor pair wins over a field of the same name.
    pub bindable_accessors: bool,
    /// Interface members are consulted only after the class chain yields no match.
    /// When off, interface methods join the class-chain candidates.
    pub interfaces_after_body: bool,
}

impl Default for LookupPolicy {
    fn default() -> Self {
        Self {
            bindable_accessors: true,
            interfaces_after_body: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn name_splits_package_and_simple_name() {
        let name = Name::from("java.util.List");
        assert_eq!(name.simple(), "List");
        assert_eq!(name.package(), "java.util");

        let bare = Name::from("Foo");
        assert_eq!(bare.simple(), "Foo");
        assert_eq!(bare.package(), "");
    }

    #[test]
    fn access_level_defaults_to_package() {
        assert_eq!(Modifiers::empty().access_level(), AccessLevel::Package);
        assert_eq!(
            (Modifiers::PUBLIC | Modifiers::STATIC).access_level(),
            AccessLevel::Public
        );
        assert_eq!(Modifiers::PRIVATE.access_level(), AccessLevel::Private);
    }

    #[test]
    fn later_layers_see_earlier_ones() {
        let base = LayerId::BASE;
        let app = LayerId::new(2);
        assert!(base.is_visible_from(app));
        assert!(!app.is_visible_from(base));
    }
}
