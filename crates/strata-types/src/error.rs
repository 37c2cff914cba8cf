use strata_core::{Diagnostic, Span};
use thiserror::Error;

use crate::{ClassId, MethodId};

/// Which recursive walk tripped its guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleKind {
    /// A `replaced_by` chain that never reaches a fixed point.
    Redirect { name: String },
    /// Type-variable substitution nested past its bound.
    TypeParameters { name: String },
    /// A class that (indirectly) extends itself.
    Inheritance { name: String },
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleKind::Redirect { name } => write!(f, "replaced_by chain through {name}"),
            CycleKind::TypeParameters { name } => write!(f, "cycle in type parameters at {name}"),
            CycleKind::Inheritance { name } => write!(f, "cyclic inheritance involving {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("incompatible types: {found} cannot be converted to {expected}")]
    Incompatible { expected: String, found: String },
    #[error("wrong number of type arguments for {ty}; required {expected}, found {found}")]
    MalformedGenericUsage {
        ty: String,
        expected: usize,
        found: usize,
    },
    #[error("cycle detected: {0}")]
    CycleDetected(CycleKind),
    #[error("{name} is an interface and cannot be modified by a later layer")]
    NotModifiable { name: String },
    #[error("unknown class {0:?}")]
    UnknownClass(ClassId),
    #[error("unknown method {0:?}")]
    UnknownMethod(MethodId),
}

impl TypeError {
    /// Stable diagnostic code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::Incompatible { .. } => "incompatible-types",
            TypeError::MalformedGenericUsage { .. } => "malformed-generic",
            TypeError::CycleDetected(_) => "cycle-detected",
            TypeError::NotModifiable { .. } => "not-modifiable",
            TypeError::UnknownClass(_) => "unknown-class",
            TypeError::UnknownMethod(_) => "unknown-method",
        }
    }

    /// Internal defects are reported but are not something the user can fix in the
    /// expression at hand.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            TypeError::CycleDetected(_) | TypeError::UnknownClass(_) | TypeError::UnknownMethod(_)
        )
    }

    pub fn to_diagnostic(&self, span: Option<Span>) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string(), span)
    }
}
