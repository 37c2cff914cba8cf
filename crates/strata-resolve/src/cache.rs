//! Memoization of hierarchy searches.
//!
//! Entries remember every class their answer was computed from. The layer-merge pipeline
//! must call [`MemberCache::invalidate_class`] after changing a body that may already have
//! been searched; nothing here notices the change by itself.

use std::cell::RefCell;
use std::collections::HashMap;

use strata_core::Name;
use strata_types::ClassId;

use crate::members::{MemberKind, MemberKinds, MemberOrigin};
use crate::AccessContext;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MemberKey {
    pub(crate) class: ClassId,
    pub(crate) name: Name,
    pub(crate) kinds: MemberKinds,
    pub(crate) access: AccessContext,
    pub(crate) skip_interfaces: bool,
}

/// A declaration located by a hierarchy search, before it is viewed through an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Found {
    pub(crate) kind: MemberKind,
    pub(crate) origin: MemberOrigin,
    /// Declaring class.
    pub(crate) class: ClassId,
}

#[derive(Debug)]
struct Entry {
    found: Option<Found>,
    depends_on: Vec<ClassId>,
}

/// `(class, name, kinds) -> member` memo table shared across queries.
#[derive(Debug, Default)]
pub struct MemberCache {
    entries: RefCell<HashMap<MemberKey, Entry>>,
}

impl MemberCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &MemberKey) -> Option<Option<Found>> {
        self.entries.borrow().get(key).map(|entry| entry.found)
    }

    pub(crate) fn insert(&self, key: MemberKey, found: Option<Found>, depends_on: Vec<ClassId>) {
        self.entries
            .borrow_mut()
            .insert(key, Entry { found, depends_on });
    }

    /// Drop every entry whose answer consulted `class`.
    pub fn invalidate_class(&self, class: ClassId) {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, entry| !entry.depends_on.contains(&class));
        tracing::trace!(?class, dropped = before - entries.len(), "member cache invalidated");
    }

    pub fn invalidate_all(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
