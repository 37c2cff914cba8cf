//! Lexical scopes of a body: blocks nested in a method nested in (possibly nested) classes.
//!
//! The scope tree only records what each scope declares. Walking it outward (block,
//! enclosing blocks, method parameters, class body, enclosing class) is what gives
//! member lookup its search order.

use std::collections::HashMap;

use strata_core::Name;
use strata_types::{ClassId, MethodId, TypeEnv, TypeRef};

/// Identifier for a scope, an index into [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    #[must_use]
    pub const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// The body of a class; lookups continue into its members and supertypes.
    Class(ClassId),
    /// A method or constructor; its parameters live here.
    Method(MethodId),
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEntry {
    Local(TypeRef),
    Param { index: usize, ty: TypeRef },
}

impl ScopeEntry {
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        match self {
            ScopeEntry::Local(ty) | ScopeEntry::Param { ty, .. } => ty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeData {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    entries: HashMap<Name, ScopeEntry>,
}

impl ScopeData {
    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    #[must_use]
    pub fn entries(&self) -> &HashMap<Name, ScopeEntry> {
        &self.entries
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            parent,
            kind,
            entries: HashMap::new(),
        });
        id
    }

    /// A class body. `parent` is the scope the class is declared in (`None` for top level).
    pub fn add_class_scope(&mut self, parent: Option<ScopeId>, class: ClassId) -> ScopeId {
        self.push(parent, ScopeKind::Class(class))
    }

    /// A method scope with its parameters declared under `param_names`.
    ///
    /// Parameter types come from the method definition; extra names are ignored.
    pub fn add_method_scope(
        &mut self,
        env: &dyn TypeEnv,
        parent: ScopeId,
        method: MethodId,
        param_names: &[&str],
    ) -> ScopeId {
        let scope = self.push(Some(parent), ScopeKind::Method(method));
        if let Some(def) = env.method(method) {
            for (name, param) in param_names.iter().zip(&def.params) {
                self.declare_param(scope, name, param.ty.clone());
            }
        }
        scope
    }

    pub fn add_block_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Some(parent), ScopeKind::Block)
    }

    /// Declare a local. A later declaration of the same name in the same scope wins.
    pub fn declare_local(&mut self, scope: ScopeId, name: &str, ty: TypeRef) {
        if let Some(data) = self.scopes.get_mut(scope.idx()) {
            data.entries.insert(Name::from(name), ScopeEntry::Local(ty));
        }
    }

    pub fn declare_param(&mut self, scope: ScopeId, name: &str, ty: TypeRef) {
        if let Some(data) = self.scopes.get_mut(scope.idx()) {
            let index = data
                .entries
                .values()
                .filter(|entry| matches!(entry, ScopeEntry::Param { .. }))
                .count();
            data.entries
                .insert(Name::from(name), ScopeEntry::Param { index, ty });
        }
    }

    #[must_use]
    pub fn scope_data(&self, scope: ScopeId) -> Option<&ScopeData> {
        self.scopes.get(scope.idx())
    }

    /// `scope` followed by each of its ancestors, innermost first.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = (ScopeId, &ScopeData)> + '_ {
        let mut current = Some(scope);
        std::iter::from_fn(move || {
            let id = current?;
            let data = self.scopes.get(id.idx())?;
            current = data.parent;
            Some((id, data))
        })
    }

    /// The innermost class whose body contains `scope`.
    #[must_use]
    pub fn enclosing_class(&self, scope: ScopeId) -> Option<ClassId> {
        self.ancestors(scope).find_map(|(_, data)| match data.kind {
            ScopeKind::Class(class) => Some(class),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use strata_core::LayerId;
    use strata_types::TypeStore;

    #[test]
    fn scopes_walk_outward_and_params_are_numbered() {
        let mut store = TypeStore::with_minimal_runtime();
        let class = store.declare_class("app.Main", LayerId::BASE).finish();
        let string = store.string_type();
        let run = store
            .add_method(class, "run")
            .param(TypeRef::INT)
            .param(string.clone())
            .finish();

        let mut scopes = ScopeTree::new();
        let class_scope = scopes.add_class_scope(None, class);
        let method_scope = scopes.add_method_scope(&store, class_scope, run, &["count", "label"]);
        let block = scopes.add_block_scope(method_scope);
        scopes.declare_local(block, "tmp", TypeRef::LONG);

        let chain: Vec<ScopeKind> = scopes.ancestors(block).map(|(_, d)| d.kind()).collect();
        assert_eq!(
            chain,
            vec![ScopeKind::Block, ScopeKind::Method(run), ScopeKind::Class(class)]
        );
        assert_eq!(scopes.enclosing_class(block), Some(class));

        let params = scopes.scope_data(method_scope).unwrap().entries();
        assert_eq!(
            params.get("label"),
            Some(&ScopeEntry::Param {
                index: 1,
                ty: string
            })
        );
        assert_eq!(
            scopes.scope_data(block).unwrap().entries().get("tmp").map(ScopeEntry::ty),
            Some(&TypeRef::LONG)
        );
    }
}
