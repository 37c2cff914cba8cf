//! Redirect chains left behind by layered modify-declarations.
//!
//! A later layer that modifies a class or method allocates a new node and points the old
//! one at it through `replaced_by`. Every algorithm that holds an id from an earlier
//! layer resolves it through here before reading the body.

use crate::{ClassId, CycleKind, MethodId, TypeEnv, TypeError};

/// Something a later layer can redefine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedefinableUnit {
    Class(ClassId),
    Method(MethodId),
}

/// Follow `replaced_by` until a node without a redirect is reached.
///
/// Fails with [`CycleKind::Redirect`] once the hop count exceeds
/// [`strata_core::EngineLimits::max_redirects`].
pub fn resolve_definition(
    env: &dyn TypeEnv,
    unit: RedefinableUnit,
) -> Result<RedefinableUnit, TypeError> {
    let max = env.limits().max_redirects;
    let mut current = unit;
    let mut hops = 0u32;
    loop {
        let next = match current {
            RedefinableUnit::Class(id) => env.class_redirect(id).map(RedefinableUnit::Class),
            RedefinableUnit::Method(id) => env
                .method(id)
                .ok_or(TypeError::UnknownMethod(id))?
                .replaced_by
                .map(RedefinableUnit::Method),
        };
        let Some(next) = next else {
            return Ok(current);
        };
        hops += 1;
        if hops > max {
            let name = unit_name(env, unit);
            tracing::warn!(%name, hops, "replaced_by chain does not terminate");
            return Err(TypeError::CycleDetected(CycleKind::Redirect { name }));
        }
        current = next;
    }
}

pub fn resolve_class_definition(env: &dyn TypeEnv, id: ClassId) -> Result<ClassId, TypeError> {
    match resolve_definition(env, RedefinableUnit::Class(id))? {
        RedefinableUnit::Class(id) => Ok(id),
        RedefinableUnit::Method(_) => Err(TypeError::UnknownClass(id)),
    }
}

pub fn resolve_method_definition(env: &dyn TypeEnv, id: MethodId) -> Result<MethodId, TypeError> {
    match resolve_definition(env, RedefinableUnit::Method(id))? {
        RedefinableUnit::Method(id) => Ok(id),
        RedefinableUnit::Class(_) => Err(TypeError::UnknownMethod(id)),
    }
}

/// Final definition of `id`, or `id` itself when the chain is broken.
///
/// For boolean queries that cannot surface an error; the failure is logged by
/// [`resolve_definition`].
pub fn canonical_class(env: &dyn TypeEnv, id: ClassId) -> ClassId {
    resolve_class_definition(env, id).unwrap_or(id)
}

fn unit_name(env: &dyn TypeEnv, unit: RedefinableUnit) -> String {
    match unit {
        RedefinableUnit::Class(id) => env
            .class(id)
            .map(|def| def.name.to_string())
            .unwrap_or_else(|| format!("{id:?}")),
        RedefinableUnit::Method(id) => env
            .method(id)
            .map(|def| def.name.to_string())
            .unwrap_or_else(|| format!("{id:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeStore;

    use pretty_assertions::assert_eq;
    use strata_core::{EngineLimits, LayerId};

    #[test]
    fn modification_chain_resolves_to_last_layer() {
        let mut store = TypeStore::with_minimal_runtime();
        let v1 = store.declare_class("app.Widget", LayerId::BASE).finish();
        let v2 = store
            .declare_modification(v1, LayerId::new(1))
            .expect("classes are modifiable")
            .finish();
        let v3 = store
            .declare_modification(v2, LayerId::new(2))
            .expect("classes are modifiable")
            .finish();

        assert_eq!(resolve_class_definition(&store, v1), Ok(v3));
        assert_eq!(resolve_class_definition(&store, v2), Ok(v3));
        assert_eq!(resolve_class_definition(&store, v3), Ok(v3));
    }

    #[test]
    fn cyclic_chain_is_reported() {
        let mut store = TypeStore::with_minimal_runtime();
        let a = store.declare_class("app.A", LayerId::BASE).finish();
        let b = store.declare_class("app.B", LayerId::BASE).finish();
        store.set_class_replaced_by(a, b).expect("class");
        store.set_class_replaced_by(b, a).expect("class");

        let err = resolve_class_definition(&store, a).expect_err("cycle");
        assert!(matches!(
            err,
            TypeError::CycleDetected(CycleKind::Redirect { .. })
        ));
        assert_eq!(canonical_class(&store, a), a);
    }

    #[test]
    fn hop_limit_comes_from_engine_limits() {
        let mut store = TypeStore::with_minimal_runtime();
        store.set_limits(EngineLimits {
            max_redirects: 1,
            ..EngineLimits::default()
        });
        let v1 = store.declare_class("app.W", LayerId::BASE).finish();
        let v2 = store
            .declare_modification(v1, LayerId::new(1))
            .expect("modifiable")
            .finish();
        assert_eq!(resolve_class_definition(&store, v1), Ok(v2));

        store
            .declare_modification(v2, LayerId::new(2))
            .expect("modifiable")
            .finish();
        assert!(resolve_class_definition(&store, v1).is_err());
    }

    #[test]
    fn method_redirects() {
        let mut store = TypeStore::with_minimal_runtime();
        let owner = store.declare_class("app.Svc", LayerId::BASE).finish();
        let old = store.add_method(owner, "run").finish();
        let new = store.add_method(owner, "run").layer(LayerId::new(1)).finish();
        store.set_method_replaced_by(old, new).expect("class method");

        assert_eq!(resolve_method_definition(&store, old), Ok(new));
    }

    #[test]
    fn interfaces_cannot_be_modified() {
        let mut store = TypeStore::with_minimal_runtime();
        let iface = store
            .declare_class("app.Api", LayerId::BASE)
            .kind(crate::ClassKind::Interface)
            .finish();
        let other = store.declare_class("app.Impl", LayerId::BASE).finish();

        assert!(matches!(
            store.declare_modification(iface, LayerId::new(1)),
            Err(TypeError::NotModifiable { .. })
        ));
        assert!(matches!(
            store.set_class_replaced_by(iface, other),
            Err(TypeError::NotModifiable { .. })
        ));
    }
}
