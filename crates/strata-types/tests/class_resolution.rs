use pretty_assertions::assert_eq;
use strata_core::LayerId;
use strata_types::{
    is_subclass, resolve_class_definition, CycleKind, ResolutionState, TypeEnv, TypeError,
    TypeRef, TypeStore,
};

#[test]
fn self_inheritance_is_reported_and_cached() {
    let mut store = TypeStore::with_minimal_runtime();
    let a = store.intern_class_id("app.A");
    let b = store
        .declare_class("app.B", LayerId::BASE)
        .extends(TypeRef::Declared(a))
        .finish();
    store
        .declare_class("app.A", LayerId::BASE)
        .extends(TypeRef::Declared(b))
        .finish();

    let err = store.resolve_class(a).expect_err("A extends B extends A");
    assert!(matches!(
        err,
        TypeError::CycleDetected(CycleKind::Inheritance { .. })
    ));
    assert!(matches!(
        store.resolution_state(a),
        Some(ResolutionState::Failed(_))
    ));
    assert_eq!(store.resolve_class(a).expect_err("cached"), err);
    assert!(!is_subclass(&store, a, b));
}

#[test]
fn wrong_type_argument_count_in_supertype_clause() {
    let mut store = TypeStore::with_minimal_runtime();
    let wk = store.well_known().clone();
    let string = store.string_type();
    let bad_super = TypeRef::Parameterized(strata_types::ParameterizedType {
        base: wk.array_list,
        args: vec![string.clone(), string.clone()],
    });
    let bad = store
        .declare_class("app.Bad", LayerId::BASE)
        .extends(bad_super)
        .finish();

    assert_eq!(
        store.resolve_class(bad).expect_err("two args for ArrayList<E>"),
        TypeError::MalformedGenericUsage {
            ty: "java.util.ArrayList".to_string(),
            expected: 1,
            found: 2,
        }
    );
    assert!(matches!(
        store.parameterized(wk.array_list, vec![string.clone(), string]),
        Err(TypeError::MalformedGenericUsage { .. })
    ));
}

#[test]
fn ancestors_follow_layer_redirects() {
    let mut store = TypeStore::with_minimal_runtime();
    let object = store.object_type();
    let base_v1 = store.declare_class("app.Base", LayerId::BASE).finish();
    let derived = store
        .declare_class("app.Derived", LayerId::BASE)
        .extends(TypeRef::Declared(base_v1))
        .finish();
    let base_v2 = store
        .declare_modification(base_v1, LayerId::new(1))
        .unwrap()
        .extends(object)
        .finish();

    let resolved = store.resolve_class(derived).unwrap();
    assert_eq!(
        resolved.superclasses,
        vec![base_v2, store.well_known().object]
    );
    assert!(is_subclass(&store, derived, base_v1));
}

#[test]
fn modification_that_extends_its_own_predecessor_is_a_cycle() {
    let mut store = TypeStore::with_minimal_runtime();
    let v1 = store.declare_class("app.Widget", LayerId::BASE).finish();
    let v2 = store
        .declare_modification(v1, LayerId::new(1))
        .unwrap()
        .extends(TypeRef::Declared(v1))
        .finish();

    assert_eq!(resolve_class_definition(&store, v1), Ok(v2));
    assert!(matches!(
        store.resolve_class(v2),
        Err(TypeError::CycleDetected(CycleKind::Inheritance { .. }))
    ));
}

#[test]
fn invalidation_after_body_replacement() {
    let mut store = TypeStore::with_minimal_runtime();
    let wk = store.well_known().clone();
    let item = store.declare_class("app.Item", LayerId::BASE).finish();
    assert!(!is_subclass(&store, item, wk.serializable));

    store
        .class_mut(item)
        .unwrap()
        .interfaces
        .push(TypeRef::Reflected(wk.serializable));
    assert!(is_subclass(&store, item, wk.serializable));
}
