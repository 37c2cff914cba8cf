use pretty_assertions::assert_eq;
use strata_core::{LayerId, LookupPolicy, Modifiers};
use strata_resolve::{
    AccessContext, MemberCache, MemberKind, MemberKinds, MemberOrigin, PropertyTarget, Resolver,
    ScopeTree,
};
use strata_types::{
    ClassKind, CycleKind, TypeEnv, TypeError, TypeParamContext, TypeRef, TypeStore,
};

fn outside() -> AccessContext {
    AccessContext::outside(LayerId::BASE)
}

/// `Base` declares bindable `getX`/`setX`; `Sub extends Base` declares field `x`.
fn property_fixture() -> (TypeStore, strata_types::ClassId) {
    let mut store = TypeStore::with_minimal_runtime();
    let bindable = Modifiers::PUBLIC | Modifiers::BINDABLE;
    let base = store.declare_class("app.Base", LayerId::BASE).finish();
    store
        .add_method(base, "getX")
        .returns(TypeRef::INT)
        .modifiers(bindable)
        .finish();
    store
        .add_method(base, "setX")
        .param(TypeRef::INT)
        .modifiers(bindable)
        .finish();
    let sub = store
        .declare_class("app.Sub", LayerId::BASE)
        .extends(TypeRef::Declared(base))
        .finish();
    store.add_field(sub, "x", TypeRef::INT, Modifiers::PUBLIC);
    (store, sub)
}

#[test]
fn binding_lookup_prefers_inherited_bindable_accessors() {
    let (store, sub) = property_fixture();
    let resolver = Resolver::new(&store);
    let owner = store.class_type(sub);
    let ctx = TypeParamContext::new();

    let bound = resolver
        .find_member_in_type(
            &owner,
            "x",
            MemberKinds::READ | MemberKinds::BINDING,
            &outside(),
            &ctx,
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(bound.kind, MemberKind::GetAccessor);
    assert_eq!(bound.name.as_str(), "getX");
    assert!(bound.is_bindable());

    let plain = resolver
        .find_member_in_type(&owner, "x", MemberKinds::READ, &outside(), &ctx, false)
        .unwrap()
        .unwrap();
    assert_eq!(plain.kind, MemberKind::Field);
    assert_eq!(plain.declared_type(&store).unwrap(), &TypeRef::INT);

    let setter = resolver
        .find_member_in_type(
            &owner,
            "x",
            MemberKinds::SET_ACCESSOR | MemberKinds::BINDING,
            &outside(),
            &ctx,
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(setter.kind, MemberKind::SetAccessor);
    assert_eq!(setter.declared_type(&store).unwrap(), &TypeRef::INT);

    let property = resolver
        .find_property(&owner, "x", &outside())
        .unwrap()
        .unwrap();
    assert_eq!(property.target(true), PropertyTarget::Accessors);
    assert_eq!(property.target(false), PropertyTarget::Field);
    assert!(resolver
        .find_property(&owner, "y", &outside())
        .unwrap()
        .is_none());
}

#[test]
fn binding_preference_can_be_disabled() {
    let (store, sub) = property_fixture();
    let policy = LookupPolicy {
        bindable_accessors: false,
        ..LookupPolicy::default()
    };
    let resolver = Resolver::new(&store).with_policy(policy);
    let found = resolver
        .find_member_in_type(
            &store.class_type(sub),
            "x",
            MemberKinds::READ | MemberKinds::BINDING,
            &outside(),
            &TypeParamContext::new(),
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(found.kind, MemberKind::Field);
}

#[test]
fn members_of_parameterized_owners_are_substituted_lazily() {
    let store = TypeStore::with_minimal_runtime();
    let wk = store.well_known().clone();
    let string = store.string_type();
    let list = store
        .parameterized(wk.array_list, vec![string.clone()])
        .unwrap();

    let resolver = Resolver::new(&store);
    let get = resolver
        .find_member_in_type(
            &list,
            "get",
            MemberKinds::METHOD,
            &outside(),
            &TypeParamContext::new(),
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(get.kind, MemberKind::Method);
    assert!(!get.is_materialized());
    assert!(matches!(get.raw_type(), TypeRef::TypeVar(_)));
    assert_eq!(get.declared_type(&store).unwrap(), &string);
    assert!(get.is_materialized());
    assert_eq!(get.owner, Some(list));

    // Inherited from a super-interface and viewed through it.
    let iterator = store.lookup_class("java.util.Iterator").unwrap();
    let list_string = store.parameterized(wk.list, vec![string.clone()]).unwrap();
    let iter = resolver
        .find_member_in_type(
            &list_string,
            "iterator",
            MemberKinds::METHOD,
            &outside(),
            &TypeParamContext::new(),
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(
        iter.owner,
        Some(store.parameterized(wk.iterable, vec![string.clone()]).unwrap())
    );
    assert_eq!(
        iter.declared_type(&store).unwrap(),
        &store.parameterized(iterator, vec![string]).unwrap()
    );
}

#[test]
fn simple_names_search_outward_through_scopes() {
    let mut store = TypeStore::with_minimal_runtime();
    let string = store.string_type();
    let outer = store.declare_class("app.Outer", LayerId::BASE).finish();
    store.add_field(outer, "count", TypeRef::LONG, Modifiers::PRIVATE);
    store.add_field(
        outer,
        "LIMIT",
        TypeRef::INT,
        Modifiers::PRIVATE | Modifiers::STATIC,
    );
    let inner = store
        .declare_class("app.Outer$Inner", LayerId::BASE)
        .enclosing(outer)
        .finish();
    store.add_field(inner, "label", string.clone(), Modifiers::PRIVATE);
    let run = store
        .add_method(inner, "run")
        .param(TypeRef::INT)
        .finish();
    let helper = store
        .add_method(inner, "helper")
        .modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
        .finish();

    let mut scopes = ScopeTree::new();
    let outer_scope = scopes.add_class_scope(None, outer);
    let inner_scope = scopes.add_class_scope(Some(outer_scope), inner);
    let run_scope = scopes.add_method_scope(&store, inner_scope, run, &["label"]);
    let block = scopes.add_block_scope(run_scope);
    scopes.declare_local(block, "tmp", TypeRef::DOUBLE);

    let resolver = Resolver::new(&store);
    let access = AccessContext::from_class(&store, inner);
    let ctx = TypeParamContext::new();
    let find = |scope, name: &str| {
        resolver
            .find_member(&scopes, scope, name, MemberKinds::READ, &access, &ctx, false)
            .unwrap()
    };

    let local = find(block, "tmp").unwrap();
    assert_eq!(local.kind, MemberKind::Local);
    assert_eq!(local.owner, None);

    // The parameter shadows the field of the same name.
    let param = find(block, "label").unwrap();
    assert_eq!(param.kind, MemberKind::Parameter);
    assert_eq!(param.declared_type(&store).unwrap(), &TypeRef::INT);
    assert!(matches!(param.origin, MemberOrigin::Variable { scope } if scope == run_scope));

    let outer_field = find(block, "count").unwrap();
    assert_eq!(outer_field.kind, MemberKind::Field);
    assert_eq!(outer_field.owner, Some(store.class_type(outer)));
    assert!(find(block, "missing").is_none());

    // Inside a static method only static members of the enclosing classes are visible.
    let helper_scope = scopes.add_method_scope(&store, inner_scope, helper, &[]);
    let find = |scope, name: &str| {
        resolver
            .find_member(&scopes, scope, name, MemberKinds::READ, &access, &ctx, false)
            .unwrap()
    };
    assert!(find(helper_scope, "label").is_none());
    assert!(find(helper_scope, "count").is_none());
    assert_eq!(
        find(helper_scope, "LIMIT").unwrap().declared_type(&store).unwrap(),
        &TypeRef::INT
    );
}

#[test]
fn private_members_stay_inside_the_outermost_class() {
    let mut store = TypeStore::with_minimal_runtime();
    let owner = store.declare_class("app.Owner", LayerId::BASE).finish();
    store.add_field(owner, "hidden", TypeRef::INT, Modifiers::PRIVATE);
    store.add_field(owner, "shared", TypeRef::INT, Modifiers::empty());
    let nested = store
        .declare_class("app.Owner$Nested", LayerId::BASE)
        .enclosing(owner)
        .finish();
    let neighbour = store.declare_class("app.Neighbour", LayerId::BASE).finish();
    let stranger = store.declare_class("lib.Stranger", LayerId::BASE).finish();

    let resolver = Resolver::new(&store);
    let ty = store.class_type(owner);
    let ctx = TypeParamContext::new();
    let lookup = |from, name: &str| {
        let access = AccessContext::from_class(&store, from);
        resolver
            .find_member_in_type(&ty, name, MemberKinds::FIELD, &access, &ctx, false)
            .unwrap()
            .is_some()
    };

    assert!(lookup(nested, "hidden"));
    assert!(!lookup(neighbour, "hidden"));
    assert!(lookup(neighbour, "shared"));
    assert!(!lookup(stranger, "shared"));
    assert!(resolver
        .find_member_in_type(&ty, "shared", MemberKinds::FIELD, &outside(), &ctx, false)
        .unwrap()
        .is_none());
}

#[test]
fn later_layers_are_invisible_to_earlier_ones() {
    let mut store = TypeStore::with_minimal_runtime();
    let config = store.declare_class("app.Config", LayerId::BASE).finish();
    store
        .add_method(config, "extra")
        .returns(TypeRef::INT)
        .layer(LayerId::new(2))
        .finish();

    let resolver = Resolver::new(&store);
    let ty = store.class_type(config);
    let ctx = TypeParamContext::new();
    let find = |layer| {
        resolver
            .find_member_in_type(
                &ty,
                "extra",
                MemberKinds::METHOD,
                &outside().in_layer(layer),
                &ctx,
                false,
            )
            .unwrap()
    };
    assert!(find(LayerId::new(1)).is_none());
    assert!(find(LayerId::new(2)).is_some());
}

#[test]
fn interface_constants_and_enum_constants() {
    let mut store = TypeStore::with_minimal_runtime();
    let limits = store
        .declare_class("app.Limits", LayerId::BASE)
        .kind(ClassKind::Interface)
        .finish();
    store.add_field(
        limits,
        "MAX",
        TypeRef::INT,
        Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
    );
    let impl_ = store
        .declare_class("app.Impl", LayerId::BASE)
        .implements(TypeRef::Declared(limits))
        .finish();
    let color = store
        .declare_class("app.Color", LayerId::BASE)
        .kind(ClassKind::Enum)
        .enum_constant("RED")
        .enum_constant("GREEN")
        .finish();

    let resolver = Resolver::new(&store);
    let ctx = TypeParamContext::new();
    let impl_ty = store.class_type(impl_);

    let max = resolver
        .find_member_in_type(&impl_ty, "MAX", MemberKinds::FIELD, &outside(), &ctx, false)
        .unwrap()
        .unwrap();
    assert_eq!(max.owner, Some(store.class_type(limits)));
    assert!(resolver
        .find_member_in_type(&impl_ty, "MAX", MemberKinds::FIELD, &outside(), &ctx, true)
        .unwrap()
        .is_none());

    let green = resolver
        .find_member_in_type(
            &store.class_type(color),
            "GREEN",
            MemberKinds::READ,
            &outside(),
            &ctx,
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(green.kind, MemberKind::EnumConstant);
    assert_eq!(
        green.origin,
        MemberOrigin::EnumConstant {
            class: color,
            ordinal: 1
        }
    );
    assert_eq!(green.declared_type(&store).unwrap(), &store.class_type(color));
}

#[test]
fn methods_outrank_fields_of_the_same_name() {
    let mut store = TypeStore::with_minimal_runtime();
    let class = store.declare_class("app.Both", LayerId::BASE).finish();
    store.add_field(class, "size", TypeRef::INT, Modifiers::PUBLIC);
    let method = store.add_method(class, "size").returns(TypeRef::LONG).finish();

    let resolver = Resolver::new(&store);
    let found = resolver
        .find_member_in_type(
            &store.class_type(class),
            "size",
            MemberKinds::METHOD | MemberKinds::FIELD,
            &outside(),
            &TypeParamContext::new(),
            false,
        )
        .unwrap()
        .unwrap();
    assert_eq!(found.method(), Some(method));
    assert_eq!(found.field(), None);

    // A subclass field does not hide an inherited method from a callable lookup.
    let sub = store
        .declare_class("app.Sub", LayerId::BASE)
        .extends(TypeRef::Declared(class))
        .finish();
    let shadow = store.add_field(sub, "size", TypeRef::INT, Modifiers::PUBLIC);
    let resolver = Resolver::new(&store);
    let lookup = |kinds| {
        resolver
            .find_member_in_type(
                &store.class_type(sub),
                "size",
                kinds,
                &outside(),
                &TypeParamContext::new(),
                false,
            )
            .unwrap()
            .unwrap()
    };
    let callable = lookup(MemberKinds::METHOD | MemberKinds::FIELD);
    assert_eq!(callable.kind, MemberKind::Method);
    assert_eq!(callable.method(), Some(method));
    assert_eq!(lookup(MemberKinds::FIELD).field(), Some(shadow));
}

#[test]
fn cache_entries_are_dropped_when_a_searched_class_changes() {
    let mut store = TypeStore::with_minimal_runtime();
    let base = store.declare_class("app.Base", LayerId::BASE).finish();
    let sub = store
        .declare_class("app.Sub", LayerId::BASE)
        .extends(TypeRef::Declared(base))
        .finish();
    let cache = MemberCache::new();
    let ctx = TypeParamContext::new();
    let sub_ty = store.class_type(sub);

    let lookup = |store: &TypeStore| {
        Resolver::new(store)
            .with_cache(&cache)
            .find_member_in_type(&sub_ty, "y", MemberKinds::FIELD, &outside(), &ctx, false)
            .unwrap()
    };

    assert!(lookup(&store).is_none());
    assert_eq!(cache.len(), 1);

    store.add_field(base, "y", TypeRef::INT, Modifiers::PUBLIC);
    // Stale until the pipeline reports the change.
    assert!(lookup(&store).is_none());

    cache.invalidate_class(base);
    assert!(cache.is_empty());
    assert!(lookup(&store).is_some());
    assert_eq!(cache.len(), 1);

    let unrelated = store.declare_class("app.Other", LayerId::BASE).finish();
    cache.invalidate_class(unrelated);
    assert_eq!(cache.len(), 1);
    cache.invalidate_all();
    assert!(cache.is_empty());
}

#[test]
fn class_redirect_cycle_is_reported() {
    let mut store = TypeStore::with_minimal_runtime();
    let a = store.declare_class("app.A", LayerId::BASE).finish();
    let b = store.declare_class("app.B", LayerId::BASE).finish();
    store.set_class_replaced_by(a, b).unwrap();
    store.set_class_replaced_by(b, a).unwrap();

    let err = Resolver::new(&store)
        .find_member_in_type(
            &TypeRef::Declared(a),
            "x",
            MemberKinds::FIELD,
            &outside(),
            &TypeParamContext::new(),
            false,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TypeError::CycleDetected(CycleKind::Redirect { .. })
    ));
}
