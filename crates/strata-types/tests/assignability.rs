use pretty_assertions::assert_eq;
use strata_core::LayerId;
use strata_types::{
    check_assignable, is_assignable_from, AssignSemantics, ClassId, TypeEnv, TypeError,
    TypeParamContext, TypeRef, TypeStore, TypeVarId,
};

fn assignable(store: &TypeStore, target: &TypeRef, source: &TypeRef) -> bool {
    is_assignable_from(
        store,
        target,
        source,
        AssignSemantics::Loose,
        &TypeParamContext::new(),
    )
}

/// `class Box<T>` with a single unbounded parameter.
fn box_class(store: &mut TypeStore) -> (ClassId, TypeVarId) {
    let object = store.object_type();
    let mut class = store.declare_class("app.Box", LayerId::BASE);
    let t = class.type_param("T", object);
    (class.finish(), t)
}

#[test]
fn generic_arguments_are_invariant() {
    let mut store = TypeStore::with_minimal_runtime();
    let (box_id, _) = box_class(&mut store);
    let string = store.string_type();
    let integer = store.class_type(store.well_known().integer);
    let number = store.class_type(store.well_known().number);

    let box_string = store.parameterized(box_id, vec![string.clone()]).unwrap();
    let box_string_again = store.parameterized(box_id, vec![string]).unwrap();
    let box_integer = store.parameterized(box_id, vec![integer]).unwrap();
    let box_number = store.parameterized(box_id, vec![number]).unwrap();

    assert!(assignable(&store, &box_string, &box_string_again));
    assert!(!assignable(&store, &box_string, &box_integer));
    assert!(!assignable(&store, &box_number, &box_integer));
    assert!(!assignable(&store, &box_integer, &box_number));
}

#[test]
fn unresolved_type_variable_argument_is_tolerated_only_when_lenient() {
    let mut store = TypeStore::with_minimal_runtime();
    let (box_id, t) = box_class(&mut store);
    let string = store.string_type();
    let integer = store.class_type(store.well_known().integer);
    let number = store.class_type(store.well_known().number);
    let mut holder = store.declare_class("app.Holder", LayerId::BASE);
    let n = holder.type_param("N", number);
    holder.finish();

    let box_string = store.parameterized(box_id, vec![string]).unwrap();
    let box_integer = store.parameterized(box_id, vec![integer]).unwrap();
    let box_t = store
        .parameterized(box_id, vec![TypeRef::TypeVar(t)])
        .unwrap();
    let box_n = store
        .parameterized(box_id, vec![TypeRef::TypeVar(n)])
        .unwrap();

    let ctx = TypeParamContext::new();
    let check = |target: &TypeRef, source: &TypeRef, semantics| {
        is_assignable_from(&store, target, source, semantics, &ctx)
    };
    for semantics in [AssignSemantics::Strict, AssignSemantics::Loose] {
        // `N extends Number` does not make `Box<N>` a `Box<Integer>`.
        assert!(!check(&box_integer, &box_n, semantics));
        assert!(!check(&box_n, &box_integer, semantics));
        assert!(!check(&box_string, &box_t, semantics));
        assert!(!check(&box_t, &box_string, semantics));
        assert!(check(&box_n, &box_n, semantics));
    }

    let lenient = AssignSemantics::Lenient;
    assert!(check(&box_integer, &box_n, lenient));
    assert!(check(&box_string, &box_t, lenient));
    assert!(check(&box_t, &box_string, lenient));
}

#[test]
fn bound_type_variable_compares_by_its_binding() {
    let mut store = TypeStore::with_minimal_runtime();
    let (box_id, t) = box_class(&mut store);
    let string = store.string_type();
    let integer = store.class_type(store.well_known().integer);

    let box_string = store.parameterized(box_id, vec![string]).unwrap();
    let box_t = store
        .parameterized(box_id, vec![TypeRef::TypeVar(t)])
        .unwrap();

    let mut ctx = TypeParamContext::new();
    ctx.bind(t, integer);
    assert!(!is_assignable_from(
        &store,
        &box_string,
        &box_t,
        AssignSemantics::Loose,
        &ctx
    ));
}

#[test]
fn wildcards_follow_their_bounds() {
    let store = TypeStore::with_minimal_runtime();
    let wk = store.well_known().clone();
    let integer = store.class_type(wk.integer);
    let number = store.class_type(wk.number);
    let string = store.string_type();

    let list = |arg: TypeRef| store.parameterized(wk.list, vec![arg]).unwrap();
    let extends_number = list(TypeRef::wildcard_extends(number.clone()));
    let super_integer = list(TypeRef::wildcard_super(integer.clone()));
    let any = list(TypeRef::unbounded_wildcard());

    assert!(assignable(&store, &extends_number, &list(integer.clone())));
    assert!(!assignable(&store, &extends_number, &list(string.clone())));
    assert!(assignable(&store, &super_integer, &list(number.clone())));
    assert!(assignable(&store, &any, &list(string.clone())));

    // `? super X` accepts either direction.
    let super_number = list(TypeRef::wildcard_super(number));
    assert!(assignable(&store, &super_number, &list(integer)));
    assert!(!assignable(&store, &super_number, &list(string)));
}

#[test]
fn subclass_instantiations_flow_into_supertypes() {
    let store = TypeStore::with_minimal_runtime();
    let wk = store.well_known().clone();
    let string = store.string_type();

    let array_list = store
        .parameterized(wk.array_list, vec![string.clone()])
        .unwrap();
    let list = store.parameterized(wk.list, vec![string.clone()]).unwrap();
    let iterable = store.parameterized(wk.iterable, vec![string]).unwrap();
    let raw_list = store.class_type(wk.list);

    assert!(assignable(&store, &list, &array_list));
    assert!(assignable(&store, &iterable, &array_list));
    assert!(assignable(&store, &raw_list, &array_list));
    // Unchecked conversion.
    assert!(assignable(&store, &list, &raw_list));
    assert!(!assignable(&store, &array_list, &list));
}

#[test]
fn comparable_through_box_class() {
    let store = TypeStore::with_minimal_runtime();
    let wk = store.well_known().clone();
    let integer = store.class_type(wk.integer);
    let comparable_integer = store
        .parameterized(wk.comparable, vec![integer.clone()])
        .unwrap();
    let comparable_string = store
        .parameterized(wk.comparable, vec![store.string_type()])
        .unwrap();

    assert!(assignable(&store, &comparable_integer, &integer));
    assert!(assignable(&store, &comparable_integer, &TypeRef::INT));
    assert!(!assignable(&store, &comparable_string, &integer));
}

#[test]
fn arrays_need_equal_dims_or_an_object_like_component() {
    let store = TypeStore::with_minimal_runtime();
    let string = store.string_type();
    let object = store.object_type();
    let wk = store.well_known().clone();
    let char_sequence = store.lookup_class("java.lang.CharSequence").unwrap();

    let strings = TypeRef::array_of(string.clone());
    let strings_2d = TypeRef::array(string.clone(), 2);
    assert!(assignable(
        &store,
        &TypeRef::array_of(store.class_type(char_sequence)),
        &strings
    ));
    assert!(assignable(&store, &TypeRef::array_of(object.clone()), &strings_2d));
    assert!(assignable(
        &store,
        &TypeRef::array_of(store.class_type(wk.cloneable)),
        &strings_2d
    ));
    assert!(!assignable(&store, &TypeRef::array_of(string.clone()), &strings_2d));
    assert!(!assignable(&store, &strings_2d, &strings));
    assert!(!assignable(&store, &strings, &object));
}

#[test]
fn unresolved_type_variable_uses_its_bound() {
    let mut store = TypeStore::with_minimal_runtime();
    let number = store.class_type(store.well_known().number);
    let mut holder = store.declare_class("app.Holder", LayerId::BASE);
    let n = holder.type_param("N", number.clone());
    holder.finish();

    let var = TypeRef::TypeVar(n);
    let integer = store.class_type(store.well_known().integer);
    assert!(assignable(&store, &number, &var));
    assert!(assignable(&store, &store.object_type(), &var));
    assert!(!assignable(&store, &store.string_type(), &var));
    assert!(assignable(&store, &var, &integer));
    assert!(!assignable(&store, &var, &store.string_type()));
}

#[test]
fn overlap_delegates_to_its_base() {
    let store = TypeStore::with_minimal_runtime();
    let number = store.class_type(store.well_known().number);
    let integer = store.class_type(store.well_known().integer);
    assert!(assignable(&store, &TypeRef::overlap(number.clone()), &integer));
    assert!(assignable(&store, &number, &TypeRef::overlap(integer)));
}

#[test]
fn check_assignable_reports_both_types() {
    let store = TypeStore::with_minimal_runtime();
    let err = check_assignable(
        &store,
        &TypeRef::INT,
        &store.string_type(),
        AssignSemantics::Loose,
        &TypeParamContext::new(),
    )
    .expect_err("String is not an int");
    assert_eq!(
        err,
        TypeError::Incompatible {
            expected: "int".to_string(),
            found: "java.lang.String".to_string(),
        }
    );
    assert_eq!(err.to_diagnostic(None).code, "incompatible-types");
}
