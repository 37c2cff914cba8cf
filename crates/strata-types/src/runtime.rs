//! A small host runtime: the `java.lang` / `java.util` classes the engine itself relies
//! on (boxing, array supertypes, `Enum`) plus enough of the collections API to exercise
//! generics.

use strata_core::Modifiers;

use crate::{ClassId, ClassKind, ParameterizedType, PrimitiveType, TypeEnv, TypeRef, TypeStore};

fn reflected(id: ClassId) -> TypeRef {
    TypeRef::Reflected(id)
}

fn generic(base: ClassId, args: Vec<TypeRef>) -> TypeRef {
    TypeRef::Parameterized(ParameterizedType { base, args })
}

const INTERFACE: Modifiers = Modifiers::PUBLIC.union(Modifiers::ABSTRACT);
const STATIC: Modifiers = Modifiers::PUBLIC.union(Modifiers::STATIC);

impl TypeStore {
    /// A store pre-populated with reflected core library classes.
    pub fn with_minimal_runtime() -> Self {
        let mut store = TypeStore::new();
        let wk = store.well_known().clone();
        let object = reflected(wk.object);
        let string = reflected(wk.string);

        store.reflect_class("java.lang.Object").finish();
        store.add_constructor(wk.object).finish();
        store.add_method(wk.object, "toString").returns(string.clone()).finish();
        store
            .add_method(wk.object, "equals")
            .param(object.clone())
            .returns(TypeRef::BOOLEAN)
            .finish();
        store.add_method(wk.object, "hashCode").returns(TypeRef::INT).finish();

        for name in ["java.io.Serializable", "java.lang.Cloneable"] {
            store
                .reflect_class(name)
                .kind(ClassKind::Interface)
                .modifiers(INTERFACE)
                .finish();
        }

        let char_sequence = store
            .reflect_class("java.lang.CharSequence")
            .kind(ClassKind::Interface)
            .modifiers(INTERFACE)
            .finish();
        store
            .add_method(char_sequence, "length")
            .returns(TypeRef::INT)
            .modifiers(INTERFACE)
            .finish();
        store
            .add_method(char_sequence, "charAt")
            .param(TypeRef::INT)
            .returns(TypeRef::Primitive(PrimitiveType::Char))
            .modifiers(INTERFACE)
            .finish();

        // interface Comparable<T> { int compareTo(T o); }
        let mut comparable = store
            .reflect_class("java.lang.Comparable")
            .kind(ClassKind::Interface)
            .modifiers(INTERFACE);
        let t = comparable.type_param("T", object.clone());
        comparable.finish();
        store
            .add_method(wk.comparable, "compareTo")
            .param(TypeRef::TypeVar(t))
            .returns(TypeRef::INT)
            .modifiers(INTERFACE)
            .finish();

        define_string(&mut store, char_sequence);
        define_boxes(&mut store);
        define_enum(&mut store);
        define_collections(&mut store);
        store
    }
}

fn define_string(store: &mut TypeStore, char_sequence: ClassId) {
    let wk = store.well_known().clone();
    let object = reflected(wk.object);
    let string = reflected(wk.string);

    store
        .reflect_class("java.lang.String")
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .extends(object.clone())
        .implements(reflected(wk.serializable))
        .implements(reflected(char_sequence))
        .implements(generic(wk.comparable, vec![string.clone()]))
        .finish();
    store.add_constructor(wk.string).finish();
    store.add_constructor(wk.string).param(string.clone()).finish();
    store
        .add_constructor(wk.string)
        .param(TypeRef::array_of(TypeRef::Primitive(PrimitiveType::Char)))
        .finish();
    store.add_method(wk.string, "length").returns(TypeRef::INT).finish();
    store.add_method(wk.string, "isEmpty").returns(TypeRef::BOOLEAN).finish();
    store
        .add_method(wk.string, "charAt")
        .param(TypeRef::INT)
        .returns(TypeRef::Primitive(PrimitiveType::Char))
        .finish();
    store
        .add_method(wk.string, "substring")
        .param(TypeRef::INT)
        .returns(string.clone())
        .finish();
    store
        .add_method(wk.string, "substring")
        .param(TypeRef::INT)
        .param(TypeRef::INT)
        .returns(string.clone())
        .finish();
    store
        .add_method(wk.string, "compareTo")
        .param(string.clone())
        .returns(TypeRef::INT)
        .finish();
    for param in [
        object.clone(),
        TypeRef::INT,
        TypeRef::LONG,
        TypeRef::BOOLEAN,
        TypeRef::array_of(TypeRef::Primitive(PrimitiveType::Char)),
    ] {
        store
            .add_method(wk.string, "valueOf")
            .param(param)
            .returns(string.clone())
            .modifiers(STATIC)
            .finish();
    }
    store
        .add_method(wk.string, "format")
        .param(string.clone())
        .repeating(object)
        .returns(string)
        .modifiers(STATIC)
        .finish();
}

fn define_boxes(store: &mut TypeStore) {
    let wk = store.well_known().clone();
    let string = reflected(wk.string);

    store
        .reflect_class("java.lang.Number")
        .modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
        .implements(reflected(wk.serializable))
        .finish();
    for (name, ret) in [
        ("intValue", TypeRef::INT),
        ("longValue", TypeRef::LONG),
        ("doubleValue", TypeRef::DOUBLE),
    ] {
        store
            .add_method(wk.number, name)
            .returns(ret)
            .modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
            .finish();
    }

    for prim in PrimitiveType::ALL {
        let id = wk.box_of(prim);
        let this = reflected(id);
        let class = store
            .reflect_class(prim.box_class_name())
            .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
            .implements(generic(wk.comparable, vec![this.clone()]));
        // Boolean and Character sit directly under Object.
        let class = match prim {
            PrimitiveType::Boolean | PrimitiveType::Char => class
                .extends(reflected(wk.object))
                .implements(reflected(wk.serializable)),
            _ => class.extends(reflected(wk.number)),
        };
        class.finish();

        store
            .add_constructor(id)
            .param(TypeRef::Primitive(prim))
            .finish();
        store
            .add_method(id, "valueOf")
            .param(TypeRef::Primitive(prim))
            .returns(this.clone())
            .modifiers(STATIC)
            .finish();
        store
            .add_method(id, "compareTo")
            .param(this.clone())
            .returns(TypeRef::INT)
            .finish();
        store
            .add_method(id, format!("{}Value", prim.keyword()))
            .returns(TypeRef::Primitive(prim))
            .finish();
    }

    store
        .add_method(wk.integer, "parseInt")
        .param(string)
        .returns(TypeRef::INT)
        .modifiers(STATIC)
        .finish();
    store.add_field(
        wk.integer,
        "MAX_VALUE",
        TypeRef::INT,
        STATIC | Modifiers::FINAL,
    );
    store.add_field(
        wk.integer,
        "MIN_VALUE",
        TypeRef::INT,
        STATIC | Modifiers::FINAL,
    );
}

fn define_enum(store: &mut TypeStore) {
    let wk = store.well_known().clone();

    // abstract class Enum<E extends Enum<E>> implements Comparable<E>, Serializable
    let mut class = store
        .reflect_class("java.lang.Enum")
        .modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
        .extends(reflected(wk.object))
        .implements(reflected(wk.serializable));
    let e = class.type_param("E", reflected(wk.object));
    class.bound(e, generic(wk.enum_, vec![TypeRef::TypeVar(e)]));
    class
        .implements(generic(wk.comparable, vec![TypeRef::TypeVar(e)]))
        .finish();

    store
        .add_method(wk.enum_, "name")
        .returns(reflected(wk.string))
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .finish();
    store
        .add_method(wk.enum_, "ordinal")
        .returns(TypeRef::INT)
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .finish();
    store
        .add_method(wk.enum_, "compareTo")
        .param(TypeRef::TypeVar(e))
        .returns(TypeRef::INT)
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .finish();
}

fn define_collections(store: &mut TypeStore) {
    let wk = store.well_known().clone();
    let object = reflected(wk.object);

    // interface Iterator<E> { boolean hasNext(); E next(); }
    let mut iterator = store
        .reflect_class("java.util.Iterator")
        .kind(ClassKind::Interface)
        .modifiers(INTERFACE);
    let iter_e = iterator.type_param("E", object.clone());
    let iterator = iterator.finish();
    store
        .add_method(iterator, "hasNext")
        .returns(TypeRef::BOOLEAN)
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(iterator, "next")
        .returns(TypeRef::TypeVar(iter_e))
        .modifiers(INTERFACE)
        .finish();

    // interface Iterable<T> { Iterator<T> iterator(); }
    let mut iterable = store
        .reflect_class("java.lang.Iterable")
        .kind(ClassKind::Interface)
        .modifiers(INTERFACE);
    let iterable_t = iterable.type_param("T", object.clone());
    iterable.finish();
    store
        .add_method(wk.iterable, "iterator")
        .returns(generic(iterator, vec![TypeRef::TypeVar(iterable_t)]))
        .modifiers(INTERFACE)
        .finish();

    // interface Collection<E> extends Iterable<E>
    let mut collection = store
        .reflect_class("java.util.Collection")
        .kind(ClassKind::Interface)
        .modifiers(INTERFACE);
    let coll_e = collection.type_param("E", object.clone());
    collection
        .implements(generic(wk.iterable, vec![TypeRef::TypeVar(coll_e)]))
        .finish();
    store
        .add_method(wk.collection, "size")
        .returns(TypeRef::INT)
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.collection, "isEmpty")
        .returns(TypeRef::BOOLEAN)
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.collection, "add")
        .param(TypeRef::TypeVar(coll_e))
        .returns(TypeRef::BOOLEAN)
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.collection, "contains")
        .param(object.clone())
        .returns(TypeRef::BOOLEAN)
        .modifiers(INTERFACE)
        .finish();

    // interface List<E> extends Collection<E>
    let mut list = store
        .reflect_class("java.util.List")
        .kind(ClassKind::Interface)
        .modifiers(INTERFACE);
    let list_e = list.type_param("E", object.clone());
    list.implements(generic(wk.collection, vec![TypeRef::TypeVar(list_e)]))
        .finish();
    store
        .add_method(wk.list, "get")
        .param(TypeRef::INT)
        .returns(TypeRef::TypeVar(list_e))
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.list, "set")
        .param(TypeRef::INT)
        .param(TypeRef::TypeVar(list_e))
        .returns(TypeRef::TypeVar(list_e))
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.list, "add")
        .param(TypeRef::INT)
        .param(TypeRef::TypeVar(list_e))
        .modifiers(INTERFACE)
        .finish();

    // class ArrayList<E> implements List<E>, Cloneable, Serializable
    let mut array_list = store
        .reflect_class("java.util.ArrayList")
        .extends(object.clone());
    let al_e = array_list.type_param("E", object.clone());
    array_list
        .implements(generic(wk.list, vec![TypeRef::TypeVar(al_e)]))
        .implements(reflected(wk.cloneable))
        .implements(reflected(wk.serializable))
        .finish();
    store.add_constructor(wk.array_list).finish();
    store.add_constructor(wk.array_list).param(TypeRef::INT).finish();
    store
        .add_constructor(wk.array_list)
        .param(generic(
            wk.collection,
            vec![TypeRef::wildcard_extends(TypeRef::TypeVar(al_e))],
        ))
        .finish();
    store
        .add_method(wk.array_list, "get")
        .param(TypeRef::INT)
        .returns(TypeRef::TypeVar(al_e))
        .finish();
    store
        .add_method(wk.array_list, "add")
        .param(TypeRef::TypeVar(al_e))
        .returns(TypeRef::BOOLEAN)
        .finish();
    store.add_method(wk.array_list, "size").returns(TypeRef::INT).finish();

    // interface Map<K, V>
    let mut map = store
        .reflect_class("java.util.Map")
        .kind(ClassKind::Interface)
        .modifiers(INTERFACE);
    let map_k = map.type_param("K", object.clone());
    let map_v = map.type_param("V", object.clone());
    map.finish();
    store
        .add_method(wk.map, "get")
        .param(object.clone())
        .returns(TypeRef::TypeVar(map_v))
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.map, "put")
        .param(TypeRef::TypeVar(map_k))
        .param(TypeRef::TypeVar(map_v))
        .returns(TypeRef::TypeVar(map_v))
        .modifiers(INTERFACE)
        .finish();
    store
        .add_method(wk.map, "size")
        .returns(TypeRef::INT)
        .modifiers(INTERFACE)
        .finish();

    let mut hash_map = store
        .reflect_class("java.util.HashMap")
        .extends(object.clone());
    let hm_k = hash_map.type_param("K", object.clone());
    let hm_v = hash_map.type_param("V", object.clone());
    let hash_map = hash_map
        .implements(generic(
            wk.map,
            vec![TypeRef::TypeVar(hm_k), TypeRef::TypeVar(hm_v)],
        ))
        .implements(reflected(wk.cloneable))
        .implements(reflected(wk.serializable))
        .finish();
    store.add_constructor(hash_map).finish();

    // final class Arrays { static <T> List<T> asList(T... a); }
    let arrays = store
        .reflect_class("java.util.Arrays")
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .extends(object.clone())
        .finish();
    let mut as_list = store.add_method(arrays, "asList");
    let t = as_list.type_param("T", object.clone());
    as_list
        .repeating(TypeRef::TypeVar(t))
        .returns(generic(wk.list, vec![TypeRef::TypeVar(t)]))
        .modifiers(STATIC)
        .finish();

    // final class Collections { static <T> List<T> emptyList(); }
    let collections = store
        .reflect_class("java.util.Collections")
        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .extends(object)
        .finish();
    let mut empty_list = store.add_method(collections, "emptyList");
    let t = empty_list.type_param("T", reflected(wk.object));
    empty_list
        .returns(generic(wk.list, vec![TypeRef::TypeVar(t)]))
        .modifiers(STATIC)
        .finish();
}
