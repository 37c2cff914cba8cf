//! The assignability relation and the queries built on it.

use std::borrow::Cow;
use std::collections::{HashSet, VecDeque};

use crate::context::{erasure, substitute, TypeParamContext};
use crate::layers::canonical_class;
use crate::{
    ArrayType, BoundKind, ClassId, CycleKind, TypeDisplay, TypeEnv, TypeError, TypeRef,
    TypeVarId, WildcardType,
};

/// How permissive an assignability check is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AssignSemantics {
    /// Subtyping and primitive widening only. Used by the first overload phase.
    Strict,
    /// Ordinary assignment context: adds boxing and unboxing.
    #[default]
    Loose,
    /// Like `Loose`, and a type argument that is still an unresolved type variable
    /// matches anything. Used when unifying conditional branches.
    Lenient,
}

impl AssignSemantics {
    #[inline]
    pub fn allows_boxing(self) -> bool {
        !matches!(self, AssignSemantics::Strict)
    }

    #[inline]
    pub fn tolerates_unresolved(self) -> bool {
        matches!(self, AssignSemantics::Lenient)
    }
}

/// Whether a value of type `source` may be assigned to a location of type `target`.
///
/// Type variables bound in `ctx` are substituted first; unbound ones are compared through
/// their declared bounds, so the answer is always definite. Internal failures (cycles)
/// are logged and answer `false`.
pub fn is_assignable_from(
    env: &dyn TypeEnv,
    target: &TypeRef,
    source: &TypeRef,
    semantics: AssignSemantics,
    ctx: &TypeParamContext,
) -> bool {
    match Assign::new(env, semantics).check_in(target, source, ctx) {
        Ok(ok) => ok,
        Err(err) => {
            tracing::warn!(error = %err, "assignability check aborted");
            false
        }
    }
}

/// [`is_assignable_from`] for callers that report errors at a source location.
pub fn check_assignable(
    env: &dyn TypeEnv,
    target: &TypeRef,
    source: &TypeRef,
    semantics: AssignSemantics,
    ctx: &TypeParamContext,
) -> Result<(), TypeError> {
    if Assign::new(env, semantics).check_in(target, source, ctx)? {
        Ok(())
    } else {
        Err(TypeError::Incompatible {
            expected: TypeDisplay::new(env, target).to_string(),
            found: TypeDisplay::new(env, source).to_string(),
        })
    }
}

/// Whether `sub` is `sup` or has it among its ancestors, after following layer redirects.
pub fn is_subclass(env: &dyn TypeEnv, sub: ClassId, sup: ClassId) -> bool {
    let sub = canonical_class(env, sub);
    let sup = canonical_class(env, sup);
    if sub == sup || sup == canonical_class(env, env.well_known().object) {
        return true;
    }
    env.resolve_class(sub)
        .map(|resolved| resolved.has_ancestor(sup))
        .unwrap_or(false)
}

/// Structural type equality that treats `Declared`/`Reflected` references to the same
/// (redirected) class as equal, and a raw `Parameterized` as its bare class.
pub fn same_type(env: &dyn TypeEnv, a: &TypeRef, b: &TypeRef) -> bool {
    match (a.strip_overlap(), b.strip_overlap()) {
        (
            TypeRef::Declared(x) | TypeRef::Reflected(x),
            TypeRef::Declared(y) | TypeRef::Reflected(y),
        ) => canonical_class(env, *x) == canonical_class(env, *y),
        (TypeRef::Parameterized(p), TypeRef::Declared(y) | TypeRef::Reflected(y))
        | (TypeRef::Declared(y) | TypeRef::Reflected(y), TypeRef::Parameterized(p)) => {
            p.is_raw() && canonical_class(env, p.base) == canonical_class(env, *y)
        }
        (TypeRef::Parameterized(p), TypeRef::Parameterized(q)) => {
            canonical_class(env, p.base) == canonical_class(env, q.base)
                && p.args.len() == q.args.len()
                && p.args
                    .iter()
                    .zip(&q.args)
                    .all(|(x, y)| same_type(env, x, y))
        }
        (TypeRef::Array(x), TypeRef::Array(y)) => {
            x.dims == y.dims && same_type(env, &x.component, &y.component)
        }
        (TypeRef::Wildcard(x), TypeRef::Wildcard(y)) => {
            x.bound_kind == y.bound_kind
                && match (x.bound.as_deref(), y.bound.as_deref()) {
                    (Some(x), Some(y)) => same_type(env, x, y),
                    (None, None) => true,
                    _ => false,
                }
        }
        (x, y) => x == y,
    }
}

/// View `ty` as an instantiation of `target` by walking its extends/implements edges.
///
/// Each edge maps the formals of the class being left onto the arguments written in its
/// supertype clause, so `StringList extends ArrayList<String>` viewed as `Iterable`
/// yields `Iterable<String>`. A raw generic input stays raw all the way up. Returns
/// `None` when `target` is not a supertype.
pub fn instantiate_as_supertype(
    env: &dyn TypeEnv,
    ty: &TypeRef,
    target: ClassId,
) -> Option<TypeRef> {
    match supertype_instance(env, ty, target) {
        Ok(view) => view,
        Err(err) => {
            tracing::warn!(error = %err, "supertype instantiation aborted");
            None
        }
    }
}

pub(crate) fn supertype_instance(
    env: &dyn TypeEnv,
    ty: &TypeRef,
    target: ClassId,
) -> Result<Option<TypeRef>, TypeError> {
    let target = canonical_class(env, target);
    let upper = upper_bound(env, ty)?;
    let (start, start_args) = match upper.strip_overlap() {
        TypeRef::Declared(id) | TypeRef::Reflected(id) => (*id, Vec::new()),
        TypeRef::Parameterized(p) => (p.base, p.args.clone()),
        TypeRef::Array(_) => {
            let wk = env.well_known();
            let accepted = [wk.object, wk.cloneable, wk.serializable]
                .into_iter()
                .any(|id| canonical_class(env, id) == target);
            return Ok(accepted.then(|| env.class_type(target)));
        }
        _ => return Ok(None),
    };

    let max = env.limits().max_supertype_depth as usize;
    let mut queue = VecDeque::from([(canonical_class(env, start), start_args)]);
    let mut seen = HashSet::new();
    while let Some((id, args)) = queue.pop_front() {
        if id == target {
            return Ok(Some(if args.is_empty() {
                env.class_type(id)
            } else {
                TypeRef::Parameterized(crate::ParameterizedType { base: id, args })
            }));
        }
        if !seen.insert(id) {
            continue;
        }
        let Some(def) = env.class(id) else {
            continue;
        };
        if seen.len() > max {
            return Err(TypeError::CycleDetected(CycleKind::Inheritance {
                name: def.name.to_string(),
            }));
        }

        let raw = args.is_empty() && !def.type_params.is_empty();
        let ctx = TypeParamContext::for_instantiation(env, id, &args);
        for clause in def.super_class.iter().chain(&def.interfaces) {
            let (base, clause_args) = match clause {
                TypeRef::Declared(base) | TypeRef::Reflected(base) => (*base, &[][..]),
                TypeRef::Parameterized(p) => (p.base, &p.args[..]),
                _ => continue,
            };
            let args = if raw {
                Vec::new()
            } else {
                clause_args
                    .iter()
                    .map(|arg| substitute(env, arg, &ctx).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?
            };
            queue.push_back((canonical_class(env, base), args));
        }
    }
    Ok(None)
}

/// Replace a leading type variable or wildcard by its upper bound.
fn upper_bound<'a>(env: &dyn TypeEnv, ty: &'a TypeRef) -> Result<Cow<'a, TypeRef>, TypeError> {
    let mut current = Cow::Borrowed(ty.strip_overlap());
    for _ in 0..=env.limits().max_type_param_depth {
        let next = match current.as_ref() {
            TypeRef::TypeVar(var) => Some(match env.type_param(*var) {
                Some(def) => def.bound.clone(),
                None => env.object_type(),
            }),
            TypeRef::Wildcard(WildcardType {
                bound_kind: BoundKind::Extends,
                bound: Some(bound),
            }) => Some((**bound).clone()),
            TypeRef::Wildcard(_) => Some(env.object_type()),
            _ => None,
        };
        match next {
            Some(next) => current = Cow::Owned(next),
            None => return Ok(current),
        }
    }
    Ok(Cow::Owned(erasure(env, &current)?))
}

/// Type of a conditional expression whose branches have types `a` and `b`.
///
/// Returns the wider side when one is assignable to the other, promotes numeric
/// operands, and otherwise marks the nearest common superclass as provisional with
/// [`TypeRef::Overlap`].
pub fn unify_conditional(env: &dyn TypeEnv, a: &TypeRef, b: &TypeRef) -> TypeRef {
    let (a, b) = (a.strip_overlap(), b.strip_overlap());
    if same_type(env, a, b) {
        return a.clone();
    }
    match (a, b) {
        (TypeRef::Null, other) | (other, TypeRef::Null) => {
            return match other {
                TypeRef::Primitive(prim) => env.boxed(*prim),
                other => other.clone(),
            };
        }
        _ => {}
    }
    if let (Some(x), Some(y)) = (env.unboxed(a), env.unboxed(b)) {
        if x == y {
            return TypeRef::Primitive(x);
        }
        if x.is_numeric() && y.is_numeric() {
            if let Some(promoted) = x.promote(y) {
                return TypeRef::Primitive(promoted);
            }
        }
    }

    let boxed = |ty: &TypeRef| match ty {
        TypeRef::Primitive(prim) => env.boxed(*prim),
        other => other.clone(),
    };
    let (a, b) = (boxed(a), boxed(b));
    let ctx = TypeParamContext::new();
    if is_assignable_from(env, &a, &b, AssignSemantics::Lenient, &ctx) {
        return a;
    }
    if is_assignable_from(env, &b, &a, AssignSemantics::Lenient, &ctx) {
        return b;
    }
    TypeRef::overlap(common_superclass(env, &a, &b))
}

fn common_superclass(env: &dyn TypeEnv, a: &TypeRef, b: &TypeRef) -> TypeRef {
    let (Some(x), Some(y)) = (a.class_id(), b.class_id()) else {
        return env.object_type();
    };
    let x = canonical_class(env, x);
    let chain = env
        .resolve_class(x)
        .map(|resolved| resolved.superclasses.clone())
        .unwrap_or_default();
    for candidate in std::iter::once(x).chain(chain) {
        if !is_subclass(env, y, candidate) {
            continue;
        }
        let via_a = instantiate_as_supertype(env, a, candidate);
        let via_b = instantiate_as_supertype(env, b, candidate);
        return match (via_a, via_b) {
            (Some(va), Some(vb)) if same_type(env, &va, &vb) => va,
            _ => env.class_type(candidate),
        };
    }
    env.object_type()
}

struct Assign<'e> {
    env: &'e dyn TypeEnv,
    semantics: AssignSemantics,
    depth: u32,
    expanding: Vec<TypeVarId>,
}

impl<'e> Assign<'e> {
    fn new(env: &'e dyn TypeEnv, semantics: AssignSemantics) -> Self {
        Self {
            env,
            semantics,
            depth: 0,
            expanding: Vec::new(),
        }
    }

    fn check_in(
        &mut self,
        target: &TypeRef,
        source: &TypeRef,
        ctx: &TypeParamContext,
    ) -> Result<bool, TypeError> {
        let target = substitute(self.env, target, ctx)?;
        let source = substitute(self.env, source, ctx)?;
        self.check(&target, &source)
    }

    fn check(&mut self, target: &TypeRef, source: &TypeRef) -> Result<bool, TypeError> {
        self.depth += 1;
        let out = if self.depth > self.env.limits().max_supertype_depth {
            Err(TypeError::CycleDetected(CycleKind::TypeParameters {
                name: TypeDisplay::new(self.env, target).to_string(),
            }))
        } else {
            self.check_inner(target, source)
        };
        self.depth -= 1;
        out
    }

    fn check_inner(&mut self, target: &TypeRef, source: &TypeRef) -> Result<bool, TypeError> {
        let (target, source) = (target.strip_overlap(), source.strip_overlap());
        if target == source {
            return Ok(!matches!(target, TypeRef::Void));
        }
        match (target, source) {
            (TypeRef::Void, _) | (_, TypeRef::Void) => Ok(false),
            (TypeRef::Primitive(to), TypeRef::Primitive(from)) => Ok(from.widens_to(*to)),
            (TypeRef::Primitive(to), _) => {
                if !self.semantics.allows_boxing() {
                    return Ok(false);
                }
                Ok(self
                    .env
                    .unboxed(source)
                    .is_some_and(|from| from == *to || from.widens_to(*to)))
            }
            (_, TypeRef::Primitive(from)) => {
                if !self.semantics.allows_boxing() {
                    return Ok(false);
                }
                let boxed = self.env.boxed(*from);
                self.check(target, &boxed)
            }
            (TypeRef::Null, _) => Ok(false),
            (_, TypeRef::Null) => Ok(true),
            (TypeRef::Wildcard(w), _) => self.check_wildcard_target(w, source),
            (_, TypeRef::Wildcard(w)) => {
                let upper = self.wildcard_upper(w);
                self.check(target, &upper)
            }
            (TypeRef::TypeVar(var), _) => {
                self.through_bound(*var, |this, bound| this.check(bound, source))
            }
            (_, TypeRef::TypeVar(var)) => {
                self.through_bound(*var, |this, bound| this.check(target, bound))
            }
            (TypeRef::Array(to), TypeRef::Array(from)) => self.check_arrays(to, from),
            (_, TypeRef::Array(_)) => Ok(self.accepts_arrays(target)),
            (TypeRef::Array(_), _) => Ok(false),
            _ => self.check_classes(target, source),
        }
    }

    fn check_wildcard_target(
        &mut self,
        w: &WildcardType,
        source: &TypeRef,
    ) -> Result<bool, TypeError> {
        match (w.bound_kind, w.bound.as_deref()) {
            (BoundKind::Extends, Some(bound)) => self.check(bound, source),
            // Accepted in either direction.
            (BoundKind::Super, Some(bound)) => {
                Ok(self.check(source, bound)? || self.check(bound, source)?)
            }
            _ => Ok(source.is_reference()),
        }
    }

    fn wildcard_upper(&self, w: &WildcardType) -> TypeRef {
        match (w.bound_kind, w.bound.as_deref()) {
            (BoundKind::Extends, Some(bound)) => bound.clone(),
            _ => self.env.object_type(),
        }
    }

    /// Run `f` against the declared bound of `var`. A variable met again while its own
    /// bound is being checked is replaced by its erasure.
    fn through_bound(
        &mut self,
        var: TypeVarId,
        f: impl FnOnce(&mut Self, &TypeRef) -> Result<bool, TypeError>,
    ) -> Result<bool, TypeError> {
        if self.expanding.contains(&var) {
            let erased = erasure(self.env, &TypeRef::TypeVar(var))?;
            return f(self, &erased);
        }
        let bound = match self.env.type_param(var) {
            Some(def) => def.bound.clone(),
            None => self.env.object_type(),
        };
        self.expanding.push(var);
        let out = f(self, &bound);
        self.expanding.pop();
        out
    }

    fn check_arrays(&mut self, to: &ArrayType, from: &ArrayType) -> Result<bool, TypeError> {
        if to.dims == from.dims {
            if to.component.is_primitive() || from.component.is_primitive() {
                return Ok(to.component == from.component);
            }
            return self.check(&to.component, &from.component);
        }
        if to.dims < from.dims && !to.component.is_primitive() {
            let peeled = TypeRef::array((*from.component).clone(), from.dims - to.dims);
            return self.check(&to.component, &peeled);
        }
        Ok(false)
    }

    fn accepts_arrays(&self, target: &TypeRef) -> bool {
        let Some(id) = target.class_id() else {
            return false;
        };
        let id = canonical_class(self.env, id);
        let wk = self.env.well_known();
        [wk.object, wk.cloneable, wk.serializable]
            .into_iter()
            .any(|candidate| canonical_class(self.env, candidate) == id)
    }

    fn check_classes(&mut self, target: &TypeRef, source: &TypeRef) -> Result<bool, TypeError> {
        let (Some(target_id), Some(_)) = (target.class_id(), source.class_id()) else {
            return Ok(false);
        };
        let target_id = canonical_class(self.env, target_id);
        if target_id == canonical_class(self.env, self.env.well_known().object) {
            return Ok(true);
        }
        let Some(view) = supertype_instance(self.env, source, target_id)? else {
            return Ok(false);
        };

        let target_args = target.type_args();
        let source_args = view.type_args();
        // Raw on either side: plain subtyping, or an unchecked conversion.
        if target_args.is_empty() || source_args.is_empty() {
            return Ok(true);
        }
        if target_args.len() != source_args.len() {
            return Ok(false);
        }
        for (t, s) in target_args.iter().zip(source_args) {
            if !self.contains(t, s)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Type-argument containment: invariant unless `target` is a wildcard.
    ///
    /// Both sides were substituted before this point, so a `TypeVar` here is unresolved.
    fn contains(&mut self, target: &TypeRef, source: &TypeRef) -> Result<bool, TypeError> {
        if same_type(self.env, target, source) {
            return Ok(true);
        }
        match target {
            TypeRef::Wildcard(w) => match (w.bound_kind, w.bound.as_deref()) {
                (BoundKind::Extends, Some(bound)) => {
                    let upper = match source {
                        TypeRef::Wildcard(sw) => self.wildcard_upper(sw),
                        other => other.clone(),
                    };
                    self.check(bound, &upper)
                }
                (BoundKind::Super, Some(bound)) => {
                    let lower = match source {
                        TypeRef::Wildcard(WildcardType {
                            bound_kind: BoundKind::Super,
                            bound: Some(lower),
                        }) => (**lower).clone(),
                        TypeRef::Wildcard(sw) => self.wildcard_upper(sw),
                        other => other.clone(),
                    };
                    Ok(self.check(&lower, bound)? || self.check(bound, &lower)?)
                }
                _ => Ok(true),
            },
            // An unresolved variable argument only matches itself unless the mismatch is
            // tolerated.
            TypeRef::TypeVar(_) => Ok(self.semantics.tolerates_unresolved()),
            _ => Ok(matches!(source, TypeRef::TypeVar(_))
                && self.semantics.tolerates_unresolved()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeStore;

    use pretty_assertions::assert_eq;
    use strata_core::LayerId;

    fn loose(store: &TypeStore, target: &TypeRef, source: &TypeRef) -> bool {
        is_assignable_from(
            store,
            target,
            source,
            AssignSemantics::Loose,
            &TypeParamContext::new(),
        )
    }

    #[test]
    fn primitives_widen_but_never_narrow() {
        let store = TypeStore::with_minimal_runtime();
        assert!(loose(&store, &TypeRef::LONG, &TypeRef::INT));
        assert!(loose(&store, &TypeRef::DOUBLE, &TypeRef::LONG));
        assert!(!loose(&store, &TypeRef::INT, &TypeRef::LONG));
        assert!(!loose(&store, &TypeRef::INT, &TypeRef::BOOLEAN));
    }

    #[test]
    fn boxing_is_not_allowed_in_strict_mode() {
        let store = TypeStore::with_minimal_runtime();
        let integer = store.class_type(store.well_known().integer);
        let number = store.class_type(store.well_known().number);
        let ctx = TypeParamContext::new();

        assert!(loose(&store, &integer, &TypeRef::INT));
        assert!(loose(&store, &number, &TypeRef::INT));
        assert!(loose(&store, &TypeRef::LONG, &integer));
        assert!(!is_assignable_from(
            &store,
            &integer,
            &TypeRef::INT,
            AssignSemantics::Strict,
            &ctx
        ));
        assert!(!is_assignable_from(
            &store,
            &TypeRef::INT,
            &integer,
            AssignSemantics::Strict,
            &ctx
        ));
    }

    #[test]
    fn null_goes_to_references_only() {
        let store = TypeStore::with_minimal_runtime();
        assert!(loose(&store, &store.string_type(), &TypeRef::Null));
        assert!(loose(
            &store,
            &TypeRef::array_of(TypeRef::INT),
            &TypeRef::Null
        ));
        assert!(!loose(&store, &TypeRef::INT, &TypeRef::Null));
    }

    #[test]
    fn arrays_go_to_object_cloneable_and_serializable() {
        let store = TypeStore::with_minimal_runtime();
        let wk = store.well_known();
        let ints = TypeRef::array_of(TypeRef::INT);
        assert!(loose(&store, &store.object_type(), &ints));
        assert!(loose(&store, &store.class_type(wk.cloneable), &ints));
        assert!(loose(&store, &store.class_type(wk.serializable), &ints));
        assert!(!loose(&store, &store.string_type(), &ints));
    }

    #[test]
    fn primitive_array_components_are_invariant() {
        let store = TypeStore::with_minimal_runtime();
        assert!(!loose(
            &store,
            &TypeRef::array_of(TypeRef::LONG),
            &TypeRef::array_of(TypeRef::INT)
        ));
        assert!(!loose(
            &store,
            &TypeRef::array_of(store.object_type()),
            &TypeRef::array_of(TypeRef::INT)
        ));
    }

    #[test]
    fn supertype_view_remaps_through_extends_edges() {
        let mut store = TypeStore::with_minimal_runtime();
        let wk = store.well_known().clone();
        let string = store.string_type();
        let list_of_string = store
            .parameterized(wk.array_list, vec![string.clone()])
            .expect("one argument");
        let names = store
            .declare_class("app.Names", LayerId::BASE)
            .extends(list_of_string)
            .finish();

        let view = instantiate_as_supertype(&store, &TypeRef::Declared(names), wk.iterable)
            .expect("Names is Iterable");
        assert_eq!(
            view,
            store
                .parameterized(wk.iterable, vec![string])
                .expect("one argument")
        );
    }

    #[test]
    fn raw_source_stays_raw() {
        let store = TypeStore::with_minimal_runtime();
        let wk = store.well_known();
        let raw = store.class_type(wk.array_list);
        let view = instantiate_as_supertype(&store, &raw, wk.collection).expect("supertype");
        assert_eq!(view, store.class_type(wk.collection));
    }

    #[test]
    fn conditional_unification() {
        let store = TypeStore::with_minimal_runtime();
        let wk = store.well_known();
        let integer = store.class_type(wk.integer);
        let number = store.class_type(wk.number);

        assert_eq!(
            unify_conditional(&store, &TypeRef::INT, &TypeRef::LONG),
            TypeRef::LONG
        );
        assert_eq!(
            unify_conditional(&store, &TypeRef::INT, &integer),
            TypeRef::INT
        );
        assert_eq!(
            unify_conditional(&store, &TypeRef::Null, &TypeRef::INT),
            integer
        );
        assert_eq!(unify_conditional(&store, &number, &integer), number);

        let mixed = unify_conditional(&store, &store.string_type(), &integer);
        assert_eq!(mixed, TypeRef::overlap(store.object_type()));
        assert_eq!(mixed.strip_overlap(), &store.object_type());
    }
}
