//! Type-argument inference for calls to generic methods.
//!
//! Inference pairs each declared formal with the argument supplied for it and reads
//! bindings for the method's own type variables off the structure. It is deliberately
//! shallow: the first binding found for a variable sticks, a conflicting second one
//! sends the variable to its declared bound, and an expected return type only fills
//! variables the arguments left open.

use strata_types::{
    instantiate_as_supertype, same_type, substitute_resolved, BoundKind, Frame, GenericOwner,
    MethodId, TypeEnv, TypeError, TypeParamContext, TypeRef, TypeVarId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Open,
    Inferred(TypeRef),
    Conflict,
}

struct Inference<'e> {
    env: &'e dyn TypeEnv,
    vars: &'e [TypeVarId],
    slots: Vec<Slot>,
    /// Only fill open slots; never turn a binding into a conflict.
    fill_only: bool,
}

impl<'e> Inference<'e> {
    fn new(env: &'e dyn TypeEnv, vars: &'e [TypeVarId]) -> Self {
        Self {
            env,
            vars,
            slots: vec![Slot::Open; vars.len()],
            fill_only: false,
        }
    }

    fn record(&mut self, idx: usize, ty: &TypeRef) {
        let ty = match ty {
            TypeRef::Primitive(prim) => self.env.boxed(*prim),
            other => other.strip_overlap().clone(),
        };
        let Some(slot) = self.slots.get_mut(idx) else {
            return;
        };
        match slot {
            Slot::Open => *slot = Slot::Inferred(ty),
            Slot::Inferred(prev) if self.fill_only || same_type(self.env, prev, &ty) => {}
            Slot::Inferred(_) => {
                tracing::trace!(var = ?self.vars[idx], "conflicting inference, using the bound");
                *slot = Slot::Conflict;
            }
            Slot::Conflict => {}
        }
    }

    fn unify(&mut self, formal: &TypeRef, actual: &TypeRef, depth: u32) {
        if depth > self.env.limits().max_type_param_depth {
            return;
        }
        let actual = actual.strip_overlap();
        match (formal, actual) {
            (_, TypeRef::Null) => {}
            (TypeRef::TypeVar(var), _) => {
                if let Some(idx) = self.vars.iter().position(|v| v == var) {
                    self.record(idx, actual);
                }
            }
            (TypeRef::Array(f), TypeRef::Array(a)) if a.dims >= f.dims => {
                let rest = TypeRef::array((*a.component).clone(), a.dims - f.dims);
                self.unify(&f.component, &rest, depth + 1);
            }
            (TypeRef::Parameterized(f), _) if !f.args.is_empty() => {
                let view = match actual {
                    TypeRef::Parameterized(a) if a.base == f.base => Some(actual.clone()),
                    _ => instantiate_as_supertype(self.env, actual, f.base),
                };
                if let Some(TypeRef::Parameterized(a)) = view {
                    if a.args.len() == f.args.len() {
                        for (fa, aa) in f.args.iter().zip(&a.args) {
                            self.unify_arg(fa, aa, depth + 1);
                        }
                    }
                }
            }
            (TypeRef::Wildcard(w), _) => {
                if let Some(bound) = w.bound.as_deref() {
                    self.unify(bound, actual, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn unify_arg(&mut self, formal: &TypeRef, actual: &TypeRef, depth: u32) {
        match actual {
            TypeRef::Wildcard(w) => match (w.bound_kind, w.bound.as_deref()) {
                (BoundKind::Unbounded, _) | (_, None) => {}
                (_, Some(bound)) => self.unify(formal, bound, depth),
            },
            _ => self.unify(formal, actual, depth),
        }
    }

    /// Pair the declared return type with the type the call site expects.
    fn unify_expected(&mut self, return_type: &TypeRef, expected: &TypeRef) {
        self.fill_only = true;
        match (return_type, expected.strip_overlap()) {
            (TypeRef::Parameterized(r), TypeRef::Parameterized(e)) if r.base != e.base => {
                if let Some(view) = instantiate_as_supertype(self.env, return_type, e.base) {
                    self.unify(&view, expected, 0);
                }
            }
            _ => self.unify(return_type, expected, 0),
        }
        self.fill_only = false;
    }

    fn finish(self) -> Vec<Option<TypeRef>> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Inferred(ty) => Some(ty),
                Slot::Open | Slot::Conflict => None,
            })
            .collect()
    }
}

/// Infer the type arguments of `method` from `(formal, actual)` pairs.
///
/// `None` marks a variable that could not be inferred (or was inferred inconsistently).
pub(crate) fn infer_type_args(
    env: &dyn TypeEnv,
    type_params: &[TypeVarId],
    pairs: &[(TypeRef, &TypeRef)],
    return_type: &TypeRef,
    expected: Option<&TypeRef>,
) -> Vec<Option<TypeRef>> {
    let mut inference = Inference::new(env, type_params);
    for (formal, actual) in pairs {
        inference.unify(formal, actual, 0);
    }
    if let Some(expected) = expected {
        inference.unify_expected(return_type, expected);
    }
    inference.finish()
}

/// Fill the variables inference left open with their declared bounds, expanded in a
/// context holding the inferred ones.
pub(crate) fn complete_type_args(
    env: &dyn TypeEnv,
    method: MethodId,
    type_params: &[TypeVarId],
    partial: &[Option<TypeRef>],
    ctx: &TypeParamContext,
) -> Result<Vec<TypeRef>, TypeError> {
    let mut frame = Frame::new(Some(GenericOwner::Method(method)));
    for (var, inferred) in type_params.iter().copied().zip(partial) {
        match inferred {
            Some(ty) => frame.bind(var, ty.clone()),
            None => frame.declare(var),
        }
    }
    let mut ctx = ctx.clone();
    ctx.push_frame(frame);

    type_params
        .iter()
        .copied()
        .zip(partial)
        .map(|(var, inferred)| match inferred {
            Some(ty) => Ok(ty.clone()),
            None => {
                let bound = env
                    .type_param(var)
                    .map(|def| def.bound.clone())
                    .unwrap_or_else(|| env.object_type());
                Ok(substitute_resolved(env, &bound, &ctx)?.into_owned())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use strata_core::LayerId;
    use strata_types::TypeStore;

    #[test]
    fn conflicting_pairs_fall_back_and_expected_type_fills_gaps() {
        let mut store = TypeStore::with_minimal_runtime();
        let wk = store.well_known().clone();
        let object = store.object_type();
        let util = store.declare_class("app.Util", LayerId::BASE).finish();

        let mut pick = store.add_method(util, "pick");
        let t = pick.type_param("T", object.clone());
        let pick = pick
            .param(TypeRef::TypeVar(t))
            .param(TypeRef::TypeVar(t))
            .returns(TypeRef::TypeVar(t))
            .finish();

        let integer = store.class_type(wk.integer);
        let string = store.string_type();
        let t_ref = TypeRef::TypeVar(t);

        let same = infer_type_args(
            &store,
            &[t],
            &[(t_ref.clone(), &TypeRef::INT), (t_ref.clone(), &integer)],
            &t_ref,
            None,
        );
        assert_eq!(same, vec![Some(integer.clone())]);

        let conflict = infer_type_args(
            &store,
            &[t],
            &[(t_ref.clone(), &integer), (t_ref.clone(), &string)],
            &t_ref,
            None,
        );
        assert_eq!(conflict, vec![None]);
        let completed =
            complete_type_args(&store, pick, &[t], &conflict, &TypeParamContext::new()).unwrap();
        assert_eq!(completed, vec![object]);

        // List<T> returned into a Collection<String> slot.
        let list_t = store
            .parameterized(wk.list, vec![t_ref.clone()])
            .unwrap();
        let collection_string = store
            .parameterized(wk.collection, vec![string.clone()])
            .unwrap();
        let from_expected = infer_type_args(&store, &[t], &[], &list_t, Some(&collection_string));
        assert_eq!(from_expected, vec![Some(string)]);
    }
}
