use std::borrow::Cow;
use std::collections::HashMap;

use crate::{
    ClassId, CycleKind, GenericOwner, MethodId, ParameterizedType, TypeEnv, TypeError,
    TypeRef, TypeVarId, WildcardType,
};

/// One level of type-variable bindings: a class instantiation, a method invocation, or
/// the view of a supertype reached through an extends/implements edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    owner: Option<GenericOwner>,
    bindings: HashMap<TypeVarId, Option<TypeRef>>,
}

impl Frame {
    pub fn new(owner: Option<GenericOwner>) -> Self {
        Self {
            owner,
            bindings: HashMap::new(),
        }
    }

    /// Map the formals of `class` positionally onto `args`.
    ///
    /// A raw instantiation (empty `args`) declares every formal but leaves it unbound.
    pub fn for_class(env: &dyn TypeEnv, class: ClassId, args: &[TypeRef]) -> Self {
        let mut frame = Frame::new(Some(GenericOwner::Class(class)));
        if let Some(def) = env.class(class) {
            for (idx, formal) in def.type_params.iter().copied().enumerate() {
                frame.bindings.insert(formal, args.get(idx).cloned());
            }
        }
        frame
    }

    /// Map the type parameters of `method` positionally onto `args`.
    pub fn for_method(env: &dyn TypeEnv, method: MethodId, args: &[TypeRef]) -> Self {
        let mut frame = Frame::new(Some(GenericOwner::Method(method)));
        if let Some(def) = env.method(method) {
            for (idx, formal) in def.type_params.iter().copied().enumerate() {
                frame.bindings.insert(formal, args.get(idx).cloned());
            }
        }
        frame
    }

    pub fn owner(&self) -> Option<GenericOwner> {
        self.owner
    }

    pub fn bind(&mut self, var: TypeVarId, ty: TypeRef) {
        self.bindings.insert(var, Some(ty));
    }

    /// Declare `var` in this frame without a binding (shadows outer frames).
    pub fn declare(&mut self, var: TypeVarId) {
        self.bindings.entry(var).or_insert(None);
    }

    pub fn get(&self, var: TypeVarId) -> Option<Option<&TypeRef>> {
        self.bindings.get(&var).map(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A chain of binding frames, searched innermost first.
///
/// Method frames nest inside the enclosing type's frame, which nests inside the frames of
/// enclosing types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeParamContext {
    frames: Vec<Frame>,
}

impl TypeParamContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    /// Context for members seen through `class<args>`.
    pub fn for_instantiation(env: &dyn TypeEnv, class: ClassId, args: &[TypeRef]) -> Self {
        Self::with_frame(Frame::for_class(env, class, args))
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(Frame::is_empty)
    }

    /// Bind `var` in the innermost frame, creating one if the context is empty.
    pub fn bind(&mut self, var: TypeVarId, ty: TypeRef) {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.bind(var, ty);
        }
    }

    /// Raw lookup: `None` when no frame declares `var`, `Some(None)` when the nearest frame
    /// declares it without a binding.
    pub fn lookup(&self, var: TypeVarId) -> Option<Option<&TypeRef>> {
        self.frames.iter().rev().find_map(|frame| frame.get(var))
    }

    /// The type bound to `var`.
    ///
    /// When nothing is bound, `resolve == true` falls back to the variable's declared bound
    /// and `resolve == false` returns `None` so the caller can keep treating it as a variable.
    pub fn get_binding(
        &self,
        env: &dyn TypeEnv,
        var: TypeVarId,
        resolve: bool,
    ) -> Option<TypeRef> {
        match self.lookup(var) {
            Some(Some(ty)) if *ty != TypeRef::TypeVar(var) => Some(ty.clone()),
            _ if resolve => env.type_param(var).map(|def| def.bound.clone()),
            _ => None,
        }
    }

    /// Whether `var` has no concrete binding in this context.
    pub fn is_unresolved(&self, var: TypeVarId) -> bool {
        !matches!(self.lookup(var), Some(Some(ty)) if *ty != TypeRef::TypeVar(var))
    }
}

/// Replace bound type variables throughout `ty`.
///
/// Unbound variables are left in place. Returns `Cow::Borrowed(ty)` when nothing changed,
/// so repeated substitution with the same context is free and keeps sharing intact.
pub fn substitute<'a>(
    env: &dyn TypeEnv,
    ty: &'a TypeRef,
    ctx: &TypeParamContext,
) -> Result<Cow<'a, TypeRef>, TypeError> {
    Substituter::new(env, ctx, false).subst(ty)
}

/// Like [`substitute`], but unbound variables are replaced by their declared bounds.
///
/// A variable met again while its own bound is being expanded (`E extends Enum<E>`) is
/// replaced by the erasure of that bound.
pub fn substitute_resolved<'a>(
    env: &dyn TypeEnv,
    ty: &'a TypeRef,
    ctx: &TypeParamContext,
) -> Result<Cow<'a, TypeRef>, TypeError> {
    Substituter::new(env, ctx, true).subst(ty)
}

/// Erasure of `ty`: type arguments dropped, variables replaced by the erasure of their bound.
pub fn erasure(env: &dyn TypeEnv, ty: &TypeRef) -> Result<TypeRef, TypeError> {
    erasure_inner(env, ty, 0)
}

fn erasure_inner(env: &dyn TypeEnv, ty: &TypeRef, depth: u32) -> Result<TypeRef, TypeError> {
    if depth > env.limits().max_type_param_depth {
        return Err(cycle_error(env, ty));
    }
    Ok(match ty {
        TypeRef::Parameterized(p) => env.class_type(p.base),
        TypeRef::Array(a) => TypeRef::array(erasure_inner(env, &a.component, depth)?, a.dims),
        TypeRef::TypeVar(var) => match env.type_param(*var) {
            Some(def) => erasure_inner(env, &def.bound, depth + 1)?,
            None => env.object_type(),
        },
        TypeRef::Wildcard(w) => match (w.bound_kind, w.bound.as_deref()) {
            (crate::BoundKind::Extends, Some(bound)) => erasure_inner(env, bound, depth + 1)?,
            _ => env.object_type(),
        },
        TypeRef::Overlap(base) => erasure_inner(env, base, depth)?,
        other => other.clone(),
    })
}

fn cycle_error(env: &dyn TypeEnv, ty: &TypeRef) -> TypeError {
    let name = match ty {
        TypeRef::TypeVar(var) => env
            .type_param(*var)
            .map(|def| def.name.to_string())
            .unwrap_or_else(|| format!("{var:?}")),
        other => format!("{other:?}"),
    };
    tracing::warn!(type_param = %name, "type parameter substitution exceeded its recursion bound");
    TypeError::CycleDetected(CycleKind::TypeParameters { name })
}

struct Substituter<'e> {
    env: &'e dyn TypeEnv,
    ctx: &'e TypeParamContext,
    resolve: bool,
    depth: u32,
    expanding: Vec<TypeVarId>,
}

impl<'e> Substituter<'e> {
    fn new(env: &'e dyn TypeEnv, ctx: &'e TypeParamContext, resolve: bool) -> Self {
        Self {
            env,
            ctx,
            resolve,
            depth: 0,
            expanding: Vec::new(),
        }
    }

    fn subst<'a>(&mut self, ty: &'a TypeRef) -> Result<Cow<'a, TypeRef>, TypeError> {
        match ty {
            TypeRef::TypeVar(var) => self.subst_var(ty, *var),
            TypeRef::Array(a) => Ok(match self.subst(&a.component)? {
                Cow::Borrowed(_) => Cow::Borrowed(ty),
                Cow::Owned(component) => Cow::Owned(TypeRef::array(component, a.dims)),
            }),
            TypeRef::Parameterized(p) => {
                let mut changed: Option<Vec<TypeRef>> = None;
                for (idx, arg) in p.args.iter().enumerate() {
                    match self.subst(arg)? {
                        Cow::Borrowed(_) => {
                            if let Some(args) = changed.as_mut() {
                                args.push(arg.clone());
                            }
                        }
                        Cow::Owned(new_arg) => {
                            let args = changed.get_or_insert_with(|| p.args[..idx].to_vec());
                            args.push(match new_arg {
                                TypeRef::Primitive(prim) => self.env.boxed(prim),
                                other => other,
                            });
                        }
                    }
                }
                Ok(match changed {
                    None => Cow::Borrowed(ty),
                    Some(args) => Cow::Owned(TypeRef::Parameterized(ParameterizedType {
                        base: p.base,
                        args,
                    })),
                })
            }
            TypeRef::Wildcard(w) => {
                let Some(bound) = w.bound.as_deref() else {
                    return Ok(Cow::Borrowed(ty));
                };
                Ok(match self.subst(bound)? {
                    Cow::Borrowed(_) => Cow::Borrowed(ty),
                    Cow::Owned(bound) => Cow::Owned(TypeRef::Wildcard(WildcardType {
                        bound_kind: w.bound_kind,
                        bound: Some(Box::new(bound)),
                    })),
                })
            }
            TypeRef::Overlap(base) => Ok(match self.subst(base)? {
                Cow::Borrowed(_) => Cow::Borrowed(ty),
                Cow::Owned(base) => Cow::Owned(TypeRef::overlap(base)),
            }),
            TypeRef::Primitive(_)
            | TypeRef::Void
            | TypeRef::Null
            | TypeRef::Declared(_)
            | TypeRef::Reflected(_) => Ok(Cow::Borrowed(ty)),
        }
    }

    fn subst_var<'a>(
        &mut self,
        ty: &'a TypeRef,
        var: TypeVarId,
    ) -> Result<Cow<'a, TypeRef>, TypeError> {
        let replacement = match self.ctx.get_binding(self.env, var, false) {
            Some(bound) => bound,
            None if self.resolve => {
                if self.expanding.contains(&var) {
                    return Ok(Cow::Owned(erasure(self.env, ty)?));
                }
                match self.env.type_param(var) {
                    Some(def) => def.bound.clone(),
                    None => return Ok(Cow::Borrowed(ty)),
                }
            }
            None => return Ok(Cow::Borrowed(ty)),
        };

        self.depth += 1;
        if self.depth > self.env.limits().max_type_param_depth {
            return Err(cycle_error(self.env, ty));
        }
        self.expanding.push(var);
        let out = self.subst(&replacement).map(Cow::into_owned);
        self.expanding.pop();
        self.depth -= 1;
        Ok(Cow::Owned(out?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeStore;

    use pretty_assertions::assert_eq;
    use strata_core::LayerId;

    #[test]
    fn unbound_variable_is_kept_unless_resolving() {
        let mut store = TypeStore::with_minimal_runtime();
        let number = store.class_type(store.well_known().number);
        let mut box_class = store.declare_class("Box", LayerId::BASE);
        let t = box_class.type_param("T", number.clone());
        box_class.finish();

        let ctx = TypeParamContext::new();
        let var = TypeRef::TypeVar(t);
        assert_eq!(ctx.get_binding(&store, t, false), None);
        assert_eq!(ctx.get_binding(&store, t, true), Some(number.clone()));

        let kept = substitute(&store, &var, &ctx).expect("no cycle");
        assert!(matches!(kept, Cow::Borrowed(_)));
        let resolved = substitute_resolved(&store, &var, &ctx).expect("no cycle");
        assert_eq!(resolved.into_owned(), number);
    }

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut store = TypeStore::with_minimal_runtime();
        let object = store.object_type();
        let string = store.string_type();
        let mut holder = store.declare_class("Holder", LayerId::BASE);
        let t = holder.type_param("T", object);
        holder.finish();

        let mut ctx = TypeParamContext::new();
        ctx.bind(t, string.clone());
        let mut inner = Frame::new(None);
        inner.declare(t);
        ctx.push_frame(inner);

        assert_eq!(ctx.get_binding(&store, t, false), None);
        ctx.pop_frame();
        assert_eq!(ctx.get_binding(&store, t, false), Some(string));
    }

    #[test]
    fn self_referential_bound_resolves_to_erasure() {
        let store = TypeStore::with_minimal_runtime();
        let enum_def = store.class(store.well_known().enum_).expect("Enum defined");
        let e = enum_def.type_params[0];

        let resolved = substitute_resolved(&store, &TypeRef::TypeVar(e), &TypeParamContext::new())
            .expect("self-referential bound terminates")
            .into_owned();
        let TypeRef::Parameterized(p) = resolved else {
            panic!("expected Enum<...>, got {resolved:?}");
        };
        assert_eq!(p.base, store.well_known().enum_);
        assert_eq!(p.args, vec![store.class_type(store.well_known().enum_)]);
    }

    #[test]
    fn mutually_bound_variables_report_a_cycle() {
        let mut store = TypeStore::with_minimal_runtime();
        let object = store.object_type();
        let mut pair = store.declare_class("Pair", LayerId::BASE);
        let a = pair.type_param("A", object.clone());
        let b = pair.type_param("B", object);
        pair.finish();

        let mut ctx = TypeParamContext::new();
        ctx.bind(a, TypeRef::TypeVar(b));
        ctx.bind(b, TypeRef::TypeVar(a));

        let err = substitute(&store, &TypeRef::TypeVar(a), &ctx).expect_err("cycle");
        assert!(matches!(
            err,
            TypeError::CycleDetected(CycleKind::TypeParameters { .. })
        ));
    }
}
