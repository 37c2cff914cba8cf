//! Overload resolution: name plus argument types to the most specific applicable method.
//!
//! Candidates are tried in the three phases Java uses: strict invocation (subtyping and
//! primitive widening), loose invocation (adds boxing), then variable-arity invocation.
//! The first phase with an applicable candidate decides; within it the most specific
//! candidate wins.

use strata_core::{Diagnostic, Name, Span};
use strata_types::{
    erasure, is_assignable_from, is_subclass, resolve_class_definition, resolve_method_definition,
    substitute, AssignSemantics, ClassDef, ClassId, Frame, MethodDef, MethodId, TypeDisplay,
    TypeEnv, TypeError, TypeParamContext, TypeRef,
};
use thiserror::Error;

use crate::infer::{complete_type_args, infer_type_args};
use crate::resolver::this_type;
use crate::scopes::{ScopeId, ScopeKind, ScopeTree};
use crate::{AccessContext, Resolver};

/// Invocation phase a candidate was found applicable in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchPhase {
    /// Subtyping and primitive widening only.
    Strict,
    /// Boxing and unboxing allowed.
    Loose,
    /// Trailing arguments spread into the repeating parameter.
    Varargs,
}

impl MatchPhase {
    pub const ALL: [MatchPhase; 3] = [MatchPhase::Strict, MatchPhase::Loose, MatchPhase::Varargs];

    fn semantics(self) -> AssignSemantics {
        match self {
            MatchPhase::Strict => AssignSemantics::Strict,
            MatchPhase::Loose | MatchPhase::Varargs => AssignSemantics::Loose,
        }
    }
}

/// A method selected for a call, with every type variable substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMethod {
    /// The final definition, after following layer redirects.
    pub method: MethodId,
    /// The receiver viewed as the declaring class (`List<String>` for `ArrayList<String>.size`).
    pub owner: TypeRef,
    /// Arguments for the method's own type parameters, explicit or inferred.
    pub type_args: Vec<TypeRef>,
    /// Declared parameter types after substitution. A repeating parameter keeps its array type.
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    /// Whether trailing arguments were spread into the repeating parameter.
    pub used_varargs: bool,
    pub phase: MatchPhase,
}

impl AppliedMethod {
    /// The parameter type the argument at `index` is checked against.
    pub fn param_for_arg(&self, index: usize) -> Option<TypeRef> {
        let last = self.params.len().checked_sub(1)?;
        if self.used_varargs && index >= last {
            self.params.get(last)?.element_type()
        } else {
            self.params.get(index).cloned()
        }
    }
}

/// The argument side of a call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSite<'c> {
    pub args: &'c [TypeRef],
    /// Explicit type arguments (`Util.<String>of(x)`); empty when absent.
    pub type_args: &'c [TypeRef],
    /// Type expected by the surrounding assignment context, if any.
    pub expected: Option<&'c TypeRef>,
}

impl<'c> CallSite<'c> {
    pub fn new(args: &'c [TypeRef]) -> Self {
        Self {
            args,
            type_args: &[],
            expected: None,
        }
    }

    pub fn with_type_args(mut self, type_args: &'c [TypeRef]) -> Self {
        self.type_args = type_args;
        self
    }

    pub fn expecting(mut self, expected: &'c TypeRef) -> Self {
        self.expected = Some(expected);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("no applicable method {name} for the given arguments")]
    NotFound { name: String },
    #[error("reference to {name} is ambiguous; candidates: {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CallError {
    pub fn code(&self) -> &'static str {
        match self {
            CallError::NotFound { .. } => "method-not-found",
            CallError::Ambiguous { .. } => "ambiguous-call",
            CallError::Type(err) => err.code(),
        }
    }

    pub fn to_diagnostic(&self, span: Option<Span>) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string(), span)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    method: MethodId,
    /// Receiver viewed as the declaring class.
    owner: TypeRef,
}

/// Candidates split into those from the class chain and those only an interface supplies.
#[derive(Debug, Default)]
struct CandidateSet {
    body: Vec<Candidate>,
    interfaces: Vec<Candidate>,
}

impl CandidateSet {
    fn is_empty(&self) -> bool {
        self.body.is_empty() && self.interfaces.is_empty()
    }
}

impl<'a> Resolver<'a> {
    /// Resolve `receiver.name(args)`.
    ///
    /// Methods of the receiver's class chain are tried first; interface methods are
    /// consulted only when the chain yields no applicable candidate.
    pub fn resolve_call(
        &self,
        receiver: &TypeRef,
        name: &str,
        call: &CallSite<'_>,
        access: &AccessContext,
        ctx: &TypeParamContext,
    ) -> Result<AppliedMethod, CallError> {
        tracing::debug!(name, args = call.args.len(), "resolve_call");
        let not_found = || CallError::NotFound {
            name: name.to_string(),
        };
        let Some((start, class)) = self.receiver(receiver, ctx)? else {
            return Err(not_found());
        };
        let candidates = self.collect_methods(&start, class, name, access)?;
        self.select_in(name, &candidates, call, ctx)
    }

    /// Resolve an unqualified call `name(args)` made from inside `scope`.
    ///
    /// The innermost enclosing class that has a usable method called `name` decides; outer
    /// classes are not consulted once one does, even if none of its methods applies.
    pub fn resolve_call_in_scope(
        &self,
        scopes: &ScopeTree,
        scope: ScopeId,
        name: &str,
        call: &CallSite<'_>,
        access: &AccessContext,
        ctx: &TypeParamContext,
    ) -> Result<AppliedMethod, CallError> {
        tracing::debug!(name, args = call.args.len(), ?scope, "resolve_call_in_scope");
        let mut access = *access;
        for (_, data) in scopes.ancestors(scope) {
            match data.kind() {
                ScopeKind::Block => {}
                ScopeKind::Method(method) => {
                    if self.env.method(method).is_some_and(MethodDef::is_static) {
                        access.static_only = true;
                    }
                }
                ScopeKind::Class(class) => {
                    let this = this_type(self.env, class);
                    let candidates = self.collect_methods(&this, class, name, &access)?;
                    if !candidates.is_empty() {
                        return self.select_in(name, &candidates, call, ctx);
                    }
                    if self
                        .env
                        .class(class)
                        .is_some_and(|def| def.modifiers.is_static())
                    {
                        access.static_only = true;
                    }
                }
            }
        }
        Err(CallError::NotFound {
            name: name.to_string(),
        })
    }

    /// Resolve `new class(args)`. `class` may be parameterized (`new Box<String>(x)`).
    pub fn resolve_constructor(
        &self,
        class: &TypeRef,
        call: &CallSite<'_>,
        access: &AccessContext,
    ) -> Result<AppliedMethod, CallError> {
        let env = self.env;
        let Some(id) = class.class_id() else {
            return Err(CallError::NotFound {
                name: TypeDisplay::new(env, class).to_string(),
            });
        };
        let id = resolve_class_definition(env, id)?;
        let def = env.class(id).ok_or(TypeError::UnknownClass(id))?;
        let name = def.name.simple().to_string();
        tracing::debug!(class = %def.name, args = call.args.len(), "resolve_constructor");

        let owner = match class {
            TypeRef::Parameterized(p) => env.parameterized(id, p.args.clone())?,
            _ => env.class_type(id),
        };
        let mut body = Vec::new();
        for ctor in def.constructors.iter().copied() {
            let ctor = resolve_method_definition(env, ctor)?;
            let Some(m) = env.method(ctor) else {
                continue;
            };
            if !access.can_access(env, id, m.modifiers, m.layer) {
                tracing::trace!(class = %def.name, ?ctor, "constructor not accessible");
                continue;
            }
            body.push(Candidate {
                method: ctor,
                owner: owner.clone(),
            });
        }
        let candidates = CandidateSet {
            body,
            interfaces: Vec::new(),
        };
        self.select_in(&name, &candidates, call, &TypeParamContext::new())
    }

    fn select_in(
        &self,
        name: &str,
        candidates: &CandidateSet,
        call: &CallSite<'_>,
        ctx: &TypeParamContext,
    ) -> Result<AppliedMethod, CallError> {
        match self.select(name, &candidates.body, call, ctx) {
            Err(CallError::NotFound { .. }) if !candidates.interfaces.is_empty() => {
                self.select(name, &candidates.interfaces, call, ctx)
            }
            other => other,
        }
    }

    /// Every usable method named `name` visible on `start`, with subclass declarations
    /// hiding base declarations of the same erased signature.
    fn collect_methods(
        &self,
        start: &TypeRef,
        class: ClassId,
        name: &str,
        access: &AccessContext,
    ) -> Result<CandidateSet, TypeError> {
        let env = self.env;
        let class = resolve_class_definition(env, class)?;
        let resolved = env.resolve_class(class)?;

        let mut seen = Vec::new();
        let mut set = CandidateSet::default();
        let mut chain = vec![class];
        chain.extend(resolved.superclasses.iter().copied());
        for declaring in chain {
            self.collect_from(declaring, start, name, access, &mut seen, &mut set.body)?;
        }

        let mut interfaces = resolved.interfaces.clone();
        if env.class(class).is_some_and(ClassDef::is_interface) {
            interfaces.push(env.well_known().object);
        }
        for declaring in interfaces {
            self.collect_from(declaring, start, name, access, &mut seen, &mut set.interfaces)?;
        }
        if !self.policy.interfaces_after_body {
            let mut interfaces = std::mem::take(&mut set.interfaces);
            set.body.append(&mut interfaces);
        }
        Ok(set)
    }

    fn collect_from(
        &self,
        declaring: ClassId,
        start: &TypeRef,
        name: &str,
        access: &AccessContext,
        seen: &mut Vec<Vec<TypeRef>>,
        out: &mut Vec<Candidate>,
    ) -> Result<(), TypeError> {
        let env = self.env;
        let Some(def) = env.class(declaring) else {
            return Ok(());
        };
        let owner = if start.class_id() == Some(declaring) {
            start.clone()
        } else {
            strata_types::instantiate_as_supertype(env, start, declaring)
                .unwrap_or_else(|| env.class_type(declaring))
        };
        let owner_ctx = owner_context(env, &owner);

        for method in def.methods.iter().copied() {
            let method = resolve_method_definition(env, method)?;
            let Some(m) = env.method(method) else {
                continue;
            };
            if m.name != name {
                continue;
            }
            if !access.can_access(env, declaring, m.modifiers, m.layer) {
                tracing::trace!(name, class = %def.name, "candidate not accessible");
                continue;
            }
            if access.static_only && !m.is_static() {
                tracing::trace!(name, class = %def.name, "instance candidate in static context");
                continue;
            }
            let signature = m
                .params
                .iter()
                .map(|p| erasure(env, &*substitute(env, &p.ty, &owner_ctx)?))
                .collect::<Result<Vec<_>, _>>()?;
            if seen.contains(&signature) {
                tracing::trace!(name, class = %def.name, "candidate hidden by a subclass declaration");
                continue;
            }
            seen.push(signature);
            out.push(Candidate {
                method,
                owner: owner.clone(),
            });
        }
        Ok(())
    }

    fn select(
        &self,
        name: &str,
        candidates: &[Candidate],
        call: &CallSite<'_>,
        ctx: &TypeParamContext,
    ) -> Result<AppliedMethod, CallError> {
        for phase in MatchPhase::ALL {
            let mut applicable = Vec::new();
            for candidate in candidates {
                if let Some(applied) = self.try_apply(candidate, call, phase, ctx)? {
                    applicable.push(applied);
                }
            }
            if !applicable.is_empty() {
                return self.most_specific(name, applicable, call.args.len());
            }
        }
        Err(CallError::NotFound {
            name: name.to_string(),
        })
    }

    /// Check one candidate against the call in `phase`, instantiating it if generic.
    fn try_apply(
        &self,
        candidate: &Candidate,
        call: &CallSite<'_>,
        phase: MatchPhase,
        ctx: &TypeParamContext,
    ) -> Result<Option<AppliedMethod>, TypeError> {
        let env = self.env;
        let def = env
            .method(candidate.method)
            .ok_or(TypeError::UnknownMethod(candidate.method))?;
        let n = call.args.len();
        let m = def.params.len();
        let spread = match phase {
            MatchPhase::Varargs => {
                if !def.is_varargs() || n + 1 < m {
                    return Ok(None);
                }
                true
            }
            MatchPhase::Strict | MatchPhase::Loose => {
                if n != m {
                    return Ok(None);
                }
                false
            }
        };

        let mut full = ctx.clone();
        let owner_ctx = owner_context(env, &candidate.owner);
        if let TypeRef::Parameterized(p) = &candidate.owner {
            if !p.args.is_empty() {
                full.push_frame(Frame::for_class(env, p.base, &p.args));
            }
        }

        let mut checked_bounds = Vec::new();
        let type_args = if def.is_generic() {
            let partial: Vec<Option<TypeRef>> = if call.type_args.is_empty() {
                let mut pairs = Vec::with_capacity(n);
                for (idx, actual) in call.args.iter().enumerate() {
                    let Some(formal) = formal_for_arg(def, idx, spread) else {
                        return Ok(None);
                    };
                    pairs.push((substitute(env, &formal, &owner_ctx)?.into_owned(), actual));
                }
                let return_type = substitute(env, &def.return_type, &owner_ctx)?;
                infer_type_args(env, &def.type_params, &pairs, &return_type, call.expected)
            } else if call.type_args.len() == def.type_params.len() {
                call.type_args
                    .iter()
                    .map(|arg| match arg {
                        TypeRef::Primitive(prim) => Some(env.boxed(*prim)),
                        other => Some(other.clone()),
                    })
                    .collect()
            } else {
                tracing::trace!(name = %def.name, "explicit type argument count mismatch");
                return Ok(None);
            };
            for (var, arg) in def.type_params.iter().zip(&partial) {
                if let Some(arg) = arg {
                    checked_bounds.push((*var, arg.clone()));
                }
            }
            complete_type_args(env, candidate.method, &def.type_params, &partial, &full)?
        } else {
            Vec::new()
        };
        if def.is_generic() {
            full.push_frame(Frame::for_method(env, candidate.method, &type_args));
        }

        for (var, arg) in &checked_bounds {
            let Some(bound) = env.type_param(*var).map(|p| &p.bound) else {
                continue;
            };
            if !is_assignable_from(env, bound, arg, AssignSemantics::Loose, &full) {
                tracing::trace!(
                    name = %def.name,
                    arg = %TypeDisplay::new(env, arg),
                    "inferred type argument outside its bound"
                );
                return Ok(None);
            }
        }

        let params = def
            .params
            .iter()
            .map(|p| substitute(env, &p.ty, &full).map(|ty| ty.into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = substitute(env, &def.return_type, &full)?.into_owned();
        let applied = AppliedMethod {
            method: candidate.method,
            owner: candidate.owner.clone(),
            type_args,
            params,
            return_type,
            used_varargs: spread,
            phase,
        };

        for (idx, actual) in call.args.iter().enumerate() {
            let Some(formal) = applied.param_for_arg(idx) else {
                return Ok(None);
            };
            if !is_assignable_from(env, &formal, actual, phase.semantics(), ctx) {
                tracing::trace!(
                    name = %def.name,
                    ?phase,
                    arg = idx,
                    expected = %TypeDisplay::new(env, &formal),
                    found = %TypeDisplay::new(env, actual),
                    "candidate rejected"
                );
                return Ok(None);
            }
        }
        Ok(Some(applied))
    }

    /// Pick the single most specific of `applicable`, or report the tie.
    fn most_specific(
        &self,
        name: &str,
        mut applicable: Vec<AppliedMethod>,
        arg_count: usize,
    ) -> Result<AppliedMethod, CallError> {
        if applicable.len() == 1 {
            return Ok(applicable.swap_remove(0));
        }
        let env = self.env;
        // Spread candidates are also compared one position past the arguments, so the
        // repeating element types decide between `f(Object...)` and `f(String...)`.
        let beats = |a: &AppliedMethod, b: &AppliedMethod| {
            let empty = TypeParamContext::new();
            let positions = arg_count.max(a.params.len()).max(b.params.len());
            (0..positions).all(|idx| match (a.param_for_arg(idx), b.param_for_arg(idx)) {
                (Some(pa), Some(pb)) => {
                    is_assignable_from(env, &pb, &pa, AssignSemantics::Strict, &empty)
                }
                _ => false,
            })
        };

        let maximal = maximal_indices(applicable.len(), |i, j| {
            beats(&applicable[i], &applicable[j])
        });

        let mutually_equivalent = maximal.iter().all(|&i| {
            maximal
                .iter()
                .all(|&j| i == j || beats(&applicable[i], &applicable[j]))
        });
        let mut remaining = maximal;
        if remaining.len() > 1 && mutually_equivalent {
            remaining = self.break_tie(&applicable, remaining);
        }

        if let [winner] = remaining[..] {
            return Ok(applicable.swap_remove(winner));
        }
        let mut candidates: Vec<String> = remaining
            .iter()
            .map(|&i| describe(env, &applicable[i]))
            .collect();
        candidates.sort();
        candidates.dedup();
        tracing::debug!(name, ?candidates, "ambiguous call");
        Err(CallError::Ambiguous {
            name: name.to_string(),
            candidates,
        })
    }

    /// Among candidates with the same signature: the non-repeating form, then the most
    /// derived owner, then a non-generic method.
    fn break_tie(&self, applicable: &[AppliedMethod], mut remaining: Vec<usize>) -> Vec<usize> {
        let env = self.env;
        let method = |i: usize| env.method(applicable[i].method);

        let fixed: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| method(i).is_some_and(|m| !m.is_varargs()))
            .collect();
        if !fixed.is_empty() {
            remaining = fixed;
        }

        let owner_of = |i: usize| method(i).map(|m| m.owner);
        let derived: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| {
                let Some(mine) = owner_of(i) else {
                    return false;
                };
                remaining.iter().all(|&j| match owner_of(j) {
                    Some(other) if other != mine => !is_subclass(env, other, mine),
                    _ => true,
                })
            })
            .collect();
        if !derived.is_empty() {
            remaining = derived;
        }

        let plain: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| method(i).is_some_and(|m| !m.is_generic()))
            .collect();
        if !plain.is_empty() {
            remaining = plain;
        }
        remaining
    }
}

/// Indices no other index strictly beats, or every index when each one is beaten.
fn maximal_indices(len: usize, beats: impl Fn(usize, usize) -> bool) -> Vec<usize> {
    let maximal: Vec<usize> = (0..len)
        .filter(|&i| (0..len).all(|j| i == j || !beats(j, i) || beats(i, j)))
        .collect();
    if maximal.is_empty() {
        (0..len).collect()
    } else {
        maximal
    }
}

/// Context mapping the declaring class's formals onto the owner's arguments.
fn owner_context(env: &dyn TypeEnv, owner: &TypeRef) -> TypeParamContext {
    match owner {
        TypeRef::Parameterized(p) if !p.args.is_empty() => {
            TypeParamContext::for_instantiation(env, p.base, &p.args)
        }
        _ => TypeParamContext::new(),
    }
}

/// Declared formal that argument `idx` is matched against.
fn formal_for_arg(def: &MethodDef, idx: usize, spread: bool) -> Option<TypeRef> {
    let last = def.params.len().checked_sub(1);
    match last {
        Some(last) if spread && idx >= last => def.params.get(last)?.ty.element_type(),
        _ => def.params.get(idx).map(|p| p.ty.clone()),
    }
}

/// `Owner.name(P1, P2)` for ambiguity reports.
fn describe(env: &dyn TypeEnv, applied: &AppliedMethod) -> String {
    let Some(def) = env.method(applied.method) else {
        return format!("{:?}", applied.method);
    };
    let owner: Name = env
        .class(def.owner)
        .map(|class| class.name.clone())
        .unwrap_or_default();
    let params: Vec<String> = applied
        .params
        .iter()
        .map(|ty| TypeDisplay::new(env, ty).to_string())
        .collect();
    format!("{owner}.{}({})", def.name, params.join(", "))
}
