use strata_core::{LayerId, LookupPolicy, Modifiers};
use strata_types::{
    canonical_class, is_subclass, substitute, BoundKind, ClassId, ParameterizedType, TypeEnv,
    TypeError, TypeParamContext, TypeRef, WildcardType,
};

use crate::MemberCache;

/// Entry point for member lookup and overload resolution over a [`TypeEnv`].
///
/// The resolver itself holds no mutable state; memoization lives in an optional,
/// caller-owned [`MemberCache`].
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    pub(crate) env: &'a dyn TypeEnv,
    pub(crate) policy: LookupPolicy,
    pub(crate) cache: Option<&'a MemberCache>,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a dyn TypeEnv) -> Self {
        Self {
            env,
            policy: LookupPolicy::default(),
            cache: None,
        }
    }

    pub fn with_policy(mut self, policy: LookupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cache(mut self, cache: &'a MemberCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn env(&self) -> &'a dyn TypeEnv {
        self.env
    }

    #[must_use]
    pub fn policy(&self) -> LookupPolicy {
        self.policy
    }

    /// The class a member access on `ty` searches, together with the (possibly
    /// parameterized) type it is searched through.
    ///
    /// Type variables and wildcards are replaced by their upper bounds; arrays search
    /// `Object`.
    pub(crate) fn receiver(
        &self,
        ty: &TypeRef,
        ctx: &TypeParamContext,
    ) -> Result<Option<(TypeRef, ClassId)>, TypeError> {
        let env = self.env;
        let mut current = substitute(env, ty, ctx)?.into_owned();
        for _ in 0..=env.limits().max_type_param_depth {
            let next = match current.strip_overlap() {
                TypeRef::Declared(id) | TypeRef::Reflected(id) => {
                    return Ok(Some((current.strip_overlap().clone(), *id)));
                }
                TypeRef::Parameterized(p) => {
                    return Ok(Some((current.strip_overlap().clone(), p.base)));
                }
                TypeRef::Array(_) => {
                    let object = env.well_known().object;
                    return Ok(Some((env.class_type(object), object)));
                }
                TypeRef::TypeVar(var) => match env.type_param(*var) {
                    Some(def) => substitute(env, &def.bound, ctx)?.into_owned(),
                    None => env.object_type(),
                },
                TypeRef::Wildcard(WildcardType {
                    bound_kind: BoundKind::Extends,
                    bound: Some(bound),
                }) => (**bound).clone(),
                TypeRef::Wildcard(_) => env.object_type(),
                TypeRef::Primitive(_) | TypeRef::Void | TypeRef::Null | TypeRef::Overlap(_) => {
                    return Ok(None);
                }
            };
            current = next;
        }
        Ok(None)
    }
}

/// The type of `this` inside `class`: the class applied to its own type parameters.
pub fn this_type(env: &dyn TypeEnv, class: ClassId) -> TypeRef {
    match env.class(class) {
        Some(def) if !def.type_params.is_empty() => TypeRef::Parameterized(ParameterizedType {
            base: class,
            args: def
                .type_params
                .iter()
                .copied()
                .map(TypeRef::TypeVar)
                .collect(),
        }),
        _ => env.class_type(class),
    }
}

/// Where a lookup is made from: the referencing class, its layer, and whether only
/// static members are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessContext {
    /// `None` for code outside any class, which sees only public members.
    pub from: Option<ClassId>,
    pub layer: LayerId,
    pub static_only: bool,
}

impl AccessContext {
    pub fn outside(layer: LayerId) -> Self {
        Self {
            from: None,
            layer,
            static_only: false,
        }
    }

    /// Access from inside `class`, in the class's own layer.
    pub fn from_class(env: &dyn TypeEnv, class: ClassId) -> Self {
        let layer = env
            .class(class)
            .and_then(|def| def.layer())
            .unwrap_or(LayerId::BASE);
        Self {
            from: Some(class),
            layer,
            static_only: false,
        }
    }

    pub fn in_layer(mut self, layer: LayerId) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_static_only(mut self, static_only: bool) -> Self {
        self.static_only = static_only;
        self
    }

    /// Whether a member of `owner` with `modifiers`, declared in `layer`, is visible here.
    pub fn can_access(
        &self,
        env: &dyn TypeEnv,
        owner: ClassId,
        modifiers: Modifiers,
        layer: Option<LayerId>,
    ) -> bool {
        if layer.is_some_and(|layer| !layer.is_visible_from(self.layer)) {
            return false;
        }
        let owner_is_interface = env.class(owner).is_some_and(|def| def.is_interface());
        if owner_is_interface && !modifiers.contains(Modifiers::PRIVATE) {
            return true;
        }
        let Some(from) = self.from else {
            return modifiers.contains(Modifiers::PUBLIC);
        };
        match modifiers.access_level() {
            strata_core::AccessLevel::Public => true,
            strata_core::AccessLevel::Private => outermost(env, from) == outermost(env, owner),
            strata_core::AccessLevel::Package => same_package(env, from, owner),
            strata_core::AccessLevel::Protected => {
                same_package(env, from, owner)
                    || enclosing_chain(env, from).any(|class| is_subclass(env, class, owner))
            }
        }
    }
}

fn same_package(env: &dyn TypeEnv, a: ClassId, b: ClassId) -> bool {
    match (env.class(a), env.class(b)) {
        (Some(a), Some(b)) => a.package() == b.package(),
        _ => false,
    }
}

/// `class` followed by its lexically enclosing classes.
fn enclosing_chain(env: &dyn TypeEnv, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
    let max = env.limits().max_supertype_depth as usize;
    let mut current = Some(canonical_class(env, class));
    std::iter::from_fn(move || {
        let id = current?;
        current = env
            .class(id)
            .and_then(|def| def.enclosing)
            .map(|outer| canonical_class(env, outer));
        Some(id)
    })
    .take(max)
}

fn outermost(env: &dyn TypeEnv, class: ClassId) -> ClassId {
    enclosing_chain(env, class).last().unwrap_or(class)
}
