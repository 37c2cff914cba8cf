//! Name to field, accessor, enum constant, method or variable.

use std::cell::OnceCell;

use strata_core::{Modifiers, Name};
use strata_types::{
    instantiate_as_supertype, resolve_class_definition, resolve_method_definition, substitute,
    ClassDef, ClassId, FieldId, Frame, MethodDef, MethodId, PrimitiveType, TypeEnv, TypeError,
    TypeParamContext, TypeRef,
};

use crate::cache::{Found, MemberKey};
use crate::resolver::this_type;
use crate::scopes::{ScopeEntry, ScopeId, ScopeKind, ScopeTree};
use crate::{AccessContext, Resolver};

bitflags::bitflags! {
    /// Which kinds of member a lookup accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberKinds: u8 {
        const FIELD = 1 << 0;
        /// `getX()` / `isX()`.
        const GET_ACCESSOR = 1 << 1;
        /// `setX(value)`.
        const SET_ACCESSOR = 1 << 2;
        const ENUM_CONSTANT = 1 << 3;
        /// Locals and parameters.
        const VARIABLE = 1 << 4;
        /// Callable members. A method named `x` outranks a field named `x`.
        const METHOD = 1 << 5;
        /// Query flag: binding-mode lookup, where bindable accessors win.
        const BINDING = 1 << 6;

        const ACCESSORS = Self::GET_ACCESSOR.bits() | Self::SET_ACCESSOR.bits();
        /// Everything a plain read of a simple name may refer to.
        const READ = Self::FIELD.bits()
            | Self::GET_ACCESSOR.bits()
            | Self::ENUM_CONSTANT.bits()
            | Self::VARIABLE.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    GetAccessor,
    SetAccessor,
    EnumConstant,
    Local,
    Parameter,
    Method,
}

/// The declaration a member resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberOrigin {
    Field(FieldId),
    Method(MethodId),
    EnumConstant { class: ClassId, ordinal: usize },
    Variable { scope: ScopeId },
}

/// A resolved member.
///
/// When the member was reached through a parameterized owner (or a caller context with
/// bindings), its declared type is substituted on first access to
/// [`Member::declared_type`] and cached; the raw declaration is shared by every
/// instantiation.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: Name,
    pub kind: MemberKind,
    pub origin: MemberOrigin,
    /// The type the member was found through, viewed as the declaring class.
    /// `None` for locals and parameters.
    pub owner: Option<TypeRef>,
    pub modifiers: Modifiers,
    declared: TypeRef,
    view: Option<TypeParamContext>,
    resolved: OnceCell<TypeRef>,
}

impl Member {
    fn new(
        name: Name,
        kind: MemberKind,
        origin: MemberOrigin,
        owner: Option<TypeRef>,
        modifiers: Modifiers,
        declared: TypeRef,
        view: Option<TypeParamContext>,
    ) -> Self {
        Self {
            name,
            kind,
            origin,
            owner,
            modifiers,
            declared,
            view,
            resolved: OnceCell::new(),
        }
    }

    /// The member's type as seen through its owner.
    pub fn declared_type(&self, env: &dyn TypeEnv) -> Result<&TypeRef, TypeError> {
        if let Some(ty) = self.resolved.get() {
            return Ok(ty);
        }
        let ty = match &self.view {
            Some(ctx) => substitute(env, &self.declared, ctx)?.into_owned(),
            None => self.declared.clone(),
        };
        Ok(self.resolved.get_or_init(|| ty))
    }

    /// The type exactly as written on the declaration.
    #[must_use]
    pub fn raw_type(&self) -> &TypeRef {
        &self.declared
    }

    /// Whether [`Member::declared_type`] has been computed yet.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.resolved.get().is_some()
    }

    #[must_use]
    pub fn method(&self) -> Option<MethodId> {
        match self.origin {
            MemberOrigin::Method(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn field(&self) -> Option<FieldId> {
        match self.origin {
            MemberOrigin::Field(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_bindable(&self) -> bool {
        self.modifiers.is_bindable()
    }
}

/// Field and accessors registered for one logical property.
#[derive(Debug, Clone)]
pub struct PropertyMembers {
    pub field: Option<Member>,
    pub getter: Option<Member>,
    pub setter: Option<Member>,
}

/// What a property reference binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget {
    Field,
    Accessors,
}

impl PropertyMembers {
    /// A binding-mode reference goes through the accessors when either of them is
    /// bindable (or there is no field); a plain reference prefers the field.
    pub fn target(&self, binding: bool) -> PropertyTarget {
        let has_accessor = self.getter.is_some() || self.setter.is_some();
        let bindable = [&self.getter, &self.setter]
            .into_iter()
            .flatten()
            .any(Member::is_bindable);
        match (&self.field, binding && bindable) {
            (_, true) => PropertyTarget::Accessors,
            (None, _) if has_accessor => PropertyTarget::Accessors,
            _ => PropertyTarget::Field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessorRole {
    Get,
    Set,
}

impl<'a> Resolver<'a> {
    /// Resolve a simple name from inside `scope`.
    ///
    /// Searches outward: the block and its enclosing blocks, the method's parameters, the
    /// enclosing class body, its superclasses, its interfaces (unless `skip_interfaces`),
    /// then the next enclosing class. Inside a static method or a static nested class,
    /// outer classes contribute only static members. A miss is `Ok(None)`.
    #[allow(clippy::too_many_arguments)]
    pub fn find_member(
        &self,
        scopes: &ScopeTree,
        scope: ScopeId,
        name: &str,
        kinds: MemberKinds,
        access: &AccessContext,
        ctx: &TypeParamContext,
        skip_interfaces: bool,
    ) -> Result<Option<Member>, TypeError> {
        tracing::debug!(name, ?kinds, ?scope, "find_member");
        let mut access = *access;
        for (id, data) in scopes.ancestors(scope) {
            match data.kind() {
                ScopeKind::Block | ScopeKind::Method(_) => {
                    if kinds.contains(MemberKinds::VARIABLE) {
                        if let Some(entry) = data.entries().get(name) {
                            return Ok(Some(variable_member(name, id, entry, ctx)));
                        }
                    }
                    if let ScopeKind::Method(method) = data.kind() {
                        if self.env.method(method).is_some_and(MethodDef::is_static) {
                            access.static_only = true;
                        }
                    }
                }
                ScopeKind::Class(class) => {
                    let this = this_type(self.env, class);
                    if let Some(member) =
                        self.find_member_in_type(&this, name, kinds, &access, ctx, skip_interfaces)?
                    {
                        return Ok(Some(member));
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
        Ok(None)
    }

    /// Resolve `name` as a member of `owner` (`expr.name` where `expr: owner`).
    ///
    /// With [`MemberKinds::BINDING`], a bindable accessor anywhere in the hierarchy is
    /// preferred. A method anywhere in the hierarchy outranks fields when
    /// [`MemberKinds::METHOD`] is asked for. Otherwise the nearest declaration wins, a
    /// field before an accessor of the same body.
    pub fn find_member_in_type(
        &self,
        owner: &TypeRef,
        name: &str,
        kinds: MemberKinds,
        access: &AccessContext,
        ctx: &TypeParamContext,
        skip_interfaces: bool,
    ) -> Result<Option<Member>, TypeError> {
        let Some((start, class)) = self.receiver(owner, ctx)? else {
            return Ok(None);
        };

        if kinds.contains(MemberKinds::BINDING)
            && kinds.intersects(MemberKinds::ACCESSORS)
            && self.policy.bindable_accessors
        {
            let binding_kinds = (kinds & MemberKinds::ACCESSORS) | MemberKinds::BINDING;
            if let Some(found) =
                self.search_hierarchy(class, name, binding_kinds, access, skip_interfaces)?
            {
                return self.materialize(found, &start, ctx).map(Some);
            }
        }

        let plain_kinds = kinds - MemberKinds::BINDING - MemberKinds::VARIABLE;
        if plain_kinds.contains(MemberKinds::METHOD) {
            if let Some(found) =
                self.search_hierarchy(class, name, MemberKinds::METHOD, access, skip_interfaces)?
            {
                return self.materialize(found, &start, ctx).map(Some);
            }
        }
        let rest = plain_kinds - MemberKinds::METHOD;
        if rest.is_empty() {
            return Ok(None);
        }
        match self.search_hierarchy(class, name, rest, access, skip_interfaces)? {
            Some(found) => self.materialize(found, &start, ctx).map(Some),
            None => Ok(None),
        }
    }

    /// The field, getter and setter registered for property `name` on `owner`.
    ///
    /// `None` when none of the three exists.
    pub fn find_property(
        &self,
        owner: &TypeRef,
        name: &str,
        access: &AccessContext,
    ) -> Result<Option<PropertyMembers>, TypeError> {
        tracing::debug!(name, "find_property");
        let ctx = TypeParamContext::new();
        let lookup = |kinds| self.find_member_in_type(owner, name, kinds, access, &ctx, false);
        let members = PropertyMembers {
            field: lookup(MemberKinds::FIELD)?,
            getter: lookup(MemberKinds::GET_ACCESSOR)?,
            setter: lookup(MemberKinds::SET_ACCESSOR)?,
        };
        if members.field.is_none() && members.getter.is_none() && members.setter.is_none() {
            return Ok(None);
        }
        Ok(Some(members))
    }

    fn search_hierarchy(
        &self,
        class: ClassId,
        name: &str,
        kinds: MemberKinds,
        access: &AccessContext,
        skip_interfaces: bool,
    ) -> Result<Option<Found>, TypeError> {
        let key = MemberKey {
            class,
            name: Name::from(name),
            kinds,
            access: *access,
            skip_interfaces,
        };
        if let Some(hit) = self.cache.and_then(|cache| cache.get(&key)) {
            return Ok(hit);
        }

        let env = self.env;
        let canonical = resolve_class_definition(env, class)?;
        let resolved = env.resolve_class(canonical)?;
        let mut order = vec![canonical];
        order.extend(resolved.superclasses.iter().copied());
        if !skip_interfaces {
            order.extend(resolved.interfaces.iter().copied());
        }
        if env.class(canonical).is_some_and(ClassDef::is_interface) {
            order.push(env.well_known().object);
        }

        let mut found = None;
        for candidate in order.iter().copied() {
            if let Some(hit) = self.search_body(candidate, name, kinds, access)? {
                found = Some(hit);
                break;
            }
        }

        if let Some(cache) = self.cache {
            let mut depends_on = order;
            depends_on.push(class);
            cache.insert(key, found, depends_on);
        }
        Ok(found)
    }

    /// Look for `name` among the declarations of one class body.
    fn search_body(
        &self,
        class: ClassId,
        name: &str,
        kinds: MemberKinds,
        access: &AccessContext,
    ) -> Result<Option<Found>, TypeError> {
        let env = self.env;
        let Some(def) = env.class(class) else {
            return Ok(None);
        };
        let usable = |modifiers: Modifiers, layer| {
            access.can_access(env, class, modifiers, layer)
                && (!access.static_only || modifiers.is_static())
        };
        let bindable_only = kinds.contains(MemberKinds::BINDING);

        if !bindable_only {
            if kinds.contains(MemberKinds::METHOD) {
                for method in def.methods.iter().copied() {
                    let method = resolve_method_definition(env, method)?;
                    let Some(m) = env.method(method) else {
                        continue;
                    };
                    if m.name == name && usable(m.modifiers, m.layer) {
                        return Ok(Some(Found {
                            kind: MemberKind::Method,
                            origin: MemberOrigin::Method(method),
                            class,
                        }));
                    }
                }
            }
            if kinds.contains(MemberKinds::ENUM_CONSTANT) {
                if let Some(ordinal) = def.enum_constants.iter().position(|c| *c == name) {
                    return Ok(Some(Found {
                        kind: MemberKind::EnumConstant,
                        origin: MemberOrigin::EnumConstant { class, ordinal },
                        class,
                    }));
                }
            }
            if kinds.contains(MemberKinds::FIELD) {
                for field in def.fields.iter().copied() {
                    let Some(f) = env.field(field) else {
                        continue;
                    };
                    if f.name == name && usable(f.modifiers, f.layer) {
                        return Ok(Some(Found {
                            kind: MemberKind::Field,
                            origin: MemberOrigin::Field(field),
                            class,
                        }));
                    }
                }
            }
        }

        let roles = [
            (MemberKinds::GET_ACCESSOR, AccessorRole::Get),
            (MemberKinds::SET_ACCESSOR, AccessorRole::Set),
        ];
        for (flag, role) in roles {
            if !kinds.contains(flag) {
                continue;
            }
            for method in def.methods.iter().copied() {
                let method = resolve_method_definition(env, method)?;
                let Some(m) = env.method(method) else {
                    continue;
                };
                if !is_accessor(m, name, role) || !usable(m.modifiers, m.layer) {
                    continue;
                }
                if bindable_only && !m.modifiers.is_bindable() {
                    continue;
                }
                let kind = match role {
                    AccessorRole::Get => MemberKind::GetAccessor,
                    AccessorRole::Set => MemberKind::SetAccessor,
                };
                return Ok(Some(Found {
                    kind,
                    origin: MemberOrigin::Method(method),
                    class,
                }));
            }
        }
        Ok(None)
    }

    /// Turn a found declaration into a [`Member`] viewed through `start`.
    fn materialize(
        &self,
        found: Found,
        start: &TypeRef,
        ctx: &TypeParamContext,
    ) -> Result<Member, TypeError> {
        let env = self.env;
        let owner = if start.class_id() == Some(found.class) {
            start.clone()
        } else {
            instantiate_as_supertype(env, start, found.class)
                .unwrap_or_else(|| env.class_type(found.class))
        };

        let mut view = ctx.clone();
        if let TypeRef::Parameterized(p) = &owner {
            if !p.args.is_empty() {
                view.push_frame(Frame::for_class(env, p.base, &p.args));
            }
        }
        let view = (!view.is_empty()).then_some(view);

        let (name, modifiers, declared) = match found.origin {
            MemberOrigin::Field(id) => {
                let f = env.field(id).ok_or(TypeError::UnknownClass(found.class))?;
                (f.name.clone(), f.modifiers, f.ty.clone())
            }
            MemberOrigin::Method(id) => {
                let m = env.method(id).ok_or(TypeError::UnknownMethod(id))?;
                let ty = match found.kind {
                    MemberKind::SetAccessor => m
                        .params
                        .first()
                        .map(|p| p.ty.clone())
                        .unwrap_or(TypeRef::Void),
                    _ => m.return_type.clone(),
                };
                (m.name.clone(), m.modifiers, ty)
            }
            MemberOrigin::EnumConstant { class, ordinal } => {
                let def = env.class(class).ok_or(TypeError::UnknownClass(class))?;
                let name = def
                    .enum_constants
                    .get(ordinal)
                    .cloned()
                    .unwrap_or_default();
                (
                    name,
                    Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
                    env.class_type(class),
                )
            }
            MemberOrigin::Variable { .. } => {
                return Err(TypeError::UnknownClass(found.class));
            }
        };

        Ok(Member::new(
            name,
            found.kind,
            found.origin,
            Some(owner),
            modifiers,
            declared,
            view,
        ))
    }
}

fn variable_member(
    name: &str,
    scope: ScopeId,
    entry: &ScopeEntry,
    ctx: &TypeParamContext,
) -> Member {
    let kind = match entry {
        ScopeEntry::Local(_) => MemberKind::Local,
        ScopeEntry::Param { .. } => MemberKind::Parameter,
    };
    let view = (!ctx.is_empty()).then(|| ctx.clone());
    Member::new(
        Name::from(name),
        kind,
        MemberOrigin::Variable { scope },
        None,
        Modifiers::empty(),
        entry.ty().clone(),
        view,
    )
}

/// Whether `method` is the `role` accessor of property `property`.
fn is_accessor(method: &MethodDef, property: &str, role: AccessorRole) -> bool {
    let Some(suffix) = capitalize(property) else {
        return false;
    };
    let name = method.name.as_str();
    match role {
        AccessorRole::Get => {
            if !method.params.is_empty() || method.return_type == TypeRef::Void {
                return false;
            }
            name.strip_prefix("get") == Some(suffix.as_str())
                || (name.strip_prefix("is") == Some(suffix.as_str())
                    && method.return_type == TypeRef::Primitive(PrimitiveType::Boolean))
        }
        AccessorRole::Set => {
            method.params.len() == 1 && name.strip_prefix("set") == Some(suffix.as_str())
        }
    }
}

fn capitalize(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}
