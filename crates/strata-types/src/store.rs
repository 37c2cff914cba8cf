use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use strata_core::{EngineLimits, LayerId, Modifiers, Name};

use crate::layers::resolve_class_definition;
use crate::{
    ClassId, FieldId, GenericOwner, MethodId, PrimitiveType, TypeEnv, TypeError, TypeRef,
    TypeVarId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

/// Where a class body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassOrigin {
    /// Parsed from a source layer.
    Declared { layer: LayerId },
    /// Materialized by the host reflection bridge.
    Reflected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    /// Dotted binary name (`com.example.Outer$Inner` for nested types).
    pub name: Name,
    pub origin: ClassOrigin,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    pub constructors: Vec<MethodId>,
    pub enum_constants: Vec<Name>,
    pub enclosing: Option<ClassId>,
}

impl ClassDef {
    pub fn new(name: impl Into<Name>, origin: ClassOrigin) -> Self {
        Self {
            name: name.into(),
            origin,
            kind: ClassKind::Class,
            modifiers: Modifiers::PUBLIC,
            type_params: Vec::new(),
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            enum_constants: Vec::new(),
            enclosing: None,
        }
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, ClassKind::Interface | ClassKind::Annotation)
    }

    pub fn layer(&self) -> Option<LayerId> {
        match self.origin {
            ClassOrigin::Declared { layer } => Some(layer),
            ClassOrigin::Reflected => None,
        }
    }

    /// Package name derived from the binary name.
    pub fn package(&self) -> &str {
        self.name.package()
    }
}

/// A formal parameter. A repeating (vararg) parameter stores its full array type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: TypeRef,
    pub is_repeating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: Name,
    pub owner: ClassId,
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Param>,
    pub return_type: TypeRef,
    pub modifiers: Modifiers,
    pub is_constructor: bool,
    pub layer: Option<LayerId>,
    /// Set when a later layer supplies a modify-declaration for this method.
    pub replaced_by: Option<MethodId>,
}

impl MethodDef {
    #[inline]
    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_repeating)
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn param_types(&self) -> impl Iterator<Item = &TypeRef> + '_ {
        self.params.iter().map(|p| &p.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: Name,
    pub owner: ClassId,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
    pub layer: Option<LayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: Name,
    pub owner: GenericOwner,
    /// Used whenever the variable has no binding in the active context.
    pub bound: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
    pub number: ClassId,
    pub boolean: ClassId,
    pub byte: ClassId,
    pub short: ClassId,
    pub character: ClassId,
    pub integer: ClassId,
    pub long: ClassId,
    pub float: ClassId,
    pub double: ClassId,
    pub comparable: ClassId,
    pub iterable: ClassId,
    pub collection: ClassId,
    pub list: ClassId,
    pub array_list: ClassId,
    pub map: ClassId,
    pub enum_: ClassId,
}

impl WellKnownTypes {
    pub fn box_of(&self, prim: PrimitiveType) -> ClassId {
        match prim {
            PrimitiveType::Boolean => self.boolean,
            PrimitiveType::Byte => self.byte,
            PrimitiveType::Short => self.short,
            PrimitiveType::Char => self.character,
            PrimitiveType::Int => self.integer,
            PrimitiveType::Long => self.long,
            PrimitiveType::Float => self.float,
            PrimitiveType::Double => self.double,
        }
    }

    pub fn unbox(&self, class: ClassId) -> Option<PrimitiveType> {
        PrimitiveType::ALL
            .into_iter()
            .find(|prim| self.box_of(*prim) == class)
    }
}

/// Superclass chain and interface closure of a resolved class, in lookup order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClass {
    pub id: ClassId,
    /// Direct superclass first, `Object` last.
    pub superclasses: Vec<ClassId>,
    /// Direct interfaces first (each followed by its super-interfaces), then inherited ones.
    pub interfaces: Vec<ClassId>,
}

impl ResolvedClass {
    pub fn ancestors(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.superclasses
            .iter()
            .chain(self.interfaces.iter())
            .copied()
    }

    pub fn has_ancestor(&self, id: ClassId) -> bool {
        self.superclasses.contains(&id) || self.interfaces.contains(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolutionState {
    #[default]
    Unresolved,
    /// Sentinel held while the class's supertypes are being resolved.
    Resolving,
    Resolved(Rc<ResolvedClass>),
    Failed(TypeError),
}

#[derive(Debug, Clone)]
struct ClassSlot {
    name: Name,
    def: Option<ClassDef>,
    replaced_by: Option<ClassId>,
    state: RefCell<ResolutionState>,
    /// Members added while the slot was still a placeholder.
    pending: Vec<OwnedMember>,
}

impl ClassSlot {
    fn placeholder(name: Name) -> Self {
        Self {
            name,
            def: None,
            replaced_by: None,
            state: RefCell::new(ResolutionState::Unresolved),
            pending: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnedMember {
    Field(FieldId),
    Method(MethodId),
    Constructor(MethodId),
}

impl OwnedMember {
    fn push_into(self, def: &mut ClassDef) {
        match self {
            OwnedMember::Field(id) => def.fields.push(id),
            OwnedMember::Method(id) => def.methods.push(id),
            OwnedMember::Constructor(id) => def.constructors.push(id),
        }
    }
}

/// Arena of every class, method, field and type parameter known to the engine.
///
/// Resolution state lives next to each class node in a `RefCell`: queries take `&self`
/// and the engine is single-threaded, so the store is deliberately `!Sync`.
#[derive(Debug, Clone)]
pub struct TypeStore {
    classes: Vec<ClassSlot>,
    class_by_name: HashMap<Name, ClassId>,
    methods: Vec<MethodDef>,
    fields: Vec<FieldDef>,
    type_params: Vec<TypeParamDef>,
    type_param_index: HashMap<(GenericOwner, Name), TypeVarId>,
    well_known: WellKnownTypes,
    limits: EngineLimits,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStore {
    /// An empty store. Well-known class ids are reserved but left undefined.
    pub fn new() -> Self {
        let mut store = TypeStore {
            classes: Vec::new(),
            class_by_name: HashMap::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            type_params: Vec::new(),
            type_param_index: HashMap::new(),
            well_known: WellKnownTypes {
                object: ClassId(0),
                string: ClassId(0),
                cloneable: ClassId(0),
                serializable: ClassId(0),
                number: ClassId(0),
                boolean: ClassId(0),
                byte: ClassId(0),
                short: ClassId(0),
                character: ClassId(0),
                integer: ClassId(0),
                long: ClassId(0),
                float: ClassId(0),
                double: ClassId(0),
                comparable: ClassId(0),
                iterable: ClassId(0),
                collection: ClassId(0),
                list: ClassId(0),
                array_list: ClassId(0),
                map: ClassId(0),
                enum_: ClassId(0),
            },
            limits: EngineLimits::default(),
        };
        store.well_known = WellKnownTypes {
            object: store.intern_class_id("java.lang.Object"),
            string: store.intern_class_id("java.lang.String"),
            cloneable: store.intern_class_id("java.lang.Cloneable"),
            serializable: store.intern_class_id("java.io.Serializable"),
            number: store.intern_class_id("java.lang.Number"),
            boolean: store.intern_class_id("java.lang.Boolean"),
            byte: store.intern_class_id("java.lang.Byte"),
            short: store.intern_class_id("java.lang.Short"),
            character: store.intern_class_id("java.lang.Character"),
            integer: store.intern_class_id("java.lang.Integer"),
            long: store.intern_class_id("java.lang.Long"),
            float: store.intern_class_id("java.lang.Float"),
            double: store.intern_class_id("java.lang.Double"),
            comparable: store.intern_class_id("java.lang.Comparable"),
            iterable: store.intern_class_id("java.lang.Iterable"),
            collection: store.intern_class_id("java.util.Collection"),
            list: store.intern_class_id("java.util.List"),
            array_list: store.intern_class_id("java.util.ArrayList"),
            map: store.intern_class_id("java.util.Map"),
            enum_: store.intern_class_id("java.lang.Enum"),
        };
        store
    }

    pub fn set_limits(&mut self, limits: EngineLimits) {
        self.limits = limits;
    }

    /// Reserve (or find) the class slot for `name` without defining it.
    pub fn intern_class_id(&mut self, name: impl Into<Name>) -> ClassId {
        let name = name.into();
        if let Some(id) = self.class_by_name.get(&name) {
            return *id;
        }
        let id = ClassId::from_index(self.classes.len());
        self.classes.push(ClassSlot::placeholder(name.clone()));
        self.class_by_name.insert(name, id);
        id
    }

    /// Id of the class registered under `name`, whether or not it has a body yet.
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_by_name.get(name).copied()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Install (or replace) the body of `id`.
    ///
    /// Members added while `id` was a placeholder are attached to the new body and take
    /// its layer.
    pub fn define_class(&mut self, id: ClassId, mut def: ClassDef) {
        let Some(slot) = self.classes.get_mut(id.index()) else {
            tracing::warn!(?id, class = %def.name, "class body for an unknown slot dropped");
            return;
        };
        let pending = std::mem::take(&mut slot.pending);
        for member in &pending {
            member.push_into(&mut def);
        }
        let layer = def.layer();
        slot.name = def.name.clone();
        slot.def = Some(def);
        for member in pending {
            match member {
                OwnedMember::Field(field) => {
                    if let Some(f) = self.fields.get_mut(field.index()) {
                        f.layer = f.layer.or(layer);
                    }
                }
                OwnedMember::Method(method) | OwnedMember::Constructor(method) => {
                    if let Some(m) = self.methods.get_mut(method.index()) {
                        m.layer = m.layer.or(layer);
                    }
                }
            }
        }
        self.invalidate_dependents(id);
    }

    /// Add `member` to the body of `owner`, or hold it until the body is defined.
    fn attach_member(&mut self, owner: ClassId, member: OwnedMember) {
        let Some(slot) = self.classes.get_mut(owner.index()) else {
            tracing::warn!(?owner, ?member, "member added to an unknown class dropped");
            return;
        };
        match slot.def.as_mut() {
            Some(def) => member.push_into(def),
            None => {
                tracing::debug!(class = %slot.name, ?member, "member held for a placeholder class");
                slot.pending.push(member);
            }
        }
    }

    /// Mutable access to a class body. Any cached resolution touching it is discarded.
    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.invalidate_dependents(id);
        self.classes.get_mut(id.index())?.def.as_mut()
    }

    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut MethodDef> {
        self.methods.get_mut(id.index())
    }

    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut FieldDef> {
        self.fields.get_mut(id.index())
    }

    /// Start a source-layer class. Reuses the slot already registered under `name`.
    pub fn declare_class(&mut self, name: impl Into<Name>, layer: LayerId) -> ClassBuilder<'_> {
        let name = name.into();
        let id = self.intern_class_id(name.clone());
        ClassBuilder::new(self, id, ClassDef::new(name, ClassOrigin::Declared { layer }))
    }

    /// Start a host-reflected class. Reuses the slot already registered under `name`.
    pub fn reflect_class(&mut self, name: impl Into<Name>) -> ClassBuilder<'_> {
        let name = name.into();
        let id = self.intern_class_id(name.clone());
        ClassBuilder::new(self, id, ClassDef::new(name, ClassOrigin::Reflected))
    }

    /// Start a modify-declaration of `previous` in `layer`.
    ///
    /// The new body gets its own slot; finishing the builder points `previous.replaced_by`
    /// at it so existing references transparently redirect.
    pub fn declare_modification(
        &mut self,
        previous: ClassId,
        layer: LayerId,
    ) -> Result<ClassBuilder<'_>, TypeError> {
        let prev = self
            .class(previous)
            .ok_or(TypeError::UnknownClass(previous))?;
        if prev.is_interface() {
            return Err(TypeError::NotModifiable {
                name: prev.name.to_string(),
            });
        }
        let mut def = ClassDef::new(prev.name.clone(), ClassOrigin::Declared { layer });
        def.kind = prev.kind;
        def.modifiers = prev.modifiers;
        def.enclosing = prev.enclosing;
        let id = ClassId::from_index(self.classes.len());
        self.classes.push(ClassSlot::placeholder(def.name.clone()));
        let mut builder = ClassBuilder::new(self, id, def);
        builder.replaces = Some(previous);
        Ok(builder)
    }

    /// Point `previous` at `replacement`. Interfaces cannot be redirected.
    pub fn set_class_replaced_by(
        &mut self,
        previous: ClassId,
        replacement: ClassId,
    ) -> Result<(), TypeError> {
        let prev = self
            .class(previous)
            .ok_or(TypeError::UnknownClass(previous))?;
        if prev.is_interface() {
            return Err(TypeError::NotModifiable {
                name: prev.name.to_string(),
            });
        }
        if let Some(slot) = self.classes.get_mut(previous.index()) {
            slot.replaced_by = Some(replacement);
        }
        self.invalidate_all();
        Ok(())
    }

    /// Point method `previous` at `replacement`. Methods of interfaces cannot be redirected.
    pub fn set_method_replaced_by(
        &mut self,
        previous: MethodId,
        replacement: MethodId,
    ) -> Result<(), TypeError> {
        let owner = self
            .method(previous)
            .map(|m| m.owner)
            .ok_or(TypeError::UnknownMethod(previous))?;
        if let Some(owner_def) = self.class(owner) {
            if owner_def.is_interface() {
                return Err(TypeError::NotModifiable {
                    name: owner_def.name.to_string(),
                });
            }
        }
        if let Some(method) = self.methods.get_mut(previous.index()) {
            method.replaced_by = Some(replacement);
        }
        Ok(())
    }

    /// Allocate a type parameter, or return the existing one for the same `(owner, name)`.
    pub fn add_type_param(
        &mut self,
        owner: GenericOwner,
        name: impl Into<Name>,
        bound: TypeRef,
    ) -> TypeVarId {
        let name = name.into();
        if let Some(id) = self.type_param_index.get(&(owner, name.clone())) {
            return *id;
        }
        let id = TypeVarId::from_index(self.type_params.len());
        self.type_params.push(TypeParamDef {
            name: name.clone(),
            owner,
            bound,
        });
        self.type_param_index.insert((owner, name), id);
        id
    }

    /// Replace the bound of an existing type parameter (self-referential bounds such as
    /// `E extends Enum<E>` need the id before the bound can be written).
    pub fn set_type_param_bound(&mut self, id: TypeVarId, bound: TypeRef) {
        if let Some(def) = self.type_params.get_mut(id.index()) {
            def.bound = bound;
        }
        self.invalidate_all();
    }

    /// Start a method on `owner`.
    pub fn add_method(&mut self, owner: ClassId, name: impl Into<Name>) -> MethodBuilder<'_> {
        MethodBuilder::new(self, owner, name.into(), false)
    }

    /// Start a constructor on `owner`.
    pub fn add_constructor(&mut self, owner: ClassId) -> MethodBuilder<'_> {
        MethodBuilder::new(self, owner, Name::from("<init>"), true)
    }

    pub fn add_field(
        &mut self,
        owner: ClassId,
        name: impl Into<Name>,
        ty: TypeRef,
        modifiers: Modifiers,
    ) -> FieldId {
        let layer = self.class(owner).and_then(ClassDef::layer);
        let id = FieldId::from_index(self.fields.len());
        self.fields.push(FieldDef {
            name: name.into(),
            owner,
            ty,
            modifiers,
            layer,
        });
        self.attach_member(owner, OwnedMember::Field(id));
        id
    }

    /// Forget cached resolution for `id` and for every class whose ancestors include it.
    ///
    /// The layer-merge pipeline calls this after replacing a body that was already resolved.
    pub fn invalidate_class(&self, id: ClassId) {
        self.invalidate_dependents(id);
    }

    /// Forget every cached resolution result.
    pub fn invalidate_all(&self) {
        for slot in &self.classes {
            *slot.state.borrow_mut() = ResolutionState::Unresolved;
        }
    }

    fn invalidate_dependents(&self, id: ClassId) {
        for (idx, slot) in self.classes.iter().enumerate() {
            let mut state = slot.state.borrow_mut();
            let stale = match &*state {
                ResolutionState::Resolved(resolved) => {
                    idx == id.index() || resolved.has_ancestor(id)
                }
                ResolutionState::Failed(_) => true,
                ResolutionState::Unresolved | ResolutionState::Resolving => false,
            };
            if stale {
                *state = ResolutionState::Unresolved;
            }
        }
    }

    /// Current resolution state of `id` (a snapshot).
    pub fn resolution_state(&self, id: ClassId) -> Option<ResolutionState> {
        self.classes
            .get(id.index())
            .map(|slot| slot.state.borrow().clone())
    }

    fn compute_resolved(&self, id: ClassId) -> Result<ResolvedClass, TypeError> {
        let def = self.class(id).ok_or(TypeError::UnknownClass(id))?;
        let mut superclasses = Vec::new();
        let mut interfaces = Vec::new();

        for iface in &def.interfaces {
            let Some(base) = self.check_supertype_clause(iface)? else {
                continue;
            };
            let resolved = self.resolve_class(base)?;
            push_unique(&mut interfaces, base);
            for inherited in resolved.interfaces.iter().copied() {
                push_unique(&mut interfaces, inherited);
            }
        }

        if let Some(super_class) = &def.super_class {
            if let Some(base) = self.check_supertype_clause(super_class)? {
                let resolved = self.resolve_class(base)?;
                superclasses.push(base);
                superclasses.extend(resolved.superclasses.iter().copied());
                for inherited in resolved.interfaces.iter().copied() {
                    push_unique(&mut interfaces, inherited);
                }
            }
        }

        if superclasses.len() + interfaces.len() > self.limits.max_supertype_depth as usize {
            return Err(TypeError::CycleDetected(crate::CycleKind::Inheritance {
                name: def.name.to_string(),
            }));
        }

        Ok(ResolvedClass {
            id,
            superclasses,
            interfaces,
        })
    }

    /// Validate a supertype clause and return the class it names (after layer redirects).
    fn check_supertype_clause(&self, ty: &TypeRef) -> Result<Option<ClassId>, TypeError> {
        let (base, args) = match ty {
            TypeRef::Declared(id) | TypeRef::Reflected(id) => (*id, &[][..]),
            TypeRef::Parameterized(p) => (p.base, &p.args[..]),
            _ => return Ok(None),
        };
        let base = resolve_class_definition(self, base)?;
        let def = self.class(base).ok_or(TypeError::UnknownClass(base))?;
        if !args.is_empty() && args.len() != def.type_params.len() {
            return Err(TypeError::MalformedGenericUsage {
                ty: def.name.to_string(),
                expected: def.type_params.len(),
                found: args.len(),
            });
        }
        Ok(Some(base))
    }
}

fn push_unique(out: &mut Vec<ClassId>, id: ClassId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.index())?.def.as_ref()
    }

    fn class_redirect(&self, id: ClassId) -> Option<ClassId> {
        self.classes.get(id.index())?.replaced_by
    }

    fn method(&self, id: MethodId) -> Option<&MethodDef> {
        self.methods.get(id.index())
    }

    fn field(&self, id: FieldId) -> Option<&FieldDef> {
        self.fields.get(id.index())
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.index())
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        let id = self.class_by_name.get(name).copied()?;
        self.class(id).map(|_| id)
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }

    fn limits(&self) -> EngineLimits {
        self.limits
    }

    fn resolve_class(&self, id: ClassId) -> Result<Rc<ResolvedClass>, TypeError> {
        let slot = self
            .classes
            .get(id.index())
            .ok_or(TypeError::UnknownClass(id))?;

        {
            let state = slot.state.borrow();
            match &*state {
                ResolutionState::Resolved(resolved) => return Ok(Rc::clone(resolved)),
                ResolutionState::Failed(err) => return Err(err.clone()),
                ResolutionState::Resolving => {
                    return Err(TypeError::CycleDetected(crate::CycleKind::Inheritance {
                        name: slot.name.to_string(),
                    }));
                }
                ResolutionState::Unresolved => {}
            }
        }

        tracing::debug!(class = %slot.name, "resolving class");
        *slot.state.borrow_mut() = ResolutionState::Resolving;
        let result = self.compute_resolved(id);

        let mut state = slot.state.borrow_mut();
        match result {
            Ok(resolved) => {
                let resolved = Rc::new(resolved);
                *state = ResolutionState::Resolved(Rc::clone(&resolved));
                Ok(resolved)
            }
            Err(err) => {
                tracing::warn!(class = %slot.name, error = %err, "class resolution failed");
                *state = ResolutionState::Failed(err.clone());
                Err(err)
            }
        }
    }
}

/// Builder returned by [`TypeStore::declare_class`] and friends.
///
/// The class id is reserved up front so self-referential supertypes and bounds can be
/// written before the body is installed.
pub struct ClassBuilder<'s> {
    store: &'s mut TypeStore,
    id: ClassId,
    def: ClassDef,
    replaces: Option<ClassId>,
}

impl<'s> ClassBuilder<'s> {
    fn new(store: &'s mut TypeStore, id: ClassId, def: ClassDef) -> Self {
        Self {
            store,
            id,
            def,
            replaces: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// A reference to the class being built, with the right `Declared`/`Reflected` variant.
    pub fn this_type(&self) -> TypeRef {
        match self.def.origin {
            ClassOrigin::Declared { .. } => TypeRef::Declared(self.id),
            ClassOrigin::Reflected => TypeRef::Reflected(self.id),
        }
    }

    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.def.kind = kind;
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.def.modifiers = modifiers;
        self
    }

    pub fn extends(mut self, super_class: TypeRef) -> Self {
        self.def.super_class = Some(super_class);
        self
    }

    pub fn implements(mut self, iface: TypeRef) -> Self {
        self.def.interfaces.push(iface);
        self
    }

    pub fn enclosing(mut self, outer: ClassId) -> Self {
        self.def.enclosing = Some(outer);
        self
    }

    pub fn enum_constant(mut self, name: impl Into<Name>) -> Self {
        self.def.enum_constants.push(name.into());
        self
    }

    /// Declare a formal type parameter of the class.
    pub fn type_param(&mut self, name: impl Into<Name>, bound: TypeRef) -> TypeVarId {
        let id = self
            .store
            .add_type_param(GenericOwner::Class(self.id), name, bound);
        if !self.def.type_params.contains(&id) {
            self.def.type_params.push(id);
        }
        id
    }

    /// Rewrite the bound of a parameter declared on this builder.
    pub fn bound(&mut self, param: TypeVarId, bound: TypeRef) {
        self.store.set_type_param_bound(param, bound);
    }

    pub fn finish(self) -> ClassId {
        let ClassBuilder {
            store,
            id,
            mut def,
            replaces,
        } = self;

        let object = store.well_known.object;
        if def.super_class.is_none() && !def.is_interface() && id != object {
            if store.class(object).is_some() {
                def.super_class = Some(store.class_type(object));
            }
        }

        // Keep members added through `add_field`/`add_method` before a redefinition.
        if let Some(existing) = store.class(id) {
            def.fields.extend(existing.fields.iter().copied());
            def.methods.extend(existing.methods.iter().copied());
            def.constructors.extend(existing.constructors.iter().copied());
        }
        store.define_class(id, def);
        if let Some(previous) = replaces {
            if let Some(slot) = store.classes.get_mut(previous.index()) {
                slot.replaced_by = Some(id);
            }
            store.invalidate_all();
        }
        id
    }
}

/// Builder returned by [`TypeStore::add_method`] and [`TypeStore::add_constructor`].
pub struct MethodBuilder<'s> {
    store: &'s mut TypeStore,
    id: MethodId,
    def: MethodDef,
}

impl<'s> MethodBuilder<'s> {
    fn new(store: &'s mut TypeStore, owner: ClassId, name: Name, is_constructor: bool) -> Self {
        let layer = store.class(owner).and_then(ClassDef::layer);
        let def = MethodDef {
            name,
            owner,
            type_params: Vec::new(),
            params: Vec::new(),
            return_type: TypeRef::Void,
            modifiers: Modifiers::PUBLIC,
            is_constructor,
            layer,
            replaced_by: None,
        };
        let id = MethodId::from_index(store.methods.len());
        store.methods.push(def.clone());
        Self { store, id, def }
    }

    #[inline]
    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn type_param(&mut self, name: impl Into<Name>, bound: TypeRef) -> TypeVarId {
        let id = self
            .store
            .add_type_param(GenericOwner::Method(self.id), name, bound);
        if !self.def.type_params.contains(&id) {
            self.def.type_params.push(id);
        }
        id
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.def.params.push(Param {
            ty,
            is_repeating: false,
        });
        self
    }

    /// Trailing repeating parameter; `element` is the per-argument type (`T` in `T...`).
    pub fn repeating(mut self, element: TypeRef) -> Self {
        self.def.params.push(Param {
            ty: TypeRef::array_of(element),
            is_repeating: true,
        });
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.def.return_type = ty;
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.def.modifiers = modifiers;
        self
    }

    pub fn layer(mut self, layer: LayerId) -> Self {
        self.def.layer = Some(layer);
        self
    }

    pub fn finish(self) -> MethodId {
        let MethodBuilder { store, id, def } = self;
        let owner = def.owner;
        let is_constructor = def.is_constructor;
        if let Some(slot) = store.methods.get_mut(id.index()) {
            *slot = def;
        }
        let member = if is_constructor {
            OwnedMember::Constructor(id)
        } else {
            OwnedMember::Method(id)
        };
        store.attach_member(owner, member);
        id
    }
}
