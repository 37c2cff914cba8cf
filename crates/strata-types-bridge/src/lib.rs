//! Host reflection bridge: materializes `Reflected` classes in a [`TypeStore`] from
//! descriptor-level class stubs.

#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use strata_core::{Modifiers, Name};
use strata_types::{
    ClassDef, ClassId, ClassKind, ClassOrigin, GenericOwner, MethodId, Param, TypeEnv, TypeRef,
    TypeStore, TypeVarId,
};
use thiserror::Error;

mod descriptor;
mod signature;

pub use descriptor::{
    parse_field_descriptor, parse_method_descriptor, FieldType, MethodDescriptor, ReturnType,
};
pub use signature::{
    parse_class_signature, parse_field_signature, parse_method_signature, ClassSignature,
    ClassTypeSignature, MethodSignature, SimpleClassTypeSignature, TypeArgument, TypeParameter,
    TypeSignature,
};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Shape of a host class as the reflection facility reports it.
///
/// Class names are binary (`java.util.Map$Entry`); descriptors and signatures use
/// internal names as in a class file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassStub {
    pub binary_name: String,
    pub access_flags: u16,
    pub super_binary_name: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<String>,
    pub fields: Vec<FieldStub>,
    pub methods: Vec<MethodStub>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStub {
    pub name: String,
    pub access_flags: u16,
    pub descriptor: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodStub {
    pub name: String,
    pub access_flags: u16,
    pub descriptor: String,
    pub signature: Option<String>,
}

/// Source of host class shapes.
pub trait ReflectionProvider {
    fn lookup(&self, binary_name: &str) -> Option<ClassStub>;
}

impl ReflectionProvider for HashMap<String, ClassStub> {
    fn lookup(&self, binary_name: &str) -> Option<ClassStub> {
        self.get(binary_name).cloned()
    }
}

/// Map JVM access flags onto engine modifiers.
pub fn modifiers_from_flags(flags: u16) -> Modifiers {
    let mut out = Modifiers::empty();
    for (flag, modifier) in [
        (ACC_PUBLIC, Modifiers::PUBLIC),
        (ACC_PRIVATE, Modifiers::PRIVATE),
        (ACC_PROTECTED, Modifiers::PROTECTED),
        (ACC_STATIC, Modifiers::STATIC),
        (ACC_FINAL, Modifiers::FINAL),
        (ACC_ABSTRACT, Modifiers::ABSTRACT),
    ] {
        if flags & flag != 0 {
            out |= modifier;
        }
    }
    out
}

fn internal_to_binary(internal: &str) -> String {
    internal.replace('/', ".")
}

type TypeVars = HashMap<String, TypeVarId>;

/// Loads stubs from a [`ReflectionProvider`] into a [`TypeStore`] on demand.
///
/// Classes referenced from a stub are loaded recursively. A class that is referenced
/// while it is itself being loaded resolves to its reserved id.
pub struct ReflectedTypeLoader<'a> {
    pub store: &'a mut TypeStore,
    pub provider: &'a dyn ReflectionProvider,
    in_progress: HashSet<String>,
    loaded: HashSet<String>,
}

impl<'a> ReflectedTypeLoader<'a> {
    pub fn new(store: &'a mut TypeStore, provider: &'a dyn ReflectionProvider) -> Self {
        Self {
            store,
            provider,
            in_progress: HashSet::new(),
            loaded: HashSet::new(),
        }
    }

    /// Ensure `binary_name` is present in the store and return its id.
    ///
    /// Classes already defined in the store (declared or reflected) are left alone.
    /// Returns `Ok(None)` when neither the store nor the provider knows the name.
    pub fn ensure_class(&mut self, binary_name: &str) -> Result<Option<ClassId>, BridgeError> {
        if self.loaded.contains(binary_name) || self.in_progress.contains(binary_name) {
            return Ok(self.store.class_id(binary_name));
        }
        if let Some(existing) = self.store.lookup_class(binary_name) {
            return Ok(Some(existing));
        }
        let Some(stub) = self.provider.lookup(binary_name) else {
            return Ok(None);
        };

        tracing::debug!(class = binary_name, "loading reflected class");
        let id = self.store.intern_class_id(binary_name);
        self.in_progress.insert(binary_name.to_string());
        let result = self.load(id, &stub);
        self.in_progress.remove(binary_name);
        if let Err(err) = &result {
            tracing::warn!(class = binary_name, error = %err, "failed to load reflected class");
        }
        result?;
        self.loaded.insert(binary_name.to_string());
        Ok(Some(id))
    }

    fn load(&mut self, id: ClassId, stub: &ClassStub) -> Result<(), BridgeError> {
        let kind = if stub.access_flags & ACC_ANNOTATION != 0 {
            ClassKind::Annotation
        } else if stub.access_flags & ACC_INTERFACE != 0 {
            ClassKind::Interface
        } else if stub.access_flags & ACC_ENUM != 0 {
            ClassKind::Enum
        } else {
            ClassKind::Class
        };
        let is_interface = matches!(kind, ClassKind::Interface | ClassKind::Annotation);

        let mut def = ClassDef::new(stub.binary_name.as_str(), ClassOrigin::Reflected);
        def.kind = kind;
        def.modifiers = modifiers_from_flags(stub.access_flags);
        def.enum_constants = stub
            .fields
            .iter()
            .filter(|field| field.access_flags & ACC_ENUM != 0)
            .map(|field| Name::from(field.name.as_str()))
            .collect();

        let mut class_vars = TypeVars::new();
        match stub.signature.as_deref() {
            Some(sig) => {
                let sig = parse_class_signature(sig)?;
                def.type_params = self.declare_type_params(
                    GenericOwner::Class(id),
                    &sig.type_parameters,
                    &mut class_vars,
                    &TypeVars::new(),
                )?;
                if !is_interface {
                    def.super_class = Some(self.class_type_signature(
                        &sig.super_class,
                        &class_vars,
                        &TypeVars::new(),
                    )?);
                }
                for iface in &sig.interfaces {
                    let iface = self.class_type_signature(iface, &class_vars, &TypeVars::new())?;
                    def.interfaces.push(iface);
                }
            }
            None => {
                if !is_interface {
                    if let Some(name) = stub.super_binary_name.as_deref() {
                        def.super_class = Some(self.class_ref(name)?);
                    }
                }
                for name in &stub.interfaces {
                    let iface = self.class_ref(name)?;
                    def.interfaces.push(iface);
                }
            }
        }
        self.store.define_class(id, def);

        for field in &stub.fields {
            let ty = match field.signature.as_deref() {
                Some(sig) => {
                    let sig = parse_field_signature(sig)?;
                    self.type_signature(&sig, &class_vars, &TypeVars::new())?
                }
                None => {
                    let desc = parse_field_descriptor(&field.descriptor)?;
                    self.field_type(&desc)?
                }
            };
            self.store.add_field(
                id,
                field.name.as_str(),
                ty,
                modifiers_from_flags(field.access_flags),
            );
        }

        for method in &stub.methods {
            match method.name.as_str() {
                "<clinit>" => continue,
                "<init>" => {
                    let ctor = self.store.add_constructor(id).finish();
                    self.fill_method(ctor, method, &class_vars)?;
                }
                name => {
                    let mid = self.store.add_method(id, name).finish();
                    self.fill_method(mid, method, &class_vars)?;
                }
            }
        }
        Ok(())
    }

    fn fill_method(
        &mut self,
        mid: MethodId,
        stub: &MethodStub,
        class_vars: &TypeVars,
    ) -> Result<(), BridgeError> {
        let mut method_vars = TypeVars::new();
        let (type_params, params, return_type) = match stub.signature.as_deref() {
            Some(sig) => {
                let sig = parse_method_signature(sig)?;
                let type_params = self.declare_type_params(
                    GenericOwner::Method(mid),
                    &sig.type_parameters,
                    &mut method_vars,
                    class_vars,
                )?;
                let params = sig
                    .parameters
                    .iter()
                    .map(|p| self.type_signature(p, class_vars, &method_vars))
                    .collect::<Result<Vec<_>, _>>()?;
                let return_type = match &sig.return_type {
                    Some(ret) => self.type_signature(ret, class_vars, &method_vars)?,
                    None => TypeRef::Void,
                };
                (type_params, params, return_type)
            }
            None => {
                let desc = parse_method_descriptor(&stub.descriptor)?;
                let params = desc
                    .params
                    .iter()
                    .map(|p| self.field_type(p))
                    .collect::<Result<Vec<_>, _>>()?;
                let return_type = match &desc.return_type {
                    ReturnType::Void => TypeRef::Void,
                    ReturnType::Type(ty) => self.field_type(ty)?,
                };
                (Vec::new(), params, return_type)
            }
        };

        let varargs = stub.access_flags & ACC_VARARGS != 0;
        let last = params.len().saturating_sub(1);
        let params = params
            .into_iter()
            .enumerate()
            .map(|(idx, ty)| Param {
                is_repeating: varargs && idx == last && ty.dims() > 0,
                ty,
            })
            .collect();
        if let Some(def) = self.store.method_mut(mid) {
            def.type_params = type_params;
            def.params = params;
            def.return_type = return_type;
            def.modifiers = modifiers_from_flags(stub.access_flags);
        }
        Ok(())
    }

    /// Allocate the variables first so bounds may mention any of them (`T extends Comparable<T>`).
    ///
    /// `outer` holds the class variables a method's bounds may refer to (`<U extends T>`).
    fn declare_type_params(
        &mut self,
        owner: GenericOwner,
        params: &[TypeParameter],
        vars: &mut TypeVars,
        outer: &TypeVars,
    ) -> Result<Vec<TypeVarId>, BridgeError> {
        let object = self.object_type()?;
        let ids = params
            .iter()
            .map(|tp| {
                let id = self
                    .store
                    .add_type_param(owner, tp.name.as_str(), object.clone());
                vars.insert(tp.name.clone(), id);
                id
            })
            .collect::<Vec<_>>();

        let vars = &*vars;
        let (class_vars, method_vars) = match owner {
            GenericOwner::Class(_) => (vars, outer),
            GenericOwner::Method(_) => (outer, vars),
        };
        for (tp, id) in params.iter().zip(&ids) {
            if let Some(bound) = tp.primary_bound() {
                let bound = self.type_signature(bound, class_vars, method_vars)?;
                self.store.set_type_param_bound(*id, bound);
            }
        }
        Ok(ids)
    }

    fn object_type(&mut self) -> Result<TypeRef, BridgeError> {
        self.class_ref("java.lang.Object")
    }

    /// Reference to `binary_name`, loading it if needed. Names nobody can supply keep a
    /// reserved (undefined) slot so the reference still prints and compares by name.
    fn class_ref(&mut self, binary_name: &str) -> Result<TypeRef, BridgeError> {
        let id = match self.ensure_class(binary_name)? {
            Some(id) => id,
            None => {
                tracing::debug!(class = binary_name, "reflected class not found");
                self.store.intern_class_id(binary_name)
            }
        };
        Ok(match self.store.class(id) {
            Some(_) => self.store.class_type(id),
            None => TypeRef::Reflected(id),
        })
    }

    fn class_type_signature(
        &mut self,
        sig: &ClassTypeSignature,
        class_vars: &TypeVars,
        method_vars: &TypeVars,
    ) -> Result<TypeRef, BridgeError> {
        let base = self.class_ref(&internal_to_binary(&sig.internal_name()))?;
        let args = sig
            .type_arguments()
            .iter()
            .map(|arg| self.type_argument(arg, class_vars, method_vars))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match (base.class_id(), args.is_empty()) {
            (Some(id), false) => {
                TypeRef::Parameterized(strata_types::ParameterizedType { base: id, args })
            }
            _ => base,
        })
    }

    fn type_argument(
        &mut self,
        arg: &TypeArgument,
        class_vars: &TypeVars,
        method_vars: &TypeVars,
    ) -> Result<TypeRef, BridgeError> {
        Ok(match arg {
            TypeArgument::Any => TypeRef::unbounded_wildcard(),
            TypeArgument::Exact(ty) => self.type_signature(ty, class_vars, method_vars)?,
            TypeArgument::Extends(ty) => {
                TypeRef::wildcard_extends(self.type_signature(ty, class_vars, method_vars)?)
            }
            TypeArgument::Super(ty) => {
                TypeRef::wildcard_super(self.type_signature(ty, class_vars, method_vars)?)
            }
        })
    }

    fn type_signature(
        &mut self,
        sig: &TypeSignature,
        class_vars: &TypeVars,
        method_vars: &TypeVars,
    ) -> Result<TypeRef, BridgeError> {
        Ok(match sig {
            TypeSignature::Base(prim) => TypeRef::Primitive(*prim),
            TypeSignature::Array(elem) => {
                TypeRef::array_of(self.type_signature(elem, class_vars, method_vars)?)
            }
            TypeSignature::Class(cls) => self.class_type_signature(cls, class_vars, method_vars)?,
            TypeSignature::TypeVariable(name) => match method_vars
                .get(name)
                .or_else(|| class_vars.get(name))
                .copied()
            {
                Some(var) => TypeRef::TypeVar(var),
                None => {
                    tracing::debug!(type_var = %name, "type variable not in scope; using Object");
                    self.object_type()?
                }
            },
        })
    }

    fn field_type(&mut self, ty: &FieldType) -> Result<TypeRef, BridgeError> {
        Ok(match ty {
            FieldType::Base(prim) => TypeRef::Primitive(*prim),
            FieldType::Array(elem) => TypeRef::array_of(self.field_type(elem)?),
            FieldType::Object(internal) => self.class_ref(&internal_to_binary(internal))?,
        })
    }
}
