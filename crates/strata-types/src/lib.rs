//! Type representation and assignability for the Strata engine.
//!
//! This crate owns the [`TypeStore`] arena (declared and reflected classes, their
//! members and type parameters), the [`TypeRef`] value model, type-parameter
//! substitution through a [`TypeParamContext`], the assignability relation, and the
//! redirect chains that layered modify-declarations leave behind.
//!
//! Member lookup and overload resolution live one level up, in `strata-resolve`.

#![forbid(unsafe_code)]

use std::rc::Rc;

use strata_core::EngineLimits;

mod assign;
mod context;
mod error;
mod format;
mod layers;
mod runtime;
mod store;
mod ty;

pub use assign::{
    check_assignable, instantiate_as_supertype, is_assignable_from, is_subclass, same_type,
    unify_conditional, AssignSemantics,
};
pub use context::{erasure, substitute, substitute_resolved, Frame, TypeParamContext};
pub use error::{CycleKind, TypeError};
pub use format::{binary_descriptor, erased_name, TypeDisplay};
pub use layers::{
    canonical_class, resolve_class_definition, resolve_definition, resolve_method_definition,
    RedefinableUnit,
};
pub use store::{
    ClassBuilder, ClassDef, ClassKind, ClassOrigin, FieldDef, MethodBuilder, MethodDef, Param,
    ResolutionState, ResolvedClass, TypeParamDef, TypeStore, WellKnownTypes,
};
pub use ty::{
    ArrayType, BoundKind, ClassId, FieldId, GenericOwner, MethodId, ParameterizedType,
    PrimitiveType, TypeRef, TypeVarId, WildcardType,
};

/// Read access to the type universe.
///
/// Algorithms in this crate and in `strata-resolve` are written against `&dyn TypeEnv` so
/// callers can layer their own views on top of a [`TypeStore`].
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;

    /// The `replaced_by` pointer of a class slot, if a later layer modified it.
    fn class_redirect(&self, id: ClassId) -> Option<ClassId>;

    fn method(&self, id: MethodId) -> Option<&MethodDef>;

    fn field(&self, id: FieldId) -> Option<&FieldDef>;

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;

    /// Look up a defined class by binary name.
    fn lookup_class(&self, name: &str) -> Option<ClassId>;

    fn well_known(&self) -> &WellKnownTypes;

    fn limits(&self) -> EngineLimits;

    /// Resolve the supertype closure of `id`, caching the result on the node.
    fn resolve_class(&self, id: ClassId) -> Result<Rc<ResolvedClass>, TypeError>;

    /// A bare reference to `id`, `Declared` or `Reflected` depending on its origin.
    fn class_type(&self, id: ClassId) -> TypeRef {
        match self.class(id).map(|def| def.origin) {
            Some(ClassOrigin::Reflected) => TypeRef::Reflected(id),
            _ => TypeRef::Declared(id),
        }
    }

    fn object_type(&self) -> TypeRef {
        self.class_type(self.well_known().object)
    }

    fn string_type(&self) -> TypeRef {
        self.class_type(self.well_known().string)
    }

    /// The wrapper class type for a primitive.
    fn boxed(&self, prim: PrimitiveType) -> TypeRef {
        self.class_type(self.well_known().box_of(prim))
    }

    /// The primitive a wrapper class type unboxes to.
    fn unboxed(&self, ty: &TypeRef) -> Option<PrimitiveType> {
        match ty.strip_overlap() {
            TypeRef::Primitive(prim) => Some(*prim),
            TypeRef::Declared(id) | TypeRef::Reflected(id) => self.well_known().unbox(*id),
            _ => None,
        }
    }

    /// Build `base<args>`, boxing primitive arguments and checking the argument count.
    ///
    /// An empty `args` yields the raw type.
    fn parameterized(&self, base: ClassId, args: Vec<TypeRef>) -> Result<TypeRef, TypeError> {
        let def = self.class(base).ok_or(TypeError::UnknownClass(base))?;
        if !args.is_empty() && args.len() != def.type_params.len() {
            return Err(TypeError::MalformedGenericUsage {
                ty: def.name.to_string(),
                expected: def.type_params.len(),
                found: args.len(),
            });
        }
        let args = args
            .into_iter()
            .map(|arg| match arg {
                TypeRef::Primitive(prim) => self.boxed(prim),
                other => other,
            })
            .collect();
        Ok(TypeRef::Parameterized(ParameterizedType { base, args }))
    }

    /// Format `ty` in Java-like source syntax.
    fn display<'a>(&'a self, ty: &'a TypeRef) -> TypeDisplay<'a>
    where
        Self: Sized,
    {
        TypeDisplay::new(self, ty)
    }
}
