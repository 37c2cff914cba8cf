use std::fmt;

/// Index of a `Declared` or `Reflected` class node in the [`crate::TypeStore`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

/// Index of a method or constructor in the [`crate::TypeStore`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) u32);

/// Index of a field in the [`crate::TypeStore`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) u32);

/// Index of a type parameter definition in the [`crate::TypeStore`] arena.
///
/// The store guarantees one id per `(owner, name)` pair, so comparing ids compares the
/// declaring context and the name together.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub(crate) u32);

macro_rules! arena_id {
    ($($ty:ident => $prefix:literal),* $(,)?) => {$(
        impl $ty {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    )*};
}

arena_id! {
    ClassId => "Class",
    MethodId => "Method",
    FieldId => "Field",
    TypeVarId => "TypeVar",
}

/// The declaration a type variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    Class(ClassId),
    Method(MethodId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    /// Binary name of the wrapper class used when this primitive is boxed.
    pub fn box_class_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    /// Widening primitive conversion (JLS 5.1.2). Identity is not a widening.
    pub fn widens_to(self, to: PrimitiveType) -> bool {
        use PrimitiveType::*;
        matches!(
            (self, to),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }

    /// Binary numeric promotion (JLS 5.6.2) of two numeric operands.
    pub fn promote(self, other: PrimitiveType) -> Option<PrimitiveType> {
        use PrimitiveType::*;
        if !self.is_numeric() || !other.is_numeric() {
            return (self == other).then_some(self);
        }
        Some(match (self, other) {
            (Double, _) | (_, Double) => Double,
            (Float, _) | (_, Float) => Float,
            (Long, _) | (_, Long) => Long,
            _ => Int,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    Unbounded,
    Extends,
    Super,
}

/// Array type. `component` is never itself an array; nested arrays fold into `dims`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayType {
    pub component: Box<TypeRef>,
    pub dims: u32,
}

/// An instantiation of a generic class. Empty `args` means the raw type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterizedType {
    pub base: ClassId,
    pub args: Vec<TypeRef>,
}

impl ParameterizedType {
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.args.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardType {
    pub bound_kind: BoundKind,
    pub bound: Option<Box<TypeRef>>,
}

/// A type value.
///
/// `Declared`/`Reflected` refer into the store's class arena; every other variant is
/// an immutable value built per query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    Void,
    /// Type of the `null` literal.
    Null,
    /// A class whose body comes from source layers.
    Declared(ClassId),
    /// A class whose shape comes from the host reflection bridge.
    Reflected(ClassId),
    Array(ArrayType),
    Parameterized(ParameterizedType),
    Wildcard(WildcardType),
    TypeVar(TypeVarId),
    /// Provisional result of unifying two types (conditional expression branches).
    Overlap(Box<TypeRef>),
}

impl TypeRef {
    pub const INT: TypeRef = TypeRef::Primitive(PrimitiveType::Int);
    pub const BOOLEAN: TypeRef = TypeRef::Primitive(PrimitiveType::Boolean);
    pub const LONG: TypeRef = TypeRef::Primitive(PrimitiveType::Long);
    pub const DOUBLE: TypeRef = TypeRef::Primitive(PrimitiveType::Double);

    /// Build an array type, folding a nested array component into one node.
    ///
    /// `dims == 0` returns the component unchanged.
    pub fn array(component: TypeRef, dims: u32) -> TypeRef {
        if dims == 0 {
            return component;
        }
        match component {
            TypeRef::Array(inner) => TypeRef::Array(ArrayType {
                component: inner.component,
                dims: inner.dims.saturating_add(dims),
            }),
            other => TypeRef::Array(ArrayType {
                component: Box::new(other),
                dims,
            }),
        }
    }

    #[inline]
    pub fn array_of(component: TypeRef) -> TypeRef {
        TypeRef::array(component, 1)
    }

    pub fn unbounded_wildcard() -> TypeRef {
        TypeRef::Wildcard(WildcardType {
            bound_kind: BoundKind::Unbounded,
            bound: None,
        })
    }

    pub fn wildcard_extends(bound: TypeRef) -> TypeRef {
        TypeRef::Wildcard(WildcardType {
            bound_kind: BoundKind::Extends,
            bound: Some(Box::new(bound)),
        })
    }

    pub fn wildcard_super(bound: TypeRef) -> TypeRef {
        TypeRef::Wildcard(WildcardType {
            bound_kind: BoundKind::Super,
            bound: Some(Box::new(bound)),
        })
    }

    pub fn overlap(base: TypeRef) -> TypeRef {
        match base {
            TypeRef::Overlap(_) => base,
            other => TypeRef::Overlap(Box::new(other)),
        }
    }

    /// The class node behind `Declared`, `Reflected` and `Parameterized` types.
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            TypeRef::Declared(id) | TypeRef::Reflected(id) => Some(*id),
            TypeRef::Parameterized(p) => Some(p.base),
            TypeRef::Overlap(base) => base.class_id(),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        match self {
            TypeRef::Primitive(_) | TypeRef::Void => false,
            TypeRef::Overlap(base) => base.is_reference(),
            _ => true,
        }
    }

    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            TypeRef::Declared(_) | TypeRef::Reflected(_) | TypeRef::Parameterized(_)
        )
    }

    /// Whether the type is raw: a class reference with no type arguments.
    ///
    /// Non-generic classes are also reported raw; callers that care check the formal count.
    pub fn is_raw(&self) -> bool {
        match self {
            TypeRef::Declared(_) | TypeRef::Reflected(_) => true,
            TypeRef::Parameterized(p) => p.is_raw(),
            _ => false,
        }
    }

    /// Array dimensions, `0` for non-array types.
    pub fn dims(&self) -> u32 {
        match self {
            TypeRef::Array(a) => a.dims,
            TypeRef::Overlap(base) => base.dims(),
            _ => 0,
        }
    }

    /// Type arguments of a parameterized type (empty for anything else).
    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Parameterized(p) => &p.args,
            TypeRef::Overlap(base) => base.type_args(),
            _ => &[],
        }
    }

    /// Element type of an array with one dimension removed.
    pub fn element_type(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Array(a) => {
                let dims = a.dims.checked_sub(1)?;
                Some(TypeRef::array((*a.component).clone(), dims))
            }
            TypeRef::Overlap(base) => base.element_type(),
            _ => None,
        }
    }

    /// Remove a provisional `Overlap` wrapper.
    pub fn strip_overlap(&self) -> &TypeRef {
        match self {
            TypeRef::Overlap(base) => base.strip_overlap(),
            other => other,
        }
    }

    /// Whether any type variable occurs in this type.
    pub fn mentions_type_vars(&self) -> bool {
        match self {
            TypeRef::TypeVar(_) => true,
            TypeRef::Array(a) => a.component.mentions_type_vars(),
            TypeRef::Parameterized(p) => p.args.iter().any(TypeRef::mentions_type_vars),
            TypeRef::Wildcard(w) => w.bound.as_deref().is_some_and(TypeRef::mentions_type_vars),
            TypeRef::Overlap(base) => base.mentions_type_vars(),
            _ => false,
        }
    }
}
