use std::fmt;

use crate::context::erasure;
use crate::{BoundKind, TypeEnv, TypeError, TypeRef};

/// Java-like rendering of a [`TypeRef`]: `java.util.List<? extends java.lang.Number>[]`.
pub struct TypeDisplay<'a> {
    env: &'a dyn TypeEnv,
    ty: &'a TypeRef,
}

impl<'a> TypeDisplay<'a> {
    pub fn new(env: &'a dyn TypeEnv, ty: &'a TypeRef) -> Self {
        Self { env, ty }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self.env, self.ty)
    }
}

fn write_type(f: &mut fmt::Formatter<'_>, env: &dyn TypeEnv, ty: &TypeRef) -> fmt::Result {
    match ty {
        TypeRef::Primitive(prim) => f.write_str(prim.keyword()),
        TypeRef::Void => f.write_str("void"),
        TypeRef::Null => f.write_str("null"),
        TypeRef::Declared(id) | TypeRef::Reflected(id) => match env.class(*id) {
            Some(def) => f.write_str(def.name.as_str()),
            None => write!(f, "{id:?}"),
        },
        TypeRef::Array(a) => {
            write_type(f, env, &a.component)?;
            for _ in 0..a.dims {
                f.write_str("[]")?;
            }
            Ok(())
        }
        TypeRef::Parameterized(p) => {
            write_type(f, env, &env.class_type(p.base))?;
            if p.args.is_empty() {
                return Ok(());
            }
            f.write_str("<")?;
            for (idx, arg) in p.args.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write_type(f, env, arg)?;
            }
            f.write_str(">")
        }
        TypeRef::Wildcard(w) => {
            f.write_str("?")?;
            match (w.bound_kind, w.bound.as_deref()) {
                (BoundKind::Extends, Some(bound)) => {
                    f.write_str(" extends ")?;
                    write_type(f, env, bound)
                }
                (BoundKind::Super, Some(bound)) => {
                    f.write_str(" super ")?;
                    write_type(f, env, bound)
                }
                _ => Ok(()),
            }
        }
        TypeRef::TypeVar(var) => match env.type_param(*var) {
            Some(def) => f.write_str(def.name.as_str()),
            None => write!(f, "{var:?}"),
        },
        TypeRef::Overlap(base) => write_type(f, env, base),
    }
}

/// Source-level name of the erasure of `ty` (`java.lang.String[]`, `int`, `java.util.List`).
pub fn erased_name(env: &dyn TypeEnv, ty: &TypeRef) -> Result<String, TypeError> {
    let erased = erasure(env, ty)?;
    Ok(TypeDisplay::new(env, &erased).to_string())
}

/// JVM field descriptor of the erasure of `ty` (`[Ljava/lang/String;`, `I`).
///
/// The `null` type has no descriptor of its own and is written as `Object`.
pub fn binary_descriptor(env: &dyn TypeEnv, ty: &TypeRef) -> Result<String, TypeError> {
    let erased = erasure(env, ty)?;
    let mut out = String::new();
    write_descriptor(&mut out, env, &erased);
    Ok(out)
}

fn write_descriptor(out: &mut String, env: &dyn TypeEnv, ty: &TypeRef) {
    match ty {
        TypeRef::Primitive(prim) => out.push(prim.descriptor()),
        TypeRef::Void => out.push('V'),
        TypeRef::Array(a) => {
            for _ in 0..a.dims {
                out.push('[');
            }
            write_descriptor(out, env, &a.component);
        }
        TypeRef::Declared(id) | TypeRef::Reflected(id) => {
            let name = env
                .class(*id)
                .map(|def| def.name.as_str())
                .unwrap_or("java.lang.Object");
            out.push('L');
            out.extend(name.chars().map(|c| if c == '.' { '/' } else { c }));
            out.push(';');
        }
        TypeRef::Parameterized(p) => write_descriptor(out, env, &env.class_type(p.base)),
        TypeRef::Overlap(base) => write_descriptor(out, env, base),
        TypeRef::Null | TypeRef::Wildcard(_) | TypeRef::TypeVar(_) => {
            write_descriptor(out, env, &env.object_type())
        }
    }
}
