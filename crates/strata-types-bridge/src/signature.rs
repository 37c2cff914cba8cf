//! Generic signatures as recorded in the `Signature` attribute (JVMS 4.7.9.1).

use strata_types::PrimitiveType;

use crate::descriptor::{base_type, Cursor};
use crate::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Base(PrimitiveType),
    Array(Box<TypeSignature>),
    Class(ClassTypeSignature),
    TypeVariable(String),
}

/// `Lpkg/Outer<TT;>.Inner<Ljava/lang/String;>;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSignature {
    /// The first segment carries the package path (`java/util/Map`).
    pub segments: Vec<SimpleClassTypeSignature>,
}

impl ClassTypeSignature {
    /// Internal name of the innermost class (`pkg/Outer$Inner`).
    pub fn internal_name(&self) -> String {
        self.segments
            .iter()
            .map(|seg| seg.name.as_str())
            .collect::<Vec<_>>()
            .join("$")
    }

    /// Type arguments of the innermost segment.
    pub fn type_arguments(&self) -> &[TypeArgument] {
        self.segments
            .last()
            .map(|seg| seg.type_arguments.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleClassTypeSignature {
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    /// `*`
    Any,
    Exact(TypeSignature),
    /// `+`
    Extends(TypeSignature),
    /// `-`
    Super(TypeSignature),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

impl TypeParameter {
    /// The bound used as the variable's default: the class bound, else the first
    /// interface bound.
    pub fn primary_bound(&self) -> Option<&TypeSignature> {
        self.class_bound
            .as_ref()
            .or_else(|| self.interface_bounds.first())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<TypeSignature>,
    /// `None` for `void`.
    pub return_type: Option<TypeSignature>,
    pub throws: Vec<TypeSignature>,
}

pub fn parse_class_signature(sig: &str) -> Result<ClassSignature, BridgeError> {
    let mut p = Parser::new(sig);
    let out = p.class_signature();
    p.finish(out)
}

pub fn parse_method_signature(sig: &str) -> Result<MethodSignature, BridgeError> {
    let mut p = Parser::new(sig);
    let out = p.method_signature();
    p.finish(out)
}

pub fn parse_field_signature(sig: &str) -> Result<TypeSignature, BridgeError> {
    let mut p = Parser::new(sig);
    let out = p.reference_type();
    p.finish(out)
}

struct Parser<'a> {
    input: &'a str,
    cursor: Cursor<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: Cursor::new(input),
        }
    }

    fn finish<T>(&self, out: Option<T>) -> Result<T, BridgeError> {
        match out {
            Some(out) if self.cursor.is_at_end() => Ok(out),
            _ => Err(BridgeError::InvalidSignature(self.input.to_string())),
        }
    }

    fn class_signature(&mut self) -> Option<ClassSignature> {
        let type_parameters = self.type_parameters()?;
        let super_class = self.class_type()?;
        let mut interfaces = Vec::new();
        while !self.cursor.is_at_end() {
            interfaces.push(self.class_type()?);
        }
        Some(ClassSignature {
            type_parameters,
            super_class,
            interfaces,
        })
    }

    fn method_signature(&mut self) -> Option<MethodSignature> {
        let type_parameters = self.type_parameters()?;
        if !self.cursor.eat('(') {
            return None;
        }
        let mut parameters = Vec::new();
        while !self.cursor.eat(')') {
            parameters.push(self.java_type()?);
        }
        let return_type = if self.cursor.eat('V') {
            None
        } else {
            Some(self.java_type()?)
        };
        let mut throws = Vec::new();
        while self.cursor.eat('^') {
            throws.push(self.reference_type()?);
        }
        Some(MethodSignature {
            type_parameters,
            parameters,
            return_type,
            throws,
        })
    }

    fn type_parameters(&mut self) -> Option<Vec<TypeParameter>> {
        let mut out = Vec::new();
        if !self.cursor.eat('<') {
            return Some(out);
        }
        while !self.cursor.eat('>') {
            let name = self.identifier()?;
            if !self.cursor.eat(':') {
                return None;
            }
            // The class bound may be empty (`T::Ljava/lang/Comparable;`).
            let class_bound = match self.cursor.peek() {
                Some(':') => None,
                _ => Some(self.reference_type()?),
            };
            let mut interface_bounds = Vec::new();
            while self.cursor.eat(':') {
                interface_bounds.push(self.reference_type()?);
            }
            out.push(TypeParameter {
                name: name.to_string(),
                class_bound,
                interface_bounds,
            });
        }
        Some(out)
    }

    fn java_type(&mut self) -> Option<TypeSignature> {
        match self.cursor.peek()? {
            'L' | 'T' | '[' => self.reference_type(),
            c => {
                self.cursor.bump();
                base_type(c).map(TypeSignature::Base)
            }
        }
    }

    fn reference_type(&mut self) -> Option<TypeSignature> {
        match self.cursor.peek()? {
            'L' => self.class_type().map(TypeSignature::Class),
            'T' => {
                self.cursor.bump();
                let name = self.cursor.take_until(';')?;
                (!name.is_empty()).then(|| TypeSignature::TypeVariable(name.to_string()))
            }
            '[' => {
                self.cursor.bump();
                Some(TypeSignature::Array(Box::new(self.java_type()?)))
            }
            _ => None,
        }
    }

    fn class_type(&mut self) -> Option<ClassTypeSignature> {
        if !self.cursor.eat('L') {
            return None;
        }
        let mut segments = Vec::new();
        loop {
            let name = self
                .cursor
                .take_while(|c| !matches!(c, '<' | '.' | ';'));
            if name.is_empty() {
                return None;
            }
            let type_arguments = self.type_arguments()?;
            segments.push(SimpleClassTypeSignature {
                name: name.to_string(),
                type_arguments,
            });
            if self.cursor.eat(';') {
                return Some(ClassTypeSignature { segments });
            }
            if !self.cursor.eat('.') {
                return None;
            }
        }
    }

    fn type_arguments(&mut self) -> Option<Vec<TypeArgument>> {
        let mut out = Vec::new();
        if !self.cursor.eat('<') {
            return Some(out);
        }
        while !self.cursor.eat('>') {
            let arg = match self.cursor.peek()? {
                '*' => {
                    self.cursor.bump();
                    TypeArgument::Any
                }
                '+' => {
                    self.cursor.bump();
                    TypeArgument::Extends(self.reference_type()?)
                }
                '-' => {
                    self.cursor.bump();
                    TypeArgument::Super(self.reference_type()?)
                }
                _ => TypeArgument::Exact(self.reference_type()?),
            };
            out.push(arg);
        }
        (!out.is_empty()).then_some(out)
    }

    fn identifier(&mut self) -> Option<&'a str> {
        let name = self
            .cursor
            .take_while(|c| !matches!(c, ':' | ';' | '<' | '>' | '.' | '/' | '['));
        (!name.is_empty()).then_some(name)
    }
}
