//! JVM field and method descriptors (`[Ljava/lang/String;`, `(IJ)V`).

use strata_types::PrimitiveType;

use crate::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Base(PrimitiveType),
    /// Internal (slash-separated) class name.
    Object(String),
    Array(Box<FieldType>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType, BridgeError> {
    let mut cursor = Cursor::new(desc);
    let ty = field_type(&mut cursor).ok_or_else(|| invalid(desc))?;
    if !cursor.is_at_end() {
        return Err(invalid(desc));
    }
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor, BridgeError> {
    let mut cursor = Cursor::new(desc);
    if !cursor.eat('(') {
        return Err(invalid(desc));
    }
    let mut params = Vec::new();
    while !cursor.eat(')') {
        params.push(field_type(&mut cursor).ok_or_else(|| invalid(desc))?);
    }
    let return_type = if cursor.eat('V') {
        ReturnType::Void
    } else {
        ReturnType::Type(field_type(&mut cursor).ok_or_else(|| invalid(desc))?)
    };
    if !cursor.is_at_end() {
        return Err(invalid(desc));
    }
    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

fn invalid(desc: &str) -> BridgeError {
    BridgeError::InvalidDescriptor(desc.to_string())
}

fn field_type(cursor: &mut Cursor<'_>) -> Option<FieldType> {
    match cursor.bump()? {
        'L' => {
            let name = cursor.take_until(';')?;
            if name.is_empty() {
                return None;
            }
            Some(FieldType::Object(name.to_string()))
        }
        '[' => Some(FieldType::Array(Box::new(field_type(cursor)?))),
        c => base_type(c).map(FieldType::Base),
    }
}

pub(crate) fn base_type(c: char) -> Option<PrimitiveType> {
    PrimitiveType::ALL
        .into_iter()
        .find(|prim| prim.descriptor() == c)
}

/// Character cursor shared by the descriptor and signature parsers.
pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume up to and including `end`, returning the text before it.
    pub(crate) fn take_until(&mut self, end: char) -> Option<&'a str> {
        let rest = &self.input[self.pos..];
        let idx = rest.find(end)?;
        self.pos += idx + end.len_utf8();
        Some(&rest[..idx])
    }

    /// Consume characters while `f` holds.
    pub(crate) fn take_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let rest = &self.input[self.pos..];
        let len = rest.find(|c| !f(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}
