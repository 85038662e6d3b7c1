use super::names::{BinaryName, Name};
use crate::util::Width;
use std::io::{Error, ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => {
                let msg = format!("Unexpected leftover input '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Boxed reference type corresponding to this primitive
    pub fn boxed_class(&self) -> BinaryName {
        match self {
            BaseType::Byte => BinaryName::BYTE,
            BaseType::Char => BinaryName::CHARACTER,
            BaseType::Double => BinaryName::DOUBLE,
            BaseType::Float => BinaryName::FLOAT,
            BaseType::Int => BinaryName::INTEGER,
            BaseType::Long => BinaryName::LONG,
            BaseType::Short => BinaryName::SHORT,
            BaseType::Boolean => BinaryName::BOOLEAN,
        }
    }
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Byte
            | BaseType::Char
            | BaseType::Float
            | BaseType::Int
            | BaseType::Short
            | BaseType::Boolean => 1,
            BaseType::Double | BaseType::Long => 2,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => {
                let msg = format!("Invalid base type character '{}'", c);
                return Err(Error::new(ErrorKind::InvalidInput, msg));
            }
            None => {
                let msg = "Missing base type character";
                return Err(Error::new(ErrorKind::UnexpectedEof, msg));
            }
        };
        Ok(typ)
    }
}

/// Type of a field or method argument
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Object(Class),
    Array(Box<FieldType<Class>>),
}

impl<Class> FieldType<Class> {
    pub const fn int() -> FieldType<Class> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn boolean() -> FieldType<Class> {
        FieldType::Base(BaseType::Boolean)
    }

    pub const fn long() -> FieldType<Class> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn object(class: Class) -> FieldType<Class> {
        FieldType::Object(class)
    }

    pub fn array(element: FieldType<Class>) -> FieldType<Class> {
        FieldType::Array(Box::new(element))
    }

    /// Primitive type underneath, if this is a primitive type
    pub fn as_base(&self) -> Option<BaseType> {
        match self {
            FieldType::Base(base) => Some(*base),
            _ => None,
        }
    }
}

impl<Class> Width for FieldType<Class> {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base) => base.width(),
            FieldType::Object(_) | FieldType::Array(_) => 1,
        }
    }
}

impl RenderDescriptor for FieldType<BinaryName> {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base) => base.render_to(write_to),
            FieldType::Object(class) => {
                write_to.push('L');
                write_to.push_str(class.as_str());
                write_to.push(';');
            }
            FieldType::Array(element) => {
                write_to.push('[');
                element.render_to(write_to);
            }
        }
    }
}

impl ParseDescriptor for FieldType<BinaryName> {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek() {
            Some('L') => {
                let _ = source.next();
                let mut class_name = String::new();
                loop {
                    match source.next() {
                        Some(';') => break,
                        Some(c) => class_name.push(c),
                        None => {
                            let msg = "Missing terminator for object type";
                            return Err(Error::new(ErrorKind::UnexpectedEof, msg));
                        }
                    }
                }
                let class_name = BinaryName::from_string(class_name)
                    .map_err(|msg| Error::new(ErrorKind::InvalidInput, msg))?;
                Ok(FieldType::Object(class_name))
            }
            Some('[') => {
                let _ = source.next();
                let element = FieldType::parse_from(source)?;
                Ok(FieldType::array(element))
            }
            _ => Ok(FieldType::Base(BaseType::parse_from(source)?)),
        }
    }
}

/// Signature of a method
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodDescriptor<Class> {
    /// Types of the method parameters
    pub parameters: Vec<FieldType<Class>>,

    /// Return type (`None` for `void`)
    pub return_type: Option<FieldType<Class>>,
}

impl<Class> MethodDescriptor<Class> {
    /// Total width of the parameters
    ///
    /// This is useful in determining the size of the locals needed for a
    /// method frame (note that this doesn't include the implicit `this`).
    pub fn parameter_length(&self) -> usize {
        self.parameters.iter().map(|param| param.width()).sum()
    }
}

impl RenderDescriptor for MethodDescriptor<BinaryName> {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        }
    }
}

impl ParseDescriptor for MethodDescriptor<BinaryName> {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        if source.next_if_eq(&'(').is_none() {
            let msg = "Expected '(' at the start of a method descriptor";
            return Err(Error::new(ErrorKind::InvalidInput, msg));
        }
        let mut parameters = vec![];
        while source.next_if_eq(&')').is_none() {
            parameters.push(FieldType::parse_from(source)?);
        }
        let return_type = if source.next_if_eq(&'V').is_some() {
            None
        } else {
            Some(FieldType::parse_from(source)?)
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fmt::Debug;

    fn round_trip<T: RenderDescriptor + ParseDescriptor + Debug + Eq>(rendered: &str, parsed: T) {
        assert_eq!(rendered, parsed.render());
        assert_eq!(T::parse(rendered).unwrap(), parsed);
    }

    type FT = FieldType<BinaryName>;

    const INT: FT = FieldType::Base(BaseType::Int);
    const DOUBLE: FT = FieldType::Base(BaseType::Double);
    const STRING: FT = FieldType::object(BinaryName::STRING);
    const OBJECT: FT = FieldType::object(BinaryName::OBJECT);

    #[test]
    fn field_types() {
        round_trip("I", INT);
        round_trip("Ljava/lang/String;", STRING);
        round_trip("[[D", FieldType::array(FieldType::array(DOUBLE)));
        round_trip("[Ljava/lang/Object;", FieldType::array(OBJECT));
    }

    #[test]
    fn method_descriptors() {
        round_trip(
            "(ILjava/lang/String;)V",
            MethodDescriptor {
                parameters: vec![INT, STRING],
                return_type: None,
            },
        );
        round_trip(
            "()Ljava/lang/Object;",
            MethodDescriptor {
                parameters: vec![],
                return_type: Some(OBJECT),
            },
        );
    }

    #[test]
    fn parameter_widths() {
        let descriptor = MethodDescriptor {
            parameters: vec![INT, DOUBLE, STRING],
            return_type: None,
        };
        assert_eq!(descriptor.parameter_length(), 4);
    }

    #[test]
    fn boxed_classes() {
        assert_eq!(BaseType::Int.boxed_class(), BinaryName::INTEGER);
        assert_eq!(BaseType::Boolean.boxed_class(), BinaryName::BOOLEAN);
    }
}
