//! Decoded annotation values
//!
//! Annotations arrive already decoded from attribute bytes (the raw
//! `RuntimeVisibleAnnotations` wire format is a concern of whatever loads the
//! class pool). The optimizer only ever reads Gson's renaming and exposure
//! annotations, but the representation is general.

use super::names::{BinaryName, UnqualifiedName};

/// A single annotation on a class member
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Annotation class (eg. `com/google/gson/annotations/SerializedName`)
    pub type_name: BinaryName,

    /// Element-value pairs, in declaration order
    pub elements: Vec<(UnqualifiedName, ElementValue)>,
}

impl Annotation {
    /// Look up an element value by name
    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(element_name, _)| element_name.as_ref() == name)
            .map(|(_, value)| value)
    }

    /// Annotation with a single `value` element holding a string
    pub fn string_value(type_name: BinaryName, value: &str) -> Annotation {
        Annotation {
            type_name,
            elements: vec![(
                UnqualifiedName::VALUE,
                ElementValue::String(value.to_string()),
            )],
        }
    }
}

/// Value of one annotation element
#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
    Boolean(bool),
    Int(i32),
    String(String),
    Class(BinaryName),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// String content, if this is a string element
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ElementValue::String(s) => Some(s),
            _ => None,
        }
    }
}
