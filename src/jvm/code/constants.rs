use super::instructions::{
    ClassConstantIndex, ConstantIndex, ConstantValue, FieldRef, FieldRefConstantIndex, MethodRef,
    MethodRefConstantIndex, NameAndTypeConstantIndex, Utf8ConstantIndex,
};
use crate::jvm::descriptors::RenderDescriptor;
use crate::jvm::names::{BinaryName, Name};
use crate::jvm::Error;
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;

/// Entry in a class file constant pool
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.4>
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(Utf8ConstantIndex),
    String(Utf8ConstantIndex),
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),
    MethodRef(ClassConstantIndex, NameAndTypeConstantIndex),
    NameAndType(Utf8ConstantIndex, Utf8ConstantIndex),
}

impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

impl Constant {
    /// Serialize the entry in the class file wire format
    pub fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(string) => {
                writer.write_u8(1)?;
                writer.write_u16::<BigEndian>(string.len() as u16)?;
                writer.write_all(string.as_bytes())?;
            }
            Constant::Integer(integer) => {
                writer.write_u8(3)?;
                writer.write_i32::<BigEndian>(*integer)?;
            }
            Constant::Float(float) => {
                writer.write_u8(4)?;
                writer.write_f32::<BigEndian>(*float)?;
            }
            Constant::Long(long) => {
                writer.write_u8(5)?;
                writer.write_i64::<BigEndian>(*long)?;
            }
            Constant::Double(double) => {
                writer.write_u8(6)?;
                writer.write_f64::<BigEndian>(*double)?;
            }
            Constant::Class(name) => {
                writer.write_u8(7)?;
                writer.write_u16::<BigEndian>(name.0)?;
            }
            Constant::String(utf8) => {
                writer.write_u8(8)?;
                writer.write_u16::<BigEndian>(utf8.0)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                writer.write_u8(9)?;
                writer.write_u16::<BigEndian>(class.0)?;
                writer.write_u16::<BigEndian>(name_and_type.0)?;
            }
            Constant::MethodRef(class, name_and_type) => {
                writer.write_u8(10)?;
                writer.write_u16::<BigEndian>(class.0)?;
                writer.write_u16::<BigEndian>(name_and_type.0)?;
            }
            Constant::NameAndType(name, descriptor) => {
                writer.write_u8(12)?;
                writer.write_u16::<BigEndian>(name.0)?;
                writer.write_u16::<BigEndian>(descriptor.0)?;
            }
        }
        Ok(())
    }
}

/// Class file constants pool builder
///
/// The pool is append only; entries are interned so that re-inserting an
/// equivalent constant returns the existing index.
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    classes: HashMap<BinaryName, ClassConstantIndex>,
    strings: HashMap<Utf8ConstantIndex, ConstantIndex>,
    integers: HashMap<i32, ConstantIndex>,
    floats: HashMap<[u8; 4], ConstantIndex>,
    longs: HashMap<i64, ConstantIndex>,
    doubles: HashMap<[u8; 8], ConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    field_refs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex), FieldRefConstantIndex>,
    method_refs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex), MethodRefConstantIndex>,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            strings: HashMap::new(),
            integers: HashMap::new(),
            floats: HashMap::new(),
            longs: HashMap::new(),
            doubles: HashMap::new(),
            name_and_types: HashMap::new(),
            field_refs: HashMap::new(),
            method_refs: HashMap::new(),
        }
    }

    /// Push a constant into the pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some
    /// constants take two spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<u16, Error> {
        let offset = self.constants.offset_len().0;
        if offset + constant.width() > u16::MAX as usize + 1 {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }
        let offset = self.constants.push(constant);
        Ok(offset.0 as u16)
    }

    /// Get or insert a utf8 constant
    pub fn get_utf8(&mut self, utf8: &str) -> Result<Utf8ConstantIndex, Error> {
        if let Some(idx) = self.utf8s.get(utf8) {
            return Ok(*idx);
        }
        let idx = Utf8ConstantIndex(self.push_constant(Constant::Utf8(utf8.to_string()))?);
        self.utf8s.insert(utf8.to_string(), idx);
        Ok(idx)
    }

    /// Get or insert a class constant
    pub fn get_class(&mut self, class: &BinaryName) -> Result<ClassConstantIndex, Error> {
        if let Some(idx) = self.classes.get(class) {
            return Ok(*idx);
        }
        let name = self.get_utf8(class.as_str())?;
        let idx = ClassConstantIndex(self.push_constant(Constant::Class(name))?);
        self.classes.insert(class.clone(), idx);
        Ok(idx)
    }

    /// Get or insert a string constant
    pub fn get_string(&mut self, string: &str) -> Result<ConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        if let Some(idx) = self.strings.get(&utf8) {
            return Ok(*idx);
        }
        let idx = ConstantIndex(self.push_constant(Constant::String(utf8))?);
        self.strings.insert(utf8, idx);
        Ok(idx)
    }

    /// Get or insert an integer constant
    pub fn get_integer(&mut self, integer: i32) -> Result<ConstantIndex, Error> {
        if let Some(idx) = self.integers.get(&integer) {
            return Ok(*idx);
        }
        let idx = ConstantIndex(self.push_constant(Constant::Integer(integer))?);
        self.integers.insert(integer, idx);
        Ok(idx)
    }

    /// Get or insert a long constant
    pub fn get_long(&mut self, long: i64) -> Result<ConstantIndex, Error> {
        if let Some(idx) = self.longs.get(&long) {
            return Ok(*idx);
        }
        let idx = ConstantIndex(self.push_constant(Constant::Long(long))?);
        self.longs.insert(long, idx);
        Ok(idx)
    }

    /// Get or insert a float constant
    pub fn get_float(&mut self, float: f32) -> Result<ConstantIndex, Error> {
        let bits = float.to_be_bytes();
        if let Some(idx) = self.floats.get(&bits) {
            return Ok(*idx);
        }
        let idx = ConstantIndex(self.push_constant(Constant::Float(float))?);
        self.floats.insert(bits, idx);
        Ok(idx)
    }

    /// Get or insert a double constant
    pub fn get_double(&mut self, double: f64) -> Result<ConstantIndex, Error> {
        let bits = double.to_be_bytes();
        if let Some(idx) = self.doubles.get(&bits) {
            return Ok(*idx);
        }
        let idx = ConstantIndex(self.push_constant(Constant::Double(double))?);
        self.doubles.insert(bits, idx);
        Ok(idx)
    }

    /// Get or insert a name-and-type constant
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        if let Some(idx) = self.name_and_types.get(&(name, descriptor)) {
            return Ok(*idx);
        }
        let idx = NameAndTypeConstantIndex(
            self.push_constant(Constant::NameAndType(name, descriptor))?,
        );
        self.name_and_types.insert((name, descriptor), idx);
        Ok(idx)
    }

    /// Get or insert a field reference constant
    pub fn get_field_ref(&mut self, field: &FieldRef) -> Result<FieldRefConstantIndex, Error> {
        let class = self.get_class(&field.class)?;
        let name_and_type =
            self.get_name_and_type(field.name.as_str(), &field.descriptor.render())?;
        if let Some(idx) = self.field_refs.get(&(class, name_and_type)) {
            return Ok(*idx);
        }
        let idx =
            FieldRefConstantIndex(self.push_constant(Constant::FieldRef(class, name_and_type))?);
        self.field_refs.insert((class, name_and_type), idx);
        Ok(idx)
    }

    /// Get or insert a method reference constant
    pub fn get_method_ref(&mut self, method: &MethodRef) -> Result<MethodRefConstantIndex, Error> {
        let class = self.get_class(&method.class)?;
        let name_and_type =
            self.get_name_and_type(method.name.as_str(), &method.descriptor.render())?;
        if let Some(idx) = self.method_refs.get(&(class, name_and_type)) {
            return Ok(*idx);
        }
        let idx =
            MethodRefConstantIndex(self.push_constant(Constant::MethodRef(class, name_and_type))?);
        self.method_refs.insert((class, name_and_type), idx);
        Ok(idx)
    }

    /// Get or insert a loadable constant, in its symbolic form
    pub fn get_constant_value(&mut self, value: &ConstantValue) -> Result<ConstantIndex, Error> {
        match value {
            ConstantValue::Integer(integer) => self.get_integer(*integer),
            ConstantValue::Long(long) => self.get_long(*long),
            ConstantValue::Float(float) => self.get_float(*float),
            ConstantValue::Double(double) => self.get_double(*double),
            ConstantValue::String(string) => self.get_string(string),
            ConstantValue::Class(class) => self.get_class(class).map(ConstantIndex::from),
        }
    }

    /// Number of constant pool slots in use (including the implicit slot 0)
    pub fn offset_len(&self) -> usize {
        self.constants.offset_len().0
    }

    /// Serialize the pool in the class file wire format (count, then entries)
    pub fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u16::<BigEndian>(self.constants.offset_len().0 as u16)?;
        for (_, constant) in self.constants.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Default for ConstantsPool {
    fn default() -> ConstantsPool {
        ConstantsPool::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::descriptors::FieldType;
    use crate::jvm::names::UnqualifiedName;

    #[test]
    fn interning_deduplicates() {
        let mut pool = ConstantsPool::new();
        let idx1 = pool.get_utf8("toJson$0").unwrap();
        let idx2 = pool.get_utf8("toJson$0").unwrap();
        assert_eq!(idx1, idx2);

        let cls1 = pool.get_class(&BinaryName::STRING).unwrap();
        let cls2 = pool.get_class(&BinaryName::STRING).unwrap();
        assert_eq!(cls1, cls2);
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantsPool::new();
        let long = pool.get_long(42).unwrap();
        let next = pool.get_integer(1).unwrap();
        assert_eq!(long, ConstantIndex(1));
        assert_eq!(next, ConstantIndex(3));
    }

    #[test]
    fn field_refs_share_class_and_name_entries() {
        let mut pool = ConstantsPool::new();
        let field = FieldRef {
            class: BinaryName::from_string(String::from("com/example/Order")).unwrap(),
            name: UnqualifiedName::from_string(String::from("id")).unwrap(),
            descriptor: FieldType::int(),
        };
        let before = pool.get_field_ref(&field).unwrap();
        let slots_used = pool.offset_len();
        let after = pool.get_field_ref(&field).unwrap();
        assert_eq!(before, after);
        assert_eq!(slots_used, pool.offset_len());
    }
}
