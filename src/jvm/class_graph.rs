//! Arena-backed pools of classes
//!
//! The optimizer works over two pools sharing one set of arenas: the program
//! pool (classes being analyzed and rewritten) and the library pool (the Gson
//! runtime classes referenced by analysis queries and generated code). Class,
//! field and method data are arena-allocated and linked by reference, so a
//! `&'g ClassData<'g>` is a cheap, copiable id.
//!
//! Unlike a pure code generator, this crate also has to rewrite method bodies
//! it finds, so bodies live directly on [`MethodData`] behind a `RefCell`.

use super::annotation::Annotation;
use super::code::{Code, FieldRef, MethodRef};
use super::descriptors::{FieldType, MethodDescriptor};
use super::names::{BinaryName, Name, UnqualifiedName};
use super::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::cell::RefCell;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

pub struct ClassPoolArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
    field_arena: Arena<FieldData<'g>>,
    method_arena: Arena<MethodData<'g>>,
}

impl<'g> ClassPoolArenas<'g> {
    pub fn new() -> Self {
        ClassPoolArenas {
            class_arena: Arena::new(),
            field_arena: Arena::new(),
            method_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassPoolArenas<'g> {
    fn default() -> Self {
        ClassPoolArenas::new()
    }
}

/// A pool of classes, indexed by binary name
pub struct ClassPool<'g> {
    arenas: &'g ClassPoolArenas<'g>,
    by_name: FrozenMap<&'g BinaryName, &'g ClassData<'g>>,
    in_order: FrozenVec<&'g ClassData<'g>>,
}

impl<'g> ClassPool<'g> {
    /// New empty pool
    pub fn new(arenas: &'g ClassPoolArenas<'g>) -> Self {
        ClassPool {
            arenas,
            by_name: FrozenMap::new(),
            in_order: FrozenVec::new(),
        }
    }

    /// Find a class by name
    pub fn lookup_class(&'g self, name: &BinaryName) -> Option<&'g ClassData<'g>> {
        self.by_name.get(name)
    }

    /// Add a new class to the pool
    pub fn add_class(&self, data: ClassData<'g>) -> &'g ClassData<'g> {
        let data = &*self.arenas.class_arena.alloc(data);
        self.by_name.insert(&data.name, data);
        self.in_order.push(data);
        data
    }

    /// Add a field to the pool and to its class
    pub fn add_field(&self, field: FieldData<'g>) -> &'g FieldData<'g> {
        let data = &*self.arenas.field_arena.alloc(field);
        data.class.fields.push(data);
        data
    }

    /// Add a method to the pool and to its class
    ///
    /// If a method of the same name and descriptor is already on the class,
    /// that one is returned instead.
    pub fn add_method(&self, method: MethodData<'g>) -> &'g MethodData<'g> {
        if let Some(existing) = method
            .class
            .methods
            .iter()
            .find(|m| m.name == method.name && m.descriptor == method.descriptor)
        {
            return existing;
        }
        let data = &*self.arenas.method_arena.alloc(method);
        data.class.methods.push(data);
        data
    }

    /// Iterate classes in insertion order
    pub fn classes(&self) -> impl Iterator<Item = &ClassData<'g>> {
        self.in_order.iter()
    }
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: BinaryName,

    /// Superclass is only ever missing for `java/lang/Object` itself
    pub superclass: Option<&'g ClassData<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<&'g ClassData<'g>>,

    pub access_flags: ClassAccessFlags,

    /// Fields, in declaration order
    pub fields: FrozenVec<&'g FieldData<'g>>,

    /// Methods, in declaration order
    pub methods: FrozenVec<&'g MethodData<'g>>,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        superclass: Option<&'g ClassData<'g>>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            superclass,
            interfaces: FrozenVec::new(),
            access_flags,
            fields: FrozenVec::new(),
            methods: FrozenVec::new(),
        }
    }

    /// Find a declared field by name
    pub fn field(&self, name: &UnqualifiedName) -> Option<&FieldData<'g>> {
        self.fields.iter().find(|field| &field.name == name)
    }

    /// Find a declared method by name and descriptor
    pub fn method(
        &self,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor<BinaryName>,
    ) -> Option<&MethodData<'g>> {
        self.methods
            .iter()
            .find(|method| &method.name == name && &method.descriptor == descriptor)
    }

    /// Does the class directly implement the named interface?
    pub fn implements(&self, interface: &BinaryName) -> bool {
        self.interfaces.iter().any(|i| &i.name == interface)
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

pub struct FieldData<'g> {
    /// Class declaring this field
    pub class: &'g ClassData<'g>,

    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,

    /// Declared generic signature, if the field has one (JVMS 4.7.9.1)
    pub signature: Option<String>,

    pub access_flags: FieldAccessFlags,

    /// Decoded runtime-visible annotations
    pub annotations: Vec<Annotation>,
}

impl<'g> FieldData<'g> {
    /// Look up an annotation by its class
    pub fn annotation(&self, type_name: &BinaryName) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| &annotation.type_name == type_name)
    }

    /// Symbolic reference to this field
    pub fn as_ref(&self) -> FieldRef {
        FieldRef {
            class: self.class.name.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

impl<'g> Debug for FieldData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}.{:?}", self.class, self.name)
    }
}

pub struct MethodData<'g> {
    /// Class declaring this method
    pub class: &'g ClassData<'g>,

    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub access_flags: MethodAccessFlags,

    /// Method body (`None` for abstract and native methods)
    ///
    /// Behind a `RefCell` because the adder replaces template bodies in
    /// place.
    pub code: RefCell<Option<Code>>,
}

impl<'g> MethodData<'g> {
    pub fn new(
        class: &'g ClassData<'g>,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
        access_flags: MethodAccessFlags,
        code: Option<Code>,
    ) -> MethodData<'g> {
        MethodData {
            class,
            name,
            descriptor,
            access_flags,
            code: RefCell::new(code),
        }
    }

    /// Symbolic reference to this method
    pub fn as_ref(&self) -> MethodRef {
        MethodRef {
            class: self.class.name.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

impl<'g> Debug for MethodData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}.{:?}", self.class, self.name)
    }
}

/// References to the Gson runtime classes the optimizer queries and emits
/// calls into
pub struct GsonLibrary<'g> {
    pub object: &'g ClassData<'g>,
    pub gson: &'g ClassData<'g>,
    pub gson_builder: &'g ClassData<'g>,
    pub type_adapter: &'g ClassData<'g>,
    pub type_token: &'g ClassData<'g>,
    pub json_writer: &'g ClassData<'g>,
    pub json_reader: &'g ClassData<'g>,
}

impl<'g> GsonLibrary<'g> {
    /// Register the Gson runtime surface into a (library) class pool
    pub fn add_to_pool(pool: &'g ClassPool<'g>) -> GsonLibrary<'g> {
        let object = pool.add_class(ClassData::new(
            BinaryName::OBJECT,
            None,
            ClassAccessFlags::PUBLIC,
        ));
        let add = |name: BinaryName| {
            pool.add_class(ClassData::new(
                name,
                Some(object),
                ClassAccessFlags::PUBLIC,
            ))
        };
        let gson = add(BinaryName::GSON);
        let gson_builder = add(BinaryName::GSONBUILDER);
        let type_adapter = add(BinaryName::TYPEADAPTER);
        let type_token = add(BinaryName::TYPETOKEN);
        let json_writer = add(BinaryName::JSONWRITER);
        let json_reader = add(BinaryName::JSONREADER);

        let library = GsonLibrary {
            object,
            gson,
            gson_builder,
            type_adapter,
            type_token,
            json_writer,
            json_reader,
        };
        library.add_members(pool);
        library
    }

    fn add_members(&self, pool: &ClassPool<'g>) {
        let writer_type = FieldType::object(BinaryName::JSONWRITER);
        let public = MethodAccessFlags::PUBLIC;

        // JsonWriter value/name overloads (each returns the writer itself)
        let writer_method = |parameter: FieldType<BinaryName>, name: UnqualifiedName| {
            MethodData::new(
                self.json_writer,
                name,
                MethodDescriptor {
                    parameters: vec![parameter],
                    return_type: Some(writer_type.clone()),
                },
                public,
                None,
            )
        };
        pool.add_method(writer_method(
            FieldType::object(BinaryName::STRING),
            UnqualifiedName::NAMEMETHOD,
        ));
        pool.add_method(writer_method(FieldType::boolean(), UnqualifiedName::VALUE));
        pool.add_method(writer_method(
            FieldType::object(BinaryName::BOOLEAN),
            UnqualifiedName::VALUE,
        ));
        pool.add_method(writer_method(FieldType::long(), UnqualifiedName::VALUE));
        pool.add_method(writer_method(
            FieldType::Base(super::BaseType::Double),
            UnqualifiedName::VALUE,
        ));
        pool.add_method(writer_method(
            FieldType::object(BinaryName::STRING),
            UnqualifiedName::VALUE,
        ));
        pool.add_method(writer_method(
            FieldType::object(BinaryName::NUMBER),
            UnqualifiedName::VALUE,
        ));
        for name in [UnqualifiedName::BEGINOBJECT, UnqualifiedName::ENDOBJECT] {
            pool.add_method(MethodData::new(
                self.json_writer,
                name,
                MethodDescriptor {
                    parameters: vec![],
                    return_type: Some(writer_type.clone()),
                },
                public,
                None,
            ));
        }

        // JsonReader cursor methods
        let reader_method = |name: UnqualifiedName, return_type: Option<FieldType<BinaryName>>| {
            MethodData::new(
                self.json_reader,
                name,
                MethodDescriptor {
                    parameters: vec![],
                    return_type,
                },
                public,
                None,
            )
        };
        pool.add_method(reader_method(UnqualifiedName::BEGINOBJECT, None));
        pool.add_method(reader_method(UnqualifiedName::ENDOBJECT, None));
        pool.add_method(reader_method(
            UnqualifiedName::HASNEXT,
            Some(FieldType::boolean()),
        ));
        pool.add_method(reader_method(
            UnqualifiedName::NEXTNAME,
            Some(FieldType::object(BinaryName::STRING)),
        ));
        pool.add_method(reader_method(
            UnqualifiedName::NEXTBOOLEAN,
            Some(FieldType::boolean()),
        ));
        pool.add_method(reader_method(
            UnqualifiedName::NEXTINT,
            Some(FieldType::int()),
        ));
        pool.add_method(reader_method(
            UnqualifiedName::NEXTLONG,
            Some(FieldType::long()),
        ));
        pool.add_method(reader_method(
            UnqualifiedName::NEXTDOUBLE,
            Some(FieldType::Base(super::BaseType::Double)),
        ));
        pool.add_method(reader_method(
            UnqualifiedName::NEXTSTRING,
            Some(FieldType::object(BinaryName::STRING)),
        ));
        pool.add_method(reader_method(UnqualifiedName::SKIPVALUE, None));

        // Gson#getAdapter and TypeAdapter#write/read and TypeToken#getRawType
        pool.add_method(MethodData::new(
            self.gson,
            UnqualifiedName::GETADAPTER,
            MethodDescriptor {
                parameters: vec![FieldType::object(BinaryName::CLASS)],
                return_type: Some(FieldType::object(BinaryName::TYPEADAPTER)),
            },
            public,
            None,
        ));
        pool.add_method(MethodData::new(
            self.type_adapter,
            UnqualifiedName::WRITE,
            MethodDescriptor {
                parameters: vec![
                    FieldType::object(BinaryName::JSONWRITER),
                    FieldType::object(BinaryName::OBJECT),
                ],
                return_type: None,
            },
            public,
            None,
        ));
        pool.add_method(MethodData::new(
            self.type_adapter,
            UnqualifiedName::READ,
            MethodDescriptor {
                parameters: vec![FieldType::object(BinaryName::JSONREADER)],
                return_type: Some(FieldType::object(BinaryName::OBJECT)),
            },
            public,
            None,
        ));
        pool.add_method(MethodData::new(
            self.type_token,
            UnqualifiedName::GETRAWTYPE,
            MethodDescriptor {
                parameters: vec![],
                return_type: Some(FieldType::object(BinaryName::CLASS)),
            },
            public,
            None,
        ));
    }
}
