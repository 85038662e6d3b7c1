//! Per-type strategies for writing a field without adapter dispatch
//!
//! Each strategy knows how to emit a direct `JsonWriter` call for one
//! elementary value kind. A strategy only applies when no user-registered
//! adapter covers the corresponding boxed type (a user adapter always wins)
//! and, for wrapper types, when the specific writer overload it relies on
//! survived in the library pool.
//!
//! Generated serializer methods share one frame layout: slot 0 is the
//! receiver, slot 1 the `Gson` instance, slot 2 the `JsonWriter`.

use super::settings::RuntimeSettings;
use crate::jvm::class_graph::{ClassPool, FieldData};
use crate::jvm::code::{CodeEmitter, Instruction, InvokeType, MethodRef};
use crate::jvm::{BaseType, BinaryName, Error, FieldType, MethodDescriptor, UnqualifiedName};

/// One inline-serialization strategy
pub trait InlineSerializer {
    /// Can this strategy be used under the observed settings and library?
    ///
    /// Pure query: deterministic for a given pair of inputs and safe to
    /// call concurrently.
    fn can_serialize<'g>(&self, library: &'g ClassPool<'g>, settings: &RuntimeSettings) -> bool;

    /// Append the instructions that write the field's value directly
    fn serialize(&self, field: &FieldData<'_>, code: &mut CodeEmitter) -> Result<(), Error>;
}

/// `JsonWriter#value` overload taking `parameter`
fn writer_value(parameter: FieldType<BinaryName>) -> MethodRef {
    MethodRef {
        class: BinaryName::JSONWRITER,
        name: UnqualifiedName::VALUE,
        descriptor: MethodDescriptor {
            parameters: vec![parameter],
            return_type: Some(FieldType::object(BinaryName::JSONWRITER)),
        },
    }
}

/// Load the writer and the field's raw value onto the stack
fn load_field(field: &FieldData<'_>, code: &mut CodeEmitter) -> Result<(), Error> {
    code.push_instruction(Instruction::ALoad(2))?;
    code.push_instruction(Instruction::ALoad(0))?;
    code.push_instruction(Instruction::GetField(field.as_ref()))
}

/// Writes `boolean` fields through `JsonWriter#value(Z)`
pub struct InlinePrimitiveBooleanSerializer;

impl InlineSerializer for InlinePrimitiveBooleanSerializer {
    fn can_serialize<'g>(&self, _library: &'g ClassPool<'g>, settings: &RuntimeSettings) -> bool {
        !settings.has_type_adapter_for(&BinaryName::BOOLEAN)
    }

    fn serialize(&self, field: &FieldData<'_>, code: &mut CodeEmitter) -> Result<(), Error> {
        load_field(field, code)?;
        code.invoke(InvokeType::Virtual, writer_value(FieldType::boolean()))?;
        code.push_instruction(Instruction::Pop)
    }
}

/// Writes `java/lang/Boolean` fields through `JsonWriter#value(Ljava/lang/Boolean;)`
pub struct InlineBooleanSerializer;

impl InlineSerializer for InlineBooleanSerializer {
    fn can_serialize<'g>(&self, library: &'g ClassPool<'g>, settings: &RuntimeSettings) -> bool {
        if settings.has_type_adapter_for(&BinaryName::BOOLEAN) {
            return false;
        }
        // The writer class being absent altogether is a broken library
        // pool, not a "cannot inline" answer. A shrunk writer that merely
        // lost the overload is.
        let writer = library
            .lookup_class(&BinaryName::JSONWRITER)
            .unwrap_or_else(|| panic!("{} missing from library pool", BinaryName::JSONWRITER.dotted()));
        writer
            .method(
                &UnqualifiedName::VALUE,
                &writer_value(FieldType::object(BinaryName::BOOLEAN)).descriptor,
            )
            .is_some()
    }

    fn serialize(&self, field: &FieldData<'_>, code: &mut CodeEmitter) -> Result<(), Error> {
        load_field(field, code)?;
        code.invoke(
            InvokeType::Virtual,
            writer_value(FieldType::object(BinaryName::BOOLEAN)),
        )?;
        code.push_instruction(Instruction::Pop)
    }
}

/// Writes `byte`, `char`, `short` and `int` fields by widening to `long`
/// and calling `JsonWriter#value(J)`
pub struct InlinePrimitiveIntegerSerializer {
    pub base: BaseType,
}

impl InlineSerializer for InlinePrimitiveIntegerSerializer {
    fn can_serialize<'g>(&self, _library: &'g ClassPool<'g>, settings: &RuntimeSettings) -> bool {
        !settings.has_type_adapter_for(&self.base.boxed_class())
    }

    fn serialize(&self, field: &FieldData<'_>, code: &mut CodeEmitter) -> Result<(), Error> {
        load_field(field, code)?;
        code.push_instruction(Instruction::I2L)?;
        code.invoke(InvokeType::Virtual, writer_value(FieldType::long()))?;
        code.push_instruction(Instruction::Pop)
    }
}

/// Writes `java/lang/String` fields through `JsonWriter#value(Ljava/lang/String;)`
pub struct InlineStringSerializer;

impl InlineSerializer for InlineStringSerializer {
    fn can_serialize<'g>(&self, library: &'g ClassPool<'g>, settings: &RuntimeSettings) -> bool {
        if settings.has_type_adapter_for(&BinaryName::STRING) {
            return false;
        }
        match library.lookup_class(&BinaryName::JSONWRITER) {
            Some(writer) => writer
                .method(
                    &UnqualifiedName::VALUE,
                    &writer_value(FieldType::object(BinaryName::STRING)).descriptor,
                )
                .is_some(),
            None => false,
        }
    }

    fn serialize(&self, field: &FieldData<'_>, code: &mut CodeEmitter) -> Result<(), Error> {
        load_field(field, code)?;
        code.invoke(
            InvokeType::Virtual,
            writer_value(FieldType::object(BinaryName::STRING)),
        )?;
        code.push_instruction(Instruction::Pop)
    }
}

/// Pick the strategy for a field's declared type, if one applies
pub fn serializer_for(descriptor: &FieldType<BinaryName>) -> Option<Box<dyn InlineSerializer>> {
    match descriptor {
        FieldType::Base(BaseType::Boolean) => Some(Box::new(InlinePrimitiveBooleanSerializer)),
        FieldType::Base(base @ (BaseType::Byte | BaseType::Char | BaseType::Short | BaseType::Int)) => {
            Some(Box::new(InlinePrimitiveIntegerSerializer { base: *base }))
        }
        FieldType::Object(class) if class == &BinaryName::BOOLEAN => {
            Some(Box::new(InlineBooleanSerializer))
        }
        FieldType::Object(class) if class == &BinaryName::STRING => {
            Some(Box::new(InlineStringSerializer))
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassData, ClassPoolArenas, FieldData, GsonLibrary, MethodData};
    use crate::jvm::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags, Name};

    #[test]
    fn user_adapters_always_win() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        GsonLibrary::add_to_pool(&pool);

        let mut settings = RuntimeSettings::default();
        assert!(InlineBooleanSerializer.can_serialize(&pool, &settings));
        assert!(InlinePrimitiveBooleanSerializer.can_serialize(&pool, &settings));

        settings.type_adapter_classes.insert(BinaryName::BOOLEAN, None);
        assert!(!InlineBooleanSerializer.can_serialize(&pool, &settings));
        assert!(!InlinePrimitiveBooleanSerializer.can_serialize(&pool, &settings));

        // An adapter for an unrelated type changes nothing
        let mut settings = RuntimeSettings::default();
        settings.type_adapter_classes.insert(BinaryName::LONG, None);
        assert!(InlineBooleanSerializer.can_serialize(&pool, &settings));
    }

    #[test]
    fn shrunk_writer_overload_disables_the_wrapper_strategy() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        // A writer class that lost its Boolean overload to shrinking
        let writer = pool.add_class(ClassData::new(
            BinaryName::JSONWRITER,
            None,
            ClassAccessFlags::PUBLIC,
        ));
        pool.add_method(MethodData::new(
            writer,
            UnqualifiedName::VALUE,
            writer_value(FieldType::boolean()).descriptor,
            MethodAccessFlags::PUBLIC,
            None,
        ));

        let settings = RuntimeSettings::default();
        assert!(!InlineBooleanSerializer.can_serialize(&pool, &settings));
        // The primitive strategy has no overload dependency
        assert!(InlinePrimitiveBooleanSerializer.can_serialize(&pool, &settings));
    }

    #[test]
    #[should_panic(expected = "missing from library pool")]
    fn absent_writer_class_is_a_broken_precondition() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let settings = RuntimeSettings::default();
        InlineBooleanSerializer.can_serialize(&pool, &settings);
    }

    #[test]
    fn can_serialize_is_deterministic() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        GsonLibrary::add_to_pool(&pool);
        let settings = RuntimeSettings::default();

        let first = InlineStringSerializer.can_serialize(&pool, &settings);
        let second = InlineStringSerializer.can_serialize(&pool, &settings);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn strategies_cover_the_elementary_kinds() {
        assert!(serializer_for(&FieldType::boolean()).is_some());
        assert!(serializer_for(&FieldType::int()).is_some());
        assert!(serializer_for(&FieldType::object(BinaryName::STRING)).is_some());
        assert!(serializer_for(&FieldType::object(BinaryName::BOOLEAN)).is_some());
        assert!(serializer_for(&FieldType::long()).is_none());
        assert!(serializer_for(&FieldType::object(BinaryName::OBJECT)).is_none());
    }

    #[test]
    fn integer_serialization_widens_before_the_writer_call() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = pool.add_class(ClassData::new(
            BinaryName::from_string(String::from("com/example/Order")).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        let field = pool.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("id")).unwrap(),
            descriptor: FieldType::int(),
            signature: None,
            access_flags: FieldAccessFlags::PRIVATE,
            annotations: vec![],
        });

        let mut code = CodeEmitter::new(3);
        let strategy = InlinePrimitiveIntegerSerializer {
            base: BaseType::Int,
        };
        strategy.serialize(field, &mut code).unwrap();
        code.push_instruction(Instruction::Return).unwrap();
        let body = code.result().unwrap();
        assert!(body
            .instructions()
            .iter()
            .any(|insn| matches!(insn, Instruction::I2L)));
        assert!(body.instructions().iter().any(
            |insn| matches!(insn, Instruction::Invoke(InvokeType::Virtual, m) if m.name == UnqualifiedName::VALUE),
        ));
    }
}
