//! Adapter template skeletons
//!
//! The generated wiring needs two stable, always-present classes: a
//! `TypeAdapterFactory` whose `create` routes domain classes to the
//! generated adapter, and a `TypeAdapter` implementation whose
//! `write`/`read` dispatch over the class index. They start out inert
//! (no-op or `null`-returning bodies) and are patched by the adder once
//! analysis has finished.

use super::settings::Settings;
use crate::jvm::class_graph::{ClassData, ClassPool, FieldData, GsonLibrary, MethodData};
use crate::jvm::code::{Code, FieldRef, Instruction, InvokeType, MethodRef};
use crate::jvm::{
    BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
    MethodDescriptor, UnqualifiedName,
};

pub struct Templates<'g> {
    pub factory: &'g ClassData<'g>,
    pub adapter_impl: &'g ClassData<'g>,
}

/// Add the inert template classes to the program pool
pub fn inject_templates<'g>(
    program: &'g ClassPool<'g>,
    library: &GsonLibrary<'g>,
    settings: &Settings,
) -> Templates<'g> {
    let factory = program.add_class(ClassData::new(
        settings.factory_template_class.clone(),
        Some(library.object),
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
    ));
    program.add_method(MethodData::new(
        factory,
        UnqualifiedName::CREATE,
        MethodDescriptor {
            parameters: vec![
                FieldType::object(BinaryName::GSON),
                FieldType::object(BinaryName::TYPETOKEN),
            ],
            return_type: Some(FieldType::object(BinaryName::TYPEADAPTER)),
        },
        MethodAccessFlags::PUBLIC,
        Some(Code::of(vec![Instruction::AConstNull, Instruction::AReturn])),
    ));

    let adapter_impl = program.add_class(ClassData::new(
        settings.adapter_template_class.clone(),
        Some(library.type_adapter),
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
    ));
    program.add_field(FieldData {
        class: adapter_impl,
        name: UnqualifiedName::GSONFIELD,
        descriptor: FieldType::object(BinaryName::GSON),
        signature: None,
        access_flags: FieldAccessFlags::PRIVATE | FieldAccessFlags::FINAL,
        annotations: vec![],
    });
    program.add_field(FieldData {
        class: adapter_impl,
        name: UnqualifiedName::CLASSINDEXFIELD,
        descriptor: FieldType::int(),
        signature: None,
        access_flags: FieldAccessFlags::PRIVATE | FieldAccessFlags::FINAL,
        annotations: vec![],
    });
    program.add_method(MethodData::new(
        adapter_impl,
        UnqualifiedName::INIT,
        MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::GSON), FieldType::int()],
            return_type: None,
        },
        MethodAccessFlags::PUBLIC,
        Some(Code::of(vec![
            Instruction::ALoad(0),
            Instruction::Invoke(
                InvokeType::Special,
                MethodRef {
                    class: BinaryName::TYPEADAPTER,
                    name: UnqualifiedName::INIT,
                    descriptor: MethodDescriptor {
                        parameters: vec![],
                        return_type: None,
                    },
                },
            ),
            Instruction::ALoad(0),
            Instruction::ALoad(1),
            Instruction::PutField(FieldRef {
                class: settings.adapter_template_class.clone(),
                name: UnqualifiedName::GSONFIELD,
                descriptor: FieldType::object(BinaryName::GSON),
            }),
            Instruction::ALoad(0),
            Instruction::ILoad(2),
            Instruction::PutField(FieldRef {
                class: settings.adapter_template_class.clone(),
                name: UnqualifiedName::CLASSINDEXFIELD,
                descriptor: FieldType::int(),
            }),
            Instruction::Return,
        ])),
    ));
    program.add_method(MethodData::new(
        adapter_impl,
        UnqualifiedName::WRITE,
        MethodDescriptor {
            parameters: vec![
                FieldType::object(BinaryName::JSONWRITER),
                FieldType::object(BinaryName::OBJECT),
            ],
            return_type: None,
        },
        MethodAccessFlags::PUBLIC,
        Some(Code::of(vec![Instruction::Return])),
    ));
    program.add_method(MethodData::new(
        adapter_impl,
        UnqualifiedName::READ,
        MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::JSONREADER)],
            return_type: Some(FieldType::object(BinaryName::OBJECT)),
        },
        MethodAccessFlags::PUBLIC,
        Some(Code::of(vec![Instruction::AConstNull, Instruction::AReturn])),
    ));
    program.add_method(MethodData::new(
        adapter_impl,
        UnqualifiedName::FIELDINDEX,
        MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::STRING)],
            return_type: Some(FieldType::int()),
        },
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        Some(Code::of(vec![Instruction::IConstM1, Instruction::IReturn])),
    ));

    Templates {
        factory,
        adapter_impl,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::ClassPoolArenas;

    #[test]
    fn templates_start_inert() {
        let arenas = ClassPoolArenas::new();
        let library_pool = ClassPool::new(&arenas);
        let library = GsonLibrary::add_to_pool(&library_pool);
        let program = ClassPool::new(&arenas);

        let templates = inject_templates(&program, &library, &Settings::new());
        let create = templates
            .factory
            .methods
            .iter()
            .find(|m| m.name == UnqualifiedName::CREATE)
            .unwrap();
        let code = create.code.borrow();
        assert_eq!(
            code.as_ref().unwrap().instructions()[0],
            Instruction::AConstNull,
        );
        assert_eq!(
            templates.adapter_impl.superclass.map(|c| c.name.clone()),
            Some(BinaryName::TYPEADAPTER),
        );
        assert!(templates
            .adapter_impl
            .field(&UnqualifiedName::CLASSINDEXFIELD)
            .is_some());
    }
}
