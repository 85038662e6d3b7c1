//! Adapter generation and registration
//!
//! The adder consumes the finished analysis aggregates and does the actual
//! rewriting: it generates per-class `toJson$n`/`fromJson$n` companion
//! methods on the domain classes, then patches the adapter-factory and
//! adapter-implementation templates so the generated code has a fixed,
//! always-present call target no matter which domain classes ended up
//! specialized.

use super::errors::Error;
use super::info::{ClassJsonInfo, OptimizedJsonInfo};
use super::inline::serializer_for;
use super::settings::{RuntimeSettings, Settings};
use crate::jvm::class_graph::{ClassData, ClassPool, FieldData, MethodData};
use crate::jvm::code::{
    Code, CodeEmitter, Comparison, FieldRef, Instruction, InvokeType, Label, MethodRef,
};
use crate::jvm::{
    BaseType, BinaryName, FieldType, MethodAccessFlags, MethodDescriptor, Name, UnqualifiedName,
};
use std::collections::{BTreeMap, BTreeSet};

/// One accepted domain class in the template dispatch
struct DispatchEntry<'g> {
    /// Key in the `classIndex` switches
    routing_index: u32,

    /// Suffix of the direction's companion method
    method_index: u32,

    class: &'g ClassData<'g>,
}

pub struct TypeAdapterAdder<'a, 'g> {
    pub program: &'g ClassPool<'g>,
    pub library: &'g ClassPool<'g>,
    pub settings: &'a Settings,
    pub runtime_settings: &'a RuntimeSettings,
}

impl<'a, 'g> TypeAdapterAdder<'a, 'g> {
    /// Generate companion methods and patch the templates
    ///
    /// Expects both aggregates to have gone through their indexing pass.
    /// A missing template or writer/reader library class is a fatal
    /// precondition failure.
    pub fn add_adapters(
        &self,
        serialize: &OptimizedJsonInfo,
        deserialize: &OptimizedJsonInfo,
        unsafe_classes: &BTreeSet<BinaryName>,
    ) -> Result<(), Error> {
        let factory = self
            .program
            .lookup_class(&self.settings.factory_template_class)
            .ok_or_else(|| {
                Error::MissingTemplate(self.settings.factory_template_class.dotted())
            })?;
        let adapter_impl = self
            .program
            .lookup_class(&self.settings.adapter_template_class)
            .ok_or_else(|| {
                Error::MissingTemplate(self.settings.adapter_template_class.dotted())
            })?;
        if self.library.lookup_class(&BinaryName::JSONWRITER).is_none() {
            return Err(Error::MissingLibraryClass(BinaryName::JSONWRITER.dotted()));
        }
        if self.library.lookup_class(&BinaryName::JSONREADER).is_none() {
            return Err(Error::MissingLibraryClass(BinaryName::JSONREADER.dotted()));
        }

        // The two directions index classes independently, but the adapter
        // stores one `classIndex`. Dispatch is therefore keyed by a routing
        // index over the union of accepted classes; per-direction indices
        // only pick the companion method names.
        let mut routing: BTreeMap<BinaryName, u32> = BTreeMap::new();
        for class_name in serialize
            .class_json_infos
            .keys()
            .chain(deserialize.class_json_infos.keys())
        {
            if unsafe_classes.contains(class_name)
                || self.program.lookup_class(class_name).is_none()
            {
                continue;
            }
            let next = routing.len() as u32;
            routing.entry(class_name.clone()).or_insert(next);
        }

        let mut serialized_classes = vec![];
        for (class_name, class_info) in &serialize.class_json_infos {
            let routing_index = match routing.get(class_name) {
                Some(routing_index) => *routing_index,
                None => continue,
            };
            let class = match self.program.lookup_class(class_name) {
                Some(class) => class,
                None => continue,
            };
            let index = serialize
                .class_index(class_name)
                .expect("class collected but never indexed");
            self.generate_to_json(class, class_info, index)?;
            serialized_classes.push(DispatchEntry {
                routing_index,
                method_index: index,
                class,
            });
        }

        let mut deserialized_classes = vec![];
        for (class_name, class_info) in &deserialize.class_json_infos {
            let routing_index = match routing.get(class_name) {
                Some(routing_index) => *routing_index,
                None => continue,
            };
            let class = match self.program.lookup_class(class_name) {
                Some(class) => class,
                None => continue,
            };
            let index = deserialize
                .class_index(class_name)
                .expect("class collected but never indexed");
            self.generate_from_json(class, index)?;
            self.generate_from_json_field(class, class_info, deserialize, index)?;
            deserialized_classes.push(DispatchEntry {
                routing_index,
                method_index: index,
                class,
            });
        }

        self.patch_factory_create(factory, &routing)?;
        self.patch_impl_write(adapter_impl, &serialized_classes)?;
        self.patch_impl_read(adapter_impl, &deserialized_classes)?;
        self.patch_field_index(adapter_impl, deserialize)?;
        Ok(())
    }

    /// `toJson$n(Gson, JsonWriter)`: write each exposed field directly
    ///
    /// Receiver in slot 0, `Gson` in 1, `JsonWriter` in 2.
    fn generate_to_json(
        &self,
        class: &'g ClassData<'g>,
        class_info: &ClassJsonInfo,
        index: u32,
    ) -> Result<(), Error> {
        let mut code = CodeEmitter::new(3);
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(InvokeType::Virtual, writer_chain_call(UnqualifiedName::BEGINOBJECT))?;
        code.push_instruction(Instruction::Pop)?;

        for field_name in &class_info.exposed_java_field_names {
            let field = match class.field(field_name) {
                Some(field) => field,
                None => continue,
            };
            let json_name = match class_info
                .java_to_json_field_names
                .get(field_name)
                .and_then(|names| names.first())
            {
                Some(name) => name,
                None => continue,
            };
            code.push_instruction(Instruction::ALoad(2))?;
            code.const_string(json_name)?;
            code.invoke(InvokeType::Virtual, writer_name_call())?;
            code.push_instruction(Instruction::Pop)?;

            match serializer_for(&field.descriptor) {
                Some(strategy)
                    if strategy.can_serialize(self.library, self.runtime_settings) =>
                {
                    strategy.serialize(field, &mut code)?;
                }
                _ => self.emit_adapter_write(field, &mut code)?,
            }
        }

        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(InvokeType::Virtual, writer_chain_call(UnqualifiedName::ENDOBJECT))?;
        code.push_instruction(Instruction::Pop)?;
        code.push_instruction(Instruction::Return)?;

        self.program.add_method(MethodData::new(
            class,
            to_json_name(index),
            MethodDescriptor {
                parameters: vec![
                    FieldType::object(BinaryName::GSON),
                    FieldType::object(BinaryName::JSONWRITER),
                ],
                return_type: None,
            },
            MethodAccessFlags::PUBLIC | MethodAccessFlags::SYNTHETIC,
            Some(code.result()?),
        ));
        Ok(())
    }

    /// Delegate one field to `Gson#getAdapter`, boxing primitives
    fn emit_adapter_write(
        &self,
        field: &FieldData<'g>,
        code: &mut CodeEmitter,
    ) -> Result<(), Error> {
        code.push_instruction(Instruction::ALoad(1))?;
        code.const_class(&adapter_token_class(&field.descriptor))?;
        code.invoke(InvokeType::Virtual, gson_get_adapter())?;
        code.push_instruction(Instruction::ALoad(2))?;
        code.push_instruction(Instruction::ALoad(0))?;
        code.push_instruction(Instruction::GetField(field.as_ref()))?;
        if let Some(base) = field.descriptor.as_base() {
            code.invoke(InvokeType::Static, box_value(base))?;
        }
        code.invoke(InvokeType::Virtual, type_adapter_write())?;
        Ok(())
    }

    /// `fromJson$n(Gson, JsonReader)`: object-reading loop
    ///
    /// Dispatches each encountered name through the template's
    /// `fieldIndex$` helper into `fromJsonField$n`.
    fn generate_from_json(&self, class: &'g ClassData<'g>, index: u32) -> Result<(), Error> {
        let mut code = CodeEmitter::new(3);
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(InvokeType::Virtual, reader_call(UnqualifiedName::BEGINOBJECT, None))?;

        let loop_start = code.fresh_label();
        let loop_end = code.fresh_label();
        code.place_label(loop_start)?;
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(
            InvokeType::Virtual,
            reader_call(UnqualifiedName::HASNEXT, Some(FieldType::boolean())),
        )?;
        code.push_instruction(Instruction::If(Comparison::EqZero, loop_end))?;

        code.push_instruction(Instruction::ALoad(0))?;
        code.push_instruction(Instruction::ALoad(1))?;
        code.push_instruction(Instruction::ALoad(2))?;
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(
            InvokeType::Virtual,
            reader_call(
                UnqualifiedName::NEXTNAME,
                Some(FieldType::object(BinaryName::STRING)),
            ),
        )?;
        code.invoke(
            InvokeType::Static,
            field_index_call(&self.settings.adapter_template_class),
        )?;
        code.invoke(
            InvokeType::Virtual,
            MethodRef {
                class: class.name.clone(),
                name: from_json_field_name(index),
                descriptor: from_json_field_descriptor(),
            },
        )?;
        code.push_instruction(Instruction::Goto(loop_start))?;

        code.place_label(loop_end)?;
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(InvokeType::Virtual, reader_call(UnqualifiedName::ENDOBJECT, None))?;
        code.push_instruction(Instruction::Return)?;

        self.program.add_method(MethodData::new(
            class,
            from_json_name(index),
            MethodDescriptor {
                parameters: vec![
                    FieldType::object(BinaryName::GSON),
                    FieldType::object(BinaryName::JSONREADER),
                ],
                return_type: None,
            },
            MethodAccessFlags::PUBLIC | MethodAccessFlags::SYNTHETIC,
            Some(code.result()?),
        ));
        Ok(())
    }

    /// `fromJsonField$n(Gson, JsonReader, int)`: switch over field index
    ///
    /// Unknown indices (including fields excluded from the fast path) fall
    /// through to `skipValue`.
    fn generate_from_json_field(
        &self,
        class: &'g ClassData<'g>,
        class_info: &ClassJsonInfo,
        info: &OptimizedJsonInfo,
        index: u32,
    ) -> Result<(), Error> {
        let mut code = CodeEmitter::new(4);
        let default = code.fresh_label();
        let end = code.fresh_label();

        let mut cases = vec![];
        let mut arms: Vec<(Label, &FieldData<'g>)> = vec![];
        for field_name in &class_info.exposed_java_field_names {
            let field = match class.field(field_name) {
                Some(field) => field,
                None => continue,
            };
            let json_names = match class_info.java_to_json_field_names.get(field_name) {
                Some(names) => names,
                None => continue,
            };
            let arm = code.fresh_label();
            for json_name in json_names {
                let field_index = info
                    .json_field_index(json_name)
                    .expect("json name collected but never indexed");
                cases.push((field_index as i32, arm));
            }
            arms.push((arm, field));
        }
        cases.sort_by_key(|(key, _)| *key);

        code.push_instruction(Instruction::ILoad(3))?;
        code.push_instruction(Instruction::LookupSwitch { default, cases })?;

        for (arm, field) in arms {
            code.place_label(arm)?;
            self.emit_field_read(field, &mut code)?;
            code.push_instruction(Instruction::Goto(end))?;
        }

        code.place_label(default)?;
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(InvokeType::Virtual, reader_call(UnqualifiedName::SKIPVALUE, None))?;

        code.place_label(end)?;
        code.push_instruction(Instruction::Return)?;

        self.program.add_method(MethodData::new(
            class,
            from_json_field_name(index),
            from_json_field_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::SYNTHETIC,
            Some(code.result()?),
        ));
        Ok(())
    }

    /// Read one field value from the reader into its field
    fn emit_field_read(&self, field: &FieldData<'g>, code: &mut CodeEmitter) -> Result<(), Error> {
        let inlinable = serializer_for(&field.descriptor)
            .map(|strategy| strategy.can_serialize(self.library, self.runtime_settings))
            .unwrap_or(false);

        code.push_instruction(Instruction::ALoad(0))?;
        if inlinable {
            code.push_instruction(Instruction::ALoad(2))?;
            match &field.descriptor {
                FieldType::Base(BaseType::Boolean) => {
                    code.invoke(
                        InvokeType::Virtual,
                        reader_call(UnqualifiedName::NEXTBOOLEAN, Some(FieldType::boolean())),
                    )?;
                }
                FieldType::Base(base @ (BaseType::Byte | BaseType::Char | BaseType::Short)) => {
                    code.invoke(
                        InvokeType::Virtual,
                        reader_call(UnqualifiedName::NEXTINT, Some(FieldType::int())),
                    )?;
                    let narrow = match base {
                        BaseType::Byte => Instruction::I2B,
                        BaseType::Char => Instruction::I2C,
                        _ => Instruction::I2S,
                    };
                    code.push_instruction(narrow)?;
                }
                FieldType::Base(BaseType::Int) => {
                    code.invoke(
                        InvokeType::Virtual,
                        reader_call(UnqualifiedName::NEXTINT, Some(FieldType::int())),
                    )?;
                }
                FieldType::Object(class) if class == &BinaryName::BOOLEAN => {
                    code.invoke(
                        InvokeType::Virtual,
                        reader_call(UnqualifiedName::NEXTBOOLEAN, Some(FieldType::boolean())),
                    )?;
                    code.invoke(InvokeType::Static, box_value(BaseType::Boolean))?;
                }
                _ => {
                    code.invoke(
                        InvokeType::Virtual,
                        reader_call(
                            UnqualifiedName::NEXTSTRING,
                            Some(FieldType::object(BinaryName::STRING)),
                        ),
                    )?;
                }
            }
        } else {
            code.push_instruction(Instruction::ALoad(1))?;
            code.const_class(&adapter_token_class(&field.descriptor))?;
            code.invoke(InvokeType::Virtual, gson_get_adapter())?;
            code.push_instruction(Instruction::ALoad(2))?;
            code.invoke(InvokeType::Virtual, type_adapter_read())?;
            code.push_instruction(Instruction::CheckCast(adapter_token_class(
                &field.descriptor,
            )))?;
            if let Some(base) = field.descriptor.as_base() {
                code.invoke(InvokeType::Virtual, unbox_value(base))?;
            }
        }
        code.push_instruction(Instruction::PutField(field.as_ref()))
            .map_err(Error::from)
    }

    /// Patch the factory's `create` to route each accepted domain class to
    /// the adapter implementation
    ///
    /// Slots: 0 = factory, 1 = `Gson`, 2 = `TypeToken`; 3 holds the raw
    /// type's dotted name.
    fn patch_factory_create(
        &self,
        factory: &'g ClassData<'g>,
        routing: &BTreeMap<BinaryName, u32>,
    ) -> Result<(), Error> {
        let mut code = CodeEmitter::new(4);
        code.push_instruction(Instruction::ALoad(2))?;
        code.invoke(InvokeType::Virtual, type_token_get_raw_type())?;
        code.invoke(InvokeType::Virtual, class_get_name())?;
        code.push_instruction(Instruction::AStore(3))?;

        for (class_name, routing_index) in routing {
            let next = code.fresh_label();
            code.push_instruction(Instruction::ALoad(3))?;
            code.const_string(&class_name.dotted())?;
            code.invoke(InvokeType::Virtual, string_equals())?;
            code.push_instruction(Instruction::If(Comparison::EqZero, next))?;

            code.push_instruction(Instruction::New(
                self.settings.adapter_template_class.clone(),
            ))?;
            code.push_instruction(Instruction::Dup)?;
            code.push_instruction(Instruction::ALoad(1))?;
            code.const_int(*routing_index as i32)?;
            code.invoke(
                InvokeType::Special,
                MethodRef {
                    class: self.settings.adapter_template_class.clone(),
                    name: UnqualifiedName::INIT,
                    descriptor: MethodDescriptor {
                        parameters: vec![
                            FieldType::object(BinaryName::GSON),
                            FieldType::int(),
                        ],
                        return_type: None,
                    },
                },
            )?;
            code.push_instruction(Instruction::AReturn)?;
            code.place_label(next)?;
        }

        code.push_instruction(Instruction::AConstNull)?;
        code.push_instruction(Instruction::AReturn)?;

        replace_method_body(
            factory,
            &UnqualifiedName::CREATE,
            code.result()?,
            &self.settings.factory_template_class,
        )
    }

    /// Patch the implementation's `write` to dispatch on `classIndex`
    fn patch_impl_write(
        &self,
        adapter_impl: &'g ClassData<'g>,
        serialized: &[DispatchEntry<'g>],
    ) -> Result<(), Error> {
        let mut code = CodeEmitter::new(3);
        let default = code.fresh_label();

        let mut cases = vec![];
        let mut arms = vec![];
        for entry in serialized {
            let arm = code.fresh_label();
            cases.push((entry.routing_index as i32, arm));
            arms.push((arm, entry.method_index, entry.class));
        }
        cases.sort_by_key(|(key, _)| *key);

        code.push_instruction(Instruction::ALoad(0))?;
        code.push_instruction(Instruction::GetField(
            class_index_field(&self.settings.adapter_template_class),
        ))?;
        code.push_instruction(Instruction::LookupSwitch { default, cases })?;

        for (arm, index, class) in arms {
            code.place_label(arm)?;
            code.push_instruction(Instruction::ALoad(2))?;
            code.push_instruction(Instruction::CheckCast(class.name.clone()))?;
            code.push_instruction(Instruction::ALoad(0))?;
            code.push_instruction(Instruction::GetField(gson_field(
                &self.settings.adapter_template_class,
            )))?;
            code.push_instruction(Instruction::ALoad(1))?;
            code.invoke(
                InvokeType::Virtual,
                MethodRef {
                    class: class.name.clone(),
                    name: to_json_name(index),
                    descriptor: MethodDescriptor {
                        parameters: vec![
                            FieldType::object(BinaryName::GSON),
                            FieldType::object(BinaryName::JSONWRITER),
                        ],
                        return_type: None,
                    },
                },
            )?;
            code.push_instruction(Instruction::Return)?;
        }

        code.place_label(default)?;
        code.push_instruction(Instruction::Return)?;

        replace_method_body(
            adapter_impl,
            &UnqualifiedName::WRITE,
            code.result()?,
            &self.settings.adapter_template_class,
        )
    }

    /// Patch the implementation's `read` to construct and fill the domain
    /// object for its `classIndex`
    fn patch_impl_read(
        &self,
        adapter_impl: &'g ClassData<'g>,
        deserialized: &[DispatchEntry<'g>],
    ) -> Result<(), Error> {
        let mut code = CodeEmitter::new(3);
        let default = code.fresh_label();

        let mut cases = vec![];
        let mut arms = vec![];
        for entry in deserialized {
            let arm = code.fresh_label();
            cases.push((entry.routing_index as i32, arm));
            arms.push((arm, entry.method_index, entry.class));
        }
        cases.sort_by_key(|(key, _)| *key);

        code.push_instruction(Instruction::ALoad(0))?;
        code.push_instruction(Instruction::GetField(
            class_index_field(&self.settings.adapter_template_class),
        ))?;
        code.push_instruction(Instruction::LookupSwitch { default, cases })?;

        for (arm, index, class) in arms {
            code.place_label(arm)?;
            code.push_instruction(Instruction::New(class.name.clone()))?;
            code.push_instruction(Instruction::Dup)?;
            code.invoke(
                InvokeType::Special,
                MethodRef {
                    class: class.name.clone(),
                    name: UnqualifiedName::INIT,
                    descriptor: MethodDescriptor {
                        parameters: vec![],
                        return_type: None,
                    },
                },
            )?;
            code.push_instruction(Instruction::AStore(2))?;
            code.push_instruction(Instruction::ALoad(2))?;
            code.push_instruction(Instruction::ALoad(0))?;
            code.push_instruction(Instruction::GetField(gson_field(
                &self.settings.adapter_template_class,
            )))?;
            code.push_instruction(Instruction::ALoad(1))?;
            code.invoke(
                InvokeType::Virtual,
                MethodRef {
                    class: class.name.clone(),
                    name: from_json_name(index),
                    descriptor: MethodDescriptor {
                        parameters: vec![
                            FieldType::object(BinaryName::GSON),
                            FieldType::object(BinaryName::JSONREADER),
                        ],
                        return_type: None,
                    },
                },
            )?;
            code.push_instruction(Instruction::ALoad(2))?;
            code.push_instruction(Instruction::AReturn)?;
        }

        code.place_label(default)?;
        code.push_instruction(Instruction::AConstNull)?;
        code.push_instruction(Instruction::AReturn)?;

        replace_method_body(
            adapter_impl,
            &UnqualifiedName::READ,
            code.result()?,
            &self.settings.adapter_template_class,
        )
    }

    /// Patch the static `fieldIndex$` name-to-index helper
    fn patch_field_index(
        &self,
        adapter_impl: &'g ClassData<'g>,
        deserialize: &OptimizedJsonInfo,
    ) -> Result<(), Error> {
        let mut code = CodeEmitter::new(1);
        for (json_name, slot) in &deserialize.json_field_indices {
            let index = slot.index().expect("json name collected but never indexed");
            let next = code.fresh_label();
            code.push_instruction(Instruction::ALoad(0))?;
            code.const_string(json_name)?;
            code.invoke(InvokeType::Virtual, string_equals())?;
            code.push_instruction(Instruction::If(Comparison::EqZero, next))?;
            code.const_int(index as i32)?;
            code.push_instruction(Instruction::IReturn)?;
            code.place_label(next)?;
        }
        code.push_instruction(Instruction::IConstM1)?;
        code.push_instruction(Instruction::IReturn)?;

        replace_method_body(
            adapter_impl,
            &UnqualifiedName::FIELDINDEX,
            code.result()?,
            &self.settings.adapter_template_class,
        )
    }
}

fn replace_method_body(
    class: &ClassData<'_>,
    name: &UnqualifiedName,
    body: Code,
    template: &BinaryName,
) -> Result<(), Error> {
    let method = class
        .methods
        .iter()
        .find(|m| &m.name == name)
        .ok_or_else(|| Error::MissingTemplate(format!("{}.{}", template.dotted(), name.as_str())))?;
    *method.code.borrow_mut() = Some(body);
    Ok(())
}

fn to_json_name(index: u32) -> UnqualifiedName {
    UnqualifiedName::TOJSONPREFIX.concat(&UnqualifiedName::number(index as usize))
}

fn from_json_name(index: u32) -> UnqualifiedName {
    UnqualifiedName::FROMJSONPREFIX.concat(&UnqualifiedName::number(index as usize))
}

fn from_json_field_name(index: u32) -> UnqualifiedName {
    UnqualifiedName::FROMJSONFIELDPREFIX.concat(&UnqualifiedName::number(index as usize))
}

fn from_json_field_descriptor() -> MethodDescriptor<BinaryName> {
    MethodDescriptor {
        parameters: vec![
            FieldType::object(BinaryName::GSON),
            FieldType::object(BinaryName::JSONREADER),
            FieldType::int(),
        ],
        return_type: None,
    }
}

/// Class literal used for `getAdapter` lookups: objects use their own
/// class, primitives their box. Classes with array-typed fields are
/// excluded before generation, so the `Object` arm never feeds a cast.
fn adapter_token_class(descriptor: &FieldType<BinaryName>) -> BinaryName {
    match descriptor {
        FieldType::Object(class) => class.clone(),
        FieldType::Base(base) => base.boxed_class(),
        FieldType::Array(_) => BinaryName::OBJECT,
    }
}

fn writer_chain_call(name: UnqualifiedName) -> MethodRef {
    MethodRef {
        class: BinaryName::JSONWRITER,
        name,
        descriptor: MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::object(BinaryName::JSONWRITER)),
        },
    }
}

fn writer_name_call() -> MethodRef {
    MethodRef {
        class: BinaryName::JSONWRITER,
        name: UnqualifiedName::NAMEMETHOD,
        descriptor: MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::STRING)],
            return_type: Some(FieldType::object(BinaryName::JSONWRITER)),
        },
    }
}

fn reader_call(name: UnqualifiedName, return_type: Option<FieldType<BinaryName>>) -> MethodRef {
    MethodRef {
        class: BinaryName::JSONREADER,
        name,
        descriptor: MethodDescriptor {
            parameters: vec![],
            return_type,
        },
    }
}

fn gson_get_adapter() -> MethodRef {
    MethodRef {
        class: BinaryName::GSON,
        name: UnqualifiedName::GETADAPTER,
        descriptor: MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::CLASS)],
            return_type: Some(FieldType::object(BinaryName::TYPEADAPTER)),
        },
    }
}

fn type_adapter_write() -> MethodRef {
    MethodRef {
        class: BinaryName::TYPEADAPTER,
        name: UnqualifiedName::WRITE,
        descriptor: MethodDescriptor {
            parameters: vec![
                FieldType::object(BinaryName::JSONWRITER),
                FieldType::object(BinaryName::OBJECT),
            ],
            return_type: None,
        },
    }
}

fn type_adapter_read() -> MethodRef {
    MethodRef {
        class: BinaryName::TYPEADAPTER,
        name: UnqualifiedName::READ,
        descriptor: MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::JSONREADER)],
            return_type: Some(FieldType::object(BinaryName::OBJECT)),
        },
    }
}

fn type_token_get_raw_type() -> MethodRef {
    MethodRef {
        class: BinaryName::TYPETOKEN,
        name: UnqualifiedName::GETRAWTYPE,
        descriptor: MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::object(BinaryName::CLASS)),
        },
    }
}

fn class_get_name() -> MethodRef {
    MethodRef {
        class: BinaryName::CLASS,
        name: UnqualifiedName::GETNAME,
        descriptor: MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::object(BinaryName::STRING)),
        },
    }
}

fn string_equals() -> MethodRef {
    MethodRef {
        class: BinaryName::STRING,
        name: UnqualifiedName::EQUALS,
        descriptor: MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::OBJECT)],
            return_type: Some(FieldType::boolean()),
        },
    }
}

fn box_value(base: BaseType) -> MethodRef {
    MethodRef {
        class: base.boxed_class(),
        name: UnqualifiedName::VALUEOF,
        descriptor: MethodDescriptor {
            parameters: vec![FieldType::Base(base)],
            return_type: Some(FieldType::object(base.boxed_class())),
        },
    }
}

fn unbox_value(base: BaseType) -> MethodRef {
    let name = match base {
        BaseType::Boolean => UnqualifiedName::BOOLEANVALUE,
        BaseType::Byte => UnqualifiedName::BYTEVALUE,
        BaseType::Char => UnqualifiedName::CHARVALUE,
        BaseType::Short => UnqualifiedName::SHORTVALUE,
        BaseType::Int => UnqualifiedName::INTVALUE,
        BaseType::Long => UnqualifiedName::LONGVALUE,
        BaseType::Float => UnqualifiedName::FLOATVALUE,
        BaseType::Double => UnqualifiedName::DOUBLEVALUE,
    };
    MethodRef {
        class: base.boxed_class(),
        name,
        descriptor: MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::Base(base)),
        },
    }
}

fn field_index_call(template: &BinaryName) -> MethodRef {
    MethodRef {
        class: template.clone(),
        name: UnqualifiedName::FIELDINDEX,
        descriptor: MethodDescriptor {
            parameters: vec![FieldType::object(BinaryName::STRING)],
            return_type: Some(FieldType::int()),
        },
    }
}

fn gson_field(template: &BinaryName) -> FieldRef {
    FieldRef {
        class: template.clone(),
        name: UnqualifiedName::GSONFIELD,
        descriptor: FieldType::object(BinaryName::GSON),
    }
}

fn class_index_field(template: &BinaryName) -> FieldRef {
    FieldRef {
        class: template.clone(),
        name: UnqualifiedName::CLASSINDEXFIELD,
        descriptor: FieldType::int(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::annotation::Annotation;
    use crate::jvm::class_graph::{ClassPoolArenas, GsonLibrary};
    use crate::jvm::code::ConstantValue;
    use crate::jvm::{ClassAccessFlags, FieldAccessFlags};
    use crate::optimize::field_collector::{FieldCollector, Mode};
    use crate::optimize::templates::inject_templates;

    fn order_class<'g>(program: &'g ClassPool<'g>) -> &'g ClassData<'g> {
        let class = program.add_class(ClassData::new(
            BinaryName::from_string(String::from("com/example/Order")).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        program.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("id")).unwrap(),
            descriptor: FieldType::int(),
            signature: None,
            access_flags: FieldAccessFlags::PRIVATE,
            annotations: vec![],
        });
        program.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("customerName")).unwrap(),
            descriptor: FieldType::object(BinaryName::STRING),
            signature: None,
            access_flags: FieldAccessFlags::PRIVATE,
            annotations: vec![Annotation::string_value(
                BinaryName::SERIALIZEDNAME,
                "customer_name",
            )],
        });
        class
    }

    fn collect(
        mode: Mode,
        runtime_settings: &RuntimeSettings,
        class: &ClassData<'_>,
    ) -> OptimizedJsonInfo {
        let mut info = OptimizedJsonInfo::new();
        let mut collector = FieldCollector::new(mode, runtime_settings, &mut info);
        collector.visit_class(class);
        for field in class.fields.iter() {
            collector.visit_field(class, field);
        }
        info.assign_indices();
        info
    }

    #[test]
    fn companion_methods_are_added_to_the_domain_class() {
        let arenas = ClassPoolArenas::new();
        let library_pool = ClassPool::new(&arenas);
        let library = GsonLibrary::add_to_pool(&library_pool);
        let program = ClassPool::new(&arenas);
        let class = order_class(&program);
        let settings = Settings::new();
        inject_templates(&program, &library, &settings);

        let runtime_settings = RuntimeSettings::default();
        let serialize = collect(Mode::Serialize, &runtime_settings, class);
        let deserialize = collect(Mode::Deserialize, &runtime_settings, class);

        let adder = TypeAdapterAdder {
            program: &program,
            library: &library_pool,
            settings: &settings,
            runtime_settings: &runtime_settings,
        };
        adder
            .add_adapters(&serialize, &deserialize, &BTreeSet::new())
            .unwrap();

        assert!(class.methods.iter().any(|m| m.name == to_json_name(0)));
        assert!(class.methods.iter().any(|m| m.name == from_json_name(0)));
        assert!(class
            .methods
            .iter()
            .any(|m| m.name == from_json_field_name(0)));
    }

    #[test]
    fn unsafe_classes_are_left_untouched() {
        let arenas = ClassPoolArenas::new();
        let library_pool = ClassPool::new(&arenas);
        let library = GsonLibrary::add_to_pool(&library_pool);
        let program = ClassPool::new(&arenas);
        let class = order_class(&program);
        let settings = Settings::new();
        inject_templates(&program, &library, &settings);

        let runtime_settings = RuntimeSettings::default();
        let serialize = collect(Mode::Serialize, &runtime_settings, class);
        let deserialize = OptimizedJsonInfo::new();

        let mut unsafe_classes = BTreeSet::new();
        unsafe_classes.insert(class.name.clone());

        let adder = TypeAdapterAdder {
            program: &program,
            library: &library_pool,
            settings: &settings,
            runtime_settings: &runtime_settings,
        };
        adder
            .add_adapters(&serialize, &deserialize, &unsafe_classes)
            .unwrap();

        assert!(!class.methods.iter().any(|m| m.name == to_json_name(0)));
    }

    #[test]
    fn missing_templates_are_fatal() {
        let arenas = ClassPoolArenas::new();
        let library_pool = ClassPool::new(&arenas);
        GsonLibrary::add_to_pool(&library_pool);
        let program = ClassPool::new(&arenas);
        let settings = Settings::new();

        let runtime_settings = RuntimeSettings::default();
        let adder = TypeAdapterAdder {
            program: &program,
            library: &library_pool,
            settings: &settings,
            runtime_settings: &runtime_settings,
        };
        let result = adder.add_adapters(
            &OptimizedJsonInfo::new(),
            &OptimizedJsonInfo::new(),
            &BTreeSet::new(),
        );
        assert!(matches!(result, Err(Error::MissingTemplate(_))));
    }

    #[test]
    fn generated_to_json_writes_names_before_values() {
        let arenas = ClassPoolArenas::new();
        let library_pool = ClassPool::new(&arenas);
        let library = GsonLibrary::add_to_pool(&library_pool);
        let program = ClassPool::new(&arenas);
        let class = order_class(&program);
        let settings = Settings::new();
        inject_templates(&program, &library, &settings);

        let runtime_settings = RuntimeSettings::default();
        let serialize = collect(Mode::Serialize, &runtime_settings, class);

        let adder = TypeAdapterAdder {
            program: &program,
            library: &library_pool,
            settings: &settings,
            runtime_settings: &runtime_settings,
        };
        adder
            .add_adapters(&serialize, &OptimizedJsonInfo::new(), &BTreeSet::new())
            .unwrap();

        let to_json = class
            .methods
            .iter()
            .find(|m| m.name == to_json_name(0))
            .unwrap();
        let code = to_json.code.borrow();
        let instructions = code.as_ref().unwrap().instructions().to_vec();

        let name_calls: Vec<usize> = instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, insn)| match insn {
                Instruction::Invoke(_, m) if m.name == UnqualifiedName::NAMEMETHOD => Some(idx),
                _ => None,
            })
            .collect();
        let value_calls: Vec<usize> = instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, insn)| match insn {
                Instruction::Invoke(_, m) if m.name == UnqualifiedName::VALUE => Some(idx),
                _ => None,
            })
            .collect();
        assert_eq!(name_calls.len(), 2);
        assert_eq!(value_calls.len(), 2);
        for (name_idx, value_idx) in name_calls.iter().zip(&value_calls) {
            assert!(name_idx < value_idx);
        }

        // Renamed field is written under its JSON name
        assert!(instructions.iter().any(|insn| matches!(
            insn,
            Instruction::Ldc(ConstantValue::String(s)) if s == "customer_name",
        )));
    }

    #[test]
    fn patched_read_constructs_the_domain_object() {
        let arenas = ClassPoolArenas::new();
        let library_pool = ClassPool::new(&arenas);
        let library = GsonLibrary::add_to_pool(&library_pool);
        let program = ClassPool::new(&arenas);
        let class = order_class(&program);
        let settings = Settings::new();
        let templates = inject_templates(&program, &library, &settings);

        let runtime_settings = RuntimeSettings::default();
        let deserialize = collect(Mode::Deserialize, &runtime_settings, class);

        let adder = TypeAdapterAdder {
            program: &program,
            library: &library_pool,
            settings: &settings,
            runtime_settings: &runtime_settings,
        };
        adder
            .add_adapters(&OptimizedJsonInfo::new(), &deserialize, &BTreeSet::new())
            .unwrap();

        let read = templates
            .adapter_impl
            .methods
            .iter()
            .find(|m| m.name == UnqualifiedName::READ)
            .unwrap();
        let code = read.code.borrow();
        let instructions = code.as_ref().unwrap().instructions();
        assert!(instructions
            .iter()
            .any(|insn| matches!(insn, Instruction::New(c) if c == &class.name)));
        assert!(instructions
            .iter()
            .any(|insn| matches!(insn, Instruction::LookupSwitch { .. })));
    }
}
