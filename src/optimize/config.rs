use super::settings::RuntimeSettings;
use super::type_argument::TypeArgumentResolver;
use crate::jvm::class_graph::ClassPool;
use crate::jvm::code::{ConstantValue, Instruction, ProgramInstruction};
use crate::jvm::{BinaryName, UnqualifiedName};

/// Discovers how the program configures Gson
///
/// Walks method bodies matching builder calls. Unmatched instructions are
/// ignored. The collector only ever writes the settings aggregate; it never
/// reads it back.
pub struct ConfigurationCollector<'a> {
    settings: &'a mut RuntimeSettings,
    resolver: TypeArgumentResolver,
}

impl<'a> ConfigurationCollector<'a> {
    pub fn new(settings: &'a mut RuntimeSettings) -> ConfigurationCollector<'a> {
        ConfigurationCollector {
            settings,
            resolver: TypeArgumentResolver::new(),
        }
    }

    /// Scan one method body for builder configuration calls
    pub fn visit_method_body<'g>(
        &mut self,
        program: &'g ClassPool<'g>,
        instructions: &[ProgramInstruction],
    ) {
        for (idx, insn) in instructions.iter().enumerate() {
            let method = match insn {
                Instruction::Invoke(_, method) if method.class == BinaryName::GSONBUILDER => {
                    method
                }
                _ => continue,
            };
            let name = &method.name;
            if name == &UnqualifiedName::SETVERSION {
                self.settings.set_version = true;
            } else if name == &UnqualifiedName::EXCLUDEFIELDSWITHMODIFIERS {
                self.settings.exclude_fields_with_modifiers = true;
            } else if name == &UnqualifiedName::GENERATENONEXECUTABLEJSON {
                self.settings.generate_non_executable_json = true;
            } else if name == &UnqualifiedName::EXCLUDEFIELDSWITHOUTEXPOSEANNOTATION {
                self.settings.exclude_fields_without_expose_annotation = true;
            } else if name == &UnqualifiedName::SERIALIZENULLS {
                self.settings.serialize_nulls = true;
            } else if name == &UnqualifiedName::DISABLEINNERCLASSSERIALIZATION {
                self.settings.disable_inner_class_serialization = true;
            } else if name == &UnqualifiedName::SETLONGSERIALIZATIONPOLICY {
                self.settings.set_long_serialization_policy = true;
            } else if name == &UnqualifiedName::SETFIELDNAMINGPOLICY {
                self.settings.set_field_naming_policy = true;
            } else if name == &UnqualifiedName::SETFIELDNAMINGSTRATEGY {
                self.settings.set_field_naming_strategy = true;
            } else if name == &UnqualifiedName::SETEXCLUSIONSTRATEGIES {
                self.settings.set_exclusion_strategies = true;
            } else if name == &UnqualifiedName::ADDSERIALIZATIONEXCLUSIONSTRATEGY {
                self.settings.add_serialization_exclusion_strategy = true;
            } else if name == &UnqualifiedName::ADDDESERIALIZATIONEXCLUSIONSTRATEGY {
                self.settings.add_deserialization_exclusion_strategy = true;
            } else if name == &UnqualifiedName::SERIALIZESPECIALFLOATINGPOINTVALUES {
                self.settings.serialize_special_floating_point_values = true;
            } else if name == &UnqualifiedName::REGISTERTYPEADAPTER
                || name == &UnqualifiedName::REGISTERTYPEHIERARCHYADAPTER
            {
                self.record_registration(program, instructions, idx);
            } else if name == &UnqualifiedName::REGISTERTYPEADAPTERFACTORY {
                // A factory covers whatever types it decides to at runtime;
                // there is no literal to resolve.
                self.settings.unresolved_adapter_registration = true;
            }
        }
    }

    /// Record a `registerTypeAdapter`-family call
    ///
    /// The type argument is the class literal pushed before the handler
    /// instance is constructed; the handler is the nearest preceding `new`.
    /// Both scans stay inside the current builder call's argument window,
    /// i.e. after the previous `GsonBuilder` invoke, so a class literal from
    /// an unrelated earlier statement is never mistaken for the argument.
    /// A handler implementing `InstanceCreator` goes in the creator pool,
    /// anything else in the adapter pool. A registration whose type
    /// argument cannot be resolved marks the whole adapter pool as
    /// under-approximate.
    fn record_registration<'g>(
        &mut self,
        program: &'g ClassPool<'g>,
        instructions: &[ProgramInstruction],
        invoke_idx: usize,
    ) {
        let window_start = instructions[..invoke_idx]
            .iter()
            .rposition(|insn| {
                matches!(insn, Instruction::Invoke(_, m) if m.class == BinaryName::GSONBUILDER)
            })
            .map(|idx| idx + 1)
            .unwrap_or(0);

        let handler_idx = instructions[window_start..invoke_idx]
            .iter()
            .rposition(|insn| matches!(insn, Instruction::New(_)))
            .map(|idx| window_start + idx);
        let handler_class = handler_idx.and_then(|idx| match &instructions[idx] {
            Instruction::New(class) => Some(class.clone()),
            _ => None,
        });

        let type_scan_end = handler_idx.unwrap_or(invoke_idx);
        let type_idx = match instructions[window_start..type_scan_end]
            .iter()
            .rposition(|insn| matches!(insn, Instruction::Ldc(ConstantValue::Class(_))))
            .map(|idx| window_start + idx)
        {
            Some(idx) => idx,
            None => {
                self.settings.unresolved_adapter_registration = true;
                return;
            }
        };
        if !self.resolver.resolve(instructions, type_idx) {
            self.settings.unresolved_adapter_registration = true;
            return;
        }
        let domain_class = match self.resolver.resolved_type_argument_names().first() {
            Some(name) => name.clone(),
            None => {
                self.settings.unresolved_adapter_registration = true;
                return;
            }
        };

        let is_creator = handler_class
            .as_ref()
            .map(|class| Self::implements_instance_creator(program, class))
            .unwrap_or(false);
        if is_creator {
            self.settings
                .instance_creator_classes
                .insert(domain_class, handler_class);
        } else {
            self.settings
                .type_adapter_classes
                .insert(domain_class, handler_class);
        }
    }

    fn implements_instance_creator<'g>(program: &'g ClassPool<'g>, name: &BinaryName) -> bool {
        let mut current = program.lookup_class(name);
        while let Some(class) = current {
            if class.implements(&BinaryName::INSTANCECREATOR) {
                return true;
            }
            current = class.superclass;
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassData, ClassPoolArenas};
    use crate::jvm::code::{InvokeType, MethodRef};
    use crate::jvm::{ClassAccessFlags, FieldType, MethodDescriptor, Name};

    fn builder_call(name: UnqualifiedName) -> ProgramInstruction {
        Instruction::Invoke(
            InvokeType::Virtual,
            MethodRef {
                class: BinaryName::GSONBUILDER,
                name,
                descriptor: MethodDescriptor {
                    parameters: vec![],
                    return_type: Some(FieldType::object(BinaryName::GSONBUILDER)),
                },
            },
        )
    }

    #[test]
    fn flags_flip_on_the_first_matching_call_site() {
        let arenas = ClassPoolArenas::new();
        let program = ClassPool::new(&arenas);
        let mut settings = RuntimeSettings::default();
        let body = vec![
            builder_call(UnqualifiedName::SERIALIZENULLS),
            builder_call(UnqualifiedName::SETFIELDNAMINGPOLICY),
        ];

        let mut collector = ConfigurationCollector::new(&mut settings);
        collector.visit_method_body(&program, &body);

        assert!(settings.serialize_nulls);
        assert!(settings.set_field_naming_policy);
        assert!(!settings.set_version);
    }

    #[test]
    fn adapter_registrations_resolve_the_type_literal() {
        let arenas = ClassPoolArenas::new();
        let program = ClassPool::new(&arenas);
        let order = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        let adapter = BinaryName::from_string(String::from("com/example/OrderAdapter")).unwrap();
        let body: Vec<ProgramInstruction> = vec![
            Instruction::Ldc(ConstantValue::Class(order.clone())),
            Instruction::New(adapter.clone()),
            Instruction::Dup,
            builder_call(UnqualifiedName::REGISTERTYPEADAPTER),
        ];

        let mut settings = RuntimeSettings::default();
        let mut collector = ConfigurationCollector::new(&mut settings);
        collector.visit_method_body(&program, &body);

        assert_eq!(
            settings.type_adapter_classes.get(&order),
            Some(&Some(adapter)),
        );
        assert!(settings.instance_creator_classes.is_empty());
    }

    #[test]
    fn factory_registrations_mark_the_pool_under_approximate() {
        let arenas = ClassPoolArenas::new();
        let program = ClassPool::new(&arenas);
        let body = vec![builder_call(UnqualifiedName::REGISTERTYPEADAPTERFACTORY)];

        let mut settings = RuntimeSettings::default();
        let mut collector = ConfigurationCollector::new(&mut settings);
        collector.visit_method_body(&program, &body);

        assert!(settings.unresolved_adapter_registration);
        assert!(settings.type_adapter_classes.is_empty());
    }

    #[test]
    fn unresolvable_registrations_mark_the_pool_under_approximate() {
        let arenas = ClassPoolArenas::new();
        let program = ClassPool::new(&arenas);
        // Type argument comes out of a collection lookup the resolver cannot
        // chase; no class literal anywhere in the argument window.
        let body: Vec<ProgramInstruction> = vec![
            Instruction::ALoad(1),
            builder_call(UnqualifiedName::REGISTERTYPEADAPTER),
        ];

        let mut settings = RuntimeSettings::default();
        let mut collector = ConfigurationCollector::new(&mut settings);
        collector.visit_method_body(&program, &body);

        assert!(settings.unresolved_adapter_registration);
        assert!(settings.type_adapter_classes.is_empty());
    }

    #[test]
    fn argument_scans_stop_at_the_previous_builder_call() {
        let arenas = ClassPoolArenas::new();
        let program = ClassPool::new(&arenas);
        let order = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        // The Order literal belongs to the serializeNulls statement; the
        // register call after it has no literal of its own.
        let body: Vec<ProgramInstruction> = vec![
            Instruction::Ldc(ConstantValue::Class(order.clone())),
            Instruction::Pop,
            builder_call(UnqualifiedName::SERIALIZENULLS),
            Instruction::ALoad(2),
            builder_call(UnqualifiedName::REGISTERTYPEADAPTER),
        ];

        let mut settings = RuntimeSettings::default();
        let mut collector = ConfigurationCollector::new(&mut settings);
        collector.visit_method_body(&program, &body);

        assert!(!settings.type_adapter_classes.contains_key(&order));
        assert!(settings.unresolved_adapter_registration);
    }

    #[test]
    fn instance_creators_land_in_their_own_pool() {
        let arenas = ClassPoolArenas::new();
        let program = ClassPool::new(&arenas);
        let creator_interface = program.add_class(ClassData::new(
            BinaryName::INSTANCECREATOR,
            None,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE,
        ));
        let creator = program.add_class(ClassData::new(
            BinaryName::from_string(String::from("com/example/OrderCreator")).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        creator.interfaces.push(creator_interface);

        let order = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        let body: Vec<ProgramInstruction> = vec![
            Instruction::Ldc(ConstantValue::Class(order.clone())),
            Instruction::New(creator.name.clone()),
            Instruction::Dup,
            builder_call(UnqualifiedName::REGISTERTYPEADAPTER),
        ];

        let mut settings = RuntimeSettings::default();
        let mut collector = ConfigurationCollector::new(&mut settings);
        collector.visit_method_body(&program, &body);

        assert!(settings.instance_creator_classes.contains_key(&order));
        assert!(settings.type_adapter_classes.is_empty());
    }
}
