//! Discovery of (de)serialization call sites
//!
//! The finders match every `Gson#toJson`/`toJsonTree`/`fromJson` overload
//! and try to pin down the domain class involved. A call site whose domain
//! type cannot be statically resolved is reported to the warning sink and
//! left alone; it keeps using the reflective path. That fallback is an
//! expected outcome, not an error.

use super::type_argument::TypeArgumentResolver;
use super::warnings::WarningSink;
use crate::jvm::code::{Instruction, MethodRef, ProgramInstruction};
use crate::jvm::{BinaryName, FieldType, Name, UnqualifiedName};

/// Finds `Gson#toJson`/`toJsonTree` call sites
pub struct SerializationUsageFinder<'a> {
    resolver: TypeArgumentResolver,
    warnings: &'a dyn WarningSink,
}

impl<'a> SerializationUsageFinder<'a> {
    pub fn new(warnings: &'a dyn WarningSink) -> SerializationUsageFinder<'a> {
        SerializationUsageFinder {
            resolver: TypeArgumentResolver::new(),
            warnings,
        }
    }

    /// Scan one method body, reporting each resolved domain class
    pub fn visit_method_body(
        &mut self,
        instructions: &[ProgramInstruction],
        on_domain_class: &mut dyn FnMut(&BinaryName),
    ) {
        find_usages(
            &[UnqualifiedName::TOJSON, UnqualifiedName::TOJSONTREE],
            &mut self.resolver,
            self.warnings,
            instructions,
            on_domain_class,
        );
    }
}

/// Finds `Gson#fromJson` call sites
pub struct DeserializationUsageFinder<'a> {
    resolver: TypeArgumentResolver,
    warnings: &'a dyn WarningSink,
}

impl<'a> DeserializationUsageFinder<'a> {
    pub fn new(warnings: &'a dyn WarningSink) -> DeserializationUsageFinder<'a> {
        DeserializationUsageFinder {
            resolver: TypeArgumentResolver::new(),
            warnings,
        }
    }

    /// Scan one method body, reporting each resolved domain class
    pub fn visit_method_body(
        &mut self,
        instructions: &[ProgramInstruction],
        on_domain_class: &mut dyn FnMut(&BinaryName),
    ) {
        find_usages(
            &[UnqualifiedName::FROMJSON],
            &mut self.resolver,
            self.warnings,
            instructions,
            on_domain_class,
        );
    }
}

fn find_usages(
    entry_points: &[UnqualifiedName],
    resolver: &mut TypeArgumentResolver,
    warnings: &dyn WarningSink,
    instructions: &[ProgramInstruction],
    on_domain_class: &mut dyn FnMut(&BinaryName),
) {
    for (idx, insn) in instructions.iter().enumerate() {
        let method = match insn {
            Instruction::Invoke(_, method)
                if method.class == BinaryName::GSON && entry_points.contains(&method.name) =>
            {
                method
            }
            _ => continue,
        };

        // The domain type can only be chased when the parameter carrying it
        // is the call's last argument, which is then what the immediately
        // preceding instruction pushed.
        let last_carries_domain_type = method
            .descriptor
            .parameters
            .last()
            .map(|param| carries_domain_type(param))
            .unwrap_or(false);
        let resolved = last_carries_domain_type
            && idx > 0
            && resolver.resolve(instructions, idx - 1);
        if !resolved {
            warnings.warn(unresolved_call_site(method));
            continue;
        }
        if let Some(domain_class) = resolver.resolved_type_argument_names().first() {
            on_domain_class(domain_class);
        }
    }
}

/// Is this parameter the one describing the (de)serialized type?
fn carries_domain_type(parameter: &FieldType<BinaryName>) -> bool {
    match parameter {
        FieldType::Object(class) => {
            class == &BinaryName::OBJECT
                || class == &BinaryName::CLASS
                || class == &BinaryName::TYPE
        }
        _ => false,
    }
}

fn unresolved_call_site(method: &MethodRef) -> String {
    format!(
        "cannot statically determine the type processed by {}.{}; the call keeps its reflective behavior",
        method.class.dotted(),
        method.name.as_str(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{ConstantValue, InvokeType};
    use crate::jvm::MethodDescriptor;
    use crate::optimize::warnings::BufferedWarningSink;

    fn gson_call(
        name: UnqualifiedName,
        parameters: Vec<FieldType<BinaryName>>,
        return_type: Option<FieldType<BinaryName>>,
    ) -> ProgramInstruction {
        Instruction::Invoke(
            InvokeType::Virtual,
            MethodRef {
                class: BinaryName::GSON,
                name,
                descriptor: MethodDescriptor {
                    parameters,
                    return_type,
                },
            },
        )
    }

    #[test]
    fn from_json_with_a_class_literal_is_resolved() {
        let order = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        let body: Vec<ProgramInstruction> = vec![
            Instruction::ALoad(1),
            Instruction::Ldc(ConstantValue::Class(order.clone())),
            gson_call(
                UnqualifiedName::FROMJSON,
                vec![
                    FieldType::object(BinaryName::STRING),
                    FieldType::object(BinaryName::CLASS),
                ],
                Some(FieldType::object(BinaryName::OBJECT)),
            ),
        ];

        let sink = BufferedWarningSink::default();
        let mut found = vec![];
        let mut finder = DeserializationUsageFinder::new(&sink);
        finder.visit_method_body(&body, &mut |class| found.push(class.clone()));

        assert_eq!(found, vec![order]);
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn to_json_of_a_freshly_constructed_value_is_resolved() {
        let order = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        let body: Vec<ProgramInstruction> = vec![
            Instruction::New(order.clone()),
            gson_call(
                UnqualifiedName::TOJSON,
                vec![FieldType::object(BinaryName::OBJECT)],
                Some(FieldType::object(BinaryName::STRING)),
            ),
        ];

        let sink = BufferedWarningSink::default();
        let mut found = vec![];
        let mut finder = SerializationUsageFinder::new(&sink);
        finder.visit_method_body(&body, &mut |class| found.push(class.clone()));

        assert_eq!(found, vec![order]);
    }

    #[test]
    fn unresolvable_call_sites_warn_and_are_skipped() {
        // The value comes from null, which resolves to nothing
        let body: Vec<ProgramInstruction> = vec![
            Instruction::AConstNull,
            gson_call(
                UnqualifiedName::TOJSON,
                vec![FieldType::object(BinaryName::OBJECT)],
                Some(FieldType::object(BinaryName::STRING)),
            ),
        ];

        let sink = BufferedWarningSink::default();
        let mut found = vec![];
        let mut finder = SerializationUsageFinder::new(&sink);
        finder.visit_method_body(&body, &mut |class| found.push(class.clone()));

        assert!(found.is_empty());
        assert_eq!(sink.messages().len(), 1);
        assert!(sink.messages()[0].contains("toJson"));
    }

    #[test]
    fn overloads_whose_last_argument_is_a_sink_are_skipped() {
        let order = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        // toJson(Object, Appendable): the domain value is not the last
        // argument, so resolution is not attempted
        let body: Vec<ProgramInstruction> = vec![
            Instruction::New(order),
            Instruction::ALoad(2),
            gson_call(
                UnqualifiedName::TOJSON,
                vec![
                    FieldType::object(BinaryName::OBJECT),
                    FieldType::object(
                        BinaryName::from_string(String::from("java/lang/Appendable")).unwrap(),
                    ),
                ],
                None,
            ),
        ];

        let sink = BufferedWarningSink::default();
        let mut found = vec![];
        let mut finder = SerializationUsageFinder::new(&sink);
        finder.visit_method_body(&body, &mut |class| found.push(class.clone()));

        assert!(found.is_empty());
        assert_eq!(sink.messages().len(), 1);
    }
}
