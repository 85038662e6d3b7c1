use crate::jvm::class_graph::ClassData;

/// Decides whether any visited field's generic signature makes
/// specialization of its class unsafe
///
/// The flag is sticky: once a single field trips it, no later "safe" class
/// resets it. The orchestrator treats a flagged class as unusable for code
/// generation in its entirety, not just the offending field.
#[derive(Debug, Default)]
pub struct SafetyChecker {
    has_field_with_type_parameter: bool,
}

impl SafetyChecker {
    pub fn new() -> SafetyChecker {
        SafetyChecker::default()
    }

    pub fn has_field_with_type_parameter(&self) -> bool {
        self.has_field_with_type_parameter
    }

    /// Inspect every field signature of the class
    pub fn visit_class(&mut self, class: &ClassData<'_>) {
        for field in class.fields.iter() {
            if let Some(signature) = &field.signature {
                if Self::signature_reaches_type_variable(signature) {
                    self.has_field_with_type_parameter = true;
                }
            }
        }
    }

    /// Does the signature leave an unresolved type variable or
    /// upper-bounded wildcard reachable from the field's erasure?
    ///
    /// Lower-bounded wildcards (`-L`, JLS `? super X`) are intentionally
    /// not flagged: a lower bound widens the erasure rather than narrowing
    /// it.
    fn signature_reaches_type_variable(signature: &str) -> bool {
        signature.starts_with('T')
            || signature.contains("<T")
            || signature.contains(";T")
            || signature.contains("+L")
            || signature.contains("+T")
            || signature.contains("[T")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassData, ClassPool, ClassPoolArenas, FieldData};
    use crate::jvm::{
        BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, Name, UnqualifiedName,
    };

    fn class_with_signature<'g>(
        pool: &'g ClassPool<'g>,
        name: &str,
        signature: Option<&str>,
    ) -> &'g ClassData<'g> {
        let class = pool.add_class(ClassData::new(
            BinaryName::from_string(String::from(name)).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        pool.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("value")).unwrap(),
            descriptor: FieldType::object(BinaryName::OBJECT),
            signature: signature.map(String::from),
            access_flags: FieldAccessFlags::PRIVATE,
            annotations: vec![],
        });
        class
    }

    #[test]
    fn bare_type_variable_is_flagged() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = class_with_signature(&pool, "com/example/Box", Some("TT;"));

        let mut checker = SafetyChecker::new();
        checker.visit_class(class);
        assert!(checker.has_field_with_type_parameter());
    }

    #[test]
    fn flag_is_monotonic_across_classes() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let unsafe_class =
            class_with_signature(&pool, "com/example/Box", Some("Ljava/util/List<TT;>;"));
        let safe_class = class_with_signature(
            &pool,
            "com/example/Order",
            Some("Ljava/util/List<Ljava/lang/String;>;"),
        );

        let mut checker = SafetyChecker::new();
        checker.visit_class(unsafe_class);
        checker.visit_class(safe_class);
        assert!(checker.has_field_with_type_parameter());
    }

    #[test]
    fn wildcard_bounds_are_asymmetric() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let upper = class_with_signature(
            &pool,
            "com/example/Upper",
            Some("Ljava/util/List<+Ljava/lang/Number;>;"),
        );
        let lower = class_with_signature(
            &pool,
            "com/example/Lower",
            Some("Ljava/util/List<-Ljava/lang/Integer;>;"),
        );

        let mut upper_checker = SafetyChecker::new();
        upper_checker.visit_class(upper);
        assert!(upper_checker.has_field_with_type_parameter());

        let mut lower_checker = SafetyChecker::new();
        lower_checker.visit_class(lower);
        assert!(!lower_checker.has_field_with_type_parameter());
    }

    #[test]
    fn unsignatured_fields_never_affect_the_flag() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = class_with_signature(&pool, "com/example/Order", None);

        let mut checker = SafetyChecker::new();
        checker.visit_class(class);
        assert!(!checker.has_field_with_type_parameter());
    }
}
