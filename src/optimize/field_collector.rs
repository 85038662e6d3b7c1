use super::info::{ClassJsonInfo, OptimizedJsonInfo, Slot};
use super::settings::RuntimeSettings;
use crate::jvm::annotation::ElementValue;
use crate::jvm::class_graph::{ClassData, FieldData};
use crate::jvm::{BinaryName, FieldAccessFlags, Name};

/// Direction a collection pass runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serialize,
    Deserialize,
}

/// Builds the Java-field to JSON-field name mapping for one direction
///
/// Classes must be visited before their fields; getting that backwards is a
/// pass-sequencing bug and panics rather than producing partial data.
pub struct FieldCollector<'a> {
    mode: Mode,
    runtime_settings: &'a RuntimeSettings,
    info: &'a mut OptimizedJsonInfo,
}

impl<'a> FieldCollector<'a> {
    pub fn new(
        mode: Mode,
        runtime_settings: &'a RuntimeSettings,
        info: &'a mut OptimizedJsonInfo,
    ) -> FieldCollector<'a> {
        FieldCollector {
            mode,
            runtime_settings,
            info,
        }
    }

    /// Start collecting a class
    ///
    /// A repeated visit replaces the prior `ClassJsonInfo` (last write
    /// wins) without changing the set of registered classes.
    pub fn visit_class(&mut self, class: &ClassData<'_>) {
        self.info
            .class_json_infos
            .insert(class.name.clone(), ClassJsonInfo::new());
        self.info
            .class_indices
            .entry(class.name.clone())
            .or_insert(Slot::Unassigned);
    }

    /// Collect one field of a previously visited class
    pub fn visit_field(&mut self, class: &ClassData<'_>, field: &FieldData<'_>) {
        let exposed = self.is_exposed(field);
        let class_info = self
            .info
            .class_json_infos
            .get_mut(&class.name)
            .unwrap_or_else(|| {
                panic!(
                    "field {}.{} visited before its class",
                    class.name.as_str(),
                    field.name.as_str(),
                )
            });

        let json_names = Self::json_names(self.mode, field);
        for json_name in &json_names {
            self.info
                .json_field_indices
                .entry(json_name.clone())
                .or_insert(Slot::Unassigned);
        }
        class_info
            .java_to_json_field_names
            .entry(field.name.clone())
            .or_insert(json_names);

        if exposed {
            class_info.exposed_java_field_names.insert(field.name.clone());
        }
    }

    /// JSON names the field may satisfy, primary first
    fn json_names(mode: Mode, field: &FieldData<'_>) -> Vec<String> {
        let annotation = match field.annotation(&BinaryName::SERIALIZEDNAME) {
            Some(annotation) => annotation,
            None => return vec![field.name.as_str().to_string()],
        };
        let primary = annotation
            .element("value")
            .and_then(ElementValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| field.name.as_str().to_string());

        let mut names = vec![primary];
        if mode == Mode::Deserialize {
            // Alternate names only matter when reading: they are extra keys
            // the field accepts, never names it is written under.
            if let Some(ElementValue::Array(alternates)) = annotation.element("alternate") {
                names.extend(
                    alternates
                        .iter()
                        .filter_map(ElementValue::as_str)
                        .map(str::to_string),
                );
            }
        }
        names
    }

    /// Does the field pass the configured exclusion policy?
    ///
    /// Excluded fields stay in the name mapping but fall back to the
    /// library's default per-field handling. Custom exclusion strategies are
    /// not a per-field matter: they take the whole direction off the fast
    /// path before collection even starts, so they never show up here.
    fn is_exposed(&self, field: &FieldData<'_>) -> bool {
        let skipped_modifiers =
            FieldAccessFlags::STATIC | FieldAccessFlags::TRANSIENT | FieldAccessFlags::SYNTHETIC;
        if field.access_flags.intersects(skipped_modifiers) {
            return false;
        }
        if self.runtime_settings.exclude_fields_with_modifiers {
            return false;
        }
        if self.runtime_settings.exclude_fields_without_expose_annotation
            && field.annotation(&BinaryName::EXPOSE).is_none()
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::annotation::Annotation;
    use crate::jvm::class_graph::{ClassPool, ClassPoolArenas};
    use crate::jvm::{ClassAccessFlags, FieldType, UnqualifiedName};

    fn order_class<'g>(pool: &'g ClassPool<'g>) -> &'g ClassData<'g> {
        let class = pool.add_class(ClassData::new(
            BinaryName::from_string(String::from("com/example/Order")).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        pool.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("id")).unwrap(),
            descriptor: FieldType::int(),
            signature: None,
            access_flags: FieldAccessFlags::PRIVATE,
            annotations: vec![],
        });
        pool.add_field(FieldData {
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

    fn collect(mode: Mode, settings: &RuntimeSettings, info: &mut OptimizedJsonInfo) {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = order_class(&pool);

        let mut collector = FieldCollector::new(mode, settings, info);
        collector.visit_class(class);
        for field in class.fields.iter() {
            collector.visit_field(class, field);
        }
    }

    #[test]
    fn renamed_and_unrenamed_fields_map_as_declared() {
        let settings = RuntimeSettings::default();
        let mut info = OptimizedJsonInfo::new();
        collect(Mode::Serialize, &settings, &mut info);

        let class_info = &info.class_json_infos
            [&BinaryName::from_string(String::from("com/example/Order")).unwrap()];
        let id = UnqualifiedName::from_string(String::from("id")).unwrap();
        let customer_name = UnqualifiedName::from_string(String::from("customerName")).unwrap();
        assert_eq!(
            class_info.java_to_json_field_names[&id],
            vec![String::from("id")],
        );
        assert_eq!(
            class_info.java_to_json_field_names[&customer_name],
            vec![String::from("customer_name")],
        );
        assert!(info.json_field_indices.contains_key("id"));
        assert!(info.json_field_indices.contains_key("customer_name"));
    }

    #[test]
    fn alternates_only_apply_when_deserializing() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = pool.add_class(ClassData::new(
            BinaryName::from_string(String::from("com/example/Customer")).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        let field = pool.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("fullName")).unwrap(),
            descriptor: FieldType::object(BinaryName::STRING),
            signature: None,
            access_flags: FieldAccessFlags::PRIVATE,
            annotations: vec![Annotation {
                type_name: BinaryName::SERIALIZEDNAME,
                elements: vec![
                    (
                        UnqualifiedName::VALUE,
                        ElementValue::String(String::from("name")),
                    ),
                    (
                        UnqualifiedName::ALTERNATE,
                        ElementValue::Array(vec![ElementValue::String(String::from(
                            "full_name",
                        ))]),
                    ),
                ],
            }],
        });
        let settings = RuntimeSettings::default();
        let name = UnqualifiedName::from_string(String::from("fullName")).unwrap();

        let mut serialize_info = OptimizedJsonInfo::new();
        let mut collector =
            FieldCollector::new(Mode::Serialize, &settings, &mut serialize_info);
        collector.visit_class(class);
        collector.visit_field(class, field);
        assert_eq!(
            serialize_info.class_json_infos[&class.name].java_to_json_field_names[&name],
            vec![String::from("name")],
        );

        let mut deserialize_info = OptimizedJsonInfo::new();
        let mut collector =
            FieldCollector::new(Mode::Deserialize, &settings, &mut deserialize_info);
        collector.visit_class(class);
        collector.visit_field(class, field);
        assert_eq!(
            deserialize_info.class_json_infos[&class.name].java_to_json_field_names[&name],
            vec![String::from("name"), String::from("full_name")],
        );
    }

    #[test]
    fn revisiting_a_class_replaces_its_info_without_growing_the_pool() {
        let settings = RuntimeSettings::default();
        let mut info = OptimizedJsonInfo::new();
        collect(Mode::Serialize, &settings, &mut info);
        assert_eq!(info.class_indices.len(), 1);

        collect(Mode::Serialize, &settings, &mut info);
        assert_eq!(info.class_indices.len(), 1);
        assert_eq!(info.class_json_infos.len(), 1);
    }

    #[test]
    fn revisiting_a_field_does_not_grow_its_name_list() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = order_class(&pool);
        let field = class
            .field(&UnqualifiedName::from_string(String::from("customerName")).unwrap())
            .unwrap();

        let settings = RuntimeSettings::default();
        let mut info = OptimizedJsonInfo::new();
        let mut collector = FieldCollector::new(Mode::Serialize, &settings, &mut info);
        collector.visit_class(class);
        collector.visit_field(class, field);
        collector.visit_field(class, field);

        let name = UnqualifiedName::from_string(String::from("customerName")).unwrap();
        assert_eq!(
            info.class_json_infos[&class.name].java_to_json_field_names[&name].len(),
            1,
        );
    }

    #[test]
    fn transient_fields_stay_mapped_but_unexposed() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = pool.add_class(ClassData::new(
            BinaryName::from_string(String::from("com/example/Session")).unwrap(),
            None,
            ClassAccessFlags::PUBLIC,
        ));
        let field = pool.add_field(FieldData {
            class,
            name: UnqualifiedName::from_string(String::from("cache")).unwrap(),
            descriptor: FieldType::object(BinaryName::OBJECT),
            signature: None,
            access_flags: FieldAccessFlags::PRIVATE | FieldAccessFlags::TRANSIENT,
            annotations: vec![],
        });

        let settings = RuntimeSettings::default();
        let mut info = OptimizedJsonInfo::new();
        let mut collector = FieldCollector::new(Mode::Serialize, &settings, &mut info);
        collector.visit_class(class);
        collector.visit_field(class, field);

        let class_info = &info.class_json_infos[&class.name];
        let name = UnqualifiedName::from_string(String::from("cache")).unwrap();
        assert!(class_info.java_to_json_field_names.contains_key(&name));
        assert!(!class_info.exposed_java_field_names.contains(&name));
    }

    #[test]
    fn expose_settings_are_applied_while_the_field_is_visited() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = order_class(&pool);

        let mut settings = RuntimeSettings::default();
        settings.exclude_fields_without_expose_annotation = true;
        let mut info = OptimizedJsonInfo::new();
        let mut collector = FieldCollector::new(Mode::Serialize, &settings, &mut info);
        collector.visit_class(class);
        for field in class.fields.iter() {
            collector.visit_field(class, field);
        }

        let class_info = &info.class_json_infos[&class.name];
        assert!(class_info.exposed_java_field_names.is_empty());
        assert_eq!(class_info.java_to_json_field_names.len(), 2);
    }

    #[test]
    #[should_panic(expected = "visited before its class")]
    fn visiting_a_field_before_its_class_is_a_sequencing_bug() {
        let arenas = ClassPoolArenas::new();
        let pool = ClassPool::new(&arenas);
        let class = order_class(&pool);
        let field = class
            .field(&UnqualifiedName::from_string(String::from("id")).unwrap())
            .unwrap();

        let settings = RuntimeSettings::default();
        let mut info = OptimizedJsonInfo::new();
        let mut collector = FieldCollector::new(Mode::Serialize, &settings, &mut info);
        collector.visit_field(class, field);
    }
}
