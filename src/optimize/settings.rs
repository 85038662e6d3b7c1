use crate::jvm::BinaryName;
use std::collections::BTreeMap;

/// Gson features the program was observed to configure
///
/// Built once by the configuration collector, read-only afterward. Every
/// flag starts at the library default and flips to `true` as soon as any
/// call site anywhere in the program exercises the feature. This is a
/// whole-program over-approximation: when in doubt, a feature counts as
/// used.
#[derive(Debug, Default)]
pub struct RuntimeSettings {
    /// `GsonBuilder#setVersion` seen
    pub set_version: bool,

    /// `GsonBuilder#excludeFieldsWithModifiers` seen
    pub exclude_fields_with_modifiers: bool,

    /// `GsonBuilder#generateNonExecutableJson` seen
    pub generate_non_executable_json: bool,

    /// `GsonBuilder#excludeFieldsWithoutExposeAnnotation` seen
    pub exclude_fields_without_expose_annotation: bool,

    /// `GsonBuilder#serializeNulls` seen
    pub serialize_nulls: bool,

    /// `GsonBuilder#disableInnerClassSerialization` seen
    pub disable_inner_class_serialization: bool,

    /// `GsonBuilder#setLongSerializationPolicy` seen
    pub set_long_serialization_policy: bool,

    /// `GsonBuilder#setFieldNamingPolicy` seen
    pub set_field_naming_policy: bool,

    /// `GsonBuilder#setFieldNamingStrategy` seen
    pub set_field_naming_strategy: bool,

    /// `GsonBuilder#setExclusionStrategies` seen
    pub set_exclusion_strategies: bool,

    /// `GsonBuilder#addSerializationExclusionStrategy` seen
    pub add_serialization_exclusion_strategy: bool,

    /// `GsonBuilder#addDeserializationExclusionStrategy` seen
    pub add_deserialization_exclusion_strategy: bool,

    /// `GsonBuilder#serializeSpecialFloatingPointValues` seen
    pub serialize_special_floating_point_values: bool,

    /// A `registerTypeAdapter`-family or `registerTypeAdapterFactory` call
    /// was seen whose covered type could not be determined statically. The
    /// adapter pool under-approximates while this is set, so nothing may be
    /// specialized.
    pub unresolved_adapter_registration: bool,

    /// Types with a registered custom type adapter or hierarchy adapter,
    /// keyed by the type's name; the value is the adapter class when it
    /// could be resolved
    pub type_adapter_classes: BTreeMap<BinaryName, Option<BinaryName>>,

    /// Types with a registered `InstanceCreator`, keyed the same way
    pub instance_creator_classes: BTreeMap<BinaryName, Option<BinaryName>>,
}

impl RuntimeSettings {
    /// Is a custom adapter registered for the named type?
    pub fn has_type_adapter_for(&self, class: &BinaryName) -> bool {
        self.type_adapter_classes.contains_key(class)
    }

    /// Is an instance creator registered for the named type?
    pub fn has_instance_creator_for(&self, class: &BinaryName) -> bool {
        self.instance_creator_classes.contains_key(class)
    }

    /// Is any custom exclusion strategy in effect for serialization?
    pub fn has_serialization_exclusion_strategy(&self) -> bool {
        self.set_exclusion_strategies || self.add_serialization_exclusion_strategy
    }

    /// Is any custom exclusion strategy in effect for deserialization?
    pub fn has_deserialization_exclusion_strategy(&self) -> bool {
        self.set_exclusion_strategies || self.add_deserialization_exclusion_strategy
    }
}

/// Names used for the generated adapter wiring
#[derive(Debug, Clone)]
pub struct Settings {
    /// Template class whose `create` gets patched to route domain classes
    /// to the generated adapter
    pub factory_template_class: BinaryName,

    /// Template class whose `write`/`read` dispatch over class index
    pub adapter_template_class: BinaryName,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            factory_template_class: BinaryName::FACTORYTEMPLATE,
            adapter_template_class: BinaryName::ADAPTERTEMPLATE,
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
