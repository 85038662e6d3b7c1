//! The Gson specialization pipeline
//!
//! Strictly ordered, single-threaded passes over the program snapshot:
//! configuration collection, call-site discovery, per-class safety checks,
//! field collection per direction, index assignment, and finally code
//! generation. Each pass runs to completion before the next starts; the
//! shared aggregates are only ever written by one pass at a time.

pub mod adapter;
pub mod config;
mod errors;
pub mod field_collector;
pub mod info;
pub mod inline;
pub mod safety;
mod settings;
pub mod templates;
pub mod type_argument;
pub mod usage;
pub mod warnings;

pub use errors::Error;
pub use settings::{RuntimeSettings, Settings};

use crate::jvm::class_graph::ClassPool;
use crate::jvm::{BinaryName, FieldType, MethodDescriptor, UnqualifiedName};
use adapter::TypeAdapterAdder;
use config::ConfigurationCollector;
use field_collector::{FieldCollector, Mode};
use info::OptimizedJsonInfo;
use safety::SafetyChecker;
use std::collections::BTreeSet;
use usage::{DeserializationUsageFinder, SerializationUsageFinder};
use warnings::WarningSink;

/// Everything the pipeline produced
///
/// The two aggregates are consumed by packaging so generated helper
/// classes accompany the patched ones in the output artifact.
pub struct OptimizeResult {
    pub runtime_settings: RuntimeSettings,
    pub serialize_info: OptimizedJsonInfo,
    pub deserialize_info: OptimizedJsonInfo,
    pub unsafe_classes: BTreeSet<BinaryName>,
}

/// Run the whole pipeline over a program snapshot
pub fn optimize<'g>(
    program: &'g ClassPool<'g>,
    library: &'g ClassPool<'g>,
    settings: &Settings,
    warnings: &dyn WarningSink,
) -> Result<OptimizeResult, Error> {
    // Pass 1: how does the program configure Gson?
    let mut runtime_settings = RuntimeSettings::default();
    {
        let mut collector = ConfigurationCollector::new(&mut runtime_settings);
        for_each_method_body(program, |instructions| {
            collector.visit_method_body(program, instructions);
        });
    }
    log::info!(
        "configuration pass found {} custom adapter(s) and {} instance creator(s)",
        runtime_settings.type_adapter_classes.len(),
        runtime_settings.instance_creator_classes.len(),
    );

    // Pass 2: which domain classes flow into toJson/fromJson?
    let mut serialize_candidates: BTreeSet<BinaryName> = BTreeSet::new();
    let mut deserialize_candidates: BTreeSet<BinaryName> = BTreeSet::new();
    {
        let mut serialization = SerializationUsageFinder::new(warnings);
        let mut deserialization = DeserializationUsageFinder::new(warnings);
        for_each_method_body(program, |instructions| {
            serialization.visit_method_body(instructions, &mut |class| {
                serialize_candidates.insert(class.clone());
            });
            deserialization.visit_method_body(instructions, &mut |class| {
                deserialize_candidates.insert(class.clone());
            });
        });
    }
    log::info!(
        "usage pass found {} serialized and {} deserialized candidate class(es)",
        serialize_candidates.len(),
        deserialize_candidates.len(),
    );

    // Pass 3: per-class safety, one fresh checker per class so a single
    // generic class does not poison its neighbors. Array-typed fields have
    // no checkcast-able symbolic form, so their classes stay reflective too.
    let mut unsafe_classes: BTreeSet<BinaryName> = BTreeSet::new();
    for class_name in serialize_candidates.union(&deserialize_candidates) {
        if let Some(class) = program.lookup_class(class_name) {
            let mut checker = SafetyChecker::new();
            checker.visit_class(class);
            if checker.has_field_with_type_parameter() {
                log::info!("excluding {} (generic field signature)", class_name.dotted());
                unsafe_classes.insert(class_name.clone());
            } else if class
                .fields
                .iter()
                .any(|field| matches!(field.descriptor, FieldType::Array(_)))
            {
                log::info!("excluding {} (array-typed field)", class_name.dotted());
                unsafe_classes.insert(class_name.clone());
            }
        }
    }

    // Pass 4: field collection, one direction at a time. Exclusion
    // strategies and adapter registrations whose coverage is unknown are
    // evaluated at runtime; a direction they could affect keeps its
    // reflective behavior wholesale.
    let serialize_reflective = runtime_settings.has_serialization_exclusion_strategy()
        || runtime_settings.unresolved_adapter_registration;
    let deserialize_reflective = runtime_settings.has_deserialization_exclusion_strategy()
        || runtime_settings.unresolved_adapter_registration;

    let mut serialize_info = OptimizedJsonInfo::new();
    if serialize_reflective {
        warnings.warn(String::from(
            "serialization keeps its reflective behavior: a custom exclusion strategy \
             or an unresolvable adapter registration is in effect",
        ));
    } else {
        let mut collector =
            FieldCollector::new(Mode::Serialize, &runtime_settings, &mut serialize_info);
        for class_name in &serialize_candidates {
            if unsafe_classes.contains(class_name) {
                continue;
            }
            if let Some(class) = program.lookup_class(class_name) {
                collector.visit_class(class);
                for field in class.fields.iter() {
                    collector.visit_field(class, field);
                }
            }
        }
    }

    let mut deserialize_info = OptimizedJsonInfo::new();
    if deserialize_reflective {
        warnings.warn(String::from(
            "deserialization keeps its reflective behavior: a custom exclusion strategy \
             or an unresolvable adapter registration is in effect",
        ));
    } else {
        let no_arg_init = MethodDescriptor {
            parameters: vec![],
            return_type: None,
        };
        let mut collector =
            FieldCollector::new(Mode::Deserialize, &runtime_settings, &mut deserialize_info);
        for class_name in &deserialize_candidates {
            if unsafe_classes.contains(class_name) {
                continue;
            }
            // A registered instance creator controls construction; those
            // classes keep the reflective deserialization path.
            if runtime_settings.has_instance_creator_for(class_name) {
                continue;
            }
            if let Some(class) = program.lookup_class(class_name) {
                // The generated read path does `new C()`.
                if class.method(&UnqualifiedName::INIT, &no_arg_init).is_none() {
                    log::info!(
                        "excluding {} from deserialization (no no-arg constructor)",
                        class_name.dotted(),
                    );
                    continue;
                }
                collector.visit_class(class);
                for field in class.fields.iter() {
                    collector.visit_field(class, field);
                }
            }
        }
    }

    // Pass 5: indexing
    serialize_info.assign_indices();
    deserialize_info.assign_indices();

    // Pass 6: code generation and template patching
    let adder = TypeAdapterAdder {
        program,
        library,
        settings,
        runtime_settings: &runtime_settings,
    };
    adder.add_adapters(&serialize_info, &deserialize_info, &unsafe_classes)?;
    log::info!(
        "generated adapters for {} class(es)",
        serialize_info
            .class_json_infos
            .keys()
            .chain(deserialize_info.class_json_infos.keys())
            .collect::<BTreeSet<_>>()
            .len(),
    );

    Ok(OptimizeResult {
        runtime_settings,
        serialize_info,
        deserialize_info,
        unsafe_classes,
    })
}

fn for_each_method_body<'g>(
    program: &'g ClassPool<'g>,
    mut visit: impl FnMut(&[crate::jvm::code::ProgramInstruction]),
) {
    for class in program.classes() {
        for method in class.methods.iter() {
            if let Some(code) = method.code.borrow().as_ref() {
                visit(code.instructions());
            }
        }
    }
}
