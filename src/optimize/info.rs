use crate::jvm::{BinaryName, UnqualifiedName};
use std::collections::{BTreeMap, BTreeSet};

/// Index slot in the collect-then-index protocol
///
/// Slots are registered `Unassigned` during collection and only get an
/// index in [`OptimizedJsonInfo::assign_indices`]. Making the phase
/// distinction a type keeps "not yet indexed" from being confused with
/// index zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Unassigned,
    Index(u32),
}

impl Slot {
    pub fn index(self) -> Option<u32> {
        match self {
            Slot::Unassigned => None,
            Slot::Index(idx) => Some(idx),
        }
    }
}

/// Name mapping collected for one domain class
#[derive(Debug, Default, Clone)]
pub struct ClassJsonInfo {
    /// Java field name to the ordered JSON names it may satisfy
    ///
    /// More than one entry only happens for deserialization aliasing.
    pub java_to_json_field_names: BTreeMap<UnqualifiedName, Vec<String>>,

    /// Fields passing the configured exclusion policy
    pub exposed_java_field_names: BTreeSet<UnqualifiedName>,
}

impl ClassJsonInfo {
    pub fn new() -> ClassJsonInfo {
        ClassJsonInfo::default()
    }
}

/// Everything collected for one direction (serialize or deserialize)
#[derive(Debug, Default)]
pub struct OptimizedJsonInfo {
    /// Per-class name mappings, created when a class is first visited
    pub class_json_infos: BTreeMap<BinaryName, ClassJsonInfo>,

    /// Class name to dispatch index
    pub class_indices: BTreeMap<BinaryName, Slot>,

    /// JSON field name to dispatch index
    ///
    /// One namespace shared across all classes in this direction; the
    /// generated dispatch branches on the field name independent of the
    /// receiver class.
    pub json_field_indices: BTreeMap<String, Slot>,
}

impl OptimizedJsonInfo {
    pub fn new() -> OptimizedJsonInfo {
        OptimizedJsonInfo::default()
    }

    /// Assign every registered slot a dense index
    ///
    /// Indices are handed out in sorted key order, so the result does not
    /// depend on the order classes happened to be visited.
    pub fn assign_indices(&mut self) {
        for (idx, slot) in self.class_indices.values_mut().enumerate() {
            *slot = Slot::Index(idx as u32);
        }
        for (idx, slot) in self.json_field_indices.values_mut().enumerate() {
            *slot = Slot::Index(idx as u32);
        }
    }

    /// Index assigned to a class, if the indexing pass has run
    pub fn class_index(&self, class: &BinaryName) -> Option<u32> {
        self.class_indices.get(class).and_then(|slot| slot.index())
    }

    /// Index assigned to a JSON field name, if the indexing pass has run
    pub fn json_field_index(&self, json_name: &str) -> Option<u32> {
        self.json_field_indices
            .get(json_name)
            .and_then(|slot| slot.index())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn class_name(name: &str) -> BinaryName {
        use crate::jvm::Name;
        BinaryName::from_string(String::from(name)).unwrap()
    }

    #[test]
    fn indices_are_dense_unique_and_order_independent() {
        let mut forward = OptimizedJsonInfo::new();
        forward.class_indices.insert(class_name("b/B"), Slot::Unassigned);
        forward.class_indices.insert(class_name("a/A"), Slot::Unassigned);

        let mut reverse = OptimizedJsonInfo::new();
        reverse.class_indices.insert(class_name("a/A"), Slot::Unassigned);
        reverse.class_indices.insert(class_name("b/B"), Slot::Unassigned);

        forward.assign_indices();
        reverse.assign_indices();

        assert_eq!(forward.class_index(&class_name("a/A")), Some(0));
        assert_eq!(forward.class_index(&class_name("b/B")), Some(1));
        assert_eq!(
            forward.class_index(&class_name("a/A")),
            reverse.class_index(&class_name("a/A")),
        );
    }

    #[test]
    fn slots_stay_unassigned_until_the_indexing_pass() {
        let mut info = OptimizedJsonInfo::new();
        info.json_field_indices
            .insert(String::from("customer_name"), Slot::Unassigned);
        assert_eq!(info.json_field_index("customer_name"), None);

        info.assign_indices();
        assert_eq!(info.json_field_index("customer_name"), Some(0));
    }
}
