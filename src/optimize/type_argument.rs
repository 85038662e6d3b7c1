use crate::jvm::code::{ConstantValue, Instruction, ProgramInstruction};
use crate::jvm::BinaryName;

/// Resolves the concrete class used as a generic type argument at a call
/// site
///
/// Resolution looks at the instruction that produced the value of interest.
/// Class literals resolve to themselves, field and method references to
/// their declaring class. When the producer is a local-variable load, the
/// instruction stream is re-scanned from the start of the method up to the
/// load, looking for the store into that slot, and the same rules apply to
/// whatever fed the store.
///
/// Each resolution overwrites the prior result wholesale; state is never
/// merged across calls.
#[derive(Debug, Default)]
pub struct TypeArgumentResolver {
    resolved_type_argument_names: Vec<BinaryName>,
}

impl TypeArgumentResolver {
    pub fn new() -> TypeArgumentResolver {
        TypeArgumentResolver::default()
    }

    /// Names resolved by the most recent call to [`Self::resolve`]
    ///
    /// Empty when the last resolution failed.
    pub fn resolved_type_argument_names(&self) -> &[BinaryName] {
        &self.resolved_type_argument_names
    }

    /// Resolve the type argument pushed by `instructions[producer_idx]`
    ///
    /// Returns whether resolution succeeded. The resolver state is replaced
    /// either way.
    pub fn resolve(&mut self, instructions: &[ProgramInstruction], producer_idx: usize) -> bool {
        let resolved = Self::producer_class(instructions, producer_idx);
        self.resolved_type_argument_names = match resolved {
            Some(name) => vec![name],
            None => vec![],
        };
        !self.resolved_type_argument_names.is_empty()
    }

    fn producer_class(
        instructions: &[ProgramInstruction],
        producer_idx: usize,
    ) -> Option<BinaryName> {
        match instructions.get(producer_idx)? {
            Instruction::Ldc(ConstantValue::Class(name)) => Some(name.clone()),
            Instruction::GetStatic(field) | Instruction::GetField(field) => {
                Some(field.class.clone())
            }
            Instruction::Invoke(_, method) => Some(method.class.clone()),
            Instruction::New(class) | Instruction::CheckCast(class) => Some(class.clone()),
            Instruction::ALoad(slot) => {
                // Find the last store into this slot before the load, then
                // resolve whatever fed that store. The producer index only
                // ever decreases, so this terminates.
                let store_idx = instructions[..producer_idx]
                    .iter()
                    .rposition(|insn| matches!(insn, Instruction::AStore(s) if s == slot))?;
                let fed_by = store_idx.checked_sub(1)?;
                Self::producer_class(instructions, fed_by)
            }
            _ => None,
        }
    }
}
