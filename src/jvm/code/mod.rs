//! Bytecode representation and generation
//!
//! Method bodies are stored as vectors of [`Instruction`]s with symbolic
//! operands ([`ProgramInstruction`]): names and descriptors instead of
//! constant-pool indices. The analysis passes pattern match on these directly.
//!
//! Generated bodies are built through [`CodeEmitter`], an append-only
//! instruction buffer with label placement and stack-height bookkeeping. A
//! finished [`Code`] can be lowered to serialized JVM bytecode bytes with
//! [`Code::assemble`], which interns the symbolic operands into a
//! [`ConstantsPool`] and resolves label offsets.

mod constants;
mod emitter;
mod instructions;

pub use constants::*;
pub use emitter::*;
pub use instructions::*;
