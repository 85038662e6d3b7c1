//! Model of the JVM class files the optimizer analyzes and rewrites
//!
//! The model is deliberately symbolic: instruction operands are names and
//! descriptors ([`code::FieldRef`], [`code::MethodRef`],
//! [`code::ConstantValue`]) rather than constant-pool indices, so the analysis
//! passes can reason about call sites without chasing per-class pools. Indices
//! only appear when generated code is assembled to bytes
//! ([`code::Code::assemble`]).

mod access_flags;
pub mod annotation;
pub mod class_graph;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
