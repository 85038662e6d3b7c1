//! Specialize reflective Gson (de)serialization in JVM class files.
//!
//! The [`optimize`] module statically analyzes a pool of program classes to
//! find where Gson is configured and invoked, decides which domain classes can
//! safely have their (de)serialization replaced by directly generated
//! bytecode, and synthesizes that bytecode plus the wiring needed to register
//! it. Anything that cannot be proven safe is silently left on the reflective
//! path.
//!
//! The [`jvm`] module carries the supporting class-file model: class pools,
//! descriptors, a symbolic bytecode representation, and a small append-only
//! code emitter.

pub mod jvm;
pub mod optimize;
pub mod util;
