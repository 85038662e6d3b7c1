use super::code::{Constant, Label};
use crate::util::Offset;

#[derive(Debug)]
pub enum Error {
    ConstantPoolOverflow {
        constant: Constant,
        offset: usize,
    },
    IoError(std::io::Error),

    /// A branch target ended up further away than a 16-bit offset can express
    MethodCodeOverflow(Offset),

    /// An emitted instruction would pop more values than the stack holds
    ///
    /// The offending instruction index is reported. This indicates a bug in a
    /// code generation strategy, not in the input program.
    EmitterStackUnderflow(usize),

    /// A branch refers to a label that was never placed
    UnplacedLabel(Label),

    /// The same label was placed twice (indicates a bug)
    DuplicateLabel(Label),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
