use crate::jvm;

/// Errors from the optimization pipeline
///
/// These are all precondition failures: a missing template or library class
/// means the input program is not in the state the passes require. Analysis
/// uncertainty (an unresolvable call site, an unsafe class) is never an
/// error; those cases fall back to the reflective path.
#[derive(Debug)]
pub enum Error {
    /// Bytecode assembly or emission failed
    BytecodeGen(jvm::Error),

    /// An adapter template class is not in the program pool
    MissingTemplate(String),

    /// A JSON-library class the generated code targets is not in the
    /// library pool
    MissingLibraryClass(String),
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::BytecodeGen(err)
    }
}
