use std::cell::RefCell;

/// Sink for call sites the analysis cannot resolve
///
/// Warnings never affect control flow. An unresolved call site simply keeps
/// its reflective behavior.
pub trait WarningSink {
    fn warn(&self, message: String);
}

/// Forwards warnings to the `log` facade
pub struct LogWarningSink;

impl WarningSink for LogWarningSink {
    fn warn(&self, message: String) {
        log::warn!("{}", message);
    }
}

/// Accumulates warnings in memory (used by tests)
#[derive(Default)]
pub struct BufferedWarningSink {
    messages: RefCell<Vec<String>>,
}

impl BufferedWarningSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl WarningSink for BufferedWarningSink {
    fn warn(&self, message: String) {
        self.messages.borrow_mut().push(message);
    }
}
