use std::sync::{Arc, Mutex};

/// Thread-safe record of hook invocations, shared between the test and the
/// hooks it hands to the engine.
///
/// Events are `"<phase>:<job>"`, e.g. `"check:A"`, `"run:A"`, `"recheck:A"`,
/// `"cleanup:A"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events starting with `prefix`, e.g. `"cleanup:"`.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    /// Index of the first occurrence of `event`.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }

    /// Jobs whose action ran, in order, with repeats.
    pub fn runs(&self) -> Vec<String> {
        self.with_prefix("run:")
            .into_iter()
            .map(|e| e["run:".len()..].to_string())
            .collect()
    }
}
