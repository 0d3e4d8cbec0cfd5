use log::debug;
use std::time::Instant;

/// Logs how long a scope took when it ends.
pub struct FunctionTimer {
    name: &'static str,
    start: Instant,
}

impl FunctionTimer {
    pub fn new(name: &'static str) -> Self {
        FunctionTimer {
            name,
            start: Instant::now(),
        }
    }
}

// called automatically when the `FunctionTimer` goes out of scope
impl Drop for FunctionTimer {
    fn drop(&mut self) {
        debug!("'{}' took: {:?}", self.name, self.start.elapsed());
    }
}
