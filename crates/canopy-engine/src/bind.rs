//! Run-scoped bound-name generation.

/// Mints unique bound names for one run.
///
/// A bound name is the coded token plus `_` and a counter, so it can
/// never collide with a real coded token. The counter lives on the run,
/// keeping runs independent.
#[derive(Debug, Default)]
pub struct BindCounter {
    next: u64,
}

impl BindCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, token: &str) -> String {
        let name = format!("{token}_{}", self.next);
        self.next += 1;
        name
    }
}
