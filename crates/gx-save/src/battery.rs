//! Battery RAM write suppression

use std::collections::HashMap;

/// Remembers the last persisted content per storage key.
///
/// A write is needed only when the new content differs byte-for-byte
/// from what was last loaded or persisted under the same key.
#[derive(Debug, Default)]
pub struct BatteryTracker {
    last: HashMap<String, Vec<u8>>,
}

impl BatteryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_write(&self, key: &str, content: &[u8]) -> bool {
        self.last.get(key).map_or(true, |last| last.as_slice() != content)
    }

    pub fn record(&mut self, key: &str, content: &[u8]) {
        self.last.insert(key.to_string(), content.to_vec());
    }

    pub fn forget(&mut self, key: &str) {
        self.last.remove(key);
    }
}
