//! Storage key layout
//!
//! ```text
//! <ns>/<hash>                          legacy battery record
//! <ns>/<hash>.meta                     legacy sidecar metadata
//! <ns>/saves/<hash>/<name>             battery RAM files
//! <ns>/states/<hash>/<slot>/state      save-state bytes
//! <ns>/states/<hash>/<slot>/meta.json  slot metadata
//! <ns>/states/<hash>/<slot>/thumb.png  optional thumbnail
//! ```

pub const SLOT_STATE: &str = "state";
pub const SLOT_META: &str = "meta.json";
pub const SLOT_THUMB: &str = "thumb.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    namespace: String,
}

impl KeyLayout {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn legacy(&self, hash: &str) -> String {
        format!("{}/{}", self.namespace, hash)
    }

    pub fn legacy_sidecar(&self, hash: &str) -> String {
        format!("{}/{}.meta", self.namespace, hash)
    }

    pub fn battery_dir(&self, hash: &str) -> String {
        format!("{}/saves/{}/", self.namespace, hash)
    }

    pub fn battery(&self, hash: &str, name: &str) -> String {
        format!("{}{}", self.battery_dir(hash), name)
    }

    pub fn slots_dir(&self, hash: &str) -> String {
        format!("{}/states/{}/", self.namespace, hash)
    }

    pub fn slot_file(&self, hash: &str, slot: u32, file: &str) -> String {
        format!("{}{}/{}", self.slots_dir(hash), slot, file)
    }

    /// Slot number of a key under [`KeyLayout::slots_dir`] naming `file`
    pub fn parse_slot_key(&self, hash: &str, key: &str, file: &str) -> Option<u32> {
        let rest = key.strip_prefix(&self.slots_dir(hash))?;
        let (slot, name) = rest.split_once('/')?;
        (name == file).then(|| slot.parse().ok()).flatten()
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new("genplusgx")
    }
}

/// File name part of an engine scratch path, used as the battery file name
pub fn scratch_name(path: &str) -> &str {
    path.rsplit('/').next().filter(|name| !name.is_empty()).unwrap_or(path)
}
