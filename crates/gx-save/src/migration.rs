//! Legacy save migration
//!
//! The old layout stored battery RAM as one flat record at `<ns>/<hash>`
//! with an optional `<ns>/<hash>.meta` sidecar. On first load the record
//! is re-saved under the structured layout and both old keys are removed.

use crate::layout::KeyLayout;
use crate::store::BlobStore;
use gx_core::SaveError;
use std::collections::HashSet;

/// Runs the legacy migration at most once per ROM hash
#[derive(Debug, Default)]
pub struct LegacyMigrator {
    checked: HashSet<String>,
}

impl LegacyMigrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_checked(&self, hash: &str) -> bool {
        self.checked.contains(hash)
    }

    /// Migrate the legacy record of `hash` into battery file `name`.
    ///
    /// Returns the migrated content, or `None` if there was nothing to do.
    pub async fn migrate(
        &mut self,
        store: &dyn BlobStore,
        layout: &KeyLayout,
        hash: &str,
        name: &str,
    ) -> Result<Option<Vec<u8>>, SaveError> {
        if self.checked.contains(hash) {
            return Ok(None);
        }

        let legacy_key = layout.legacy(hash);
        let legacy = store
            .get(&legacy_key)
            .await
            .map_err(|e| SaveError::Migration(format!("reading {}: {}", legacy_key, e)))?;

        let Some(content) = legacy else {
            self.checked.insert(hash.to_string());
            return Ok(None);
        };

        let target = layout.battery(hash, name);
        let existing = store
            .get(&target)
            .await
            .map_err(|e| SaveError::Migration(format!("reading {}: {}", target, e)))?;

        // Left behind by a migration whose cleanup failed; the structured save wins
        let migrated = if existing.is_some() {
            tracing::warn!("Legacy save {} left over from an earlier migration, dropping", legacy_key);
            None
        } else if content.is_empty() {
            tracing::warn!("Legacy save {} is empty, discarding", legacy_key);
            None
        } else {
            tracing::info!("Migrating legacy save {} ({} bytes)", legacy_key, content.len());
            store
                .put(&target, &content)
                .await
                .map_err(|e| SaveError::Migration(format!("writing {}: {}", target, e)))?;
            Some(content)
        };

        for key in [legacy_key, layout.legacy_sidecar(hash)] {
            if let Err(e) = store.remove(&key).await {
                tracing::warn!("Could not remove legacy key {}: {}", key, e);
            }
        }

        self.checked.insert(hash.to_string());
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    #[tokio::test]
    async fn test_migrates_once() {
        let store = MemoryBlobStore::new();
        let layout = KeyLayout::default();
        store.put(&layout.legacy("h"), &[1, 2, 3]).await.unwrap();
        store.put(&layout.legacy_sidecar("h"), b"{}").await.unwrap();

        let mut migrator = LegacyMigrator::new();
        let migrated = migrator.migrate(&store, &layout, "h", "game.srm").await.unwrap();
        assert_eq!(migrated, Some(vec![1, 2, 3]));
        assert_eq!(
            store.get(&layout.battery("h", "game.srm")).await.unwrap(),
            Some(vec![1, 2, 3])
        );
        assert!(!store.contains(&layout.legacy("h")));
        assert!(!store.contains(&layout.legacy_sidecar("h")));
        assert!(migrator.is_checked("h"));

        store.reset_stats();
        assert_eq!(migrator.migrate(&store, &layout, "h", "game.srm").await.unwrap(), None);
        assert_eq!(store.stats(), Default::default());
    }

    #[tokio::test]
    async fn test_empty_legacy_record_is_dropped() {
        let store = MemoryBlobStore::new();
        let layout = KeyLayout::default();
        store.put(&layout.legacy("h"), &[]).await.unwrap();

        let mut migrator = LegacyMigrator::new();
        assert_eq!(migrator.migrate(&store, &layout, "h", "game.srm").await.unwrap(), None);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_leftover_legacy_record_never_overwrites_newer_save() {
        let store = MemoryBlobStore::new();
        let layout = KeyLayout::default();
        let target = layout.battery("h", "game.srm");
        store.put(&layout.legacy("h"), &[1; 8]).await.unwrap();
        store.set_fail_removes(true);

        let mut migrator = LegacyMigrator::new();
        let migrated = migrator.migrate(&store, &layout, "h", "game.srm").await.unwrap();
        assert_eq!(migrated, Some(vec![1; 8]));
        assert!(store.contains(&layout.legacy("h")));
        assert!(migrator.is_checked("h"));

        // Newer progress saved in the structured layout
        store.put(&target, &[2; 8]).await.unwrap();
        store.set_fail_removes(false);

        let mut next_session = LegacyMigrator::new();
        assert_eq!(next_session.migrate(&store, &layout, "h", "game.srm").await.unwrap(), None);
        assert_eq!(store.get(&target).await.unwrap(), Some(vec![2; 8]));
        assert!(!store.contains(&layout.legacy("h")));
    }

    #[tokio::test]
    async fn test_store_failure_is_a_migration_error() {
        let store = MemoryBlobStore::new();
        let layout = KeyLayout::default();
        store.put(&layout.legacy("h"), &[1]).await.unwrap();
        store.set_fail_writes(true);

        let mut migrator = LegacyMigrator::new();
        let err = migrator.migrate(&store, &layout, "h", "game.srm").await.unwrap_err();
        assert!(matches!(err, SaveError::Migration(_)));
        assert!(!migrator.is_checked("h"));
    }
}
