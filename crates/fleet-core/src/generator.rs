//! Periodic package injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fleet_db::EntityStore;
use fleet_types::Package;
use tracing::{info, warn};

/// Injects new pending packages through the store's package factory.
#[derive(Debug)]
pub struct PackageGenerator<S> {
    store: Arc<S>,
    created: AtomicU64,
}

impl<S: EntityStore> PackageGenerator<S> {
    /// Create a generator writing to `store`.
    pub const fn new(store: Arc<S>) -> Self {
        Self {
            store,
            created: AtomicU64::new(0),
        }
    }

    /// Number of packages created so far.
    pub fn packages_created(&self) -> u64 {
        self.created.load(Ordering::Acquire)
    }

    /// Create one package. A store failure is logged and yields `None`; the
    /// next scheduled firing tries again.
    pub async fn generate(&self) -> Option<Package> {
        match self.store.create_random_package().await {
            Ok(package) => {
                self.created.fetch_add(1, Ordering::AcqRel);
                info!(uid = %package.uid, "Generated package");
                Some(package)
            }
            Err(e) => {
                warn!(error = %e, "Package generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleet_db::MemoryStore;
    use fleet_types::{PackageFilter, PackageStatus};

    use super::*;

    #[tokio::test]
    async fn generates_pending_unassigned_packages() {
        let store = Arc::new(MemoryStore::new());
        let generator = PackageGenerator::new(Arc::clone(&store));

        let package = generator.generate().await.unwrap();
        assert_eq!(package.status, PackageStatus::Pending);
        assert!(package.bot_assigned.is_none());
        assert_eq!(generator.packages_created(), 1);

        let stored = store.list_packages(PackageFilter::all()).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let generator = PackageGenerator::new(Arc::clone(&store));
        assert!(generator.generate().await.is_none());
        assert_eq!(generator.packages_created(), 0);
    }
}
