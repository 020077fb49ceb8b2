//! Operator-driven bin maintenance.

use fleet_db::{EntityStore, StoreError};
use fleet_types::{Bin, BinId, BinPatch, BinStatus};
use tracing::info;

/// The status a bin takes when its maintenance switch is flipped.
///
/// Taking a bin out of service marks it `maintenance`; returning it marks
/// it `full` or `available` by its current count.
pub const fn service_status(bin: &Bin, in_service: bool) -> BinStatus {
    if in_service {
        Bin::status_for_count(bin.current_count, bin.capacity)
    } else {
        BinStatus::Maintenance
    }
}

/// Put a bin into maintenance (`in_service == false`) or return it to
/// service (`in_service == true`). Returns the updated bin.
///
/// # Errors
///
/// Returns the store error if the bin cannot be read or written, including
/// [`StoreError::NotFound`] for an unknown id.
pub async fn set_bin_maintenance<S: EntityStore>(
    store: &S,
    bin_id: BinId,
    in_service: bool,
) -> Result<Bin, StoreError> {
    let mut bin = store.get_bin(bin_id).await?;
    let patch = BinPatch {
        current_count: None,
        status: Some(service_status(&bin, in_service)),
    };
    store.update_bin(bin_id, patch.clone()).await?;
    patch.apply(&mut bin);
    info!(bin = %bin.location, status = %bin.status, "Bin service status changed");
    Ok(bin)
}

/// Flip a bin between maintenance and service. Returns the updated bin.
///
/// # Errors
///
/// Same as [`set_bin_maintenance`].
pub async fn toggle_bin_maintenance<S: EntityStore>(
    store: &S,
    bin_id: BinId,
) -> Result<Bin, StoreError> {
    let bin = store.get_bin(bin_id).await?;
    set_bin_maintenance(store, bin_id, bin.status == BinStatus::Maintenance).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleet_db::MemoryStore;

    use super::*;

    async fn store_with(bin: Bin) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_bin(bin).await;
        store
    }

    #[tokio::test]
    async fn disabling_marks_maintenance() {
        let bin = Bin::new("A-01", 10);
        let store = store_with(bin.clone()).await;
        let updated = set_bin_maintenance(&store, bin.id, false).await.unwrap();
        assert_eq!(updated.status, BinStatus::Maintenance);
        assert_eq!(store.get_bin(bin.id).await.unwrap().status, BinStatus::Maintenance);
    }

    #[tokio::test]
    async fn enabling_full_bin_marks_full() {
        let mut bin = Bin::new("A-02", 10);
        bin.current_count = 10;
        bin.status = BinStatus::Maintenance;
        let store = store_with(bin.clone()).await;
        let updated = set_bin_maintenance(&store, bin.id, true).await.unwrap();
        assert_eq!(updated.status, BinStatus::Full);
    }

    #[tokio::test]
    async fn enabling_partial_bin_marks_available() {
        let mut bin = Bin::new("A-03", 10);
        bin.current_count = 4;
        bin.status = BinStatus::Maintenance;
        let store = store_with(bin.clone()).await;
        let updated = set_bin_maintenance(&store, bin.id, true).await.unwrap();
        assert_eq!(updated.status, BinStatus::Available);
        assert_eq!(updated.current_count, 4);
    }

    #[tokio::test]
    async fn toggle_flips_both_ways() {
        let bin = Bin::new("B-01", 5);
        let store = store_with(bin.clone()).await;
        let off = toggle_bin_maintenance(&store, bin.id).await.unwrap();
        assert_eq!(off.status, BinStatus::Maintenance);
        let on = toggle_bin_maintenance(&store, bin.id).await.unwrap();
        assert_eq!(on.status, BinStatus::Available);
    }

    #[tokio::test]
    async fn unknown_bin_is_not_found() {
        let store = MemoryStore::new();
        let err = set_bin_maintenance(&store, BinId::new(), false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
