//! In-memory entity store.
//!
//! Backs the engine when no database is configured and serves as the
//! store in tests. Records live in [`BTreeMap`]s behind a
//! [`tokio::sync::RwLock`]. Listings are ordered the way the `PostgreSQL`
//! store orders them: robots by name, packages oldest first, bins by
//! location.
//!
//! The store can be switched offline with [`MemoryStore::set_offline`],
//! after which every operation fails with [`StoreError::Unavailable`].
//! This is how tests exercise the log-and-continue failure policy.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use fleet_types::{
    Bin, BinId, BinPatch, Package, PackageFilter, PackageId, PackagePatch, Robot, RobotFilter,
    RobotId, RobotPatch,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::EntityStore;

/// Prefix of generated package uids.
const PACKAGE_UID_PREFIX: &str = "PKG-";

/// Number of hex characters after the uid prefix.
const PACKAGE_UID_LEN: usize = 6;

#[derive(Debug, Default)]
struct Tables {
    robots: BTreeMap<RobotId, Robot>,
    packages: BTreeMap<PackageId, Package>,
    bins: BTreeMap<BinId, Bin>,
}

/// Entity store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a robot record.
    pub async fn insert_robot(&self, robot: Robot) {
        self.tables.write().await.robots.insert(robot.id, robot);
    }

    /// Insert or replace a package record.
    pub async fn insert_package(&self, package: Package) {
        self.tables
            .write()
            .await
            .packages
            .insert(package.id, package);
    }

    /// Insert or replace a bin record.
    pub async fn insert_bin(&self, bin: Bin) {
        self.tables.write().await.bins.insert(bin.id, bin);
    }

    /// Fetch a robot by id, bypassing the offline switch.
    pub async fn robot(&self, id: RobotId) -> Option<Robot> {
        self.tables.read().await.robots.get(&id).cloned()
    }

    /// Fetch a package by id, bypassing the offline switch.
    pub async fn package(&self, id: PackageId) -> Option<Package> {
        self.tables.read().await.packages.get(&id).cloned()
    }

    /// Make every subsequent operation fail (`true`) or succeed (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
        tracing::debug!(offline, "Memory store availability changed");
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Acquire) {
            Err(StoreError::Unavailable(String::from("memory store is offline")))
        } else {
            Ok(())
        }
    }
}

/// Generate a display uid such as `PKG-3F9A1C`.
fn generate_uid() -> String {
    let hex: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(PACKAGE_UID_LEN)
        .collect();
    format!("{PACKAGE_UID_PREFIX}{}", hex.to_uppercase())
}

fn count_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl EntityStore for MemoryStore {
    async fn list_robots(&self) -> Result<Vec<Robot>, StoreError> {
        self.check_online()?;
        let mut robots: Vec<Robot> = self.tables.read().await.robots.values().cloned().collect();
        robots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(robots)
    }

    async fn list_robots_where(&self, filter: RobotFilter) -> Result<Vec<Robot>, StoreError> {
        self.check_online()?;
        let mut robots: Vec<Robot> = self
            .tables
            .read()
            .await
            .robots
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        robots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(robots)
    }

    async fn update_robot(&self, id: RobotId, patch: RobotPatch) -> Result<(), StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let robot = tables
            .robots
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("robot", &id))?;
        patch.apply(robot);
        tracing::debug!(robot = %robot.name, ?patch, "Updated robot");
        Ok(())
    }

    async fn update_robots_where(
        &self,
        filter: RobotFilter,
        patch: RobotPatch,
    ) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let mut changed: usize = 0;
        for robot in tables.robots.values_mut().filter(|r| filter.matches(r)) {
            patch.apply(robot);
            changed = changed.saturating_add(1);
        }
        tracing::debug!(changed, ?patch, "Bulk-updated robots");
        Ok(count_u64(changed))
    }

    async fn list_packages(&self, filter: PackageFilter) -> Result<Vec<Package>, StoreError> {
        self.check_online()?;
        let mut matching: Vec<Package> = self
            .tables
            .read()
            .await
            .packages
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn update_package(&self, id: PackageId, patch: PackagePatch) -> Result<(), StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let package = tables
            .packages
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("package", &id))?;
        patch.apply(package);
        tracing::debug!(uid = %package.uid, ?patch, "Updated package");
        Ok(())
    }

    async fn update_packages_where(
        &self,
        filter: PackageFilter,
        patch: PackagePatch,
    ) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let mut changed: usize = 0;
        for package in tables.packages.values_mut().filter(|p| filter.matches(p)) {
            patch.apply(package);
            changed = changed.saturating_add(1);
        }
        tracing::debug!(changed, ?patch, "Bulk-updated packages");
        Ok(count_u64(changed))
    }

    async fn create_random_package(&self) -> Result<Package, StoreError> {
        self.check_online()?;
        let package = Package::pending(generate_uid());
        self.tables
            .write()
            .await
            .packages
            .insert(package.id, package.clone());
        tracing::debug!(uid = %package.uid, "Created package");
        Ok(package)
    }

    async fn list_bins(&self) -> Result<Vec<Bin>, StoreError> {
        self.check_online()?;
        let mut bins: Vec<Bin> = self.tables.read().await.bins.values().cloned().collect();
        bins.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(bins)
    }

    async fn get_bin(&self, id: BinId) -> Result<Bin, StoreError> {
        self.check_online()?;
        self.tables
            .read()
            .await
            .bins
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("bin", &id))
    }

    async fn update_bin(&self, id: BinId, patch: BinPatch) -> Result<(), StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let bin = tables
            .bins
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bin", &id))?;
        patch.apply(bin);
        tracing::debug!(location = %bin.location, ?patch, "Updated bin");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleet_types::{BinStatus, PackageStatus, RobotStatus};

    use super::*;

    #[test]
    fn generated_uid_has_prefix_and_length() {
        let uid = generate_uid();
        assert!(uid.starts_with(PACKAGE_UID_PREFIX));
        assert_eq!(uid.len(), PACKAGE_UID_PREFIX.len() + PACKAGE_UID_LEN);
        assert_eq!(uid, uid.to_uppercase());
    }

    #[tokio::test]
    async fn created_package_is_pending_and_unassigned() {
        let store = MemoryStore::new();
        let package = store.create_random_package().await.unwrap();
        assert_eq!(package.status, PackageStatus::Pending);
        assert!(package.bot_assigned.is_none());
        let listed = store.list_packages(PackageFilter::all()).await.unwrap();
        assert_eq!(listed, vec![package]);
    }

    #[tokio::test]
    async fn update_unknown_robot_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_robot(RobotId::new(), RobotPatch::status(RobotStatus::Idle))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn bulk_update_respects_filter() {
        let store = MemoryStore::new();
        let mut charging = Robot::new("BOT-01");
        charging.status = RobotStatus::Charging;
        store.insert_robot(charging.clone()).await;
        store.insert_robot(Robot::new("BOT-02")).await;

        let changed = store
            .update_robots_where(
                RobotFilter::without_status(RobotStatus::Charging),
                RobotPatch::status(RobotStatus::Idle),
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);
        let still_charging = store.robot(charging.id).await.unwrap();
        assert_eq!(still_charging.status, RobotStatus::Charging);
    }

    #[tokio::test]
    async fn package_limit_is_honoured() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            store.create_random_package().await.unwrap();
        }
        let one = store
            .list_packages(PackageFilter::with_status(PackageStatus::Pending).limit(1))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        let bin = Bin::new("A-01", 4);
        store.insert_bin(bin.clone()).await;
        store.set_offline(true);
        assert!(matches!(
            store.list_bins().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.create_random_package().await.is_err());

        store.set_offline(false);
        store
            .update_bin(
                bin.id,
                BinPatch {
                    current_count: Some(4),
                    status: Some(BinStatus::Full),
                },
            )
            .await
            .unwrap();
        let stored = store.get_bin(bin.id).await.unwrap();
        assert_eq!(stored.status, BinStatus::Full);
    }
}
