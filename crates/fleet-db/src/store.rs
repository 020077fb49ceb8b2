//! The entity store interface consumed by the control loop.
//!
//! [`EntityStore`] abstracts read and write access to robot, package, and
//! bin records. The tick engine, the package generator, and the
//! controller's bulk operations all go through it, so any backend that
//! implements this trait can drive the simulation.
//!
//! Every method returns a `Send` future so the control loop can run store
//! calls inside spawned tokio tasks. Implementations need only per-record
//! atomicity; callers never rely on transactions spanning calls.

use std::future::Future;

use fleet_types::{
    Bin, BinId, BinPatch, Package, PackageFilter, PackageId, PackagePatch, Robot, RobotFilter,
    RobotId, RobotPatch,
};

use crate::error::StoreError;

/// Read/write access to robot, package, and bin records.
pub trait EntityStore: Send + Sync + 'static {
    /// List every robot.
    fn list_robots(&self) -> impl Future<Output = Result<Vec<Robot>, StoreError>> + Send;

    /// List robots matching `filter`.
    fn list_robots_where(
        &self,
        filter: RobotFilter,
    ) -> impl Future<Output = Result<Vec<Robot>, StoreError>> + Send;

    /// Overwrite the fields named in `patch` on one robot.
    ///
    /// Fails with [`StoreError::NotFound`] if no robot has `id`.
    fn update_robot(
        &self,
        id: RobotId,
        patch: RobotPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Apply `patch` to every robot matching `filter`, returning how many
    /// records changed.
    fn update_robots_where(
        &self,
        filter: RobotFilter,
        patch: RobotPatch,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// List packages matching `filter`, honouring its `limit`.
    fn list_packages(
        &self,
        filter: PackageFilter,
    ) -> impl Future<Output = Result<Vec<Package>, StoreError>> + Send;

    /// Overwrite the fields named in `patch` on one package.
    ///
    /// Fails with [`StoreError::NotFound`] if no package has `id`.
    fn update_package(
        &self,
        id: PackageId,
        patch: PackagePatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Apply `patch` to every package matching `filter` (its `limit` is
    /// ignored), returning how many records changed.
    fn update_packages_where(
        &self,
        filter: PackageFilter,
        patch: PackagePatch,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Create one pending, unassigned package with a fresh uid.
    fn create_random_package(&self) -> impl Future<Output = Result<Package, StoreError>> + Send;

    /// List every bin.
    fn list_bins(&self) -> impl Future<Output = Result<Vec<Bin>, StoreError>> + Send;

    /// Fetch one bin.
    ///
    /// Fails with [`StoreError::NotFound`] if no bin has `id`.
    fn get_bin(&self, id: BinId) -> impl Future<Output = Result<Bin, StoreError>> + Send;

    /// Overwrite the fields named in `patch` on one bin.
    ///
    /// Fails with [`StoreError::NotFound`] if no bin has `id`.
    fn update_bin(
        &self,
        id: BinId,
        patch: BinPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
