//! Shared type definitions for the warehouse fleet simulation.
//!
//! This crate is the single source of truth for the entity records that
//! flow between the entity store, the control loop, and the observer API.
//! Types are exported to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for robots, packages, and bins
//! - [`enums`] -- Status enums and the control loop's run state
//! - [`structs`] -- Entity records (robot, package, bin) and lane constants
//! - [`query`] -- Partial-update patches and query filters

pub mod enums;
pub mod ids;
pub mod query;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BinStatus, FillLevel, PackageStatus, RobotStatus, RunState, UnknownStatus};
pub use ids::{BinId, PackageId, RobotId};
pub use query::{
    AssignmentFilter, BinPatch, PackageFilter, PackagePatch, RobotFilter, RobotPatch,
};
pub use structs::{Bin, CHARGING_ROW, MAX_BATTERY, Package, ROW_COUNT, Robot};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::RobotId::export_all();
        let _ = crate::ids::PackageId::export_all();
        let _ = crate::ids::BinId::export_all();

        // Enums
        let _ = crate::enums::RobotStatus::export_all();
        let _ = crate::enums::PackageStatus::export_all();
        let _ = crate::enums::BinStatus::export_all();
        let _ = crate::enums::FillLevel::export_all();
        let _ = crate::enums::RunState::export_all();

        // Structs
        let _ = crate::structs::Robot::export_all();
        let _ = crate::structs::Package::export_all();
        let _ = crate::structs::Bin::export_all();
        let _ = crate::query::RobotPatch::export_all();
        let _ = crate::query::PackagePatch::export_all();
        let _ = crate::query::BinPatch::export_all();
    }
}
