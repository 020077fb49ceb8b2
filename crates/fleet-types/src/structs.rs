//! Entity records: robots, packages, and storage bins.
//!
//! Field names follow the persistent schema (`battery_level`,
//! `current_row`, `bot_assigned`, `current_count`) so records map onto the
//! existing `robots`, `packages`, and `bins` tables field for field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BinStatus, FillLevel, PackageStatus, RobotStatus};
use crate::ids::{BinId, PackageId, RobotId};

/// Number of lanes a robot can occupy (rows `0..ROW_COUNT`).
pub const ROW_COUNT: u8 = 5;

/// The lane reserved for charging. A charging robot is always parked here.
pub const CHARGING_ROW: u8 = 4;

/// Upper bound of `battery_level`.
pub const MAX_BATTERY: u8 = 100;

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

/// A mobile warehouse robot.
///
/// Robots are pre-existing records. The control loop only mutates their
/// battery, status, and lane; it never creates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Robot {
    /// Unique robot identifier.
    pub id: RobotId,
    /// Human-readable name, also used as the package assignment key.
    pub name: String,
    /// Battery charge in percent, always within `0..=100`.
    pub battery_level: u8,
    /// Operating status.
    pub status: RobotStatus,
    /// Current lane, `0..=4`. Lane [`CHARGING_ROW`] is the charging lane.
    pub current_row: u8,
}

impl Robot {
    /// Create an active robot with a full battery in lane 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RobotId::new(),
            name: name.into(),
            battery_level: MAX_BATTERY,
            status: RobotStatus::Active,
            current_row: 0,
        }
    }

    /// Whether the robot satisfies `charging => current_row == CHARGING_ROW`.
    pub fn is_parked_consistently(&self) -> bool {
        self.status != RobotStatus::Charging || self.current_row == CHARGING_ROW
    }
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// A package moving through the warehouse.
///
/// `bot_assigned` is set exactly when `status` is
/// [`PackageStatus::Processing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Package {
    /// Unique package identifier.
    pub id: PackageId,
    /// Display uid shown on the dashboard (e.g. `PKG-1A2B3C`).
    pub uid: String,
    /// Lifecycle status.
    pub status: PackageStatus,
    /// Name of the robot carrying the package, if any.
    pub bot_assigned: Option<String>,
    /// When the package record was created.
    pub created_at: DateTime<Utc>,
}

impl Package {
    /// Create a new pending, unassigned package.
    pub fn pending(uid: impl Into<String>) -> Self {
        Self {
            id: PackageId::new(),
            uid: uid.into(),
            status: PackageStatus::Pending,
            bot_assigned: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the assignment invariant holds for this record.
    pub const fn assignment_consistent(&self) -> bool {
        matches!(
            (self.status, &self.bot_assigned),
            (PackageStatus::Processing, Some(_))
                | (PackageStatus::Pending | PackageStatus::Completed, None)
        )
    }
}

// ---------------------------------------------------------------------------
// Bin
// ---------------------------------------------------------------------------

/// A storage bin with finite capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bin {
    /// Unique bin identifier.
    pub id: BinId,
    /// Rack location label (e.g. `A-03`).
    pub location: String,
    /// Maximum number of items, always positive.
    pub capacity: u32,
    /// Items currently stored, `0..=capacity`.
    pub current_count: u32,
    /// Availability status.
    pub status: BinStatus,
}

impl Bin {
    /// Create an empty, available bin.
    pub fn new(location: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: BinId::new(),
            location: location.into(),
            capacity,
            current_count: 0,
            status: BinStatus::Available,
        }
    }

    /// The in-service status a bin with `count` items should have.
    pub const fn status_for_count(count: u32, capacity: u32) -> BinStatus {
        if count >= capacity {
            BinStatus::Full
        } else {
            BinStatus::Available
        }
    }

    /// Fill ratio as a whole percentage, rounded to nearest.
    pub fn fill_percentage(&self) -> u32 {
        let count = u64::from(self.current_count);
        let capacity = u64::from(self.capacity);
        let scaled = count
            .saturating_mul(100)
            .saturating_add(capacity / 2)
            .checked_div(capacity)
            .unwrap_or(100);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    /// Display classification: maintenance and at-capacity bins read as
    /// full, bins at least half full (exact ratio) as filling.
    pub fn fill_level(&self) -> FillLevel {
        if self.status == BinStatus::Maintenance || self.current_count >= self.capacity {
            FillLevel::Full
        } else if u64::from(self.current_count).saturating_mul(2) >= u64::from(self.capacity) {
            FillLevel::Filling
        } else {
            FillLevel::Available
        }
    }
}
