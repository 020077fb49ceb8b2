//! Partial-update patches and query filters for entity records.
//!
//! A patch names only the fields to change; `None` leaves a field as-is.
//! For the nullable `bot_assigned` column the patch uses
//! `Option<Option<String>>`: `Some(None)` clears the assignment.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BinStatus, PackageStatus, RobotStatus};
use crate::structs::{Bin, Package, Robot};

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// Fields of a [`Robot`] to overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RobotPatch {
    /// New battery level.
    pub battery_level: Option<u8>,
    /// New status.
    pub status: Option<RobotStatus>,
    /// New lane.
    pub current_row: Option<u8>,
}

impl RobotPatch {
    /// A patch that only changes the status.
    pub const fn status(status: RobotStatus) -> Self {
        Self {
            battery_level: None,
            status: Some(status),
            current_row: None,
        }
    }

    /// Apply the patch to a record in place.
    pub const fn apply(&self, robot: &mut Robot) {
        if let Some(level) = self.battery_level {
            robot.battery_level = level;
        }
        if let Some(status) = self.status {
            robot.status = status;
        }
        if let Some(row) = self.current_row {
            robot.current_row = row;
        }
    }
}

/// Fields of a [`Package`] to overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PackagePatch {
    /// New status.
    pub status: Option<PackageStatus>,
    /// New assignment; `Some(None)` clears it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "double_option")]
    #[ts(optional, as = "Option<Option<String>>")]
    pub bot_assigned: Option<Option<String>>,
}

impl PackagePatch {
    /// Back to `pending` with no robot, ready for reassignment.
    pub const fn release() -> Self {
        Self {
            status: Some(PackageStatus::Pending),
            bot_assigned: Some(None),
        }
    }

    /// Hand the package to `robot_name`.
    pub fn assign(robot_name: impl Into<String>) -> Self {
        Self {
            status: Some(PackageStatus::Processing),
            bot_assigned: Some(Some(robot_name.into())),
        }
    }

    /// Mark delivered and clear the assignment.
    pub const fn complete() -> Self {
        Self {
            status: Some(PackageStatus::Completed),
            bot_assigned: Some(None),
        }
    }

    /// Apply the patch to a record in place.
    pub fn apply(&self, package: &mut Package) {
        if let Some(status) = self.status {
            package.status = status;
        }
        if let Some(assigned) = &self.bot_assigned {
            package.bot_assigned.clone_from(assigned);
        }
    }
}

/// Fields of a [`Bin`] to overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BinPatch {
    /// New item count.
    pub current_count: Option<u32>,
    /// New status.
    pub status: Option<BinStatus>,
}

impl BinPatch {
    /// Apply the patch to a record in place.
    pub const fn apply(&self, bin: &mut Bin) {
        if let Some(count) = self.current_count {
            bin.current_count = count;
        }
        if let Some(status) = self.status {
            bin.status = status;
        }
    }
}

/// Serde helper distinguishing an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option, clippy::option_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Option<String>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    #[allow(clippy::option_option)]
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<String>>, D::Error> {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Selects robots by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RobotFilter {
    /// Only robots with this status.
    pub status: Option<RobotStatus>,
    /// Only robots whose status differs from this one.
    pub status_not: Option<RobotStatus>,
}

impl RobotFilter {
    /// Robots with exactly `status`.
    pub const fn with_status(status: RobotStatus) -> Self {
        Self {
            status: Some(status),
            status_not: None,
        }
    }

    /// Robots with any status other than `status`.
    pub const fn without_status(status: RobotStatus) -> Self {
        Self {
            status: None,
            status_not: Some(status),
        }
    }

    /// Whether `robot` passes the filter.
    pub fn matches(&self, robot: &Robot) -> bool {
        self.status.is_none_or(|s| robot.status == s)
            && self.status_not.is_none_or(|s| robot.status != s)
    }
}

/// Constraint on a package's `bot_assigned` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssignmentFilter {
    /// No constraint.
    #[default]
    Any,
    /// `bot_assigned IS NULL`.
    Unassigned,
    /// `bot_assigned = <name>`.
    Robot(String),
}

/// Selects packages by status and assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFilter {
    /// Only packages with this status.
    pub status: Option<PackageStatus>,
    /// Constraint on the assigned robot.
    pub assignment: AssignmentFilter,
    /// Maximum number of records to return (ignored by bulk updates).
    pub limit: Option<usize>,
}

impl PackageFilter {
    /// Every package.
    pub fn all() -> Self {
        Self::default()
    }

    /// Packages with exactly `status`.
    pub fn with_status(status: PackageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Restrict to unassigned packages.
    #[must_use]
    pub fn unassigned(mut self) -> Self {
        self.assignment = AssignmentFilter::Unassigned;
        self
    }

    /// Restrict to packages carried by `robot_name`.
    #[must_use]
    pub fn assigned_to(mut self, robot_name: impl Into<String>) -> Self {
        self.assignment = AssignmentFilter::Robot(robot_name.into());
        self
    }

    /// Return at most `limit` records.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `package` passes the status and assignment constraints.
    pub fn matches(&self, package: &Package) -> bool {
        let status_ok = self.status.is_none_or(|s| package.status == s);
        let assignment_ok = match &self.assignment {
            AssignmentFilter::Any => true,
            AssignmentFilter::Unassigned => package.bot_assigned.is_none(),
            AssignmentFilter::Robot(name) => package.bot_assigned.as_deref() == Some(name.as_str()),
        };
        status_ok && assignment_ok
    }
}
