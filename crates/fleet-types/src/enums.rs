//! Enumeration types for the fleet simulation.
//!
//! Every status enum serializes in lowercase and converts to and from the
//! same lowercase string, which is also the value stored in the `status`
//! columns of the persistent store.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A status string that does not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status: {value:?}")]
pub struct UnknownStatus {
    /// Which enum was being parsed (e.g. "robot").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, [`Display`](fmt::Display) and [`FromStr`] for a
/// fieldless enum from a variant-to-string table.
macro_rules! status_strings {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The lowercase string form used in storage and on the wire.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownStatus {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Robot
// ---------------------------------------------------------------------------

/// Operating status of a mobile robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RobotStatus {
    /// Moving between lanes and eligible to carry packages.
    Active,
    /// Parked in the charging lane, recharging its battery.
    Charging,
    /// Halted by an emergency stop until the next start.
    Idle,
}

status_strings!(RobotStatus, "robot", {
    Active => "active",
    Charging => "charging",
    Idle => "idle",
});

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// Lifecycle status of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum PackageStatus {
    /// Waiting for a robot.
    Pending,
    /// Carried by the robot named in `bot_assigned`.
    Processing,
    /// Delivered. Terminal.
    Completed,
}

status_strings!(PackageStatus, "package", {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
});

// ---------------------------------------------------------------------------
// Bin
// ---------------------------------------------------------------------------

/// Availability status of a storage bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BinStatus {
    /// Below capacity and accepting items.
    Available,
    /// At capacity.
    Full,
    /// Taken out of service by an operator. Never changed by the tick.
    Maintenance,
}

status_strings!(BinStatus, "bin", {
    Available => "available",
    Full => "full",
    Maintenance => "maintenance",
});

/// Display-oriented fill classification of a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum FillLevel {
    /// Under half full.
    Available,
    /// At least half full but not at capacity.
    Filling,
    /// At capacity, or out of service.
    Full,
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// State of the supervisory control loop.
///
/// Not persisted: a fresh process always starts in [`RunState::Stopped`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RunState {
    /// No schedules armed. Initial state and the result of an emergency stop.
    #[default]
    Stopped,
    /// Tick and package schedules are firing.
    Running,
    /// Schedules cancelled; entity state left as-is.
    Paused,
}

status_strings!(RunState, "run", {
    Stopped => "stopped",
    Running => "running",
    Paused => "paused",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [RobotStatus::Active, RobotStatus::Charging, RobotStatus::Idle] {
            assert_eq!(status.as_str().parse::<RobotStatus>().unwrap(), status);
        }
        for status in [BinStatus::Available, BinStatus::Full, BinStatus::Maintenance] {
            assert_eq!(status.to_string().parse::<BinStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "returned".parse::<PackageStatus>().unwrap_err();
        assert_eq!(err.kind, "package");
        assert_eq!(err.value, "returned");
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&PackageStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let state: RunState = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(state, RunState::Paused);
    }

    #[test]
    fn run_state_defaults_to_stopped() {
        assert_eq!(RunState::default(), RunState::Stopped);
    }
}
