//! Tick engine: one step of the fleet simulation.
//!
//! Each tick runs four steps in order, each against a fresh read of the
//! store:
//!
//! 1. **Robot update** -- active robots drain battery and wander to a random
//!    lane; at or below the low-battery threshold they are sent to the
//!    charging lane and release any package they carry. Charging robots
//!    recharge and return to active once full enough. Idle robots are left
//!    alone.
//!
//! 2. **Assignment** -- with some probability, one pending unassigned
//!    package goes to a randomly chosen active robot with enough battery
//!    that is not already carrying a package.
//!
//! 3. **Completion** -- with some probability, one processing package is
//!    delivered.
//!
//! 4. **Bin drift** -- with some probability, one random bin's count moves
//!    by -1, 0, or +1. Bins in maintenance keep their status.
//!
//! Store failures are logged and never abort the tick: a failed step is
//! skipped and the next step still runs. Nothing is transactional across
//! steps.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fleet_db::{EntityStore, StoreError};
use fleet_types::{
    Bin, BinPatch, BinStatus, CHARGING_ROW, MAX_BATTERY, PackageFilter, PackagePatch,
    PackageStatus, ROW_COUNT, Robot, RobotFilter, RobotPatch, RobotStatus,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TickRules;
use crate::random::RandomSource;

/// A package handed to a robot during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRecord {
    /// Display uid of the package.
    pub package_uid: String,
    /// Name of the robot now carrying it.
    pub robot: String,
}

/// The bin whose count drifted during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinDriftRecord {
    /// Rack location of the bin.
    pub location: String,
    /// Count before the drift.
    pub previous_count: u32,
    /// Count after the drift.
    pub current_count: u32,
    /// Status after the drift.
    pub status: BinStatus,
}

/// What a single tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Sequence number of this tick, starting at 1.
    pub tick: u64,
    /// Robot records written back.
    pub robots_updated: u32,
    /// Robots sent to the charging lane this tick.
    pub sent_to_charge: Vec<String>,
    /// Robots that finished charging this tick.
    pub recharged: Vec<String>,
    /// Packages returned to pending because their robot went to charge.
    pub packages_released: u64,
    /// Package assigned this tick, if any.
    pub assigned: Option<AssignmentRecord>,
    /// Uid of the package completed this tick, if any.
    pub completed: Option<String>,
    /// Bin drift applied this tick, if any.
    pub drifted_bin: Option<BinDriftRecord>,
    /// Store operations that failed during the tick.
    pub store_errors: u32,
}

impl TickSummary {
    fn record_error(&mut self, step: &'static str, error: &StoreError) {
        warn!(tick = self.tick, step, error = %error, "Tick step failed, continuing");
        self.store_errors = self.store_errors.saturating_add(1);
    }
}

/// The write-back computed for one robot by the robot-update step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotUpdate {
    /// Fields to write.
    pub patch: RobotPatch,
    /// The robot dropped to the low-battery threshold and must charge.
    pub sent_to_charge: bool,
    /// The robot reached the resume threshold and is active again.
    pub recharged: bool,
}

/// Compute a robot's next state. Returns `None` for robots the tick leaves
/// untouched (idle robots).
pub fn next_robot_state(
    robot: &Robot,
    rules: &TickRules,
    rng: &mut dyn RandomSource,
) -> Option<RobotUpdate> {
    let level = f64::from(robot.battery_level);
    match robot.status {
        RobotStatus::Active => {
            let battery = (level - rng.uniform(rules.drain_range.clone())).max(0.0);
            let lane = u8::try_from(rng.pick(usize::from(ROW_COUNT))).unwrap_or(0);
            let sent_to_charge = battery <= f64::from(rules.low_battery_threshold);
            let (status, row) = if sent_to_charge {
                (RobotStatus::Charging, CHARGING_ROW)
            } else {
                (RobotStatus::Active, lane)
            };
            Some(RobotUpdate {
                patch: RobotPatch {
                    battery_level: Some(round_battery(battery)),
                    status: Some(status),
                    current_row: Some(row),
                },
                sent_to_charge,
                recharged: false,
            })
        }
        RobotStatus::Charging => {
            let battery =
                (level + rng.uniform(rules.charge_range.clone())).min(f64::from(MAX_BATTERY));
            let recharged = battery >= f64::from(rules.resume_threshold);
            let status = if recharged {
                RobotStatus::Active
            } else {
                RobotStatus::Charging
            };
            Some(RobotUpdate {
                patch: RobotPatch {
                    battery_level: Some(round_battery(battery)),
                    status: Some(status),
                    current_row: Some(CHARGING_ROW),
                },
                sent_to_charge: false,
                recharged,
            })
        }
        RobotStatus::Idle => None,
    }
}

/// Round to the nearest whole percent and clamp to `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_battery(level: f64) -> u8 {
    if level.is_nan() {
        return 0;
    }
    // Clamped first, so the cast is exact.
    level.round().clamp(0.0, f64::from(MAX_BATTERY)) as u8
}

/// Compute the patch for drifting `bin` by `step` items.
///
/// The count is clamped to `0..=capacity`. Status is recomputed from the new
/// count unless the bin is in maintenance, in which case it is left alone.
pub fn drift_bin(bin: &Bin, step: i64) -> BinPatch {
    let capacity = i64::from(bin.capacity);
    let count = i64::from(bin.current_count)
        .saturating_add(step)
        .clamp(0, capacity);
    let count = u32::try_from(count).unwrap_or(bin.capacity);
    let status = (bin.status != BinStatus::Maintenance)
        .then(|| Bin::status_for_count(count, bin.capacity));
    BinPatch {
        current_count: Some(count),
        status,
    }
}

/// Runs simulation ticks against an entity store.
///
/// The random source sits behind an async mutex held for the whole tick,
/// so two ticks on the same engine never interleave.
pub struct TickEngine<S> {
    store: Arc<S>,
    rules: TickRules,
    rng: Mutex<Box<dyn RandomSource>>,
    ticks: AtomicU64,
    last: std::sync::Mutex<Option<TickSummary>>,
}

impl<S> std::fmt::Debug for TickEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickEngine")
            .field("rules", &self.rules)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<S: EntityStore> TickEngine<S> {
    /// Create an engine over `store` using `rules` and `rng`.
    pub fn new(store: Arc<S>, rules: TickRules, rng: impl RandomSource + 'static) -> Self {
        Self {
            store,
            rules,
            rng: Mutex::new(Box::new(rng)),
            ticks: AtomicU64::new(0),
            last: std::sync::Mutex::new(None),
        }
    }

    /// The rules this engine applies.
    pub const fn rules(&self) -> &TickRules {
        &self.rules
    }

    /// Number of ticks started so far.
    pub fn ticks_run(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Summary of the most recent completed tick.
    pub fn last_summary(&self) -> Option<TickSummary> {
        self.last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Run one tick. Never fails: store errors are logged and counted in
    /// the returned summary.
    pub async fn run_tick(&self) -> TickSummary {
        let mut rng = self.rng.lock().await;
        let tick = self.ticks.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };
        debug!(tick, "Running fleet tick");

        self.update_robots(&mut summary, &mut **rng).await;
        self.assign_package(&mut summary, &mut **rng).await;
        self.complete_package(&mut summary, &mut **rng).await;
        self.drift_bins(&mut summary, &mut **rng).await;
        drop(rng);

        info!(
            tick,
            robots_updated = summary.robots_updated,
            sent_to_charge = summary.sent_to_charge.len(),
            recharged = summary.recharged.len(),
            packages_released = summary.packages_released,
            assigned = summary.assigned.as_ref().map(|a| a.package_uid.as_str()),
            completed = summary.completed.as_deref(),
            store_errors = summary.store_errors,
            "Fleet tick complete"
        );

        *self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(summary.clone());
        summary
    }

    // -----------------------------------------------------------------------
    // Step 1: robots
    // -----------------------------------------------------------------------

    async fn update_robots(&self, summary: &mut TickSummary, rng: &mut dyn RandomSource) {
        let robots = match self.store.list_robots().await {
            Ok(robots) => robots,
            Err(e) => {
                summary.record_error("list_robots", &e);
                return;
            }
        };

        // One robot at a time keeps the load on the store bounded.
        for robot in robots {
            let Some(update) = next_robot_state(&robot, &self.rules, rng) else {
                continue;
            };

            if update.sent_to_charge {
                info!(robot = %robot.name, "Battery low, sending robot to charge");
                let carried = PackageFilter::with_status(PackageStatus::Processing)
                    .assigned_to(robot.name.clone());
                match self
                    .store
                    .update_packages_where(carried, PackagePatch::release())
                    .await
                {
                    Ok(released) => {
                        summary.packages_released =
                            summary.packages_released.saturating_add(released);
                    }
                    Err(e) => summary.record_error("release_packages", &e),
                }
                summary.sent_to_charge.push(robot.name.clone());
            }
            if update.recharged {
                debug!(robot = %robot.name, "Robot recharged");
                summary.recharged.push(robot.name.clone());
            }

            match self.store.update_robot(robot.id, update.patch).await {
                Ok(()) => summary.robots_updated = summary.robots_updated.saturating_add(1),
                Err(e) => summary.record_error("update_robot", &e),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step 2: assignment
    // -----------------------------------------------------------------------

    async fn assign_package(&self, summary: &mut TickSummary, rng: &mut dyn RandomSource) {
        if !rng.chance(self.rules.assign_probability) {
            return;
        }

        let pending = PackageFilter::with_status(PackageStatus::Pending)
            .unassigned()
            .limit(1);
        let package = match self.store.list_packages(pending).await {
            Ok(packages) => packages.into_iter().next(),
            Err(e) => {
                summary.record_error("list_pending", &e);
                return;
            }
        };
        let Some(package) = package else {
            return;
        };

        let busy: BTreeSet<String> = match self
            .store
            .list_packages(PackageFilter::with_status(PackageStatus::Processing))
            .await
        {
            Ok(carried) => carried.into_iter().filter_map(|p| p.bot_assigned).collect(),
            Err(e) => {
                summary.record_error("list_processing", &e);
                return;
            }
        };

        let candidates: Vec<Robot> = match self
            .store
            .list_robots_where(RobotFilter::with_status(RobotStatus::Active))
            .await
        {
            Ok(robots) => robots
                .into_iter()
                .filter(|r| r.battery_level > self.rules.assignable_battery_min)
                .filter(|r| !busy.contains(&r.name))
                .collect(),
            Err(e) => {
                summary.record_error("list_active_robots", &e);
                return;
            }
        };
        let Some(robot) = candidates.get(rng.pick(candidates.len())) else {
            return;
        };

        match self
            .store
            .update_package(package.id, PackagePatch::assign(robot.name.clone()))
            .await
        {
            Ok(()) => {
                info!(package = %package.uid, robot = %robot.name, "Assigned package");
                summary.assigned = Some(AssignmentRecord {
                    package_uid: package.uid,
                    robot: robot.name.clone(),
                });
            }
            Err(e) => summary.record_error("assign_package", &e),
        }
    }

    // -----------------------------------------------------------------------
    // Step 3: completion
    // -----------------------------------------------------------------------

    async fn complete_package(&self, summary: &mut TickSummary, rng: &mut dyn RandomSource) {
        if !rng.chance(self.rules.complete_probability) {
            return;
        }

        let processing = PackageFilter::with_status(PackageStatus::Processing).limit(1);
        let package = match self.store.list_packages(processing).await {
            Ok(packages) => packages.into_iter().next(),
            Err(e) => {
                summary.record_error("list_processing", &e);
                return;
            }
        };
        let Some(package) = package else {
            return;
        };

        match self
            .store
            .update_package(package.id, PackagePatch::complete())
            .await
        {
            Ok(()) => {
                info!(package = %package.uid, "Completed package");
                summary.completed = Some(package.uid);
            }
            Err(e) => summary.record_error("complete_package", &e),
        }
    }

    // -----------------------------------------------------------------------
    // Step 4: bins
    // -----------------------------------------------------------------------

    async fn drift_bins(&self, summary: &mut TickSummary, rng: &mut dyn RandomSource) {
        if !rng.chance(self.rules.bin_drift_probability) {
            return;
        }

        let bins = match self.store.list_bins().await {
            Ok(bins) => bins,
            Err(e) => {
                summary.record_error("list_bins", &e);
                return;
            }
        };
        let Some(bin) = bins.get(rng.pick(bins.len())) else {
            return;
        };

        let patch = drift_bin(bin, rng.step());
        let current_count = patch.current_count.unwrap_or(bin.current_count);
        let status = patch.status.unwrap_or(bin.status);
        match self.store.update_bin(bin.id, patch).await {
            Ok(()) => {
                debug!(bin = %bin.location, current_count, %status, "Bin count drifted");
                summary.drifted_bin = Some(BinDriftRecord {
                    location: bin.location.clone(),
                    previous_count: bin.current_count,
                    current_count,
                    status,
                });
            }
            Err(e) => summary.record_error("update_bin", &e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::random::{FixedRandom, SeededRandom};

    fn robot(status: RobotStatus, battery: u8, row: u8) -> Robot {
        Robot {
            battery_level: battery,
            status,
            current_row: row,
            ..Robot::new("BOT-T")
        }
    }

    #[test]
    fn active_robot_drains_and_moves() {
        let rules = TickRules::default();
        let mut rng = FixedRandom::always().with_index(3);
        let update = next_robot_state(&robot(RobotStatus::Active, 80, 0), &rules, &mut rng).unwrap();
        assert_eq!(update.patch.battery_level, Some(78));
        assert_eq!(update.patch.current_row, Some(3));
        assert_eq!(update.patch.status, Some(RobotStatus::Active));
        assert!(!update.sent_to_charge);
    }

    #[test]
    fn low_battery_sends_to_charging_row() {
        let rules = TickRules::default();
        let mut rng = FixedRandom::always().with_index(1);
        let update = next_robot_state(&robot(RobotStatus::Active, 17, 1), &rules, &mut rng).unwrap();
        assert!(update.sent_to_charge);
        assert_eq!(update.patch.status, Some(RobotStatus::Charging));
        assert_eq!(update.patch.current_row, Some(CHARGING_ROW));
        assert_eq!(update.patch.battery_level, Some(15));
    }

    #[test]
    fn drain_never_goes_negative() {
        let rules = TickRules::default();
        let mut rng = FixedRandom::always().with_fraction(0.99);
        let update = next_robot_state(&robot(RobotStatus::Active, 1, 2), &rules, &mut rng).unwrap();
        assert_eq!(update.patch.battery_level, Some(0));
        assert!(update.sent_to_charge);
    }

    #[test]
    fn charging_robot_recharges_in_place() {
        let rules = TickRules::default();
        let mut rng = FixedRandom::always();
        let update =
            next_robot_state(&robot(RobotStatus::Charging, 50, CHARGING_ROW), &rules, &mut rng)
                .unwrap();
        assert_eq!(update.patch.battery_level, Some(53));
        assert_eq!(update.patch.status, Some(RobotStatus::Charging));
        assert_eq!(update.patch.current_row, Some(CHARGING_ROW));
        assert!(!update.recharged);
    }

    #[test]
    fn charging_robot_resumes_at_threshold_and_caps_at_full() {
        let rules = TickRules::default();
        let mut rng = FixedRandom::always().with_fraction(0.99);
        let update =
            next_robot_state(&robot(RobotStatus::Charging, 97, CHARGING_ROW), &rules, &mut rng)
                .unwrap();
        assert_eq!(update.patch.battery_level, Some(MAX_BATTERY));
        assert_eq!(update.patch.status, Some(RobotStatus::Active));
        assert!(update.recharged);
    }

    #[test]
    fn idle_robot_is_untouched() {
        let rules = TickRules::default();
        let mut rng = FixedRandom::always();
        assert!(next_robot_state(&robot(RobotStatus::Idle, 40, 2), &rules, &mut rng).is_none());
    }

    #[test]
    fn battery_stays_in_bounds_over_many_updates() {
        let rules = TickRules::default();
        let mut rng = SeededRandom::from_seed(11);
        let mut r = robot(RobotStatus::Active, 100, 0);
        for _ in 0..500 {
            if let Some(update) = next_robot_state(&r, &rules, &mut rng) {
                update.patch.apply(&mut r);
            }
            assert!(r.battery_level <= MAX_BATTERY);
            assert!(r.is_parked_consistently());
        }
    }

    #[test]
    fn full_bin_drifting_by_zero_becomes_full() {
        let mut bin = Bin::new("A-01", 10);
        bin.current_count = 10;
        bin.status = BinStatus::Available;
        let patch = drift_bin(&bin, 0);
        assert_eq!(patch.current_count, Some(10));
        assert_eq!(patch.status, Some(BinStatus::Full));
    }

    #[test]
    fn drift_clamps_to_capacity_and_zero() {
        let mut bin = Bin::new("A-02", 3);
        bin.current_count = 3;
        assert_eq!(drift_bin(&bin, 1).current_count, Some(3));
        bin.current_count = 0;
        let patch = drift_bin(&bin, -1);
        assert_eq!(patch.current_count, Some(0));
        assert_eq!(patch.status, Some(BinStatus::Available));
    }

    #[test]
    fn maintenance_bin_keeps_status() {
        let mut bin = Bin::new("A-03", 5);
        bin.current_count = 4;
        bin.status = BinStatus::Maintenance;
        let patch = drift_bin(&bin, 1);
        assert_eq!(patch.current_count, Some(5));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn round_battery_handles_edges() {
        assert_eq!(round_battery(-3.0), 0);
        assert_eq!(round_battery(14.5), 15);
        assert_eq!(round_battery(120.0), MAX_BATTERY);
        assert_eq!(round_battery(f64::NAN), 0);
    }
}
