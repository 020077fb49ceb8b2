//! Run-state control for the fleet simulation.
//!
//! The controller owns the two periodic schedules (tick engine and package
//! generator) and the three-way run state shared with the operator API:
//!
//! ```text
//!            start                 pause
//!  stopped ---------> running -------------> paused
//!     ^                 ^  |                   |
//!     |                 |  +--- start ---------+ (restarts schedules)
//!     +-- emergency_stop (from any state) -----+
//! ```
//!
//! # Ordering
//!
//! Every transition updates the state and swaps the schedules under one
//! lock, so a tick can never fire after a pause or stop has returned, and
//! a running controller always has both schedules armed.
//!
//! Robot reactivation on start runs as its own task. The first tick of the
//! new schedule waits for it, and so does an emergency stop, so the stop's
//! halt is never overwritten by a late reactivation. A failed store write
//! is logged and the transition still stands.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use fleet_db::EntityStore;
use fleet_types::{
    PackageFilter, PackagePatch, PackageStatus, RobotFilter, RobotPatch, RobotStatus, RunState,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{FleetConfig, ScheduleConfig, TickRules};
use crate::generator::PackageGenerator;
use crate::random::{RandomSource, SeededRandom};
use crate::schedule::{FirstRun, PeriodicTask};
use crate::tick::{TickEngine, TickSummary};

/// Snapshot of the controller for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlStatus {
    /// Current run state.
    pub state: RunState,
    /// Configured tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Configured package generation period in milliseconds.
    pub package_interval_ms: u64,
    /// Ticks run since the process started.
    pub ticks_run: u64,
    /// Packages generated since the process started.
    pub packages_generated: u64,
    /// Summary of the most recent tick.
    pub last_tick: Option<TickSummary>,
    /// When the simulation was last started, if it is running or paused.
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Control {
    state: RunState,
    tick_task: Option<PeriodicTask>,
    package_task: Option<PeriodicTask>,
    /// Completion flag of the latest start's robot reactivation.
    reactivation: Option<watch::Receiver<bool>>,
    started_at: Option<DateTime<Utc>>,
}

impl Control {
    fn transition(&mut self, state: RunState) {
        if let Some(task) = self.tick_task.take() {
            task.cancel();
        }
        if let Some(task) = self.package_task.take() {
            task.cancel();
        }
        self.state = state;
    }
}

/// Wait until a reactivation flag is raised or its task is gone.
async fn reactivation_done(mut done: watch::Receiver<bool>) -> bool {
    done.wait_for(|finished| *finished).await.is_ok()
}

/// Drives the simulation: starts, pauses, and halts the periodic tasks.
///
/// Dropping the controller cancels both schedules.
#[derive(Debug)]
pub struct FleetController<S> {
    store: Arc<S>,
    engine: Arc<TickEngine<S>>,
    generator: Arc<PackageGenerator<S>>,
    schedule: ScheduleConfig,
    control: Mutex<Control>,
}

impl<S: EntityStore> FleetController<S> {
    /// Create a stopped controller.
    pub fn new(
        store: Arc<S>,
        schedule: ScheduleConfig,
        rules: TickRules,
        rng: impl RandomSource + 'static,
    ) -> Self {
        Self {
            engine: Arc::new(TickEngine::new(Arc::clone(&store), rules, rng)),
            generator: Arc::new(PackageGenerator::new(Arc::clone(&store))),
            store,
            schedule,
            control: Mutex::new(Control::default()),
        }
    }

    /// Create a stopped controller from loaded configuration, seeding the
    /// random source from `simulation.seed` when present.
    pub fn from_config(store: Arc<S>, config: &FleetConfig) -> Self {
        Self::new(
            store,
            config.simulation.clone(),
            config.rules.clone(),
            SeededRandom::from_optional_seed(config.simulation.seed),
        )
    }

    /// The store the controller writes to.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The tick engine driven by the tick schedule.
    pub const fn engine(&self) -> &Arc<TickEngine<S>> {
        &self.engine
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Full status snapshot.
    pub fn status(&self) -> ControlStatus {
        let control = self.lock();
        ControlStatus {
            state: control.state,
            tick_interval_ms: self.schedule.tick_interval_ms,
            package_interval_ms: self.schedule.package_interval_ms,
            ticks_run: self.engine.ticks_run(),
            packages_generated: self.generator.packages_created(),
            last_tick: self.engine.last_summary(),
            started_at: control.started_at,
        }
    }

    /// Start (or restart) the simulation.
    ///
    /// Idle robots are reactivated and both schedules are armed. The tick
    /// schedule fires as soon as the reactivation has been written; the
    /// package schedule fires after one full period. Calling `start` while
    /// running restarts the schedules without duplicating them.
    ///
    /// The transition is complete before the first await, so dropping the
    /// returned future still leaves a running, fully armed simulation.
    pub async fn start(&self) -> RunState {
        let reactivated = {
            let mut control = self.lock();
            control.transition(RunState::Running);
            control.started_at = Some(Utc::now());
            let reactivated = self.spawn_reactivation();
            control.tick_task = Some(self.spawn_ticks(reactivated.clone()));
            control.package_task = Some(self.spawn_packages());
            control.reactivation = Some(reactivated.clone());
            reactivated
        };
        info!(
            tick_interval_ms = self.schedule.tick_interval_ms,
            package_interval_ms = self.schedule.package_interval_ms,
            "Fleet simulation running"
        );

        if !reactivation_done(reactivated).await {
            debug!("Robot reactivation task ended without reporting");
        }
        self.state()
    }

    /// Pause a running simulation. Both schedules stop; no entity is
    /// touched. Has no effect unless the simulation is running.
    pub fn pause(&self) -> RunState {
        let mut control = self.lock();
        if control.state == RunState::Running {
            control.transition(RunState::Paused);
            info!("Fleet simulation paused");
        } else {
            debug!(state = %control.state, "Pause ignored");
        }
        control.state
    }

    /// Halt everything, from any state.
    ///
    /// Both schedules stop, every robot that is not charging goes idle,
    /// and every processing package returns to pending and unassigned.
    /// Charging robots keep charging in place.
    pub async fn emergency_stop(&self) -> RunState {
        let pending = {
            let mut control = self.lock();
            control.transition(RunState::Stopped);
            control.started_at = None;
            control.reactivation.take()
        };
        warn!("Emergency stop");

        if let Some(done) = pending {
            reactivation_done(done).await;
        }

        match self
            .store
            .update_robots_where(
                RobotFilter::without_status(RobotStatus::Charging),
                RobotPatch::status(RobotStatus::Idle),
            )
            .await
        {
            Ok(halted) => info!(halted, "Robots halted"),
            Err(e) => warn!(error = %e, "Failed to halt robots"),
        }

        match self
            .store
            .update_packages_where(
                PackageFilter::with_status(PackageStatus::Processing),
                PackagePatch::release(),
            )
            .await
        {
            Ok(released) => info!(released, "Packages released"),
            Err(e) => warn!(error = %e, "Failed to release packages"),
        }

        RunState::Stopped
    }

    /// Cancel both schedules for process shutdown. Entities are left as
    /// they are.
    pub fn shutdown(&self) {
        let mut control = self.lock();
        if control.state != RunState::Stopped || control.tick_task.is_some() {
            control.transition(RunState::Stopped);
            info!("Fleet controller shut down");
        }
    }

    /// Reactivate idle robots on a task of their own, so the write
    /// survives the caller going away. The flag is raised once it is done.
    fn spawn_reactivation(&self) -> watch::Receiver<bool> {
        let (done, finished) = watch::channel(false);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store
                .update_robots_where(
                    RobotFilter::with_status(RobotStatus::Idle),
                    RobotPatch::status(RobotStatus::Active),
                )
                .await
            {
                Ok(reactivated) => info!(reactivated, "Reactivated idle robots"),
                Err(e) => warn!(error = %e, "Failed to reactivate idle robots"),
            }
            done.send_replace(true);
        });
        finished
    }

    fn spawn_ticks(&self, reactivated: watch::Receiver<bool>) -> PeriodicTask {
        let engine = Arc::clone(&self.engine);
        PeriodicTask::spawn(
            "tick",
            self.schedule.tick_interval(),
            FirstRun::Immediately,
            move || {
                let engine = Arc::clone(&engine);
                let reactivated = reactivated.clone();
                async move {
                    // Only the first run can actually wait here.
                    reactivation_done(reactivated).await;
                    engine.run_tick().await;
                }
            },
        )
    }

    fn spawn_packages(&self) -> PeriodicTask {
        let generator = Arc::clone(&self.generator);
        PeriodicTask::spawn(
            "package",
            self.schedule.package_interval(),
            FirstRun::AfterPeriod,
            move || {
                let generator = Arc::clone(&generator);
                async move {
                    generator.generate().await;
                }
            },
        )
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use fleet_db::MemoryStore;
    use fleet_types::{Package, Robot};

    use super::*;
    use crate::random::FixedRandom;

    fn controller(store: &Arc<MemoryStore>) -> FleetController<MemoryStore> {
        FleetController::new(
            Arc::clone(store),
            ScheduleConfig::default(),
            TickRules::default(),
            FixedRandom::never(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn starts_stopped() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        assert_eq!(controller.state(), RunState::Stopped);
        assert_eq!(controller.status().ticks_run, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_first_tick_immediately() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);

        assert_eq!(controller.start().await, RunState::Running);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(controller.status().ticks_run, 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.status().ticks_run, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        controller.start().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(controller.pause(), RunState::Paused);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(controller.status().ticks_run, 1);
        assert_eq!(controller.status().packages_generated, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_is_ignored_when_stopped() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        assert_eq!(controller.pause(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_does_not_duplicate_schedules() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        controller.start().await;
        controller.start().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Each start fires one immediate tick, but only one schedule survives.
        let after_restart = controller.status().ticks_run;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.status().ticks_run, after_restart + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn packages_arrive_after_one_period() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        controller.start().await;

        tokio::time::sleep(Duration::from_millis(7_990)).await;
        assert_eq!(controller.status().packages_generated, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.status().packages_generated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn emergency_stop_halts_fleet() {
        let store = Arc::new(MemoryStore::new());
        let active = Robot::new("BOT-01");
        let mut charging = Robot::new("BOT-02");
        charging.status = RobotStatus::Charging;
        charging.current_row = fleet_types::CHARGING_ROW;
        store.insert_robot(active.clone()).await;
        store.insert_robot(charging.clone()).await;
        let mut carried = Package::pending("PKG-00000A");
        carried.status = PackageStatus::Processing;
        carried.bot_assigned = Some(active.name.clone());
        store.insert_package(carried.clone()).await;

        let controller = controller(&store);
        controller.start().await;
        assert_eq!(controller.emergency_stop().await, RunState::Stopped);

        assert_eq!(store.robot(active.id).await.unwrap().status, RobotStatus::Idle);
        assert_eq!(
            store.robot(charging.id).await.unwrap().status,
            RobotStatus::Charging
        );
        let package = store.package(carried.id).await.unwrap();
        assert_eq!(package.status, PackageStatus::Pending);
        assert!(package.bot_assigned.is_none());
        assert!(controller.status().started_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn store_failure_does_not_block_transitions() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        store.set_offline(true);
        assert_eq!(controller.start().await, RunState::Running);
        assert_eq!(controller.emergency_stop().await, RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_schedules() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller(&store);
        controller.start().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.shutdown();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(controller.status().ticks_run, 1);
        assert_eq!(controller.state(), RunState::Stopped);
    }
}
