//! Demo fleet for runs without a database.
//!
//! Fills an empty [`MemoryStore`] with robots, bins, and a few pending
//! packages so the control loop and the dashboard have something to work
//! on. Robots start active in random lanes with a random charge; bins
//! start partly filled.

use fleet_core::config::DemoFleetConfig;
use fleet_db::{EntityStore, MemoryStore, StoreError};
use fleet_types::{Bin, CHARGING_ROW, Robot};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Bins per rack row before the row letter advances.
const BINS_PER_RACK: u32 = 6;

/// Rack letters `A` to `Z`; the 27th rack wraps back to `A`.
const RACK_LETTERS: u32 = 26;

/// Lowest starting battery, kept well above the charging threshold.
const MIN_START_BATTERY: u8 = 40;

/// What [`seed_demo_fleet`] inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// Robots inserted.
    pub robots: u32,
    /// Bins inserted.
    pub bins: u32,
    /// Packages created.
    pub packages: u32,
}

/// Rack location label for the `index`th bin: `A-01` .. `A-06`, `B-01`, ...
fn bin_location(index: u32) -> String {
    let rack = u8::try_from(index / BINS_PER_RACK % RACK_LETTERS).unwrap_or(0);
    let slot = (index % BINS_PER_RACK).saturating_add(1);
    let letter = char::from(b'A'.saturating_add(rack));
    format!("{letter}-{slot:02}")
}

/// Insert the demo fleet described by `config`.
///
/// # Errors
///
/// Returns the store error if an initial package cannot be created.
pub async fn seed_demo_fleet(
    store: &MemoryStore,
    config: &DemoFleetConfig,
    seed: Option<u64>,
) -> Result<SeedReport, StoreError> {
    let mut rng = seed.map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);

    for i in 1..=config.robots {
        let robot = Robot {
            battery_level: rng.random_range(MIN_START_BATTERY..=100),
            current_row: rng.random_range(0..CHARGING_ROW),
            ..Robot::new(format!("BOT-{i:02}"))
        };
        store.insert_robot(robot).await;
    }

    let capacity = config.bin_capacity.max(1);
    for i in 0..config.bins {
        let count = rng.random_range(0..=capacity);
        let bin = Bin {
            current_count: count,
            status: Bin::status_for_count(count, capacity),
            ..Bin::new(bin_location(i), capacity)
        };
        store.insert_bin(bin).await;
    }

    for _ in 0..config.initial_packages {
        store.create_random_package().await?;
    }

    let report = SeedReport {
        robots: config.robots,
        bins: config.bins,
        packages: config.initial_packages,
    };
    info!(
        robots = report.robots,
        bins = report.bins,
        packages = report.packages,
        "Demo fleet seeded"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleet_types::{BinStatus, PackageFilter, RobotStatus};

    use super::*;

    #[test]
    fn bin_locations_advance_by_rack() {
        assert_eq!(bin_location(0), "A-01");
        assert_eq!(bin_location(5), "A-06");
        assert_eq!(bin_location(6), "B-01");
        assert_eq!(bin_location(13), "C-02");
        assert_eq!(bin_location(155), "Z-06");
        assert_eq!(bin_location(156), "A-01");
    }

    #[tokio::test]
    async fn seeds_a_consistent_fleet() {
        let store = MemoryStore::new();
        let config = DemoFleetConfig::default();
        let report = seed_demo_fleet(&store, &config, Some(7)).await.unwrap();

        let robots = store.list_robots().await.unwrap();
        assert_eq!(u32::try_from(robots.len()).unwrap(), report.robots);
        for r in &robots {
            assert_eq!(r.status, RobotStatus::Active);
            assert!(r.battery_level >= MIN_START_BATTERY);
            assert!(r.current_row < CHARGING_ROW);
        }

        let bins = store.list_bins().await.unwrap();
        assert_eq!(u32::try_from(bins.len()).unwrap(), report.bins);
        for b in &bins {
            assert!(b.current_count <= b.capacity);
            assert_eq!(
                b.status == BinStatus::Full,
                b.current_count >= b.capacity
            );
        }

        let packages = store.list_packages(PackageFilter::all()).await.unwrap();
        assert_eq!(u32::try_from(packages.len()).unwrap(), report.packages);
    }
}
