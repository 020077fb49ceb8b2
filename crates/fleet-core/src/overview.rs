//! Fleet-wide summary for the operator dashboard.

use fleet_db::{EntityStore, StoreError};
use fleet_types::{Bin, BinStatus, Package, PackageFilter, PackageStatus, Robot, RobotStatus};
use serde::Serialize;

/// Traffic-light health of a [`Ratio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Every member counts.
    Healthy,
    /// At least half count.
    Warning,
    /// Fewer than half count.
    Critical,
}

/// `current` out of `total`, e.g. robots active out of all robots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ratio {
    /// Members in the counted state.
    pub current: u64,
    /// All members.
    pub total: u64,
}

impl Ratio {
    /// Build a ratio.
    pub const fn new(current: u64, total: u64) -> Self {
        Self { current, total }
    }

    /// Health of the ratio. An empty fleet is healthy.
    pub const fn health(&self) -> Health {
        if self.current == self.total {
            Health::Healthy
        } else if self.current.saturating_mul(2) >= self.total {
            Health::Warning
        } else {
            Health::Critical
        }
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

/// Counts shown on the dashboard's system overview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetOverview {
    /// Active robots out of all robots.
    pub robots_active: Ratio,
    /// Health of `robots_active`.
    pub robots_health: Health,
    /// Robots charging.
    pub robots_charging: u64,
    /// Robots idle.
    pub robots_idle: u64,
    /// Packages waiting for a robot.
    pub packages_pending: u64,
    /// Packages being carried.
    pub packages_processing: u64,
    /// Packages delivered.
    pub packages_completed: u64,
    /// Bins at capacity and in service.
    pub bins_full: u64,
    /// Bins out of service.
    pub bins_in_maintenance: u64,
    /// Idle robots plus bins needing attention.
    pub warnings: u64,
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u64 {
    u64::try_from(items.iter().filter(|item| pred(*item)).count()).unwrap_or(u64::MAX)
}

impl FleetOverview {
    /// Summarise the given records.
    pub fn from_records(robots: &[Robot], packages: &[Package], bins: &[Bin]) -> Self {
        let robots_active = Ratio::new(
            count(robots, |r| r.status == RobotStatus::Active),
            u64::try_from(robots.len()).unwrap_or(u64::MAX),
        );
        let robots_idle = count(robots, |r| r.status == RobotStatus::Idle);
        let bins_full = count(bins, |b| b.status == BinStatus::Full);
        let bins_in_maintenance = count(bins, |b| b.status == BinStatus::Maintenance);
        Self {
            robots_health: robots_active.health(),
            robots_active,
            robots_charging: count(robots, |r| r.status == RobotStatus::Charging),
            robots_idle,
            packages_pending: count(packages, |p| p.status == PackageStatus::Pending),
            packages_processing: count(packages, |p| p.status == PackageStatus::Processing),
            packages_completed: count(packages, |p| p.status == PackageStatus::Completed),
            bins_full,
            bins_in_maintenance,
            warnings: robots_idle
                .saturating_add(bins_full)
                .saturating_add(bins_in_maintenance),
        }
    }

    /// Read every record from `store` and summarise it.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub async fn collect<S: EntityStore>(store: &S) -> Result<Self, StoreError> {
        let robots = store.list_robots().await?;
        let packages = store.list_packages(PackageFilter::all()).await?;
        let bins = store.list_bins().await?;
        Ok(Self::from_records(&robots, &packages, &bins))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleet_db::MemoryStore;

    use super::*;

    #[test]
    fn ratio_health_bands() {
        assert_eq!(Ratio::new(4, 4).health(), Health::Healthy);
        assert_eq!(Ratio::new(2, 4).health(), Health::Warning);
        assert_eq!(Ratio::new(1, 4).health(), Health::Critical);
        assert_eq!(Ratio::new(0, 0).health(), Health::Healthy);
        assert_eq!(Ratio::new(3, 5).to_string(), "3/5");
    }

    #[test]
    fn warnings_add_idle_robots_and_problem_bins() {
        let mut idle = Robot::new("BOT-01");
        idle.status = RobotStatus::Idle;
        let robots = vec![idle, Robot::new("BOT-02")];

        let mut full = Bin::new("A-01", 2);
        full.current_count = 2;
        full.status = BinStatus::Full;
        let mut closed = Bin::new("A-02", 2);
        closed.status = BinStatus::Maintenance;
        let bins = vec![full, closed, Bin::new("A-03", 2)];

        let overview = FleetOverview::from_records(&robots, &[], &bins);
        assert_eq!(overview.robots_active, Ratio::new(1, 2));
        assert_eq!(overview.robots_health, Health::Warning);
        assert_eq!(overview.bins_full, 1);
        assert_eq!(overview.bins_in_maintenance, 1);
        assert_eq!(overview.warnings, 3);
    }

    #[tokio::test]
    async fn collect_reads_the_store() {
        let store = MemoryStore::new();
        store.insert_robot(Robot::new("BOT-01")).await;
        store.create_random_package().await.unwrap();
        let overview = FleetOverview::collect(&store).await.unwrap();
        assert_eq!(overview.robots_active, Ratio::new(1, 1));
        assert_eq!(overview.packages_pending, 1);
        assert_eq!(overview.warnings, 0);
    }
}
