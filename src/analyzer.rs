use crate::direction::{ApproachGroup, Direction};
use crate::vehicle::{Vehicle, VehicleKind};
use itertools::Itertools;
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default seconds between congestion samples.
pub const ANALYSIS_INTERVAL_SEC: f64 = 2.0; // s

/// Congestion tallies for one approach, rebuilt wholesale every sample.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApproachStats {
    /// Vehicles held on this approach.
    pub vehicle_count: usize,
    /// Sum of their waits in s.
    pub total_wait_time: f64,
    /// Longest single wait in s.
    pub max_wait_time: f64,
    /// Mean wait in s.
    pub average_wait_time: f64,
    /// Wait of the longest-held vehicle in s.
    pub longest_waiting_vehicle: f64,
    /// Emergency vehicles held on this approach.
    pub emergency_count: usize,
}

/// The frozen output of one congestion sample, consumed by the policy
/// until the next sample replaces it.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisSummary {
    pub ns_score: f64,
    pub ew_score: f64,
    pub ns_count: usize,
    pub ew_count: usize,
    /// The approach an emergency vehicle is held on, if any.
    pub emergency: Option<Direction>,
}

/// Samples the fleet on a fixed cadence and scores each approach group.
///
/// Sampling, not the tick, is the analysis cadence: between samples the
/// stats and summary are frozen, and only the arbitration policy re-reads
/// them against live phase timing.
pub struct CongestionAnalyzer {
    interval: f64,
    since_sample: f64,
    stats: [ApproachStats; 4],
    summary: AnalysisSummary,
}

impl ApproachStats {
    /// Folds one held vehicle into the tallies.
    fn record(&mut self, wait_time: f64, emergency: bool) {
        self.vehicle_count += 1;
        self.total_wait_time += wait_time;
        self.max_wait_time = self.max_wait_time.max(wait_time);
        self.longest_waiting_vehicle = self.longest_waiting_vehicle.max(wait_time);
        if emergency {
            self.emergency_count += 1;
        }
        self.average_wait_time = self.total_wait_time / self.vehicle_count as f64;
    }

    /// The approach's priority score.
    ///
    /// The count contribution saturates so long queues cannot grow the
    /// score without bound, the wait contribution rewards age up to a cap,
    /// and a single emergency vehicle outweighs any ordinary queue.
    pub fn priority_score(&self) -> f64 {
        let count_score = (self.vehicle_count as f64 * 2.0).min(20.0);
        let wait_score = (self.longest_waiting_vehicle * 0.5).min(15.0);
        let emergency_score = self.emergency_count as f64 * 25.0;
        count_score + wait_score + emergency_score
    }
}

impl AnalysisSummary {
    /// The combined score of a group's two approaches.
    pub fn score(&self, group: ApproachGroup) -> f64 {
        match group {
            ApproachGroup::NS => self.ns_score,
            ApproachGroup::EW => self.ew_score,
        }
    }

    /// The combined held-vehicle count of a group's two approaches.
    pub fn count(&self, group: ApproachGroup) -> usize {
        match group {
            ApproachGroup::NS => self.ns_count,
            ApproachGroup::EW => self.ew_count,
        }
    }

    /// Whether any approach holds an emergency vehicle.
    pub fn has_emergency(&self) -> bool {
        self.emergency.is_some()
    }
}

impl CongestionAnalyzer {
    /// Creates an analyzer sampling every `interval` seconds.
    pub(crate) fn new(interval: f64) -> Self {
        Self {
            interval,
            since_sample: 0.0,
            stats: Default::default(),
            summary: AnalysisSummary::default(),
        }
    }

    /// Advances the sampling clock and resamples once the interval has
    /// elapsed. Returns whether a fresh sample was taken.
    pub(crate) fn advance<'a>(
        &mut self,
        dt: f64,
        vehicles: impl Iterator<Item = &'a Vehicle>,
    ) -> bool {
        self.since_sample += dt;
        if self.since_sample < self.interval {
            return false;
        }
        self.since_sample = 0.0;
        self.sample(vehicles);
        true
    }

    /// Rebuilds every tally from a full scan of the fleet. Only vehicles
    /// still short of the junction and already held up contribute.
    fn sample<'a>(&mut self, vehicles: impl Iterator<Item = &'a Vehicle>) {
        self.stats = Default::default();
        for vehicle in vehicles {
            if !vehicle.has_passed() && vehicle.wait_time() > 0.0 {
                self.stats[vehicle.direction().index()].record(
                    vehicle.wait_time(),
                    vehicle.kind() == VehicleKind::Emergency,
                );
            }
        }

        let score_of = |dir: Direction| self.stats[dir.index()].priority_score();
        let count_of = |dir: Direction| self.stats[dir.index()].vehicle_count;
        let mut summary = AnalysisSummary {
            ns_score: score_of(Direction::North) + score_of(Direction::South),
            ew_score: score_of(Direction::East) + score_of(Direction::West),
            ns_count: count_of(Direction::North) + count_of(Direction::South),
            ew_count: count_of(Direction::East) + count_of(Direction::West),
            emergency: None,
        };
        for dir in Direction::ALL {
            if self.stats[dir.index()].emergency_count > 0 {
                summary.emergency = Some(dir);
            }
        }
        self.summary = summary;

        if self.summary.ns_count + self.summary.ew_count > 0 {
            let detail = Direction::ALL
                .iter()
                .map(|dir| {
                    let stats = &self.stats[dir.index()];
                    format!("{dir}={} ({:.1})", stats.vehicle_count, stats.priority_score())
                })
                .join(", ");
            debug!("congestion sample: {detail}");
        }
    }

    /// The summary of the most recent sample.
    pub fn summary(&self) -> &AnalysisSummary {
        &self.summary
    }

    /// The tallies for one approach from the most recent sample.
    pub fn approach_stats(&self, dir: Direction) -> &ApproachStats {
        &self.stats[dir.index()]
    }

    /// Discards all samples and restarts the cadence.
    pub(crate) fn reset(&mut self) {
        self.since_sample = 0.0;
        self.stats = Default::default();
        self.summary = AnalysisSummary::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Geometry;
    use crate::vehicle::VehicleProfile;
    use crate::VehicleId;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::Key;

    /// A vehicle pinned at its spawn point that has waited `wait` seconds.
    fn held_vehicle(dir: Direction, wait: f64, kind: VehicleKind) -> Vehicle {
        let pinned = VehicleProfile {
            max_speed: 0.5,
            acceleration: 0.0,
            deceleration: 1.0,
        };
        let path = Geometry::default().approach_path(dir);
        let mut vehicle = Vehicle::new(VehicleId::null(), dir, kind, path, &pinned);
        vehicle.update(wait, false, &pinned);
        vehicle
    }

    #[test]
    fn score_contributions_saturate() {
        let mut stats = ApproachStats::default();
        for _ in 0..15 {
            stats.record(40.0, false);
        }
        // 15 vehicles cap at 20; a 40 s wait caps at 15.
        assert_approx_eq!(stats.priority_score(), 35.0);

        stats.record(1.0, true);
        assert_approx_eq!(stats.priority_score(), 60.0);
    }

    #[test]
    fn score_below_the_caps() {
        let mut stats = ApproachStats::default();
        stats.record(10.0, false);
        stats.record(20.0, false);
        stats.record(5.0, false);
        assert_approx_eq!(stats.priority_score(), 6.0 + 10.0);
        assert_approx_eq!(stats.average_wait_time, 35.0 / 3.0);
        assert_approx_eq!(stats.max_wait_time, 20.0);
    }

    #[test]
    fn samples_follow_the_cadence() {
        let mut analyzer = CongestionAnalyzer::new(2.0);
        let held = [held_vehicle(Direction::East, 12.0, VehicleKind::Ordinary)];

        assert!(!analyzer.advance(1.0, held.iter()));
        assert!(!analyzer.advance(0.9, held.iter()));
        assert_approx_eq!(analyzer.summary().ew_score, 0.0);

        assert!(analyzer.advance(0.2, held.iter()));
        assert_approx_eq!(analyzer.summary().ew_score, 2.0 + 6.0);

        // The summary is frozen until the next interval elapses, even if
        // the fleet empties in the meantime.
        assert!(!analyzer.advance(1.0, [].iter()));
        assert_approx_eq!(analyzer.summary().ew_score, 8.0);
    }

    #[test]
    fn groups_sum_their_approaches() {
        let mut analyzer = CongestionAnalyzer::new(2.0);
        let held = [
            held_vehicle(Direction::North, 15.0, VehicleKind::Ordinary),
            held_vehicle(Direction::South, 10.0, VehicleKind::Ordinary),
            held_vehicle(Direction::West, 8.0, VehicleKind::Ordinary),
        ];
        analyzer.advance(2.0, held.iter());

        let summary = analyzer.summary();
        assert_eq!(summary.ns_count, 2);
        assert_eq!(summary.ew_count, 1);
        assert_approx_eq!(summary.ns_score, (2.0 + 7.5) + (2.0 + 5.0));
        assert_approx_eq!(summary.ew_score, 2.0 + 4.0);
        assert!(!summary.has_emergency());
    }

    #[test]
    fn emergency_is_detected_with_its_direction() {
        let mut analyzer = CongestionAnalyzer::new(2.0);
        let held = [
            held_vehicle(Direction::North, 5.0, VehicleKind::Ordinary),
            held_vehicle(Direction::East, 30.0, VehicleKind::Emergency),
        ];
        analyzer.advance(2.0, held.iter());

        let summary = analyzer.summary();
        assert_eq!(summary.emergency, Some(Direction::East));
        // 1 vehicle, 30 s wait (capped), one emergency.
        assert_approx_eq!(summary.ew_score, 2.0 + 15.0 + 25.0);
    }

    #[test]
    fn passed_vehicles_never_contribute() {
        let profile = VehicleProfile::default();
        let path = Geometry::default().approach_path(Direction::North);
        let mut passed = Vehicle::new(
            VehicleId::null(),
            Direction::North,
            VehicleKind::Ordinary,
            path,
            &profile,
        );
        while !passed.has_passed() {
            passed.update(0.1, true, &profile);
        }

        let mut analyzer = CongestionAnalyzer::new(2.0);
        analyzer.advance(2.0, [passed].iter());
        assert_eq!(analyzer.summary().ns_count, 0);
    }

    #[test]
    fn reset_discards_the_sample() {
        let mut analyzer = CongestionAnalyzer::new(2.0);
        let held = [held_vehicle(Direction::North, 9.0, VehicleKind::Ordinary)];
        analyzer.advance(2.0, held.iter());
        analyzer.reset();
        assert_eq!(analyzer.summary().ns_count, 0);
        assert_approx_eq!(analyzer.summary().ns_score, 0.0);
    }
}
