use crate::analyzer::{ApproachStats, CongestionAnalyzer};
use crate::config::SimulationConfig;
use crate::direction::{ApproachGroup, Direction};
use crate::fleet::{DirectionWeights, FleetStatistics, SpawnRate, VehicleFleet};
use crate::geometry::Point2d;
use crate::policy::{self, Decision, IMBALANCE_RATIO};
use crate::signal::{SignalController, Stage};
use crate::vehicle::VehicleKind;
use crate::VehicleId;
use log::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum seconds a group must hold right-of-way before the switch gate
/// lets a non-emergency recommendation through.
const MIN_DWELL_SEC: f64 = 15.0; // s

/// A read-only view of one vehicle, for presentation.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub direction: Direction,
    pub kind: VehicleKind,
    /// World-space position of the vehicle.
    pub position: Point2d,
    /// Distance travelled along the approach axis.
    pub distance: f64,
    pub speed: f64,
    pub passed: bool,
    pub waiting: bool,
}

/// An intersection simulation.
///
/// Ties the signal controller, the fleet, the congestion analyzer and the
/// arbitration policy together under one tick. The intra-tick order is
/// fixed: the signal advances first, the fleet consumes the fresh clear
/// verdicts, the analyzer samples the post-update fleet on its own
/// cadence, and the policy plus switch gate run last so a decision only
/// shapes the next tick.
pub struct Simulation {
    config: SimulationConfig,
    signal: SignalController,
    fleet: VehicleFleet,
    analyzer: CongestionAnalyzer,
    last_decision: Option<Decision>,
    /// Whether the gate engaged the emergency override itself, as opposed
    /// to a host command. Only a gate-engaged override is auto-released.
    preempted: bool,
    /// Total simulated seconds since construction or reset.
    elapsed: f64,
}

impl Simulation {
    /// Creates a simulation. Panics if the configuration is inconsistent.
    pub fn new(config: SimulationConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a simulation whose spawning is deterministic.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        Self::build(config, Some(seed))
    }

    fn build(config: SimulationConfig, seed: Option<u64>) -> Self {
        config.validate();
        Self {
            signal: SignalController::new(config.timing),
            fleet: VehicleFleet::new(&config, seed),
            analyzer: CongestionAnalyzer::new(config.analysis_interval),
            config,
            last_decision: None,
            preempted: false,
            elapsed: 0.0,
        }
    }

    /// Advances the whole simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.signal.update(dt);
        self.fleet.update(dt, |dir| self.signal.is_clear(dir));
        self.analyzer.advance(dt, self.fleet.iter());

        let decision = policy::recommend(
            self.analyzer.summary(),
            self.signal.group(),
            self.signal.phase_timer(),
        );
        self.apply_decision(&decision);
        self.last_decision = Some(decision);
        self.elapsed += dt;
    }

    /// The switch gate: re-validates a recommendation before letting it
    /// mutate the signal.
    ///
    /// Emergencies bypass the dwell check and go through the override;
    /// everything else must respect the minimum dwell and re-pass the
    /// starvation-or-imbalance condition against the sampled figures.
    fn apply_decision(&mut self, decision: &Decision) {
        if let Some(dir) = decision.emergency {
            let manual = self.signal.emergency().is_some() && !self.preempted;
            if !manual && self.signal.emergency() != Some(dir) {
                info!("emergency preemption engaged for {dir}");
                self.signal.set_emergency(Some(dir));
                self.preempted = true;
            }
            return;
        }

        if self.preempted {
            info!("emergency preemption released");
            self.signal.set_emergency(None);
            self.preempted = false;
        }

        if !decision.should_switch {
            return;
        }
        if self.signal.phase_timer() < MIN_DWELL_SEC {
            return;
        }

        let current = self.signal.group();
        let recommended = decision.recommended_group;
        if recommended == current {
            return;
        }
        let starved = decision.count(recommended) > 0 && decision.count(current) == 0;
        let dominant = decision.score(recommended) > decision.score(current) * IMBALANCE_RATIO;
        if starved || dominant {
            info!("right-of-way to {recommended}: {}", decision.reason);
            self.signal.force_phase(recommended);
        }
    }

    /// The group currently holding right-of-way.
    pub fn current_group(&self) -> ApproachGroup {
        self.signal.group()
    }

    /// The stage of the current phase.
    pub fn current_stage(&self) -> Stage {
        self.signal.stage()
    }

    /// Seconds until the next scheduled group change.
    pub fn time_until_change(&self) -> f64 {
        self.signal.time_until_change()
    }

    /// Whether vehicles from `dir` may enter the junction.
    pub fn is_clear(&self, dir: Direction) -> bool {
        self.signal.is_clear(dir)
    }

    /// Seconds since the group last changed.
    pub fn phase_timer(&self) -> f64 {
        self.signal.phase_timer()
    }

    /// The direction forced green by the emergency override, if active.
    pub fn emergency(&self) -> Option<Direction> {
        self.signal.emergency()
    }

    /// Total simulated seconds since construction or reset.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The simulation's configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Read-only access to the fleet.
    pub fn fleet(&self) -> &VehicleFleet {
        &self.fleet
    }

    /// A drawing-ready view of every live vehicle.
    pub fn fleet_snapshot(&self) -> Vec<VehicleSnapshot> {
        let geometry = self.fleet.geometry();
        self.fleet
            .iter()
            .map(|vehicle| VehicleSnapshot {
                id: vehicle.id(),
                direction: vehicle.direction(),
                kind: vehicle.kind(),
                position: geometry.world_position(vehicle.direction(), vehicle.pos()),
                distance: vehicle.pos(),
                speed: vehicle.vel(),
                passed: vehicle.has_passed(),
                waiting: vehicle.is_waiting(),
            })
            .collect()
    }

    /// The fleet's running statistics.
    pub fn statistics(&self) -> FleetStatistics {
        self.fleet.statistics()
    }

    /// The most recent arbitration verdict, if a tick has run.
    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    /// The latest congestion tallies for one approach.
    pub fn approach_stats(&self, dir: Direction) -> &ApproachStats {
        self.analyzer.approach_stats(dir)
    }

    /// Immediately hands right-of-way to `group`.
    pub fn force_phase(&mut self, group: ApproachGroup) {
        info!("phase forced to {group}");
        self.signal.force_phase(group);
    }

    /// Immediately hands right-of-way to the opposing group.
    pub fn cycle_phase(&mut self) {
        self.signal.cycle_phase();
    }

    /// Engages or releases the emergency override by host command.
    /// A commanded override is never auto-released by the switch gate.
    pub fn set_emergency(&mut self, dir: Option<Direction>) {
        self.preempted = false;
        self.signal.set_emergency(dir);
    }

    /// Sets the traffic density preset.
    pub fn set_spawn_rate(&mut self, rate: SpawnRate) {
        self.fleet.set_spawn_rate(rate);
    }

    /// Replaces the per-approach spawn weights.
    pub fn set_direction_weights(&mut self, weights: DirectionWeights) {
        self.fleet.set_direction_weights(weights);
    }

    /// Returns the simulation to its initial state in one step: empty
    /// fleet, NS green with a fresh timer, no samples, no decision.
    pub fn reset(&mut self) {
        self.fleet.reset();
        self.signal = SignalController::new(self.config.timing);
        self.analyzer.reset();
        self.last_decision = None;
        self.preempted = false;
        self.elapsed = 0.0;
        info!("simulation reset");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analyzer::AnalysisSummary;

    fn simulation() -> Simulation {
        let mut config = SimulationConfig::default();
        // Keep the seeded background traffic free of random emergencies so
        // the gate scenarios below stay deterministic.
        config.spawn.emergency_probability = 0.0;
        Simulation::with_seed(config, 42)
    }

    fn decision(
        summary: &AnalysisSummary,
        current: ApproachGroup,
        phase_elapsed: f64,
    ) -> Decision {
        policy::recommend(summary, current, phase_elapsed)
    }

    #[test]
    fn gate_refuses_a_switch_before_the_dwell_elapses() {
        let mut sim = simulation();
        sim.tick(10.0); // phase timer at 10 s

        let verdict = decision(
            &AnalysisSummary {
                ns_score: 10.0,
                ew_score: 21.0,
                ns_count: 4,
                ew_count: 9,
                emergency: None,
            },
            ApproachGroup::NS,
            25.0,
        );
        assert!(verdict.should_switch);

        sim.apply_decision(&verdict);
        assert_eq!(sim.current_group(), ApproachGroup::NS);
    }

    #[test]
    fn gate_commits_a_mature_imbalance() {
        let mut sim = simulation();
        sim.tick(16.0); // past the dwell, still green

        let verdict = decision(
            &AnalysisSummary {
                ns_score: 10.0,
                ew_score: 21.0,
                ns_count: 4,
                ew_count: 9,
                emergency: None,
            },
            ApproachGroup::NS,
            25.0,
        );
        sim.apply_decision(&verdict);
        assert_eq!(sim.current_group(), ApproachGroup::EW);
        assert_eq!(sim.phase_timer(), 0.0);
    }

    #[test]
    fn gate_rechecks_the_commit_condition() {
        let mut sim = simulation();
        sim.tick(16.0);

        // A bare recommendation with neither starvation nor dominance in
        // its figures must not move the signal.
        let mut verdict = decision(&AnalysisSummary::default(), ApproachGroup::NS, 25.0);
        verdict.recommended_group = ApproachGroup::EW;
        verdict.should_switch = true;
        sim.apply_decision(&verdict);
        assert_eq!(sim.current_group(), ApproachGroup::NS);
    }

    #[test]
    fn emergency_bypasses_the_dwell_gate() {
        let mut sim = simulation();
        sim.tick(1.0); // well inside the dwell window

        let verdict = decision(
            &AnalysisSummary {
                ns_score: 0.0,
                ew_score: 27.0,
                ns_count: 0,
                ew_count: 1,
                emergency: Some(Direction::East),
            },
            ApproachGroup::NS,
            1.0,
        );
        sim.apply_decision(&verdict);

        assert_eq!(sim.current_group(), ApproachGroup::EW);
        assert!(sim.is_clear(Direction::East));
        assert!(!sim.is_clear(Direction::West));
        assert_eq!(sim.emergency(), Some(Direction::East));
    }

    #[test]
    fn gate_releases_its_own_preemption() {
        let mut sim = simulation();
        let with_emergency = decision(
            &AnalysisSummary {
                ew_score: 27.0,
                ew_count: 1,
                emergency: Some(Direction::East),
                ..Default::default()
            },
            ApproachGroup::NS,
            1.0,
        );
        sim.apply_decision(&with_emergency);
        assert_eq!(sim.emergency(), Some(Direction::East));

        let all_clear = decision(&AnalysisSummary::default(), ApproachGroup::EW, 1.0);
        sim.apply_decision(&all_clear);
        assert_eq!(sim.emergency(), None);
    }

    #[test]
    fn commanded_override_is_not_auto_released() {
        let mut sim = simulation();
        sim.set_emergency(Some(Direction::North));

        let all_clear = decision(&AnalysisSummary::default(), ApproachGroup::NS, 1.0);
        sim.apply_decision(&all_clear);
        assert_eq!(sim.emergency(), Some(Direction::North));

        sim.set_emergency(None);
        assert_eq!(sim.emergency(), None);
    }

    #[test]
    fn tick_records_a_decision() {
        let mut sim = simulation();
        assert!(sim.last_decision().is_none());
        sim.tick(1.0 / 60.0);
        let decision = sim.last_decision().expect("decision after a tick");
        assert!(!decision.should_switch);
        assert_eq!(decision.current_group, ApproachGroup::NS);
    }
}
