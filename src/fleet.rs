use crate::direction::Direction;
use crate::geometry::Geometry;
use crate::vehicle::{Vehicle, VehicleKind, VehicleProfile};
use crate::SimulationConfig;
use crate::{VehicleId, VehicleSet};
use log::{debug, info};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration multiplier applied to the spawn probability per tick.
const SPAWN_SCALE: f64 = 30.0;

/// Traffic density presets. The numeric probabilities live in
/// [`SpawnRate::probability`] rather than in the enum itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpawnRate {
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

/// Spawn behavior of the fleet.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpawnSettings {
    /// Traffic density preset.
    pub rate: SpawnRate,
    /// Probability that a spawned vehicle is an emergency vehicle.
    pub emergency_probability: f64,
    /// Hard cap on the number of live vehicles.
    pub max_population: usize,
}

/// Relative spawn weights for the four approaches.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DirectionWeights([f64; 4]);

/// A snapshot of the fleet's running statistics.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FleetStatistics {
    /// Vehicles created since the last reset.
    pub total_spawned: usize,
    /// Vehicles that have cleared the junction, counted exactly once each.
    pub total_passed: usize,
    /// Vehicles currently alive.
    pub current_count: usize,
    /// Mean wait of passed vehicles; 0 until one has passed.
    pub average_wait_time: f64,
    /// Longest wait of any passed vehicle.
    pub max_wait_time: f64,
}

/// Owns every vehicle in the simulation.
///
/// Spawning is a Bernoulli trial per tick; updates consult the signal's
/// clear verdict per approach; vehicles that leave the bounds are removed
/// in a batch pass after all per-vehicle updates.
pub struct VehicleFleet {
    vehicles: VehicleSet,
    geometry: Geometry,
    profile: VehicleProfile,
    rate: SpawnRate,
    emergency_probability: f64,
    max_population: usize,
    weights: DirectionWeights,
    direction_draw: WeightedIndex<f64>,
    rng: StdRng,
    total_spawned: usize,
    total_passed: usize,
    total_wait_time: f64,
    max_wait_time: f64,
}

impl SpawnRate {
    /// Per-second spawn probability before scaling.
    pub fn probability(self) -> f64 {
        match self {
            SpawnRate::VeryLow => 0.003,
            SpawnRate::Low => 0.01,
            SpawnRate::Medium => 0.02,
            SpawnRate::High => 0.04,
            SpawnRate::VeryHigh => 0.06,
        }
    }
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            rate: SpawnRate::Medium,
            emergency_probability: 0.001,
            max_population: 50,
        }
    }
}

impl Default for DirectionWeights {
    fn default() -> Self {
        Self([1.0; 4])
    }
}

impl DirectionWeights {
    /// Creates a weight set; weights are relative, not normalised.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self([north, south, east, west])
    }

    /// The weight for one approach.
    pub fn get(&self, dir: Direction) -> f64 {
        self.0[dir.index()]
    }

    fn draw(&self) -> WeightedIndex<f64> {
        WeightedIndex::new(self.0).expect("direction weights must include a positive weight")
    }
}

impl VehicleFleet {
    /// Creates an empty fleet. A `seed` makes spawning deterministic.
    pub(crate) fn new(config: &SimulationConfig, seed: Option<u64>) -> Self {
        let weights = DirectionWeights::default();
        Self {
            vehicles: VehicleSet::default(),
            geometry: config.geometry,
            profile: config.vehicle,
            rate: config.spawn.rate,
            emergency_probability: config.spawn.emergency_probability,
            max_population: config.spawn.max_population,
            direction_draw: weights.draw(),
            weights,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            total_spawned: 0,
            total_passed: 0,
            total_wait_time: 0.0,
            max_wait_time: 0.0,
        }
    }

    /// Advances the whole fleet by `dt` seconds.
    ///
    /// `is_clear` is the signal's verdict per approach, evaluated once at
    /// the start of the pass so every vehicle sees the same signal state.
    pub(crate) fn update(&mut self, dt: f64, is_clear: impl Fn(Direction) -> bool) {
        self.handle_spawning(dt);

        let clear = Direction::ALL.map(&is_clear);
        for (_, vehicle) in &mut self.vehicles {
            vehicle.update(dt, clear[vehicle.direction().index()], &self.profile);
            if vehicle.newly_passed() {
                self.total_passed += 1;
                self.total_wait_time += vehicle.wait_time();
                self.max_wait_time = self.max_wait_time.max(vehicle.wait_time());
            }
        }

        self.remove_exited();
    }

    /// Runs the per-tick Bernoulli spawn trial.
    fn handle_spawning(&mut self, dt: f64) {
        if self.vehicles.len() >= self.max_population {
            return;
        }
        let chance = (self.rate.probability() * dt * SPAWN_SCALE).min(1.0);
        if !self.rng.gen_bool(chance) {
            return;
        }
        let direction = Direction::ALL[self.direction_draw.sample(&mut self.rng)];
        let kind = if self.rng.gen_bool(self.emergency_probability) {
            VehicleKind::Emergency
        } else {
            VehicleKind::Ordinary
        };
        self.spawn(direction, kind);
    }

    /// Inserts one vehicle at the spawn point of `direction`.
    pub(crate) fn spawn(&mut self, direction: Direction, kind: VehicleKind) -> VehicleId {
        let path = self.geometry.approach_path(direction);
        let profile = self.profile;
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, direction, kind, path, &profile));
        self.total_spawned += 1;
        if kind == VehicleKind::Emergency {
            info!("emergency vehicle spawned from {direction}");
        }
        id
    }

    /// Removes vehicles that have left the simulation bounds.
    fn remove_exited(&mut self) {
        let exited: SmallVec<[VehicleId; 8]> = self
            .vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.exited())
            .map(|(id, _)| id)
            .collect();
        for id in exited {
            self.vehicles.remove(id);
        }
    }

    /// Returns an iterator over all live vehicles.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get(&self, id: VehicleId) -> &Vehicle {
        &self.vehicles[id]
    }

    /// The number of live vehicles.
    pub fn population(&self) -> usize {
        self.vehicles.len()
    }

    /// The geometry vehicles are placed against.
    pub(crate) fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The current per-approach spawn weights.
    pub fn direction_weights(&self) -> DirectionWeights {
        self.weights
    }

    /// Sets the traffic density preset.
    pub(crate) fn set_spawn_rate(&mut self, rate: SpawnRate) {
        debug!("spawn rate set to {rate:?}");
        self.rate = rate;
    }

    /// Replaces the per-approach spawn weights.
    pub(crate) fn set_direction_weights(&mut self, weights: DirectionWeights) {
        self.direction_draw = weights.draw();
        self.weights = weights;
    }

    /// The running statistics of the fleet.
    pub fn statistics(&self) -> FleetStatistics {
        let average_wait_time = if self.total_passed > 0 {
            self.total_wait_time / self.total_passed as f64
        } else {
            0.0
        };
        FleetStatistics {
            total_spawned: self.total_spawned,
            total_passed: self.total_passed,
            current_count: self.vehicles.len(),
            average_wait_time,
            max_wait_time: self.max_wait_time,
        }
    }

    /// Clears all vehicles and zeroes every counter.
    pub(crate) fn reset(&mut self) {
        self.vehicles.clear();
        self.total_spawned = 0;
        self.total_passed = 0;
        self.total_wait_time = 0.0;
        self.max_wait_time = 0.0;
    }
}
