use crate::analyzer::ANALYSIS_INTERVAL_SEC;
use crate::fleet::SpawnSettings;
use crate::geometry::Geometry;
use crate::signal::SignalTiming;
use crate::vehicle::VehicleProfile;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Immutable configuration for a whole simulation.
///
/// Constructed once and passed by reference into the subsystem
/// constructors. An inconsistent configuration aborts before the first
/// tick; there is no partially valid state to run with.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Bounds and road layout.
    pub geometry: Geometry,
    /// Signal stage durations.
    pub timing: SignalTiming,
    /// Kinematic limits shared by all vehicles.
    pub vehicle: VehicleProfile,
    /// Spawn behavior of the fleet.
    pub spawn: SpawnSettings,
    /// Seconds between congestion samples.
    pub analysis_interval: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            timing: SignalTiming::default(),
            vehicle: VehicleProfile::default(),
            spawn: SpawnSettings::default(),
            analysis_interval: ANALYSIS_INTERVAL_SEC,
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration, panicking on any inconsistency.
    pub fn validate(&self) {
        let timing = &self.timing;
        assert!(timing.green > 0.0, "green duration must be positive");
        assert!(timing.yellow > 0.0, "yellow duration must be positive");
        assert!(timing.all_red > 0.0, "all-red duration must be positive");
        assert!(
            timing.green > timing.yellow + timing.all_red,
            "green duration must exceed the clearance stages"
        );

        let geometry = &self.geometry;
        assert!(geometry.width > 0.0, "bounds width must be positive");
        assert!(geometry.height > 0.0, "bounds height must be positive");
        assert!(geometry.road_width > 0.0, "road width must be positive");
        assert!(
            geometry.road_width < geometry.width.min(geometry.height),
            "road must fit within the bounds"
        );
        assert!(
            geometry.lane_width > 0.0 && geometry.lane_width <= 0.5 * geometry.road_width,
            "lane width must be positive and fit the road"
        );

        let vehicle = &self.vehicle;
        assert!(vehicle.max_speed > 0.0, "max speed must be positive");
        assert!(vehicle.acceleration > 0.0, "acceleration must be positive");
        assert!(vehicle.deceleration > 0.0, "deceleration must be positive");

        let spawn = &self.spawn;
        assert!(spawn.max_population > 0, "population cap must be positive");
        assert!(
            (0.0..=1.0).contains(&spawn.emergency_probability),
            "emergency probability must be within [0, 1]"
        );

        assert!(
            self.analysis_interval > 0.0,
            "analysis interval must be positive"
        );
    }
}
