use crate::direction::Direction;
use crate::geometry::ApproachPath;
use crate::VehicleId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distance from the stop line at which a vehicle facing a red begins its
/// linear slow-down ramp, in distance units.
const SLOWDOWN_RADIUS: f64 = 150.0;

/// Floor applied to the ramp distance so the target never vanishes before
/// the hard stop takes over, in distance units.
const CREEP_FLOOR: f64 = 10.0;

/// Distance from the stop line at which the target speed is clamped to
/// zero, in distance units.
const HARD_STOP_RADIUS: f64 = 20.0;

/// Below this speed a vehicle that has not yet cleared the junction counts
/// as waiting, in distance units per s.
const WAITING_SPEED: f64 = 1.0;

/// Kinematic limits shared by every vehicle.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleProfile {
    /// Top speed in distance units per s.
    pub max_speed: f64,
    /// Acceleration rate in distance units per s^2.
    pub acceleration: f64,
    /// Deceleration rate in distance units per s^2. Braking is stronger
    /// than pulling away.
    pub deceleration: f64,
}

/// The kind of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VehicleKind {
    Ordinary,
    Emergency,
}

/// A single vehicle on one approach.
///
/// `pos` is the distance travelled since spawn along the approach axis, so
/// it never decreases. `passed` and the fleet's `counted` are one-way
/// latches: once set they stay set for the life of the vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    id: VehicleId,
    direction: Direction,
    kind: VehicleKind,
    /// Milestones along this vehicle's approach.
    path: ApproachPath,
    /// Distance travelled since spawn.
    pos: f64,
    /// Current speed in distance units per s.
    vel: f64,
    /// The speed the vehicle is steering toward.
    target_vel: f64,
    /// Seconds spent stopped before clearing the junction.
    wait_time: f64,
    waiting: bool,
    passed: bool,
    /// Whether the fleet statistics have recorded this vehicle's passage.
    counted: bool,
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            max_speed: 100.0,
            acceleration: 80.0,
            deceleration: 120.0,
        }
    }
}

impl Vehicle {
    /// Creates a vehicle at the spawn point of its approach.
    pub(crate) fn new(
        id: VehicleId,
        direction: Direction,
        kind: VehicleKind,
        path: ApproachPath,
        profile: &VehicleProfile,
    ) -> Self {
        Self {
            id,
            direction,
            kind,
            path,
            pos: 0.0,
            vel: 0.0,
            target_vel: profile.max_speed,
            wait_time: 0.0,
            waiting: false,
            passed: false,
            counted: false,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The approach the vehicle arrived on.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The kind of the vehicle.
    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    /// Distance travelled since spawn.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's speed in distance units per s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// Seconds spent stopped before clearing the junction.
    pub fn wait_time(&self) -> f64 {
        self.wait_time
    }

    /// Whether the vehicle is currently held up short of the junction.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Whether the vehicle has cleared the junction.
    pub fn has_passed(&self) -> bool {
        self.passed
    }

    /// Signed distance to the stop line; negative once the line is behind.
    pub fn distance_to_stop_line(&self) -> f64 {
        self.path.stop_line - self.pos
    }

    /// Advances the vehicle by `dt` seconds.
    ///
    /// `clear` is the signal's verdict for this vehicle's approach at the
    /// start of the tick.
    pub(crate) fn update(&mut self, dt: f64, clear: bool, profile: &VehicleProfile) {
        // Wait bookkeeping uses the speed carried into the tick.
        if self.vel < WAITING_SPEED && !self.passed {
            self.wait_time += dt;
            self.waiting = true;
        } else {
            self.waiting = false;
        }

        self.target_vel = if clear || self.passed {
            profile.max_speed
        } else {
            let distance = self.distance_to_stop_line();
            if distance < HARD_STOP_RADIUS {
                0.0
            } else if distance < SLOWDOWN_RADIUS {
                profile.max_speed * distance.max(CREEP_FLOOR) / SLOWDOWN_RADIUS
            } else {
                profile.max_speed
            }
        };

        // Chase the target without overshooting it within the tick.
        if self.target_vel > self.vel {
            self.vel = (self.vel + profile.acceleration * dt).min(self.target_vel);
        } else {
            self.vel = (self.vel - profile.deceleration * dt).max(self.target_vel);
        }

        self.pos += self.vel * dt;

        if !self.passed && self.pos > self.path.passage {
            self.passed = true;
        }
    }

    /// Whether the vehicle has left the simulation bounds.
    pub(crate) fn exited(&self) -> bool {
        self.pos > self.path.exit
    }

    /// Claims the one-shot passage count for the fleet statistics.
    /// Returns true exactly once, on the first call after `passed` latches.
    pub(crate) fn newly_passed(&mut self) -> bool {
        if self.passed && !self.counted {
            self.counted = true;
            true
        } else {
            false
        }
    }
}
