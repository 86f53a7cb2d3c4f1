//! Geometry of the intersection and its four approaches.
//!
//! Each vehicle tracks a single scalar: the distance travelled since spawn
//! along its approach axis. This module fixes where the interesting
//! milestones lie on that axis and maps scalar positions back into world
//! space for presentation.

use crate::direction::Direction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D point in world space.
pub type Point2d = cgmath::Point2<f64>;

/// A 2D vector in world space.
pub type Vector2d = cgmath::Vector2<f64>;

/// How far outside the simulation bounds vehicles spawn, in distance units.
const SPAWN_OFFSET: f64 = 100.0;

/// Margin past the far side of the junction at which a vehicle counts as
/// having passed, in distance units.
const PASSAGE_BUFFER: f64 = 50.0;

/// Margin past the outer boundary at which a vehicle is removed,
/// in distance units.
const REMOVAL_BUFFER: f64 = 100.0;

/// Dimensions of the simulated area and the roads crossing it.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Geometry {
    /// Width of the simulation bounds.
    pub width: f64,
    /// Height of the simulation bounds.
    pub height: f64,
    /// Full width of each road, kerb to kerb.
    pub road_width: f64,
    /// Width of a single lane.
    pub lane_width: f64,
}

/// Milestones along one approach, as distances from the spawn point.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApproachPath {
    /// Distance at which the stop line sits.
    pub stop_line: f64,
    /// Distance past which the vehicle has cleared the junction.
    pub passage: f64,
    /// Distance past which the vehicle leaves the simulation.
    pub exit: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            road_width: 400.0,
            lane_width: 60.0,
        }
    }
}

impl Geometry {
    /// Length of the axis a vehicle from `dir` travels along.
    fn axis_length(&self, dir: Direction) -> f64 {
        match dir {
            Direction::North | Direction::South => self.height,
            Direction::East | Direction::West => self.width,
        }
    }

    /// The milestones for an approach. Every distance is measured from the
    /// spawn point, so positions compared against them are monotone.
    pub fn approach_path(&self, dir: Direction) -> ApproachPath {
        let axis = self.axis_length(dir);
        let half_road = 0.5 * self.road_width;
        ApproachPath {
            stop_line: 0.5 * axis - half_road + SPAWN_OFFSET,
            passage: 0.5 * axis + half_road + PASSAGE_BUFFER + SPAWN_OFFSET,
            exit: axis + REMOVAL_BUFFER + SPAWN_OFFSET,
        }
    }

    /// World coordinates of the spawn point for an approach.
    /// Vehicles keep to the right-hand lane of their road.
    pub fn spawn_point(&self, dir: Direction) -> Point2d {
        let centre_x = 0.5 * self.width;
        let centre_y = 0.5 * self.height;
        let lane = 0.5 * self.lane_width;
        match dir {
            Direction::North => Point2d::new(centre_x + lane, -SPAWN_OFFSET),
            Direction::South => Point2d::new(centre_x - lane, self.height + SPAWN_OFFSET),
            Direction::East => Point2d::new(self.width + SPAWN_OFFSET, centre_y + lane),
            Direction::West => Point2d::new(-SPAWN_OFFSET, centre_y - lane),
        }
    }

    /// Unit vector of travel for an approach.
    pub fn travel(&self, dir: Direction) -> Vector2d {
        match dir {
            Direction::North => Vector2d::new(0.0, 1.0),
            Direction::South => Vector2d::new(0.0, -1.0),
            Direction::East => Vector2d::new(-1.0, 0.0),
            Direction::West => Vector2d::new(1.0, 0.0),
        }
    }

    /// Maps a scalar position on an approach back into world space.
    pub fn world_position(&self, dir: Direction, pos: f64) -> Point2d {
        self.spawn_point(dir) + self.travel(dir) * pos
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn milestones_are_ordered() {
        let geometry = Geometry::default();
        for dir in Direction::ALL {
            let path = geometry.approach_path(dir);
            assert!(path.stop_line < path.passage);
            assert!(path.passage < path.exit);
        }
    }

    #[test]
    fn reference_distances() {
        let geometry = Geometry::default();

        // North/South approaches run the 800-unit axis.
        let ns = geometry.approach_path(Direction::North);
        assert_approx_eq!(ns.stop_line, 300.0);
        assert_approx_eq!(ns.passage, 750.0);
        assert_approx_eq!(ns.exit, 1000.0);

        // East/West approaches run the 1200-unit axis.
        let ew = geometry.approach_path(Direction::East);
        assert_approx_eq!(ew.stop_line, 500.0);
        assert_approx_eq!(ew.passage, 1150.0);
        assert_approx_eq!(ew.exit, 1400.0);
    }

    #[test]
    fn world_position_follows_travel_axis() {
        let geometry = Geometry::default();
        for dir in Direction::ALL {
            let start = geometry.world_position(dir, 0.0);
            let moved = geometry.world_position(dir, 250.0);
            let delta = moved - start;
            assert_approx_eq!(delta.x * delta.x + delta.y * delta.y, 250.0 * 250.0);
        }
    }

    #[test]
    fn stop_line_sits_on_near_kerb() {
        let geometry = Geometry::default();
        let path = geometry.approach_path(Direction::North);
        let line = geometry.world_position(Direction::North, path.stop_line);
        assert_approx_eq!(line.y, 0.5 * geometry.height - 0.5 * geometry.road_width);
    }
}
