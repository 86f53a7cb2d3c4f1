pub use analyzer::{AnalysisSummary, ApproachStats, CongestionAnalyzer};
pub use cgmath;
pub use config::SimulationConfig;
pub use direction::{ApproachGroup, Direction};
pub use fleet::{DirectionWeights, FleetStatistics, SpawnRate, SpawnSettings, VehicleFleet};
pub use geometry::{ApproachPath, Geometry, Point2d, Vector2d};
pub use policy::Decision;
pub use signal::{SignalController, SignalTiming, Stage};
pub use simulation::{Simulation, VehicleSnapshot};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{Vehicle, VehicleKind, VehicleProfile};

mod analyzer;
mod config;
mod direction;
mod fleet;
mod geometry;
pub mod policy;
mod signal;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
