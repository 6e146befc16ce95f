//! Geo-fenced attendance: coordinates, the haversine evaluator and the
//! per-employee check-in control.

pub mod checkin;
pub mod coordinate;
pub mod distance;

pub use checkin::{
    CheckInError, CheckInOutcome, CheckInReading, CheckInRegistry, LocationCapability,
    PositionFix, PositionOptions, ReportedLocation,
};
pub use coordinate::{AssignedLocation, Coordinate};
pub use distance::ComplianceVerdict;
