use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use super::coordinate::Coordinate;

/// Mean Earth radius used by the spherical model.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const DEFAULT_COMPLIANCE_RADIUS_M: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComplianceVerdict {
    Compliant,
    Violation,
    /// No reading could be obtained; never produced by `classify`.
    Error,
}

/// Great-circle distance in meters between two points.
pub fn haversine_m(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lng - from.lng).to_radians();

    let a = ((d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Inclusive: a reading exactly on the radius is compliant.
pub fn classify(distance_m: f64, radius_m: f64) -> ComplianceVerdict {
    if distance_m <= radius_m {
        ComplianceVerdict::Compliant
    } else {
        ComplianceVerdict::Violation
    }
}

/// Human label for a radius, e.g. "1km" or "500m".
pub fn radius_label(radius_m: f64) -> String {
    if radius_m >= 1_000.0 && radius_m % 1_000.0 == 0.0 {
        format!("{}km", radius_m / 1_000.0)
    } else {
        format!("{}m", radius_m.round())
    }
}
