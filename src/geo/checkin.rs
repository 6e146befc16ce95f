//! One check-in attempt at a time per employee.
//!
//! A [`CheckInControl`] moves `Idle -> RequestingLocation -> Resolved | Failed`.
//! While a location request is outstanding further attempts are ignored. If
//! the attempt future is dropped before the capability answers, the control
//! goes back to `Idle` and nothing is published.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use actix_web::rt::time::timeout;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use strum_macros::AsRefStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::coordinate::{AssignedLocation, Coordinate};
use super::distance::{ComplianceVerdict, classify, haversine_m, radius_label};

/// Options handed to the location capability for every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Age of a cached fix the capability may return; zero forces a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(10_000),
            maximum_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    pub accuracy_m: Option<f64>,
}

/// Anything that can produce the device's current position.
pub trait LocationCapability: Send + Sync {
    fn current_position<'a>(
        &'a self,
        options: &'a PositionOptions,
    ) -> BoxFuture<'a, Result<PositionFix, CheckInError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, ToSchema, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckInError {
    #[error("No assigned location found for your account")]
    NoAssignedLocation,
    #[error("Geolocation is not supported on this device")]
    CapabilityUnsupported,
    #[error("Failed to get your location. Please allow location access to check-in.")]
    PermissionDenied,
    #[error("Failed to get your location. Location information is unavailable.")]
    PositionUnavailable,
    #[error("Failed to get your location. Location request timed out.")]
    Timeout,
    #[error("Failed to get your location. An unknown error occurred.")]
    UnknownFailure,
}

impl CheckInError {
    /// Maps the platform's numeric position error codes.
    pub fn from_platform_code(code: u16) -> Self {
        match code {
            1 => CheckInError::PermissionDenied,
            2 => CheckInError::PositionUnavailable,
            3 => CheckInError::Timeout,
            _ => CheckInError::UnknownFailure,
        }
    }
}

/// A position the client already obtained (or failed to obtain) on the
/// device and reported with the check-in request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportedLocation {
    Fix(PositionFix),
    Failed(u16),
}

impl LocationCapability for ReportedLocation {
    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, Result<PositionFix, CheckInError>> {
        let result = match *self {
            ReportedLocation::Fix(fix) => Ok(fix),
            ReportedLocation::Failed(code) => Err(CheckInError::from_platform_code(code)),
        };
        futures::future::ready(result).boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CheckInReading {
    pub location: Coordinate,
    pub accuracy_m: Option<f64>,
    #[schema(value_type = String, format = "date-time")]
    pub captured_at: DateTime<Utc>,
    pub distance_m: f64,
}

impl CheckInReading {
    pub fn rounded_distance_m(&self) -> u64 {
        self.distance_m.round() as u64
    }
}

/// Result of a single attempt, as handed to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CheckInOutcome {
    pub verdict: ComplianceVerdict,
    pub message: String,
    pub reading: Option<CheckInReading>,
    pub error: Option<CheckInError>,
    #[schema(value_type = String, format = "date-time")]
    pub attempted_at: DateTime<Utc>,
}

impl CheckInOutcome {
    fn failed(error: CheckInError) -> Self {
        Self {
            verdict: ComplianceVerdict::Error,
            message: error.to_string(),
            reading: None,
            error: Some(error),
            attempted_at: Utc::now(),
        }
    }

    fn resolved(reading: CheckInReading, radius_m: f64) -> Self {
        let verdict = classify(reading.distance_m, radius_m);
        let message = match verdict {
            ComplianceVerdict::Compliant => {
                "Check-in successful! You are within the valid location radius.".to_string()
            }
            _ => format!(
                "Location violation! You are outside the {} radius of your assigned location.",
                radius_label(radius_m)
            ),
        };
        Self {
            verdict,
            message,
            reading: Some(reading),
            error: None,
            attempted_at: reading.captured_at,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.verdict == ComplianceVerdict::Compliant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum CheckInState {
    Idle,
    RequestingLocation,
    Resolved(ComplianceVerdict),
    Failed(CheckInError),
}

pub struct CheckInControl {
    state: Mutex<CheckInState>,
    radius_m: f64,
    options: PositionOptions,
}

impl CheckInControl {
    pub fn new(radius_m: f64, options: PositionOptions) -> Self {
        Self {
            state: Mutex::new(CheckInState::Idle),
            radius_m,
            options,
        }
    }

    pub fn state(&self) -> CheckInState {
        *self.lock()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == CheckInState::RequestingLocation
    }

    /// Runs one attempt. Returns `None` without side effects when another
    /// attempt on this control is still waiting for a position.
    pub async fn check_in(
        &self,
        assigned: Option<&AssignedLocation>,
        capability: Option<&dyn LocationCapability>,
    ) -> Option<CheckInOutcome> {
        if self.is_pending() {
            debug!("Check-in ignored: location request already outstanding");
            return None;
        }

        let Some(assigned) = assigned else {
            return Some(CheckInOutcome::failed(CheckInError::NoAssignedLocation));
        };

        let attempt = self.begin()?;

        let Some(capability) = capability else {
            return Some(attempt.fail(CheckInError::CapabilityUnsupported));
        };

        let fix = match timeout(
            self.options.timeout,
            capability.current_position(&self.options),
        )
        .await
        {
            Ok(Ok(fix)) => fix,
            Ok(Err(e)) => return Some(attempt.fail(e)),
            Err(_) => return Some(attempt.fail(CheckInError::Timeout)),
        };

        let reading = CheckInReading {
            location: fix.coordinate,
            accuracy_m: fix.accuracy_m,
            captured_at: Utc::now(),
            distance_m: haversine_m(fix.coordinate, assigned.coordinate),
        };

        Some(attempt.resolve(reading, self.radius_m))
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        let mut state = self.lock();
        if *state == CheckInState::RequestingLocation {
            return None;
        }
        *state = CheckInState::RequestingLocation;
        Some(InFlight {
            control: self,
            settled: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CheckInState> {
        // the state is a plain Copy value, a poisoned guard still holds a valid one
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the control busy; resets it to `Idle` if dropped unsettled.
struct InFlight<'a> {
    control: &'a CheckInControl,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, state: CheckInState) {
        *self.control.lock() = state;
        self.settled = true;
    }

    fn fail(self, error: CheckInError) -> CheckInOutcome {
        warn!(error = error.as_ref(), "Check-in failed");
        self.settle(CheckInState::Failed(error));
        CheckInOutcome::failed(error)
    }

    fn resolve(self, reading: CheckInReading, radius_m: f64) -> CheckInOutcome {
        let outcome = CheckInOutcome::resolved(reading, radius_m);
        info!(
            verdict = %outcome.verdict,
            location = %reading.location,
            distance_m = reading.rounded_distance_m(),
            "Check-in resolved"
        );
        self.settle(CheckInState::Resolved(outcome.verdict));
        outcome
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Pending check-in discarded");
            *self.control.lock() = CheckInState::Idle;
        }
    }
}

/// Hands out one shared control per employee.
pub struct CheckInRegistry {
    controls: Mutex<HashMap<u64, Arc<CheckInControl>>>,
    radius_m: f64,
    options: PositionOptions,
}

impl CheckInRegistry {
    pub fn new(radius_m: f64, options: PositionOptions) -> Self {
        Self {
            controls: Mutex::new(HashMap::new()),
            radius_m,
            options,
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn control_for(&self, employee_id: u64) -> Arc<CheckInControl> {
        let mut controls = self
            .controls
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        controls
            .entry(employee_id)
            .or_insert_with(|| Arc::new(CheckInControl::new(self.radius_m, self.options)))
            .clone()
    }
}
